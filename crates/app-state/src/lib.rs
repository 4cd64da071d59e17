//! Application state management for Passage
//!
//! Reactive server-state management in the query/invalidation style:
//! every remote read is a [`query::Query`] with a cache key, staleness
//! window, and retry policy, and writes invalidate the scopes they
//! touch. The session module layers reactive views over the session
//! controller.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod query;
pub mod session;

pub use query::{Query, QueryClient, QueryConfig, QueryError, QueryKey};
pub use session::{CurrentSession, SessionHandle};
