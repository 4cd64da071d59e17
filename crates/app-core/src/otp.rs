//! OTP entry and resend countdown
//!
//! State behind the verification screen: a fixed-length code input
//! whose submit action stays disabled until all 6 digits are in, and
//! the 60-second resend cooldown that ticks once per second and only
//! allows a resend at zero. The countdown task is cancelled when its
//! handle drops, so a dismissed screen leaks no timer.

use regex::Regex;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Number of digits in a verification code
pub const OTP_LENGTH: usize = 6;

/// Seconds before the resend action unlocks
pub const RESEND_COOLDOWN_SECS: u32 = 60;

/// Fixed-length digit input for the verification code
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtpInput {
    digits: String,
}

impl OtpInput {
    /// Create an empty input
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one digit; ignored when full or not a digit
    pub fn push(&mut self, c: char) {
        if c.is_ascii_digit() && self.digits.chars().count() < OTP_LENGTH {
            self.digits.push(c);
        }
    }

    /// Remove the last digit
    pub fn pop(&mut self) {
        self.digits.pop();
    }

    /// Replace the whole input, dropping non-digits and truncating
    pub fn set(&mut self, code: &str) {
        self.digits = code
            .chars()
            .filter(|c| c.is_ascii_digit())
            .take(OTP_LENGTH)
            .collect();
    }

    /// The entered code so far
    pub fn code(&self) -> &str {
        &self.digits
    }

    /// Whether all digits are in; gates the submit action
    pub fn is_complete(&self) -> bool {
        self.digits.chars().count() == OTP_LENGTH
    }

    /// Clear the input
    pub fn clear(&mut self) {
        self.digits.clear();
    }
}

/// Resend cooldown state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResendCountdown {
    remaining_secs: u32,
}

impl Default for ResendCountdown {
    fn default() -> Self {
        Self::new()
    }
}

impl ResendCountdown {
    /// Start a fresh cooldown at the full 60 seconds
    pub fn new() -> Self {
        Self { remaining_secs: RESEND_COOLDOWN_SECS }
    }

    /// Advance one second
    pub fn tick(&mut self) {
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
    }

    /// Seconds left before resend unlocks
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// Resend is only available once the countdown reaches zero
    pub fn can_resend(&self) -> bool {
        self.remaining_secs == 0
    }

    /// Restart the cooldown after a resend
    pub fn restart(&mut self) {
        self.remaining_secs = RESEND_COOLDOWN_SECS;
    }

    /// "mm:ss" rendering for the resend label
    pub fn formatted(&self) -> String {
        let mins = self.remaining_secs / 60;
        let secs = self.remaining_secs % 60;
        format!("{mins:02}:{secs:02}")
    }
}

/// Background task driving a shared countdown once per second
///
/// Dropping the task aborts it; the countdown stops wherever it was.
pub struct CountdownTask {
    handle: JoinHandle<()>,
}

impl CountdownTask {
    /// Spawn the ticking task over shared countdown state
    pub fn spawn(state: Arc<Mutex<ResendCountdown>>) -> Self {
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(1)).await;

                let done = {
                    let mut countdown = state.lock().unwrap();
                    countdown.tick();
                    countdown.can_resend()
                };

                if done {
                    break;
                }
            }
        });

        Self { handle }
    }

    /// Whether the countdown task has finished
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for CountdownTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Mask an email for the verification copy: `use***@example.com`
pub fn mask_email(email: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(\w{3})[\w.-]+@([\w.]+)").unwrap());
    re.replace_all(email, "$1***@$2").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_input_collects_six_digits() {
        let mut input = OtpInput::new();

        for c in "123456".chars() {
            input.push(c);
        }

        assert_eq!(input.code(), "123456");
        assert!(input.is_complete());
    }

    #[test]
    fn test_otp_input_ignores_overflow_and_non_digits() {
        let mut input = OtpInput::new();

        input.push('a');
        assert_eq!(input.code(), "");

        input.set("12345678");
        assert_eq!(input.code(), "123456");

        input.set("12a34b");
        assert_eq!(input.code(), "1234");
        assert!(!input.is_complete());
    }

    #[test]
    fn test_submit_gate_requires_exactly_six() {
        let mut input = OtpInput::new();

        input.set("12345");
        assert!(!input.is_complete());

        input.push('6');
        assert!(input.is_complete());

        input.pop();
        assert!(!input.is_complete());
    }

    #[test]
    fn test_countdown_starts_at_sixty_and_decrements() {
        let mut countdown = ResendCountdown::new();
        assert_eq!(countdown.remaining_secs(), 60);
        assert!(!countdown.can_resend());

        countdown.tick();
        assert_eq!(countdown.remaining_secs(), 59);

        for _ in 0..59 {
            countdown.tick();
        }
        assert_eq!(countdown.remaining_secs(), 0);
        assert!(countdown.can_resend());

        // Ticking past zero stays at zero
        countdown.tick();
        assert!(countdown.can_resend());
    }

    #[test]
    fn test_can_resend_only_at_zero() {
        let mut countdown = ResendCountdown::new();

        for _ in 0..59 {
            countdown.tick();
            assert!(!countdown.can_resend());
        }

        countdown.tick();
        assert!(countdown.can_resend());
    }

    #[test]
    fn test_restart_relocks_resend() {
        let mut countdown = ResendCountdown::new();
        for _ in 0..60 {
            countdown.tick();
        }
        assert!(countdown.can_resend());

        countdown.restart();
        assert_eq!(countdown.remaining_secs(), 60);
        assert!(!countdown.can_resend());
    }

    #[test]
    fn test_formatted_timer() {
        let mut countdown = ResendCountdown::new();
        assert_eq!(countdown.formatted(), "01:00");

        countdown.tick();
        assert_eq!(countdown.formatted(), "00:59");

        for _ in 0..59 {
            countdown.tick();
        }
        assert_eq!(countdown.formatted(), "00:00");
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_task_unlocks_after_sixty_seconds() {
        let state = Arc::new(Mutex::new(ResendCountdown::new()));
        let task = CountdownTask::spawn(state.clone());

        tokio::time::advance(Duration::from_secs(59)).await;
        tokio::task::yield_now().await;
        assert!(!state.lock().unwrap().can_resend());

        tokio::time::advance(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert!(state.lock().unwrap().can_resend());

        drop(task);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_task_stops_ticking() {
        let state = Arc::new(Mutex::new(ResendCountdown::new()));
        let task = CountdownTask::spawn(state.clone());

        tokio::time::advance(Duration::from_secs(10)).await;
        tokio::task::yield_now().await;
        drop(task);

        let frozen = state.lock().unwrap().remaining_secs();
        tokio::time::advance(Duration::from_secs(10)).await;
        tokio::task::yield_now().await;

        assert_eq!(state.lock().unwrap().remaining_secs(), frozen);
    }

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("user@example.com"), "use***@example.com");
        assert_eq!(mask_email("amina.yusuf@mail.co"), "ami***@mail.co");
        // Too short to mask stays unchanged
        assert_eq!(mask_email("ab@x.com"), "ab@x.com");
    }
}
