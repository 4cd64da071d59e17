//! Payments
//!
//! Two-step checkout against the payment gateway: initiate returns an
//! authorization URL the shell opens in a browser sheet, and verify
//! confirms the charge once the gateway redirects back. Verification is
//! idempotent server-side, so transient transport failures retry.

use api_client::http::{ApiClient, ApiError, ApiRequest, ApiResponse};
use api_client::types::DataEnvelope;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Checkout initiation payload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInitiation {
    /// What is being bought (course id, service id, ...)
    pub item_id: String,
    /// Kind of item ("course", "service", ...)
    pub item_type: String,
    /// Where the gateway redirects after checkout
    pub callback_url: String,
}

/// Gateway handoff returned by initiate
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentInitiationResponse {
    /// Checkout URL to open
    pub authorization_url: String,
    /// Gateway access code
    pub access_code: String,
    /// Transaction reference for verification
    pub reference: String,
}

/// Charge metadata echoed back by verification
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMetadata {
    /// Internal payment id
    pub id: String,
    /// Purchased item id
    pub item_id: String,
    /// Purchased item kind
    pub item_type: String,
}

/// Verified charge details
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerificationData {
    /// Whether the gateway confirmed the charge
    pub verified: bool,
    /// Amount in minor units
    pub amount: u64,
    /// Currency code
    pub currency: String,
    /// Transaction reference
    pub reference: String,
    /// Gateway status string
    pub status: String,
    /// When the charge settled
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    /// Charge metadata
    pub metadata: PaymentMetadata,
}

/// Full verification response body
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentVerificationResponse {
    /// Overall success flag
    pub status: bool,
    /// Server message
    #[serde(default)]
    pub message: String,
    /// Longer detail
    #[serde(default)]
    pub detail: String,
    /// Verified charge details
    pub data: PaymentVerificationData,
}

/// Typed client for payment endpoints
#[derive(Clone)]
pub struct PaymentService {
    client: Arc<ApiClient>,
}

impl PaymentService {
    /// Create a new payment service over a shared client
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// `POST /payment/initiate`
    pub async fn initiate(
        &self,
        params: &PaymentInitiation,
    ) -> Result<PaymentInitiationResponse, ApiError> {
        let request = ApiRequest::post("/payment/initiate")
            .json_body(params)
            .map_err(|e| ApiError::new(0, "SerializationError", e.to_string()))?;

        let response: ApiResponse<DataEnvelope<PaymentInitiationResponse>> =
            self.client.send(request).await?;
        Ok(response.data.data)
    }

    /// `POST /payment/verify`
    ///
    /// The gateway redirect hands back an open-ended set of query
    /// parameters; they are forwarded as-is.
    pub async fn verify(
        &self,
        gateway_params: &HashMap<String, String>,
    ) -> Result<PaymentVerificationResponse, ApiError> {
        let request = ApiRequest::post("/payment/verify")
            .json_body(gateway_params)
            .map_err(|e| ApiError::new(0, "SerializationError", e.to_string()))?;

        let response: ApiResponse<PaymentVerificationResponse> =
            self.client.send_with_retry(request, 2).await?;
        Ok(response.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_client::http::ApiClientConfig;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_initiation_wire_shape() {
        let params = PaymentInitiation {
            item_id: "c_1".to_string(),
            item_type: "course".to_string(),
            callback_url: "passage://payment/callback".to_string(),
        };

        let json = serde_json::to_string(&params).unwrap();
        assert!(json.contains("\"itemId\":\"c_1\""));
        assert!(json.contains("\"callbackUrl\""));
    }

    #[test]
    fn test_verification_response_parses() {
        let body = json!({
            "status": true,
            "message": "Verification successful",
            "detail": "",
            "data": {
                "verified": true,
                "amount": 4999,
                "currency": "USD",
                "reference": "ref_1",
                "status": "success",
                "paidAt": "2025-03-02T10:00:00Z",
                "metadata": { "id": "p_1", "itemId": "c_1", "itemType": "course" }
            }
        });

        let response: PaymentVerificationResponse = serde_json::from_value(body).unwrap();
        assert!(response.data.verified);
        assert_eq!(response.data.amount, 4999);
        assert_eq!(response.data.metadata.item_type, "course");
    }

    #[tokio::test]
    async fn test_initiate_and_verify() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/payment/initiate"))
            .and(body_partial_json(json!({"itemId": "c_1", "itemType": "course"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "authorization_url": "https://checkout.example/pay/ref_1",
                    "access_code": "ac_1",
                    "reference": "ref_1"
                }
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/payment/verify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": true,
                "message": "ok",
                "data": {
                    "verified": true,
                    "amount": 4999,
                    "currency": "USD",
                    "reference": "ref_1",
                    "status": "success",
                    "metadata": { "id": "p_1", "itemId": "c_1", "itemType": "course" }
                }
            })))
            .mount(&server)
            .await;

        let client = Arc::new(ApiClient::new(ApiClientConfig::new(server.uri())));
        let service = PaymentService::new(client);

        let handoff = service
            .initiate(&PaymentInitiation {
                item_id: "c_1".to_string(),
                item_type: "course".to_string(),
                callback_url: "passage://payment/callback".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(handoff.reference, "ref_1");

        let mut params = HashMap::new();
        params.insert("reference".to_string(), "ref_1".to_string());

        let verification = service.verify(&params).await.unwrap();
        assert!(verification.data.verified);
        assert!(verification.data.paid_at.is_none());
    }
}
