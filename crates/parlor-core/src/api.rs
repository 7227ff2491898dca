use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, instrument};

use crate::availability::AvailabilityCheck;
use crate::model::{Appointment, Category, Notification, Service, User};

/// Per-request client-side timeout. No per-operation cancellation beyond
/// this; a timeout surfaces as `ApiError::Network`.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("could not reach server: {0}")]
    Network(String),

    #[error("server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed response from server: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if err.is_timeout() {
            ApiError::Network(format!(
                "request timed out after {}s",
                REQUEST_TIMEOUT.as_secs()
            ))
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Error payload the backend sends with non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// A new-appointment request as the booking form collects it. Validated
/// client-side before any request is issued.
#[derive(Debug, Clone, Serialize)]
pub struct BookingRequest {
    pub client_name: String,
    pub client_email: String,
    pub service_id: String,
    pub date: NaiveDate,
    pub time: String,
    pub notes: Option<String>,
}

impl BookingRequest {
    /// Required fields must all be present; on failure nothing is sent
    /// and the caller surfaces the message as a blocking error.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut missing = Vec::new();
        if self.client_name.trim().is_empty() {
            missing.push("client name");
        }
        if self.client_email.trim().is_empty() {
            missing.push("client email");
        }
        if self.service_id.trim().is_empty() {
            missing.push("service");
        }
        if self.time.trim().is_empty() {
            missing.push("time");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(anyhow::anyhow!(
                "missing required booking fields: {}",
                missing.join(", ")
            ))
        }
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,

    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Deserialize)]
struct AvailabilityResponse {
    #[serde(default = "default_available")]
    available: bool,
}

fn default_available() -> bool {
    true
}

/// Thin JSON-over-HTTPS client for the booking backend. All real booking
/// logic, availability truth, and persistence live on the other side.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| anyhow::anyhow!("failed to build HTTP client: {err}"))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        Self::ensure_success(response)
            .await?
            .json::<T>()
            .await
            .map_err(ApiError::from)
    }

    /// Surface a non-2xx response as `Rejected`, preferring the backend's
    /// own `message` field over a generic fallback.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|parsed| parsed.message)
            .unwrap_or_else(|| "request failed".to_string());
        Err(ApiError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        debug!(path, "GET");
        let response = self.authed(self.client.get(self.url(path))).send().await?;
        Self::decode(response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        debug!(path, "POST");
        let response = self
            .authed(self.client.post(self.url(path)).json(body))
            .send()
            .await?;
        Self::decode(response).await
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        self.post_json("auth/login", &LoginRequest { email, password })
            .await
    }

    #[instrument(skip(self))]
    pub async fn list_services(&self) -> Result<Vec<Service>, ApiError> {
        self.get_json("services").await
    }

    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        self.get_json("categories").await
    }

    #[instrument(skip(self))]
    pub async fn list_appointments(&self) -> Result<Vec<Appointment>, ApiError> {
        self.get_json("appointments").await
    }

    #[instrument(skip(self, request))]
    pub async fn create_appointment(
        &self,
        request: &BookingRequest,
    ) -> Result<Appointment, ApiError> {
        self.post_json("appointments", request).await
    }

    #[instrument(skip(self))]
    pub async fn cancel_appointment(&self, id: &str) -> Result<Appointment, ApiError> {
        self.post_json(&format!("appointments/{id}/cancel"), &serde_json::json!({}))
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete_appointment(&self, id: &str) -> Result<(), ApiError> {
        let response = self
            .authed(self.client.delete(self.url(&format!("appointments/{id}"))))
            .send()
            .await?;
        Self::ensure_success(response).await.map(|_| ())
    }

    #[instrument(skip(self))]
    pub async fn check_availability(&self, date: NaiveDate, time: &str) -> Result<bool, ApiError> {
        let path = format!(
            "appointments/availability?date={}&time={}",
            date.format("%Y-%m-%d"),
            time
        );
        let response: AvailabilityResponse = self.get_json(&path).await?;
        Ok(response.available)
    }

    #[instrument(skip(self))]
    pub async fn list_notifications(&self) -> Result<Vec<Notification>, ApiError> {
        self.get_json("notifications").await
    }

    #[instrument(skip(self))]
    pub async fn mark_notification_read(&self, id: &str) -> Result<Notification, ApiError> {
        self.post_json(&format!("notifications/{id}/read"), &serde_json::json!({}))
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete_notification(&self, id: &str) -> Result<(), ApiError> {
        let response = self
            .authed(
                self.client
                    .delete(self.url(&format!("notifications/{id}"))),
            )
            .send()
            .await?;
        Self::ensure_success(response).await.map(|_| ())
    }
}

impl AvailabilityCheck for ApiClient {
    async fn is_free(&self, date: NaiveDate, time: &str) -> anyhow::Result<bool> {
        self.check_availability(date, time).await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{ApiClient, BookingRequest};

    fn request() -> BookingRequest {
        BookingRequest {
            client_name: "Dana".to_string(),
            client_email: "dana@example.com".to_string(),
            service_id: "svc-1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 10).expect("valid date"),
            time: "10:00".to_string(),
            notes: None,
        }
    }

    #[test]
    fn complete_booking_request_validates() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn validation_names_every_missing_field() {
        let mut req = request();
        req.client_name = "  ".to_string();
        req.client_email = String::new();

        let err = req.validate().expect_err("should fail").to_string();
        assert!(err.contains("client name"));
        assert!(err.contains("client email"));
        assert!(!err.contains("service"));
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = ApiClient::new("https://salon.example/api/", None).expect("client");
        assert_eq!(
            client.url("/services"),
            "https://salon.example/api/services"
        );
        assert_eq!(client.url("services"), "https://salon.example/api/services");
    }
}
