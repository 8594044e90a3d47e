use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

const STRIPE_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("API error (status {status}): {body}")]
    ApiError { status: u16, body: String },
    #[error("Unexpected response: {0}")]
    Decode(String),
}

#[derive(Clone, Debug)]
pub struct PaymentConfig {
    pub secret_key: String,
    pub currency: String,
    pub frontend_base_url: String,
    pub api_base: String,
}

impl PaymentConfig {
    /// `None` when no processor key is configured.
    pub fn from_env() -> Option<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY").ok()?;

        Some(Self {
            secret_key,
            currency: std::env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "inr".to_string()),
            frontend_base_url: std::env::var("FRONTEND_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            api_base: std::env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| STRIPE_API_BASE.to_string()),
        })
    }
}

/// What the processor needs to open a hosted checkout page.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub booking_id: Uuid,
    pub amount_minor: i64,
    /// Shown as the product name; the turf's name.
    pub product_name: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct PaymentSession {
    pub session_id: String,
    pub redirect_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionMetadata {
    pub booking_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
    pub payment_status: String,
    #[serde(default)]
    pub metadata: SessionMetadata,
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }

    pub fn booking_id(&self) -> Option<Uuid> {
        self.metadata
            .booking_id
            .as_deref()
            .and_then(|id| Uuid::parse_str(id).ok())
    }
}

/// Form-encodes key/value pairs the way the processor's API expects.
fn form_body(fields: &[(&str, String)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[derive(Clone)]
pub struct PaymentService {
    config: PaymentConfig,
    client: reqwest::Client,
}

impl PaymentService {
    pub fn new(config: PaymentConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn checkout_fields(&self, request: &CheckoutRequest) -> Vec<(&'static str, String)> {
        let frontend = self.config.frontend_base_url.trim_end_matches('/');
        vec![
            ("mode", "payment".to_string()),
            ("payment_method_types[0]", "card".to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", self.config.currency.clone()),
            ("line_items[0][price_data][unit_amount]", request.amount_minor.to_string()),
            ("line_items[0][price_data][product_data][name]", request.product_name.clone()),
            (
                "line_items[0][price_data][product_data][description]",
                request.description.clone(),
            ),
            (
                "success_url",
                format!(
                    "{frontend}/success?bookingId={}&session_id={{CHECKOUT_SESSION_ID}}",
                    request.booking_id
                ),
            ),
            ("cancel_url", format!("{frontend}/")),
            ("metadata[booking_id]", request.booking_id.to_string()),
        ]
    }

    pub async fn create_session(&self, request: &CheckoutRequest) -> Result<PaymentSession, PaymentError> {
        let url = format!("{}/v1/checkout/sessions", self.config.api_base);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.secret_key)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(form_body(&self.checkout_fields(request)))
            .send()
            .await
            .map_err(|e| PaymentError::Network(e.to_string()))?;

        let session = Self::decode(response).await?;
        let redirect_url = session
            .url
            .ok_or_else(|| PaymentError::Decode("checkout session has no url".to_string()))?;

        info!(booking_id = %request.booking_id, session_id = %session.id, "Checkout session created");
        Ok(PaymentSession {
            session_id: session.id,
            redirect_url,
        })
    }

    pub async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, PaymentError> {
        let url = format!(
            "{}/v1/checkout/sessions/{}",
            self.config.api_base,
            urlencoding::encode(session_id)
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.secret_key)
            .send()
            .await
            .map_err(|e| PaymentError::Network(e.to_string()))?;

        Self::decode(response).await
    }

    async fn decode(response: reqwest::Response) -> Result<CheckoutSession, PaymentError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::ApiError { status, body });
        }

        response
            .json::<CheckoutSession>()
            .await
            .map_err(|e| PaymentError::Decode(e.to_string()))
    }
}
