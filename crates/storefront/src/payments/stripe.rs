//! Stripe Checkout Sessions client.
//!
//! Sessions are created with a form-encoded `POST /v1/checkout/sessions`
//! authenticated by the secret key as a bearer token. Nothing is retried: a
//! failed call surfaces to the shopper, who may resubmit checkout.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use super::{PaymentError, PaymentGateway, PaymentSession, SessionRequest};
use crate::config::StripeConfig;

/// Client for the Stripe API.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    endpoint: String,
    secret_key: SecretString,
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Http` if the HTTP client cannot be built.
    pub fn new(config: &StripeConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            inner: Arc::new(StripeClientInner {
                client,
                endpoint: format!("{}/v1/checkout/sessions", config.api_base),
                secret_key: config.secret_key.clone(),
            }),
        })
    }
}

impl PaymentGateway for StripeClient {
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn create_session(
        &self,
        request: &SessionRequest,
    ) -> Result<PaymentSession, PaymentError> {
        let form = session_form(request);

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .bearer_auth(self.inner.secret_key.expose_secret())
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&response_text).map_or_else(
                |_| response_text.chars().take(200).collect::<String>(),
                |envelope| {
                    let kind = envelope.error.kind.unwrap_or_else(|| "api_error".to_string());
                    let message = envelope.error.message.unwrap_or_default();
                    format!("{kind}: {message}")
                },
            );
            tracing::error!(
                status = %status,
                message = %message,
                "Stripe rejected checkout session"
            );
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: SessionResponse = serde_json::from_str(&response_text).inspect_err(|e| {
            tracing::error!(
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse Stripe session response"
            );
        })?;

        let redirect_url = session
            .url
            .ok_or_else(|| PaymentError::MissingRedirect(session.id.clone()))?;

        tracing::info!(session_id = %session.id, "Checkout session created");
        Ok(PaymentSession {
            session_id: session.id,
            redirect_url,
        })
    }
}

/// Flatten a session request into Stripe's bracketed form fields.
fn session_form(request: &SessionRequest) -> Vec<(String, String)> {
    let currency = request.currency.gateway_code();
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        ("client_reference_id".to_string(), request.order_id.to_string()),
        ("metadata[orderId]".to_string(), request.order_id.to_string()),
        ("metadata[userId]".to_string(), request.user_id.to_string()),
    ];
    if let Some(email) = &request.customer_email {
        form.push(("customer_email".to_string(), email.clone()));
    }

    for (i, item) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
        form.push((format!("{prefix}[price_data][currency]"), currency.to_string()));
        form.push((
            format!("{prefix}[price_data][unit_amount]"),
            item.unit_amount.to_string(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][name]"),
            item.name.clone(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][description]"),
            item.description.clone(),
        ));
        if let Some(image) = &item.image {
            form.push((
                format!("{prefix}[price_data][product_data][images][0]"),
                image.clone(),
            ));
        }
    }

    form
}

#[cfg(test)]
mod tests {
    use animix_core::{CurrencyCode, OrderId, UserId};

    use super::*;
    use crate::payments::GatewayLineItem;

    fn request() -> SessionRequest {
        SessionRequest {
            line_items: vec![
                GatewayLineItem {
                    name: "Straw Hat Tee".to_string(),
                    description: "Size: M, Color: Black".to_string(),
                    image: Some("https://cdn.animix.shop/hat.jpg".to_string()),
                    unit_amount: 2500,
                    quantity: 2,
                },
                GatewayLineItem {
                    name: "Survey Corps Mug".to_string(),
                    description: "Size: N/A, Color: N/A".to_string(),
                    image: None,
                    unit_amount: 1299,
                    quantity: 1,
                },
            ],
            currency: CurrencyCode::USD,
            success_url: "http://localhost:3000/checkout/success?session_id={CHECKOUT_SESSION_ID}&order_id=7".to_string(),
            cancel_url: "http://localhost:3000/cart".to_string(),
            customer_email: Some("luffy@sunny.sea".to_string()),
            order_id: OrderId::new(7),
            user_id: UserId::new(3),
        }
    }

    fn field<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_session_form_header_fields() {
        let form = session_form(&request());
        assert_eq!(field(&form, "mode"), Some("payment"));
        assert_eq!(field(&form, "metadata[orderId]"), Some("7"));
        assert_eq!(field(&form, "metadata[userId]"), Some("3"));
        assert_eq!(field(&form, "customer_email"), Some("luffy@sunny.sea"));
        assert_eq!(field(&form, "cancel_url"), Some("http://localhost:3000/cart"));
    }

    #[test]
    fn test_session_form_line_items() {
        let form = session_form(&request());
        assert_eq!(field(&form, "line_items[0][quantity]"), Some("2"));
        assert_eq!(field(&form, "line_items[0][price_data][unit_amount]"), Some("2500"));
        assert_eq!(field(&form, "line_items[0][price_data][currency]"), Some("usd"));
        assert_eq!(
            field(&form, "line_items[0][price_data][product_data][images][0]"),
            Some("https://cdn.animix.shop/hat.jpg")
        );
        assert_eq!(
            field(&form, "line_items[1][price_data][product_data][description]"),
            Some("Size: N/A, Color: N/A")
        );
        assert_eq!(
            field(&form, "line_items[1][price_data][product_data][images][0]"),
            None
        );
    }
}
