use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    application::services::gateway::{GatewayClient, NumberCheck, SendReceipt},
    domain::{errors::SendError, models::GatewayInstance},
};

/// Error payload the gateway returns when the underlying WhatsApp session of
/// an instance has dropped. Mapped to the terminal-without-retry path.
const DISCONNECTED_MESSAGE: &str = "WhatsApp disconnected";

/// Talks to the messaging-gateway HTTP API. Every request carries the
/// client-wide timeout; expiry surfaces as `SendError::Timeout` and is
/// retried like any other transient failure.
pub struct HttpGatewayClient {
    http: Client,
}

impl HttpGatewayClient {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent("dispatch-engine/gateway")
            .timeout(timeout)
            .build()?;
        Ok(Self { http })
    }

    async fn post<P: Serialize, R: DeserializeOwned>(
        &self,
        instance: &GatewayInstance,
        path: &str,
        payload: &P,
    ) -> Result<R, SendError> {
        let url = format!("{}/{}", instance.base_url.trim_end_matches('/'), path);
        let response = self
            .http
            .post(url)
            .bearer_auth(&instance.auth_token)
            .json(payload)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SendError::RateLimited);
        }
        if status.is_server_error() {
            return Err(SendError::Gateway(format!("gateway returned {status}")));
        }
        response.json().await.map_err(map_reqwest_error)
    }

    fn check_send_response(response: SendResponse) -> Result<SendReceipt, SendError> {
        if response.success {
            return Ok(SendReceipt {
                message_id: response.id,
            });
        }
        if response.message.as_deref() == Some(DISCONNECTED_MESSAGE) {
            return Err(SendError::Disconnected);
        }
        Err(SendError::Gateway(
            response
                .error
                .or(response.message)
                .unwrap_or_else(|| "unknown gateway error".to_string()),
        ))
    }
}

#[async_trait]
impl GatewayClient for HttpGatewayClient {
    async fn send_text(
        &self,
        instance: &GatewayInstance,
        phone: &str,
        message: &str,
    ) -> Result<SendReceipt, SendError> {
        let response: SendResponse = self
            .post(instance, "send/text", &TextPayload { phone, message })
            .await?;
        Self::check_send_response(response)
    }

    async fn send_media(
        &self,
        instance: &GatewayInstance,
        phone: &str,
        media_url: &str,
        caption: &str,
    ) -> Result<SendReceipt, SendError> {
        let response: SendResponse = self
            .post(
                instance,
                "send/file",
                &FilePayload {
                    phone,
                    url: media_url,
                    caption,
                },
            )
            .await?;
        Self::check_send_response(response)
    }

    async fn check_number(
        &self,
        instance: &GatewayInstance,
        phone: &str,
    ) -> Result<NumberCheck, SendError> {
        let response: CheckResponse = self
            .post(instance, "check-number", &CheckPayload { phone })
            .await?;
        Ok(NumberCheck {
            exists: response.exists,
            formatted_number: response.formatted_number,
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> SendError {
    if err.is_timeout() {
        SendError::Timeout
    } else {
        SendError::Network(err.to_string())
    }
}

#[derive(Serialize)]
struct TextPayload<'a> {
    phone: &'a str,
    message: &'a str,
}

#[derive(Serialize)]
struct FilePayload<'a> {
    phone: &'a str,
    url: &'a str,
    caption: &'a str,
}

#[derive(Serialize)]
struct CheckPayload<'a> {
    phone: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    success: bool,
    id: Option<String>,
    error: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    exists: bool,
    #[serde(rename = "formattedNumber")]
    formatted_number: Option<String>,
}
