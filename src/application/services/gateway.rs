use async_trait::async_trait;

use crate::domain::{errors::SendError, models::GatewayInstance};

/// Gateway acknowledgement for one accepted message.
#[derive(Debug, Clone)]
pub struct SendReceipt {
    pub message_id: Option<String>,
}

/// Gateway answer for one number-existence check.
#[derive(Debug, Clone)]
pub struct NumberCheck {
    pub exists: bool,
    pub formatted_number: Option<String>,
}

/// The seam to the external messaging gateway. One implementation talks HTTP
/// to real instances; tests script outcomes per call.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    async fn send_text(
        &self,
        instance: &GatewayInstance,
        phone: &str,
        message: &str,
    ) -> Result<SendReceipt, SendError>;

    async fn send_media(
        &self,
        instance: &GatewayInstance,
        phone: &str,
        media_url: &str,
        caption: &str,
    ) -> Result<SendReceipt, SendError>;

    async fn check_number(
        &self,
        instance: &GatewayInstance,
        phone: &str,
    ) -> Result<NumberCheck, SendError>;
}
