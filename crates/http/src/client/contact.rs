//! Public contact form

use super::{ClientError, DevTrackClient};
use crate::types::{ContactMessage, MessageResponse};
use reqwest::Method;

impl DevTrackClient {
    /// Send the contact form. Anonymous; the captcha token is checked by the backend.
    pub async fn send_contact_message(
        &self,
        message: &ContactMessage,
    ) -> Result<MessageResponse, ClientError> {
        if message.message.trim().is_empty() {
            return Err(ClientError::Validation("message must not be empty".into()));
        }
        let request = self
            .request(Method::POST, "/api/auth/contact/")
            .json(message);
        self.execute_public(request).await
    }
}
