//! Direct messaging inbox

use super::{ClientError, DevTrackClient};
use crate::types::{
    Conversation, Message, SendMessageRequest, StartConversationRequest, UserSummary,
};
use devtrack_core::UserId;
use reqwest::Method;

impl DevTrackClient {
    pub async fn list_conversations(&self) -> Result<Vec<Conversation>, ClientError> {
        let request = self.request(Method::GET, "/api/messaging/conversations/");
        self.execute(request).await
    }

    pub async fn get_conversation(&self, id: u64) -> Result<Conversation, ClientError> {
        let request = self.request(Method::GET, &format!("/api/messaging/conversations/{id}/"));
        self.execute(request).await
    }

    /// Open (or reuse) a conversation with another user
    pub async fn start_conversation(&self, recipient_id: UserId) -> Result<Conversation, ClientError> {
        let request = self
            .request(Method::POST, "/api/messaging/conversations/start/")
            .json(&StartConversationRequest { recipient_id });
        self.execute(request).await
    }

    /// Mark every message from the other participants as read
    pub async fn mark_conversation_read(&self, id: u64) -> Result<(), ClientError> {
        let request = self.request(
            Method::POST,
            &format!("/api/messaging/conversations/{id}/read_all/"),
        );
        self.execute_empty(request).await
    }

    pub async fn list_messages(&self, conversation_id: u64) -> Result<Vec<Message>, ClientError> {
        let request = self
            .request(Method::GET, "/api/messaging/messages/")
            .query(&[("conversation", conversation_id)]);
        self.execute(request).await
    }

    pub async fn send_message(
        &self,
        conversation_id: u64,
        content: &str,
    ) -> Result<Message, ClientError> {
        let request = self
            .request(Method::POST, "/api/messaging/messages/")
            .json(&SendMessageRequest {
                conversation_id,
                content: content.to_string(),
            });
        self.execute(request).await
    }

    pub async fn search_users(&self, query: &str) -> Result<Vec<UserSummary>, ClientError> {
        let request = self
            .request(Method::GET, "/api/messaging/users/")
            .query(&[("search", query)]);
        self.execute(request).await
    }
}
