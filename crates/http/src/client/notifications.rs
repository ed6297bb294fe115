//! Notification inbox

use super::{ClientError, DevTrackClient};
use crate::types::{MarkAllReadResponse, Notification, NotificationReadUpdate, UnreadCount};
use reqwest::Method;

impl DevTrackClient {
    pub async fn list_notifications(&self) -> Result<Vec<Notification>, ClientError> {
        let request = self.request(Method::GET, "/api/courses/notifications/");
        self.execute(request).await
    }

    /// Number of unread notifications, polled by the notification bell
    pub async fn unread_notifications(&self) -> Result<u32, ClientError> {
        let request = self.request(Method::GET, "/api/courses/notifications/unread-count/");
        let count: UnreadCount = self.execute(request).await?;
        Ok(count.unread)
    }

    pub async fn mark_notification_read(&self, id: u64) -> Result<(), ClientError> {
        let request = self.request(
            Method::POST,
            &format!("/api/courses/notifications/{id}/mark-read/"),
        );
        self.execute_empty(request).await
    }

    /// Mark one notification read or unread
    pub async fn set_notification_read(
        &self,
        id: u64,
        is_read: bool,
    ) -> Result<Notification, ClientError> {
        let request = self
            .request(Method::PATCH, &format!("/api/courses/notifications/{id}/"))
            .json(&NotificationReadUpdate { is_read });
        self.execute(request).await
    }

    /// Returns how many notifications were updated
    pub async fn mark_all_notifications_read(&self) -> Result<u32, ClientError> {
        let request = self.request(Method::POST, "/api/courses/notifications/mark-all-read/");
        let response: MarkAllReadResponse = self.execute(request).await?;
        Ok(response.updated)
    }
}
