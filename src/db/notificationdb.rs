// db/notificationdb.rs
use async_trait::async_trait;
use sqlx::Error;

use super::db::DBClient;
use crate::models::notificationmodel::*;

#[async_trait]
pub trait NotificationExt {
    async fn store_notification(&self, new: NewNotification) -> Result<Notification, Error>;
}

#[async_trait]
impl NotificationExt for DBClient {
    async fn store_notification(&self, new: NewNotification) -> Result<Notification, Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, notification_type, message, ref_kind, ref_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(new.user_id)
        .bind(new.notification_type.to_str())
        .bind(&new.message)
        .bind(new.reference.map(|r| r.kind))
        .bind(new.reference.map(|r| r.id))
        .fetch_one(&self.pool)
        .await
    }
}
