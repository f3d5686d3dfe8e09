//! Unread notification tracking against the server's "cleared at" mark.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ctzn_types::Notification;

use crate::api::ApiResult;

#[async_trait]
pub trait NotificationSource: Send + Sync {
    /// When the user last cleared notifications, if ever
    async fn get_cleared_at(&self) -> ApiResult<Option<DateTime<Utc>>>;

    /// Mark everything up to now as read
    async fn update_cleared_at(&self) -> ApiResult<()>;

    /// Notifications created after `after`, newest first
    async fn list_notifications(&self, after: Option<DateTime<Utc>>) -> ApiResult<Vec<Notification>>;
}

/// Number of notifications created strictly after `cleared_at`
pub fn count_unread(notifications: &[Notification], cleared_at: Option<DateTime<Utc>>) -> usize {
    match cleared_at {
        Some(mark) => notifications.iter().filter(|n| n.created_at > mark).count(),
        None => notifications.len(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationsState {
    pub cleared_at: Option<DateTime<Utc>>,
    pub unread: usize,
}

impl NotificationsState {
    pub fn title(&self) -> String {
        if self.unread > 0 {
            format!("({}) Notifications | CTZN", self.unread)
        } else {
            "Notifications | CTZN".to_string()
        }
    }

    /// Fetch the cleared-at mark and unread count. When the view has focus the
    /// server mark is advanced, but the local mark is kept so the unread
    /// notifications stay distinguishable until the next load.
    pub async fn load(&mut self, source: &dyn NotificationSource, has_focus: bool) -> ApiResult<()> {
        let cleared_at = source.get_cleared_at().await?;
        let notifications = source.list_notifications(cleared_at).await?;
        self.cleared_at = cleared_at;
        self.unread = count_unread(&notifications, cleared_at);
        log::debug!(
            "notifications loaded: {} unread since {:?}",
            self.unread,
            cleared_at
        );
        if has_focus {
            source.update_cleared_at().await?;
        }
        Ok(())
    }

    pub fn on_unread_changed(&mut self, count: usize) {
        self.unread = count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ctzn_types::Author;
    use std::sync::Mutex;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 1, hour, 0, 0).unwrap()
    }

    fn notification(key: &str, hour: u32) -> Notification {
        Notification {
            key: key.to_string(),
            created_at: at(hour),
            author: Author {
                user_id: "bob".to_string(),
                display_name: "Bob".to_string(),
            },
            subject_url: format!("hyper://bob/ctzn.network/post/{}", key),
        }
    }

    struct FakeNotifications {
        cleared_at: Mutex<Option<DateTime<Utc>>>,
        items: Vec<Notification>,
        updates: Mutex<usize>,
    }

    #[async_trait]
    impl NotificationSource for FakeNotifications {
        async fn get_cleared_at(&self) -> ApiResult<Option<DateTime<Utc>>> {
            Ok(*self.cleared_at.lock().unwrap())
        }

        async fn update_cleared_at(&self) -> ApiResult<()> {
            *self.updates.lock().unwrap() += 1;
            *self.cleared_at.lock().unwrap() = Some(at(23));
            Ok(())
        }

        async fn list_notifications(&self, _after: Option<DateTime<Utc>>) -> ApiResult<Vec<Notification>> {
            Ok(self.items.clone())
        }
    }

    #[test]
    fn test_count_unread_is_strictly_after() {
        let items = vec![notification("a", 9), notification("b", 10), notification("c", 11)];
        assert_eq!(count_unread(&items, None), 3);
        assert_eq!(count_unread(&items, Some(at(10))), 1);
        assert_eq!(count_unread(&items, Some(at(12))), 0);
    }

    #[test]
    fn test_title() {
        let mut state = NotificationsState::default();
        assert_eq!(state.title(), "Notifications | CTZN");
        state.on_unread_changed(4);
        assert_eq!(state.title(), "(4) Notifications | CTZN");
    }

    #[tokio::test]
    async fn test_load_with_focus_advances_server_mark() {
        let source = FakeNotifications {
            cleared_at: Mutex::new(Some(at(9))),
            items: vec![notification("a", 9), notification("b", 10)],
            updates: Mutex::new(0),
        };
        let mut state = NotificationsState::default();

        state.load(&source, false).await.unwrap();
        assert_eq!(state.unread, 1);
        assert_eq!(*source.updates.lock().unwrap(), 0);

        state.load(&source, true).await.unwrap();
        assert_eq!(state.cleared_at, Some(at(9)));
        assert_eq!(*source.updates.lock().unwrap(), 1);

        state.load(&source, false).await.unwrap();
        assert_eq!(state.unread, 0);
    }
}
