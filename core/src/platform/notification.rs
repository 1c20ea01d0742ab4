//! Liveness signal model
//!
//! The supervisor never renders anything itself; it hands these descriptors
//! to the platform's `NotificationSurface`.

use serde::{Deserialize, Serialize};

/// Channel importance (mirrors the Android `IMPORTANCE_*` levels)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
pub enum Importance {
    Min,
    #[default]
    Low,
    Normal,
    High,
}

/// Notification priority for platforms without channels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
pub enum Priority {
    Min,
    #[default]
    Low,
    Normal,
    High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
pub enum Category {
    #[default]
    Service,
    Status,
    Progress,
}

/// Notification channel the liveness signal is posted into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct NotificationChannel {
    pub id: String,
    pub name: String,
    pub description: String,
    pub importance: Importance,
    pub show_badge: bool,
}

/// The ongoing notification that accompanies a running service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct NotificationDescriptor {
    pub id: u32,
    pub channel_id: String,
    pub title: String,
    pub text: String,
    /// Ongoing notifications cannot be swiped away by the user
    pub ongoing: bool,
    pub priority: Priority,
    pub category: Category,
}

impl NotificationDescriptor {
    pub fn is_service_signal(&self) -> bool {
        self.ongoing && self.category == Category::Service
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_low_key() {
        assert_eq!(Importance::default(), Importance::Low);
        assert_eq!(Priority::default(), Priority::Low);
        assert_eq!(Category::default(), Category::Service);
    }

    #[test]
    fn test_service_signal() {
        let mut notification = NotificationDescriptor {
            id: 1001,
            channel_id: "KeepAliveChannel".to_string(),
            title: "App Running".to_string(),
            text: "App is running in background".to_string(),
            ongoing: true,
            priority: Priority::Low,
            category: Category::Service,
        };
        assert!(notification.is_service_signal());

        notification.ongoing = false;
        assert!(!notification.is_service_signal());
    }
}
