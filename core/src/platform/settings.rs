//! Keep-alive settings
//!
//! Settings that control the supervisor and its host-side helpers:
//! - Service name handed to the OS service manager
//! - Notification channel and liveness signal content
//! - Heartbeat cadence and the extended-background threshold

use crate::platform::notification::{
    Category, Importance, NotificationChannel, NotificationDescriptor, Priority,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Errors that can occur during settings validation
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingsError {
    #[error("Invalid service name: cannot be empty")]
    EmptyServiceName,

    #[error("Invalid channel id: cannot be empty")]
    EmptyChannelId,

    #[error("Invalid notification title: cannot be empty")]
    EmptyNotificationTitle,

    #[error("Invalid heartbeat interval: must be >= 1 second, got {0}")]
    InvalidHeartbeatInterval(u64),

    #[error("Invalid background threshold: must be >= 1 second, got {0}")]
    InvalidBackgroundThreshold(u64),
}

// ============================================================================
// SECTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSettings {
    pub id: String,
    pub name: String,
    pub description: String,
    pub importance: Importance,
    pub show_badge: bool,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            id: "KeepAliveChannel".to_string(),
            name: "Keep Alive Service".to_string(),
            description: "Keeps the app running in background".to_string(),
            importance: Importance::Low,
            show_badge: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub id: u32,
    pub title: String,
    pub text: String,
    pub priority: Priority,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            id: 1001,
            title: "App Running".to_string(),
            text: "App is running in background".to_string(),
            priority: Priority::Low,
        }
    }
}

// ============================================================================
// KEEP-ALIVE SETTINGS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepAliveSettings {
    /// Name under which the service is registered with the OS
    pub service_name: String,

    pub channel: ChannelSettings,

    pub notification: NotificationSettings,

    /// Run the periodic keep-alive heartbeat on the host side
    pub heartbeat_enabled: bool,

    /// Seconds between heartbeat re-assertions of `start()`
    pub heartbeat_interval_secs: u64,

    /// A return to the foreground after this many seconds in background
    /// counts as an extended absence
    pub background_threshold_secs: u64,
}

impl Default for KeepAliveSettings {
    fn default() -> Self {
        Self {
            service_name: "KeepAliveService".to_string(),
            channel: ChannelSettings::default(),
            notification: NotificationSettings::default(),
            heartbeat_enabled: true,
            heartbeat_interval_secs: 15,
            background_threshold_secs: 120,
        }
    }
}

impl KeepAliveSettings {
    /// Validate all settings
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.service_name.trim().is_empty() {
            return Err(SettingsError::EmptyServiceName);
        }

        if self.channel.id.trim().is_empty() {
            return Err(SettingsError::EmptyChannelId);
        }

        if self.notification.title.trim().is_empty() {
            return Err(SettingsError::EmptyNotificationTitle);
        }

        if self.heartbeat_interval_secs == 0 {
            return Err(SettingsError::InvalidHeartbeatInterval(
                self.heartbeat_interval_secs,
            ));
        }

        if self.background_threshold_secs == 0 {
            return Err(SettingsError::InvalidBackgroundThreshold(
                self.background_threshold_secs,
            ));
        }

        Ok(())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn background_threshold(&self) -> Duration {
        Duration::from_secs(self.background_threshold_secs)
    }

    /// Channel the liveness signal is posted into
    pub fn notification_channel(&self) -> NotificationChannel {
        NotificationChannel {
            id: self.channel.id.clone(),
            name: self.channel.name.clone(),
            description: self.channel.description.clone(),
            importance: self.channel.importance,
            show_badge: self.channel.show_badge,
        }
    }

    /// The ongoing liveness notification
    pub fn liveness_notification(&self) -> NotificationDescriptor {
        NotificationDescriptor {
            id: self.notification.id,
            channel_id: self.channel.id.clone(),
            title: self.notification.title.clone(),
            text: self.notification.text.clone(),
            ongoing: true,
            priority: self.notification.priority,
            category: Category::Service,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_valid() {
        let settings = KeepAliveSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.heartbeat_interval(), Duration::from_secs(15));
        assert_eq!(settings.background_threshold(), Duration::from_secs(120));
    }

    #[test]
    fn test_empty_channel_id_invalid() {
        let mut settings = KeepAliveSettings::default();
        settings.channel.id = "  ".to_string();
        assert_eq!(settings.validate(), Err(SettingsError::EmptyChannelId));
    }

    #[test]
    fn test_empty_service_name_invalid() {
        let settings = KeepAliveSettings {
            service_name: String::new(),
            ..Default::default()
        };
        assert_eq!(settings.validate(), Err(SettingsError::EmptyServiceName));
    }

    #[test]
    fn test_zero_intervals_invalid() {
        let settings = KeepAliveSettings {
            heartbeat_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(
            settings.validate(),
            Err(SettingsError::InvalidHeartbeatInterval(0))
        );

        let settings = KeepAliveSettings {
            background_threshold_secs: 0,
            ..Default::default()
        };
        assert_eq!(
            settings.validate(),
            Err(SettingsError::InvalidBackgroundThreshold(0))
        );
    }

    #[test]
    fn test_notification_uses_channel() {
        let settings = KeepAliveSettings::default();
        let notification = settings.liveness_notification();
        assert_eq!(notification.id, 1001);
        assert_eq!(notification.channel_id, settings.channel.id);
        assert!(notification.is_service_signal());

        let channel = settings.notification_channel();
        assert_eq!(channel.id, "KeepAliveChannel");
        assert_eq!(channel.importance, Importance::Low);
        assert!(!channel.show_badge);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings =
            KeepAliveSettings::from_json(r#"{"heartbeat_interval_secs": 30}"#).unwrap();
        assert_eq!(settings.heartbeat_interval_secs, 30);
        assert_eq!(settings.channel, ChannelSettings::default());
        assert_eq!(settings.service_name, "KeepAliveService");
    }

    #[test]
    fn test_json_preserves_custom_values() {
        let mut settings = KeepAliveSettings::default();
        settings.notification.title = "Sync active".to_string();
        settings.heartbeat_enabled = false;

        let restored = KeepAliveSettings::from_json(&settings.to_json().unwrap()).unwrap();
        assert_eq!(restored, settings);
    }
}
