//! Platform-version policy for elevated background execution
//!
//! Every decision here is a pure function of the platform API level, so
//! callers can evaluate it against whatever version the OS reports at the
//! moment of the call.

use serde::{Deserialize, Serialize};

/// Platform API level (Android SDK_INT or an equivalent capability version)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ApiLevel(pub u32);

impl ApiLevel {
    pub const fn new(level: u32) -> Self {
        Self(level)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for ApiLevel {
    fn from(level: u32) -> Self {
        Self(level)
    }
}

impl std::fmt::Display for ApiLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "API {}", self.0)
    }
}

/// First level that requires a foreground-service type declaration (Android 14).
/// The supervisor declares no type, so it refuses to go foreground from here on.
pub const FOREGROUND_SERVICE_TYPE_REQUIRED: ApiLevel = ApiLevel(34);

/// First level with `startForegroundService` (Android 8.0)
pub const FOREGROUND_SERVICE_MIN: ApiLevel = ApiLevel(26);

/// First level with notification channels (Android 8.0)
pub const NOTIFICATION_CHANNELS_MIN: ApiLevel = ApiLevel(26);

/// Whether the platform lets this process run a foreground service.
pub fn policy_allows_foreground(level: ApiLevel) -> bool {
    level < FOREGROUND_SERVICE_TYPE_REQUIRED
}

/// Whether notifications must be posted into a pre-created channel
pub fn supports_notification_channels(level: ApiLevel) -> bool {
    level >= NOTIFICATION_CHANNELS_MIN
}

/// How the service is registered with the OS service manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, uniffi::Enum)]
pub enum RegistrationMode {
    /// Foreground-service mode: elevated privilege, requires a liveness signal
    Foreground,
    /// Plain started service: best effort, the OS may reclaim it at will
    Background,
}

impl RegistrationMode {
    /// Strongest mode the platform supports at `level`.
    pub fn strongest_for(level: ApiLevel) -> Self {
        if level >= FOREGROUND_SERVICE_MIN {
            Self::Foreground
        } else {
            Self::Background
        }
    }
}

impl std::fmt::Display for RegistrationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Foreground => write!(f, "Foreground"),
            Self::Background => write!(f, "Background"),
        }
    }
}
