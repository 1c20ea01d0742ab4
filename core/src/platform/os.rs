//! OS collaborator interfaces
//!
//! Platform code (Android/iOS, or the desktop simulator) implements these;
//! the supervisor only ever talks to the OS through them.

use crate::platform::notification::{NotificationChannel, NotificationDescriptor};
use crate::platform::policy::{ApiLevel, RegistrationMode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure raised by an OS call. The message is forwarded to the host verbatim.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct OsError {
    pub message: String,
}

impl OsError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// What the supervisor asks the OS service manager to run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct ServiceDescriptor {
    pub name: String,
    pub mode: RegistrationMode,
    /// Notification that accompanies the service in foreground mode
    pub notification_id: u32,
}

/// OS process/service manager
#[cfg_attr(test, mockall::automock)]
pub trait ServiceManager: Send + Sync {
    /// Platform capability version, queried at evaluation time
    fn platform_version(&self) -> ApiLevel;

    fn register_service(&self, descriptor: &ServiceDescriptor) -> Result<(), OsError>;

    /// Must be a no-op when nothing is registered
    fn unregister_service(&self) -> Result<(), OsError>;
}

/// OS notification surface
#[cfg_attr(test, mockall::automock)]
pub trait NotificationSurface: Send + Sync {
    fn create_channel(&self, channel: &NotificationChannel) -> Result<(), OsError>;

    fn post(&self, notification: &NotificationDescriptor) -> Result<(), OsError>;

    fn withdraw(&self, notification_id: u32) -> Result<(), OsError>;
}
