// Mobile bridge for UniFFI bindings
//
// The host application shell (React Native module, Kotlin service, Swift app
// delegate) talks to the supervisor only through `KeepAliveModule`. Platform
// code implements `HostPlatform` so the supervisor can reach the OS.

use crate::platform::notification::{NotificationChannel, NotificationDescriptor};
use crate::platform::os::{NotificationSurface, OsError, ServiceDescriptor, ServiceManager};
use crate::platform::policy::ApiLevel;
use crate::platform::service::{
    LivenessSupervisor, ServicePhase, StartDisposition, SupervisorError,
};
use crate::platform::settings::KeepAliveSettings;
use std::sync::Arc;
use thiserror::Error;

/// Error code for settings that fail to parse or validate
pub const CONFIG_ERROR_CODE: &str = "CONFIG_ERROR";

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Rejection delivered to the host shell (a promise reject with code + message)
#[derive(Debug, Clone, PartialEq, Eq, Error, uniffi::Error)]
pub enum BridgeError {
    #[error("{code}: {message}")]
    Rejected { code: String, message: String },
}

impl BridgeError {
    pub fn code(&self) -> &str {
        match self {
            Self::Rejected { code, .. } => code,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Rejected { message, .. } => message,
        }
    }
}

impl From<SupervisorError> for BridgeError {
    fn from(err: SupervisorError) -> Self {
        Self::Rejected {
            code: err.code().to_string(),
            message: err.message().to_string(),
        }
    }
}

/// Failure thrown by platform code inside a `HostPlatform` callback
#[derive(Debug, Clone, PartialEq, Eq, Error, uniffi::Error)]
pub enum PlatformCallError {
    #[error("{message}")]
    Failed { message: String },
}

impl From<uniffi::UnexpectedUniFFICallbackError> for PlatformCallError {
    fn from(err: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::Failed {
            message: err.reason,
        }
    }
}

impl From<PlatformCallError> for OsError {
    fn from(err: PlatformCallError) -> Self {
        match err {
            PlatformCallError::Failed { message } => OsError::new(message),
        }
    }
}

// ============================================================================
// PLATFORM CALLBACKS
// ============================================================================

/// Implemented by Kotlin/Swift platform code
#[uniffi::export(with_foreign)]
pub trait HostPlatform: Send + Sync {
    /// Android `Build.VERSION.SDK_INT` or equivalent
    fn platform_version(&self) -> u32;
    fn register_service(&self, descriptor: ServiceDescriptor) -> Result<(), PlatformCallError>;
    fn unregister_service(&self) -> Result<(), PlatformCallError>;
    fn create_channel(&self, channel: NotificationChannel) -> Result<(), PlatformCallError>;
    fn post_notification(
        &self,
        notification: NotificationDescriptor,
    ) -> Result<(), PlatformCallError>;
    fn withdraw_notification(&self, notification_id: u32) -> Result<(), PlatformCallError>;
}

/// Presents a foreign `HostPlatform` as the supervisor's OS collaborators
struct HostAdapter {
    platform: Arc<dyn HostPlatform>,
}

impl ServiceManager for HostAdapter {
    fn platform_version(&self) -> ApiLevel {
        ApiLevel(self.platform.platform_version())
    }

    fn register_service(&self, descriptor: &ServiceDescriptor) -> Result<(), OsError> {
        Ok(self.platform.register_service(descriptor.clone())?)
    }

    fn unregister_service(&self) -> Result<(), OsError> {
        Ok(self.platform.unregister_service()?)
    }
}

impl NotificationSurface for HostAdapter {
    fn create_channel(&self, channel: &NotificationChannel) -> Result<(), OsError> {
        Ok(self.platform.create_channel(channel.clone())?)
    }

    fn post(&self, notification: &NotificationDescriptor) -> Result<(), OsError> {
        Ok(self.platform.post_notification(notification.clone())?)
    }

    fn withdraw(&self, notification_id: u32) -> Result<(), OsError> {
        Ok(self.platform.withdraw_notification(notification_id)?)
    }
}

// ============================================================================
// KEEP-ALIVE MODULE
// ============================================================================

/// Host-facing keep-alive module
///
/// Mirrors the two-call native module the app shell expects
/// (`startService` / `stopService`) plus the OS lifecycle hooks the platform
/// service and boot receiver forward.
#[derive(uniffi::Object)]
pub struct KeepAliveModule {
    supervisor: Arc<LivenessSupervisor>,
}

#[uniffi::export]
impl KeepAliveModule {
    #[uniffi::constructor]
    pub fn new(platform: Arc<dyn HostPlatform>) -> Arc<Self> {
        init_logging();
        let adapter = Arc::new(HostAdapter { platform });
        Arc::new(Self {
            supervisor: Arc::new(LivenessSupervisor::with_default_settings(
                adapter.clone(),
                adapter,
            )),
        })
    }

    /// Build with settings given as JSON (missing fields take defaults)
    #[uniffi::constructor]
    pub fn with_settings_json(
        platform: Arc<dyn HostPlatform>,
        settings_json: String,
    ) -> Result<Arc<Self>, BridgeError> {
        init_logging();
        let settings = KeepAliveSettings::from_json(&settings_json)
            .map_err(|e| config_error(e.to_string()))?;
        let adapter = Arc::new(HostAdapter { platform });
        let supervisor = LivenessSupervisor::new(adapter.clone(), adapter, settings)
            .map_err(|e| config_error(e.to_string()))?;

        Ok(Arc::new(Self {
            supervisor: Arc::new(supervisor),
        }))
    }

    /// Resolves "Service started" or "Skipped on Android 14+"
    pub fn start_service(&self) -> Result<String, BridgeError> {
        match self.supervisor.start() {
            Ok(ack) => Ok(ack.message().to_string()),
            Err(e) => {
                tracing::error!("Failed to start keep-alive service: {}", e);
                Err(e.into())
            }
        }
    }

    /// Resolves "Service stopped"
    pub fn stop_service(&self) -> Result<String, BridgeError> {
        match self.supervisor.stop() {
            Ok(ack) => Ok(ack.message().to_string()),
            Err(e) => {
                tracing::error!("Failed to stop keep-alive service: {}", e);
                Err(e.into())
            }
        }
    }

    pub fn on_task_removed(&self) {
        self.supervisor.on_task_removed();
    }

    /// Boot receiver entry point. Never fails.
    pub fn on_boot_completed(&self) {
        self.supervisor.on_boot_completed();
    }

    pub fn on_start_command(&self) -> StartDisposition {
        self.supervisor.on_start_command()
    }

    pub fn on_create(&self) {
        self.supervisor.on_create();
    }

    pub fn on_destroy(&self) {
        self.supervisor.on_destroy();
    }

    pub fn phase(&self) -> ServicePhase {
        self.supervisor.phase()
    }

    pub fn policy_allows_foreground(&self) -> bool {
        self.supervisor.policy_allows_foreground()
    }
}

impl KeepAliveModule {
    /// Wrap an existing supervisor (Rust hosts and tests)
    pub fn with_supervisor(supervisor: Arc<LivenessSupervisor>) -> Self {
        Self { supervisor }
    }

    pub fn supervisor(&self) -> Arc<LivenessSupervisor> {
        self.supervisor.clone()
    }
}

fn config_error(message: String) -> BridgeError {
    BridgeError::Rejected {
        code: CONFIG_ERROR_CODE.to_string(),
        message,
    }
}

fn init_logging() {
    // Initialize tracing (idempotent)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

// ============================================================================
// TESTS
// ============================================================================
