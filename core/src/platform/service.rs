//! Liveness supervisor
//!
//! Owns the lifecycle state machine of the background keep-alive service.
//! Platform code creates a `LivenessSupervisor`, forwards host start/stop
//! requests to it, and routes OS lifecycle callbacks (task removed, boot
//! completed, start command, create, destroy) into it.
//!
//! Every operation takes the same lock for the whole transition, OS calls
//! included, so interleaved requests and callbacks are applied one at a time.

use crate::platform::os::{NotificationSurface, OsError, ServiceDescriptor, ServiceManager};
use crate::platform::policy::{self, ApiLevel, RegistrationMode};
use crate::platform::settings::{KeepAliveSettings, SettingsError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Error code reported to the host shell for OS registration failures
pub const SERVICE_ERROR_CODE: &str = "SERVICE_ERROR";

/// Errors reported by supervisor requests
///
/// Policy denial is deliberately absent: it is an `Ack::Skipped` outcome.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupervisorError {
    /// OS registration or unregistration threw; message is the OS's, verbatim
    #[error("{message}")]
    Service { message: String },
}

impl SupervisorError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Service { .. } => SERVICE_ERROR_CODE,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Service { message } => message,
        }
    }
}

impl From<OsError> for SupervisorError {
    fn from(err: OsError) -> Self {
        Self::Service {
            message: err.message,
        }
    }
}

// ============================================================================
// ENUMS & TYPES
// ============================================================================

pub const MSG_SERVICE_STARTED: &str = "Service started";
pub const MSG_SERVICE_SKIPPED: &str = "Skipped on Android 14+";
pub const MSG_SERVICE_STOPPED: &str = "Service stopped";

/// Lifecycle phase of the keep-alive service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, uniffi::Enum)]
pub enum ServicePhase {
    Stopped,
    Starting,
    Running,
    /// Platform policy forbids foreground execution
    Denied,
}

impl std::fmt::Display for ServicePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "Stopped"),
            Self::Starting => write!(f, "Starting"),
            Self::Running => write!(f, "Running"),
            Self::Denied => write!(f, "Denied"),
        }
    }
}

/// Successful outcome of a start/stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ack {
    Started,
    /// Policy denied foreground execution; nothing was registered
    Skipped,
    Stopped,
}

impl Ack {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    /// Message resolved to the host shell
    pub fn message(&self) -> &'static str {
        match self {
            Self::Started => MSG_SERVICE_STARTED,
            Self::Skipped => MSG_SERVICE_SKIPPED,
            Self::Stopped => MSG_SERVICE_STOPPED,
        }
    }
}

impl std::fmt::Display for Ack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Answer to an OS start command: whether the OS should recreate the
/// service after killing the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
pub enum StartDisposition {
    Sticky,
    NotSticky,
}

/// Supervisor-owned service state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceState {
    pub phase: ServicePhase,
    /// Result of the most recent policy evaluation
    pub policy_allows_foreground: bool,
    pub last_error: Option<SupervisorError>,
    /// An OS service registration is held
    pub registered: bool,
    /// The liveness notification is posted
    pub signal_visible: bool,
    pub channel_created: bool,
    /// Successful registration calls over the supervisor's lifetime
    pub registrations: u64,
}

impl ServiceState {
    fn new() -> Self {
        Self {
            phase: ServicePhase::Stopped,
            policy_allows_foreground: true,
            last_error: None,
            registered: false,
            signal_visible: false,
            channel_created: false,
            registrations: 0,
        }
    }

    /// Signal visibility agrees with the phase
    pub fn is_consistent(&self) -> bool {
        match self.phase {
            ServicePhase::Running => self.signal_visible,
            ServicePhase::Denied => !self.registered && !self.signal_visible,
            ServicePhase::Stopped => !self.signal_visible,
            ServicePhase::Starting => true,
        }
    }
}

impl Default for ServiceState {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// LIVENESS SUPERVISOR
// ============================================================================

pub struct LivenessSupervisor {
    settings: KeepAliveSettings,
    services: Arc<dyn ServiceManager>,
    notifications: Arc<dyn NotificationSurface>,
    state: Mutex<ServiceState>,
}

impl LivenessSupervisor {
    /// Create a supervisor with validated settings
    pub fn new(
        services: Arc<dyn ServiceManager>,
        notifications: Arc<dyn NotificationSurface>,
        settings: KeepAliveSettings,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;

        Ok(Self {
            settings,
            services,
            notifications,
            state: Mutex::new(ServiceState::new()),
        })
    }

    pub fn with_default_settings(
        services: Arc<dyn ServiceManager>,
        notifications: Arc<dyn NotificationSurface>,
    ) -> Self {
        Self {
            settings: KeepAliveSettings::default(),
            services,
            notifications,
            state: Mutex::new(ServiceState::new()),
        }
    }

    pub fn settings(&self) -> &KeepAliveSettings {
        &self.settings
    }

    // ------------------------------------------------------------------------
    // HOST REQUESTS
    // ------------------------------------------------------------------------

    /// Start the keep-alive service
    ///
    /// Transitions: Stopped/Denied -> Starting -> Running, or -> Denied when
    /// the platform forbids foreground execution. Idempotent.
    pub fn start(&self) -> Result<Ack, SupervisorError> {
        let mut state = self.state.lock();
        self.start_locked(&mut state)
    }

    /// Stop the keep-alive service
    ///
    /// Always asks the OS to unregister (a no-op there when nothing runs),
    /// then withdraws the signal. Idempotent.
    pub fn stop(&self) -> Result<Ack, SupervisorError> {
        let mut state = self.state.lock();

        if let Err(e) = self.services.unregister_service() {
            let err = SupervisorError::from(e);
            tracing::error!("Failed to stop keep-alive service: {}", err);
            state.last_error = Some(err.clone());
            return Err(err);
        }
        state.registered = false;
        self.withdraw_signal(&mut state);

        if state.phase != ServicePhase::Stopped {
            tracing::info!("Keep-alive service stopped (was {})", state.phase);
        } else {
            tracing::debug!("stop() on a stopped service");
        }
        state.phase = ServicePhase::Stopped;
        state.last_error = None;

        Ok(Ack::Stopped)
    }

    // ------------------------------------------------------------------------
    // OS CALLBACKS
    // ------------------------------------------------------------------------

    /// The host task was swiped away. A running service re-registers once.
    pub fn on_task_removed(&self) {
        let mut state = self.state.lock();

        if state.phase != ServicePhase::Running {
            tracing::debug!("Task removed while {}, nothing to restart", state.phase);
            return;
        }

        let level = self.evaluate_policy(&mut state);
        if !state.policy_allows_foreground {
            self.deny_locked(&mut state, level);
            return;
        }

        tracing::info!("Task removed, restarting keep-alive service");
        match self.services.register_service(&self.descriptor(level)) {
            Ok(()) => {
                state.registered = true;
                state.registrations += 1;
                let notification = self.settings.liveness_notification();
                if let Err(e) = self.notifications.post(&notification) {
                    tracing::warn!("Failed to refresh liveness signal: {}", e);
                }
            }
            Err(e) => {
                tracing::error!("Failed to restart keep-alive service: {}", e);
                if let Err(release) = self.release_locked(&mut state) {
                    tracing::warn!("Failed to release registration: {}", release);
                }
                state.phase = ServicePhase::Stopped;
                state.last_error = Some(e.into());
            }
        }
    }

    /// Boot finished. Starts the service when policy allows; every failure
    /// is logged and swallowed since nobody is waiting on the result.
    pub fn on_boot_completed(&self) {
        let mut state = self.state.lock();

        let level = self.evaluate_policy(&mut state);
        if !state.policy_allows_foreground {
            tracing::debug!("Boot completed on {}, foreground denied; not starting", level);
            return;
        }

        match self.start_locked(&mut state) {
            Ok(ack) => tracing::info!(
                "Boot completed, keep-alive service {} ({} mode)",
                ack,
                RegistrationMode::strongest_for(level)
            ),
            Err(e) => tracing::warn!("Boot-time start failed, ignoring: {}", e),
        }
    }

    /// The OS delivered a start command to the service, possibly recreating
    /// it after the process was killed.
    pub fn on_start_command(&self) -> StartDisposition {
        let mut state = self.state.lock();

        let level = self.evaluate_policy(&mut state);
        if !state.policy_allows_foreground {
            self.deny_locked(&mut state, level);
            return StartDisposition::NotSticky;
        }

        if state.phase == ServicePhase::Running {
            return StartDisposition::Sticky;
        }

        match self.bring_up_locked(&mut state, level) {
            Ok(()) => StartDisposition::Sticky,
            Err(_) => StartDisposition::NotSticky,
        }
    }

    /// Service instance created by the OS
    pub fn on_create(&self) {
        let mut state = self.state.lock();
        let level = self.services.platform_version();
        tracing::debug!("Keep-alive service created on {}", level);
        self.ensure_channel(&mut state, level);
    }

    /// Service torn down by the OS. The OS withdraws the signal itself.
    pub fn on_destroy(&self) {
        let mut state = self.state.lock();
        tracing::info!("Keep-alive service destroyed (was {})", state.phase);
        state.registered = false;
        state.signal_visible = false;
        state.phase = ServicePhase::Stopped;
    }

    // ------------------------------------------------------------------------
    // QUERIES
    // ------------------------------------------------------------------------

    /// Evaluated against the platform version reported right now
    pub fn policy_allows_foreground(&self) -> bool {
        policy::policy_allows_foreground(self.services.platform_version())
    }

    pub fn phase(&self) -> ServicePhase {
        self.state.lock().phase
    }

    pub fn is_running(&self) -> bool {
        self.phase() == ServicePhase::Running
    }

    pub fn snapshot(&self) -> ServiceState {
        self.state.lock().clone()
    }

    // ------------------------------------------------------------------------
    // TRANSITIONS (caller holds the state lock)
    // ------------------------------------------------------------------------

    fn start_locked(&self, state: &mut ServiceState) -> Result<Ack, SupervisorError> {
        let level = self.evaluate_policy(state);

        if state.phase == ServicePhase::Running && state.policy_allows_foreground {
            tracing::debug!("start() on a running service");
            return Ok(Ack::Started);
        }

        state.phase = ServicePhase::Starting;

        if !state.policy_allows_foreground {
            self.deny_locked(state, level);
            return Ok(Ack::Skipped);
        }

        self.bring_up_locked(state, level)?;
        Ok(Ack::Started)
    }

    fn bring_up_locked(
        &self,
        state: &mut ServiceState,
        level: ApiLevel,
    ) -> Result<(), SupervisorError> {
        state.phase = ServicePhase::Starting;
        self.ensure_channel(state, level);

        let descriptor = self.descriptor(level);
        if let Err(e) = self.services.register_service(&descriptor) {
            return Err(self.fail_start(state, e));
        }
        state.registered = true;
        state.registrations += 1;

        let notification = self.settings.liveness_notification();
        if let Err(e) = self.notifications.post(&notification) {
            match self.services.unregister_service() {
                Ok(()) => state.registered = false,
                Err(release) => tracing::warn!("Failed to release registration: {}", release),
            }
            return Err(self.fail_start(state, e));
        }
        state.signal_visible = true;

        state.phase = ServicePhase::Running;
        state.last_error = None;
        tracing::info!(
            "Keep-alive service started ({} mode, {})",
            descriptor.mode,
            level
        );
        Ok(())
    }

    fn fail_start(&self, state: &mut ServiceState, err: OsError) -> SupervisorError {
        let err = SupervisorError::from(err);
        tracing::error!("Failed to start keep-alive service: {}", err);
        state.phase = ServicePhase::Stopped;
        state.last_error = Some(err.clone());
        err
    }

    /// Enter Denied. Teardown failures are logged, never reported: a denied
    /// start always resolves as skipped.
    fn deny_locked(&self, state: &mut ServiceState, level: ApiLevel) {
        if let Err(e) = self.release_locked(state) {
            tracing::warn!("Failed to release registration on policy denial: {}", e);
            state.registered = false;
        }

        if state.phase != ServicePhase::Denied {
            tracing::info!("Skipping keep-alive service on {}: foreground denied", level);
        }
        state.phase = ServicePhase::Denied;
    }

    /// Withdraw the signal, then drop the registration. The signal is gone
    /// even when the OS refuses the unregister; `registered` stays set so a
    /// later `stop()` retries it.
    fn release_locked(&self, state: &mut ServiceState) -> Result<(), OsError> {
        self.withdraw_signal(state);
        if state.registered {
            self.services.unregister_service()?;
            state.registered = false;
        }
        Ok(())
    }

    fn withdraw_signal(&self, state: &mut ServiceState) {
        if !state.signal_visible {
            return;
        }
        if let Err(e) = self.notifications.withdraw(self.settings.notification.id) {
            // the OS drops a service's notification together with the service
            tracing::warn!("Failed to withdraw liveness signal: {}", e);
        }
        state.signal_visible = false;
    }

    fn ensure_channel(&self, state: &mut ServiceState, level: ApiLevel) {
        if state.channel_created || !policy::supports_notification_channels(level) {
            return;
        }
        match self
            .notifications
            .create_channel(&self.settings.notification_channel())
        {
            Ok(()) => state.channel_created = true,
            Err(e) => tracing::warn!("Failed to create notification channel: {}", e),
        }
    }

    fn evaluate_policy(&self, state: &mut ServiceState) -> ApiLevel {
        let level = self.services.platform_version();
        state.policy_allows_foreground = policy::policy_allows_foreground(level);
        level
    }

    fn descriptor(&self, level: ApiLevel) -> ServiceDescriptor {
        ServiceDescriptor {
            name: self.settings.service_name.clone(),
            mode: RegistrationMode::strongest_for(level),
            notification_id: self.settings.notification.id,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
