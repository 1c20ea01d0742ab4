//! Platform integration layer for the keep-alive service
//!
//! This module provides:
//! - The liveness supervisor and its lifecycle state machine
//! - OS collaborator interfaces (service manager, notification surface)
//! - Platform-version policy for foreground execution
//! - Settings, app-state tracking and the keep-alive heartbeat
//! - A simulated OS for desktop hosts and tests

pub mod app_state;
pub mod heartbeat;
pub mod notification;
pub mod os;
pub mod policy;
pub mod service;
pub mod settings;
pub mod sim;

pub use app_state::{AppLifecycleTracker, AppState, AppTransition};
pub use heartbeat::{spawn_heartbeat, HeartbeatHandle};
pub use notification::{Category, Importance, NotificationChannel, NotificationDescriptor, Priority};
pub use os::{NotificationSurface, OsError, ServiceDescriptor, ServiceManager};
pub use policy::{policy_allows_foreground, ApiLevel, RegistrationMode};
pub use service::{
    Ack, LivenessSupervisor, ServicePhase, ServiceState, StartDisposition, SupervisorError,
    SERVICE_ERROR_CODE,
};
pub use settings::{ChannelSettings, KeepAliveSettings, NotificationSettings, SettingsError};
pub use sim::{OsCall, SimulatedOs};
