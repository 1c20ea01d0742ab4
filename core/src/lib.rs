// KeepAlive Core — background liveness supervisor
//
// Keeps a long-running host process alive across restarts under OS-imposed
// lifecycle constraints, and backs off quietly when the platform forbids it.

pub mod platform;

// Mobile bridge module
pub mod mobile_bridge;

pub use mobile_bridge::{BridgeError, HostPlatform, KeepAliveModule, PlatformCallError};
pub use platform::{
    policy_allows_foreground, spawn_heartbeat, Ack, ApiLevel, AppLifecycleTracker, AppState,
    AppTransition, HeartbeatHandle, KeepAliveSettings, LivenessSupervisor, NotificationChannel,
    NotificationDescriptor, NotificationSurface, OsCall, OsError, RegistrationMode,
    ServiceDescriptor, ServiceManager, ServicePhase, ServiceState, SettingsError, SimulatedOs,
    StartDisposition, SupervisorError, SERVICE_ERROR_CODE,
};

// UniFFI scaffolding for the exported bridge types
uniffi::setup_scaffolding!();
