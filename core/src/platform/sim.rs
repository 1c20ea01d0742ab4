//! In-process simulated OS
//!
//! Implements both OS collaborator traits in memory so the supervisor can be
//! driven on desktop (CLI) and in tests without a device. The API level can
//! change at runtime and any OS call can be made to fail.

use crate::platform::notification::{NotificationChannel, NotificationDescriptor};
use crate::platform::os::{NotificationSurface, OsError, ServiceDescriptor, ServiceManager};
use crate::platform::policy::{ApiLevel, RegistrationMode};
use parking_lot::Mutex;
use std::collections::BTreeSet;

/// One call the supervisor made into the simulated OS, failed or not
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OsCall {
    Register(RegistrationMode),
    Unregister,
    CreateChannel(String),
    Post(u32),
    Withdraw(u32),
}

impl std::fmt::Display for OsCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Register(mode) => write!(f, "register_service({})", mode),
            Self::Unregister => write!(f, "unregister_service()"),
            Self::CreateChannel(id) => write!(f, "create_channel({})", id),
            Self::Post(id) => write!(f, "post({})", id),
            Self::Withdraw(id) => write!(f, "withdraw({})", id),
        }
    }
}

#[derive(Debug, Default)]
struct SimState {
    level: u32,
    registered: Option<ServiceDescriptor>,
    channels: BTreeSet<String>,
    visible: BTreeSet<u32>,
    calls: Vec<OsCall>,
    fail_register: Option<String>,
    fail_unregister: Option<String>,
    fail_post: Option<String>,
}

pub struct SimulatedOs {
    inner: Mutex<SimState>,
}

impl SimulatedOs {
    pub fn new(level: ApiLevel) -> Self {
        Self {
            inner: Mutex::new(SimState {
                level: level.get(),
                ..Default::default()
            }),
        }
    }

    /// Simulate an OS upgrade (or downgrade) under a live process
    pub fn set_platform_version(&self, level: ApiLevel) {
        self.inner.lock().level = level.get();
    }

    /// Make every following registration throw `message`; `None` clears it
    pub fn fail_register_with(&self, message: Option<&str>) {
        self.inner.lock().fail_register = message.map(str::to_string);
    }

    pub fn fail_unregister_with(&self, message: Option<&str>) {
        self.inner.lock().fail_unregister = message.map(str::to_string);
    }

    pub fn fail_post_with(&self, message: Option<&str>) {
        self.inner.lock().fail_post = message.map(str::to_string);
    }

    /// The OS kills the service on its own: registration and signal vanish
    pub fn kill_service(&self) {
        let mut inner = self.inner.lock();
        if let Some(descriptor) = inner.registered.take() {
            inner.visible.remove(&descriptor.notification_id);
        }
    }

    pub fn registered(&self) -> bool {
        self.inner.lock().registered.is_some()
    }

    pub fn registered_descriptor(&self) -> Option<ServiceDescriptor> {
        self.inner.lock().registered.clone()
    }

    /// Any notification currently posted
    pub fn signal_visible(&self) -> bool {
        !self.inner.lock().visible.is_empty()
    }

    pub fn calls(&self) -> Vec<OsCall> {
        self.inner.lock().calls.clone()
    }

    /// Drain the call log, e.g. to report the calls made by one step
    pub fn take_calls(&self) -> Vec<OsCall> {
        std::mem::take(&mut self.inner.lock().calls)
    }

    /// Registration attempts since creation or the last `take_calls`
    pub fn registrations(&self) -> usize {
        self.count(|call| matches!(call, OsCall::Register(_)))
    }

    pub fn unregistrations(&self) -> usize {
        self.count(|call| matches!(call, OsCall::Unregister))
    }

    pub fn posts(&self) -> usize {
        self.count(|call| matches!(call, OsCall::Post(_)))
    }

    pub fn withdrawals(&self) -> usize {
        self.count(|call| matches!(call, OsCall::Withdraw(_)))
    }

    fn count(&self, predicate: impl Fn(&OsCall) -> bool) -> usize {
        self.inner.lock().calls.iter().filter(|c| predicate(c)).count()
    }
}

impl ServiceManager for SimulatedOs {
    fn platform_version(&self) -> ApiLevel {
        ApiLevel(self.inner.lock().level)
    }

    fn register_service(&self, descriptor: &ServiceDescriptor) -> Result<(), OsError> {
        let mut inner = self.inner.lock();
        inner.calls.push(OsCall::Register(descriptor.mode));
        if let Some(message) = inner.fail_register.clone() {
            return Err(OsError::new(message));
        }
        inner.registered = Some(descriptor.clone());
        Ok(())
    }

    fn unregister_service(&self) -> Result<(), OsError> {
        let mut inner = self.inner.lock();
        inner.calls.push(OsCall::Unregister);
        if let Some(message) = inner.fail_unregister.clone() {
            return Err(OsError::new(message));
        }
        inner.registered = None;
        Ok(())
    }
}

impl NotificationSurface for SimulatedOs {
    fn create_channel(&self, channel: &NotificationChannel) -> Result<(), OsError> {
        let mut inner = self.inner.lock();
        inner.calls.push(OsCall::CreateChannel(channel.id.clone()));
        inner.channels.insert(channel.id.clone());
        Ok(())
    }

    fn post(&self, notification: &NotificationDescriptor) -> Result<(), OsError> {
        let mut inner = self.inner.lock();
        inner.calls.push(OsCall::Post(notification.id));
        if let Some(message) = inner.fail_post.clone() {
            return Err(OsError::new(message));
        }
        if inner.level >= 26 && !inner.channels.contains(&notification.channel_id) {
            return Err(OsError::new(format!(
                "No channel found for {}",
                notification.channel_id
            )));
        }
        inner.visible.insert(notification.id);
        Ok(())
    }

    fn withdraw(&self, notification_id: u32) -> Result<(), OsError> {
        let mut inner = self.inner.lock();
        inner.calls.push(OsCall::Withdraw(notification_id));
        inner.visible.remove(&notification_id);
        Ok(())
    }
}
