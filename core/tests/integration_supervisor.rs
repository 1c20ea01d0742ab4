use keepalive_core::platform::sim::OsCall;
use keepalive_core::{
    Ack, ApiLevel, LivenessSupervisor, RegistrationMode, ServicePhase, SimulatedOs,
    StartDisposition,
};
use std::sync::Arc;

fn setup(level: u32) -> (Arc<SimulatedOs>, LivenessSupervisor) {
    let os = Arc::new(SimulatedOs::new(ApiLevel(level)));
    let supervisor = LivenessSupervisor::with_default_settings(os.clone(), os.clone());
    (os, supervisor)
}

#[test]
fn test_start_then_stop_on_api_33() {
    let (os, supervisor) = setup(33);

    let ack = supervisor.start().unwrap();
    assert_eq!(ack.message(), "Service started");
    assert_eq!(supervisor.phase(), ServicePhase::Running);
    assert_eq!(os.posts(), 1);
    assert!(os.signal_visible());
    assert_eq!(
        os.registered_descriptor().unwrap().mode,
        RegistrationMode::Foreground
    );

    let ack = supervisor.stop().unwrap();
    assert_eq!(ack.message(), "Service stopped");
    assert_eq!(supervisor.phase(), ServicePhase::Stopped);
    assert!(!os.signal_visible());
    assert!(!os.registered());
}

#[test]
fn test_start_on_api_34_is_skipped() {
    let (os, supervisor) = setup(34);

    let ack = supervisor.start().unwrap();
    assert_eq!(ack, Ack::Skipped);
    assert_eq!(ack.message(), "Skipped on Android 14+");
    assert_eq!(supervisor.phase(), ServicePhase::Denied);
    assert_eq!(os.registrations(), 0);
    assert_eq!(os.posts(), 0);
    assert!(os.calls().is_empty());
}

#[test]
fn test_out_of_memory_reverts_to_stopped() {
    let (os, supervisor) = setup(33);
    os.fail_register_with(Some("OUT_OF_MEMORY"));

    let err = supervisor.start().unwrap_err();
    assert_eq!(err.code(), "SERVICE_ERROR");
    assert_eq!(err.message(), "OUT_OF_MEMORY");
    assert_eq!(supervisor.phase(), ServicePhase::Stopped);
    assert!(!os.signal_visible());

    // no automatic retry; the host retries explicitly
    assert_eq!(os.registrations(), 1);
    os.fail_register_with(None);
    assert_eq!(supervisor.start().unwrap(), Ack::Started);
    assert_eq!(os.registrations(), 2);
    assert!(supervisor.snapshot().last_error.is_none());
}

#[test]
fn test_stop_twice_is_not_an_error() {
    let (_os, supervisor) = setup(30);
    assert_eq!(supervisor.stop().unwrap(), Ack::Stopped);
    assert_eq!(supervisor.stop().unwrap(), Ack::Stopped);
    assert_eq!(supervisor.phase(), ServicePhase::Stopped);
}

#[test]
fn test_denied_then_stop_then_allowed() {
    let (os, supervisor) = setup(34);
    supervisor.start().unwrap();
    assert_eq!(supervisor.phase(), ServicePhase::Denied);

    supervisor.stop().unwrap();
    assert_eq!(supervisor.phase(), ServicePhase::Stopped);

    // policy is evaluated per call, never cached
    os.set_platform_version(ApiLevel(33));
    assert!(supervisor.policy_allows_foreground());
    assert_eq!(supervisor.start().unwrap(), Ack::Started);
    assert_eq!(supervisor.phase(), ServicePhase::Running);
}

#[test]
fn test_policy_flip_while_running_tears_down() {
    let (os, supervisor) = setup(33);
    supervisor.start().unwrap();

    os.set_platform_version(ApiLevel(34));
    assert_eq!(supervisor.start().unwrap(), Ack::Skipped);

    let state = supervisor.snapshot();
    assert_eq!(state.phase, ServicePhase::Denied);
    assert!(!state.registered);
    assert!(!state.signal_visible);
    assert!(!os.registered());
    assert!(!os.signal_visible());
}

#[test]
fn test_task_removed_reregisters_exactly_once() {
    let (os, supervisor) = setup(33);
    supervisor.start().unwrap();
    os.take_calls();

    supervisor.on_task_removed();
    assert_eq!(os.registrations(), 1);
    assert_eq!(supervisor.phase(), ServicePhase::Running);
    assert!(os.signal_visible());
}

#[test]
fn test_task_removed_while_stopped_or_denied() {
    let (os, supervisor) = setup(33);
    supervisor.on_task_removed();
    assert_eq!(os.registrations(), 0);

    os.set_platform_version(ApiLevel(34));
    supervisor.start().unwrap();
    supervisor.on_task_removed();
    assert_eq!(os.registrations(), 0);
    assert_eq!(supervisor.phase(), ServicePhase::Denied);
}

#[test]
fn test_task_removed_after_policy_flip_denies() {
    let (os, supervisor) = setup(33);
    supervisor.start().unwrap();
    os.set_platform_version(ApiLevel(34));

    supervisor.on_task_removed();

    assert_eq!(supervisor.phase(), ServicePhase::Denied);
    assert_eq!(os.registrations(), 1);
    assert!(!os.signal_visible());
    assert!(!os.registered());
    assert!(supervisor.snapshot().is_consistent());
}

#[test]
fn test_start_command_after_policy_flip_is_not_sticky() {
    let (os, supervisor) = setup(33);
    supervisor.start().unwrap();
    os.set_platform_version(ApiLevel(34));

    assert_eq!(supervisor.on_start_command(), StartDisposition::NotSticky);
    assert_eq!(supervisor.phase(), ServicePhase::Denied);
    assert_eq!(os.registrations(), 1);
    assert!(!os.signal_visible());
    assert!(!os.registered());
}

#[test]
fn test_task_removed_failed_restart_and_release_hides_signal() {
    let (os, supervisor) = setup(33);
    supervisor.start().unwrap();
    os.fail_register_with(Some("restart refused"));
    os.fail_unregister_with(Some("binder died"));

    supervisor.on_task_removed();

    let state = supervisor.snapshot();
    assert_eq!(state.phase, ServicePhase::Stopped);
    assert!(!state.signal_visible);
    assert!(!os.signal_visible());
    assert!(state.is_consistent());

    // the registration the OS kept is released by the next stop
    os.fail_unregister_with(None);
    supervisor.stop().unwrap();
    assert!(!os.registered());
    assert!(!supervisor.snapshot().registered);
}

#[test]
fn test_boot_completed_uses_strongest_mode() {
    let (os, supervisor) = setup(30);
    supervisor.on_boot_completed();
    assert!(supervisor.is_running());
    assert_eq!(
        os.registered_descriptor().unwrap().mode,
        RegistrationMode::Foreground
    );

    let (os, supervisor) = setup(23);
    supervisor.on_boot_completed();
    assert!(supervisor.is_running());
    assert_eq!(
        os.calls(),
        vec![OsCall::Register(RegistrationMode::Background), OsCall::Post(1001)]
    );
}

#[test]
fn test_boot_completed_denied_does_nothing() {
    let (os, supervisor) = setup(34);
    supervisor.on_boot_completed();
    assert_eq!(supervisor.phase(), ServicePhase::Stopped);
    assert!(os.calls().is_empty());
}

#[test]
fn test_boot_completed_swallows_os_errors() {
    let (os, supervisor) = setup(31);
    os.fail_register_with(Some("ForegroundServiceStartNotAllowedException"));
    supervisor.on_boot_completed();
    assert_eq!(supervisor.phase(), ServicePhase::Stopped);
    assert_eq!(
        supervisor.snapshot().last_error.unwrap().message(),
        "ForegroundServiceStartNotAllowedException"
    );
}

#[test]
fn test_sticky_restart_after_process_death() {
    // cold start: fresh supervisor, OS redelivers the start command
    let (os, supervisor) = setup(32);
    supervisor.on_create();
    assert_eq!(supervisor.on_start_command(), StartDisposition::Sticky);
    assert!(supervisor.is_running());
    assert!(os.signal_visible());

    os.kill_service();
    supervisor.on_destroy();
    assert_eq!(supervisor.phase(), ServicePhase::Stopped);

    let (_os, supervisor) = setup(34);
    assert_eq!(supervisor.on_start_command(), StartDisposition::NotSticky);
}

#[test]
fn test_post_failure_does_not_leave_registration() {
    let (os, supervisor) = setup(33);
    os.fail_post_with(Some("notifications blocked"));

    let err = supervisor.start().unwrap_err();
    assert_eq!(err.message(), "notifications blocked");
    assert_eq!(supervisor.phase(), ServicePhase::Stopped);
    assert!(!os.registered());
    assert!(supervisor.snapshot().is_consistent());
}
