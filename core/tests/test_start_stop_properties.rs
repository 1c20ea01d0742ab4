use keepalive_core::{Ack, ApiLevel, LivenessSupervisor, ServicePhase, SimulatedOs};
use proptest::prelude::*;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
enum Op {
    Start,
    Stop,
    TaskRemoved,
    BootCompleted,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Start),
        Just(Op::Stop),
        Just(Op::TaskRemoved),
        Just(Op::BootCompleted),
    ]
}

/// Expected phase and registration count, treating start/stop as set/reset
fn model(level: u32, ops: &[Op]) -> (ServicePhase, usize) {
    let allowed = level < 34;
    let mut phase = ServicePhase::Stopped;
    let mut registrations = 0;

    for op in ops {
        match op {
            Op::Start => {
                if !allowed {
                    phase = ServicePhase::Denied;
                } else if phase != ServicePhase::Running {
                    phase = ServicePhase::Running;
                    registrations += 1;
                }
            }
            Op::BootCompleted => {
                if allowed && phase != ServicePhase::Running {
                    phase = ServicePhase::Running;
                    registrations += 1;
                }
            }
            Op::Stop => phase = ServicePhase::Stopped,
            Op::TaskRemoved => {
                if phase == ServicePhase::Running {
                    registrations += 1;
                }
            }
        }
    }

    (phase, registrations)
}

proptest! {
    #[test]
    fn prop_sequence_matches_idempotent_model(
        level in 20u32..40,
        ops in proptest::collection::vec(op(), 0..40),
    ) {
        let os = Arc::new(SimulatedOs::new(ApiLevel(level)));
        let supervisor = LivenessSupervisor::with_default_settings(os.clone(), os.clone());

        for op in &ops {
            match op {
                Op::Start => {
                    let ack = supervisor.start().unwrap();
                    prop_assert_eq!(ack.is_skipped(), level >= 34);
                }
                Op::Stop => prop_assert_eq!(supervisor.stop().unwrap(), Ack::Stopped),
                Op::TaskRemoved => supervisor.on_task_removed(),
                Op::BootCompleted => supervisor.on_boot_completed(),
            }

            let state = supervisor.snapshot();
            prop_assert!(state.is_consistent());
            prop_assert_eq!(os.signal_visible(), state.phase == ServicePhase::Running);
        }

        let (phase, registrations) = model(level, &ops);
        prop_assert_eq!(supervisor.phase(), phase);
        prop_assert_eq!(os.registrations(), registrations);
    }

    #[test]
    fn prop_policy_threshold(level in 0u32..100) {
        prop_assert_eq!(keepalive_core::policy_allows_foreground(ApiLevel(level)), level < 34);
    }
}
