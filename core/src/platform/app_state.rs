//! Host application foreground/background tracking
//!
//! Hosts feed app-state changes in; the tracker reports when the app comes
//! back after an extended absence so the host can refresh stale data.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use web_time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppState {
    Active,
    Background,
    /// Transitional (e.g. iOS app switcher); treated as no change
    Inactive,
}

impl std::fmt::Display for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Background => write!(f, "background"),
            Self::Inactive => write!(f, "inactive"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppTransition {
    EnteredBackground,
    /// Back in the foreground after `background_for`
    Resumed {
        background_for: Duration,
        extended: bool,
    },
    Unchanged,
}

pub struct AppLifecycleTracker {
    threshold: Duration,
    background_since: Option<Instant>,
}

impl AppLifecycleTracker {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            background_since: None,
        }
    }

    pub fn handle(&mut self, next: AppState) -> AppTransition {
        self.handle_at(next, Instant::now())
    }

    pub fn handle_at(&mut self, next: AppState, now: Instant) -> AppTransition {
        match next {
            AppState::Background => {
                if self.background_since.is_some() {
                    return AppTransition::Unchanged;
                }
                self.background_since = Some(now);
                tracing::debug!("App went to background");
                AppTransition::EnteredBackground
            }
            AppState::Active => match self.background_since.take() {
                Some(since) => {
                    let background_for = now.saturating_duration_since(since);
                    let extended = background_for > self.threshold;
                    if extended {
                        tracing::info!(
                            "App resumed after {:?} in background, refresh needed",
                            background_for
                        );
                    } else {
                        tracing::debug!("App resumed after {:?}", background_for);
                    }
                    AppTransition::Resumed {
                        background_for,
                        extended,
                    }
                }
                None => AppTransition::Unchanged,
            },
            AppState::Inactive => AppTransition::Unchanged,
        }
    }

    pub fn is_in_background(&self) -> bool {
        self.background_since.is_some()
    }

    /// Zero while in the foreground
    pub fn background_duration(&self, now: Instant) -> Duration {
        self.background_since
            .map(|since| now.saturating_duration_since(since))
            .unwrap_or_default()
    }
}
