use std::sync::Arc;

use crate::policy::{CandidateNavigation, NavigationGuard, Trigger, Verdict};

mod click;
mod history;
mod listeners;
mod popup;

pub use click::{Anchor, ClickEvent, ClickInterceptor, ClickOutcome};
pub use history::{wrap_push_state, wrap_replace_state, HistoryCall};
pub use listeners::{wrap_add_event_listener, ListenerRegistration};
pub use popup::{wrap_open, OpenRequest};

pub trait Location: Send + Sync {
    fn href(&self) -> String;
}

#[derive(Clone)]
pub struct InterceptContext {
    guard: Arc<NavigationGuard>,
    location: Arc<dyn Location>,
}

impl InterceptContext {
    pub fn new(guard: Arc<NavigationGuard>, location: Arc<dyn Location>) -> Self {
        Self { guard, location }
    }

    pub fn guard(&self) -> &NavigationGuard {
        &self.guard
    }

    pub fn href(&self) -> String {
        self.location.href()
    }

    pub fn candidate(&self, target: &str, trigger: Trigger) -> CandidateNavigation {
        CandidateNavigation::new(&self.href(), target, trigger)
    }

    pub fn judge(&self, target: &str, trigger: Trigger) -> (CandidateNavigation, Verdict) {
        let candidate = self.candidate(target, trigger);
        let verdict = self.guard.verdict(&candidate);
        (candidate, verdict)
    }
}
