use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use super::Page;
use crate::{
    intercept::Location,
    policy::{CandidateNavigation, NavigationGuard, Trigger},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckReason {
    Load,
    Poll,
    Mutation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Enforcement {
    Allowed,
    Halted,
    AlreadyHalted,
}

#[derive(Debug, Default)]
struct HaltState {
    halted_href: Option<String>,
    halts: u64,
}

pub struct PageController {
    guard: Arc<NavigationGuard>,
    page: Arc<dyn Page>,
    state: Mutex<HaltState>,
}

impl PageController {
    pub fn new(guard: Arc<NavigationGuard>, page: Arc<dyn Page>) -> Self {
        Self {
            guard,
            page,
            state: Mutex::new(HaltState::default()),
        }
    }

    /// Idempotent, also when called from inside a mutation callback.
    pub fn enforce(&self, reason: CheckReason) -> Enforcement {
        let href = self.page.href();
        let candidate = CandidateNavigation::new(&href, &href, Trigger::Poll);
        if !self.guard.verdict(&candidate).is_blocked() {
            self.state.lock().halted_href = None;
            return Enforcement::Allowed;
        }

        let first = {
            let mut state = self.state.lock();
            let first = state.halted_href.as_deref() != Some(href.as_str());
            if first {
                state.halted_href = Some(href.clone());
                state.halts += 1;
            }
            first
        };

        let mut acted = false;
        if first {
            self.page.stop_loading();
            acted = true;
        }
        if !self.page.document_is_empty() {
            self.page.clear_document();
            acted = true;
        }

        if acted {
            warn!(target: "page", url = %href, reason = ?reason, "blocked page halted");
            Enforcement::Halted
        } else {
            debug!(target: "page", url = %href, reason = ?reason, "blocked page already halted");
            Enforcement::AlreadyHalted
        }
    }

    pub fn is_halted(&self) -> bool {
        self.state.lock().halted_href.is_some()
    }

    /// Number of blocked addresses caught so far.
    pub fn halts(&self) -> u64 {
        self.state.lock().halts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::SimulatedPage;

    fn controller(page: &Arc<SimulatedPage>) -> PageController {
        PageController::new(Arc::new(NavigationGuard::builtin()), page.clone())
    }

    #[test]
    fn blocked_page_is_stopped_and_cleared_once() {
        let page = Arc::new(SimulatedPage::new("https://shp.ee/abc"));
        let controller = controller(&page);

        assert_eq!(controller.enforce(CheckReason::Load), Enforcement::Halted);
        assert!(page.document_is_empty());
        assert!(!page.is_loading());
        assert_eq!(page.stop_count(), 1);

        for _ in 0..3 {
            assert_eq!(controller.enforce(CheckReason::Poll), Enforcement::AlreadyHalted);
        }
        assert_eq!(page.stop_count(), 1);
        assert_eq!(page.clear_count(), 1);
        assert_eq!(controller.halts(), 1);
    }

    #[test]
    fn content_injected_after_halt_is_cleared_again() {
        let page = Arc::new(SimulatedPage::new("https://www.shopee.co.id/"));
        let controller = controller(&page);
        controller.enforce(CheckReason::Load);

        page.insert_node("<div>flash sale</div>");
        assert_eq!(controller.enforce(CheckReason::Mutation), Enforcement::Halted);
        assert!(page.document_is_empty());
        assert_eq!(page.stop_count(), 1);
        assert_eq!(page.clear_count(), 2);
    }

    #[test]
    fn allowed_page_is_untouched() {
        let page = Arc::new(SimulatedPage::new("https://example.com/"));
        let controller = controller(&page);
        assert_eq!(controller.enforce(CheckReason::Load), Enforcement::Allowed);
        assert!(!page.document_is_empty());
        assert_eq!(page.stop_count(), 0);
        assert!(!controller.is_halted());
    }

    #[test]
    fn client_side_redirect_into_blocked_host_is_caught() {
        let page = Arc::new(SimulatedPage::new("https://example.com/"));
        let controller = controller(&page);
        assert_eq!(controller.enforce(CheckReason::Load), Enforcement::Allowed);

        page.navigate("https://invl.co/r/1");
        assert_eq!(controller.enforce(CheckReason::Poll), Enforcement::Halted);

        page.navigate("https://example.com/back");
        assert_eq!(controller.enforce(CheckReason::Poll), Enforcement::Allowed);
        page.navigate("https://atid.me/x");
        assert_eq!(controller.enforce(CheckReason::Poll), Enforcement::Halted);
        assert_eq!(controller.halts(), 2);
        assert_eq!(page.stop_count(), 2);
    }

    #[test]
    fn hop_between_blocked_hosts_stops_each_load() {
        let page = Arc::new(SimulatedPage::new("https://shopee.co.id/"));
        let controller = controller(&page);
        assert_eq!(controller.enforce(CheckReason::Load), Enforcement::Halted);

        page.navigate("https://www.lazada.co.id/");
        assert!(page.is_loading());
        assert_eq!(controller.enforce(CheckReason::Mutation), Enforcement::Halted);
        assert!(!page.is_loading());
        assert_eq!(page.stop_count(), 2);
    }
}
