use serde::Serialize;
use tracing::warn;

use super::InterceptContext;
use crate::policy::{hostname_of, resolve};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub href: String,
    pub target: Option<String>,
}

impl Anchor {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            target: None,
        }
    }

    pub fn new_tab(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            target: Some("_blank".to_owned()),
        }
    }

    pub fn opens_new_context(&self) -> bool {
        self.target
            .as_deref()
            .is_some_and(|target| target.eq_ignore_ascii_case("_blank"))
    }
}

pub trait ClickEvent {
    /// `None` when the target has no enclosing link or the lookup failed.
    fn closest_anchor(&self) -> Option<Anchor>;
    fn prevent_default(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickOutcome {
    NoLink,
    Allowed,
    BlockedLink,
    BlockedPopup,
}

pub struct ClickInterceptor {
    ctx: InterceptContext,
}

impl ClickInterceptor {
    pub fn new(ctx: InterceptContext) -> Self {
        Self { ctx }
    }

    pub fn handle<E: ClickEvent>(&self, event: &mut E) -> ClickOutcome {
        let Some(anchor) = event.closest_anchor().filter(|a| !a.href.is_empty()) else {
            return ClickOutcome::NoLink;
        };
        let mut outcome = ClickOutcome::Allowed;
        if self.veto_blocked_link(&anchor) {
            event.prevent_default();
            outcome = ClickOutcome::BlockedLink;
        }
        if self.veto_popup_link(&anchor) {
            event.prevent_default();
            if outcome == ClickOutcome::Allowed {
                outcome = ClickOutcome::BlockedPopup;
            }
        }
        outcome
    }

    fn veto_blocked_link(&self, anchor: &Anchor) -> bool {
        let page = resolve(&self.ctx.href(), None);
        let host = hostname_of(&anchor.href, page.as_ref());
        if self.ctx.guard().classify_hostname(&host).is_blocked {
            warn!(target: "guard", href = %anchor.href, "blocked link click cancelled");
            return true;
        }
        false
    }

    fn veto_popup_link(&self, anchor: &Anchor) -> bool {
        if !anchor.opens_new_context() {
            return false;
        }
        let page = resolve(&self.ctx.href(), None);
        let current = page
            .as_ref()
            .and_then(|url| url.host_str())
            .unwrap_or_default();
        if self
            .ctx
            .guard()
            .should_block_popup(current, &anchor.href, page.as_ref())
        {
            warn!(target: "guard", href = %anchor.href, "popup link cancelled");
            return true;
        }
        false
    }
}
