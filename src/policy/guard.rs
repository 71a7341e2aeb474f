use std::sync::Arc;

use serde::Serialize;
use url::Url;

use super::{
    classify::{classify_hostname, hostname_of, HostnameClass},
    media::is_media_url,
};
use crate::rules::CompiledRules;

pub const GUARDED_LISTENER_EVENTS: [&str; 3] = ["beforeunload", "unload", "popstate"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    Open,
    PushState,
    ReplaceState,
    Click { new_context: bool },
    AddEventListener { event: String },
    Poll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Blocked,
    AllowedWhitelisted,
    AllowedMedia,
    AllowedDefault,
}

impl Verdict {
    pub fn is_blocked(self) -> bool {
        matches!(self, Verdict::Blocked)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateNavigation {
    pub source_hostname: String,
    pub target_url: String,
    pub target_hostname: String,
    pub trigger: Trigger,
    #[serde(skip)]
    page_url: Option<Url>,
}

impl CandidateNavigation {
    pub fn new(page_href: &str, target_url: &str, trigger: Trigger) -> Self {
        let page_url = Url::parse(page_href).ok();
        let source_hostname = page_url
            .as_ref()
            .and_then(|url| url.host_str())
            .unwrap_or_default()
            .to_owned();
        let target_hostname = hostname_of(target_url, page_url.as_ref());
        Self {
            source_hostname,
            target_url: target_url.to_owned(),
            target_hostname,
            trigger,
            page_url,
        }
    }

    pub fn page_url(&self) -> Option<&Url> {
        self.page_url.as_ref()
    }
}

#[derive(Debug, Clone)]
pub struct NavigationGuard {
    rules: Arc<CompiledRules>,
}

impl NavigationGuard {
    pub fn new(rules: Arc<CompiledRules>) -> Self {
        Self { rules }
    }

    pub fn builtin() -> Self {
        Self::new(CompiledRules::builtin())
    }

    pub fn rules(&self) -> &CompiledRules {
        &self.rules
    }

    pub fn classify_hostname(&self, hostname: &str) -> HostnameClass {
        classify_hostname(&self.rules, hostname)
    }

    pub fn is_media_url(&self, raw: &str, base: Option<&Url>) -> bool {
        is_media_url(&self.rules, raw, base)
    }

    pub fn should_block_navigation(&self, target: &str, base: Option<&Url>) -> bool {
        self.classify_hostname(&hostname_of(target, base)).is_blocked
    }

    /// Default-deny: only whitelisted pages or media targets may open popups.
    pub fn should_block_popup(
        &self,
        current_hostname: &str,
        target: &str,
        base: Option<&Url>,
    ) -> bool {
        self.popup_verdict(current_hostname, target, base).is_blocked()
    }

    pub fn verdict(&self, candidate: &CandidateNavigation) -> Verdict {
        let base = candidate.page_url();
        match &candidate.trigger {
            Trigger::Open => {
                self.popup_verdict(&candidate.source_hostname, &candidate.target_url, base)
            }
            Trigger::PushState | Trigger::ReplaceState | Trigger::Poll => {
                self.navigation_verdict(&candidate.target_hostname)
            }
            Trigger::Click { new_context } => {
                if self.classify_hostname(&candidate.target_hostname).is_blocked {
                    Verdict::Blocked
                } else if *new_context {
                    self.popup_verdict(&candidate.source_hostname, &candidate.target_url, base)
                } else {
                    Verdict::AllowedDefault
                }
            }
            Trigger::AddEventListener { event } => {
                let guarded = GUARDED_LISTENER_EVENTS.contains(&event.as_str());
                if guarded && self.classify_hostname(&candidate.source_hostname).is_blocked {
                    Verdict::Blocked
                } else {
                    Verdict::AllowedDefault
                }
            }
        }
    }

    fn navigation_verdict(&self, target_hostname: &str) -> Verdict {
        if self.classify_hostname(target_hostname).is_blocked {
            Verdict::Blocked
        } else {
            Verdict::AllowedDefault
        }
    }

    fn popup_verdict(&self, current_hostname: &str, target: &str, base: Option<&Url>) -> Verdict {
        if self.classify_hostname(current_hostname).is_whitelisted {
            Verdict::AllowedWhitelisted
        } else if self.is_media_url(target, base) {
            Verdict::AllowedMedia
        } else {
            Verdict::Blocked
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{MatchRule, RuleSet};

    fn guard() -> NavigationGuard {
        NavigationGuard::builtin()
    }

    #[test]
    fn popup_from_unlisted_site_is_denied_by_default() {
        assert!(guard().should_block_popup("unlisted.com", "https://ads.example/x", None));
    }

    #[test]
    fn whitelisted_origin_allows_any_popup() {
        assert!(!guard().should_block_popup("facebook.com", "https://ads.example/x", None));
        // blocked targets are not consulted for popups
        assert!(!guard().should_block_popup("facebook.com", "https://shopee.co.id/", None));
    }

    #[test]
    fn media_popup_allowed_from_any_origin() {
        assert!(!guard().should_block_popup(
            "unlisted.com",
            "https://cdn.unlisted.com/v/clip.webm",
            None
        ));
    }

    #[test]
    fn blocked_navigation_target() {
        let guard = guard();
        assert!(guard.should_block_navigation("https://shp.ee/abc", None));
        assert!(guard.should_block_navigation("https://shp.ee/abc", None));
        assert!(!guard.should_block_navigation("https://example.com/", None));
        assert!(!guard.should_block_navigation("not a url", None));
    }

    #[test]
    fn malformed_popup_target_falls_back_to_default_deny() {
        assert!(guard().should_block_popup("unlisted.com", "not a url", None));
        assert!(!guard().should_block_popup("github.com", "not a url", None));
    }

    #[test]
    fn verdict_per_trigger() {
        let guard = guard();
        let page = "https://news.unlisted.com/article";

        let open = CandidateNavigation::new(page, "https://ads.example/x", Trigger::Open);
        assert_eq!(guard.verdict(&open), Verdict::Blocked);

        let open_media = CandidateNavigation::new(page, "/media/42", Trigger::Open);
        assert_eq!(guard.verdict(&open_media), Verdict::AllowedMedia);

        let push = CandidateNavigation::new(page, "https://ads.example/x", Trigger::PushState);
        assert_eq!(guard.verdict(&push), Verdict::AllowedDefault);

        let replace =
            CandidateNavigation::new(page, "https://s.shopee.co.id/x", Trigger::ReplaceState);
        assert_eq!(guard.verdict(&replace), Verdict::Blocked);
    }

    #[test]
    fn click_on_blocked_link_is_vetoed_even_from_whitelisted_page() {
        let guard = guard();
        let page = "https://www.facebook.com/groups/1";

        let same_tab = CandidateNavigation::new(
            page,
            "https://tokopedia.link/promo",
            Trigger::Click { new_context: false },
        );
        assert_eq!(guard.verdict(&same_tab), Verdict::Blocked);

        let new_tab = CandidateNavigation::new(
            page,
            "https://ads.example/x",
            Trigger::Click { new_context: true },
        );
        assert_eq!(guard.verdict(&new_tab), Verdict::AllowedWhitelisted);

        let plain = CandidateNavigation::new(
            "https://unlisted.com/",
            "https://ads.example/x",
            Trigger::Click { new_context: false },
        );
        assert_eq!(guard.verdict(&plain), Verdict::AllowedDefault);
    }

    #[test]
    fn listener_guard_applies_only_on_blocked_pages() {
        let guard = guard();
        let on = |page: &str, event: &str| {
            let candidate = CandidateNavigation::new(
                page,
                page,
                Trigger::AddEventListener {
                    event: event.to_owned(),
                },
            );
            guard.verdict(&candidate)
        };
        assert_eq!(on("https://shopee.co.id/", "beforeunload"), Verdict::Blocked);
        assert_eq!(on("https://shopee.co.id/", "popstate"), Verdict::Blocked);
        assert_eq!(on("https://shopee.co.id/", "click"), Verdict::AllowedDefault);
        assert_eq!(on("https://unlisted.com/", "unload"), Verdict::AllowedDefault);
    }

    #[test]
    fn self_navigation_blocked_wins_over_whitelist() {
        let mut set = RuleSet::empty();
        set.blocked.push(MatchRule::substring("promo."));
        set.whitelisted.push(MatchRule::substring("promo."));
        let guard = NavigationGuard::new(Arc::new(set.compile().unwrap()));

        let page = "https://promo.example/";
        let poll = CandidateNavigation::new(page, page, Trigger::Poll);
        assert_eq!(guard.verdict(&poll), Verdict::Blocked);
    }

    #[test]
    fn verdict_is_deterministic() {
        let guard = guard();
        let candidate = CandidateNavigation::new(
            "https://unlisted.com/",
            "https://x.com/a/FILE.MP4",
            Trigger::Open,
        );
        let first = guard.verdict(&candidate);
        for _ in 0..10 {
            assert_eq!(guard.verdict(&candidate), first);
        }
        assert_eq!(first, Verdict::AllowedMedia);
    }
}
