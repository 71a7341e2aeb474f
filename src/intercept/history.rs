use tracing::warn;

use super::InterceptContext;
use crate::policy::Trigger;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryCall<S> {
    pub state: S,
    pub title: String,
    pub url: Option<String>,
}

impl<S> HistoryCall<S> {
    pub fn new(state: S, url: Option<&str>) -> Self {
        Self {
            state,
            title: String::new(),
            url: url.map(str::to_owned),
        }
    }
}

pub fn wrap_push_state<F, S, R>(
    ctx: InterceptContext,
    original: F,
) -> impl Fn(HistoryCall<S>) -> Option<R>
where
    F: Fn(HistoryCall<S>) -> R,
{
    wrap_history(ctx, Trigger::PushState, original)
}

pub fn wrap_replace_state<F, S, R>(
    ctx: InterceptContext,
    original: F,
) -> impl Fn(HistoryCall<S>) -> Option<R>
where
    F: Fn(HistoryCall<S>) -> R,
{
    wrap_history(ctx, Trigger::ReplaceState, original)
}

fn wrap_history<F, S, R>(
    ctx: InterceptContext,
    trigger: Trigger,
    original: F,
) -> impl Fn(HistoryCall<S>) -> Option<R>
where
    F: Fn(HistoryCall<S>) -> R,
{
    move |call: HistoryCall<S>| {
        if let Some(url) = call.url.as_deref().filter(|url| !url.is_empty()) {
            let (candidate, verdict) = ctx.judge(url, trigger.clone());
            if verdict.is_blocked() {
                warn!(
                    target: "guard",
                    url = %candidate.target_url,
                    trigger = ?candidate.trigger,
                    "history redirect blocked"
                );
                return None;
            }
        }
        Some(original(call))
    }
}
