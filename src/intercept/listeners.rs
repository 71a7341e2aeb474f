use tracing::warn;

use super::InterceptContext;
use crate::policy::Trigger;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerRegistration<L> {
    pub event: String,
    pub listener: L,
    pub capture: bool,
}

impl<L> ListenerRegistration<L> {
    pub fn new(event: impl Into<String>, listener: L) -> Self {
        Self {
            event: event.into(),
            listener,
            capture: false,
        }
    }
}

pub fn wrap_add_event_listener<F, L, R>(
    ctx: InterceptContext,
    original: F,
) -> impl Fn(ListenerRegistration<L>) -> Option<R>
where
    F: Fn(ListenerRegistration<L>) -> R,
{
    move |registration: ListenerRegistration<L>| {
        let trigger = Trigger::AddEventListener {
            event: registration.event.clone(),
        };
        let candidate = ctx.candidate("", trigger);
        if ctx.guard().verdict(&candidate).is_blocked() {
            warn!(
                target: "guard",
                event = %registration.event,
                host = %candidate.source_hostname,
                "listener registration dropped"
            );
            return None;
        }
        Some(original(registration))
    }
}
