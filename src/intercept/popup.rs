use tracing::warn;

use super::InterceptContext;
use crate::policy::Trigger;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenRequest {
    pub url: Option<String>,
    pub target: Option<String>,
    pub features: Option<String>,
}

impl OpenRequest {
    pub fn to(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }
}

pub fn wrap_open<F, W>(ctx: InterceptContext, original: F) -> impl Fn(OpenRequest) -> Option<W>
where
    F: Fn(OpenRequest) -> Option<W>,
{
    move |request: OpenRequest| {
        // window.open() without a URL still opens a blank window
        let target = request.url.clone().unwrap_or_default();
        let (candidate, verdict) = ctx.judge(&target, Trigger::Open);
        if verdict.is_blocked() {
            warn!(
                target: "guard",
                url = %candidate.target_url,
                source = %candidate.source_hostname,
                "popup blocked"
            );
            return None;
        }
        original(request)
    }
}
