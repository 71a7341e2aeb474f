use serde::Serialize;
use url::Url;

use crate::rules::CompiledRules;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HostnameClass {
    pub is_blocked: bool,
    pub is_whitelisted: bool,
}

pub fn resolve(raw: &str, base: Option<&Url>) -> Option<Url> {
    Url::options().base_url(base).parse(raw).ok()
}

/// Hostname of `raw`, or `""` when it cannot be resolved or has no host.
pub fn hostname_of(raw: &str, base: Option<&Url>) -> String {
    resolve(raw, base)
        .and_then(|url| url.host_str().map(str::to_owned))
        .unwrap_or_default()
}

pub fn classify_hostname(rules: &CompiledRules, hostname: &str) -> HostnameClass {
    if hostname.is_empty() {
        return HostnameClass::default();
    }
    HostnameClass {
        is_blocked: rules.blocked.matches(hostname),
        is_whitelisted: rules.whitelisted.matches(hostname),
    }
}
