use url::Url;

use super::classify::resolve;
use crate::rules::CompiledRules;

pub fn is_media_url(rules: &CompiledRules, raw: &str, base: Option<&Url>) -> bool {
    if rules.media_patterns.matches(raw) {
        return true;
    }
    resolve(raw, base)
        .map(|url| rules.media_extensions.matches(url.path()))
        .unwrap_or(false)
}
