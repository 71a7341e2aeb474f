use std::{borrow::Cow, fs, path::Path, sync::Arc};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod defaults;

pub const RULES_VERSION: u32 = 1;

static BUILTIN: Lazy<Arc<CompiledRules>> = Lazy::new(|| {
    Arc::new(
        RuleSet::builtin()
            .compile()
            .expect("builtin rule set compiles"),
    )
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Substring,
    Regex,
    Suffix,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRule {
    pub kind: RuleKind,
    pub pattern: String,
}

impl MatchRule {
    pub fn substring(pattern: impl Into<String>) -> Self {
        Self {
            kind: RuleKind::Substring,
            pattern: pattern.into(),
        }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Self {
            kind: RuleKind::Regex,
            pattern: pattern.into(),
        }
    }

    pub fn suffix(pattern: impl Into<String>) -> Self {
        Self {
            kind: RuleKind::Suffix,
            pattern: pattern.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    pub version: u32,
    #[serde(default)]
    pub blocked: Vec<MatchRule>,
    #[serde(default)]
    pub whitelisted: Vec<MatchRule>,
    #[serde(default)]
    pub media_patterns: Vec<MatchRule>,
    #[serde(default)]
    pub media_extensions: Vec<MatchRule>,
    #[serde(default)]
    pub player_excluded: Vec<MatchRule>,
}

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("failed to read rule file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse rule file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid regex rule `{pattern}`: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("unsupported rule set version {0} (expected {expected})", expected = RULES_VERSION)]
    UnsupportedVersion(u32),
}

impl RuleSet {
    pub fn builtin() -> Self {
        defaults::builtin_rule_set()
    }

    pub fn empty() -> Self {
        Self {
            version: RULES_VERSION,
            blocked: Vec::new(),
            whitelisted: Vec::new(),
            media_patterns: Vec::new(),
            media_extensions: Vec::new(),
            player_excluded: Vec::new(),
        }
    }

    pub fn compile(&self) -> Result<CompiledRules, RulesError> {
        if self.version != RULES_VERSION {
            return Err(RulesError::UnsupportedVersion(self.version));
        }
        Ok(CompiledRules {
            blocked: RuleList::compile(&self.blocked)?,
            whitelisted: RuleList::compile(&self.whitelisted)?,
            media_patterns: RuleList::compile(&self.media_patterns)?,
            media_extensions: RuleList::compile(&self.media_extensions)?,
            player_excluded: RuleList::compile(&self.player_excluded)?,
        })
    }
}

pub fn load_rules_file(path: &Path) -> Result<RuleSet, RulesError> {
    let raw = fs::read_to_string(path).map_err(|source| RulesError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let rules: RuleSet = serde_json::from_str(&raw)?;
    Ok(rules)
}

#[derive(Debug)]
enum Matcher {
    Substring(String),
    Regex(Regex),
    Suffix(String),
}

impl Matcher {
    fn is_match(&self, raw: &str, folded: &str) -> bool {
        match self {
            Matcher::Substring(needle) => folded.contains(needle.as_str()),
            Matcher::Suffix(needle) => folded.ends_with(needle.as_str()),
            Matcher::Regex(regex) => regex.is_match(raw),
        }
    }
}

#[derive(Debug, Default)]
pub struct RuleList {
    matchers: Vec<Matcher>,
}

impl RuleList {
    fn compile(rules: &[MatchRule]) -> Result<Self, RulesError> {
        let mut matchers = Vec::with_capacity(rules.len());
        for rule in rules {
            let matcher = match rule.kind {
                RuleKind::Substring => Matcher::Substring(rule.pattern.to_ascii_lowercase()),
                RuleKind::Suffix => Matcher::Suffix(rule.pattern.to_ascii_lowercase()),
                RuleKind::Regex => {
                    Matcher::Regex(Regex::new(&rule.pattern).map_err(|source| {
                        RulesError::InvalidRegex {
                            pattern: rule.pattern.clone(),
                            source,
                        }
                    })?)
                }
            };
            matchers.push(matcher);
        }
        Ok(Self { matchers })
    }

    /// Substring and suffix rules ignore ASCII case.
    pub fn matches(&self, value: &str) -> bool {
        if self.matchers.is_empty() {
            return false;
        }
        let folded: Cow<'_, str> = if value.bytes().any(|b| b.is_ascii_uppercase()) {
            Cow::Owned(value.to_ascii_lowercase())
        } else {
            Cow::Borrowed(value)
        };
        self.matchers
            .iter()
            .any(|matcher| matcher.is_match(value, &folded))
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

#[derive(Debug)]
pub struct CompiledRules {
    pub blocked: RuleList,
    pub whitelisted: RuleList,
    pub media_patterns: RuleList,
    pub media_extensions: RuleList,
    pub player_excluded: RuleList,
}

impl CompiledRules {
    pub fn builtin() -> Arc<CompiledRules> {
        BUILTIN.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn builtin_rules_compile() {
        let rules = CompiledRules::builtin();
        assert!(rules.blocked.len() >= 12);
        assert!(rules.media_extensions.matches("/clip.mp4"));
    }

    #[test]
    fn substring_and_suffix_ignore_ascii_case() {
        let list =
            RuleList::compile(&[MatchRule::substring("Shopee."), MatchRule::suffix(".GO.ID")])
                .unwrap();
        assert!(list.matches("www.shopee.co.id"));
        assert!(list.matches("portal.jakarta.go.id"));
        assert!(!list.matches("go.id.example.com"));
    }

    #[test]
    fn regex_rules_match_raw_value() {
        let list = RuleList::compile(&[MatchRule::regex(r"^ads\d+\.")]).unwrap();
        assert!(list.matches("ads42.example.net"));
        assert!(!list.matches("www.ads42.example.net"));
    }

    #[test]
    fn invalid_regex_is_reported() {
        let mut rules = RuleSet::empty();
        rules.blocked.push(MatchRule::regex("(unclosed"));
        let err = rules.compile().unwrap_err();
        assert!(matches!(err, RulesError::InvalidRegex { .. }));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut rules = RuleSet::empty();
        rules.version = 7;
        assert!(matches!(
            rules.compile(),
            Err(RulesError::UnsupportedVersion(7))
        ));
    }

    #[test]
    fn rule_file_loads_with_missing_lists_defaulted() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"version":1,"blocked":[{{"kind":"substring","pattern":"casino."}}]}}"#
        )
        .unwrap();

        let rules = load_rules_file(file.path()).unwrap();
        assert_eq!(rules.blocked, vec![MatchRule::substring("casino.")]);
        assert!(rules.whitelisted.is_empty());
        assert!(rules.compile().unwrap().blocked.matches("best.casino.io"));
    }

    #[test]
    fn missing_rule_file_is_io_error() {
        let err = load_rules_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, RulesError::Io { .. }));
    }
}
