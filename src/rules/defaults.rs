use super::{MatchRule, RuleSet, RULES_VERSION};

const BLOCKED: &[&str] = &[
    "shopee.",
    "tokopedia.",
    "lazada.",
    "bukalapak.",
    "blibli.",
    "involvo.co",
    "shp.ee",
    "dotyruntchan.com",
    "terrificdark.com",
    "invl.co",
    "s.shopee.co.id",
    "atid.me",
];

const WHITELISTED: &[&str] = &[
    "facebook.com",
    "twitter.com",
    "instagram.com",
    "linkedin.com",
    "freepik.com",
    "unsplash.com",
    "pngtree.com",
    "eskagroup.co.id",
    "blogspot.com",
    "google.",
    "youtube.com",
    "reddit.com",
    "medium.com",
    "github.com",
    "stackoverflow.com",
    "quora.com",
    "whatsapp.com",
    "telegram.org",
    "discord.com",
    "tiktok.com",
    "pinterest.com",
    "tumblr.com",
    "dropbox.com",
    "wikipedia.org",
    "wordpress.com",
    "weebly.com",
    "behance.net",
    "dribbble.com",
    "etsy.com",
    "vimeo.com",
    "spotify.com",
];

const WHITELISTED_SUFFIXES: &[&str] = &[".go.id"];

// media hosts first, then path and query markers
const MEDIA_PATTERNS: &[&str] = &[
    "terabox.com",
    "dood.sh",
    "streaming.dood.sh",
    "player.terabox.com",
    "media.dood.sh",
    "/player/",
    "/embed/",
    "/media/",
    "/stream/",
    "?video=",
    "?track=",
    "?image=",
];

const MEDIA_EXTENSIONS: &[&str] = &[
    ".mp4", ".webm", ".ogg", ".mp3", ".wav", ".flac", ".jpg", ".jpeg", ".png", ".gif", ".bmp",
    ".svg", ".avi", ".mov", ".wmv", ".mkv", ".m4a", ".aac", ".wma", ".webp", ".tiff",
];

const PLAYER_EXCLUDED: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "netflix.com",
    "vimeo.com",
    "dailymotion.com",
];

pub(super) fn builtin_rule_set() -> RuleSet {
    RuleSet {
        version: RULES_VERSION,
        blocked: substrings(BLOCKED),
        whitelisted: substrings(WHITELISTED)
            .into_iter()
            .chain(WHITELISTED_SUFFIXES.iter().map(|s| MatchRule::suffix(*s)))
            .collect(),
        media_patterns: substrings(MEDIA_PATTERNS),
        media_extensions: MEDIA_EXTENSIONS
            .iter()
            .map(|ext| MatchRule::suffix(*ext))
            .collect(),
        player_excluded: substrings(PLAYER_EXCLUDED),
    }
}

fn substrings(patterns: &[&str]) -> Vec<MatchRule> {
    patterns.iter().map(|p| MatchRule::substring(*p)).collect()
}
