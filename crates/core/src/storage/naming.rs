//! Artifact file naming.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;

/// Longest prompt prefix kept in a file name.
pub const MAX_PREFIX_LEN: usize = 30;

const MAX_SHORT_NAME_LEN: usize = 10;
const PREFIX_FALLBACK: &str = "generated";
const SHORT_NAME_FALLBACK: &str = "model";

static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9\s]+").unwrap());

/// Lowercase, hyphenated prompt prefix: `[a-z0-9-]{1,30}`.
pub fn sanitize_prompt(prompt: &str) -> String {
    let stripped = DISALLOWED.replace_all(prompt, "");
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    let truncated: String = collapsed.chars().take(MAX_PREFIX_LEN).collect();
    let prefix = truncated.trim().replace(' ', "-").to_ascii_lowercase();

    if prefix.is_empty() {
        PREFIX_FALLBACK.to_string()
    } else {
        prefix
    }
}

/// Short provider tag from a model id.
///
/// `black-forest-labs/flux.2-pro` becomes `flux`, `gpt-image-1` becomes `gpt`.
pub fn model_short_name(model: &str) -> String {
    let last_segment = model.rsplit('/').next().unwrap_or(model);
    let short: String = last_segment
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .take(MAX_SHORT_NAME_LEN)
        .collect::<String>()
        .to_ascii_lowercase();

    if short.is_empty() {
        SHORT_NAME_FALLBACK.to_string()
    } else {
        short
    }
}

/// `<%Y%m%d_%H%M%S>_<short>_<prefix>`, without extension.
pub fn artifact_stem(created_at: DateTime<Utc>, model: &str, prompt: &str) -> String {
    format!(
        "{}_{}_{}",
        created_at.format("%Y%m%d_%H%M%S"),
        model_short_name(model),
        sanitize_prompt(prompt)
    )
}

/// `<base>_<index>` for a grid cell, with path-unsafe characters dropped.
pub fn cell_stem(base_name: &str, index: usize) -> String {
    let base: String = base_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    let base = if base.is_empty() {
        PREFIX_FALLBACK.to_string()
    } else {
        base
    };
    format!("{}_{}", base, index)
}

/// Candidate file name for the `attempt`-th try: `stem.ext`, then `stem_1.ext`, ...
pub fn disambiguated(stem: &str, extension: &str, attempt: u32) -> String {
    if attempt == 0 {
        format!("{}.{}", stem, extension)
    } else {
        format!("{}_{}.{}", stem, attempt, extension)
    }
}
