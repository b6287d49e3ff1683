//! Friendly model names.

/// Friendly names accepted in content records and the model ids they stand for.
pub const MODEL_ALIASES: &[(&str, &str)] = &[
    ("Gemini 3", "google/gemini-3-pro-image-preview"),
    ("GPT Image", "gpt-image-1.5"),
    ("Flux 2", "black-forest-labs/flux.2-pro"),
];

/// Resolve a friendly model name. Unknown names are returned unchanged and
/// treated as concrete ids.
pub fn resolve_model(name: &str) -> String {
    let name = name.trim();
    MODEL_ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
        .map(|(_, id)| (*id).to_string())
        .unwrap_or_else(|| name.to_string())
}
