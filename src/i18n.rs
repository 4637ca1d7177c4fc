use crate::state::SessionState;

pub fn update_locale(state: &mut SessionState, locale_str: &str) {
    let normalized = normalize_locale(locale_str);
    state.locale = normalized.to_string();
    rust_i18n::set_locale(normalized);
}

/// Collapse incoming BCP-47 tags ("en-US", "en_GB") down to a compiled
/// locale name; anything unknown falls back to English.
fn normalize_locale(locale_str: &str) -> &'static str {
    let trimmed = locale_str.trim();
    if trimmed.is_empty() {
        return "en";
    }

    let lower = trimmed.to_ascii_lowercase().replace('_', "-");
    match lower.split('-').next() {
        Some("en") => "en",
        _ => "en",
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_locale;

    #[test]
    fn region_tags_collapse_to_language() {
        assert_eq!(normalize_locale("en-US"), "en");
        assert_eq!(normalize_locale("en_GB"), "en");
        assert_eq!(normalize_locale(""), "en");
        assert_eq!(normalize_locale("xx-YY"), "en");
    }
}
