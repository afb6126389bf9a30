//! Language selection for generated text.

/// Sentinel meaning "follow the device locale".
pub const DEVICE_LANGUAGE: &str = "device";

const LANGUAGE_NAMES: &[(&str, &str)] = &[
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("zh", "Chinese"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("ar", "Arabic"),
];

/// English display name for an ISO 639-1 code.
///
/// Matching is exact and case-sensitive; anything outside the table is English.
pub fn language_name_for_prompt(code: &str) -> &'static str {
    LANGUAGE_NAMES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, name)| *name)
        .unwrap_or("English")
}

/// Resolve a configured code, substituting the device locale for the sentinel.
pub fn resolve_language_name<F>(code: &str, device_language: F) -> &'static str
where
    F: FnOnce() -> String,
{
    if code == DEVICE_LANGUAGE {
        let device = device_language();
        return language_name_for_prompt(&device);
    }
    language_name_for_prompt(code)
}

/// Language code of the process locale (`LC_ALL`, `LC_MESSAGES`, `LANG`).
pub fn device_language_code() -> String {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.trim().is_empty())
        .map(|value| language_from_locale(&value))
        .unwrap_or_else(|| "en".to_string())
}

/// Extract the language part of a POSIX/BCP 47 locale string (`es_ES.UTF-8` -> `es`).
pub fn language_from_locale(locale: &str) -> String {
    let language = locale
        .split(['_', '.', '-', '@'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match language.as_str() {
        "" | "c" | "posix" => "en".to_string(),
        _ => language,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_codes() {
        assert_eq!(language_name_for_prompt("es"), "Spanish");
        assert_eq!(language_name_for_prompt("fr"), "French");
        assert_eq!(language_name_for_prompt("de"), "German");
        assert_eq!(language_name_for_prompt("it"), "Italian");
        assert_eq!(language_name_for_prompt("pt"), "Portuguese");
        assert_eq!(language_name_for_prompt("zh"), "Chinese");
        assert_eq!(language_name_for_prompt("ja"), "Japanese");
        assert_eq!(language_name_for_prompt("ko"), "Korean");
        assert_eq!(language_name_for_prompt("ar"), "Arabic");
        assert_eq!(language_name_for_prompt("en"), "English");
    }

    #[test]
    fn unknown_uppercase_and_empty_fall_back_to_english() {
        assert_eq!(language_name_for_prompt("XX"), "English");
        assert_eq!(language_name_for_prompt("ES"), "English");
        assert_eq!(language_name_for_prompt(""), "English");
        assert_eq!(language_name_for_prompt("es-ES"), "English");
    }

    #[test]
    fn device_sentinel_uses_locale_lookup() {
        assert_eq!(resolve_language_name("device", || "ja".to_string()), "Japanese");
        assert_eq!(resolve_language_name("device", || "xx".to_string()), "English");
    }

    #[test]
    fn explicit_code_skips_locale_lookup() {
        let name = resolve_language_name("ko", || panic!("locale should not be queried"));
        assert_eq!(name, "Korean");
    }

    #[test]
    fn locale_strings_reduce_to_language() {
        assert_eq!(language_from_locale("es_ES.UTF-8"), "es");
        assert_eq!(language_from_locale("pt-BR"), "pt");
        assert_eq!(language_from_locale("DE"), "de");
        assert_eq!(language_from_locale("C"), "en");
        assert_eq!(language_from_locale("POSIX"), "en");
        assert_eq!(language_from_locale(""), "en");
    }
}
