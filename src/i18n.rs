use std::collections::HashMap;

use fluent_templates::{
    fluent_bundle::{FluentArgs, FluentValue},
    static_loader, Loader,
};
use once_cell::sync::Lazy;
use unic_langid::LanguageIdentifier;

static_loader! {
    static LOCALES = {
        locales: "./locales",
        fallback_language: "en",
    };
}

/// Supported languages (code, human-readable name).
pub static SUPPORTED_LANGS: &[(&str, &str)] = &[("en", "English"), ("ru", "Русский")];

/// Default language identifier used as a fallback.
static DEFAULT_LANG: Lazy<LanguageIdentifier> = Lazy::new(|| "en".parse().unwrap());

/// Normalizes a language code into a LanguageIdentifier (falls back to default).
pub fn lang_from_code(code: &str) -> LanguageIdentifier {
    let normalized = code.split('-').next().unwrap_or(code).to_lowercase();
    normalized.parse().unwrap_or_else(|_| DEFAULT_LANG.clone())
}

/// Resolves the language for a session, preferring the stored choice and
/// falling back to the Telegram client locale.
pub fn resolve_lang(stored: Option<&str>, telegram_code: Option<&str>) -> LanguageIdentifier {
    if let Some(code) = stored {
        return lang_from_code(code);
    }
    if let Some(code) = telegram_code.and_then(is_language_supported) {
        return lang_from_code(code);
    }
    DEFAULT_LANG.clone()
}

/// Returns a localized string for the given key.
/// Converts literal `\n` sequences to actual newlines for proper Telegram formatting.
pub fn t(lang: &LanguageIdentifier, key: &str) -> String {
    let text = LOCALES
        .lookup(lang, key)
        .unwrap_or_else(|| LOCALES.lookup(&DEFAULT_LANG, key).unwrap_or_else(|| key.to_string()));
    text.replace("\\n", "\n")
}

/// Returns a localized string with arguments for interpolation.
pub fn t_args(lang: &LanguageIdentifier, key: &str, args: &FluentArgs) -> String {
    let args_map: HashMap<String, FluentValue> =
        args.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();

    let text = LOCALES.lookup_with_args(lang, key, &args_map).unwrap_or_else(|| {
        LOCALES
            .lookup_with_args(&DEFAULT_LANG, key, &args_map)
            .unwrap_or_else(|| key.to_string())
    });
    text.replace("\\n", "\n")
}

/// Finds a human-friendly name for a language code.
pub fn language_name(code: &str) -> &str {
    SUPPORTED_LANGS
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
        .unwrap_or("Unknown")
}

/// Checks if a language code is supported by the bot.
/// Returns the normalized language code if supported, None otherwise.
pub fn is_language_supported(code: &str) -> Option<&'static str> {
    let normalized = code.split('-').next().unwrap_or(code).to_lowercase();

    SUPPORTED_LANGS
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(&normalized))
        .map(|(c, _)| *c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_known_translation() {
        let ru = lang_from_code("ru");
        let en = lang_from_code("en");

        assert_eq!(t(&en, "cancelled"), "👌 Cancelled.");
        assert_eq!(t(&ru, "cancelled"), "👌 Отменено.");
    }

    #[test]
    fn converts_newlines() {
        let en = lang_from_code("en");
        let text = t(&en, "start-maker");

        assert!(text.contains('\n'));
        assert!(!text.contains("\\n"));
    }

    #[test]
    fn falls_back_to_default_language() {
        let es = lang_from_code("es");
        assert_eq!(t(&es, "cancelled"), "👌 Cancelled.");
    }

    #[test]
    fn resolves_stored_over_client_locale() {
        assert_eq!(resolve_lang(Some("ru"), Some("en")), lang_from_code("ru"));
        assert_eq!(resolve_lang(None, Some("ru-RU")), lang_from_code("ru"));
        assert_eq!(resolve_lang(None, Some("ja")), *DEFAULT_LANG);
        assert_eq!(resolve_lang(None, None), *DEFAULT_LANG);
    }

    #[test]
    fn test_is_language_supported() {
        assert_eq!(is_language_supported("en"), Some("en"));
        assert_eq!(is_language_supported("ru"), Some("ru"));
        assert_eq!(is_language_supported("en-US"), Some("en"));
        assert_eq!(is_language_supported("RU"), Some("ru"));
        assert_eq!(is_language_supported("es"), None);
        assert_eq!(is_language_supported("unknown"), None);
    }
}
