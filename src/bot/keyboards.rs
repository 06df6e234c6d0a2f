use fluent_templates::fluent_bundle::FluentArgs;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
};
use unic_langid::LanguageIdentifier;

use crate::i18n::{self, t};

fn btn(lang: &LanguageIdentifier, key: &str) -> KeyboardButton {
    KeyboardButton::new(t(lang, key))
}

/// The maker bot's main reply keyboard.
pub fn main_menu(lang: &LanguageIdentifier) -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![btn(lang, "btn-create-bot"), btn(lang, "btn-delete-bot")],
        vec![btn(lang, "btn-my-bots"), btn(lang, "btn-referral")],
        vec![btn(lang, "btn-help"), btn(lang, "btn-language")],
    ])
    .resize_keyboard()
}

/// The unlocked menu of a created bot.
pub fn tenant_menu(lang: &LanguageIdentifier) -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![btn(lang, "btn-help"), btn(lang, "btn-language")]])
        .resize_keyboard()
}

/// Admin panel for the maker bot (platform owner).
pub fn maker_admin_panel(lang: &LanguageIdentifier) -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![btn(lang, "btn-admin-stats"), btn(lang, "btn-admin-mode")],
        vec![btn(lang, "btn-admin-broadcast"), btn(lang, "btn-admin-broadcast-all")],
        vec![btn(lang, "btn-admin-block"), btn(lang, "btn-admin-unblock")],
        vec![btn(lang, "btn-admin-limit"), btn(lang, "btn-admin-referral-limit")],
        vec![btn(lang, "btn-admin-vip-add"), btn(lang, "btn-admin-vip-remove")],
        vec![btn(lang, "btn-admin-first-channel"), btn(lang, "btn-admin-second-channel")],
        vec![btn(lang, "btn-admin-custom-url"), btn(lang, "btn-admin-close")],
    ])
    .resize_keyboard()
}

/// Admin panel for a created bot (creator or platform owner).
pub fn tenant_admin_panel(lang: &LanguageIdentifier) -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![btn(lang, "btn-admin-stats"), btn(lang, "btn-admin-broadcast")],
        vec![btn(lang, "btn-admin-block"), btn(lang, "btn-admin-unblock")],
        vec![btn(lang, "btn-admin-first-channel"), btn(lang, "btn-admin-second-channel")],
        vec![btn(lang, "btn-admin-custom-url"), btn(lang, "btn-admin-close")],
    ])
    .resize_keyboard()
}

/// Shown while an admin flow is awaiting input.
pub fn cancel_only(lang: &LanguageIdentifier) -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![btn(lang, "btn-cancel")]]).resize_keyboard()
}

/// Language picker, one button per supported locale.
pub fn language_picker() -> InlineKeyboardMarkup {
    let row = i18n::SUPPORTED_LANGS
        .iter()
        .map(|(code, name)| InlineKeyboardButton::callback(*name, format!("lang:{}", code)))
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(vec![row])
}

/// Creation-mode picker for the owner.
pub fn mode_picker(lang: &LanguageIdentifier) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(t(lang, "mode-normal"), "mode:normal")],
        vec![InlineKeyboardButton::callback(t(lang, "mode-referral"), "mode:referral")],
        vec![InlineKeyboardButton::callback(t(lang, "mode-lock"), "mode:lock")],
    ])
}

/// The subscription gate: one URL button per join target plus the
/// verification button.
pub fn join_gate(lang: &LanguageIdentifier, targets: &[String]) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    for (i, target) in targets.iter().enumerate() {
        if let Ok(url) = reqwest::Url::parse(target) {
            let mut args = FluentArgs::new();
            args.set("index", (i + 1) as i64);
            rows.push(vec![InlineKeyboardButton::url(
                i18n::t_args(lang, "btn-join-channel", &args),
                url,
            )]);
        }
    }
    rows.push(vec![InlineKeyboardButton::callback(
        t(lang, "btn-check-join"),
        "checkjoin",
    )]);
    InlineKeyboardMarkup::new(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_gate_has_one_url_row_per_target_plus_check() {
        let en = i18n::lang_from_code("en");
        let targets = vec![
            "https://t.me/alpha".to_string(),
            "https://t.me/beta".to_string(),
        ];
        let kb = join_gate(&en, &targets);
        assert_eq!(kb.inline_keyboard.len(), 3);
    }

    #[test]
    fn unparseable_targets_are_skipped() {
        let en = i18n::lang_from_code("en");
        let targets = vec!["not a url".to_string()];
        let kb = join_gate(&en, &targets);
        // Only the verification button survives.
        assert_eq!(kb.inline_keyboard.len(), 1);
    }

    #[test]
    fn language_picker_covers_supported_langs() {
        let kb = language_picker();
        assert_eq!(kb.inline_keyboard[0].len(), i18n::SUPPORTED_LANGS.len());
    }
}
