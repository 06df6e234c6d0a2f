use std::collections::HashMap;

use crate::i18n;

/// Everything a menu button can do. Button labels are locale keys, so the
/// registry is rebuilt from the locale tables and matches incoming text in
/// any supported language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    CreateBot,
    DeleteBot,
    MyBots,
    Referral,
    Help,
    Language,
    Cancel,
    AdminStats,
    AdminBroadcast,
    AdminBroadcastAll,
    AdminBlock,
    AdminUnblock,
    AdminMode,
    AdminLimit,
    AdminReferralLimit,
    AdminVipAdd,
    AdminVipRemove,
    AdminFirstChannel,
    AdminSecondChannel,
    AdminCustomUrl,
    AdminClose,
}

/// (locale key, action) pairs; the single source of truth for button wiring.
pub const LABEL_KEYS: &[(&str, MenuAction)] = &[
    ("btn-create-bot", MenuAction::CreateBot),
    ("btn-delete-bot", MenuAction::DeleteBot),
    ("btn-my-bots", MenuAction::MyBots),
    ("btn-referral", MenuAction::Referral),
    ("btn-help", MenuAction::Help),
    ("btn-language", MenuAction::Language),
    ("btn-cancel", MenuAction::Cancel),
    ("btn-admin-stats", MenuAction::AdminStats),
    ("btn-admin-broadcast", MenuAction::AdminBroadcast),
    ("btn-admin-broadcast-all", MenuAction::AdminBroadcastAll),
    ("btn-admin-block", MenuAction::AdminBlock),
    ("btn-admin-unblock", MenuAction::AdminUnblock),
    ("btn-admin-mode", MenuAction::AdminMode),
    ("btn-admin-limit", MenuAction::AdminLimit),
    ("btn-admin-referral-limit", MenuAction::AdminReferralLimit),
    ("btn-admin-vip-add", MenuAction::AdminVipAdd),
    ("btn-admin-vip-remove", MenuAction::AdminVipRemove),
    ("btn-admin-first-channel", MenuAction::AdminFirstChannel),
    ("btn-admin-second-channel", MenuAction::AdminSecondChannel),
    ("btn-admin-custom-url", MenuAction::AdminCustomUrl),
    ("btn-admin-close", MenuAction::AdminClose),
];

/// Maps localized button text back to its action, across every locale.
#[derive(Debug)]
pub struct MenuRegistry {
    labels: HashMap<String, MenuAction>,
}

impl MenuRegistry {
    pub fn new() -> Self {
        let mut labels = HashMap::new();
        for (code, _) in i18n::SUPPORTED_LANGS {
            let lang = i18n::lang_from_code(code);
            for (key, action) in LABEL_KEYS {
                labels.insert(i18n::t(&lang, key), *action);
            }
        }
        Self { labels }
    }

    pub fn resolve(&self, text: &str) -> Option<MenuAction> {
        self.labels.get(text.trim()).copied()
    }
}

impl Default for MenuRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_labels_in_every_locale() {
        let registry = MenuRegistry::new();
        assert_eq!(registry.resolve("🤖 Create Bot"), Some(MenuAction::CreateBot));
        assert_eq!(registry.resolve("🤖 Создать бота"), Some(MenuAction::CreateBot));
        assert_eq!(registry.resolve("❌ Cancel"), Some(MenuAction::Cancel));
        assert_eq!(registry.resolve("❌ Отмена"), Some(MenuAction::Cancel));
    }

    #[test]
    fn trims_before_matching() {
        let registry = MenuRegistry::new();
        assert_eq!(registry.resolve("  📊 Stats "), Some(MenuAction::AdminStats));
    }

    #[test]
    fn unknown_text_is_not_a_label() {
        let registry = MenuRegistry::new();
        assert_eq!(registry.resolve("hello there"), None);
        assert_eq!(registry.resolve("12345"), None);
    }

    #[test]
    fn every_label_key_is_registered() {
        let registry = MenuRegistry::new();
        let en = i18n::lang_from_code("en");
        for (key, action) in LABEL_KEYS {
            let label = i18n::t(&en, key);
            assert_eq!(registry.resolve(&label), Some(*action), "key {}", key);
        }
    }
}
