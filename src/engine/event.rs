use super::menu::{MenuAction, MenuRegistry};

/// Commands are honored in any state, including terminal ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start`, optionally carrying a deep-link payload (referrer id).
    Start { payload: Option<String> },
    /// `/panel` — admin entry point.
    Panel,
    Help,
}

/// One inbound chat event, tagged for the transition tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Command(Command),
    /// Text that matched a localized menu label. Raw text kept: inside an
    /// input-awaiting state the label text is just input.
    Label { action: MenuAction, text: String },
    /// Digits-only text, used for id entry.
    Numeric(String),
    Text(String),
    /// A message with no text at all (photo, document, ...).
    Media,
    /// Inline-button callback token.
    Callback(String),
}

impl Event {
    /// Classifies message text: command, then menu label, then numeric, then
    /// plain text.
    pub fn classify(text: &str, registry: &MenuRegistry) -> Event {
        let trimmed = text.trim();

        if let Some(rest) = trimmed.strip_prefix('/') {
            let mut parts = rest.splitn(2, char::is_whitespace);
            let name = parts.next().unwrap_or_default();
            // Commands may arrive as /start@SomeBot in groups.
            let name = name.split('@').next().unwrap_or(name);
            let arg = parts.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
            match name {
                "start" => return Event::Command(Command::Start { payload: arg }),
                "panel" => return Event::Command(Command::Panel),
                "help" => return Event::Command(Command::Help),
                _ => {}
            }
        }

        if let Some(action) = registry.resolve(trimmed) {
            return Event::Label {
                action,
                text: trimmed.to_string(),
            };
        }

        if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Event::Numeric(trimmed.to_string());
        }

        Event::Text(trimmed.to_string())
    }

    /// The raw text of the event, for states that consume free-form input.
    pub fn raw_text(&self) -> Option<&str> {
        match self {
            Event::Label { text, .. } => Some(text),
            Event::Numeric(text) | Event::Text(text) => Some(text),
            Event::Command(_) | Event::Media | Event::Callback(_) => None,
        }
    }

    pub fn is_cancel(&self) -> bool {
        matches!(
            self,
            Event::Label {
                action: MenuAction::Cancel,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> MenuRegistry {
        MenuRegistry::new()
    }

    #[test]
    fn classifies_commands_with_payload() {
        let r = registry();
        assert_eq!(
            Event::classify("/start 12345", &r),
            Event::Command(Command::Start {
                payload: Some("12345".into())
            })
        );
        assert_eq!(
            Event::classify("/start", &r),
            Event::Command(Command::Start { payload: None })
        );
        assert_eq!(Event::classify("/panel", &r), Event::Command(Command::Panel));
        assert_eq!(
            Event::classify("/start@MakerBot 7", &r),
            Event::Command(Command::Start {
                payload: Some("7".into())
            })
        );
    }

    #[test]
    fn unknown_slash_text_stays_text() {
        let r = registry();
        assert_eq!(Event::classify("/unknown", &r), Event::Text("/unknown".into()));
    }

    #[test]
    fn classifies_labels_numeric_and_text() {
        let r = registry();
        assert!(matches!(
            Event::classify("🚫 Block", &r),
            Event::Label {
                action: MenuAction::AdminBlock,
                ..
            }
        ));
        assert_eq!(Event::classify("48213", &r), Event::Numeric("48213".into()));
        assert_eq!(Event::classify("abc", &r), Event::Text("abc".into()));
        assert_eq!(Event::classify("12a", &r), Event::Text("12a".into()));
    }

    #[test]
    fn cancel_label_is_cancel_in_both_locales() {
        let r = registry();
        assert!(Event::classify("❌ Cancel", &r).is_cancel());
        assert!(Event::classify("❌ Отмена", &r).is_cancel());
        assert!(!Event::classify("cancel", &r).is_cancel());
    }
}
