use teloxide::macros::BotCommands;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands as _;

use crate::engine::event::{Command, Event};

/// The commands advertised in the Telegram UI. Parsing is teloxide's; the
/// transition itself is the engine's (commands are just another event).
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum BotCommand {
    #[command(description = "Open the main menu")]
    Start(String),
    #[command(description = "Owner / creator panel")]
    Panel,
    #[command(description = "Show help")]
    Help,
}

impl BotCommand {
    /// Lowers the parsed command into an engine event. `/start` may carry a
    /// deep-link payload (the referrer's id).
    pub fn into_event(self) -> Event {
        match self {
            BotCommand::Start(payload) => {
                let payload = payload.trim();
                Event::Command(Command::Start {
                    payload: (!payload.is_empty()).then(|| payload.to_string()),
                })
            }
            BotCommand::Panel => Event::Command(Command::Panel),
            BotCommand::Help => Event::Command(Command::Help),
        }
    }
}

/// Advertise the command list for a bot (maker or tenant alike).
pub async fn register(bot: &Bot) -> anyhow::Result<()> {
    bot.set_my_commands(BotCommand::bot_commands()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_payload_becomes_referrer() {
        assert_eq!(
            BotCommand::Start("12345".into()).into_event(),
            Event::Command(Command::Start {
                payload: Some("12345".into())
            })
        );
        assert_eq!(
            BotCommand::Start("  ".into()).into_event(),
            Event::Command(Command::Start { payload: None })
        );
        assert_eq!(BotCommand::Panel.into_event(), Event::Command(Command::Panel));
    }
}
