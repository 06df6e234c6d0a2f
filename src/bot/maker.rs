use std::sync::Arc;

use fluent_templates::fluent_bundle::FluentArgs;
use teloxide::prelude::*;
use teloxide::types::ReplyMarkup;
use unic_langid::LanguageIdentifier;

use crate::actions::{channels, moderation, settings, stats, tenants};
use crate::bot::{commands, error_text, keyboards, AppState, HandlerResult};
use crate::broadcast::{self, SEND_PACE, TENANT_PACE};
use crate::db::models::Session;
use crate::engine::{self, event::Event, Action, EngineCtx, Flow, Resolution};
use crate::error::{ActionError, ErrorKind};
use crate::i18n::{self, t, t_args};
use crate::outbound::{classify, Outbound, TelegramOutbound};

/// Command handler for the maker bot: lowers the parsed command into an
/// engine event and runs it through the same pipeline as everything else.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: commands::BotCommand,
    state: Arc<AppState>,
) -> HandlerResult {
    handle(bot, msg, state, Some(cmd.into_event())).await
}

/// Main message handler for the maker bot.
pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> HandlerResult {
    handle(bot, msg, state, None).await
}

/// The outer boundary: nothing escapes one update's handling. Failures are
/// logged and answered with the generic notice.
async fn handle(bot: Bot, msg: Message, state: Arc<AppState>, event: Option<Event>) -> HandlerResult {
    let user = match msg.from.as_ref() {
        Some(u) if !u.is_bot => u.clone(),
        _ => return Ok(()),
    };
    let user_id = user.id.0.to_string();

    if let Err(e) =
        process_message(&bot, &msg, &state, &user_id, user.language_code.as_deref(), event).await
    {
        tracing::error!("maker update from {} failed: {}", user_id, e);
        let lang = i18n::resolve_lang(None, user.language_code.as_deref());
        let _ = bot.send_message(msg.chat.id, t(&lang, "err-generic")).await;
    }

    Ok(())
}

async fn process_message(
    bot: &Bot,
    msg: &Message,
    state: &Arc<AppState>,
    user_id: &str,
    lang_hint: Option<&str>,
    event: Option<Event>,
) -> anyhow::Result<()> {
    let session = state.db.get_or_create_session(None, user_id).await?;
    let is_admin = state.config.is_owner(user_id);
    let lang = i18n::resolve_lang(session.language.as_deref(), lang_hint);

    let event = event.unwrap_or_else(|| match msg.text() {
        Some(text) => Event::classify(text, &state.menu),
        None => Event::Media,
    });

    let ctx = EngineCtx::from_session(&session, is_admin);
    let resolution = engine::resolve(Flow::Maker, &ctx, &event);

    run_action(bot, msg.chat.id, Some(msg), state, &session, user_id, &lang, resolution).await
}

/// Executes a resolved action, reports failures, and applies the state
/// policy: success moves to the resolved targets, validation and upstream
/// failures keep the state, not-found falls back to the parent menu.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn run_action(
    bot: &Bot,
    chat: ChatId,
    msg: Option<&Message>,
    state: &Arc<AppState>,
    session: &Session,
    user_id: &str,
    lang: &LanguageIdentifier,
    resolution: Resolution,
) -> anyhow::Result<()> {
    let outcome = execute(bot, chat, msg, state, session, user_id, lang, &resolution).await;

    let error_kind = match &outcome {
        Ok(()) => None,
        Err(err) => {
            if err.kind() == ErrorKind::Upstream {
                tracing::error!("action for {} failed upstream: {}", user_id, err);
            }
            bot.send_message(chat, error_text(lang, err)).await?;
            Some(err.kind())
        }
    };

    match engine::settle(&resolution, error_kind) {
        // Both axes at once only happens on /start re-entry.
        (Some(step), Some(admin_state)) if step.is_terminal() && admin_state.is_terminal() => {
            state.db.reset_states(None, user_id).await?;
        }
        (next_step, next_admin) => {
            if let Some(step) = next_step {
                state.db.set_step(None, user_id, step.as_str()).await?;
            }
            if let Some(admin_state) = next_admin {
                state
                    .db
                    .set_admin_state(None, user_id, admin_state.as_str())
                    .await?;
            }
        }
    }

    Ok(())
}

async fn send_text(bot: &Bot, chat: ChatId, text: String) -> Result<(), ActionError> {
    bot.send_message(chat, text)
        .await
        .map_err(anyhow::Error::from)?;
    Ok(())
}

async fn send_kb<M>(bot: &Bot, chat: ChatId, text: String, markup: M) -> Result<(), ActionError>
where
    M: Into<ReplyMarkup>,
{
    bot.send_message(chat, text)
        .reply_markup(markup)
        .await
        .map_err(anyhow::Error::from)?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn execute(
    bot: &Bot,
    chat: ChatId,
    msg: Option<&Message>,
    state: &Arc<AppState>,
    session: &Session,
    user_id: &str,
    lang: &LanguageIdentifier,
    resolution: &Resolution,
) -> Result<(), ActionError> {
    match &resolution.action {
        Action::None | Action::VerifyJoin => Ok(()),

        Action::Banned => send_text(bot, chat, t(lang, "banned")).await,

        Action::Hint(key) => send_text(bot, chat, t(lang, key)).await,

        Action::Start { payload } => {
            start(bot, chat, state, session, user_id, lang, payload.as_deref()).await
        }

        Action::Help => send_text(bot, chat, t(lang, "help-maker")).await,

        Action::AskLanguage => {
            send_kb(bot, chat, t(lang, "ask-language"), keyboards::language_picker()).await
        }

        Action::SetLanguage(code) => {
            let Some(code) = i18n::is_language_supported(code) else {
                return Ok(());
            };
            state.db.set_language(None, user_id, code).await?;
            let lang = i18n::lang_from_code(code);
            let mut args = FluentArgs::new();
            args.set("name", i18n::language_name(code));
            send_kb(
                bot,
                chat,
                t_args(&lang, "language-set", &args),
                keyboards::main_menu(&lang),
            )
            .await
        }

        Action::ShowAdminPanel => {
            send_kb(
                bot,
                chat,
                t(lang, "admin-panel-title"),
                keyboards::maker_admin_panel(lang),
            )
            .await
        }

        Action::CloseAdminPanel => {
            send_kb(bot, chat, t(lang, "admin-closed"), keyboards::main_menu(lang)).await
        }

        Action::Cancelled => {
            let markup: ReplyMarkup = if resolution.next_admin.is_some() {
                keyboards::maker_admin_panel(lang).into()
            } else {
                keyboards::main_menu(lang).into()
            };
            send_kb(bot, chat, t(lang, "cancelled"), markup).await
        }

        Action::EnterAdmin(next) => {
            let key = next.prompt_key().unwrap_or("use-buttons");
            send_kb(bot, chat, t(lang, key), keyboards::cancel_only(lang)).await
        }

        Action::AskMode => {
            send_kb(bot, chat, t(lang, "ask-mode"), keyboards::mode_picker(lang)).await
        }

        Action::SetMode(input) => {
            let mode = settings::set_creation_mode(&state.db, input).await?;
            let mut args = FluentArgs::new();
            args.set("mode", t(lang, mode.display_key()));
            send_text(bot, chat, t_args(lang, "mode-set", &args)).await
        }

        Action::BeginCreate => {
            tenants::check_gate(&state.db, user_id).await?;
            send_kb(bot, chat, t(lang, "ask-token"), keyboards::cancel_only(lang)).await
        }

        Action::BeginDelete => {
            send_kb(
                bot,
                chat,
                t(lang, "ask-delete-token"),
                keyboards::cancel_only(lang),
            )
            .await
        }

        Action::CreateTenant { token } => {
            let tenant = tenants::create(state, token, user_id).await?;
            let mut args = FluentArgs::new();
            args.set("name", tenant.username);
            send_kb(
                bot,
                chat,
                t_args(lang, "created-ok", &args),
                keyboards::main_menu(lang),
            )
            .await
        }

        Action::DeleteTenant { token } => {
            let is_owner = state.config.is_owner(user_id);
            let name = tenants::delete(state, token, user_id, is_owner).await?;
            let mut args = FluentArgs::new();
            args.set("name", name);
            send_kb(
                bot,
                chat,
                t_args(lang, "deleted-ok", &args),
                keyboards::main_menu(lang),
            )
            .await
        }

        Action::ListOwnBots => {
            let tenants = state.db.list_tenants_by_creator(user_id).await?;
            if tenants.is_empty() {
                return send_text(bot, chat, t(lang, "my-bots-empty")).await;
            }
            let mut text = t(lang, "my-bots-header");
            text.push('\n');
            for tenant in &tenants {
                text.push_str(&format!(
                    "\n• @{} — {}",
                    tenant.username,
                    tenant.created_at.format("%Y-%m-%d")
                ));
            }
            send_text(bot, chat, text).await
        }

        Action::ShowReferral => {
            let link = format!("https://t.me/{}?start={}", state.maker_username, user_id);
            let mut args = FluentArgs::new();
            args.set("link", link);
            args.set("count", session.referral_count);
            send_text(bot, chat, t_args(lang, "referral-info", &args)).await
        }

        Action::Block { input } => {
            let target = moderation::block(&state.db, None, user_id, input).await?;
            let mut args = FluentArgs::new();
            args.set("id", target);
            send_kb(
                bot,
                chat,
                t_args(lang, "blocked-ok", &args),
                keyboards::maker_admin_panel(lang),
            )
            .await
        }

        Action::Unblock { input } => {
            let target = moderation::unblock(&state.db, None, user_id, input).await?;
            let mut args = FluentArgs::new();
            args.set("id", target);
            send_kb(
                bot,
                chat,
                t_args(lang, "unblocked-ok", &args),
                keyboards::maker_admin_panel(lang),
            )
            .await
        }

        Action::SetChannel { slot, input } => {
            let url = channels::set_channel(&state.db, None, *slot, input).await?;
            let mut args = FluentArgs::new();
            args.set("url", url);
            send_kb(
                bot,
                chat,
                t_args(lang, "channel-set", &args),
                keyboards::maker_admin_panel(lang),
            )
            .await
        }

        Action::SetLimit { input } => {
            let value = settings::set_creation_limit(&state.db, input).await?;
            let mut args = FluentArgs::new();
            args.set("value", value);
            send_kb(
                bot,
                chat,
                t_args(lang, "limit-set", &args),
                keyboards::maker_admin_panel(lang),
            )
            .await
        }

        Action::SetReferralLimit { input } => {
            let value = settings::set_referral_limit(&state.db, input).await?;
            let mut args = FluentArgs::new();
            args.set("value", value);
            send_kb(
                bot,
                chat,
                t_args(lang, "referral-limit-set", &args),
                keyboards::maker_admin_panel(lang),
            )
            .await
        }

        Action::AddVip { input } => {
            let target = settings::add_vip(&state.db, input).await?;
            let mut args = FluentArgs::new();
            args.set("id", target);
            send_kb(
                bot,
                chat,
                t_args(lang, "vip-added", &args),
                keyboards::maker_admin_panel(lang),
            )
            .await
        }

        Action::RemoveVip { input } => {
            let target = settings::remove_vip(&state.db, input).await?;
            let mut args = FluentArgs::new();
            args.set("id", target);
            send_kb(
                bot,
                chat,
                t_args(lang, "vip-removed", &args),
                keyboards::maker_admin_panel(lang),
            )
            .await
        }

        Action::Broadcast { global } => {
            let Some(msg) = msg else { return Ok(()) };
            let payload = classify(msg);

            let report = if *global {
                let mut groups: Vec<(Arc<dyn Outbound>, Vec<Session>)> = vec![(
                    Arc::new(TelegramOutbound::new(bot.clone())),
                    state.db.sessions_for_tenant(None).await?,
                )];
                for tenant in state.db.list_tenants().await? {
                    let tenant_bot = state.registry.bot_for(&tenant.token).await;
                    groups.push((
                        Arc::new(TelegramOutbound::new(tenant_bot)),
                        state.db.sessions_for_tenant(Some(tenant.id)).await?,
                    ));
                }
                broadcast::fan_out_all(&groups, &payload, user_id, SEND_PACE, TENANT_PACE).await
            } else {
                let targets = state.db.sessions_for_tenant(None).await?;
                let outbound = TelegramOutbound::new(bot.clone());
                broadcast::fan_out(&outbound, &payload, &targets, user_id, SEND_PACE).await
            };

            let mut args = FluentArgs::new();
            args.set("ok", report.success_count() as i64);
            args.set("failed", report.fail_count() as i64);
            send_kb(
                bot,
                chat,
                t_args(lang, "broadcast-done", &args),
                keyboards::maker_admin_panel(lang),
            )
            .await
        }

        Action::ShowStats => {
            let s = stats::platform_stats(&state.db).await?;
            let mut args = FluentArgs::new();
            args.set("users", s.users);
            args.set("tenants", s.tenants);
            args.set("vips", s.vips);
            args.set("mode", t(lang, s.mode.display_key()));
            args.set("limit", s.creation_limit);
            args.set("referral", s.referral_limit);
            send_text(bot, chat, t_args(lang, "stats-platform", &args)).await
        }
    }
}

async fn start(
    bot: &Bot,
    chat: ChatId,
    state: &Arc<AppState>,
    session: &Session,
    user_id: &str,
    lang: &LanguageIdentifier,
    payload: Option<&str>,
) -> Result<(), ActionError> {
    // Deep-link referral: /start <referrer-id>. Linked once, never to self.
    if let Some(referrer) = payload {
        let is_numeric = !referrer.is_empty() && referrer.chars().all(|c| c.is_ascii_digit());
        if is_numeric && referrer != user_id && state.db.set_referred_by(user_id, referrer).await? {
            if let Some(count) = state.db.increment_referral_count(referrer).await? {
                notify_referrer(bot, state, referrer, count).await;
            }
        }
    }

    if session.is_first_start {
        state.db.clear_first_start(None, user_id).await?;
    }

    send_kb(bot, chat, t(lang, "start-maker"), keyboards::main_menu(lang)).await
}

/// Best-effort: a dead chat must not fail the newcomer's /start.
async fn notify_referrer(bot: &Bot, state: &Arc<AppState>, referrer: &str, count: i64) {
    let Ok(chat_id) = referrer.parse::<i64>() else {
        return;
    };
    let lang = match state.db.get_session(None, referrer).await {
        Ok(Some(s)) => i18n::resolve_lang(s.language.as_deref(), None),
        _ => i18n::resolve_lang(None, None),
    };
    let mut args = FluentArgs::new();
    args.set("count", count);
    if let Err(e) = bot
        .send_message(ChatId(chat_id), t_args(&lang, "referral-joined", &args))
        .await
    {
        tracing::warn!("referral notice to {} failed: {}", referrer, e);
    }
}
