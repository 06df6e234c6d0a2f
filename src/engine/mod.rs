pub mod event;
pub mod menu;
pub mod state;

use crate::db::models::{ChannelSlot, Session};
use crate::error::ErrorKind;

use event::{Command, Event};
use menu::MenuAction;
use state::{AdminState, Step};

/// Which transition tables apply: the maker bot or a created (tenant) bot.
/// One engine, parameterized — the tables differ, the resolution order does
/// not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Maker,
    Tenant,
}

/// The slice of a session the engine needs, plus the actor's authority.
#[derive(Debug, Clone)]
pub struct EngineCtx {
    pub step: Step,
    pub admin_state: AdminState,
    pub is_blocked: bool,
    /// Tenant creator or platform owner.
    pub is_admin: bool,
}

impl EngineCtx {
    pub fn from_session(session: &Session, is_admin: bool) -> Self {
        Self {
            step: Step::from_str_loose(&session.step),
            admin_state: AdminState::from_str_loose(&session.admin_state),
            is_blocked: session.is_blocked,
            is_admin,
        }
    }
}

/// The side-effecting operation a transition resolved to. Drivers execute
/// these; the engine itself never touches the store or the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Unmatched input in a terminal state.
    None,
    /// Blocked non-admin short-circuit.
    Banned,
    Start { payload: Option<String> },
    Help,
    AskLanguage,
    SetLanguage(String),
    ShowAdminPanel,
    CloseAdminPanel,
    Cancelled,
    EnterAdmin(AdminState),
    AskMode,
    SetMode(String),
    BeginCreate,
    BeginDelete,
    CreateTenant { token: String },
    DeleteTenant { token: String },
    ListOwnBots,
    ShowReferral,
    Block { input: String },
    Unblock { input: String },
    SetChannel { slot: ChannelSlot, input: String },
    SetLimit { input: String },
    SetReferralLimit { input: String },
    AddVip { input: String },
    RemoveVip { input: String },
    Broadcast { global: bool },
    ShowStats,
    VerifyJoin,
    /// Corrective nudge, e.g. "use the buttons". Carries the locale key.
    Hint(&'static str),
}

/// A resolved transition: the action plus the state each axis moves to on
/// success. `None` means "axis untouched".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub action: Action,
    pub next_step: Option<Step>,
    pub next_admin: Option<AdminState>,
}

impl Resolution {
    fn act(action: Action) -> Self {
        Self {
            action,
            next_step: None,
            next_admin: None,
        }
    }

    fn step(action: Action, next: Step) -> Self {
        Self {
            action,
            next_step: Some(next),
            next_admin: None,
        }
    }

    fn admin(action: Action, next: AdminState) -> Self {
        Self {
            action,
            next_step: None,
            next_admin: Some(next),
        }
    }
}

/// Resolves one inbound event against the session's current state.
///
/// Order: blocked short-circuit, then commands (always honored), then
/// callbacks, then the admin axis for authorized actors, then the ordinary
/// axis.
pub fn resolve(flow: Flow, ctx: &EngineCtx, event: &Event) -> Resolution {
    if ctx.is_blocked && !ctx.is_admin {
        return Resolution::act(Action::Banned);
    }

    if let Event::Command(cmd) = event {
        return resolve_command(ctx, cmd);
    }

    if let Event::Callback(data) = event {
        return resolve_callback(flow, ctx, data);
    }

    if ctx.is_admin && !ctx.admin_state.is_terminal() {
        return resolve_admin(flow, ctx.admin_state, event);
    }

    resolve_step(flow, ctx.step, event)
}

fn resolve_command(ctx: &EngineCtx, cmd: &Command) -> Resolution {
    match cmd {
        // The one transition that explicitly resets both axes.
        Command::Start { payload } => Resolution {
            action: Action::Start {
                payload: payload.clone(),
            },
            next_step: Some(Step::None),
            next_admin: Some(AdminState::None),
        },
        Command::Panel => {
            if ctx.is_admin {
                Resolution::admin(Action::ShowAdminPanel, AdminState::Panel)
            } else {
                Resolution::act(Action::None)
            }
        }
        Command::Help => Resolution::act(Action::Help),
    }
}

fn resolve_callback(flow: Flow, ctx: &EngineCtx, data: &str) -> Resolution {
    if let Some(code) = data.strip_prefix("lang:") {
        // Selecting a language from the first-start prompt completes that step.
        let action = Action::SetLanguage(code.to_string());
        return if ctx.step == Step::AwaitingLanguage {
            Resolution::step(action, Step::None)
        } else {
            Resolution::act(action)
        };
    }

    if let Some(mode) = data.strip_prefix("mode:") {
        if ctx.is_admin {
            return Resolution::act(Action::SetMode(mode.to_string()));
        }
        return Resolution::act(Action::None);
    }

    if data == "checkjoin" && flow == Flow::Tenant {
        return Resolution::act(Action::VerifyJoin);
    }

    Resolution::act(Action::None)
}

fn resolve_admin(flow: Flow, admin_state: AdminState, event: &Event) -> Resolution {
    // Wildcard: Cancel backs out of any non-terminal admin state.
    if event.is_cancel() {
        return Resolution::admin(Action::Cancelled, AdminState::Panel);
    }

    if admin_state == AdminState::Panel {
        if let Event::Label { action, .. } = event {
            return panel_action(flow, *action);
        }
        return Resolution::act(Action::Hint("use-buttons"));
    }

    // Input-awaiting admin states: everything but Cancel is raw input.
    match admin_state {
        AdminState::AwaitingBroadcast => {
            Resolution::admin(Action::Broadcast { global: false }, AdminState::Panel)
        }
        AdminState::AwaitingGlobalBroadcast => {
            Resolution::admin(Action::Broadcast { global: true }, AdminState::Panel)
        }
        other => match event.raw_text() {
            Some(input) => submit_admin_input(other, input),
            None => Resolution::act(Action::Hint("send-as-text")),
        },
    }
}

fn submit_admin_input(admin_state: AdminState, input: &str) -> Resolution {
    let input = input.to_string();
    let action = match admin_state {
        AdminState::AwaitingBlockId => Action::Block { input },
        AdminState::AwaitingUnblockId => Action::Unblock { input },
        AdminState::AwaitingFirstChannel => Action::SetChannel {
            slot: ChannelSlot::First,
            input,
        },
        AdminState::AwaitingSecondChannel => Action::SetChannel {
            slot: ChannelSlot::Second,
            input,
        },
        AdminState::AwaitingCustomUrl => Action::SetChannel {
            slot: ChannelSlot::Custom,
            input,
        },
        AdminState::AwaitingLimit => Action::SetLimit { input },
        AdminState::AwaitingReferralLimit => Action::SetReferralLimit { input },
        AdminState::AwaitingVipAdd => Action::AddVip { input },
        AdminState::AwaitingVipRemove => Action::RemoveVip { input },
        // Panel, None and the broadcast states are handled by the caller.
        _ => Action::None,
    };
    Resolution::admin(action, AdminState::Panel)
}

fn panel_action(flow: Flow, action: MenuAction) -> Resolution {
    let tenant_allowed = matches!(
        action,
        MenuAction::AdminStats
            | MenuAction::AdminBroadcast
            | MenuAction::AdminBlock
            | MenuAction::AdminUnblock
            | MenuAction::AdminFirstChannel
            | MenuAction::AdminSecondChannel
            | MenuAction::AdminCustomUrl
            | MenuAction::AdminClose
    );
    if flow == Flow::Tenant && !tenant_allowed {
        return Resolution::act(Action::Hint("use-buttons"));
    }

    match action {
        MenuAction::AdminStats => Resolution::act(Action::ShowStats),
        MenuAction::AdminMode => Resolution::act(Action::AskMode),
        MenuAction::AdminClose => Resolution::admin(Action::CloseAdminPanel, AdminState::None),
        MenuAction::AdminBroadcast => enter(AdminState::AwaitingBroadcast),
        MenuAction::AdminBroadcastAll => enter(AdminState::AwaitingGlobalBroadcast),
        MenuAction::AdminBlock => enter(AdminState::AwaitingBlockId),
        MenuAction::AdminUnblock => enter(AdminState::AwaitingUnblockId),
        MenuAction::AdminFirstChannel => enter(AdminState::AwaitingFirstChannel),
        MenuAction::AdminSecondChannel => enter(AdminState::AwaitingSecondChannel),
        MenuAction::AdminCustomUrl => enter(AdminState::AwaitingCustomUrl),
        MenuAction::AdminLimit => enter(AdminState::AwaitingLimit),
        MenuAction::AdminReferralLimit => enter(AdminState::AwaitingReferralLimit),
        MenuAction::AdminVipAdd => enter(AdminState::AwaitingVipAdd),
        MenuAction::AdminVipRemove => enter(AdminState::AwaitingVipRemove),
        _ => Resolution::act(Action::Hint("use-buttons")),
    }
}

fn enter(state: AdminState) -> Resolution {
    Resolution::admin(Action::EnterAdmin(state), state)
}

fn resolve_step(flow: Flow, step: Step, event: &Event) -> Resolution {
    match step {
        Step::None => match event {
            Event::Label { action, .. } => menu_action(flow, *action),
            // Terminal state: unmatched text is a no-op.
            _ => Resolution::act(Action::None),
        },

        Step::AwaitingToken | Step::AwaitingDeleteToken => {
            if event.is_cancel() {
                return Resolution::step(Action::Cancelled, Step::None);
            }
            match event.raw_text() {
                Some(input) => {
                    let token = input.to_string();
                    let action = if step == Step::AwaitingToken {
                        Action::CreateTenant { token }
                    } else {
                        Action::DeleteTenant { token }
                    };
                    Resolution::step(action, Step::None)
                }
                None => Resolution::act(Action::Hint("send-as-text")),
            }
        }

        // Language is chosen via inline buttons; anything else re-prompts.
        Step::AwaitingLanguage => Resolution::act(Action::AskLanguage),
    }
}

fn menu_action(flow: Flow, action: MenuAction) -> Resolution {
    match (flow, action) {
        (Flow::Maker, MenuAction::CreateBot) => {
            Resolution::step(Action::BeginCreate, Step::AwaitingToken)
        }
        (Flow::Maker, MenuAction::DeleteBot) => {
            Resolution::step(Action::BeginDelete, Step::AwaitingDeleteToken)
        }
        (Flow::Maker, MenuAction::MyBots) => Resolution::act(Action::ListOwnBots),
        (Flow::Maker, MenuAction::Referral) => Resolution::act(Action::ShowReferral),
        (_, MenuAction::Help) => Resolution::act(Action::Help),
        (_, MenuAction::Language) => Resolution::act(Action::AskLanguage),
        _ => Resolution::act(Action::None),
    }
}

/// Decides the final state after the resolved action ran.
///
/// Success applies the resolution's targets. Validation and upstream failures
/// leave both axes untouched so the user can retry. Not-found resets the
/// active flow to its parent: the admin panel for admin flows, the main menu
/// for ordinary ones.
pub fn settle(
    resolution: &Resolution,
    error: Option<ErrorKind>,
) -> (Option<Step>, Option<AdminState>) {
    match error {
        None => (resolution.next_step, resolution.next_admin),
        Some(ErrorKind::Validation) | Some(ErrorKind::Upstream) => (None, None),
        Some(ErrorKind::NotFound) => {
            if resolution.next_admin.is_some() {
                (None, Some(AdminState::Panel))
            } else if resolution.next_step.is_some() {
                (Some(Step::None), None)
            } else {
                (None, None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::menu::MenuRegistry;
    use pretty_assertions::assert_eq;

    fn ctx(step: Step, admin_state: AdminState, is_admin: bool) -> EngineCtx {
        EngineCtx {
            step,
            admin_state,
            is_blocked: false,
            is_admin,
        }
    }

    fn ev(text: &str, registry: &MenuRegistry) -> Event {
        Event::classify(text, registry)
    }

    #[test]
    fn blocked_user_is_short_circuited() {
        let registry = MenuRegistry::new();
        let mut c = ctx(Step::None, AdminState::None, false);
        c.is_blocked = true;

        let res = resolve(Flow::Maker, &c, &ev("🤖 Create Bot", &registry));
        assert_eq!(res.action, Action::Banned);
        assert_eq!(res.next_step, None);
        assert_eq!(res.next_admin, None);
    }

    #[test]
    fn blocked_admin_is_not_short_circuited() {
        let registry = MenuRegistry::new();
        let mut c = ctx(Step::None, AdminState::None, true);
        c.is_blocked = true;

        let res = resolve(Flow::Maker, &c, &ev("/panel", &registry));
        assert_eq!(res.action, Action::ShowAdminPanel);
    }

    #[test]
    fn start_resets_both_axes() {
        let registry = MenuRegistry::new();
        let c = ctx(Step::AwaitingToken, AdminState::AwaitingBlockId, true);

        let res = resolve(Flow::Maker, &c, &ev("/start", &registry));
        assert_eq!(res.action, Action::Start { payload: None });
        assert_eq!(res.next_step, Some(Step::None));
        assert_eq!(res.next_admin, Some(AdminState::None));
    }

    #[test]
    fn panel_requires_authority() {
        let registry = MenuRegistry::new();

        let admin = ctx(Step::None, AdminState::None, true);
        let res = resolve(Flow::Maker, &admin, &ev("/panel", &registry));
        assert_eq!(res.action, Action::ShowAdminPanel);
        assert_eq!(res.next_admin, Some(AdminState::Panel));

        let user = ctx(Step::None, AdminState::None, false);
        let res = resolve(Flow::Maker, &user, &ev("/panel", &registry));
        assert_eq!(res.action, Action::None);
    }

    #[test]
    fn admin_axis_takes_precedence_over_ordinary() {
        let registry = MenuRegistry::new();
        // Mid-admin-flow, a message that would be a menu label ordinarily is
        // consumed as admin input.
        let c = ctx(Step::None, AdminState::AwaitingBlockId, true);

        let res = resolve(Flow::Maker, &c, &ev("12345", &registry));
        assert_eq!(
            res.action,
            Action::Block {
                input: "12345".into()
            }
        );
        assert_eq!(res.next_admin, Some(AdminState::Panel));
    }

    #[test]
    fn admin_axis_ignored_for_ordinary_users() {
        let registry = MenuRegistry::new();
        // A stale admin_state on a non-admin session must not be honored.
        let c = ctx(Step::None, AdminState::AwaitingBlockId, false);

        let res = resolve(Flow::Maker, &c, &ev("12345", &registry));
        assert_eq!(res.action, Action::None);
    }

    #[test]
    fn cancel_is_a_wildcard_in_admin_states() {
        let registry = MenuRegistry::new();
        for state in [
            AdminState::AwaitingBroadcast,
            AdminState::AwaitingBlockId,
            AdminState::AwaitingLimit,
            AdminState::AwaitingCustomUrl,
        ] {
            let c = ctx(Step::None, state, true);
            let res = resolve(Flow::Maker, &c, &ev("❌ Cancel", &registry));
            assert_eq!(res.action, Action::Cancelled, "state {:?}", state);
            assert_eq!(res.next_admin, Some(AdminState::Panel));
        }
    }

    #[test]
    fn terminal_state_ignores_unmatched_text() {
        let registry = MenuRegistry::new();
        let c = ctx(Step::None, AdminState::None, false);

        let res = resolve(Flow::Maker, &c, &ev("random chatter", &registry));
        assert_eq!(res.action, Action::None);
        assert_eq!(res.next_step, None);
    }

    #[test]
    fn create_flow_consumes_token_text() {
        let registry = MenuRegistry::new();
        let c = ctx(Step::None, AdminState::None, false);
        let res = resolve(Flow::Maker, &c, &ev("🤖 Create Bot", &registry));
        assert_eq!(res.action, Action::BeginCreate);
        assert_eq!(res.next_step, Some(Step::AwaitingToken));

        let c = ctx(Step::AwaitingToken, AdminState::None, false);
        let res = resolve(Flow::Maker, &c, &ev("12345:AAAA", &registry));
        assert_eq!(
            res.action,
            Action::CreateTenant {
                token: "12345:AAAA".into()
            }
        );
        assert_eq!(res.next_step, Some(Step::None));
    }

    #[test]
    fn tenant_flow_has_no_maker_menu() {
        let registry = MenuRegistry::new();
        let c = ctx(Step::None, AdminState::None, false);

        let res = resolve(Flow::Tenant, &c, &ev("🤖 Create Bot", &registry));
        assert_eq!(res.action, Action::None);
    }

    #[test]
    fn tenant_panel_rejects_maker_only_actions() {
        let registry = MenuRegistry::new();
        let c = ctx(Step::None, AdminState::Panel, true);

        let res = resolve(Flow::Tenant, &c, &ev("⚙️ Creation Mode", &registry));
        assert_eq!(res.action, Action::Hint("use-buttons"));

        let res = resolve(Flow::Tenant, &c, &ev("📢 Broadcast", &registry));
        assert_eq!(res.action, Action::EnterAdmin(AdminState::AwaitingBroadcast));
    }

    #[test]
    fn broadcast_state_accepts_media() {
        let c = ctx(Step::None, AdminState::AwaitingBroadcast, true);
        let res = resolve(Flow::Tenant, &c, &Event::Media);
        assert_eq!(res.action, Action::Broadcast { global: false });
        assert_eq!(res.next_admin, Some(AdminState::Panel));
    }

    #[test]
    fn language_callback_completes_first_start_step() {
        let c = ctx(Step::AwaitingLanguage, AdminState::None, false);
        let res = resolve(Flow::Tenant, &c, &Event::Callback("lang:ru".into()));
        assert_eq!(res.action, Action::SetLanguage("ru".into()));
        assert_eq!(res.next_step, Some(Step::None));

        let c = ctx(Step::None, AdminState::None, false);
        let res = resolve(Flow::Tenant, &c, &Event::Callback("lang:en".into()));
        assert_eq!(res.next_step, None);
    }

    #[test]
    fn mode_callback_requires_authority() {
        let c = ctx(Step::None, AdminState::None, false);
        let res = resolve(Flow::Maker, &c, &Event::Callback("mode:lock".into()));
        assert_eq!(res.action, Action::None);

        let c = ctx(Step::None, AdminState::None, true);
        let res = resolve(Flow::Maker, &c, &Event::Callback("mode:lock".into()));
        assert_eq!(res.action, Action::SetMode("lock".into()));
    }

    // The walkthrough from the admin moderation scenario: /panel, Block,
    // then the three kinds of submissions.
    #[test]
    fn block_scenario_transitions() {
        let registry = MenuRegistry::new();

        let c = ctx(Step::None, AdminState::None, true);
        let res = resolve(Flow::Maker, &c, &ev("/panel", &registry));
        assert_eq!(res.action, Action::ShowAdminPanel);
        assert_eq!(res.next_admin, Some(AdminState::Panel));

        let c = ctx(Step::None, AdminState::Panel, true);
        let res = resolve(Flow::Maker, &c, &ev("🚫 Block", &registry));
        assert_eq!(res.action, Action::EnterAdmin(AdminState::AwaitingBlockId));
        assert_eq!(res.next_admin, Some(AdminState::AwaitingBlockId));

        // "abc" resolves to a Block submission; the handler rejects it as
        // InvalidId and settle() keeps the state for a retry.
        let c = ctx(Step::None, AdminState::AwaitingBlockId, true);
        let res = resolve(Flow::Maker, &c, &ev("abc", &registry));
        assert_eq!(res.action, Action::Block { input: "abc".into() });
        let (step, admin) = settle(&res, Some(ErrorKind::Validation));
        assert_eq!((step, admin), (None, None));

        // Unknown-but-valid id: handler reports NotFound, settle() falls back
        // to the panel.
        let (step, admin) = settle(&res, Some(ErrorKind::NotFound));
        assert_eq!((step, admin), (None, Some(AdminState::Panel)));

        // Success applies the resolved target.
        let (step, admin) = settle(&res, None);
        assert_eq!((step, admin), (None, Some(AdminState::Panel)));
    }

    #[test]
    fn settle_resets_step_flows_on_not_found() {
        let res = Resolution::step(
            Action::DeleteTenant {
                token: "1:unknown".into(),
            },
            Step::None,
        );
        let (step, admin) = settle(&res, Some(ErrorKind::NotFound));
        assert_eq!((step, admin), (Some(Step::None), None));
    }
}
