//! Central JSON command router.
//!
//! Every host message lands in [`dispatch_message`]: the payload is decoded
//! into a [`Command`], folded into the shared [`SessionState`], and the whole
//! widget tree is re-rendered and returned as a JSON string. Outbound work
//! (plate lookups, vehicle actions, battery requests) runs on a dedicated
//! worker thread; completed results are drained into the state at the start
//! of the next dispatch.

use std::sync::{mpsc, Mutex, MutexGuard, OnceLock};
use std::thread;

use log::{debug, warn};
use rust_i18n::t;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::backend::{self, ActionResponse, BatteryResponse, LookupResponse};
use crate::challenge::{ActionPolicy, Challenge, ChallengeOutcome};
use crate::features::battery::{self, BatteryOp};
use crate::features::{hacker_stats, phone_tracker, plate_lookup, radio_decrypt, render_home};
use crate::i18n::update_locale;
use crate::state::{AppScreen, NoticeKind, SessionState, VehicleInfo};
use crate::ui::{widget, Banner, Column, Text};

/// Incoming command payload. All fields except `action` are optional; each
/// action consumes the subset it cares about and ignores the rest.
#[derive(Debug, Deserialize)]
struct Command {
    action: String,
    plate: Option<String>,
    app: Option<String>,
    input: Option<String>,
    number: Option<String>,
    frequency: Option<String>,
    vehicle_action: Option<String>,
    data: Option<Value>,
    level: Option<f64>,
    xp: Option<f64>,
    #[serde(rename = "nextLevelXP", alias = "next_level_xp")]
    next_level_xp: Option<f64>,
    #[serde(rename = "levelName", alias = "level_name")]
    level_name: Option<String>,
    #[serde(rename = "batteryLevel", alias = "battery_level")]
    battery_level: Option<f64>,
    charging: Option<bool>,
    locale: Option<String>,
    index: Option<usize>,
}

#[derive(Debug)]
enum Action {
    Init,
    SetLocale {
        locale: String,
    },
    OpenSession {
        level: Option<f64>,
        xp: Option<f64>,
        next_level_xp: Option<f64>,
        level_name: Option<String>,
        battery_level: Option<f64>,
        charging: Option<bool>,
    },
    CloseSession,
    CloseRequest,
    OpenApp {
        app: Option<String>,
    },
    Home,
    PlateLookup {
        plate: Option<String>,
    },
    VehicleData {
        data: Option<Value>,
    },
    BatteryUpdate {
        level: Option<f64>,
        charging: Option<bool>,
    },
    HackerStats {
        level: Option<f64>,
        xp: Option<f64>,
        next_level_xp: Option<f64>,
        level_name: Option<String>,
    },
    VehicleAction {
        action: Option<String>,
        plate: Option<String>,
    },
    ChallengeInput {
        input: String,
    },
    ChallengeSubmit {
        input: String,
    },
    ChallengeCancel,
    ChallengeTick,
    BatteryMenu,
    ReplaceBattery,
    ToggleCharger,
    TrackPhone {
        number: Option<String>,
    },
    DecryptRadio {
        frequency: Option<String>,
    },
    NoticeDismiss {
        index: Option<usize>,
    },
}

fn parse_action(command: Command) -> Result<Action, String> {
    let action = match command.action.as_str() {
        "init" => Action::Init,
        "set_locale" => Action::SetLocale {
            locale: command.locale.unwrap_or_default(),
        },
        "open_session" | "open_phone" | "open_laptop" => Action::OpenSession {
            level: command.level,
            xp: command.xp,
            next_level_xp: command.next_level_xp,
            level_name: command.level_name,
            battery_level: command.battery_level,
            charging: command.charging,
        },
        "close_session" | "close_phone" | "close_laptop" => Action::CloseSession,
        "close_request" => Action::CloseRequest,
        "open_app" => Action::OpenApp { app: command.app },
        "close_app" | "home" => Action::Home,
        "plate_lookup" => Action::PlateLookup {
            plate: command.plate.or(command.input),
        },
        "vehicle_data" => Action::VehicleData { data: command.data },
        "battery_update" => Action::BatteryUpdate {
            level: command.battery_level.or(command.level),
            charging: command.charging,
        },
        "hacker_stats" => Action::HackerStats {
            level: command.level,
            xp: command.xp,
            next_level_xp: command.next_level_xp,
            level_name: command.level_name,
        },
        "vehicle_action" => Action::VehicleAction {
            action: command.vehicle_action,
            plate: command.plate,
        },
        "challenge_input" => Action::ChallengeInput {
            input: command.input.unwrap_or_default(),
        },
        "challenge_submit" => Action::ChallengeSubmit {
            input: command.input.unwrap_or_default(),
        },
        "challenge_cancel" => Action::ChallengeCancel,
        "challenge_tick" => Action::ChallengeTick,
        "battery_menu" => Action::BatteryMenu,
        "replace_battery" => Action::ReplaceBattery,
        "toggle_charger" => Action::ToggleCharger,
        "track_phone" => Action::TrackPhone {
            number: command.number.or(command.input),
        },
        "decrypt_radio" => Action::DecryptRadio {
            frequency: command.frequency.or(command.input),
        },
        "notice_dismiss" => Action::NoticeDismiss {
            index: command.index,
        },
        other => return Err(format!("unknown_action:{other}")),
    };
    Ok(action)
}

// ---------------------------------------------------------------------------
// Outbound worker

/// A request to the host backend, tagged with a correlation id for logging.
struct OutboundRequest {
    id: Uuid,
    job: OutboundJob,
}

#[derive(Debug)]
enum OutboundJob {
    Lookup { plate: String },
    VehicleAction { action: String, plate: String },
    TrackVehicle { plate: String },
    ReplaceBattery,
    ToggleCharger,
    CloseSession,
}

/// Completed backend call, queued for the next dispatch to fold into state.
enum OutboundResult {
    Lookup {
        plate: String,
        value: Result<LookupResponse, String>,
    },
    VehicleAction {
        action: String,
        plate: String,
        value: Result<ActionResponse, String>,
    },
    Battery {
        op: BatteryOp,
        value: Result<BatteryResponse, String>,
    },
}

fn run_outbound(request: OutboundRequest) -> Option<OutboundResult> {
    let OutboundRequest { id, job } = request;
    debug!("outbound request {id}: {job:?}");
    let client = match backend::backend() {
        Ok(client) => client,
        Err(error) => {
            warn!("outbound request {id} has no backend: {error}");
            return failed_result(job, error);
        }
    };
    match job {
        OutboundJob::Lookup { plate } => {
            let value = client.lookup_plate(&plate);
            Some(OutboundResult::Lookup { plate, value })
        }
        OutboundJob::VehicleAction { action, plate } => {
            let value = client.vehicle_action(&action, &plate);
            Some(OutboundResult::VehicleAction {
                action,
                plate,
                value,
            })
        }
        OutboundJob::TrackVehicle { plate } => {
            let value = client.track_vehicle(&plate);
            Some(OutboundResult::VehicleAction {
                action: "track".to_string(),
                plate,
                value,
            })
        }
        OutboundJob::ReplaceBattery => Some(OutboundResult::Battery {
            op: BatteryOp::Replace,
            value: client.replace_battery(),
        }),
        OutboundJob::ToggleCharger => Some(OutboundResult::Battery {
            op: BatteryOp::Charger,
            value: client.toggle_charger(),
        }),
        OutboundJob::CloseSession => {
            client.close_session();
            None
        }
    }
}

fn failed_result(job: OutboundJob, error: String) -> Option<OutboundResult> {
    match job {
        OutboundJob::Lookup { plate } => Some(OutboundResult::Lookup {
            plate,
            value: Err(error),
        }),
        OutboundJob::VehicleAction { action, plate } => Some(OutboundResult::VehicleAction {
            action,
            plate,
            value: Err(error),
        }),
        OutboundJob::TrackVehicle { plate } => Some(OutboundResult::VehicleAction {
            action: "track".to_string(),
            plate,
            value: Err(error),
        }),
        OutboundJob::ReplaceBattery => Some(OutboundResult::Battery {
            op: BatteryOp::Replace,
            value: Err(error),
        }),
        OutboundJob::ToggleCharger => Some(OutboundResult::Battery {
            op: BatteryOp::Charger,
            value: Err(error),
        }),
        OutboundJob::CloseSession => None,
    }
}

struct WorkerRuntime {
    sender: mpsc::Sender<OutboundRequest>,
}

#[cfg(test)]
static TEST_FORCE_ASYNC_WORKER: std::sync::atomic::AtomicBool =
    std::sync::atomic::AtomicBool::new(false);

impl WorkerRuntime {
    fn start() -> Self {
        let (sender, receiver) = mpsc::channel::<OutboundRequest>();
        let builder = thread::Builder::new().name("hackerjob-worker".to_string());
        let spawned = builder.spawn(move || {
            while let Ok(request) = receiver.recv() {
                if let Some(result) = run_outbound(request) {
                    STATE.push_outbound_result(result);
                }
            }
        });
        if let Err(error) = spawned {
            warn!("failed to spawn worker thread: {error}");
        }
        WorkerRuntime { sender }
    }

    #[cfg(not(test))]
    fn enqueue(&self, request: OutboundRequest) -> Result<(), String> {
        self.sender
            .send(request)
            .map_err(|_| "worker_unavailable".to_string())
    }

    // Tests run jobs inline so assertions see results synchronously, unless a
    // test opts back into the real thread via TEST_FORCE_ASYNC_WORKER.
    #[cfg(test)]
    fn enqueue(&self, request: OutboundRequest) -> Result<(), String> {
        if TEST_FORCE_ASYNC_WORKER.load(std::sync::atomic::Ordering::SeqCst) {
            self.sender
                .send(request)
                .map_err(|_| "worker_unavailable".to_string())
        } else {
            if let Some(result) = run_outbound(request) {
                STATE.push_outbound_result(result);
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Global state

struct GlobalState {
    ui: Mutex<SessionState>,
    worker: OnceLock<WorkerRuntime>,
    notifications: Mutex<Vec<OutboundResult>>,
}

impl GlobalState {
    const fn new() -> Self {
        GlobalState {
            ui: Mutex::new(SessionState::new()),
            worker: OnceLock::new(),
            notifications: Mutex::new(Vec::new()),
        }
    }

    fn ui_lock(&self) -> MutexGuard<'_, SessionState> {
        match self.ui.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("session state mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn worker(&self) -> &WorkerRuntime {
        self.worker.get_or_init(WorkerRuntime::start)
    }

    fn push_outbound_result(&self, result: OutboundResult) {
        match self.notifications.lock() {
            Ok(mut queue) => queue.push(result),
            Err(poisoned) => poisoned.into_inner().push(result),
        }
    }

    fn drain_outbound_results(&self) -> Vec<OutboundResult> {
        match self.notifications.lock() {
            Ok(mut queue) => queue.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        }
    }
}

static STATE: GlobalState = GlobalState::new();

fn action_policy() -> &'static ActionPolicy {
    static POLICY: OnceLock<ActionPolicy> = OnceLock::new();
    POLICY.get_or_init(ActionPolicy::default)
}

fn enqueue_job(state: &mut SessionState, job: OutboundJob) {
    let request = OutboundRequest {
        id: Uuid::new_v4(),
        job,
    };
    if let Err(error) = STATE.worker().enqueue(request) {
        state.last_error = Some(error);
    }
}

// ---------------------------------------------------------------------------
// Command handling

fn sanitize_positive(value: Option<f64>, fallback: u32) -> u32 {
    value
        .filter(|v| v.is_finite() && *v >= 1.0)
        .map(|v| v as u32)
        .unwrap_or(fallback)
}

fn sanitize_non_negative(value: Option<f64>, fallback: u32) -> u32 {
    value
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u32)
        .unwrap_or(fallback)
}

fn sanitize_battery(value: Option<f64>, fallback: u8) -> u8 {
    value
        .filter(|v| v.is_finite() && (0.0..=100.0).contains(v))
        .map(|v| v.round() as u8)
        .unwrap_or(fallback)
}

fn handle_vehicle_action(state: &mut SessionState, action: Option<String>, plate: Option<String>) {
    let Some(action) = action.filter(|a| !a.is_empty()) else {
        state.last_error = Some("missing_action".to_string());
        return;
    };
    let plate = match plate_lookup::normalize_plate(&plate.unwrap_or_default()) {
        Ok(plate) => plate,
        Err(error) => {
            state.last_error = Some(error);
            return;
        }
    };
    if action_policy().requires_challenge(&action) {
        if state.challenge_pending() {
            warn!("rejecting {action} for {plate}: a verification is already running");
            state.last_error = Some("challenge_active".to_string());
        } else {
            state.challenge = Some(Challenge::start(&action, &plate, action_policy()));
        }
    } else {
        enqueue_job(state, OutboundJob::VehicleAction { action, plate });
    }
}

/// Consumes a finished challenge. Success dispatches the deferred action,
/// failure surfaces the lockout notice, cancellation is silent.
fn resolve_challenge(state: &mut SessionState) {
    if state.challenge_pending() {
        return;
    }
    let Some(challenge) = state.challenge.take() else {
        return;
    };
    match challenge.outcome() {
        ChallengeOutcome::Succeeded => {
            state.push_notice(NoticeKind::Success, t!("challenge.granted").into_owned());
            let plate = challenge.plate().to_string();
            let job = if challenge.action() == "track" {
                OutboundJob::TrackVehicle { plate }
            } else {
                OutboundJob::VehicleAction {
                    action: challenge.action().to_string(),
                    plate,
                }
            };
            enqueue_job(state, job);
        }
        ChallengeOutcome::Failed => {
            state.push_notice(NoticeKind::Failure, t!("challenge.lockout").into_owned());
        }
        ChallengeOutcome::Cancelled | ChallengeOutcome::Pending => {}
    }
}

fn apply_worker_results(state: &mut SessionState) {
    for result in STATE.drain_outbound_results() {
        match result {
            OutboundResult::Lookup { plate, value } => match value {
                Ok(response) if response.success => {
                    // Vehicle data follows as a separate inbound event.
                    debug!("lookup acknowledged for {plate}");
                }
                Ok(response) => {
                    state.lookup.pending = false;
                    state.lookup.error =
                        Some(response.message.unwrap_or_else(|| "no_results".to_string()));
                }
                Err(error) => {
                    warn!("lookup for {plate} failed: {error}");
                    state.lookup.pending = false;
                    state.lookup.error = Some("connection_error".to_string());
                }
            },
            OutboundResult::VehicleAction {
                action,
                plate,
                value,
            } => match value {
                Ok(response) if response.success => state.push_notice(
                    NoticeKind::Success,
                    plate_lookup::action_success_message(&action, &plate),
                ),
                Ok(_) => state.push_notice(
                    NoticeKind::Failure,
                    plate_lookup::action_failed_message(&action, &plate),
                ),
                Err(error) => {
                    warn!("vehicle action {action} on {plate} failed: {error}");
                    state.push_notice(
                        NoticeKind::Failure,
                        plate_lookup::action_failed_message(&action, &plate),
                    );
                }
            },
            OutboundResult::Battery { op, value } => {
                battery::apply_battery_result(state, op, value);
            }
        }
    }
}

fn handle_command(command: Command) -> Value {
    let mut state = STATE.ui_lock();
    apply_worker_results(&mut state);

    let action = match parse_action(command) {
        Ok(action) => action,
        Err(error) => {
            warn!("rejected command: {error}");
            state.last_error = Some(error);
            return render_ui(&state);
        }
    };

    match action {
        Action::Init => {}
        Action::SetLocale { locale } => {
            update_locale(&mut state, &locale);
            debug!("locale set to {}", state.locale);
        }
        Action::OpenSession {
            level,
            xp,
            next_level_xp,
            level_name,
            battery_level,
            charging,
        } => {
            if state.open {
                debug!("session already open");
            } else {
                state.reset_session();
                state.open = true;
                state.stats.level = sanitize_positive(level, 1);
                state.stats.xp = sanitize_non_negative(xp, 0);
                state.stats.next_level_xp = sanitize_positive(next_level_xp, 100);
                state.stats.level_name = level_name.unwrap_or_default();
                let level = sanitize_battery(battery_level, state.battery.level);
                let charging = charging.unwrap_or(state.battery.charging);
                state.set_battery(level, charging);
            }
        }
        Action::CloseSession => state.reset_session(),
        Action::CloseRequest => {
            enqueue_job(&mut state, OutboundJob::CloseSession);
            state.reset_session();
        }
        Action::OpenApp { app } => match app.as_deref().and_then(AppScreen::parse) {
            Some(app) => state.open_app(app),
            None => {
                warn!("unknown app id: {app:?}");
                state.last_error = Some("unknown_app".to_string());
            }
        },
        Action::Home => state.go_home(),
        Action::PlateLookup { plate } => {
            state.open_app(AppScreen::PlateLookup);
            match plate_lookup::normalize_plate(&plate.unwrap_or_default()) {
                Ok(plate) => {
                    state.vehicle = None;
                    state.lookup.pending = true;
                    state.lookup.plate = Some(plate.clone());
                    state.lookup.error = None;
                    enqueue_job(&mut state, OutboundJob::Lookup { plate });
                }
                Err(error) => {
                    state.lookup.pending = false;
                    state.lookup.error = Some(error);
                }
            }
        }
        Action::VehicleData { data } => match data {
            Some(data) => match serde_json::from_value::<VehicleInfo>(data) {
                Ok(vehicle) => {
                    state.lookup.pending = false;
                    state.lookup.error = None;
                    state.vehicle = Some(vehicle);
                }
                Err(error) => warn!("malformed vehicle data ignored: {error}"),
            },
            None => warn!("vehicle data event without payload"),
        },
        Action::BatteryUpdate { level, charging } => {
            match level.filter(|l| l.is_finite() && (0.0..=100.0).contains(l)) {
                Some(level) => {
                    let charging = charging.unwrap_or(state.battery.charging);
                    state.set_battery(level.round() as u8, charging);
                }
                None => warn!("battery update with invalid level ignored"),
            }
        }
        Action::HackerStats {
            level,
            xp,
            next_level_xp,
            level_name,
        } => {
            state.stats.level = sanitize_positive(level, state.stats.level);
            state.stats.xp = sanitize_non_negative(xp, state.stats.xp);
            state.stats.next_level_xp = sanitize_positive(next_level_xp, state.stats.next_level_xp);
            if let Some(name) = level_name {
                state.stats.level_name = name;
            }
        }
        Action::VehicleAction { action, plate } => handle_vehicle_action(&mut state, action, plate),
        Action::ChallengeInput { input } => {
            if let Some(challenge) = state.challenge.as_mut() {
                challenge.input_changed(&input);
            }
            resolve_challenge(&mut state);
        }
        Action::ChallengeSubmit { input } => {
            if let Some(challenge) = state.challenge.as_mut() {
                challenge.submit(&input);
            }
            resolve_challenge(&mut state);
        }
        Action::ChallengeCancel => {
            if let Some(challenge) = state.challenge.as_mut() {
                challenge.cancel();
            }
            resolve_challenge(&mut state);
        }
        Action::ChallengeTick => {
            if let Some(challenge) = state.challenge.as_mut() {
                challenge.tick();
            }
            resolve_challenge(&mut state);
        }
        Action::BatteryMenu => state.battery_menu_open = !state.battery_menu_open,
        Action::ReplaceBattery => enqueue_job(&mut state, OutboundJob::ReplaceBattery),
        Action::ToggleCharger => enqueue_job(&mut state, OutboundJob::ToggleCharger),
        Action::TrackPhone { number } => {
            state.open_app(AppScreen::PhoneTracker);
            phone_tracker::handle_track(&mut state, number);
        }
        Action::DecryptRadio { frequency } => {
            state.open_app(AppScreen::RadioDecrypt);
            radio_decrypt::handle_decrypt(&mut state, frequency);
        }
        Action::NoticeDismiss { index } => match index {
            Some(index) if index < state.notices.len() => {
                state.notices.remove(index);
            }
            Some(index) => debug!("notice index {index} out of range"),
            None => state.notices.clear(),
        },
    }

    // New worker results may exist already when tests run jobs inline.
    apply_worker_results(&mut state);
    render_ui(&state)
}

// ---------------------------------------------------------------------------
// Rendering

fn render_ui(state: &SessionState) -> Value {
    if !state.open {
        return json!({ "type": "Hidden" });
    }

    let mut children = vec![hacker_stats::render_status_bar(state)];

    for notice in &state.notices {
        let variant = match notice.kind {
            NoticeKind::Success => "success",
            NoticeKind::Failure => "failure",
        };
        children.push(widget(
            Banner::new(variant, &notice.message).dismiss_action("notice_dismiss"),
        ));
    }

    if let Some(error) = &state.last_error {
        children.push(widget(Text::new(error).size(12.0).tone("error")));
    }

    children.push(match state.active_app {
        None => render_home(state),
        Some(AppScreen::PlateLookup) => plate_lookup::render_plate_lookup(state),
        Some(AppScreen::PhoneTracker) => phone_tracker::render_phone_tracker(state),
        Some(AppScreen::RadioDecrypt) => radio_decrypt::render_radio_decrypt(state),
    });

    if state.battery_menu_open {
        children.push(battery::render_menu(state));
    }

    // The verification overlay always renders on top.
    if let Some(challenge) = state.challenge.as_ref().filter(|c| c.is_pending()) {
        children.push(plate_lookup::render_challenge_overlay(challenge));
    }

    widget(Column::new(children))
}

pub(crate) fn error_ui(message: &str) -> Value {
    json!({
        "type": "Column",
        "children": [
            { "type": "Text", "text": format!("Error: {message}"), "tone": "error" }
        ]
    })
}

/// Decodes one host message, applies it, and returns the rendered UI tree.
pub fn dispatch_message(input: &str) -> String {
    let command: Command = match serde_json::from_str(input) {
        Ok(command) => command,
        Err(error) => {
            warn!("invalid command payload: {error}");
            return error_ui("invalid_json").to_string();
        }
    };
    handle_command(command).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{set_backend, Backend};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    // Router tests share the global session state, so they run one at a time.
    static TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn test_guard() -> MutexGuard<'static, ()> {
        match TEST_MUTEX.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn reset_state() {
        let mut state = STATE.ui_lock();
        *state = SessionState::new();
        drop(state);
        STATE.drain_outbound_results();
        TEST_FORCE_ASYNC_WORKER.store(false, Ordering::SeqCst);
        rust_i18n::set_locale("en");
    }

    fn dispatch(payload: Value) -> Value {
        let rendered = dispatch_message(&payload.to_string());
        serde_json::from_str(&rendered).unwrap()
    }

    fn open_session() -> Value {
        dispatch(json!({ "action": "open_session", "batteryLevel": 100.0 }))
    }

    fn extract_texts(node: &Value, out: &mut Vec<String>) {
        if let Some(text) = node.get("text").and_then(Value::as_str) {
            out.push(text.to_string());
        }
        if let Some(children) = node.get("children").and_then(Value::as_array) {
            for child in children {
                extract_texts(child, out);
            }
        }
    }

    fn texts_of(tree: &Value) -> Vec<String> {
        let mut out = Vec::new();
        extract_texts(tree, &mut out);
        out
    }

    fn assert_contains_text(tree: &Value, needle: &str) {
        let texts = texts_of(tree);
        assert!(
            texts.iter().any(|t| t.contains(needle)),
            "expected {needle:?} in {texts:?}"
        );
    }

    fn current_challenge_code() -> String {
        let state = STATE.ui_lock();
        state
            .challenge
            .as_ref()
            .map(|c| c.code().to_string())
            .unwrap()
    }

    #[derive(Default)]
    struct ScriptedBackend {
        fail_actions: bool,
        fail_lookup: bool,
        fail_battery: bool,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl Backend for ScriptedBackend {
        fn lookup_plate(&self, plate: &str) -> Result<LookupResponse, String> {
            self.record(format!("lookup:{plate}"));
            if self.fail_lookup {
                Err("connection refused".to_string())
            } else {
                Ok(LookupResponse {
                    success: true,
                    message: None,
                })
            }
        }

        fn vehicle_action(&self, action: &str, plate: &str) -> Result<ActionResponse, String> {
            self.record(format!("action:{action}:{plate}"));
            Ok(ActionResponse {
                success: !self.fail_actions,
            })
        }

        fn track_vehicle(&self, plate: &str) -> Result<ActionResponse, String> {
            self.record(format!("track:{plate}"));
            Ok(ActionResponse {
                success: !self.fail_actions,
            })
        }

        fn replace_battery(&self) -> Result<BatteryResponse, String> {
            self.record("replace_battery".to_string());
            if self.fail_battery {
                Ok(BatteryResponse {
                    success: false,
                    battery_level: 0,
                    charging: None,
                    message: Some("No spare battery in inventory".to_string()),
                })
            } else {
                Ok(BatteryResponse {
                    success: true,
                    battery_level: 100,
                    charging: Some(false),
                    message: None,
                })
            }
        }

        fn toggle_charger(&self) -> Result<BatteryResponse, String> {
            self.record("toggle_charger".to_string());
            Ok(BatteryResponse {
                success: true,
                battery_level: 40,
                charging: Some(true),
                message: None,
            })
        }
    }

    fn install_backend(backend: ScriptedBackend) -> Arc<ScriptedBackend> {
        let backend = Arc::new(backend);
        set_backend(backend.clone());
        backend
    }

    #[test]
    fn hidden_tree_while_session_closed() {
        let _guard = test_guard();
        reset_state();
        let tree = dispatch(json!({ "action": "init" }));
        assert_eq!(tree["type"], "Hidden");
    }

    #[test]
    fn open_session_sanitizes_bad_stats() {
        let _guard = test_guard();
        reset_state();
        let tree = dispatch(json!({
            "action": "open_session",
            "level": -5.0,
            "xp": -10.0,
            "batteryLevel": 400.0,
        }));
        assert_ne!(tree["type"], "Hidden");
        let state = STATE.ui_lock();
        assert_eq!(state.stats.level, 1);
        assert_eq!(state.stats.xp, 0);
        assert_eq!(state.stats.next_level_xp, 100);
        assert_eq!(state.battery.level, 100);
    }

    #[test]
    fn reopen_while_open_keeps_state() {
        let _guard = test_guard();
        reset_state();
        open_session();
        dispatch(json!({ "action": "open_app", "app": "phone_tracker" }));
        dispatch(json!({ "action": "open_session", "level": 7.0 }));
        let state = STATE.ui_lock();
        assert_eq!(state.active_app, Some(AppScreen::PhoneTracker));
        assert_eq!(state.stats.level, 1);
    }

    #[test]
    fn ungated_action_dispatches_immediately() {
        let _guard = test_guard();
        reset_state();
        let backend = install_backend(ScriptedBackend::default());
        open_session();
        let tree = dispatch(json!({
            "action": "vehicle_action",
            "vehicle_action": "lock",
            "plate": "abc 123",
        }));
        assert_eq!(backend.calls(), vec!["action:lock:ABC 123"]);
        assert!(STATE.ui_lock().challenge.is_none());
        assert_contains_text(&tree, "successfully locked remotely");
    }

    #[test]
    fn gated_action_starts_challenge_without_dispatch() {
        let _guard = test_guard();
        reset_state();
        let backend = install_backend(ScriptedBackend::default());
        open_session();
        let tree = dispatch(json!({
            "action": "vehicle_action",
            "vehicle_action": "disable_brakes",
            "plate": "ABC123",
        }));
        assert!(backend.calls().is_empty());
        assert_contains_text(&tree, "SECURITY VERIFICATION REQUIRED");
        let state = STATE.ui_lock();
        let challenge = state.challenge.as_ref().unwrap();
        assert_eq!(challenge.time_limit_secs(), 3);
        assert!((5..=6).contains(&challenge.code().len()));
    }

    #[test]
    fn second_gated_request_rejected_while_pending() {
        let _guard = test_guard();
        reset_state();
        install_backend(ScriptedBackend::default());
        open_session();
        dispatch(json!({
            "action": "vehicle_action",
            "vehicle_action": "track",
            "plate": "ABC123",
        }));
        let code = current_challenge_code();
        let tree = dispatch(json!({
            "action": "vehicle_action",
            "vehicle_action": "accelerate",
            "plate": "XYZ789",
        }));
        assert_contains_text(&tree, "challenge_active");
        let state = STATE.ui_lock();
        let challenge = state.challenge.as_ref().unwrap();
        assert_eq!(challenge.action(), "track");
        assert_eq!(challenge.code(), code);
    }

    #[test]
    fn challenge_times_out_after_limit_ticks() {
        let _guard = test_guard();
        reset_state();
        let backend = install_backend(ScriptedBackend::default());
        open_session();
        dispatch(json!({
            "action": "vehicle_action",
            "vehicle_action": "disable_brakes",
            "plate": "ABC123",
        }));
        dispatch(json!({ "action": "challenge_tick" }));
        dispatch(json!({ "action": "challenge_tick" }));
        let tree = dispatch(json!({ "action": "challenge_tick" }));
        assert!(backend.calls().is_empty());
        assert_contains_text(&tree, "Security lockout activated");
        assert!(STATE.ui_lock().challenge.is_none());
    }

    #[test]
    fn correct_submission_dispatches_tracker_once() {
        let _guard = test_guard();
        reset_state();
        let backend = install_backend(ScriptedBackend::default());
        open_session();
        dispatch(json!({
            "action": "vehicle_action",
            "vehicle_action": "track",
            "plate": "QWERTY",
        }));
        let code = current_challenge_code();
        let tree = dispatch(json!({ "action": "challenge_submit", "input": code }));
        assert_eq!(backend.calls(), vec!["track:QWERTY"]);
        assert_contains_text(&tree, "Access granted");
        assert_contains_text(&tree, "GPS tracker activated for vehicle QWERTY");
    }

    #[test]
    fn input_change_resolves_only_on_full_match() {
        let _guard = test_guard();
        reset_state();
        let backend = install_backend(ScriptedBackend::default());
        open_session();
        dispatch(json!({
            "action": "vehicle_action",
            "vehicle_action": "accelerate",
            "plate": "ABC123",
        }));
        let code = current_challenge_code();
        let prefix = &code[..code.len() - 1];
        dispatch(json!({ "action": "challenge_input", "input": prefix }));
        assert!(STATE.ui_lock().challenge_pending());
        assert!(backend.calls().is_empty());
        dispatch(json!({ "action": "challenge_input", "input": code }));
        assert_eq!(backend.calls(), vec!["action:accelerate:ABC123"]);
        assert!(STATE.ui_lock().challenge.is_none());
    }

    #[test]
    fn wrong_submission_locks_out() {
        let _guard = test_guard();
        reset_state();
        let backend = install_backend(ScriptedBackend::default());
        open_session();
        dispatch(json!({
            "action": "vehicle_action",
            "vehicle_action": "disable_brakes",
            "plate": "ABC123",
        }));
        let tree = dispatch(json!({ "action": "challenge_submit", "input": "WRONG" }));
        assert!(backend.calls().is_empty());
        assert_contains_text(&tree, "Security lockout activated");
    }

    #[test]
    fn cancel_discards_challenge_silently() {
        let _guard = test_guard();
        reset_state();
        let backend = install_backend(ScriptedBackend::default());
        open_session();
        dispatch(json!({
            "action": "vehicle_action",
            "vehicle_action": "track",
            "plate": "ABC123",
        }));
        let tree = dispatch(json!({ "action": "challenge_cancel" }));
        assert!(backend.calls().is_empty());
        assert!(STATE.ui_lock().challenge.is_none());
        assert!(STATE.ui_lock().notices.is_empty());
        assert!(!texts_of(&tree)
            .iter()
            .any(|t| t.contains("lockout") || t.contains("granted")));
    }

    #[test]
    fn stale_ticks_after_resolution_are_ignored() {
        let _guard = test_guard();
        reset_state();
        let backend = install_backend(ScriptedBackend::default());
        open_session();
        dispatch(json!({
            "action": "vehicle_action",
            "vehicle_action": "track",
            "plate": "ABC123",
        }));
        let code = current_challenge_code();
        dispatch(json!({ "action": "challenge_submit", "input": code }));
        dispatch(json!({ "action": "challenge_tick" }));
        dispatch(json!({ "action": "challenge_submit", "input": "JUNK" }));
        // One success notice plus the tracker result, one outbound call.
        assert_eq!(backend.calls(), vec!["track:ABC123"]);
        assert_eq!(STATE.ui_lock().notices.len(), 2);
    }

    #[test]
    fn plate_lookup_validates_and_dispatches() {
        let _guard = test_guard();
        reset_state();
        let backend = install_backend(ScriptedBackend::default());
        open_session();
        let tree = dispatch(json!({ "action": "plate_lookup", "plate": "a!" }));
        assert_contains_text(&tree, "Invalid plate format");
        assert!(backend.calls().is_empty());

        dispatch(json!({ "action": "plate_lookup", "plate": "  abc123  " }));
        assert_eq!(backend.calls(), vec!["lookup:ABC123"]);
        assert!(STATE.ui_lock().lookup.pending);
    }

    #[test]
    fn vehicle_data_event_renders_card() {
        let _guard = test_guard();
        reset_state();
        install_backend(ScriptedBackend::default());
        open_session();
        dispatch(json!({ "action": "plate_lookup", "plate": "ABC123" }));
        let tree = dispatch(json!({
            "action": "vehicle_data",
            "data": {
                "plate": "ABC123",
                "owner": "Jane Doe",
                "ownertype": "player",
                "make": "Bravado",
                "model": "Buffalo",
                "class": "Sedans",
                "vin": "1HGCM82633A004352",
                "flags": { "stolen": true }
            },
        }));
        assert_contains_text(&tree, "Jane Doe");
        assert_contains_text(&tree, "Bravado");
        assert_contains_text(&tree, "STOLEN");
        assert!(!STATE.ui_lock().lookup.pending);
    }

    #[test]
    fn malformed_vehicle_data_leaves_state_unchanged() {
        let _guard = test_guard();
        reset_state();
        install_backend(ScriptedBackend::default());
        open_session();
        dispatch(json!({ "action": "plate_lookup", "plate": "ABC123" }));
        dispatch(json!({ "action": "vehicle_data", "data": [1, 2, 3] }));
        let state = STATE.ui_lock();
        assert!(state.vehicle.is_none());
        assert!(state.lookup.pending);
    }

    #[test]
    fn lookup_transport_failure_surfaces_connection_error() {
        let _guard = test_guard();
        reset_state();
        install_backend(ScriptedBackend {
            fail_lookup: true,
            ..ScriptedBackend::default()
        });
        open_session();
        let tree = dispatch(json!({ "action": "plate_lookup", "plate": "ABC123" }));
        assert_contains_text(&tree, "Connection error");
        assert!(!STATE.ui_lock().lookup.pending);
    }

    #[test]
    fn failed_action_uses_failure_catalog() {
        let _guard = test_guard();
        reset_state();
        install_backend(ScriptedBackend {
            fail_actions: true,
            ..ScriptedBackend::default()
        });
        open_session();
        let tree = dispatch(json!({
            "action": "vehicle_action",
            "vehicle_action": "unlock",
            "plate": "ABC123",
        }));
        assert_contains_text(&tree, "Failed to unlock vehicle ABC123");
    }

    #[test]
    fn battery_update_event_applies_valid_levels_only() {
        let _guard = test_guard();
        reset_state();
        open_session();
        dispatch(json!({ "action": "battery_update", "level": 42.4, "charging": true }));
        {
            let state = STATE.ui_lock();
            assert_eq!(state.battery.level, 42);
            assert!(state.battery.charging);
        }
        dispatch(json!({ "action": "battery_update", "level": -3.0 }));
        let state = STATE.ui_lock();
        assert_eq!(state.battery.level, 42);
        assert!(state.battery.charging);
    }

    #[test]
    fn replace_battery_failure_shows_message() {
        let _guard = test_guard();
        reset_state();
        install_backend(ScriptedBackend {
            fail_battery: true,
            ..ScriptedBackend::default()
        });
        open_session();
        dispatch(json!({ "action": "battery_menu" }));
        let tree = dispatch(json!({ "action": "replace_battery" }));
        assert_contains_text(&tree, "No spare battery in inventory");
    }

    #[test]
    fn charger_toggle_updates_battery_state() {
        let _guard = test_guard();
        reset_state();
        install_backend(ScriptedBackend::default());
        open_session();
        dispatch(json!({ "action": "toggle_charger" }));
        let state = STATE.ui_lock();
        assert_eq!(state.battery.level, 40);
        assert!(state.battery.charging);
    }

    #[test]
    fn unknown_action_renders_inline_error() {
        let _guard = test_guard();
        reset_state();
        open_session();
        let tree = dispatch(json!({ "action": "selfdestruct" }));
        assert_contains_text(&tree, "unknown_action:selfdestruct");
    }

    #[test]
    fn malformed_json_returns_error_tree() {
        let _guard = test_guard();
        reset_state();
        let rendered = dispatch_message("{ not json");
        let tree: Value = serde_json::from_str(&rendered).unwrap();
        assert_contains_text(&tree, "Error: invalid_json");
    }

    #[test]
    fn close_request_notifies_backend_and_hides() {
        let _guard = test_guard();
        reset_state();
        install_backend(ScriptedBackend::default());
        open_session();
        let tree = dispatch(json!({ "action": "close_request" }));
        assert_eq!(tree["type"], "Hidden");
        assert!(!STATE.ui_lock().open);
    }

    #[test]
    fn close_session_preserves_battery_and_stats() {
        let _guard = test_guard();
        reset_state();
        open_session();
        dispatch(json!({
            "action": "hacker_stats",
            "level": 3.0,
            "xp": 250.0,
            "nextLevelXP": 400.0,
            "levelName": "Coder",
        }));
        dispatch(json!({ "action": "battery_update", "level": 55.0 }));
        dispatch(json!({ "action": "close_session" }));
        let state = STATE.ui_lock();
        assert!(!state.open);
        assert_eq!(state.stats.level, 3);
        assert_eq!(state.stats.level_name, "Coder");
        assert_eq!(state.battery.level, 55);
    }

    #[test]
    fn notice_dismiss_by_index_and_wholesale() {
        let _guard = test_guard();
        reset_state();
        install_backend(ScriptedBackend::default());
        open_session();
        dispatch(json!({ "action": "vehicle_action", "vehicle_action": "lock", "plate": "A1" }));
        dispatch(json!({ "action": "vehicle_action", "vehicle_action": "unlock", "plate": "A1" }));
        assert_eq!(STATE.ui_lock().notices.len(), 2);
        dispatch(json!({ "action": "notice_dismiss", "index": 0 }));
        assert_eq!(STATE.ui_lock().notices.len(), 1);
        dispatch(json!({ "action": "notice_dismiss" }));
        assert!(STATE.ui_lock().notices.is_empty());
    }

    #[test]
    fn phone_tracker_rejects_short_numbers() {
        let _guard = test_guard();
        reset_state();
        open_session();
        let tree = dispatch(json!({ "action": "track_phone", "number": "555-12" }));
        assert_contains_text(&tree, "Invalid phone number");
        assert!(STATE.ui_lock().tracker.error.is_some());
    }

    #[test]
    fn worker_thread_applies_results_on_next_dispatch() {
        let _guard = test_guard();
        reset_state();
        let backend = install_backend(ScriptedBackend::default());
        TEST_FORCE_ASYNC_WORKER.store(true, Ordering::SeqCst);
        open_session();
        dispatch(json!({
            "action": "vehicle_action",
            "vehicle_action": "lock",
            "plate": "ABC123",
        }));
        // Give the worker thread time to run the job.
        for _ in 0..50 {
            if !backend.calls().is_empty() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(backend.calls(), vec!["action:lock:ABC123"]);
        // The result is queued right after the call; give that a moment too.
        thread::sleep(Duration::from_millis(50));
        TEST_FORCE_ASYNC_WORKER.store(false, Ordering::SeqCst);
        let tree = dispatch(json!({ "action": "init" }));
        assert_contains_text(&tree, "successfully locked remotely");
    }
}
