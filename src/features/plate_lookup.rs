use crate::challenge::Challenge;
use crate::state::{SessionState, VehicleInfo};
use crate::ui::{
    widget, Button as UiButton, Column as UiColumn, Grid as UiGrid, Overlay as UiOverlay,
    Row as UiRow, Text as UiText, TextInput as UiTextInput, Window as UiWindow,
};
use regex::Regex;
use rust_i18n::t;
use serde_json::{json, Value};
use std::sync::OnceLock;

fn plate_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // GTA-style plates: 2-8 characters, letters/digits/spaces.
    RE.get_or_init(|| Regex::new(r"^[A-Z0-9][A-Z0-9 ]{0,6}[A-Z0-9]$").expect("plate regex"))
}

/// Trim + uppercase, then shape-check. Returns the canonical plate the
/// rest of the pipeline (lookups, challenges, action requests) uses.
pub fn normalize_plate(input: &str) -> Result<String, String> {
    let plate = input.trim().to_ascii_uppercase();
    if plate_regex().is_match(&plate) {
        Ok(plate)
    } else {
        Err("invalid_plate".to_string())
    }
}

/// The six actions the vehicle card offers, with their danger flag.
const VEHICLE_ACTIONS: [(&str, &str, bool); 6] = [
    ("lock", "Lock", false),
    ("unlock", "Unlock", false),
    ("engine", "Toggle Engine", false),
    ("track", "Track GPS", false),
    ("disable_brakes", "Disable Brakes", true),
    ("accelerate", "Force Accelerate", true),
];

/// Success wording mirrors the game server's flavor text per action.
pub fn action_success_message(action: &str, plate: &str) -> String {
    match action {
        "lock" => format!("Vehicle {plate} successfully locked remotely"),
        "unlock" => format!("Vehicle {plate} successfully unlocked remotely"),
        "engine" => format!("Remote engine control established for {plate}"),
        "disable_brakes" => {
            format!("{plate}: Brake system permanently compromised - repair required")
        }
        "accelerate" => format!("{plate}: Remote acceleration override in progress"),
        "track" => format!("GPS tracker activated for vehicle {plate}"),
        _ => format!("Action {action} executed successfully on {plate}"),
    }
}

pub fn action_failed_message(action: &str, plate: &str) -> String {
    match action {
        "lock" => format!("Failed to lock vehicle {plate} - out of range or system error"),
        "unlock" => format!("Failed to unlock vehicle {plate} - out of range or system error"),
        "engine" => format!("Engine control failed for {plate} - vehicle security active"),
        "disable_brakes" => {
            format!("{plate}: Failed to compromise brake system - advanced security detected")
        }
        "accelerate" => format!("{plate}: Remote acceleration failed - engine protection activated"),
        "track" => format!("GPS tracking failed for vehicle {plate} - tracker item required"),
        _ => format!("Action {action} failed on {plate}"),
    }
}

pub fn render_plate_lookup(state: &SessionState) -> Value {
    let title = t!("lookup.title");
    let hint = t!("lookup.hint");
    let search_label = t!("lookup.search");
    let nearby_note = t!("lookup.nearby_disabled");

    let mut children = vec![
        widget(
            UiTextInput::new("plate")
                .hint(&hint)
                .submit_action("plate_lookup"),
        ),
        widget(UiButton::new(&search_label, "plate_lookup")),
        widget(UiText::new(&nearby_note).size(12.0).tone("muted")),
    ];

    children.push(render_results(state));

    widget(UiWindow::new(&title, children).close_action("close_app"))
}

fn render_results(state: &SessionState) -> Value {
    if let Some(err) = &state.lookup.error {
        let text = match err.as_str() {
            "invalid_plate" => t!("lookup.invalid_plate").into_owned(),
            "connection_error" => t!("lookup.connection_error").into_owned(),
            other => t!("lookup.failed", message = other).into_owned(),
        };
        return widget(UiText::new(&text).tone("error"));
    }
    if state.lookup.pending {
        let plate = state.lookup.plate.as_deref().unwrap_or("");
        let text = t!("lookup.searching", plate = plate);
        return widget(UiText::new(&text).tone("muted"));
    }
    match &state.vehicle {
        Some(vehicle) => render_vehicle_card(vehicle),
        None => {
            let text = t!("lookup.no_results");
            widget(UiText::new(&text).tone("muted"))
        }
    }
}

fn render_vehicle_card(vehicle: &VehicleInfo) -> Value {
    let registration = if vehicle.registered_to_player() {
        "Registered"
    } else {
        "Not Registered"
    };
    let owner = vehicle.owner.as_deref().unwrap_or("Unknown");
    let make_model = format!("{} {}", vehicle.make, vehicle.model);
    let class = vehicle.class.as_deref().unwrap_or("Unknown");
    let vin = vehicle.vin.as_deref().unwrap_or("Unknown");

    let mut rows = vec![
        info_row("Registration:", registration),
        info_row("Owner:", owner),
        info_row("Make/Model:", &make_model),
        info_row("Class:", class),
        info_row("VIN:", vin),
    ];

    rows.push(render_flags(vehicle));
    rows.push(render_actions(&vehicle.plate));

    widget(UiColumn::new(vec![
        widget(UiText::new("Vehicle Information").size(16.0)),
        widget(UiText::new(&vehicle.plate).size(18.0).tone("code")),
        widget(UiColumn::new(rows)),
    ]))
}

fn info_row(label: &str, value: &str) -> Value {
    widget(
        UiRow::new(vec![
            widget(UiText::new(label).size(12.0).tone("muted")),
            widget(UiText::new(value).size(12.0)),
        ])
        .spacing(8),
    )
}

fn render_flags(vehicle: &VehicleInfo) -> Value {
    let mut chips: Vec<Value> = Vec::new();
    let flags = &vehicle.flags;
    if flags.stolen {
        chips.push(flag_chip("STOLEN", "error"));
    }
    if flags.police {
        chips.push(flag_chip("LAW ENFORCEMENT", "accent"));
    }
    if flags.emergency {
        chips.push(flag_chip("EMERGENCY SERVICES", "accent"));
    }
    if flags.flagged {
        chips.push(flag_chip("FLAGGED", "error"));
    }
    if flags.rental {
        chips.push(flag_chip("RENTAL", "muted"));
    }
    if chips.is_empty() {
        chips.push(flag_chip("REGISTERED", "muted"));
    }
    widget(UiRow::new(chips).spacing(6))
}

fn flag_chip(label: &str, tone: &'static str) -> Value {
    widget(UiText::new(label).size(11.0).tone(tone))
}

fn render_actions(plate: &str) -> Value {
    let buttons: Vec<Value> = VEHICLE_ACTIONS
        .iter()
        .map(|(action, label, danger)| {
            widget(
                UiButton::new(label, "vehicle_action")
                    .payload(json!({ "vehicle_action": action, "plate": plate }))
                    .danger(*danger),
            )
        })
        .collect();
    widget(UiGrid::new(buttons).columns(3))
}

/// Modal captcha prompt; the host posts `challenge_input` on every edit
/// and `challenge_submit` on Enter or the submit button.
pub fn render_challenge_overlay(challenge: &Challenge) -> Value {
    let header = t!("challenge.header");
    let instruction = t!(
        "challenge.instruction",
        seconds = challenge.time_limit_secs()
    );
    let timer = t!("challenge.timer", seconds = challenge.remaining_secs());
    let input_hint = t!("challenge.input_hint");
    let submit_label = t!("challenge.submit");
    let cancel_label = t!("challenge.cancel");

    widget(UiOverlay::new(vec![widget(
        UiColumn::new(vec![
            widget(UiText::new(&header).size(18.0).tone("accent")),
            widget(UiText::new(&instruction).size(14.0)),
            widget(UiText::new(challenge.code()).size(24.0).tone("code")),
            widget(
                UiTextInput::new("challenge_input")
                    .hint(&input_hint)
                    .change_action("challenge_input")
                    .submit_action("challenge_submit")
                    .autofocus(true),
            ),
            widget(UiText::new(&timer).size(13.0).tone("error")),
            widget(
                UiRow::new(vec![
                    widget(UiButton::new(&submit_label, "challenge_submit")),
                    widget(UiButton::new(&cancel_label, "challenge_cancel")),
                ])
                .spacing(10),
            ),
        ])
        .padding(20),
    )]))
}
