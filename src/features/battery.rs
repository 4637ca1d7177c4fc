use crate::backend::BatteryResponse;
use crate::state::SessionState;
use crate::ui::{
    widget, Button as UiButton, Column as UiColumn, Meter as UiMeter, Overlay as UiOverlay,
    Text as UiText,
};
use rust_i18n::t;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryTone {
    Charging,
    High,
    Medium,
    Low,
    Critical,
}

/// Thresholds match the original HUD: green above 60, amber above 30,
/// low above 15, critical below that. Charging overrides them all.
pub fn battery_tone(level: u8, charging: bool) -> BatteryTone {
    if charging {
        BatteryTone::Charging
    } else if level >= 60 {
        BatteryTone::High
    } else if level >= 30 {
        BatteryTone::Medium
    } else if level >= 15 {
        BatteryTone::Low
    } else {
        BatteryTone::Critical
    }
}

impl BatteryTone {
    pub fn css(self) -> &'static str {
        match self {
            Self::Charging => "charging",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Critical => "critical",
        }
    }

    pub fn status_label(self) -> String {
        let key = match self {
            Self::Charging => "battery.status.charging",
            Self::High | Self::Medium => "battery.status.normal",
            Self::Low => "battery.status.low",
            Self::Critical => "battery.status.critical",
        };
        t!(key).into_owned()
    }
}

/// Compact status-bar gauge; clicking it toggles the battery menu.
pub fn render_indicator(state: &SessionState) -> Value {
    let level = state.battery.level;
    let label = format!("{level}%");
    let tone = battery_tone(level, state.battery.charging);
    widget(UiButton::new(&label, "battery_menu").payload(serde_json::json!({
        "tone": tone.css(),
        "charging": state.battery.charging,
    })))
}

/// Drop-down menu with the big meter and the two battery actions.
pub fn render_menu(state: &SessionState) -> Value {
    let level = state.battery.level;
    let tone = battery_tone(level, state.battery.charging);
    let header = t!("battery.header");
    let percent = format!("{level}%");
    let status = state
        .battery_error
        .clone()
        .unwrap_or_else(|| tone.status_label());
    let charger_label = if state.battery.charging {
        t!("battery.charger.disconnect")
    } else {
        t!("battery.charger.connect")
    };
    let replace_label = t!("battery.replace");

    let mut children = vec![
        widget(UiText::new(&header).size(15.0)),
        widget(UiMeter::new(u32::from(level), 100).tone(tone.css())),
        widget(UiText::new(&percent).size(20.0)),
    ];
    let status_text = if state.battery_error.is_some() {
        widget(UiText::new(&status).tone("error"))
    } else {
        widget(UiText::new(&status).tone("muted"))
    };
    children.push(status_text);
    children.push(widget(UiButton::new(&replace_label, "replace_battery")));
    children.push(widget(UiButton::new(&charger_label, "toggle_charger")));

    widget(UiOverlay::new(vec![widget(
        UiColumn::new(children).padding(12),
    )]))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryOp {
    Replace,
    Charger,
}

impl BatteryOp {
    fn fallback_error(self) -> String {
        match self {
            Self::Replace => t!("battery.replace_failed").into_owned(),
            Self::Charger => t!("battery.charger_failed").into_owned(),
        }
    }
}

/// Applies a replace/charger reply to the cached battery status.
pub fn apply_battery_result(
    state: &mut SessionState,
    op: BatteryOp,
    value: Result<BatteryResponse, String>,
) {
    match value {
        Ok(resp) if resp.success => {
            let charging = resp.charging.unwrap_or(state.battery.charging);
            state.set_battery(resp.battery_level, charging);
        }
        Ok(resp) => {
            state.battery_error = Some(resp.message.unwrap_or_else(|| op.fallback_error()));
        }
        Err(e) => {
            log::warn!("battery request failed: {e}");
            state.battery_error = Some(op.fallback_error());
        }
    }
}
