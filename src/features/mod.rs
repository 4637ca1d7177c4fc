pub mod battery;
pub mod hacker_stats;
pub mod phone_tracker;
pub mod plate_lookup;
pub mod radio_decrypt;

use crate::state::SessionState;
use crate::ui::{widget, Button as UiButton, Column as UiColumn, Grid as UiGrid, Text as UiText};
use serde_json::{json, Value};

/// A desktop icon entry.
pub struct AppEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
}

pub fn app_catalog() -> &'static [AppEntry] {
    &[
        AppEntry {
            id: "plate_lookup",
            name: "Plate Lookup",
            icon: "car",
            description: "vehicle registration database",
        },
        AppEntry {
            id: "phone_tracker",
            name: "Phone Tracker",
            icon: "signal",
            description: "triangulate a phone number",
        },
        AppEntry {
            id: "radio_decrypt",
            name: "Radio Decrypt",
            icon: "radio",
            description: "scan encrypted frequencies",
        },
    ]
}

/// Home screen: greeting plus the desktop icon grid. The status bar is
/// rendered separately so it stays visible inside app windows too.
pub fn render_home(state: &SessionState) -> Value {
    let greeting = hacker_stats::current_greeting();
    let mut children = vec![
        widget(UiText::new(&greeting).size(22.0)),
        hacker_stats::render_stats(state),
    ];

    let icons: Vec<Value> = app_catalog()
        .iter()
        .map(|app| {
            widget(
                UiButton::new(app.name, "open_app").payload(json!({
                    "app": app.id,
                    "icon": app.icon,
                    "hint": app.description,
                })),
            )
        })
        .collect();
    children.push(widget(UiGrid::new(icons).columns(3)));

    widget(UiColumn::new(children).padding(16))
}
