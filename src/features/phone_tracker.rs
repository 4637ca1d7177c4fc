use crate::state::SessionState;
use crate::ui::{
    widget, Button as UiButton, Column as UiColumn, Text as UiText, TextInput as UiTextInput,
    Window as UiWindow,
};
use rust_i18n::t;
use serde_json::Value;

/// The tracker backend is not wired up yet; queries get validated and
/// answered with a parked-feature card, matching the live behavior.
pub fn handle_track(state: &mut SessionState, number: Option<String>) {
    let number = number.unwrap_or_default();
    let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 7 {
        state.tracker.error = Some("invalid_number".to_string());
        state.tracker.query = None;
        return;
    }
    state.tracker.error = None;
    state.tracker.query = Some(digits);
}

pub fn render_phone_tracker(state: &SessionState) -> Value {
    let title = t!("tracker.title");
    let hint = t!("tracker.hint");

    let mut children = vec![
        widget(
            UiTextInput::new("number")
                .hint(&hint)
                .submit_action("track_phone"),
        ),
        widget(UiButton::new("Track", "track_phone")),
    ];

    if state.tracker.error.is_some() {
        children.push(widget(UiText::new("Invalid phone number").tone("error")));
    } else if let Some(query) = &state.tracker.query {
        let parked = t!("tracker.parked");
        children.push(widget(UiColumn::new(vec![
            widget(UiText::new(query).size(16.0).tone("code")),
            widget(UiText::new(&parked).tone("muted")),
        ])));
    }

    widget(UiWindow::new(&title, children).close_action("close_app"))
}
