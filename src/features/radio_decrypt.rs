use crate::state::SessionState;
use crate::ui::{
    widget, Button as UiButton, Column as UiColumn, Text as UiText, TextInput as UiTextInput,
    Window as UiWindow,
};
use rust_i18n::t;
use serde_json::Value;

/// Decryption is parked server-side; accept a plausible frequency and
/// render the not-implemented card.
pub fn handle_decrypt(state: &mut SessionState, frequency: Option<String>) {
    let parsed = frequency
        .as_deref()
        .map(str::trim)
        .and_then(|f| f.parse::<f64>().ok())
        .filter(|mhz| (*mhz > 0.0) && (*mhz < 10_000.0));
    match parsed {
        Some(mhz) => {
            state.radio.error = None;
            state.radio.query = Some(format!("{mhz:.1} MHz"));
        }
        None => {
            state.radio.error = Some("invalid_frequency".to_string());
            state.radio.query = None;
        }
    }
}

pub fn render_radio_decrypt(state: &SessionState) -> Value {
    let title = t!("radio.title");
    let hint = t!("radio.hint");

    let mut children = vec![
        widget(
            UiTextInput::new("frequency")
                .hint(&hint)
                .submit_action("decrypt_radio"),
        ),
        widget(UiButton::new("Decrypt", "decrypt_radio")),
    ];

    if state.radio.error.is_some() {
        let invalid = t!("radio.invalid_frequency");
        children.push(widget(UiText::new(&invalid).tone("error")));
    } else if let Some(query) = &state.radio.query {
        let parked = t!("tracker.parked");
        children.push(widget(UiColumn::new(vec![
            widget(UiText::new(query).size(16.0).tone("code")),
            widget(UiText::new(&parked).tone("muted")),
        ])));
    }

    widget(UiWindow::new(&title, children).close_action("close_app"))
}
