use crate::state::SessionState;
use crate::ui::{widget, Column as UiColumn, Meter as UiMeter, Row as UiRow, Text as UiText};
use chrono::{Local, Timelike};
use rust_i18n::t;
use serde_json::Value;

pub fn clock_text() -> String {
    Local::now().format("%H:%M").to_string()
}

/// Morning before 12, afternoon before 17, evening after.
pub fn greeting_for_hour(hour: u32) -> String {
    let key = if hour < 12 {
        "greeting.morning"
    } else if hour < 17 {
        "greeting.afternoon"
    } else {
        "greeting.evening"
    };
    t!(key).into_owned()
}

pub fn current_greeting() -> String {
    greeting_for_hour(Local::now().hour())
}

/// Level name plus the XP progress meter shown on the home screen.
pub fn render_stats(state: &SessionState) -> Value {
    let stats = &state.stats;
    let level_line = format!("Lv. {} {}", stats.level, stats.display_name());
    let xp_line = format!("XP: {} / {}", stats.xp, stats.next_level_xp);
    widget(UiColumn::new(vec![
        widget(UiText::new(&level_line).size(14.0).tone("accent")),
        widget(
            UiMeter::new(stats.xp, stats.next_level_xp.max(1))
                .label(&xp_line)
                .tone("accent"),
        ),
    ]))
}

/// Top status bar: clock, level name, battery indicator.
pub fn render_status_bar(state: &SessionState) -> Value {
    let clock = clock_text();
    widget(
        UiRow::new(vec![
            widget(UiText::new(&clock).size(13.0).tone("muted")),
            widget(UiText::new(state.stats.display_name()).size(13.0)),
            super::battery::render_indicator(state),
        ])
        .spacing(12),
    )
}

#[cfg(test)]
mod tests {
    use super::greeting_for_hour;

    #[test]
    fn greeting_buckets_follow_the_clock() {
        assert_eq!(greeting_for_hour(0), "Good morning");
        assert_eq!(greeting_for_hour(11), "Good morning");
        assert_eq!(greeting_for_hour(12), "Good afternoon");
        assert_eq!(greeting_for_hour(16), "Good afternoon");
        assert_eq!(greeting_for_hour(17), "Good evening");
        assert_eq!(greeting_for_hour(23), "Good evening");
    }
}
