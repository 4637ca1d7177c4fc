//! Render-tree building blocks. The host shell walks the JSON tree and
//! maps each `type` tag onto its own widgets; the core never touches a
//! real DOM.

use serde::Serialize;
use serde_json::Value;

/// Serialization of these builders cannot fail; collapse the impossible
/// error into `Null` so render code stays linear.
pub fn widget<T: Serialize>(w: T) -> Value {
    serde_json::to_value(w).unwrap_or(Value::Null)
}

#[derive(Serialize)]
pub struct Text<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<&'static str>,
}

impl<'a> Text<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            kind: "Text",
            text,
            size: None,
            tone: None,
        }
    }

    pub fn size(mut self, size: f64) -> Self {
        self.size = Some(size);
        self
    }

    /// "muted", "accent", "error" or "code" per the host stylesheet.
    pub fn tone(mut self, tone: &'static str) -> Self {
        self.tone = Some(tone);
        self
    }
}

#[derive(Serialize)]
pub struct Button<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
    pub action: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub danger: Option<bool>,
}

impl<'a> Button<'a> {
    pub fn new(text: &'a str, action: &'a str) -> Self {
        Self {
            kind: "Button",
            text,
            action,
            payload: None,
            danger: None,
        }
    }

    /// Extra fields the host echoes back on the command for this action.
    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn danger(mut self, danger: bool) -> Self {
        self.danger = Some(danger);
        self
    }
}

#[derive(Serialize)]
pub struct TextInput<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub bind_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submit_action: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_action: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autofocus: Option<bool>,
}

impl<'a> TextInput<'a> {
    pub fn new(bind_key: &'a str) -> Self {
        Self {
            kind: "TextInput",
            bind_key,
            hint: None,
            submit_action: None,
            change_action: None,
            autofocus: None,
        }
    }

    pub fn hint(mut self, hint: &'a str) -> Self {
        self.hint = Some(hint);
        self
    }

    /// Command the host posts on Enter, with the field value as `input`.
    pub fn submit_action(mut self, action: &'a str) -> Self {
        self.submit_action = Some(action);
        self
    }

    /// Command the host posts on every edit, with the value as `input`.
    pub fn change_action(mut self, action: &'a str) -> Self {
        self.change_action = Some(action);
        self
    }

    pub fn autofocus(mut self, autofocus: bool) -> Self {
        self.autofocus = Some(autofocus);
        self
    }
}

#[derive(Serialize)]
pub struct Column {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub children: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<u32>,
}

impl Column {
    pub fn new(children: Vec<Value>) -> Self {
        Self {
            kind: "Column",
            children,
            padding: None,
        }
    }

    pub fn padding(mut self, padding: u32) -> Self {
        self.padding = Some(padding);
        self
    }
}

#[derive(Serialize)]
pub struct Row {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub children: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spacing: Option<u32>,
}

impl Row {
    pub fn new(children: Vec<Value>) -> Self {
        Self {
            kind: "Row",
            children,
            spacing: None,
        }
    }

    pub fn spacing(mut self, spacing: u32) -> Self {
        self.spacing = Some(spacing);
        self
    }
}

#[derive(Serialize)]
pub struct Grid {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub children: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<u32>,
}

impl Grid {
    pub fn new(children: Vec<Value>) -> Self {
        Self {
            kind: "Grid",
            children,
            columns: None,
        }
    }

    pub fn columns(mut self, columns: u32) -> Self {
        self.columns = Some(columns);
        self
    }
}

/// Horizontal fill meter, used for the battery gauge and the XP bar.
#[derive(Serialize)]
pub struct Meter<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub value: u32,
    pub max: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<&'static str>,
}

impl<'a> Meter<'a> {
    pub fn new(value: u32, max: u32) -> Self {
        Self {
            kind: "Meter",
            value,
            max,
            label: None,
            tone: None,
        }
    }

    pub fn label(mut self, label: &'a str) -> Self {
        self.label = Some(label);
        self
    }

    pub fn tone(mut self, tone: &'static str) -> Self {
        self.tone = Some(tone);
        self
    }
}

/// Transient notification banner.
#[derive(Serialize)]
pub struct Banner<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub variant: &'static str,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dismiss_action: Option<&'a str>,
}

impl<'a> Banner<'a> {
    pub fn new(variant: &'static str, text: &'a str) -> Self {
        Self {
            kind: "Banner",
            variant,
            text,
            dismiss_action: None,
        }
    }

    pub fn dismiss_action(mut self, action: &'a str) -> Self {
        self.dismiss_action = Some(action);
        self
    }
}

/// App window frame with a title bar and close control.
#[derive(Serialize)]
pub struct Window<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: &'a str,
    pub children: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_action: Option<&'a str>,
}

impl<'a> Window<'a> {
    pub fn new(title: &'a str, children: Vec<Value>) -> Self {
        Self {
            kind: "Window",
            title,
            children,
            close_action: None,
        }
    }

    pub fn close_action(mut self, action: &'a str) -> Self {
        self.close_action = Some(action);
        self
    }
}

/// Modal layer rendered above the current screen (captcha, battery menu).
#[derive(Serialize)]
pub struct Overlay {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub children: Vec<Value>,
}

impl Overlay {
    pub fn new(children: Vec<Value>) -> Self {
        Self {
            kind: "Overlay",
            children,
        }
    }
}
