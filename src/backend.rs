//! Seam between the UI core and the game-server process. The host embeds
//! the crate and installs a [`Backend`] implementation over whatever
//! transport it owns; the router's worker thread is the only caller, so
//! implementations may block.

use serde::Deserialize;
use std::sync::{Arc, RwLock};

/// Reply to a plate lookup request. A `success` here only acknowledges
/// the query; the actual record arrives later as a `vehicle_data` push.
#[derive(Debug, Clone, Deserialize)]
pub struct LookupResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatteryResponse {
    pub success: bool,
    #[serde(rename = "batteryLevel")]
    pub battery_level: u8,
    #[serde(default)]
    pub charging: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

pub trait Backend: Send + Sync {
    fn lookup_plate(&self, plate: &str) -> Result<LookupResponse, String>;
    fn vehicle_action(&self, action: &str, plate: &str) -> Result<ActionResponse, String>;
    fn track_vehicle(&self, plate: &str) -> Result<ActionResponse, String>;
    fn replace_battery(&self) -> Result<BatteryResponse, String>;
    fn toggle_charger(&self) -> Result<BatteryResponse, String>;

    /// Fire-and-forget session close notification.
    fn close_session(&self) {}
}

static BACKEND: RwLock<Option<Arc<dyn Backend>>> = RwLock::new(None);

/// Installs (or replaces) the backend the worker thread talks to.
pub fn set_backend(backend: Arc<dyn Backend>) {
    if let Ok(mut slot) = BACKEND.write() {
        *slot = Some(backend);
    }
}

pub(crate) fn backend() -> Result<Arc<dyn Backend>, String> {
    BACKEND
        .read()
        .ok()
        .and_then(|slot| slot.clone())
        .ok_or_else(|| "backend_unavailable".to_string())
}
