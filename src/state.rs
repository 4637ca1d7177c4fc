use crate::challenge::Challenge;
use serde::Deserialize;

/// App windows the desktop can open. At most one is active at a time;
/// `None` in `SessionState::active_app` means the home screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppScreen {
    PlateLookup,
    PhoneTracker,
    RadioDecrypt,
}

impl AppScreen {
    pub fn parse(id: &str) -> Option<Self> {
        match id {
            "plate_lookup" => Some(Self::PlateLookup),
            "phone_tracker" => Some(Self::PhoneTracker),
            "radio_decrypt" => Some(Self::RadioDecrypt),
            _ => None,
        }
    }

}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryStatus {
    pub level: u8,
    pub charging: bool,
}

impl BatteryStatus {
    pub const fn full() -> Self {
        Self {
            level: 100,
            charging: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HackerStats {
    pub level: u32,
    pub xp: u32,
    pub next_level_xp: u32,
    pub level_name: String,
}

impl HackerStats {
    pub const fn rookie() -> Self {
        Self {
            level: 1,
            xp: 0,
            next_level_xp: 100,
            level_name: String::new(),
        }
    }

    /// Display name; the server may omit one for level 1.
    pub fn display_name(&self) -> &str {
        if self.level_name.is_empty() {
            "Script Kiddie"
        } else {
            &self.level_name
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VehicleFlags {
    pub stolen: bool,
    pub police: bool,
    pub emergency: bool,
    pub flagged: bool,
    pub rental: bool,
}

/// Lookup result pushed by the game server (`vehicle_data` event).
/// Field names match the wire payload.
#[derive(Debug, Clone, Deserialize)]
pub struct VehicleInfo {
    pub plate: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default, rename = "ownertype")]
    pub owner_type: Option<String>,
    #[serde(default)]
    pub make: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub vin: Option<String>,
    #[serde(default)]
    pub flags: VehicleFlags,
}

impl VehicleInfo {
    pub fn registered_to_player(&self) -> bool {
        self.owner_type.as_deref() == Some("player")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Failure,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct LookupState {
    pub pending: bool,
    pub plate: Option<String>,
    pub error: Option<String>,
}

impl LookupState {
    const fn idle() -> Self {
        Self {
            pending: false,
            plate: None,
            error: None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::idle();
    }
}

/// Parked apps keep only the last query so the result card can echo it.
#[derive(Debug, Clone, Default)]
pub struct ParkedQuery {
    pub query: Option<String>,
    pub error: Option<String>,
}

impl ParkedQuery {
    const fn idle() -> Self {
        Self {
            query: None,
            error: None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::idle();
    }
}

/// The whole overlay session. One instance lives behind the router's
/// mutex; every mutation goes through a dispatched command.
pub struct SessionState {
    pub open: bool,
    pub active_app: Option<AppScreen>,
    pub battery: BatteryStatus,
    pub battery_menu_open: bool,
    pub battery_error: Option<String>,
    pub stats: HackerStats,
    pub vehicle: Option<VehicleInfo>,
    pub lookup: LookupState,
    pub challenge: Option<Challenge>,
    pub tracker: ParkedQuery,
    pub radio: ParkedQuery,
    pub notices: Vec<Notice>,
    pub last_error: Option<String>,
    pub locale: String,
}

impl SessionState {
    // const so it can back a static Mutex
    pub const fn new() -> Self {
        Self {
            open: false,
            active_app: None,
            battery: BatteryStatus::full(),
            battery_menu_open: false,
            battery_error: None,
            stats: HackerStats::rookie(),
            vehicle: None,
            lookup: LookupState::idle(),
            challenge: None,
            tracker: ParkedQuery::idle(),
            radio: ParkedQuery::idle(),
            notices: Vec::new(),
            last_error: None,
            locale: String::new(),
        }
    }

    pub fn challenge_pending(&self) -> bool {
        self.challenge.as_ref().is_some_and(|c| c.is_pending())
    }

    pub fn open_app(&mut self, app: AppScreen) {
        self.active_app = Some(app);
        self.last_error = None;
    }

    pub fn go_home(&mut self) {
        self.active_app = None;
        self.battery_menu_open = false;
    }

    pub fn push_notice(&mut self, kind: NoticeKind, message: String) {
        self.notices.push(Notice { kind, message });
    }

    pub fn set_battery(&mut self, level: u8, charging: bool) {
        self.battery = BatteryStatus {
            level: level.min(100),
            charging,
        };
        self.battery_error = None;
    }

    /// Clears everything tied to the current session; cached battery and
    /// stats survive so a reopen renders the last known values.
    pub fn reset_session(&mut self) {
        self.open = false;
        self.active_app = None;
        self.battery_menu_open = false;
        self.battery_error = None;
        self.vehicle = None;
        self.lookup.reset();
        self.challenge = None;
        self.tracker.reset();
        self.radio.reset();
        self.notices.clear();
        self.last_error = None;
    }
}
