use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

/// Facts every poll needs. Written once, then read on every cold start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    #[serde(rename = "homeID")]
    pub home_id: i64,
    #[serde(rename = "tempUnit")]
    pub temperature_unit: TemperatureUnit,
}

/// Battery as reported by a physical device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatteryState {
    Normal,
    Low,
    #[serde(other)]
    Unknown,
}

impl BatteryState {
    /// `(batteryLevel, batteryStatus)` as shown by the bridge.
    pub fn level_and_status(state: Option<BatteryState>) -> (u8, u8) {
        match state {
            Some(BatteryState::Normal) => (100, 0),
            _ => (10, 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccessoryType {
    RadiatorThermostat,
    BoilerThermostat,
    Occupancy,
    Weather,
    CentralSwitch,
    ExternalSensor,
    WindowSensor,
    Solar,
}

impl AccessoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessoryType::RadiatorThermostat => "RadiatorThermostat",
            AccessoryType::BoilerThermostat => "BoilerThermostat",
            AccessoryType::Occupancy => "Occupancy",
            AccessoryType::Weather => "Weather",
            AccessoryType::CentralSwitch => "CentralSwitch",
            AccessoryType::ExternalSensor => "ExternalSensor",
            AccessoryType::WindowSensor => "WindowSensor",
            AccessoryType::Solar => "Solar",
        }
    }
}

impl fmt::Display for AccessoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-classifies [`AccessoryType::RadiatorThermostat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExtraType {
    Plain,
    Remote,
    OnePerRoom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingType {
    Weather,
    Motion,
    Door,
}

/// The remote entity an accessory stands for.
///
/// Zone-derived accessories (sensors, one-per-room thermostats) are keyed by
/// zone id; everything else by shortened serial.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccessoryKey {
    pub kind: AccessoryType,
    pub extra_type: Option<ExtraType>,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessoryContext {
    #[serde(rename = "type")]
    pub kind: AccessoryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_type: Option<ExtraType>,
    pub serial_no: String,
    pub short_serial_no: String,
    pub model: String,
    #[serde(default, rename = "zoneID", skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_state: Option<BatteryState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_status: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_home: Option<bool>,
    #[serde(default)]
    pub logging: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging_type: Option<LoggingType>,
}

impl AccessoryContext {
    pub fn new(kind: AccessoryType, serial_no: impl Into<String>, model: impl Into<String>) -> Self {
        let serial_no = serial_no.into();
        Self {
            kind,
            extra_type: None,
            short_serial_no: serial_no.clone(),
            serial_no,
            model: model.into(),
            zone_id: None,
            room: None,
            battery_state: None,
            battery_level: None,
            battery_status: None,
            at_home: None,
            logging: false,
            logging_type: None,
        }
    }

    pub fn key(&self) -> AccessoryKey {
        let zone_keyed = matches!(
            (self.kind, self.extra_type),
            (AccessoryType::ExternalSensor, _)
                | (AccessoryType::WindowSensor, _)
                | (AccessoryType::RadiatorThermostat, Some(ExtraType::OnePerRoom))
        );
        let id = match (zone_keyed, self.zone_id) {
            (true, Some(zone_id)) => zone_id.to_string(),
            _ => self.short_serial_no.clone(),
        };
        AccessoryKey {
            kind: self.kind,
            extra_type: self.extra_type,
            id,
        }
    }

    /// Copies the fields a poll may change. Returns whether anything changed.
    pub fn refresh_from(&mut self, other: &AccessoryContext) -> bool {
        let before = (
            self.zone_id,
            self.room.clone(),
            self.battery_state,
            self.battery_level,
            self.battery_status,
            self.at_home,
        );
        self.zone_id = other.zone_id;
        self.room = other.room.clone();
        self.battery_state = other.battery_state;
        self.battery_level = other.battery_level;
        self.battery_status = other.battery_status;
        self.at_home = other.at_home;
        before
            != (
                self.zone_id,
                self.room.clone(),
                self.battery_state,
                self.battery_level,
                self.battery_status,
                self.at_home,
            )
    }

    pub(crate) fn with_battery(mut self, state: Option<BatteryState>) -> Self {
        let (level, status) = BatteryState::level_and_status(state);
        self.battery_state = state;
        self.battery_level = Some(level);
        self.battery_status = Some(status);
        self
    }

    pub(crate) fn with_logging(mut self, logging_type: LoggingType) -> Self {
        self.logging = true;
        self.logging_type = Some(logging_type);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessory {
    pub display_name: String,
    pub uuid: Uuid,
    pub context: AccessoryContext,
}

impl Accessory {
    pub fn new(display_name: impl Into<String>, context: AccessoryContext) -> Self {
        let display_name = display_name.into();
        Self {
            uuid: accessory_uuid(&display_name),
            display_name,
            context,
        }
    }
}

/// Stable accessory UUID, derived from the display name.
pub fn accessory_uuid(display_name: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, display_name.as_bytes())
}

/// Changes handed to the bridge.
#[derive(Debug, Clone)]
pub enum Event {
    SessionReady(SessionInfo),
    AccessoryAdded(Accessory),
    AccessoryUpdated { name: String, context: AccessoryContext },
    AccessoryRemoved(Accessory),
}
