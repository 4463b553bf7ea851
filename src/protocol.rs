use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::types::{BatteryState, TemperatureUnit};
use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://my.tado.com/api/v2/";

/// Builds request URLs. Credentials are encoded once, here.
#[derive(Debug, Clone)]
pub(crate) struct Endpoints {
    base_url: String,
    credentials: String,
}

impl Endpoints {
    pub fn new(base_url: &str, username: &str, password: &str) -> Self {
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            base_url,
            credentials: format!(
                "username={}&password={}",
                urlencoding::encode(username),
                urlencoding::encode(password)
            ),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}?{}", self.base_url, path, self.credentials)
    }

    pub fn me(&self) -> String {
        self.url("me")
    }

    pub fn home(&self, home_id: i64) -> String {
        self.url(&format!("homes/{home_id}"))
    }

    pub fn zones(&self, home_id: i64) -> String {
        self.url(&format!("homes/{home_id}/zones"))
    }

    pub fn mobile_devices(&self, home_id: i64) -> String {
        self.url(&format!("homes/{home_id}/mobileDevices"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZoneType {
    Heating,
    HotWater,
    #[serde(other)]
    Other,
}

/// Device type codes the bridge knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceType {
    /// `VA01`
    Radiator,
    /// `RU01`
    Remote,
    /// `BU01`
    Boiler,
    Other(String),
}

impl DeviceType {
    pub fn from_code(code: &str) -> Self {
        match code {
            "VA01" => DeviceType::Radiator,
            "RU01" => DeviceType::Remote,
            "BU01" => DeviceType::Boiler,
            other => DeviceType::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            DeviceType::Radiator => "VA01",
            DeviceType::Remote => "RU01",
            DeviceType::Boiler => "BU01",
            DeviceType::Other(code) => code,
        }
    }
}

impl<'de> Deserialize<'de> for DeviceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(DeviceType::from_code(&code))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub device_type: DeviceType,
    pub serial_no: String,
    #[serde(default)]
    pub short_serial_no: Option<String>,
    #[serde(default)]
    pub battery_state: Option<BatteryState>,
}

impl Device {
    pub fn short_serial(&self) -> &str {
        self.short_serial_no.as_deref().unwrap_or(&self.serial_no)
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct OpenWindowDetection {
    #[serde(default)]
    pub supported: bool,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ZoneType,
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub open_window_detection: OpenWindowDetection,
}

impl Zone {
    pub fn window_detection_active(&self) -> bool {
        self.open_window_detection.supported && self.open_window_detection.enabled
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileDeviceSettings {
    #[serde(default)]
    pub geo_tracking_enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileDeviceLocation {
    #[serde(default)]
    pub at_home: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MobileDeviceMetadata {
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileDevice {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub settings: MobileDeviceSettings,
    #[serde(default)]
    pub location: Option<MobileDeviceLocation>,
    #[serde(default)]
    pub device_metadata: MobileDeviceMetadata,
}

impl MobileDevice {
    pub fn geo_tracking(&self) -> bool {
        self.settings.geo_tracking_enabled
    }

    pub fn at_home(&self) -> bool {
        self.location.as_ref().is_some_and(|l| l.at_home)
    }

    pub fn model(&self) -> &str {
        self.device_metadata.model.as_deref().unwrap_or("Occupancy Sensor")
    }
}

#[derive(Debug, Deserialize)]
struct HomeRef {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct Me {
    homes: Vec<HomeRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Home {
    temperature_unit: TemperatureUnit,
}

fn parse<T: DeserializeOwned>(body: &str) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_str(body);
    Ok(serde_path_to_error::deserialize(de)?)
}

/// First home of the account.
pub(crate) fn parse_home_id(body: &str) -> Result<i64> {
    let me: Me = parse(body)?;
    me.homes
        .first()
        .map(|h| h.id)
        .ok_or_else(|| Error::Parse("account has no homes".to_string()))
}

pub(crate) fn parse_temperature_unit(body: &str) -> Result<TemperatureUnit> {
    let home: Home = parse(body)?;
    Ok(home.temperature_unit)
}

pub(crate) fn parse_zones(body: &str) -> Result<Vec<Zone>> {
    parse(body)
}

pub(crate) fn parse_mobile_devices(body: &str) -> Result<Vec<MobileDevice>> {
    parse(body)
}
