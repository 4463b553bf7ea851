mod backoff;
mod config;
mod diff;
mod error;
mod logger;
mod platform;
mod protocol;
mod reconcile;
mod registry;
mod session;
mod storage;
#[cfg(test)]
mod testing;
mod transport;
mod types;

pub use backoff::{BackoffPolicy, PassState, PollLoop, FAILURE_THRESHOLD, LONG_BACKOFF, SHORT_BACKOFF};
pub use config::{FeatureConfig, MIN_POLLING_SECS};
pub use error::{Error, ErrorKind, Result};
pub use logger::ResponseLogMode;
pub use platform::{Platform, PlatformBuilder};
pub use protocol::{
    Device, DeviceType, MobileDevice, MobileDeviceLocation, MobileDeviceMetadata, MobileDeviceSettings,
    OpenWindowDetection, Zone, ZoneType, DEFAULT_BASE_URL,
};
pub use reconcile::{reconcile_mobile_devices, reconcile_static, reconcile_zones, ANYONE_ID};
pub use registry::Registry;
pub use session::{SESSION_KEY, UNIT_RETRY};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use transport::{HttpTransport, Transport};
pub use types::*;
