//! Maps one polled listing onto registry mutations.
//!
//! Each pass builds the set of accessories the listing *wants*, from flat rule
//! tables gated by [`FeatureConfig`], then diffs it against the records the
//! pass manages. Records whose key is missing from the wanted set are removed,
//! which also covers features that were switched off. All three passes are
//! idempotent: replaying the same listing produces no further events.

use tracing::debug;

use crate::config::FeatureConfig;
use crate::diff::{add_accessory, apply, plan, remove_accessory, unique_names, Wanted};
use crate::protocol::{Device, MobileDevice, Zone, ZoneType};
use crate::registry::Registry;
use crate::types::*;

/// Synthetic serial of the "Anyone" occupancy accessory.
pub const ANYONE_ID: &str = "1234567890";

struct ZoneRule {
    enabled: fn(&FeatureConfig) -> bool,
    applies: fn(&Zone) -> bool,
    build: fn(&Zone) -> Wanted,
}

struct DeviceRule {
    enabled: fn(&FeatureConfig) -> bool,
    device_type: &'static str,
    kind: AccessoryType,
    extra_type: Option<ExtraType>,
    reports_battery: bool,
}

struct StaticRule {
    enabled: fn(&FeatureConfig) -> bool,
    kind: AccessoryType,
    tag: &'static str,
    label: &'static str,
    logging: Option<LoggingType>,
}

const ZONE_RULES: &[ZoneRule] = &[
    ZoneRule {
        enabled: |c| c.external_sensor,
        applies: |z| z.kind == ZoneType::Heating,
        build: external_sensor,
    },
    ZoneRule {
        enabled: |c| c.open_window,
        applies: |z| z.kind == ZoneType::Heating && z.window_detection_active(),
        build: window_sensor,
    },
    ZoneRule {
        enabled: |c| c.one_per_room,
        applies: |z| z.kind == ZoneType::Heating,
        build: room_thermostat,
    },
];

// Device types are disjoint, so a device matches at most one row.
const DEVICE_RULES: &[DeviceRule] = &[
    DeviceRule {
        enabled: |c| c.radiator_thermostat,
        device_type: "VA01",
        kind: AccessoryType::RadiatorThermostat,
        extra_type: Some(ExtraType::Plain),
        reports_battery: true,
    },
    DeviceRule {
        enabled: |c| c.remote_thermostat,
        device_type: "RU01",
        kind: AccessoryType::RadiatorThermostat,
        extra_type: Some(ExtraType::Remote),
        reports_battery: true,
    },
    DeviceRule {
        enabled: |c| c.boiler_thermostat,
        device_type: "BU01",
        kind: AccessoryType::BoilerThermostat,
        extra_type: None,
        reports_battery: false,
    },
];

const STATIC_RULES: &[StaticRule] = &[
    StaticRule {
        enabled: |c| c.central_switch,
        kind: AccessoryType::CentralSwitch,
        tag: "CS",
        label: "Central Switch",
        logging: None,
    },
    StaticRule {
        enabled: |c| c.weather,
        kind: AccessoryType::Weather,
        tag: "W",
        label: "Weather",
        logging: Some(LoggingType::Weather),
    },
    StaticRule {
        enabled: |c| c.solar_intensity,
        kind: AccessoryType::Solar,
        tag: "SI",
        label: "Solar Intensity",
        logging: None,
    },
];

fn zone_context(kind: AccessoryType, zone: &Zone, tag: &str, model: &str) -> AccessoryContext {
    let mut context = AccessoryContext::new(kind, format!("{}-{tag}", zone.id), model);
    context.zone_id = Some(zone.id);
    context.room = Some(zone.name.clone());
    context
}

fn external_sensor(zone: &Zone) -> Wanted {
    Wanted {
        name: format!("{} Temperature", zone.name),
        context: zone_context(AccessoryType::ExternalSensor, zone, "TH", "Temperature Sensor")
            .with_logging(LoggingType::Weather),
    }
}

fn window_sensor(zone: &Zone) -> Wanted {
    Wanted {
        name: format!("{} Window", zone.name),
        context: zone_context(AccessoryType::WindowSensor, zone, "W", "Window Sensor")
            .with_logging(LoggingType::Door),
    }
}

/// One thermostat standing for the whole zone. Its battery is low as soon
/// as any battery-powered device in the zone is.
fn room_thermostat(zone: &Zone) -> Wanted {
    let battery = if zone
        .devices
        .iter()
        .filter_map(|d| d.battery_state)
        .all(|b| b == BatteryState::Normal)
    {
        BatteryState::Normal
    } else {
        BatteryState::Low
    };

    let mut context = zone_context(AccessoryType::RadiatorThermostat, zone, "RT", "Room Thermostat")
        .with_battery(Some(battery))
        .with_logging(LoggingType::Weather);
    context.extra_type = Some(ExtraType::OnePerRoom);
    Wanted {
        name: format!("{} Thermostat", zone.name),
        context,
    }
}

fn device_thermostat(rule: &DeviceRule, zone: &Zone, device: &Device) -> Wanted {
    let battery = if rule.reports_battery {
        device.battery_state
    } else {
        Some(BatteryState::Normal)
    };

    let mut context = AccessoryContext::new(rule.kind, &device.serial_no, device.device_type.code())
        .with_battery(battery)
        .with_logging(LoggingType::Weather);
    context.extra_type = rule.extra_type;
    context.short_serial_no = device.short_serial().to_string();
    context.zone_id = Some(zone.id);
    context.room = Some(zone.name.clone());

    Wanted {
        name: format!("{} {}", zone.name, device.short_serial()),
        context,
    }
}

fn manages_zone_accessory(context: &AccessoryContext) -> bool {
    matches!(
        context.kind,
        AccessoryType::RadiatorThermostat
            | AccessoryType::BoilerThermostat
            | AccessoryType::ExternalSensor
            | AccessoryType::WindowSensor
    )
}

/// The accessories a zone listing asks for under `config`.
fn wanted_from_zones(config: &FeatureConfig, zones: &[Zone]) -> Vec<Wanted> {
    let zone_rules: Vec<&ZoneRule> = ZONE_RULES.iter().filter(|r| (r.enabled)(config)).collect();
    let device_rules: Vec<&DeviceRule> = DEVICE_RULES.iter().filter(|r| (r.enabled)(config)).collect();

    let mut wanted = Vec::new();
    for zone in zones {
        for rule in zone_rules.iter().filter(|r| (r.applies)(zone)) {
            wanted.push((rule.build)(zone));
        }
        for device in &zone.devices {
            if let Some(rule) = device_rules
                .iter()
                .find(|r| r.device_type == device.device_type.code())
            {
                wanted.push(device_thermostat(rule, zone, device));
            }
        }
    }
    unique_names(wanted)
}

/// Pass A: thermostats, sensors and one-per-room accessories from the zone listing.
pub fn reconcile_zones(config: &FeatureConfig, zones: &[Zone], registry: &mut Registry) -> Vec<Event> {
    let wanted = wanted_from_zones(config, zones);
    debug!(zones = zones.len(), wanted = wanted.len(), "reconciling zones");
    apply(plan(registry, manages_zone_accessory, wanted), registry)
}

fn occupancy(device: &MobileDevice) -> Wanted {
    let mut context = AccessoryContext::new(AccessoryType::Occupancy, device.id.to_string(), device.model())
        .with_logging(LoggingType::Motion);
    context.at_home = Some(device.at_home());
    Wanted {
        name: device.name.clone(),
        context,
    }
}

fn anyone(config: &FeatureConfig, at_home: bool) -> Wanted {
    let mut context = AccessoryContext::new(AccessoryType::Occupancy, ANYONE_ID, "Occupancy Sensor")
        .with_logging(LoggingType::Motion);
    context.at_home = Some(at_home);
    Wanted {
        name: format!("{} Anyone", config.name),
        context,
    }
}

/// Pass B: one occupancy accessory per geo-tracked mobile device, plus the
/// "Anyone" accessory while at least one such device exists.
pub fn reconcile_mobile_devices(
    config: &FeatureConfig,
    devices: &[MobileDevice],
    registry: &mut Registry,
) -> Vec<Event> {
    let mut wanted = Vec::new();
    if config.occupancy {
        let tracked: Vec<&MobileDevice> = devices.iter().filter(|d| d.geo_tracking()).collect();
        if !tracked.is_empty() {
            // The synthetic accessory claims its name first.
            wanted.push(anyone(config, tracked.iter().any(|d| d.at_home())));
        }
        wanted.extend(tracked.into_iter().map(occupancy));
    }
    debug!(devices = devices.len(), wanted = wanted.len(), "reconciling mobile devices");
    apply(
        plan(registry, |c| c.kind == AccessoryType::Occupancy, unique_names(wanted)),
        registry,
    )
}

/// Pass C: config-only singletons. Created when switched on and absent,
/// removed when switched off; never diffed against remote data.
pub fn reconcile_static(config: &FeatureConfig, session: &SessionInfo, registry: &mut Registry) -> Vec<Event> {
    let mut events = Vec::new();
    for rule in STATIC_RULES {
        if (rule.enabled)(config) {
            if registry.of_type(rule.kind).next().is_some() {
                continue;
            }
            let mut context = AccessoryContext::new(
                rule.kind,
                format!("{}-{}", session.home_id, rule.tag),
                rule.label,
            );
            if let Some(logging_type) = rule.logging {
                context = context.with_logging(logging_type);
            }
            let wanted = Wanted {
                name: format!("{} {}", config.name, rule.label),
                context,
            };
            add_accessory(registry, wanted, &mut events);
        } else {
            for name in registry.names_where(|c| c.kind == rule.kind) {
                remove_accessory(registry, &name, &mut events);
            }
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{parse_mobile_devices, parse_zones};

    fn config() -> FeatureConfig {
        FeatureConfig::new("user", "pass")
    }

    fn living_room() -> Vec<Zone> {
        parse_zones(
            r#"[{
                "id": 1, "name": "Living", "type": "HEATING",
                "devices": [
                    {"deviceType": "VA01", "serialNo": "VA0000000001", "shortSerialNo": "VA01-1", "batteryState": "NORMAL"},
                    {"deviceType": "VA01", "serialNo": "VA0000000002", "shortSerialNo": "VA01-2", "batteryState": "LOW"},
                    {"deviceType": "RU01", "serialNo": "RU0000000001", "shortSerialNo": "RU01-1", "batteryState": "NORMAL"}
                ],
                "openWindowDetection": {"supported": true, "enabled": true}
            }, {
                "id": 0, "name": "Hot Water", "type": "HOT_WATER",
                "devices": [{"deviceType": "BU01", "serialNo": "BU0000000001", "shortSerialNo": "BU01-1", "batteryState": "LOW"}]
            }]"#,
        )
        .unwrap()
    }

    #[test]
    fn rule_tables_gate_on_flags() {
        let zones = living_room();
        let wanted = wanted_from_zones(&config(), &zones);
        let names: Vec<_> = wanted.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, ["Living VA01-1", "Living VA01-2"]);

        let mut all = config();
        all.remote_thermostat = true;
        all.boiler_thermostat = true;
        all.one_per_room = true;
        all.external_sensor = true;
        all.open_window = true;
        let wanted = wanted_from_zones(&all, &zones);
        let names: Vec<_> = wanted.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "Living Temperature",
                "Living Window",
                "Living Thermostat",
                "Living VA01-1",
                "Living VA01-2",
                "Living RU01-1",
                "Hot Water BU01-1",
            ]
        );
    }

    #[test]
    fn zone_keyed_accessories_use_zone_id() {
        let mut all = config();
        all.external_sensor = true;
        all.one_per_room = true;
        let wanted = wanted_from_zones(&all, &living_room());
        let sensor = wanted.iter().find(|w| w.context.kind == AccessoryType::ExternalSensor).unwrap();
        assert_eq!(sensor.context.key().id, "1");
        let room = wanted
            .iter()
            .find(|w| w.context.extra_type == Some(ExtraType::OnePerRoom))
            .unwrap();
        assert_eq!(room.context.key().id, "1");
        // one radiator reports LOW
        assert_eq!(room.context.battery_state, Some(BatteryState::Low));
    }

    #[test]
    fn window_sensor_needs_supported_and_enabled() {
        let zones = parse_zones(
            r#"[{"id": 2, "name": "Bath", "type": "HEATING", "devices": [],
                 "openWindowDetection": {"supported": true, "enabled": false}}]"#,
        )
        .unwrap();
        let mut with_window = config();
        with_window.open_window = true;
        assert!(wanted_from_zones(&with_window, &zones).is_empty());
    }

    #[test]
    fn anyone_claims_its_name_before_devices() {
        let devices = parse_mobile_devices(
            r#"[{"id": 5, "name": "Tado Anyone", "settings": {"geoTrackingEnabled": true}}]"#,
        )
        .unwrap();
        let mut with_occupancy = config();
        with_occupancy.occupancy = true;
        let mut registry = Registry::new();
        reconcile_mobile_devices(&with_occupancy, &devices, &mut registry);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("Tado Anyone").unwrap().context.short_serial_no, ANYONE_ID);
        assert_eq!(registry.get("Tado Anyone 5").unwrap().context.short_serial_no, "5");
    }

    #[test]
    fn static_ids_derive_from_home() {
        let mut flags = config();
        flags.central_switch = true;
        flags.solar_intensity = true;
        let session = SessionInfo {
            home_id: 42,
            temperature_unit: TemperatureUnit::Celsius,
        };
        let mut registry = Registry::new();
        let events = reconcile_static(&flags, &session, &mut registry);
        assert_eq!(events.len(), 2);
        let switch = registry.get("Tado Central Switch").unwrap();
        assert_eq!(switch.context.serial_no, "42-CS");
        assert!(!switch.context.logging);
        assert_eq!(registry.get("Tado Solar Intensity").unwrap().context.serial_no, "42-SI");
    }
}
