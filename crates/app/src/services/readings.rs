//! Flatten typed response bodies into per-target readings.

use hvacq_domain::id::{HomeId, ZoneId};
use hvacq_domain::remote::{ResponseBody, ZoneInfo, ZoneState};
use hvacq_domain::target::{AttributeKind, Target};
use hvacq_domain::value::AttributeValue;

/// One observed value.
pub type Reading = (Target, AttributeValue);

/// Every reading carried by `body`. Absent fields produce no reading.
#[must_use]
pub fn readings(home: HomeId, body: &ResponseBody) -> Vec<Reading> {
    let mut out = Vec::new();
    match body {
        ResponseBody::Empty => {}
        ResponseBody::HomeState(state) => {
            let target = Target::home(home, AttributeKind::Presence);
            out.push((target, state.presence.into()));
        }
        ResponseBody::ZoneStates(zones) => {
            for (zone, state) in zones {
                zone_state(*zone, state, &mut out);
            }
        }
        ResponseBody::Zones(zones) => {
            for info in zones {
                zone_info(info, &mut out);
            }
        }
    }
    out
}

fn zone_state(zone: ZoneId, state: &ZoneState, out: &mut Vec<Reading>) {
    out.push((
        Target::zone(zone, AttributeKind::AutoMode),
        AttributeValue::Bool(!state.overlay_active),
    ));
    if let Some(on) = state.power {
        out.push((Target::zone(zone, AttributeKind::Power), AttributeValue::Bool(on)));
    }
    let numbers = [
        (AttributeKind::TargetTemperature, state.target_temperature),
        (AttributeKind::InsideTemperature, state.inside_temperature),
        (AttributeKind::Humidity, state.humidity),
        (AttributeKind::HeatingPower, state.heating_power),
    ];
    for (kind, value) in numbers {
        if let Some(value) = value {
            out.push((Target::zone(zone, kind), AttributeValue::Float(value)));
        }
    }
}

fn zone_info(info: &ZoneInfo, out: &mut Vec<Reading>) {
    out.push((
        Target::zone(info.id, AttributeKind::ZoneName),
        AttributeValue::Text(info.name.clone()),
    ));
    out.push((
        Target::zone(info.id, AttributeKind::ZoneType),
        AttributeValue::Text(info.zone_type.clone()),
    ));
    // worst device wins; no known battery means no reading
    if let Some(battery) = info.devices.iter().filter_map(|d| d.battery).max() {
        out.push((
            Target::zone(info.id, AttributeKind::Battery),
            battery.into(),
        ));
    }
}
