// ── Thermostat payload helpers ──
//
// Thermostat state lives in the raw hub payload. Temperatures there are in
// deci-degrees; the helpers return degrees unless the name says `raw`.

use crestron_api::RawRecord;
use serde::Serialize;
use serde_json::Value;
use strum::{Display, EnumString};

/// Heat/cool deadband in deci-degrees used to infer the running action.
const DEADBAND: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum HvacMode {
    Off,
    Heat,
    Cool,
    /// The hub calls this "Auto".
    #[strum(serialize = "Auto")]
    HeatCool,
}

impl HvacMode {
    /// Mode string as the hub expects it.
    pub fn as_hub(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Heat => "Heat",
            Self::Cool => "Cool",
            Self::HeatCool => "Auto",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum HvacAction {
    Off,
    Heating,
    Cooling,
    Idle,
}

fn int(value: Option<&Value>) -> Option<i64> {
    value.and_then(Value::as_i64)
}

/// Current mode string, `"Off"` when absent.
pub fn mode_str(raw: &RawRecord) -> &str {
    ["currentMode", "mode"]
        .iter()
        .find_map(|k| raw.get(*k).and_then(Value::as_str).filter(|s| !s.is_empty()))
        .unwrap_or("Off")
}

/// Current mode; unknown strings read as off.
pub fn hvac_mode(raw: &RawRecord) -> HvacMode {
    mode_str(raw).parse().unwrap_or(HvacMode::Off)
}

/// Modes the thermostat offers, always including `Off` first.
pub fn available_modes(raw: &RawRecord) -> Vec<HvacMode> {
    let mut modes = vec![HvacMode::Off];
    let offered = raw
        .get("availableSystemModes")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .filter_map(|s| s.parse::<HvacMode>().ok());
    for mode in offered {
        if !modes.contains(&mode) {
            modes.push(mode);
        }
    }
    modes
}

/// Target temperature in deci-degrees.
///
/// Prefers the `currentSetPoint` entry matching the current mode, then a
/// cool, then a heat setpoint, then any value; falls back to `setPoint`.
pub fn target_temperature_raw(raw: &RawRecord) -> Option<i64> {
    if let Some(setpoints) = raw
        .get("currentSetPoint")
        .and_then(Value::as_array)
        .filter(|a| !a.is_empty())
    {
        let value = |sp: &Value| int(sp.get("temperature")).or_else(|| int(sp.get("value")));
        let of_type = |kind: &str| {
            setpoints.iter().find(|sp| {
                sp.get("type")
                    .and_then(Value::as_str)
                    .is_some_and(|t| t.eq_ignore_ascii_case(kind))
            })
        };
        let mode = mode_str(raw);
        return [mode, "cool", "heat"]
            .iter()
            .find_map(|kind| of_type(kind))
            .and_then(value)
            .or_else(|| setpoints.iter().find_map(value));
    }
    raw.get("setPoint")
        .filter(|sp| sp.is_object())
        .and_then(|sp| int(sp.get("temperature")))
}

/// Setpoint type for a temperature change: the mode in title case, or
/// `"Cool"` while off.
pub fn setpoint_type(raw: &RawRecord) -> String {
    let mode = mode_str(raw);
    if mode.eq_ignore_ascii_case("off") {
        return "Cool".to_owned();
    }
    let mut chars = mode.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

/// (min, max) in deci-degrees from `availableSetPoints` or `setPoint`.
pub fn temperature_bounds_raw(raw: &RawRecord) -> Option<(i64, i64)> {
    if let Some(available) = raw.get("availableSetPoints").and_then(Value::as_array) {
        let min = available.iter().filter_map(|sp| int(sp.get("minValue"))).min();
        let max = available.iter().filter_map(|sp| int(sp.get("maxValue"))).max();
        if let (Some(min), Some(max)) = (min, max) {
            return Some((min, max));
        }
    }
    let sp = raw.get("setPoint").filter(|sp| sp.is_object())?;
    Some((int(sp.get("minValue"))?, int(sp.get("maxValue"))?))
}

/// Whether the payload reports Celsius units (the hub default).
pub fn is_celsius(raw: &RawRecord) -> bool {
    raw.get("temperatureUnits")
        .and_then(Value::as_str)
        .is_none_or(|u| u.contains("Celsius"))
}

/// (min, max) in degrees, with per-unit defaults when the hub gives none.
pub fn temperature_bounds(raw: &RawRecord) -> (f64, f64) {
    match temperature_bounds_raw(raw) {
        Some((min, max)) => (from_deci(min), from_deci(max)),
        None if is_celsius(raw) => (3.0, 32.0),
        None => (45.0, 95.0),
    }
}

/// Running action: the hub's `running` flag if present, else inferred from
/// the current and target temperatures with a deadband.
pub fn hvac_action(raw: &RawRecord) -> HvacAction {
    let mode = mode_str(raw).to_ascii_lowercase();
    if mode == "off" {
        return HvacAction::Off;
    }

    if let Some(running) = raw.get("running").and_then(Value::as_str) {
        match running.to_ascii_lowercase().as_str() {
            "cooling" => return HvacAction::Cooling,
            "heating" => return HvacAction::Heating,
            "idle" | "off" => return HvacAction::Idle,
            _ => {}
        }
    }

    let (Some(current), Some(target)) = (
        int(raw.get("currentTemperature")),
        target_temperature_raw(raw),
    ) else {
        return HvacAction::Idle;
    };

    let too_warm = current > target + DEADBAND;
    let too_cold = current < target - DEADBAND;
    match mode.as_str() {
        "cool" | "auto" if too_warm => HvacAction::Cooling,
        "heat" | "auto" if too_cold => HvacAction::Heating,
        _ => HvacAction::Idle,
    }
}

pub fn current_temperature(raw: &RawRecord) -> Option<f64> {
    int(raw.get("currentTemperature")).map(from_deci)
}

pub fn target_temperature(raw: &RawRecord) -> Option<f64> {
    target_temperature_raw(raw).map(from_deci)
}

pub fn fan_mode(raw: &RawRecord) -> Option<&str> {
    raw.get("currentFanMode").and_then(Value::as_str)
}

pub fn fan_modes(raw: &RawRecord) -> Vec<String> {
    raw.get("availableFanModes")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::to_owned)
        .collect()
}

/// Deci-degrees to degrees, one decimal.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn from_deci(value: i64) -> f64 {
    value as f64 / 10.0
}

/// Degrees to the nearest deci-degree.
#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
pub fn to_deci(degrees: f64) -> i32 {
    (degrees * 10.0).round() as i32
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn raw(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            _ => RawRecord::new(),
        }
    }

    #[test]
    fn mode_parsing_is_case_insensitive() {
        assert_eq!(hvac_mode(&raw(json!({ "currentMode": "HEAT" }))), HvacMode::Heat);
        assert_eq!(hvac_mode(&raw(json!({ "mode": "auto" }))), HvacMode::HeatCool);
        assert_eq!(hvac_mode(&raw(json!({ "mode": "Eco" }))), HvacMode::Off);
        assert_eq!(hvac_mode(&raw(json!({}))), HvacMode::Off);
        assert_eq!(HvacMode::HeatCool.as_hub(), "Auto");
    }

    #[test]
    fn available_modes_always_start_with_off() {
        let modes = available_modes(&raw(json!({
            "availableSystemModes": ["Heat", "HEAT", "Cool", "Bogus"]
        })));
        assert_eq!(modes, vec![HvacMode::Off, HvacMode::Heat, HvacMode::Cool]);
    }

    #[test]
    fn target_prefers_setpoint_for_current_mode() {
        let payload = raw(json!({
            "currentMode": "Heat",
            "currentSetPoint": [
                { "type": "Cool", "temperature": 250 },
                { "type": "Heat", "temperature": 205 },
            ],
        }));
        assert_eq!(target_temperature_raw(&payload), Some(205));
        assert_eq!(target_temperature(&payload), Some(20.5));
    }

    #[test]
    fn target_falls_back_to_cool_then_any_then_setpoint() {
        let off = raw(json!({
            "currentMode": "Off",
            "currentSetPoint": [
                { "type": "Heat", "value": 190 },
                { "type": "Cool", "temperature": 240 },
            ],
        }));
        assert_eq!(target_temperature_raw(&off), Some(240));

        let any = raw(json!({ "currentSetPoint": [{ "type": "Eco", "value": 180 }] }));
        assert_eq!(target_temperature_raw(&any), Some(180));

        let legacy = raw(json!({ "setPoint": { "temperature": 215 } }));
        assert_eq!(target_temperature_raw(&legacy), Some(215));
    }

    #[test]
    fn setpoint_type_title_cases_mode() {
        assert_eq!(setpoint_type(&raw(json!({ "currentMode": "HEAT" }))), "Heat");
        assert_eq!(setpoint_type(&raw(json!({ "currentMode": "off" }))), "Cool");
        assert_eq!(setpoint_type(&raw(json!({}))), "Cool");
    }

    #[test]
    fn bounds_from_available_setpoints_or_defaults() {
        let payload = raw(json!({
            "availableSetPoints": [
                { "type": "Heat", "minValue": 50, "maxValue": 300 },
                { "type": "Cool", "minValue": 100, "maxValue": 350 },
            ],
        }));
        assert_eq!(temperature_bounds_raw(&payload), Some((50, 350)));
        assert_eq!(temperature_bounds(&payload), (5.0, 35.0));

        let fahrenheit = raw(json!({ "temperatureUnits": "DeciFahrenheit" }));
        assert_eq!(temperature_bounds(&fahrenheit), (45.0, 95.0));
        assert_eq!(temperature_bounds(&raw(json!({}))), (3.0, 32.0));
    }

    #[test]
    fn action_uses_running_flag_first() {
        let payload = raw(json!({ "currentMode": "Cool", "running": "Heating" }));
        assert_eq!(hvac_action(&payload), HvacAction::Heating);
    }

    #[test]
    fn action_inferred_with_deadband() {
        let cooling = raw(json!({
            "currentMode": "Cool",
            "currentTemperature": 260,
            "setPoint": { "temperature": 250 },
        }));
        assert_eq!(hvac_action(&cooling), HvacAction::Cooling);

        let within = raw(json!({
            "currentMode": "Auto",
            "currentTemperature": 253,
            "setPoint": { "temperature": 250 },
        }));
        assert_eq!(hvac_action(&within), HvacAction::Idle);

        let heating = raw(json!({
            "currentMode": "Auto",
            "currentTemperature": 240,
            "setPoint": { "temperature": 250 },
        }));
        assert_eq!(hvac_action(&heating), HvacAction::Heating);

        assert_eq!(hvac_action(&raw(json!({ "mode": "Off" }))), HvacAction::Off);
    }

    #[test]
    fn deci_conversion() {
        assert_eq!(to_deci(21.5), 215);
        assert!((from_deci(215) - 21.5).abs() < f64::EPSILON);
    }
}
