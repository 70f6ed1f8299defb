// Resolved sensor variants and the pure metric/status rules
use serde::Serialize;
use thiserror::Error;

use super::sensor::{HistoryEntry, RawParameters, Reading, Sensor, SensorType, UseCase};
use super::status::Status;

/// Reasons a sensor cannot be classified. None of these surface as HTTP
/// errors; they all map to [`Status::Unknown`] so that one broken sensor
/// never blocks the rest of the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DerivationError {
    #[error("sensor has no recognized type")]
    MissingType,
    #[error("sensor has no matched use case")]
    Unconfigured,
    #[error("use case {0} is not valid for this sensor type")]
    InconsistentUseCase(u32),
    #[error("sensor has no current reading")]
    MissingReading,
    #[error("required parameter `{0}` is absent or invalid")]
    MissingParameter(&'static str),
    #[error("minDistance >= maxDistance leaves no measurable range")]
    DegenerateRange,
}

/// Climate thresholds with defaults applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateParams {
    pub target_temperature: f64,
    pub temp_tolerance: f64,
    pub target_humidity: f64,
    pub humidity_tolerance: f64,
    pub target_co2: f64,
    pub co2_tolerance: f64,
}

impl ClimateParams {
    fn from_raw(raw: &RawParameters) -> Self {
        Self {
            target_temperature: raw.target_temperature.unwrap_or(21.0),
            temp_tolerance: raw.temp_tolerance.unwrap_or(2.0),
            target_humidity: raw.target_humidity.unwrap_or(50.0),
            humidity_tolerance: raw.humidity_tolerance.unwrap_or(10.0),
            target_co2: raw.target_co2.unwrap_or(800.0),
            co2_tolerance: raw.co2_tolerance.unwrap_or(200.0),
        }
    }
}

impl Default for ClimateParams {
    fn default() -> Self {
        Self::from_raw(&RawParameters::default())
    }
}

/// Fill-level thresholds. `min_distance`/`max_distance` have no sane
/// default and must be configured; the invariant `min < max` is checked
/// at resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillParams {
    pub min_distance: f64,
    pub max_distance: f64,
    pub warning_threshold: f64,
    pub critical_threshold: f64,
}

impl FillParams {
    fn from_raw(raw: &RawParameters) -> Result<Self, DerivationError> {
        let min_distance = raw
            .min_distance
            .ok_or(DerivationError::MissingParameter("minDistance"))?;
        let max_distance = raw
            .max_distance
            .ok_or(DerivationError::MissingParameter("maxDistance"))?;
        if min_distance >= max_distance {
            return Err(DerivationError::DegenerateRange);
        }
        Ok(Self {
            min_distance,
            max_distance,
            warning_threshold: raw.warning_threshold.unwrap_or(40.0),
            critical_threshold: raw.critical_threshold.unwrap_or(20.0),
        })
    }
}

/// Door thresholds. Invariant: `tolerance > 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoorParams {
    pub target_distance: f64,
    pub tolerance: f64,
}

impl DoorParams {
    fn from_raw(raw: &RawParameters) -> Result<Self, DerivationError> {
        let target_distance = raw
            .target_distance
            .ok_or(DerivationError::MissingParameter("targetDistance"))?;
        let tolerance = raw.tolerance.unwrap_or(5.0);
        if tolerance <= 0.0 {
            return Err(DerivationError::MissingParameter("tolerance"));
        }
        Ok(Self {
            target_distance,
            tolerance,
        })
    }

    /// Strict greater-than: a distance exactly at `target + tolerance`
    /// still counts as closed.
    pub fn is_open(&self, distance: f64) -> bool {
        distance > self.target_distance + self.tolerance
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyParams {
    pub target_voltage: f64,
    pub voltage_tolerance: f64,
    pub target_current: f64,
    pub current_tolerance: f64,
}

impl EnergyParams {
    fn from_raw(raw: &RawParameters) -> Self {
        Self {
            target_voltage: raw.target_voltage.unwrap_or(230.0),
            voltage_tolerance: raw.voltage_tolerance.unwrap_or(10.0),
            target_current: raw.target_current.unwrap_or(10.0),
            current_tolerance: raw.current_tolerance.unwrap_or(1.0),
        }
    }
}

impl Default for EnergyParams {
    fn default() -> Self {
        Self::from_raw(&RawParameters::default())
    }
}

/// A sensor reading resolved into its semantic variant. The variant is
/// decided once from `{type, matchedUseCase}`; downstream code matches
/// exhaustively instead of re-checking type tags.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorReading {
    Climate {
        temperature: f64,
        humidity: f64,
        co2: f64,
        moldy: bool,
        params: ClimateParams,
    },
    FillLevel {
        distance: f64,
        params: FillParams,
    },
    Door {
        distance: f64,
        params: DoorParams,
    },
    Energy {
        voltage: f64,
        current: f64,
        params: EnergyParams,
    },
}

impl SensorReading {
    /// Resolves a stored sensor into its variant, applying parameter
    /// defaults and validating the invariants from the data model.
    pub fn resolve(sensor: &Sensor) -> Result<Self, DerivationError> {
        let sensor_type = sensor
            .sensor_type
            .ok_or(DerivationError::MissingType)?;
        let use_case = sensor
            .matched_use_case
            .ok_or(DerivationError::Unconfigured)?;
        let data = sensor
            .data
            .as_ref()
            .ok_or(DerivationError::MissingReading)?;
        let empty = RawParameters::default();
        let raw = sensor.parameters.as_ref().unwrap_or(&empty);

        match sensor_type {
            SensorType::Climate => Ok(SensorReading::Climate {
                temperature: data
                    .temperature
                    .ok_or(DerivationError::MissingReading)?,
                humidity: data.humidity.ok_or(DerivationError::MissingReading)?,
                co2: data.co2.ok_or(DerivationError::MissingReading)?,
                moldy: data.moldy.unwrap_or(false),
                params: ClimateParams::from_raw(raw),
            }),
            SensorType::Distance => {
                let distance =
                    data.distance.ok_or(DerivationError::MissingReading)?;
                match UseCase::from_id(use_case) {
                    Some(UseCase::FillLevel) => Ok(SensorReading::FillLevel {
                        distance,
                        params: FillParams::from_raw(raw)?,
                    }),
                    Some(UseCase::Opening) => Ok(SensorReading::Door {
                        distance,
                        params: DoorParams::from_raw(raw)?,
                    }),
                    _ => Err(DerivationError::InconsistentUseCase(use_case)),
                }
            }
            SensorType::Energy => Ok(SensorReading::Energy {
                voltage: data.voltage.ok_or(DerivationError::MissingReading)?,
                current: data.current.ok_or(DerivationError::MissingReading)?,
                params: EnergyParams::from_raw(raw),
            }),
        }
    }

    /// Status of the resolved reading per the tolerance-band rules.
    pub fn status(&self) -> Status {
        match self {
            SensorReading::Climate {
                temperature,
                humidity,
                co2,
                params,
                ..
            } => [
                deviation_status(*temperature, params.target_temperature, params.temp_tolerance),
                deviation_status(*humidity, params.target_humidity, params.humidity_tolerance),
                deviation_status(*co2, params.target_co2, params.co2_tolerance),
            ]
            .into_iter()
            .max()
            .unwrap_or(Status::Unknown),
            SensorReading::FillLevel { distance, params } => {
                fill_level_status(fill_level(*distance, params), params)
            }
            SensorReading::Door { distance, params } => {
                if params.is_open(*distance) {
                    Status::Warning
                } else {
                    Status::Normal
                }
            }
            SensorReading::Energy {
                voltage,
                current,
                params,
            } => [
                deviation_status(*voltage, params.target_voltage, params.voltage_tolerance),
                deviation_status(*current, params.target_current, params.current_tolerance),
            ]
            .into_iter()
            .max()
            .unwrap_or(Status::Unknown),
        }
    }
}

/// Tolerance-banded deviation rule shared by climate and energy values.
/// Strict `>` at both bands: a deviation exactly at the tolerance is
/// still Normal, exactly at twice the tolerance still Warning.
pub fn deviation_status(value: f64, target: f64, tolerance: f64) -> Status {
    let diff = (value - target).abs();
    if diff > tolerance * 2.0 {
        Status::Critical
    } else if diff > tolerance {
        Status::Warning
    } else {
        Status::Normal
    }
}

/// Raw fill level in percent. Not clamped; status thresholds compare the
/// raw value, only the display value is clamped.
pub fn fill_level(distance: f64, params: &FillParams) -> f64 {
    (params.max_distance - distance) / (params.max_distance - params.min_distance) * 100.0
}

/// Fill level clamped to `[0, 100]` for progress bars.
pub fn display_fill_level(distance: f64, params: &FillParams) -> f64 {
    fill_level(distance, params).clamp(0.0, 100.0)
}

/// Absolute-threshold rule for fill levels; low level is bad.
pub fn fill_level_status(level: f64, params: &FillParams) -> Status {
    if level < params.critical_threshold {
        Status::Critical
    } else if level < params.warning_threshold {
        Status::Warning
    } else {
        Status::Normal
    }
}

/// Instantaneous power draw in watts.
pub fn power_watts(voltage: f64, current: f64) -> f64 {
    voltage * current
}

/// Single entry point used by every view: any resolution failure becomes
/// `Unknown` rather than an error.
pub fn sensor_status(sensor: &Sensor) -> Status {
    SensorReading::resolve(sensor)
        .map(|reading| reading.status())
        .unwrap_or(Status::Unknown)
}

/// Coarse direction of a derived metric, for trend arrows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

/// Per-metric noise floor below which two consecutive readings count as
/// stable.
fn trend_noise_floor(key: &str) -> f64 {
    match key {
        "temperature" => 0.5,
        "humidity" => 2.0,
        "co2" => 50.0,
        "distance" => 2.0,
        "voltage" => 2.0,
        "current" => 0.5,
        _ => 0.1,
    }
}

/// Direction between the two newest history samples of one reading field.
/// `history` is newest-first; fewer than two usable samples is Stable.
pub fn trend_direction(
    history: &[HistoryEntry],
    key: &str,
    extract: impl Fn(&Reading) -> Option<f64>,
) -> TrendDirection {
    let (Some(latest), Some(previous)) = (
        history.first().and_then(|e| extract(&e.data)),
        history.get(1).and_then(|e| extract(&e.data)),
    ) else {
        return TrendDirection::Stable;
    };
    let diff = latest - previous;
    if diff.abs() < trend_noise_floor(key) {
        TrendDirection::Stable
    } else if diff > 0.0 {
        TrendDirection::Up
    } else {
        TrendDirection::Down
    }
}
