// Sensor entity model as stored by the persistence layer
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorType {
    Climate,
    Distance,
    Energy,
}

/// Fixed use-case catalog. A sensor's matched use case decides which
/// metric and status rule applies; for distance sensors it also decides
/// the semantic role (fill level vs. door).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UseCase {
    FillLevel,
    Climate,
    Opening,
    Energy,
}

impl UseCase {
    pub const ALL: [UseCase; 4] = [
        UseCase::FillLevel,
        UseCase::Climate,
        UseCase::Opening,
        UseCase::Energy,
    ];

    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            1 => Some(UseCase::FillLevel),
            2 => Some(UseCase::Climate),
            3 => Some(UseCase::Opening),
            4 => Some(UseCase::Energy),
            _ => None,
        }
    }

    pub fn id(self) -> u32 {
        match self {
            UseCase::FillLevel => 1,
            UseCase::Climate => 2,
            UseCase::Opening => 3,
            UseCase::Energy => 4,
        }
    }

    /// Catalog title as shown in the UI.
    pub fn title(self) -> &'static str {
        match self {
            UseCase::FillLevel => "Füllstände",
            UseCase::Climate => "Raumklima",
            UseCase::Opening => "Öffnungen",
            UseCase::Energy => "Stromversorgung",
        }
    }
}

/// One raw reading. Which fields are present depends on the sensor type;
/// everything is optional so that a sparse or malformed document still
/// deserializes and degrades to `Unknown` instead of failing the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub co2: Option<f64>,
    #[serde(rename = "moldy?", skip_serializing_if = "Option::is_none")]
    pub moldy: Option<bool>,
    pub distance: Option<f64>,
    pub voltage: Option<f64>,
    pub current: Option<f64>,
}

/// Threshold parameters exactly as stored. All optional; defaults are
/// applied once at variant resolution, never inline at use sites.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawParameters {
    pub min_distance: Option<f64>,
    pub max_distance: Option<f64>,
    pub warning_threshold: Option<f64>,
    pub critical_threshold: Option<f64>,
    pub target_distance: Option<f64>,
    pub tolerance: Option<f64>,
    pub target_temperature: Option<f64>,
    pub temp_tolerance: Option<f64>,
    pub target_humidity: Option<f64>,
    pub humidity_tolerance: Option<f64>,
    #[serde(rename = "targetCO2")]
    pub target_co2: Option<f64>,
    #[serde(rename = "co2Tolerance")]
    pub co2_tolerance: Option<f64>,
    pub target_voltage: Option<f64>,
    pub voltage_tolerance: Option<f64>,
    pub target_current: Option<f64>,
    pub current_tolerance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub data: Reading,
}

/// Reads a field on a best-effort basis: a value that does not match the
/// expected shape deserializes as absent, so the sensor it belongs to
/// degrades to `Unknown` instead of failing the whole document.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Keeps the history entries that parse and drops the rest. An entry
/// with a garbled timestamp or reading must not discard the sensor.
fn lenient_history<'de, D>(deserializer: D) -> Result<Vec<HistoryEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(values) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(values
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sensor {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub sensor_type: Option<SensorType>,
    #[serde(default, deserialize_with = "lenient")]
    pub matched_use_case: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub data: Option<Reading>,
    #[serde(default, deserialize_with = "lenient")]
    pub parameters: Option<RawParameters>,
    #[serde(default, deserialize_with = "lenient_history")]
    pub history: Vec<HistoryEntry>,
    #[serde(default, deserialize_with = "lenient")]
    pub room_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub asset_id: Option<i64>,
}

impl Sensor {
    /// Best-effort decode of one stored sensor. A value that is not even
    /// sensor-shaped still yields an entry, carrying over whatever id and
    /// name it had, so it shows up as unclassifiable rather than
    /// poisoning the rest of the document.
    pub fn from_value(value: Value) -> Self {
        let id = value.get("id").and_then(Value::as_i64).unwrap_or(-1);
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string);
        match serde_json::from_value(value) {
            Ok(sensor) => sensor,
            Err(error) => {
                tracing::warn!("sensor {id} has an unexpected shape: {error}");
                Sensor {
                    id,
                    name,
                    sensor_type: None,
                    matched_use_case: None,
                    data: None,
                    parameters: None,
                    history: Vec::new(),
                    room_id: None,
                    asset_id: None,
                }
            }
        }
    }

    pub fn use_case(&self) -> Option<UseCase> {
        self.matched_use_case.and_then(UseCase::from_id)
    }

    /// Restores the newest-first history invariant. Called once at the
    /// ingestion boundary; every consumer may then rely on `history[0]`
    /// being the latest reading.
    pub fn normalize_history(&mut self) {
        self.history
            .sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }
}
