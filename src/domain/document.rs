// The stored document and its grouping entities
use serde::{Deserialize, Serialize};

use super::sensor::Sensor;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// An asset may be unassigned to a room, a category, or both.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub room_id: Option<i64>,
    #[serde(default)]
    pub category_id: Option<i64>,
}

/// Typed view of the single JSON document owned by the persistence
/// layer. Favorites are passed through untouched; the core never
/// interprets them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub sensors: Vec<Sensor>,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub favorites: Vec<serde_json::Value>,
}

fn take_array(map: &mut serde_json::Map<String, serde_json::Value>, key: &str) -> Vec<serde_json::Value> {
    match map.remove(key) {
        Some(serde_json::Value::Array(values)) => values,
        _ => Vec::new(),
    }
}

fn grouping_entities<T: serde::de::DeserializeOwned>(
    values: Vec<serde_json::Value>,
    kind: &str,
) -> Vec<T> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(entity) => Some(entity),
            Err(error) => {
                tracing::warn!("skipping malformed {kind}: {error}");
                None
            }
        })
        .collect()
}

impl StoreDocument {
    /// Builds the typed view of the raw stored document and restores the
    /// newest-first history invariant on every sensor. Decoding is
    /// per-element: a sensor that does not parse is kept as an
    /// unclassifiable entry (it reads as `Unknown` downstream), a
    /// grouping entity that does not parse is dropped. One bad record
    /// must never take the whole dashboard down.
    pub fn from_value(value: serde_json::Value) -> Self {
        let serde_json::Value::Object(mut map) = value else {
            return StoreDocument::default();
        };
        let mut sensors: Vec<Sensor> = take_array(&mut map, "sensors")
            .into_iter()
            .map(Sensor::from_value)
            .collect();
        for sensor in &mut sensors {
            sensor.normalize_history();
        }
        StoreDocument {
            sensors,
            rooms: grouping_entities(take_array(&mut map, "rooms"), "room"),
            assets: grouping_entities(take_array(&mut map, "assets"), "asset"),
            categories: grouping_entities(take_array(&mut map, "categories"), "category"),
            favorites: take_array(&mut map, "favorites"),
        }
    }

    pub fn sensor(&self, id: i64) -> Option<&Sensor> {
        self.sensors.iter().find(|s| s.id == id)
    }

    pub fn asset(&self, id: i64) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }
}
