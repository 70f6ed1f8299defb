// Dashboard service - computes the rollup summary and detail analytics
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::application::history::{
    consumption_rate, door_stats, energy_consumption, trend_percent, window_series, window_stats,
    DoorStats, EnergyConsumption, TimeUntilCritical, WindowStats,
};
use crate::application::rollup::{
    rollup, sensors_for_use_case, sensors_in_category, sensors_in_room, sensors_of_asset,
    unconfigured_count,
};
use crate::application::store_repository::StoreRepository;
use crate::domain::document::StoreDocument;
use crate::domain::reading::{
    deviation_status, display_fill_level, fill_level, power_watts, sensor_status, trend_direction,
    SensorReading, TrendDirection,
};
use crate::domain::sensor::{Reading, Sensor, UseCase};
use crate::domain::status::Status;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStatus {
    pub id: i64,
    pub name: String,
    pub status: Status,
    pub color: &'static str,
    pub sensor_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UseCaseStatus {
    pub id: u32,
    pub title: &'static str,
    pub status: Status,
    pub color: &'static str,
    pub sensor_count: usize,
}

/// One snapshot of the whole dashboard. Every grouping level runs through
/// the same per-sensor classification, so cards and rollups can never
/// disagree.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub overall: Status,
    pub rooms: Vec<GroupStatus>,
    pub categories: Vec<GroupStatus>,
    pub assets: Vec<GroupStatus>,
    pub use_cases: Vec<UseCaseStatus>,
    pub unconfigured_sensors: usize,
}

/// Per-metric block on a detail card.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricStats {
    pub value: f64,
    pub status: Status,
    pub trend: TrendDirection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<WindowStats>,
}

/// Variant-specific analytics for one sensor's detail view.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SensorStats {
    #[serde(rename_all = "camelCase")]
    Climate {
        temperature: MetricStats,
        humidity: MetricStats,
        co2: MetricStats,
        mold_risk: bool,
    },
    #[serde(rename_all = "camelCase")]
    FillLevel {
        current_level: f64,
        display_level: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        window: Option<WindowStats>,
        trend_percent: f64,
        consumption_rate: f64,
        time_until_critical: String,
    },
    #[serde(rename_all = "camelCase")]
    Door { is_open: bool, stats: DoorStats },
    #[serde(rename_all = "camelCase")]
    Energy {
        power_watts: f64,
        power_kw: f64,
        voltage: MetricStats,
        current: MetricStats,
        consumption: EnergyConsumption,
    },
    /// Sensor could not be resolved; the card renders as unknown without
    /// blocking the rest of the dashboard.
    #[serde(rename_all = "camelCase")]
    Unknown { reason: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorDetail {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub status: Status,
    pub color: &'static str,
    pub hours: i64,
    #[serde(flatten)]
    pub stats: SensorStats,
}

#[derive(Clone)]
pub struct DashboardService {
    repository: Arc<dyn StoreRepository>,
}

impl DashboardService {
    pub fn new(repository: Arc<dyn StoreRepository>) -> Self {
        Self { repository }
    }

    async fn document(&self) -> anyhow::Result<StoreDocument> {
        let value = self.repository.load().await?;
        Ok(StoreDocument::from_value(value))
    }

    pub async fn dashboard(&self) -> anyhow::Result<DashboardSummary> {
        let document = self.document().await?;
        Ok(build_summary(&document))
    }

    /// Detail analytics for one sensor, `None` when the id is unknown.
    pub async fn sensor_stats(
        &self,
        sensor_id: i64,
        hours: i64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<SensorDetail>> {
        let document = self.document().await?;
        Ok(document
            .sensor(sensor_id)
            .map(|sensor| build_sensor_detail(sensor, hours, now)))
    }
}

pub fn build_summary(document: &StoreDocument) -> DashboardSummary {
    let group = |id: i64, name: &str, sensors: Vec<&Sensor>| {
        let status = rollup(sensors.iter().copied());
        GroupStatus {
            id,
            name: name.to_string(),
            status,
            color: status.color(),
            sensor_count: sensors.len(),
        }
    };

    // cards render worst first; the sort is stable so equal-status
    // groups keep their document order
    let worst_first = |mut groups: Vec<GroupStatus>| {
        groups.sort_by_key(|g| std::cmp::Reverse(g.status.weight()));
        groups
    };

    DashboardSummary {
        overall: rollup(&document.sensors),
        rooms: worst_first(
            document
                .rooms
                .iter()
                .map(|room| group(room.id, &room.name, sensors_in_room(document, room.id)))
                .collect(),
        ),
        categories: worst_first(
            document
                .categories
                .iter()
                .map(|c| group(c.id, &c.name, sensors_in_category(document, c.id)))
                .collect(),
        ),
        assets: worst_first(
            document
                .assets
                .iter()
                .map(|a| group(a.id, &a.name, sensors_of_asset(document, a.id)))
                .collect(),
        ),
        use_cases: UseCase::ALL
            .iter()
            .map(|&use_case| {
                let sensors = sensors_for_use_case(document, use_case);
                let status = rollup(sensors.iter().copied());
                UseCaseStatus {
                    id: use_case.id(),
                    title: use_case.title(),
                    status,
                    color: status.color(),
                    sensor_count: sensors.len(),
                }
            })
            .collect(),
        unconfigured_sensors: unconfigured_count(document),
    }
}


pub fn build_sensor_detail(sensor: &Sensor, hours: i64, now: DateTime<Utc>) -> SensorDetail {
    let status = sensor_status(sensor);
    let stats = match SensorReading::resolve(sensor) {
        Ok(reading) => build_stats(sensor, &reading, hours, now),
        Err(error) => SensorStats::Unknown {
            reason: error.to_string(),
        },
    };
    SensorDetail {
        id: sensor.id,
        name: sensor.name.clone(),
        status,
        color: status.color(),
        hours,
        stats,
    }
}

fn build_stats(
    sensor: &Sensor,
    reading: &SensorReading,
    hours: i64,
    now: DateTime<Utc>,
) -> SensorStats {
    let metric = |value: f64, status: Status, key: &str, extract: fn(&Reading) -> Option<f64>| {
        let values: Vec<f64> = window_series(&sensor.history, hours, now, extract)
            .into_iter()
            .map(|(_, v)| v)
            .collect();
        MetricStats {
            value,
            status,
            trend: trend_direction(&sensor.history, key, extract),
            window: window_stats(&values),
        }
    };

    match reading {
        SensorReading::Climate {
            temperature,
            humidity,
            co2,
            moldy,
            params,
        } => SensorStats::Climate {
            temperature: metric(
                *temperature,
                deviation_status(*temperature, params.target_temperature, params.temp_tolerance),
                "temperature",
                |r| r.temperature,
            ),
            humidity: metric(
                *humidity,
                deviation_status(*humidity, params.target_humidity, params.humidity_tolerance),
                "humidity",
                |r| r.humidity,
            ),
            co2: metric(
                *co2,
                deviation_status(*co2, params.target_co2, params.co2_tolerance),
                "co2",
                |r| r.co2,
            ),
            mold_risk: *moldy,
        },
        SensorReading::FillLevel { distance, params } => {
            let levels: Vec<f64> = window_series(&sensor.history, hours, now, |r| r.distance)
                .into_iter()
                .map(|(_, d)| fill_level(d, params))
                .collect();
            let level = fill_level(*distance, params);
            let rate = consumption_rate(&levels);
            SensorStats::FillLevel {
                current_level: level,
                display_level: display_fill_level(*distance, params),
                window: window_stats(&levels),
                trend_percent: trend_percent(&levels),
                consumption_rate: rate,
                time_until_critical: TimeUntilCritical::project(
                    level,
                    rate,
                    params.critical_threshold,
                )
                .label(),
            }
        }
        SensorReading::Door { distance, params } => SensorStats::Door {
            is_open: params.is_open(*distance),
            stats: door_stats(&sensor.history, params, now),
        },
        SensorReading::Energy {
            voltage,
            current,
            params,
        } => {
            let watts = power_watts(*voltage, *current);
            SensorStats::Energy {
                power_watts: watts,
                power_kw: watts / 1000.0,
                voltage: metric(
                    *voltage,
                    deviation_status(*voltage, params.target_voltage, params.voltage_tolerance),
                    "voltage",
                    |r| r.voltage,
                ),
                current: metric(
                    *current,
                    deviation_status(*current, params.target_current, params.current_tolerance),
                    "current",
                    |r| r.current,
                ),
                consumption: energy_consumption(&sensor.history, now),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::store_repository::StoreError;
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct FixedRepository(serde_json::Value);

    #[async_trait]
    impl StoreRepository for FixedRepository {
        async fn load(&self) -> Result<serde_json::Value, StoreError> {
            Ok(self.0.clone())
        }

        async fn replace(&self, _document: serde_json::Value) -> Result<(), StoreError> {
            Ok(())
        }

        async fn patch_entity(
            &self,
            entity_type: &str,
            _entity_id: &str,
            _partial: serde_json::Value,
        ) -> Result<serde_json::Value, StoreError> {
            Err(StoreError::UnknownEntityType(entity_type.to_string()))
        }
    }

    fn service() -> DashboardService {
        DashboardService::new(Arc::new(FixedRepository(serde_json::json!({
            "rooms": [{"id": 1, "name": "Lager"}],
            "categories": [],
            "assets": [{"id": 10, "name": "Silo", "roomId": 1}],
            "sensors": [
                {
                    "id": 100, "name": "Silo-Füllstand", "type": "distance",
                    "matchedUseCase": 1, "assetId": 10,
                    "data": {"distance": 85.0},
                    "parameters": {"minDistance": 0, "maxDistance": 100},
                    "history": [
                        {"timestamp": "2026-03-02T09:00:00Z", "data": {"distance": 85.0}},
                        {"timestamp": "2026-03-02T08:00:00Z", "data": {"distance": 60.0}}
                    ]
                },
                {"id": 101, "type": "energy", "data": {"voltage": 230.0, "current": 10.0}}
            ]
        }))))
    }

    #[tokio::test]
    async fn test_summary_propagates_worst_status_up_the_hierarchy() {
        let summary = service().dashboard().await.unwrap();
        // sensor 100 is at level 15 -> Critical
        assert_eq!(summary.overall, Status::Critical);
        assert_eq!(summary.rooms[0].status, Status::Critical);
        assert_eq!(summary.assets[0].status, Status::Critical);
        assert_eq!(summary.rooms[0].color, "#EF4444");
        assert_eq!(summary.unconfigured_sensors, 1);
        let fill = summary.use_cases.iter().find(|u| u.id == 1).unwrap();
        assert_eq!(fill.status, Status::Critical);
        assert_eq!(fill.sensor_count, 1);
        let doors = summary.use_cases.iter().find(|u| u.id == 3).unwrap();
        assert_eq!(doors.status, Status::None);
    }

    #[tokio::test]
    async fn test_sensor_stats_for_fill_level() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        let detail = service()
            .sensor_stats(100, 24, now)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detail.status, Status::Critical);
        match detail.stats {
            SensorStats::FillLevel {
                current_level,
                window,
                ..
            } => {
                assert_eq!(current_level, 15.0);
                let window = window.unwrap();
                // levels 40 (08:00) and 15 (09:00)
                assert_eq!(window.min, 15.0);
                assert_eq!(window.max, 40.0);
            }
            other => panic!("expected fill-level stats, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sensor_stats_for_unconfigured_sensor_is_unknown() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        let detail = service()
            .sensor_stats(101, 24, now)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detail.status, Status::Unknown);
        assert!(matches!(detail.stats, SensorStats::Unknown { .. }));
    }

    #[tokio::test]
    async fn test_dashboard_survives_a_malformed_sensor() {
        let service = DashboardService::new(Arc::new(FixedRepository(serde_json::json!({
            "rooms": [{"id": 1, "name": "Lager"}],
            "sensors": [
                {
                    "id": 1, "type": "climate", "matchedUseCase": 2, "roomId": 1,
                    "data": {"temperature": 21.0, "humidity": 50.0, "co2": 800.0}
                },
                {"id": 2}
            ]
        }))));
        let summary = service.dashboard().await.unwrap();
        assert_eq!(summary.rooms[0].status, Status::Normal);
        // the bare sensor counts as unconfigured instead of erroring out
        assert_eq!(summary.unconfigured_sensors, 1);
    }

    #[tokio::test]
    async fn test_unknown_sensor_id_is_none() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        assert!(service().sensor_stats(999, 24, now).await.unwrap().is_none());
    }
}
