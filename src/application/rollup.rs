// Worst-status-wins grouping over the room/category/asset/use-case hierarchy
use crate::domain::document::StoreDocument;
use crate::domain::reading::sensor_status;
use crate::domain::sensor::{Sensor, UseCase};
use crate::domain::status::{overall_status, Status};

/// Reduces a list of sensors to one group status. Sensors without a
/// matched use case are configuration-incomplete and never contribute to
/// a rollup; a group that only contains such sensors therefore reads as
/// having none.
pub fn rollup<'a, I>(sensors: I) -> Status
where
    I: IntoIterator<Item = &'a Sensor>,
{
    overall_status(
        sensors
            .into_iter()
            .filter(|s| s.matched_use_case.is_some())
            .map(sensor_status),
    )
}

/// Sensors counted toward a room: assigned to it directly, or through an
/// asset that sits in the room.
pub fn sensors_in_room<'a>(document: &'a StoreDocument, room_id: i64) -> Vec<&'a Sensor> {
    document
        .sensors
        .iter()
        .filter(|sensor| {
            sensor.room_id == Some(room_id)
                || sensor
                    .asset_id
                    .and_then(|id| document.asset(id))
                    .is_some_and(|asset| asset.room_id == Some(room_id))
        })
        .collect()
}

pub fn sensors_in_category<'a>(document: &'a StoreDocument, category_id: i64) -> Vec<&'a Sensor> {
    document
        .sensors
        .iter()
        .filter(|sensor| {
            sensor
                .asset_id
                .and_then(|id| document.asset(id))
                .is_some_and(|asset| asset.category_id == Some(category_id))
        })
        .collect()
}

pub fn sensors_of_asset<'a>(document: &'a StoreDocument, asset_id: i64) -> Vec<&'a Sensor> {
    document
        .sensors
        .iter()
        .filter(|sensor| sensor.asset_id == Some(asset_id))
        .collect()
}

pub fn sensors_for_use_case<'a>(document: &'a StoreDocument, use_case: UseCase) -> Vec<&'a Sensor> {
    document
        .sensors
        .iter()
        .filter(|sensor| sensor.use_case() == Some(use_case))
        .collect()
}

/// Sensors that cannot be classified because no use case is matched.
/// Still enumerable in raw lists, but excluded from every rollup.
pub fn unconfigured_count(document: &StoreDocument) -> usize {
    document
        .sensors
        .iter()
        .filter(|sensor| sensor.matched_use_case.is_none())
        .count()
}
