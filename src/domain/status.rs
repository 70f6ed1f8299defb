// Status taxonomy shared by every view of the dashboard
use serde::{Deserialize, Serialize};

/// Classification result for a sensor or a group of sensors.
///
/// The variant order is the severity order used for worst-case
/// aggregation: `None < Unknown < Normal < Warning < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Group contained no sensors at all.
    None,
    /// Sensor could not be classified (missing data, missing parameters,
    /// unconfigured use case).
    Unknown,
    Normal,
    Warning,
    Critical,
}

impl Status {
    /// Legacy numeric weight of this status, kept stable for API clients.
    pub fn weight(self) -> i8 {
        match self {
            Status::Critical => 3,
            Status::Warning => 2,
            Status::Normal => 1,
            Status::Unknown => 0,
            Status::None => -1,
        }
    }

    /// Display color used by the dashboard cards.
    pub fn color(self) -> &'static str {
        match self {
            Status::Critical => "#EF4444",
            Status::Warning => "#F59E0B",
            Status::Normal => "#10B981",
            Status::Unknown | Status::None => "#666",
        }
    }
}

/// Worst-status-wins reduction over any number of statuses.
///
/// Commutative and order-independent; an empty input yields
/// [`Status::None`], which is distinct from [`Status::Unknown`].
pub fn overall_status<I>(statuses: I) -> Status
where
    I: IntoIterator<Item = Status>,
{
    statuses.into_iter().max().unwrap_or(Status::None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(Status::Critical > Status::Warning);
        assert!(Status::Warning > Status::Normal);
        assert!(Status::Normal > Status::Unknown);
        assert!(Status::Unknown > Status::None);
    }

    #[test]
    fn test_weights_match_severity_order() {
        let mut by_weight = vec![
            Status::Normal,
            Status::Critical,
            Status::None,
            Status::Warning,
            Status::Unknown,
        ];
        by_weight.sort_by_key(|s| s.weight());
        let mut by_ord = by_weight.clone();
        by_ord.sort();
        assert_eq!(by_weight, by_ord);
    }

    #[test]
    fn test_empty_rollup_is_none() {
        assert_eq!(overall_status([]), Status::None);
    }

    #[test]
    fn test_rollup_is_order_independent() {
        let statuses = [Status::Normal, Status::Critical, Status::Unknown];
        let reversed: Vec<_> = statuses.iter().rev().copied().collect();
        assert_eq!(overall_status(statuses), overall_status(reversed));
        assert_eq!(overall_status(statuses), Status::Critical);
    }

    #[test]
    fn test_all_unknown_rolls_up_to_unknown() {
        assert_eq!(
            overall_status([Status::Unknown, Status::Unknown]),
            Status::Unknown
        );
    }

    #[test]
    fn test_adding_critical_dominates() {
        let base = [Status::Normal, Status::Warning, Status::Unknown];
        let mut extended = base.to_vec();
        extended.push(Status::Critical);
        assert_eq!(overall_status(extended), Status::Critical);
    }

    #[test]
    fn test_serde_labels() {
        assert_eq!(serde_json::to_string(&Status::Critical).unwrap(), "\"critical\"");
        assert_eq!(serde_json::to_string(&Status::None).unwrap(), "\"none\"");
    }
}
