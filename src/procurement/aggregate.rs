//! Interval aggregation
//!
//! Folds a sequence of intervals into per-plant totals. Totals are plain
//! sums, so they do not depend on input order. Only the start and end
//! timestamps do: they are copied from the first and last interval.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::types::{PlantRecord, ProcurementInterval, MUST_RUN_LABEL};

/// Label of the totals-of-totals record
pub const GRAND_TOTAL_LABEL: &str = "Total";

/// Running sum of exchange predictions
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExchangeTotals {
    pub predicted_price: f64,
    pub predicted_qty: f64,
}

/// Totals for one plant across all intervals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlantTotals {
    pub plant_name: String,
    pub total_generated_energy: f64,
    pub total_net_cost: f64,
    pub total_variable_cost: f64,
    #[serde(rename = "type")]
    pub plant_type: String,
    pub count: u64,
}

impl PlantTotals {
    fn empty(plant_name: &str, plant_type: &str) -> Self {
        Self {
            plant_name: plant_name.to_string(),
            total_generated_energy: 0.0,
            total_net_cost: 0.0,
            total_variable_cost: 0.0,
            plant_type: plant_type.to_string(),
            count: 0,
        }
    }
}

/// Aggregation state for one export request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregationAccumulator {
    pub start_timestamp: Option<Value>,
    pub end_timestamp: Option<Value>,
    pub total_exchange: ExchangeTotals,
    pub plants: BTreeMap<String, PlantTotals>,
    #[serde(skip)]
    intervals: usize,
}

impl AggregationAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of intervals folded so far
    pub fn interval_count(&self) -> usize {
        self.intervals
    }

    /// Fold one interval into the running totals
    pub fn fold(&mut self, interval: &ProcurementInterval) {
        if self.intervals == 0 {
            self.start_timestamp = interval.timestamp().cloned();
        }
        self.end_timestamp = interval.timestamp().cloned();
        self.intervals += 1;

        for entry in interval.exchange().entries() {
            self.total_exchange.predicted_price += entry.predicted_price;
            self.total_exchange.predicted_qty += entry.predicted_qty;
        }

        for plant in interval.plants() {
            self.add_plant(&plant);
        }
    }

    /// Add one plant record to its totals entry
    pub fn add_plant(&mut self, plant: &PlantRecord) {
        let totals = self
            .plants
            .entry(plant.plant_name.clone())
            .or_insert_with(|| {
                PlantTotals::empty(
                    &plant.plant_name,
                    plant.plant_type.as_deref().unwrap_or(MUST_RUN_LABEL),
                )
            });

        totals.total_generated_energy += plant.generated_energy;
        totals.total_net_cost += plant.net_cost;
        totals.total_variable_cost += plant.variable_cost;
        totals.count += 1;
    }

    /// Sum of every plant's totals
    pub fn grand_total(&self) -> PlantTotals {
        self.plants.values().fold(
            PlantTotals::empty(GRAND_TOTAL_LABEL, ""),
            |mut acc, plant| {
                acc.total_generated_energy += plant.total_generated_energy;
                acc.total_net_cost += plant.total_net_cost;
                acc.total_variable_cost += plant.total_variable_cost;
                acc.count += plant.count;
                acc
            },
        )
    }
}

/// Aggregate intervals in input order.
///
/// An empty slice yields no timestamps, no plants and zero exchange totals.
pub fn aggregate(intervals: &[ProcurementInterval]) -> AggregationAccumulator {
    let mut acc = AggregationAccumulator::new();
    for interval in intervals {
        acc.fold(interval);
    }

    tracing::debug!(
        intervals = acc.interval_count(),
        plants = acc.plants.len(),
        "Aggregated procurement intervals"
    );

    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn intervals() -> Vec<ProcurementInterval> {
        serde_json::from_value(json!([
            {
                "TimeStamp": "2024-01-01 00:00",
                "IEX_Data": {"Pred_Price": 4.0, "Qty_Pred": "10"},
                "Must_Run": [
                    {"plant_name": "Nuclear", "generated_energy": 100, "net_cost": 250, "Variable_Cost": 2.5, "type": "Nuclear"},
                    {"plant_name": "Solar", "generated_energy": "30", "net_cost": "0"}
                ],
                "Remaining_Plants": [
                    {"name": "Gas", "generation": 40, "cost": 120}
                ]
            },
            {
                "TimeStamp": "2024-01-01 00:15",
                "IEX_Data": [{"Pred_Price": 5.0, "Qty_Pred": 12}, {"Pred_Price": 1.0}],
                "Must_Run": [
                    {"plant_name": "Nuclear", "generated_energy": 110, "net_cost": 260, "Variable_Cost": 2.5}
                ],
                "Remaining_Plants": [
                    {"name": "Gas", "generation": 20, "cost": 60, "type": "Gas"}
                ]
            },
            {
                "TimeStamp": "2024-01-01 00:30"
            }
        ]))
        .unwrap()
    }

    #[test]
    fn test_empty_input() {
        let acc = aggregate(&[]);
        assert!(acc.start_timestamp.is_none());
        assert!(acc.end_timestamp.is_none());
        assert!(acc.plants.is_empty());
        assert_eq!(acc.total_exchange, ExchangeTotals::default());
        assert_eq!(acc.interval_count(), 0);
    }

    #[test]
    fn test_totals_per_plant() {
        let acc = aggregate(&intervals());

        assert_eq!(acc.start_timestamp, Some(json!("2024-01-01 00:00")));
        assert_eq!(acc.end_timestamp, Some(json!("2024-01-01 00:30")));
        assert_eq!(acc.plants.len(), 3);

        let nuclear = &acc.plants["Nuclear"];
        assert_eq!(nuclear.total_generated_energy, 210.0);
        assert_eq!(nuclear.total_net_cost, 510.0);
        assert_eq!(nuclear.total_variable_cost, 5.0);
        assert_eq!(nuclear.count, 2);
        assert_eq!(nuclear.plant_type, "Nuclear");

        let gas = &acc.plants["Gas"];
        assert_eq!(gas.total_generated_energy, 60.0);
        assert_eq!(gas.total_net_cost, 180.0);
        assert_eq!(gas.count, 2);
        // Type comes from the first record seen, which had none
        assert_eq!(gas.plant_type, MUST_RUN_LABEL);

        assert_eq!(acc.plants["Solar"].total_generated_energy, 30.0);
    }

    #[test]
    fn test_exchange_totals() {
        let acc = aggregate(&intervals());
        assert_eq!(acc.total_exchange.predicted_price, 10.0);
        assert_eq!(acc.total_exchange.predicted_qty, 22.0);
    }

    #[test]
    fn test_order_only_affects_timestamps() {
        let forward = intervals();
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = aggregate(&forward);
        let b = aggregate(&reversed);

        assert_eq!(a.plants.len(), b.plants.len());
        for (name, totals) in &a.plants {
            let other = &b.plants[name];
            assert_eq!(totals.total_generated_energy, other.total_generated_energy);
            assert_eq!(totals.total_net_cost, other.total_net_cost);
            assert_eq!(totals.total_variable_cost, other.total_variable_cost);
            assert_eq!(totals.count, other.count);
        }
        assert_eq!(a.total_exchange, b.total_exchange);

        assert_eq!(b.start_timestamp, Some(json!("2024-01-01 00:30")));
        assert_eq!(b.end_timestamp, Some(json!("2024-01-01 00:00")));
    }

    #[test]
    fn test_every_record_counted_once() {
        let data = intervals();
        let records: usize = data.iter().map(|iv| iv.plants().len()).sum();

        let acc = aggregate(&data);
        let counted: u64 = acc.plants.values().map(|p| p.count).sum();

        assert_eq!(counted as usize, records);
    }

    #[test]
    fn test_grand_total() {
        let acc = aggregate(&intervals());
        let total = acc.grand_total();

        assert_eq!(total.plant_name, GRAND_TOTAL_LABEL);
        assert_eq!(total.total_generated_energy, 300.0);
        assert_eq!(total.total_net_cost, 690.0);
        assert_eq!(total.count, 5);
    }

    #[test]
    fn test_missing_timestamp_on_first_interval() {
        let data: Vec<ProcurementInterval> =
            serde_json::from_value(json!([{"Demand(Actual)": 1}, {"TimeStamp": "t2"}])).unwrap();

        let acc = aggregate(&data);

        assert!(acc.start_timestamp.is_none());
        assert_eq!(acc.end_timestamp, Some(json!("t2")));
    }
}
