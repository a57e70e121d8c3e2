//! Procurement data
//!
//! Typed access to the interval records returned by the dashboard and
//! bulk-add endpoints, and the per-plant aggregation built on them.

mod aggregate;
mod types;

pub use aggregate::{
    aggregate, AggregationAccumulator, ExchangeTotals, PlantTotals, GRAND_TOTAL_LABEL,
};
pub use types::{
    normalize_remaining, Exchange, ExchangeInfo, PlantRecord, ProcurementInterval, MUST_RUN_LABEL,
};

pub(crate) use types::lookup;
