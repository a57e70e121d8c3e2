//! Export profiles
//!
//! A profile fixes the consolidated column set and how nested plant and
//! exchange data is summarized. `compact` and `detailed` cover the two
//! dashboard download variants.

use serde::Deserialize;

/// Which plant list a column reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlantGroup {
    MustRun,
    Remaining,
}

/// Where a consolidated column takes its value from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSource {
    /// Interval scalar, first present key wins
    Field(&'static [&'static str]),
    /// The group's plant objects, verbatim
    PlantDetails(PlantGroup),
    /// One-line summary of the group's plants
    PlantGist(PlantGroup),
    /// Summary of `IEX_Data`
    ExchangeGist,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub header: &'static str,
    pub source: ColumnSource,
}

impl Column {
    pub const fn new(header: &'static str, source: ColumnSource) -> Self {
        Self { header, source }
    }

    const fn field(header: &'static str, keys: &'static [&'static str]) -> Self {
        Self::new(header, ColumnSource::Field(keys))
    }
}

/// How a plant is rendered inside a gist string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GistFormat {
    /// `name: 120 kWh`
    #[default]
    Compact,
    /// `code | name | 500 kW | 120 kWh | 300`
    Detailed,
}

/// How the CSV header is derived from the rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderMode {
    /// Keys of the first row, in order. Keys only present in later rows
    /// are not exported.
    #[default]
    FirstRow,
    /// First-row keys followed by keys first seen in later rows
    Union,
}

const TIMESTAMP: Column = Column::field("TimeStamp", &["TimeStamp", "timestamp"]);
const DEMAND_ACTUAL: Column = Column::field("Demand(Actual)", &["Demand(Actual)"]);
const DEMAND_PRED: Column = Column::field("Demand(Pred)", &["Demand(Pred)"]);
const BANKING_UNIT: Column = Column::field("Banking_Unit", &["Banking_Unit"]);
const DEMAND_BANKED: Column = Column::field("Demand_Banked", &["Demand_Banked"]);
const IEX_GEN: Column = Column::field("IEX_Gen", &["IEX_Gen"]);
const IEX_COST: Column = Column::field("IEX_Cost", &["IEX_Cost"]);
const BACKDOWN_COST: Column = Column::field("Backdown_Cost", &["Backdown_Cost"]);
const COST_PER_BLOCK: Column = Column::field("Cost_Per_Block", &["Cost_Per_Block"]);
const LAST_PRICE: Column = Column::field("Last_Price", &["Last_Price"]);

const MUST_RUN_DETAILS: Column =
    Column::new("Must_Run", ColumnSource::PlantDetails(PlantGroup::MustRun));
const MUST_RUN_GIST: Column =
    Column::new("Must_Run_Gist", ColumnSource::PlantGist(PlantGroup::MustRun));
const REMAINING_DETAILS: Column = Column::new(
    "Remaining_Plants",
    ColumnSource::PlantDetails(PlantGroup::Remaining),
);
const REMAINING_GIST: Column = Column::new(
    "Remaining_Plants_Gist",
    ColumnSource::PlantGist(PlantGroup::Remaining),
);
const EXCHANGE_GIST: Column = Column::new("IEX_Gist", ColumnSource::ExchangeGist);

/// Column set and formatting for consolidated exports
#[derive(Debug, Clone, PartialEq)]
pub struct ExportProfile {
    pub columns: Vec<Column>,
    pub gist: GistFormat,
    pub list_separator: String,
    pub header_mode: HeaderMode,
}

impl Default for ExportProfile {
    fn default() -> Self {
        Self::compact()
    }
}

impl ExportProfile {
    /// Demand, banking and exchange totals with short plant gists
    pub fn compact() -> Self {
        Self {
            columns: vec![
                TIMESTAMP,
                DEMAND_ACTUAL,
                DEMAND_PRED,
                BANKING_UNIT,
                DEMAND_BANKED,
                IEX_GEN,
                IEX_COST,
                BACKDOWN_COST,
                MUST_RUN_DETAILS,
                MUST_RUN_GIST,
                REMAINING_DETAILS,
                REMAINING_GIST,
                EXCHANGE_GIST,
            ],
            gist: GistFormat::Compact,
            list_separator: "; ".to_string(),
            header_mode: HeaderMode::FirstRow,
        }
    }

    /// Compact columns plus block pricing, with pipe-delimited plant gists
    pub fn detailed() -> Self {
        let mut profile = Self::compact();
        let insert_at = profile
            .columns
            .iter()
            .position(|c| c == &BACKDOWN_COST)
            .map(|i| i + 1)
            .unwrap_or(profile.columns.len());
        for (offset, column) in [COST_PER_BLOCK, LAST_PRICE].into_iter().enumerate() {
            profile.columns.insert(insert_at + offset, column);
        }
        profile.gist = GistFormat::Detailed;
        profile
    }

    /// Look up a preset by name ("compact" or "detailed")
    pub fn named(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "compact" => Some(Self::compact()),
            "detailed" => Some(Self::detailed()),
            _ => None,
        }
    }

    /// Builder method: set the gist list separator
    pub fn list_separator(mut self, separator: impl Into<String>) -> Self {
        self.list_separator = separator.into();
        self
    }

    /// Builder method: set the header mode
    pub fn header_mode(mut self, mode: HeaderMode) -> Self {
        self.header_mode = mode;
        self
    }

    pub fn headers(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.header).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detailed_extends_compact() {
        let compact = ExportProfile::compact();
        let detailed = ExportProfile::detailed();

        assert_eq!(detailed.columns.len(), compact.columns.len() + 2);
        let headers = detailed.headers();
        let backdown = headers.iter().position(|h| *h == "Backdown_Cost").unwrap();
        assert_eq!(headers[backdown + 1], "Cost_Per_Block");
        assert_eq!(headers[backdown + 2], "Last_Price");
        assert_eq!(detailed.gist, GistFormat::Detailed);
    }

    #[test]
    fn test_named_presets() {
        assert_eq!(ExportProfile::named("Detailed"), Some(ExportProfile::detailed()));
        assert_eq!(ExportProfile::named("compact"), Some(ExportProfile::compact()));
        assert!(ExportProfile::named("wide").is_none());
    }
}
