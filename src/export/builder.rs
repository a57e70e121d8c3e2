//! Row building and CSV rendering

use serde_json::{Map, Value};

use super::document::ExportDocument;
use super::profile::{ColumnSource, ExportProfile, GistFormat, HeaderMode, PlantGroup};
use super::{ExportError, ExportResult, Row};
use crate::procurement::{
    lookup, AggregationAccumulator, Exchange, PlantRecord, PlantTotals, ProcurementInterval,
};

/// Builds export rows and CSV documents for one profile
#[derive(Debug, Clone, Default)]
pub struct ExportBuilder {
    profile: ExportProfile,
}

impl ExportBuilder {
    pub fn new(profile: ExportProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &ExportProfile {
        &self.profile
    }

    /// One flattened, readable row per interval
    pub fn build_consolidated_rows(&self, intervals: &[ProcurementInterval]) -> Vec<Row> {
        intervals
            .iter()
            .map(|interval| self.consolidated_row(interval))
            .collect()
    }

    fn consolidated_row(&self, interval: &ProcurementInterval) -> Row {
        let mut row = Map::new();

        for column in &self.profile.columns {
            let value = match &column.source {
                ColumnSource::Field(keys) => lookup(interval.fields(), keys)
                    .cloned()
                    .unwrap_or(Value::Null),
                ColumnSource::PlantDetails(group) => Value::Array(match group {
                    PlantGroup::MustRun => interval.must_run_raw().to_vec(),
                    PlantGroup::Remaining => interval.remaining_plants_raw().to_vec(),
                }),
                ColumnSource::PlantGist(group) => {
                    let plants = match group {
                        PlantGroup::MustRun => interval.must_run(),
                        PlantGroup::Remaining => interval.remaining_plants(),
                    };
                    Value::String(self.plant_gist(&plants))
                }
                ColumnSource::ExchangeGist => Value::String(self.exchange_gist(&interval.exchange())),
            };
            row.insert(column.header.to_string(), value);
        }

        row
    }

    fn plant_gist(&self, plants: &[PlantRecord]) -> String {
        plants
            .iter()
            .map(|plant| match self.profile.gist {
                GistFormat::Compact => {
                    format!("{}: {} kWh", plant.plant_name, plant.generated_energy)
                }
                GistFormat::Detailed => format!(
                    "{} | {} | {} kW | {} kWh | {}",
                    plant.plant_code.as_deref().unwrap_or("-"),
                    plant.plant_name,
                    plant.rated_capacity,
                    plant.generated_energy,
                    plant.net_cost
                ),
            })
            .collect::<Vec<_>>()
            .join(&self.profile.list_separator)
    }

    fn exchange_gist(&self, exchange: &Exchange) -> String {
        match exchange {
            Exchange::None => String::new(),
            Exchange::Single(info) => info
                .fields
                .iter()
                .map(|(key, value)| format!("{}: {}", key, cell_text(Some(value))))
                .collect::<Vec<_>>()
                .join(", "),
            Exchange::Many(entries) => entries
                .iter()
                .map(|info| format!("{} kWh @ {}", info.predicted_qty, info.predicted_price))
                .collect::<Vec<_>>()
                .join(&self.profile.list_separator),
        }
    }

    /// Lossless export: the intervals exactly as received
    pub fn build_raw_rows(&self, intervals: Vec<ProcurementInterval>) -> Vec<Row> {
        intervals
            .into_iter()
            .map(ProcurementInterval::into_fields)
            .collect()
    }

    /// One row per plant total, followed by the totals-of-totals row
    pub fn build_summary_rows(&self, acc: &AggregationAccumulator) -> Vec<Row> {
        let from = acc.start_timestamp.clone().unwrap_or(Value::Null);
        let to = acc.end_timestamp.clone().unwrap_or(Value::Null);

        acc.plants
            .values()
            .cloned()
            .chain(std::iter::once(acc.grand_total()))
            .map(|totals| summary_row(&from, &to, &totals))
            .collect()
    }

    /// Column names for `rows`
    pub fn header(&self, rows: &[Row]) -> ExportResult<Vec<String>> {
        let first = rows.first().ok_or(ExportError::EmptyRowSet)?;
        let mut header: Vec<String> = first.keys().cloned().collect();

        if self.profile.header_mode == HeaderMode::Union {
            for row in &rows[1..] {
                for key in row.keys() {
                    if !header.contains(key) {
                        header.push(key.clone());
                    }
                }
            }
        }

        Ok(header)
    }

    /// Render rows as CSV. Returns `None` when there is nothing to export.
    pub fn to_csv(&self, rows: &[Row]) -> ExportResult<Option<ExportDocument>> {
        if rows.is_empty() {
            return Ok(None);
        }

        let header = self.header(rows)?;

        let mut header_writer = csv_writer(csv::QuoteStyle::Necessary);
        header_writer.write_record(&header)?;

        let mut body_writer = csv_writer(csv::QuoteStyle::Always);
        for row in rows {
            body_writer.write_record(header.iter().map(|key| cell_text(row.get(key))))?;
        }

        let mut bytes = finish(header_writer)?;
        bytes.extend(finish(body_writer)?);
        let content =
            String::from_utf8(bytes).map_err(|e| ExportError::Serialization(e.to_string()))?;

        tracing::debug!(rows = rows.len(), columns = header.len(), "Rendered CSV export");

        Ok(Some(ExportDocument::new(content)))
    }
}

fn summary_row(from: &Value, to: &Value, totals: &PlantTotals) -> Row {
    let mut row = Map::new();
    row.insert("From".to_string(), from.clone());
    row.insert("To".to_string(), to.clone());
    row.insert("Plant".to_string(), Value::from(totals.plant_name.clone()));
    row.insert("Type".to_string(), Value::from(totals.plant_type.clone()));
    row.insert(
        "Generated_Energy".to_string(),
        Value::from(totals.total_generated_energy),
    );
    row.insert("Net_Cost".to_string(), Value::from(totals.total_net_cost));
    row.insert(
        "Variable_Cost".to_string(),
        Value::from(totals.total_variable_cost),
    );
    row.insert("Intervals".to_string(), Value::from(totals.count));
    row
}

/// Text of one CSV cell: strings verbatim, nested values as JSON,
/// null or missing as empty
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(nested) => serde_json::to_string(nested).unwrap_or_default(),
    }
}

fn csv_writer(style: csv::QuoteStyle) -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .quote_style(style)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> ExportResult<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))
}
