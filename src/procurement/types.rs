//! Procurement response types
//!
//! - `ProcurementInterval`: one timestamped response, kept as the raw JSON
//!   object so exports can pass it through untouched
//! - `PlantRecord`: a plant entry from `Must_Run` or `Remaining_Plants`
//! - `ExchangeInfo`: power exchange prediction from `IEX_Data`
//!
//! Numeric fields arrive as numbers or numeric strings depending on the
//! endpoint. Anything missing or unparseable reads as zero.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Plant type assumed when a record does not carry one
pub const MUST_RUN_LABEL: &str = "Must Run";

pub(crate) const TIMESTAMP_KEYS: &[&str] = &["TimeStamp", "timestamp"];
pub(crate) const MUST_RUN_KEYS: &[&str] = &["Must_Run", "mustRun"];
pub(crate) const REMAINING_KEYS: &[&str] = &["Remaining_Plants", "remainingPlants"];
pub(crate) const EXCHANGE_KEYS: &[&str] = &["IEX_Data", "exchangeInfo"];

/// First present value among `keys`
pub(crate) fn lookup<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| fields.get(*key))
}

/// Numeric reading of a JSON value, 0 when absent, not a number or not finite
pub(crate) fn number_of(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|v: &f64| v.is_finite()).unwrap_or(0.0)
}

/// Text reading of a JSON scalar
pub(crate) fn text_of(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    }
}

fn array_of<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> &'a [Value] {
    match lookup(fields, keys) {
        Some(Value::Array(items)) => items.as_slice(),
        _ => &[],
    }
}

/// One per-timestamp procurement response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcurementInterval(Map<String, Value>);

impl ProcurementInterval {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// All fields, in the order the server sent them
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Timestamp exactly as sent (`TimeStamp` or `timestamp`)
    pub fn timestamp(&self) -> Option<&Value> {
        lookup(&self.0, TIMESTAMP_KEYS)
    }

    /// Numeric value of the first present key
    pub fn number(&self, keys: &[&str]) -> f64 {
        number_of(lookup(&self.0, keys))
    }

    /// Must-run entries as sent
    pub fn must_run_raw(&self) -> &[Value] {
        array_of(&self.0, MUST_RUN_KEYS)
    }

    /// Remaining-plant entries as sent
    pub fn remaining_plants_raw(&self) -> &[Value] {
        array_of(&self.0, REMAINING_KEYS)
    }

    pub fn must_run(&self) -> Vec<PlantRecord> {
        self.must_run_raw()
            .iter()
            .filter_map(Value::as_object)
            .map(PlantRecord::from_fields)
            .collect()
    }

    /// Remaining plants, normalized to the must-run field names
    pub fn remaining_plants(&self) -> Vec<PlantRecord> {
        self.remaining_plants_raw()
            .iter()
            .filter_map(Value::as_object)
            .map(|fields| PlantRecord::from_fields(&normalize_remaining(fields)))
            .collect()
    }

    /// Both plant groups, must-run first
    pub fn plants(&self) -> Vec<PlantRecord> {
        let mut plants = self.must_run();
        plants.extend(self.remaining_plants());
        plants
    }

    pub fn exchange(&self) -> Exchange {
        match lookup(&self.0, EXCHANGE_KEYS) {
            Some(Value::Object(fields)) => Exchange::Single(ExchangeInfo::from_fields(fields)),
            Some(Value::Array(items)) => Exchange::Many(
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .map(ExchangeInfo::from_fields)
                    .collect(),
            ),
            _ => Exchange::None,
        }
    }
}

impl From<Map<String, Value>> for ProcurementInterval {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Rename remaining-plant keys to the must-run names.
///
/// Keys are only renamed when the target is absent. A missing `type`
/// becomes the must-run label even for this group; existing dashboards
/// rely on that labelling.
pub fn normalize_remaining(fields: &Map<String, Value>) -> Map<String, Value> {
    const RENAMES: [(&str, &str); 3] = [
        ("name", "plant_name"),
        ("generation", "generated_energy"),
        ("cost", "net_cost"),
    ];

    let mut normalized = fields.clone();
    for (from, to) in RENAMES {
        if normalized.contains_key(to) {
            continue;
        }
        if let Some(value) = normalized.remove(from) {
            normalized.insert(to.to_string(), value);
        }
    }

    if !normalized.contains_key("type") {
        normalized.insert("type".to_string(), Value::String(MUST_RUN_LABEL.to_string()));
    }

    normalized
}

/// A single plant's contribution within one interval
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlantRecord {
    pub plant_code: Option<String>,
    pub plant_name: String,
    pub rated_capacity: f64,
    pub generated_energy: f64,
    pub net_cost: f64,
    pub variable_cost: f64,
    #[serde(rename = "type")]
    pub plant_type: Option<String>,
}

impl PlantRecord {
    /// Read a record from must-run shaped fields
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        Self {
            plant_code: text_of(lookup(fields, &["plant_code", "Plant_Code", "code"])),
            plant_name: text_of(lookup(fields, &["plant_name", "Plant_Name"])).unwrap_or_default(),
            rated_capacity: number_of(lookup(
                fields,
                &["rated_capacity", "Rated_Capacity", "capacity"],
            )),
            generated_energy: number_of(lookup(fields, &["generated_energy", "Generated_Energy"])),
            net_cost: number_of(lookup(fields, &["net_cost", "Net_Cost"])),
            variable_cost: number_of(lookup(fields, &["variable_cost", "Variable_Cost"])),
            plant_type: text_of(lookup(fields, &["type", "Type"])),
        }
    }
}

/// Exchange prediction for one interval
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeInfo {
    pub predicted_price: f64,
    pub predicted_qty: f64,
    pub fields: Map<String, Value>,
}

impl ExchangeInfo {
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        Self {
            predicted_price: number_of(lookup(
                fields,
                &["Pred_Price", "predicted_price", "Predicted_Price"],
            )),
            predicted_qty: number_of(lookup(
                fields,
                &["Qty_Pred", "predicted_qty", "Predicted_Qty"],
            )),
            fields: fields.clone(),
        }
    }
}

/// Shape of the `IEX_Data` field
#[derive(Debug, Clone, PartialEq)]
pub enum Exchange {
    None,
    Single(ExchangeInfo),
    Many(Vec<ExchangeInfo>),
}

impl Exchange {
    pub fn entries(&self) -> &[ExchangeInfo] {
        match self {
            Exchange::None => &[],
            Exchange::Single(info) => std::slice::from_ref(info),
            Exchange::Many(items) => items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn interval(value: Value) -> ProcurementInterval {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_lenient_numbers() {
        assert_eq!(number_of(Some(&json!(12.5))), 12.5);
        assert_eq!(number_of(Some(&json!(" 40 "))), 40.0);
        assert_eq!(number_of(Some(&json!("n/a"))), 0.0);
        assert_eq!(number_of(Some(&Value::Null)), 0.0);
        assert_eq!(number_of(None), 0.0);
    }

    #[test]
    fn test_non_finite_strings_read_as_zero() {
        assert_eq!(number_of(Some(&json!("NaN"))), 0.0);
        assert_eq!(number_of(Some(&json!("inf"))), 0.0);
        assert_eq!(number_of(Some(&json!("-infinity"))), 0.0);
        assert_eq!(number_of(Some(&json!("1e400"))), 0.0);
    }

    #[test]
    fn test_interval_keeps_field_order() {
        let iv = interval(json!({"TimeStamp": "t1", "Demand(Actual)": "100", "Demand(Pred)": "90"}));
        let keys: Vec<&str> = iv.fields().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["TimeStamp", "Demand(Actual)", "Demand(Pred)"]);
        assert_eq!(iv.timestamp(), Some(&json!("t1")));
        assert_eq!(iv.number(&["Demand(Actual)"]), 100.0);
    }

    #[test]
    fn test_lowercase_timestamp() {
        let iv = interval(json!({"timestamp": 1700000000}));
        assert_eq!(iv.timestamp(), Some(&json!(1700000000)));
    }

    #[test]
    fn test_normalize_remaining() {
        let fields = json!({"name": "Hydro A", "generation": "50", "cost": 200, "Backdown": 3})
            .as_object()
            .cloned()
            .unwrap();

        let normalized = normalize_remaining(&fields);

        assert_eq!(normalized["plant_name"], json!("Hydro A"));
        assert_eq!(normalized["generated_energy"], json!("50"));
        assert_eq!(normalized["net_cost"], json!(200));
        assert_eq!(normalized["type"], json!(MUST_RUN_LABEL));
        assert_eq!(normalized["Backdown"], json!(3));
        assert!(!normalized.contains_key("name"));
    }

    #[test]
    fn test_normalize_keeps_existing_target_keys() {
        let fields = json!({"name": "alias", "plant_name": "Real", "type": "Other"})
            .as_object()
            .cloned()
            .unwrap();

        let normalized = normalize_remaining(&fields);

        assert_eq!(normalized["plant_name"], json!("Real"));
        assert_eq!(normalized["name"], json!("alias"));
        assert_eq!(normalized["type"], json!("Other"));
    }

    #[test]
    fn test_plant_groups() {
        let iv = interval(json!({
            "TimeStamp": "t1",
            "Must_Run": [
                {"plant_code": "MR1", "plant_name": "Nuclear", "Rated_Capacity": 500,
                 "PAF": 0.9, "Variable_Cost": "2.5", "generated_energy": 120, "net_cost": 300}
            ],
            "Remaining_Plants": [
                {"code": "RP1", "name": "Gas", "generation": 40, "cost": "88.5"},
                "not a record"
            ]
        }));

        let plants = iv.plants();
        assert_eq!(plants.len(), 2);

        assert_eq!(plants[0].plant_code.as_deref(), Some("MR1"));
        assert_eq!(plants[0].rated_capacity, 500.0);
        assert_eq!(plants[0].variable_cost, 2.5);
        assert!(plants[0].plant_type.is_none());

        assert_eq!(plants[1].plant_name, "Gas");
        assert_eq!(plants[1].generated_energy, 40.0);
        assert_eq!(plants[1].net_cost, 88.5);
        assert_eq!(plants[1].plant_type.as_deref(), Some(MUST_RUN_LABEL));
    }

    #[test]
    fn test_exchange_shapes() {
        let single = interval(json!({"IEX_Data": {"Pred_Price": "4.2", "Qty_Pred": 10}}));
        assert!(matches!(single.exchange(), Exchange::Single(_)));
        assert_eq!(single.exchange().entries()[0].predicted_price, 4.2);

        let many = interval(json!({"IEX_Data": [{"Qty_Pred": 1}, {"Qty_Pred": 2}]}));
        assert_eq!(many.exchange().entries().len(), 2);

        let none = interval(json!({"IEX_Data": null}));
        assert_eq!(none.exchange(), Exchange::None);
        assert!(none.exchange().entries().is_empty());
    }
}
