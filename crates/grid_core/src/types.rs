//! Type definitions for `grid_core`.
//!
//! The persisted document is `year -> district -> DistrictRecord`. Every
//! stage writes into the same record, so all modelled attributes are optional
//! and unknown attributes are carried through untouched.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::ser::{Error as _, SerializeMap};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::ConfigError;

/// Reserved key holding metadata rather than a district.
pub const TIMESTAMP_KEY: &str = "timestamp";

/// Year used when a caller gives none and the store knows no years.
pub const DEFAULT_YEAR: &str = "2025";

// ---------------------------------------------------------------------------
// Core enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityClass {
    Urban,
    Suburban,
    Rural,
}

impl DensityClass {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Urban => "urban",
            Self::Suburban => "suburban",
            Self::Rural => "rural",
        }
    }
}

impl fmt::Display for DensityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive `[min, max]` bounds for one emission component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EmissionRange {
    pub min: f64,
    pub max: f64,
}

impl EmissionRange {
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Per-component ranges a density class draws its baseline emissions from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EmissionProfile {
    pub transport: EmissionRange,
    pub industrial: EmissionRange,
    pub residential: EmissionRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindDirection {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl WindDirection {
    pub const ALL: [WindDirection; 8] = [
        Self::N,
        Self::NE,
        Self::E,
        Self::SE,
        Self::S,
        Self::SW,
        Self::W,
        Self::NW,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::N => "N",
            Self::NE => "NE",
            Self::E => "E",
            Self::SE => "SE",
            Self::S => "S",
            Self::SW => "SW",
            Self::W => "W",
            Self::NW => "NW",
        }
    }
}

impl fmt::Display for WindDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WindDirection {
    type Err = ConfigError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let upper = token.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|dir| dir.as_str() == upper)
            .ok_or_else(|| ConfigError::UnknownWindDirection(token.to_string()))
    }
}

// ---------------------------------------------------------------------------
// District record
// ---------------------------------------------------------------------------

/// Accumulated attributes of one district in one year.
///
/// `None` means "not yet computed by the owning stage". Records only grow:
/// [`DistrictRecord::merge`] overwrites the fields present in the update and
/// leaves every other field as it was.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistrictRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_emission: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industrial_emission: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residential_emission: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_emission: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub co2_concentration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub co2_concentration_after_dispersion: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub co2_before_capture: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub co2_after_capture: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_capture: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_reduction: Option<f64>,
    /// Intervention name -> configured strength or on/off flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interventions: Option<Map<String, Value>>,

    /// Attributes written by other tools (raw temperature, AQI, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn overlay<T>(slot: &mut Option<T>, update: Option<T>) {
    if update.is_some() {
        *slot = update;
    }
}

impl DistrictRecord {
    pub fn has_emissions(&self) -> bool {
        self.total_emission.is_some()
    }

    /// Merge freshly computed fields into this record.
    pub fn merge(&mut self, update: DistrictRecord) {
        overlay(&mut self.transport_emission, update.transport_emission);
        overlay(&mut self.industrial_emission, update.industrial_emission);
        overlay(&mut self.residential_emission, update.residential_emission);
        overlay(&mut self.total_emission, update.total_emission);
        overlay(&mut self.co2_concentration, update.co2_concentration);
        overlay(
            &mut self.co2_concentration_after_dispersion,
            update.co2_concentration_after_dispersion,
        );
        overlay(&mut self.co2_before_capture, update.co2_before_capture);
        overlay(&mut self.co2_after_capture, update.co2_after_capture);
        overlay(&mut self.total_capture, update.total_capture);
        overlay(&mut self.percent_reduction, update.percent_reduction);
        overlay(&mut self.interventions, update.interventions);
        self.extra.extend(update.extra);
    }
}

// ---------------------------------------------------------------------------
// Year table
// ---------------------------------------------------------------------------

/// All districts recorded for one year, in document order.
///
/// Key order as read (districts, `timestamp`, and each record's attributes)
/// is remembered and reproduced on save. Entries added since load follow.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct YearTable {
    districts: IndexMap<String, DistrictRecord>,
    timestamp: Option<Value>,
    key_order: Vec<String>,
    attribute_order: HashMap<String, Vec<String>>,
}

impl YearTable {
    pub fn get(&self, district: &str) -> Option<&DistrictRecord> {
        self.districts.get(district)
    }

    pub fn get_mut(&mut self, district: &str) -> Option<&mut DistrictRecord> {
        self.districts.get_mut(district)
    }

    /// Record for `district`, created empty on first touch.
    pub fn entry(&mut self, district: &str) -> &mut DistrictRecord {
        self.districts.entry(district.to_string()).or_default()
    }

    pub fn contains(&self, district: &str) -> bool {
        self.districts.contains_key(district)
    }

    /// Districts in insertion order. The `timestamp` key is never yielded.
    pub fn districts(&self) -> impl Iterator<Item = (&str, &DistrictRecord)> {
        self.districts.iter().map(|(name, record)| (name.as_str(), record))
    }

    pub fn districts_mut(&mut self) -> impl Iterator<Item = (&str, &mut DistrictRecord)> {
        self.districts
            .iter_mut()
            .map(|(name, record)| (name.as_str(), record))
    }

    pub fn len(&self) -> usize {
        self.districts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.districts.is_empty()
    }

    pub fn timestamp(&self) -> Option<&Value> {
        self.timestamp.as_ref()
    }
}

impl TryFrom<Map<String, Value>> for YearTable {
    type Error = serde_json::Error;

    fn try_from(entries: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut table = YearTable::default();
        for (key, value) in entries {
            table.key_order.push(key.clone());
            if key == TIMESTAMP_KEY {
                table.timestamp = Some(value);
                continue;
            }
            if let Value::Object(fields) = &value {
                table
                    .attribute_order
                    .insert(key.clone(), fields.keys().cloned().collect());
            }
            let record: DistrictRecord = serde_json::from_value(value).map_err(|err| {
                <serde_json::Error as serde::de::Error>::custom(format!("district '{key}': {err}"))
            })?;
            table.districts.insert(key, record);
        }
        Ok(table)
    }
}

/// `fields` with the keys named in `order` first, in that order, then the rest.
fn reorder(fields: Map<String, Value>, order: &[String]) -> Map<String, Value> {
    let mut out = Map::new();
    for key in order {
        if let Some(value) = fields.get(key) {
            out.insert(key.clone(), value.clone());
        }
    }
    for (key, value) in fields {
        if !out.contains_key(&key) {
            out.insert(key, value);
        }
    }
    out
}

impl YearTable {
    fn serialize_record<M: SerializeMap>(
        &self,
        map: &mut M,
        name: &str,
        record: &DistrictRecord,
    ) -> Result<(), M::Error> {
        match self.attribute_order.get(name) {
            Some(order) => {
                let fields = match serde_json::to_value(record).map_err(M::Error::custom)? {
                    Value::Object(fields) => fields,
                    _ => Map::new(),
                };
                map.serialize_entry(name, &reorder(fields, order))
            }
            None => map.serialize_entry(name, record),
        }
    }
}

impl Serialize for YearTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.districts.len() + usize::from(self.timestamp.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        let mut written = HashSet::new();
        for key in &self.key_order {
            if key == TIMESTAMP_KEY {
                if let Some(timestamp) = &self.timestamp {
                    map.serialize_entry(TIMESTAMP_KEY, timestamp)?;
                    written.insert(key.as_str());
                }
            } else if let Some(record) = self.districts.get(key) {
                self.serialize_record(&mut map, key, record)?;
                written.insert(key.as_str());
            }
        }
        for (name, record) in &self.districts {
            if !written.contains(name.as_str()) {
                self.serialize_record(&mut map, name, record)?;
            }
        }
        if let Some(timestamp) = &self.timestamp {
            if !written.contains(TIMESTAMP_KEY) {
                map.serialize_entry(TIMESTAMP_KEY, timestamp)?;
            }
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// State document
// ---------------------------------------------------------------------------

/// The whole persisted document: `year -> YearTable`.
///
/// Top-level entries that are not objects (or are named `timestamp`) are
/// metadata; they are kept and written back but never treated as years.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct StateDocument {
    years: IndexMap<String, YearTable>,
    metadata: Map<String, Value>,
    key_order: Vec<String>,
}

impl StateDocument {
    pub fn year(&self, year: &str) -> Option<&YearTable> {
        self.years.get(year)
    }

    pub fn year_mut(&mut self, year: &str) -> Option<&mut YearTable> {
        self.years.get_mut(year)
    }

    /// Year table for `year`, created empty on first touch.
    pub fn year_entry(&mut self, year: &str) -> &mut YearTable {
        self.years.entry(year.to_string()).or_default()
    }

    pub fn district(&self, year: &str, district: &str) -> Option<&DistrictRecord> {
        self.year(year).and_then(|table| table.get(district))
    }

    /// Merge `update` into the record at `year`/`district`, creating it if needed.
    pub fn merge_record(&mut self, year: &str, district: &str, update: DistrictRecord) {
        self.year_entry(year).entry(district).merge(update);
    }

    pub fn years(&self) -> impl Iterator<Item = &str> {
        self.years.keys().map(String::as_str)
    }

    /// Largest numeric year key, if any.
    pub fn latest_year(&self) -> Option<&str> {
        self.years
            .keys()
            .filter_map(|key| key.parse::<u32>().ok().map(|n| (n, key.as_str())))
            .max_by_key(|(n, _)| *n)
            .map(|(_, key)| key)
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty() && self.metadata.is_empty()
    }
}

impl TryFrom<Map<String, Value>> for StateDocument {
    type Error = serde_json::Error;

    fn try_from(entries: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut document = StateDocument::default();
        for (key, value) in entries {
            document.key_order.push(key.clone());
            match value {
                Value::Object(table) if key != TIMESTAMP_KEY => {
                    let table = YearTable::try_from(table).map_err(|err| {
                        <serde_json::Error as serde::de::Error>::custom(format!(
                            "year '{key}': {err}"
                        ))
                    })?;
                    document.years.insert(key, table);
                }
                other => {
                    document.metadata.insert(key, other);
                }
            }
        }
        Ok(document)
    }
}

impl Serialize for StateDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.years.len() + self.metadata.len()))?;
        let mut written = HashSet::new();
        for key in &self.key_order {
            if let Some(table) = self.years.get(key) {
                map.serialize_entry(key, table)?;
            } else if let Some(value) = self.metadata.get(key) {
                map.serialize_entry(key, value)?;
            } else {
                continue;
            }
            written.insert(key.as_str());
        }
        for (year, table) in &self.years {
            if !written.contains(year.as_str()) {
                map.serialize_entry(year, table)?;
            }
        }
        for (key, value) in &self.metadata {
            if !written.contains(key.as_str()) {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}
