use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::numeric::parse_lenient;

/// Joins the non-empty identity components of an ingredient.
pub const ID_SEPARATOR: &str = "::";

const EXPIRY_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d.%m.%Y"];

/// Broad ingredient families. Thresholds and units are looked up per family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IngredientType {
    Malt,
    Hop,
    Yeast,
    Grain,
    Other,
}

impl IngredientType {
    /// Recognises a free-text type label, French or English, ignoring case.
    pub fn from_label(label: &str) -> Self {
        let t = label.trim().to_lowercase();
        if t.contains("malt") {
            IngredientType::Malt
        } else if t.contains("houblon") || t.contains("hop") {
            IngredientType::Hop
        } else if t.contains("levure") || t.contains("yeast") {
            IngredientType::Yeast
        } else if t.contains("grain") {
            IngredientType::Grain
        } else {
            IngredientType::Other
        }
    }
}

/// Ingredient type together with the spec field that type carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IngredientKind {
    /// Colour in EBC.
    Malt { ebc: Option<f64> },
    /// Alpha acids in percent.
    Hop { alpha_acid: Option<f64> },
    Yeast { expiry: Option<NaiveDate> },
    Grain { spec: String },
    /// Anything else keeps its original label and free-text spec.
    Other { label: String, spec: String },
}

impl IngredientKind {
    /// Builds the kind from a type label and the raw text of the spec column.
    pub fn from_label(label: &str, spec: &str) -> Self {
        let spec = spec.trim();
        match IngredientType::from_label(label) {
            IngredientType::Malt => IngredientKind::Malt { ebc: parse_lenient(spec) },
            IngredientType::Hop => IngredientKind::Hop { alpha_acid: parse_lenient(spec) },
            IngredientType::Yeast => IngredientKind::Yeast { expiry: parse_expiry(spec) },
            IngredientType::Grain => IngredientKind::Grain { spec: spec.to_string() },
            IngredientType::Other => IngredientKind::Other {
                label: label.trim().to_string(),
                spec: spec.to_string(),
            },
        }
    }

    pub fn ingredient_type(&self) -> IngredientType {
        match self {
            IngredientKind::Malt { .. } => IngredientType::Malt,
            IngredientKind::Hop { .. } => IngredientType::Hop,
            IngredientKind::Yeast { .. } => IngredientType::Yeast,
            IngredientKind::Grain { .. } => IngredientType::Grain,
            IngredientKind::Other { .. } => IngredientType::Other,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            IngredientKind::Malt { .. } => "Malt",
            IngredientKind::Hop { .. } => "Hop",
            IngredientKind::Yeast { .. } => "Yeast",
            IngredientKind::Grain { .. } => "Grain",
            IngredientKind::Other { label, .. } => label,
        }
    }

    /// Spec rendered back to the single text column used by tables and CSV.
    pub fn spec_text(&self) -> String {
        match self {
            IngredientKind::Malt { ebc: Some(v) } => format!("{} EBC", v),
            IngredientKind::Hop { alpha_acid: Some(v) } => format!("{} %AA", v),
            IngredientKind::Yeast { expiry: Some(d) } => d.format("%Y-%m-%d").to_string(),
            IngredientKind::Grain { spec } | IngredientKind::Other { spec, .. } => spec.clone(),
            _ => String::new(),
        }
    }
}

fn parse_expiry(raw: &str) -> Option<NaiveDate> {
    EXPIRY_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Composite identity of an ingredient lot: trimmed components, empties dropped.
pub fn ingredient_id(type_label: &str, name: &str, supplier: &str, lot_number: &str) -> String {
    [type_label, name, supplier, lot_number]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(ID_SEPARATOR)
}

/// One stocked raw material lot. Quantities are grams.
///
/// Quantities can only be changed by the ledger; imported rows may carry
/// `None` for a quantity that could not be read, which is not the same as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub(crate) id: String,
    /// Type as entered or imported, e.g. "Malt spécial".
    #[serde(default)]
    pub(crate) type_label: String,
    pub kind: IngredientKind,
    pub supplier: String,
    pub name: String,
    pub name_supplier: String,
    pub lot_number: String,
    pub packaging: String,
    pub notes: String,
    pub(crate) initial_qty: Option<f64>,
    pub(crate) used_qty: Option<f64>,
    pub(crate) remaining_qty: Option<f64>,
}

impl Ingredient {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Source type label, or the canonical one when none was recorded.
    pub fn type_label(&self) -> &str {
        if self.type_label.is_empty() {
            self.kind.label()
        } else {
            &self.type_label
        }
    }

    pub fn initial_qty(&self) -> Option<f64> {
        self.initial_qty
    }

    pub fn used_qty(&self) -> Option<f64> {
        self.used_qty
    }

    pub fn remaining_qty(&self) -> Option<f64> {
        self.remaining_qty
    }

    /// Remaining quantity with an unknown value counted as zero.
    pub fn remaining(&self) -> f64 {
        self.remaining_qty.unwrap_or(0.0)
    }

    /// Name shown in tables and recorded as movement target.
    pub fn display_label(&self) -> &str {
        [self.name_supplier.as_str(), self.name.as_str()]
            .into_iter()
            .find(|s| !s.trim().is_empty())
            .unwrap_or(self.id.as_str())
    }
}

/// Packaging unit counts keyed by group then size, e.g. `bottles` / `33cl`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerStock(BTreeMap<String, BTreeMap<String, i64>>);

impl ContainerStock {
    pub fn key(group: &str, size: &str) -> String {
        format!("{}.{}", group, size)
    }

    pub fn level(&self, group: &str, size: &str) -> Option<i64> {
        self.0.get(group).and_then(|sizes| sizes.get(size)).copied()
    }

    pub(crate) fn set(&mut self, group: &str, size: &str, level: i64) {
        self.0
            .entry(group.to_string())
            .or_default()
            .insert(size.to_string(), level);
    }

    /// Adds the format at 0 if absent. Returns whether it was new.
    pub(crate) fn register(&mut self, group: &str, size: &str) -> bool {
        let sizes = self.0.entry(group.to_string()).or_default();
        if sizes.contains_key(size) {
            return false;
        }
        sizes.insert(size.to_string(), 0);
        true
    }

    /// All formats as `(group, size, level)` in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, i64)> {
        self.0.iter().flat_map(|(group, sizes)| {
            sizes
                .iter()
                .map(move |(size, level)| (group.as_str(), size.as_str(), *level))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MovementKind {
    StockIn,
    StockOut,
    Adjustment,
    ContainerIn,
    ContainerOut,
    AdjustmentContainer,
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MovementKind::StockIn => "stock-in",
            MovementKind::StockOut => "stock-out",
            MovementKind::Adjustment => "adjustment",
            MovementKind::ContainerIn => "container-in",
            MovementKind::ContainerOut => "container-out",
            MovementKind::AdjustmentContainer => "adjustment-container",
        };
        f.pad(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Grams,
    Units,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Unit::Grams => "g",
            Unit::Units => "units",
        })
    }
}

/// Immutable ledger entry. The log is append-only, in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub date: NaiveDate,
    pub kind: MovementKind,
    pub target: String,
    pub quantity: f64,
    pub unit: Unit,
    pub reason: String,
    pub notes: String,
}

/// Low-stock thresholds in grams. `other` is the fallback bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientThresholds {
    pub malt: f64,
    pub hop: f64,
    pub yeast: f64,
    pub grain: f64,
    pub other: f64,
}

impl IngredientThresholds {
    pub fn for_type(&self, ty: IngredientType) -> f64 {
        match ty {
            IngredientType::Malt => self.malt,
            IngredientType::Hop => self.hop,
            IngredientType::Yeast => self.yeast,
            IngredientType::Grain => self.grain,
            IngredientType::Other => self.other,
        }
    }
}

impl Default for IngredientThresholds {
    fn default() -> Self {
        IngredientThresholds {
            malt: 1000.0,
            hop: 100.0,
            yeast: 50.0,
            grain: 500.0,
            other: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub thresholds: IngredientThresholds,
    /// Per container group, in units.
    pub container_thresholds: BTreeMap<String, i64>,
    pub block_negative: bool,
}

impl Default for Config {
    fn default() -> Self {
        let container_thresholds = [("bottles", 50), ("cans", 50)]
            .into_iter()
            .map(|(group, n)| (group.to_string(), n))
            .collect();
        Config {
            thresholds: IngredientThresholds::default(),
            container_thresholds,
            block_negative: true,
        }
    }
}

/// The whole application document, read and written in full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub ingredients: Vec<Ingredient>,
    pub containers: ContainerStock,
    pub movements: Vec<Movement>,
    pub config: Config,
}

impl State {
    pub fn ingredient(&self, id: &str) -> Option<&Ingredient> {
        self.ingredients.iter().find(|i| i.id == id)
    }
}

impl Default for State {
    /// Empty inventory with the default container formats and settings.
    fn default() -> Self {
        let mut containers = ContainerStock::default();
        for (group, size) in [
            ("bottles", "33cl"),
            ("bottles", "50cl"),
            ("bottles", "75cl"),
            ("cans", "44cl"),
        ] {
            containers.register(group, size);
        }
        State {
            ingredients: Vec::new(),
            containers,
            movements: Vec::new(),
            config: Config::default(),
        }
    }
}
