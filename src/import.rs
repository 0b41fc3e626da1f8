//! Turns stock spreadsheets into ingredient records.
//!
//! An import replaces the whole ingredient list. The header must carry every
//! column in [`COLUMNS`] (canonical English names or the French spreadsheet
//! headers, case-insensitive); otherwise nothing is imported.

use log::{info, warn};
use std::collections::HashSet;

use crate::error::{LedgerError, LedgerResult};
use crate::model::{ingredient_id, Ingredient, IngredientKind, State};
use crate::numeric::parse_lenient;

/// Canonical column name and the headers accepted for it.
pub const COLUMNS: [(&str, &[&str]); 11] = [
    ("Type", &["Type"]),
    ("Supplier", &["Supplier", "Fournisseur"]),
    ("Name", &["Name", "Nom"]),
    ("LotNumber", &["LotNumber", "Lot Number", "Numéro de lot"]),
    ("Spec", &["Spec", "Spec (%AA, EBC...)"]),
    ("Packaging", &["Packaging", "Conditionnement"]),
    ("Notes", &["Notes"]),
    ("CombinedNameSupplier", &["CombinedNameSupplier", "Name + Supplier", "Nom + Fournisseur"]),
    ("InitialQty", &["InitialQty", "Initial Qty (g)", "Qté initiale (g)"]),
    ("UsedQty", &["UsedQty", "Used Qty (g)", "Qté utilisée (g)"]),
    ("RemainingQty", &["RemainingQty", "Remaining Qty (g)", "Qté restante"]),
];

/// Header-indexed tabular data, as read from a CSV file or a spreadsheet sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Reads comma-separated text with `""` escaping; the first record is the header.
pub fn read_csv(text: &str) -> LedgerResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| LedgerError::invalid(format!("unreadable CSV: {}", e)))?;
        let cells: Vec<String> = record.iter().map(str::to_string).collect();
        if cells.iter().any(|c| !c.trim().is_empty()) {
            records.push(cells);
        }
    }

    let mut records = records.into_iter();
    let headers = records.next().unwrap_or_default();
    Ok(Table {
        headers,
        rows: records.collect(),
    })
}

fn resolve_columns(headers: &[String]) -> LedgerResult<[usize; COLUMNS.len()]> {
    let mut indexes = [0; COLUMNS.len()];
    let mut missing = Vec::new();
    for (slot, (canonical, aliases)) in COLUMNS.iter().enumerate() {
        let found = headers.iter().position(|h| {
            let h = h.trim().to_lowercase();
            aliases.iter().any(|alias| alias.to_lowercase() == h)
        });
        match found {
            Some(idx) => indexes[slot] = idx,
            None => missing.push(canonical.to_string()),
        }
    }
    if missing.is_empty() {
        Ok(indexes)
    } else {
        Err(LedgerError::MissingColumns(missing))
    }
}

/// Converts every row to an [`Ingredient`]. Quantities that cannot be read are `None`.
pub fn normalize_table(table: &Table) -> LedgerResult<Vec<Ingredient>> {
    let idx = resolve_columns(&table.headers)?;
    let mut seen = HashSet::new();

    let mut ingredients = Vec::with_capacity(table.rows.len());
    for (n, row) in table.rows.iter().enumerate() {
        let cell = |slot: usize| row.get(idx[slot]).map(|c| c.trim()).unwrap_or("");
        let [ty, supplier, name, lot, spec, packaging, notes, name_supplier, initial, used, remaining] =
            [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10].map(cell);
        if [ty, supplier, name, lot, name_supplier].iter().all(|c| c.is_empty()) {
            // Data rows are numbered from 2, the header being row 1.
            warn!("import: skipped row {} with no type, name, supplier or lot", n + 2);
            continue;
        }

        let id = ingredient_id(ty, name, supplier, lot);
        if !seen.insert(id.clone()) {
            warn!("import: several rows share the id {}", id);
        }
        ingredients.push(Ingredient {
            id,
            type_label: ty.to_string(),
            kind: IngredientKind::from_label(ty, spec),
            supplier: supplier.to_string(),
            name: name.to_string(),
            name_supplier: name_supplier.to_string(),
            lot_number: lot.to_string(),
            packaging: packaging.to_string(),
            notes: notes.to_string(),
            initial_qty: parse_lenient(initial),
            used_qty: parse_lenient(used),
            remaining_qty: parse_lenient(remaining),
        });
    }
    Ok(ingredients)
}

/// Replaces the ingredient list with the imported rows. Returns the row count.
pub fn import_ingredients(state: &mut State, table: &Table) -> LedgerResult<usize> {
    let ingredients = normalize_table(table)?;
    let count = ingredients.len();
    state.ingredients = ingredients;
    info!("imported {} ingredients, previous list replaced", count);
    Ok(count)
}

/// Parses a full-state JSON dump.
pub fn import_state_json(text: &str) -> LedgerResult<State> {
    serde_json::from_str(text).map_err(|e| LedgerError::invalid(format!("not a stock document: {}", e)))
}
