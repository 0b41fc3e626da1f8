use csv::{QuoteStyle, WriterBuilder};

use crate::error::{LedgerError, LedgerResult};
use crate::model::State;

/// Column order of the ingredients table.
pub const CSV_HEADER: [&str; 9] = [
    "Type",
    "Name + Supplier",
    "Lot",
    "Spec",
    "Packaging",
    "Notes",
    "Initial (g)",
    "Used (g)",
    "Remaining (g)",
];

/// Pretty-printed dump of the whole state.
pub fn export_json(state: &State) -> LedgerResult<String> {
    serde_json::to_string_pretty(state).map_err(|e| LedgerError::Export(e.to_string()))
}

/// Ingredients only, every field quoted. Unknown quantities are left empty.
pub fn export_ingredients_csv(state: &State) -> LedgerResult<String> {
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(vec![]);
    wtr.write_record(CSV_HEADER)
        .map_err(|e| LedgerError::Export(format!("CSV error: {}", e)))?;

    let qty = |v: Option<f64>| v.map(|n| n.to_string()).unwrap_or_default();
    for item in &state.ingredients {
        wtr.write_record([
            item.type_label().to_string(),
            item.display_label().to_string(),
            item.lot_number.clone(),
            item.kind.spec_text(),
            item.packaging.clone(),
            item.notes.clone(),
            qty(item.initial_qty()),
            qty(item.used_qty()),
            qty(item.remaining_qty()),
        ])
        .map_err(|e| LedgerError::Export(format!("CSV error: {}", e)))?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| LedgerError::Export(format!("CSV writer error: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| LedgerError::Export(format!("UTF-8 conversion error: {}", e)))
}
