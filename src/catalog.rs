use chrono::NaiveDate;
use log::info;

use crate::error::{LedgerError, LedgerResult};
use crate::model::{
    ingredient_id, Config, Ingredient, IngredientKind, IngredientType, Movement, MovementKind, State, Unit,
};

const INITIAL_STOCK: &str = "initial stock";

/// User-entered fields for a new ingredient lot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewIngredient {
    pub type_label: String,
    pub supplier: String,
    pub name: String,
    /// Display name; derived from name and supplier when left empty.
    pub name_supplier: String,
    pub lot_number: String,
    pub spec: String,
    pub packaging: String,
    pub notes: String,
    pub initial_qty: f64,
}

/// Descriptive fields that may be edited after creation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngredientDetails {
    pub packaging: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockStatus {
    Negative,
    Low,
    Ok,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    /// Grams.
    Mass,
    /// Units.
    Count,
}

/// Adds an ingredient and logs its initial quantity as a stock-in.
///
/// Two lots with the same type, name, supplier and lot number would share an
/// id, so the second one is refused.
pub fn add_ingredient(state: &mut State, fields: NewIngredient, today: NaiveDate) -> LedgerResult<String> {
    if !fields.initial_qty.is_finite() || fields.initial_qty < 0.0 {
        return Err(LedgerError::invalid("initial quantity must be a non-negative number"));
    }
    if fields.type_label.trim().is_empty() || fields.name.trim().is_empty() {
        return Err(LedgerError::invalid("type and name are required"));
    }

    let id = ingredient_id(&fields.type_label, &fields.name, &fields.supplier, &fields.lot_number);
    if state.ingredient(&id).is_some() {
        return Err(LedgerError::DuplicateIngredient(id));
    }

    let name_supplier = if fields.name_supplier.trim().is_empty() {
        format!("{} {}", fields.name.trim(), fields.supplier.trim()).trim().to_string()
    } else {
        fields.name_supplier.trim().to_string()
    };
    let ingredient = Ingredient {
        id: id.clone(),
        type_label: fields.type_label.trim().to_string(),
        kind: IngredientKind::from_label(&fields.type_label, &fields.spec),
        supplier: fields.supplier.trim().to_string(),
        name: fields.name.trim().to_string(),
        name_supplier,
        lot_number: fields.lot_number.trim().to_string(),
        packaging: fields.packaging.trim().to_string(),
        notes: fields.notes.trim().to_string(),
        initial_qty: Some(fields.initial_qty),
        used_qty: Some(0.0),
        remaining_qty: Some(fields.initial_qty),
    };

    let movement = Movement {
        date: today,
        kind: MovementKind::StockIn,
        target: ingredient.display_label().to_string(),
        quantity: fields.initial_qty,
        unit: Unit::Grams,
        reason: INITIAL_STOCK.to_string(),
        notes: String::new(),
    };
    state.ingredients.push(ingredient);
    state.movements.push(movement);
    info!("added ingredient {} with {} g", id, fields.initial_qty);
    Ok(id)
}

/// Updates packaging or notes. Identity and quantities are not editable here.
pub fn edit_ingredient_details(state: &mut State, id: &str, details: IngredientDetails) -> LedgerResult<()> {
    let item = state
        .ingredients
        .iter_mut()
        .find(|i| i.id == id)
        .ok_or_else(|| LedgerError::UnknownIngredient(id.to_string()))?;
    if let Some(packaging) = details.packaging {
        item.packaging = packaging.trim().to_string();
    }
    if let Some(notes) = details.notes {
        item.notes = notes.trim().to_string();
    }
    info!("edited details of {}", id);
    Ok(())
}

/// Replaces the settings. This is the only way the config changes.
pub fn save_settings(state: &mut State, config: Config) -> LedgerResult<()> {
    let t = &config.thresholds;
    let ingredient_ok = [t.malt, t.hop, t.yeast, t.grain, t.other]
        .iter()
        .all(|v| v.is_finite() && *v >= 0.0);
    let containers_ok = config.container_thresholds.values().all(|v| *v >= 0);
    if !ingredient_ok || !containers_ok {
        return Err(LedgerError::invalid("thresholds must be non-negative numbers"));
    }
    state.config = config;
    info!("settings saved (block negative: {})", state.config.block_negative);
    Ok(())
}

pub fn is_low_stock(ingredient: &Ingredient, config: &Config) -> bool {
    let threshold = config.thresholds.for_type(ingredient.kind.ingredient_type());
    ingredient.remaining() <= threshold
}

pub fn classify_row(ingredient: &Ingredient, config: &Config) -> StockStatus {
    if ingredient.remaining() < 0.0 {
        StockStatus::Negative
    } else if is_low_stock(ingredient, config) {
        StockStatus::Low
    } else {
        StockStatus::Ok
    }
}

pub fn unit_for_type(type_label: &str) -> Measure {
    match IngredientType::from_label(type_label) {
        IngredientType::Other => Measure::Count,
        _ => Measure::Mass,
    }
}

/// Groups without a configured threshold are never reported low.
pub fn is_container_low(config: &Config, group: &str, level: i64) -> bool {
    config
        .container_thresholds
        .get(group)
        .is_some_and(|threshold| level <= *threshold)
}

/// Case-insensitive search over type, display name and lot number.
pub fn filter_ingredients<'a>(state: &'a State, query: &str, only_low: bool) -> Vec<&'a Ingredient> {
    let query = query.trim().to_lowercase();
    state
        .ingredients
        .iter()
        .filter(|item| {
            let haystack = format!("{} {} {}", item.type_label(), item.display_label(), item.lot_number)
                .to_lowercase();
            query.is_empty() || haystack.contains(&query)
        })
        .filter(|item| !only_low || is_low_stock(item, &state.config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 1).unwrap()
    }

    fn pale_malt(qty: f64) -> NewIngredient {
        NewIngredient {
            type_label: "Malt".into(),
            supplier: "Weyermann".into(),
            name: "Pale".into(),
            lot_number: "L1".into(),
            spec: "6".into(),
            initial_qty: qty,
            ..NewIngredient::default()
        }
    }

    fn citra(qty: f64) -> NewIngredient {
        NewIngredient {
            type_label: "Houblon".into(),
            supplier: "YCH".into(),
            name: "Citra".into(),
            lot_number: "H7".into(),
            spec: "12,5".into(),
            initial_qty: qty,
            ..NewIngredient::default()
        }
    }

    #[test]
    fn add_logs_initial_stock() {
        let mut state = State::default();
        let id = add_ingredient(&mut state, pale_malt(5000.0), day()).unwrap();
        assert_eq!(id, "Malt::Pale::Weyermann::L1");

        let malt = state.ingredient(&id).unwrap();
        assert_eq!(malt.initial_qty(), Some(5000.0));
        assert_eq!(malt.used_qty(), Some(0.0));
        assert_eq!(malt.remaining_qty(), Some(5000.0));
        assert_eq!(malt.name_supplier, "Pale Weyermann");
        assert_eq!(malt.kind, IngredientKind::Malt { ebc: Some(6.0) });

        assert_eq!(state.movements.len(), 1);
        let logged = &state.movements[0];
        assert_eq!(logged.kind, MovementKind::StockIn);
        assert_eq!(logged.quantity, 5000.0);
        assert_eq!(logged.reason, "initial stock");
    }

    #[test]
    fn duplicate_identity_is_refused() {
        let mut state = State::default();
        add_ingredient(&mut state, pale_malt(100.0), day()).unwrap();
        let err = add_ingredient(&mut state, pale_malt(200.0), day()).unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateIngredient(_)));
        assert_eq!(state.ingredients.len(), 1);
        assert_eq!(state.movements.len(), 1);
    }

    #[test]
    fn add_rejects_bad_quantity() {
        let mut state = State::default();
        assert!(add_ingredient(&mut state, pale_malt(f64::NAN), day()).is_err());
        assert!(add_ingredient(&mut state, pale_malt(-1.0), day()).is_err());
        assert!(state.ingredients.is_empty());
        assert!(state.movements.is_empty());
    }

    #[test]
    fn classification_follows_thresholds_without_mutation() {
        let mut state = State::default();
        let id = add_ingredient(&mut state, citra(80.0), day()).unwrap();
        let hop = state.ingredient(&id).unwrap().clone();

        assert_eq!(classify_row(&hop, &state.config), StockStatus::Low);
        assert_eq!(classify_row(&hop, &state.config), StockStatus::Low);

        let mut relaxed = state.config.clone();
        relaxed.thresholds.hop = 50.0;
        assert_eq!(classify_row(&hop, &relaxed), StockStatus::Ok);
        assert_eq!(state.ingredient(&id).unwrap(), &hop);
    }

    #[test]
    fn negative_wins_over_low() {
        let mut state = State::default();
        let id = add_ingredient(&mut state, citra(10.0), day()).unwrap();
        state.ingredients[0].remaining_qty = Some(-5.0);
        assert_eq!(classify_row(state.ingredient(&id).unwrap(), &state.config), StockStatus::Negative);
    }

    #[test]
    fn other_types_use_the_fallback_threshold() {
        let mut state = State::default();
        let fields = NewIngredient {
            type_label: "Divers".into(),
            name: "Irish moss".into(),
            initial_qty: 90.0,
            ..NewIngredient::default()
        };
        let id = add_ingredient(&mut state, fields, day()).unwrap();
        let item = state.ingredient(&id).unwrap();
        assert!(is_low_stock(item, &state.config));
        state.config.thresholds.other = 10.0;
        assert!(!is_low_stock(state.ingredient(&id).unwrap(), &state.config));
    }

    #[test]
    fn units_by_type() {
        assert_eq!(unit_for_type("Malt"), Measure::Mass);
        assert_eq!(unit_for_type("houblon"), Measure::Mass);
        assert_eq!(unit_for_type("Levure"), Measure::Mass);
        assert_eq!(unit_for_type("grain"), Measure::Mass);
        assert_eq!(unit_for_type("Capsules"), Measure::Count);
    }

    #[test]
    fn container_thresholds_per_group() {
        let config = Config::default();
        assert!(is_container_low(&config, "bottles", 50));
        assert!(!is_container_low(&config, "bottles", 51));
        assert!(!is_container_low(&config, "kegs", 0));
    }

    #[test]
    fn settings_are_validated_before_saving() {
        let mut state = State::default();
        let mut config = state.config.clone();
        config.thresholds.malt = -1.0;
        assert!(save_settings(&mut state, config).is_err());
        assert_eq!(state.config, Config::default());

        let mut config = state.config.clone();
        config.block_negative = false;
        config.thresholds.malt = 2000.0;
        save_settings(&mut state, config.clone()).unwrap();
        assert_eq!(state.config, config);
        assert!(state.movements.is_empty());
    }

    #[test]
    fn details_edit_leaves_quantities_alone() {
        let mut state = State::default();
        let id = add_ingredient(&mut state, pale_malt(100.0), day()).unwrap();
        let details = IngredientDetails {
            packaging: Some("25 kg".into()),
            notes: None,
        };
        edit_ingredient_details(&mut state, &id, details).unwrap();
        let malt = state.ingredient(&id).unwrap();
        assert_eq!(malt.packaging, "25 kg");
        assert_eq!(malt.remaining_qty(), Some(100.0));
        assert!(edit_ingredient_details(&mut state, "nope", IngredientDetails::default()).is_err());
    }

    #[test]
    fn search_and_low_filter() {
        let mut state = State::default();
        add_ingredient(&mut state, pale_malt(5000.0), day()).unwrap();
        add_ingredient(&mut state, citra(80.0), day()).unwrap();

        assert_eq!(filter_ingredients(&state, "", false).len(), 2);
        assert_eq!(filter_ingredients(&state, "CITRA", false)[0].name, "Citra");
        assert_eq!(filter_ingredients(&state, "l1", false)[0].name, "Pale");
        let low = filter_ingredients(&state, "", true);
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].name, "Citra");
    }
}
