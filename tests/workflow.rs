use brewstock::catalog::{classify_row, StockStatus};
use brewstock::db::SqliteStore;
use brewstock::export::export_json;
use brewstock::import::{import_ingredients, import_state_json, read_csv};
use brewstock::ledger::{ContainerMovement, Direction, IngredientMovement, StockMovement};
use brewstock::{Confirmation, Ledger, LedgerError, MovementKind, Outcome, Tracker};
use chrono::NaiveDate;
use tempfile::NamedTempFile;

const STOCK_SHEET: &str = "\
Type,Supplier,Name,LotNumber,Spec,Packaging,Notes,CombinedNameSupplier,InitialQty,UsedQty,RemainingQty
Malt,Weyermann,Pilsner,L42,3.5,25 kg sack,,Pilsner Weyermann,25000,0,25000
Hop,YCH,Citra,H7,\"12,5\",1 kg bag,,Citra YCH,1000,0,1000
";

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 9, 12).unwrap()
}

fn movement(id: &str, kind: StockMovement, quantity: f64) -> IngredientMovement {
    IngredientMovement {
        ingredient_id: id.to_string(),
        kind,
        quantity,
        reason: "brew #12".to_string(),
        notes: String::new(),
    }
}

#[test]
fn import_brew_export_and_restore() {
    let db = NamedTempFile::new().unwrap();
    let tracker = Tracker::new(SqliteStore::open(db.path()).unwrap());

    let table = read_csv(STOCK_SHEET).unwrap();
    assert_eq!(tracker.transact(|state| import_ingredients(state, &table)).unwrap(), 2);

    let pils = "Malt::Pilsner::Weyermann::L42";
    let citra = "Hop::Citra::YCH::H7";
    tracker
        .transact(|state| {
            let mut ledger = Ledger::dated(state, day());
            ledger.record_ingredient_movement(&movement(pils, StockMovement::StockOut, 4500.0), Confirmation::NotGiven)?;
            ledger.record_ingredient_movement(&movement(citra, StockMovement::StockOut, 950.0), Confirmation::NotGiven)?;
            ledger.record_ingredient_movement(&movement(citra, StockMovement::Adjustment, -10.0), Confirmation::NotGiven)?;
            ledger.record_container_movement(&ContainerMovement {
                group: "bottles".to_string(),
                size: "33cl".to_string(),
                direction: Direction::In,
                quantity: 600,
                reason: "delivery".to_string(),
                notes: String::new(),
            })
        })
        .unwrap();

    let state = tracker.state().unwrap();
    assert_eq!(state.movements.len(), 4);
    assert_eq!(state.ingredient(pils).unwrap().remaining_qty(), Some(20500.0));
    let hop = state.ingredient(citra).unwrap();
    assert_eq!(hop.remaining_qty(), Some(40.0));
    assert_eq!(hop.used_qty(), Some(950.0));
    assert_eq!(classify_row(hop, &state.config), StockStatus::Low);
    assert_eq!(state.containers.level("bottles", "33cl"), Some(600));

    let dump = export_json(&state).unwrap();
    let restored_db = NamedTempFile::new().unwrap();
    let restored = Tracker::new(SqliteStore::open(restored_db.path()).unwrap());
    restored.replace(&import_state_json(&dump).unwrap()).unwrap();
    assert_eq!(restored.state().unwrap(), state);
}

#[test]
fn overdraw_is_blocked_then_confirmed_after_policy_change() {
    let db = NamedTempFile::new().unwrap();
    let tracker = Tracker::new(SqliteStore::open(db.path()).unwrap());
    let table = read_csv(STOCK_SHEET).unwrap();
    tracker.transact(|state| import_ingredients(state, &table)).unwrap();
    let citra = "Hop::Citra::YCH::H7";

    let err = tracker
        .transact(|state| {
            Ledger::dated(state, day())
                .record_ingredient_movement(&movement(citra, StockMovement::StockOut, 1500.0), Confirmation::NotGiven)
        })
        .unwrap_err();
    assert!(matches!(err, LedgerError::PolicyViolation(_)));
    assert!(tracker.state().unwrap().movements.is_empty());

    tracker
        .transact(|state| {
            let mut config = state.config.clone();
            config.block_negative = false;
            brewstock::catalog::save_settings(state, config)
        })
        .unwrap();

    let pending = tracker
        .transact(|state| {
            Ledger::dated(state, day())
                .record_ingredient_movement(&movement(citra, StockMovement::StockOut, 1500.0), Confirmation::NotGiven)
        })
        .unwrap();
    assert!(matches!(pending, Outcome::NeedsConfirmation { .. }));
    assert!(tracker.state().unwrap().movements.is_empty());

    tracker
        .transact(|state| {
            Ledger::dated(state, day())
                .record_ingredient_movement(&movement(citra, StockMovement::StockOut, 1500.0), Confirmation::Confirmed)
        })
        .unwrap();
    let state = tracker.state().unwrap();
    let hop = state.ingredient(citra).unwrap();
    assert_eq!(hop.remaining_qty(), Some(-500.0));
    assert_eq!(classify_row(hop, &state.config), StockStatus::Negative);
    assert_eq!(state.movements[0].kind, MovementKind::StockOut);
}
