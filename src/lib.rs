//! Stock tracking for a small brewery: ingredient lots, packaging counts and
//! an append-only movement log, persisted as a single document.

pub mod catalog;
pub mod db;
pub mod error;
pub mod export;
pub mod import;
pub mod ledger;
pub mod model;
pub mod numeric;
pub mod settings;
pub mod tracker;

pub use error::{LedgerError, LedgerResult, StoreError};
pub use ledger::{Confirmation, Ledger, Outcome};
pub use model::{ContainerStock, Ingredient, IngredientKind, Movement, MovementKind, State};
pub use tracker::Tracker;
