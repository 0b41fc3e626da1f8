//! One user action = load the whole state, run one operation, save it back.
//!
//! Actions are serialized by the caller; two processes sharing a database can
//! still overwrite each other's changes (last save wins).

use log::debug;

use crate::db::{load_or_seed, SeedSource, StateStore};
use crate::error::LedgerResult;
use crate::model::State;

pub struct Tracker<S: StateStore> {
    store: S,
    seed: Option<Box<dyn SeedSource>>,
}

impl<S: StateStore> Tracker<S> {
    pub fn new(store: S) -> Self {
        Tracker { store, seed: None }
    }

    pub fn with_seed(mut self, seed: impl SeedSource + 'static) -> Self {
        self.seed = Some(Box::new(seed));
        self
    }

    /// Current state, falling back to the seed and then to the defaults.
    pub fn state(&self) -> LedgerResult<State> {
        Ok(load_or_seed(&self.store, self.seed.as_deref())?)
    }

    /// Runs `action` on a fresh copy of the state and saves only if it succeeds
    /// and changed something.
    ///
    /// If saving fails the change is lost and the store error is returned.
    pub fn transact<T>(&self, action: impl FnOnce(&mut State) -> LedgerResult<T>) -> LedgerResult<T> {
        let mut state = self.state()?;
        let before = state.clone();
        let out = action(&mut state)?;
        if state == before {
            debug!("state unchanged, nothing saved");
            return Ok(out);
        }
        self.store.save(&state)?;
        debug!("state saved ({} movements)", state.movements.len());
        Ok(out)
    }

    /// Overwrites the stored state, e.g. after a full JSON import.
    pub fn replace(&self, state: &State) -> LedgerResult<()> {
        self.store.save(state)?;
        Ok(())
    }
}
