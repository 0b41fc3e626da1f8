//! Stock movement ledger.
//!
//! Every accepted operation changes a balance and appends exactly one
//! [`Movement`]; a refused operation changes nothing. Stock-outs that exceed
//! the remaining quantity are refused when negatives are blocked, and
//! otherwise come back as [`Outcome::NeedsConfirmation`] until the caller
//! repeats them with [`Confirmation::Confirmed`].

use chrono::{Local, NaiveDate};
use log::{info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::model::{ContainerStock, Movement, MovementKind, State, Unit};

pub const GLOBAL_TARGET: &str = "global";
const MANUAL_ADJUSTMENT: &str = "manual adjustment";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockMovement {
    StockIn,
    StockOut,
    Adjustment,
}

impl StockMovement {
    fn kind(self) -> MovementKind {
        match self {
            StockMovement::StockIn => MovementKind::StockIn,
            StockMovement::StockOut => MovementKind::StockOut,
            StockMovement::Adjustment => MovementKind::Adjustment,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

/// Whether the user already agreed to drive a balance negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Confirmation {
    #[default]
    NotGiven,
    Confirmed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied(Movement),
    /// Nothing was changed; re-run with [`Confirmation::Confirmed`] to proceed.
    NeedsConfirmation { requested: f64, available: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngredientMovement {
    pub ingredient_id: String,
    pub kind: StockMovement,
    /// Grams. Signed for adjustments, strictly positive otherwise.
    pub quantity: f64,
    pub reason: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContainerMovement {
    pub group: String,
    pub size: String,
    pub direction: Direction,
    pub quantity: i64,
    pub reason: String,
    pub notes: String,
}

/// Applies movements to a borrowed [`State`], stamping entries with `today`.
pub struct Ledger<'s> {
    state: &'s mut State,
    today: NaiveDate,
}

impl<'s> Ledger<'s> {
    pub fn new(state: &'s mut State) -> Self {
        Self::dated(state, Local::now().date_naive())
    }

    pub fn dated(state: &'s mut State, today: NaiveDate) -> Self {
        Ledger { state, today }
    }

    pub fn record_ingredient_movement(
        &mut self,
        req: &IngredientMovement,
        confirmation: Confirmation,
    ) -> LedgerResult<Outcome> {
        let quantity = req.quantity;
        if !quantity.is_finite() {
            return Err(LedgerError::invalid("quantity must be a finite number"));
        }
        if req.kind != StockMovement::Adjustment && quantity <= 0.0 {
            return Err(LedgerError::invalid("quantity must be positive"));
        }

        let block_negative = self.state.config.block_negative;
        let item = self
            .state
            .ingredients
            .iter_mut()
            .find(|i| i.id == req.ingredient_id)
            .ok_or_else(|| LedgerError::UnknownIngredient(req.ingredient_id.clone()))?;

        let (initial, used, remaining) = (item.initial_qty, item.used_qty, item.remaining());
        let (initial, used, remaining) = match req.kind {
            StockMovement::StockIn => (
                Some(initial.unwrap_or(0.0) + quantity),
                used,
                remaining + quantity,
            ),
            StockMovement::StockOut => {
                if quantity > remaining {
                    if block_negative {
                        warn!(
                            "refused stock-out of {} g from {}: only {} g remaining",
                            quantity, item.id, remaining
                        );
                        return Err(LedgerError::policy(format!(
                            "stock-out exceeds remaining ({} g requested, {} g remaining)",
                            quantity, remaining
                        )));
                    }
                    if confirmation != Confirmation::Confirmed {
                        return Ok(Outcome::NeedsConfirmation { requested: quantity, available: remaining });
                    }
                }
                (initial, Some(used.unwrap_or(0.0) + quantity), remaining - quantity)
            }
            StockMovement::Adjustment => (initial, used, remaining + quantity),
        };
        let finite = |v: Option<f64>| v.map_or(true, f64::is_finite);
        if !(finite(initial) && finite(used) && remaining.is_finite()) {
            return Err(LedgerError::invalid(format!("{} would overflow the balance of {}", req.kind.kind(), item.id)));
        }
        item.initial_qty = initial;
        item.used_qty = used;
        item.remaining_qty = Some(remaining);

        let target = item.display_label().to_string();
        info!("{} of {} g on {}", req.kind.kind(), quantity, item.id);
        let movement = self.append(req.kind.kind(), target, quantity, Unit::Grams, &req.reason, &req.notes);
        Ok(Outcome::Applied(movement))
    }

    pub fn record_container_movement(&mut self, req: &ContainerMovement) -> LedgerResult<Movement> {
        check_format(&req.group, &req.size)?;
        if req.quantity <= 0 {
            return Err(LedgerError::invalid("container quantity must be a positive integer"));
        }

        let before = self.state.containers.level(&req.group, &req.size).unwrap_or(0);
        let (after, kind) = match req.direction {
            Direction::In => (before.checked_add(req.quantity), MovementKind::ContainerIn),
            Direction::Out => (before.checked_sub(req.quantity), MovementKind::ContainerOut),
        };
        let key = ContainerStock::key(&req.group, &req.size);
        let after = after.ok_or_else(|| LedgerError::invalid(format!("{} of {} overflows {}", kind, req.quantity, key)))?;
        if after < 0 && self.state.config.block_negative {
            warn!("refused {} of {} on {}: only {} in stock", kind, req.quantity, key, before);
            return Err(LedgerError::policy(format!(
                "{} would leave {} at {}",
                kind, key, after
            )));
        }

        self.state.containers.set(&req.group, &req.size, after);
        info!("{} of {} on {} ({} -> {})", kind, req.quantity, key, before, after);
        Ok(self.append(kind, key, req.quantity as f64, Unit::Units, &req.reason, &req.notes))
    }

    /// Overwrites a container count with a recounted value.
    ///
    /// A recount states the true level, so the negative-stock policy does not
    /// apply. The logged quantity is the signed difference.
    pub fn set_container_level(&mut self, group: &str, size: &str, new_value: i64) -> LedgerResult<Movement> {
        check_format(group, size)?;
        let before = self.state.containers.level(group, size).unwrap_or(0);
        let delta = new_value
            .checked_sub(before)
            .ok_or_else(|| LedgerError::invalid(format!("recount of {}.{} to {} overflows", group, size, new_value)))?;
        self.state.containers.set(group, size, new_value);

        let key = ContainerStock::key(group, size);
        info!("{} set to {} (delta {})", key, new_value, delta);
        Ok(self.append(
            MovementKind::AdjustmentContainer,
            key,
            delta as f64,
            Unit::Units,
            MANUAL_ADJUSTMENT,
            "",
        ))
    }

    /// Adds a container format at 0. Existing formats are left alone; no movement is logged.
    pub fn register_container_format(&mut self, group: &str, size: &str) -> LedgerResult<bool> {
        check_format(group, size)?;
        let added = self.state.containers.register(group.trim(), size.trim());
        if added {
            info!("registered container format {}", ContainerStock::key(group.trim(), size.trim()));
        }
        Ok(added)
    }

    /// Logs an adjustment that is not tied to any ingredient or container.
    pub fn record_global_movement(&mut self, quantity: f64, reason: &str, notes: &str) -> LedgerResult<Movement> {
        if !quantity.is_finite() {
            return Err(LedgerError::invalid("quantity must be a finite number"));
        }
        Ok(self.append(
            MovementKind::Adjustment,
            GLOBAL_TARGET.to_string(),
            quantity,
            Unit::Units,
            reason,
            notes,
        ))
    }

    fn append(
        &mut self,
        kind: MovementKind,
        target: String,
        quantity: f64,
        unit: Unit,
        reason: &str,
        notes: &str,
    ) -> Movement {
        let movement = Movement {
            date: self.today,
            kind,
            target,
            quantity,
            unit,
            reason: reason.to_string(),
            notes: notes.to_string(),
        };
        self.state.movements.push(movement.clone());
        movement
    }
}

fn check_format(group: &str, size: &str) -> LedgerResult<()> {
    if group.trim().is_empty() || size.trim().is_empty() {
        return Err(LedgerError::invalid("container group and size are required"));
    }
    Ok(())
}
