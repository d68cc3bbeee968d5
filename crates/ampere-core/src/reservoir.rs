//! Bounded energy storage owned by a machine.
//!
//! [`EnergyReservoir`] holds the arithmetic. [`SharedReservoir`] wraps it
//! behind a mutex so a machine's tick and offers arriving from neighbouring
//! producers never interleave inside a single operation.

use crate::energy::Energy;
use crate::item::ItemStack;
use crate::offer::EnergyOffer;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// Stored energy with a fixed maximum. `0 <= charge <= max_charge` holds
/// after every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnergyReservoir {
    charge: Energy,
    max_charge: Energy,
}

impl EnergyReservoir {
    /// Create a reservoir, clamping `charge` to `max_charge`.
    pub fn new(charge: Energy, max_charge: Energy) -> Self {
        Self {
            charge: charge.min(max_charge),
            max_charge,
        }
    }

    pub fn empty(max_charge: Energy) -> Self {
        Self::new(Energy::ZERO, max_charge)
    }

    pub fn charge(&self) -> Energy {
        self.charge
    }

    pub fn max_charge(&self) -> Energy {
        self.max_charge
    }

    pub fn free_space(&self) -> Energy {
        self.max_charge - self.charge
    }

    pub fn has_space(&self) -> bool {
        self.free_space() > Energy::ZERO
    }

    /// Strictly more than `amount` is stored.
    pub fn has_at_least(&self, amount: Energy) -> bool {
        self.charge > amount
    }

    /// At least `amount` is stored.
    pub fn covers(&self, amount: Energy) -> bool {
        self.charge >= amount
    }

    pub fn has_energy(&self) -> bool {
        self.has_at_least(Energy::ZERO)
    }

    /// Add energy, discarding whatever exceeds the maximum.
    pub fn add(&mut self, amount: Energy) {
        self.charge = (self.charge + amount).min(self.max_charge);
    }

    /// Remove `amount` if it is fully covered. No partial debit.
    pub fn subtract(&mut self, amount: Energy) -> bool {
        match self.charge.checked_sub(amount) {
            Some(rest) => {
                self.charge = rest;
                true
            }
            None => false,
        }
    }

    /// Take an offered amount if it fits entirely and the offer is still
    /// claimable. On `false` the reservoir is unchanged.
    pub fn receive_offer(&mut self, offer: &mut dyn EnergyOffer) -> bool {
        let free = self.free_space();
        let amount = offer.amount();
        if free.is_zero() || free < amount {
            trace!(%free, %amount, "offer does not fit");
            return false;
        }
        if !offer.accept() {
            return false;
        }
        self.add(amount);
        true
    }

    /// Move up to `max` energy into a single chargeable item. Returns the
    /// amount the item actually kept.
    pub fn charge_item(&mut self, stack: &mut ItemStack, max: Energy) -> Energy {
        if stack.is_empty() || stack.count != 1 {
            return Energy::ZERO;
        }
        let Some(store) = stack.energy.as_mut() else {
            return Energy::ZERO;
        };
        if !store.has_free_space() {
            return Energy::ZERO;
        }
        let transferring = max.min(self.charge).min(store.free_space());
        self.charge -= transferring;
        let unused = store.insert(transferring);
        self.charge = (self.charge + unused).min(self.max_charge);
        transferring - unused
    }

    /// Pull up to `max` energy out of a chargeable item. Returns the amount
    /// credited to the reservoir.
    pub fn discharge_item(&mut self, stack: &mut ItemStack, max: Energy) -> Energy {
        if !self.has_space() || stack.is_empty() {
            return Energy::ZERO;
        }
        let Some(store) = stack.energy.as_mut() else {
            return Energy::ZERO;
        };
        if !store.has_energy() {
            return Energy::ZERO;
        }
        let transferring = max.min(self.free_space()).min(store.charge());
        if !store.extract(transferring) {
            return Energy::ZERO;
        }
        self.add(transferring);
        transferring
    }
}

// ---------------------------------------------------------------------------
// SharedReservoir
// ---------------------------------------------------------------------------

/// A reservoir shared between a machine and the producers feeding it.
///
/// Every method takes the lock once, so a check and the mutation it guards
/// are atomic with respect to other holders.
#[derive(Debug, Clone)]
pub struct SharedReservoir {
    inner: Arc<Mutex<EnergyReservoir>>,
}

impl SharedReservoir {
    pub fn new(reservoir: EnergyReservoir) -> Self {
        Self {
            inner: Arc::new(Mutex::new(reservoir)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EnergyReservoir> {
        // Every operation completes before releasing, so a poisoned lock
        // still guards a consistent reservoir.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access.
    pub fn with<R>(&self, f: impl FnOnce(&mut EnergyReservoir) -> R) -> R {
        f(&mut self.lock())
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> EnergyReservoir {
        self.lock().clone()
    }

    /// Replace the whole state, e.g. when restoring from a record.
    pub fn replace(&self, reservoir: EnergyReservoir) {
        *self.lock() = reservoir;
    }

    pub fn charge(&self) -> Energy {
        self.lock().charge()
    }

    pub fn max_charge(&self) -> Energy {
        self.lock().max_charge()
    }

    pub fn free_space(&self) -> Energy {
        self.lock().free_space()
    }

    pub fn has_at_least(&self, amount: Energy) -> bool {
        self.lock().has_at_least(amount)
    }

    pub fn covers(&self, amount: Energy) -> bool {
        self.lock().covers(amount)
    }

    pub fn add(&self, amount: Energy) {
        self.lock().add(amount);
    }

    pub fn subtract(&self, amount: Energy) -> bool {
        self.lock().subtract(amount)
    }

    pub fn receive_offer(&self, offer: &mut dyn EnergyOffer) -> bool {
        self.lock().receive_offer(offer)
    }

    pub fn charge_item(&self, stack: &mut ItemStack, max: Energy) -> Energy {
        self.lock().charge_item(stack, max)
    }

    pub fn discharge_item(&self, stack: &mut ItemStack, max: Energy) -> Energy {
        self.lock().discharge_item(stack, max)
    }
}
