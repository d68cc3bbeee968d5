//! Item stacks and the energy an item can carry.

use crate::energy::Energy;
use crate::id::ItemId;
use serde::{Deserialize, Serialize};

/// Stack size used when an item does not declare its own.
pub const DEFAULT_MAX_STACK: u32 = 64;

fn default_max_count() -> u32 {
    DEFAULT_MAX_STACK
}

// ---------------------------------------------------------------------------
// StoredCharge
// ---------------------------------------------------------------------------

/// Energy held by a chargeable item such as a battery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoredCharge {
    charge: Energy,
    capacity: Energy,
}

impl StoredCharge {
    /// Create a store with `charge` clamped to `capacity`.
    pub fn new(charge: Energy, capacity: Energy) -> Self {
        Self {
            charge: charge.min(capacity),
            capacity,
        }
    }

    pub fn empty(capacity: Energy) -> Self {
        Self::new(Energy::ZERO, capacity)
    }

    pub fn charge(&self) -> Energy {
        self.charge
    }

    pub fn capacity(&self) -> Energy {
        self.capacity
    }

    pub fn free_space(&self) -> Energy {
        self.capacity - self.charge
    }

    pub fn has_energy(&self) -> bool {
        self.charge > Energy::ZERO
    }

    pub fn has_free_space(&self) -> bool {
        self.free_space() > Energy::ZERO
    }

    /// Store up to `amount`. Returns the part that did not fit.
    #[must_use = "energy that did not fit must be returned to its source"]
    pub fn insert(&mut self, amount: Energy) -> Energy {
        let accepted = amount.min(self.free_space());
        self.charge += accepted;
        amount - accepted
    }

    /// Remove exactly `amount`. Fails without change if less is stored.
    pub fn extract(&mut self, amount: Energy) -> bool {
        match self.charge.checked_sub(amount) {
            Some(rest) => {
                self.charge = rest;
                true
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// ItemStack
// ---------------------------------------------------------------------------

/// A quantity of one item kind.
///
/// A stack is empty when its count is zero or it carries no item id. Two
/// stacks combine when they hold the same item and the same stored charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: ItemId,
    pub count: u32,
    #[serde(default = "default_max_count")]
    pub max_count: u32,
    #[serde(default)]
    pub energy: Option<StoredCharge>,
}

/// Shared empty stack handed out for out-of-range and undeclared slots.
pub static EMPTY_STACK: ItemStack = ItemStack::EMPTY;

impl Default for ItemStack {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl ItemStack {
    pub const EMPTY: ItemStack = ItemStack {
        item: ItemId::none(),
        count: 0,
        max_count: DEFAULT_MAX_STACK,
        energy: None,
    };

    pub fn new(item: impl Into<ItemId>, count: u32) -> Self {
        Self {
            item: item.into(),
            count,
            max_count: DEFAULT_MAX_STACK,
            energy: None,
        }
    }

    pub fn with_max_count(mut self, max_count: u32) -> Self {
        self.max_count = max_count.max(1);
        self
    }

    pub fn with_energy(mut self, energy: StoredCharge) -> Self {
        self.energy = Some(energy);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0 || self.item.is_none()
    }

    pub fn is_of(&self, item: &ItemId) -> bool {
        !self.is_empty() && &self.item == item
    }

    /// Items that can hold energy go to the charge slot rather than the source group.
    pub fn is_chargeable(&self) -> bool {
        self.energy.is_some()
    }

    pub fn has_energy(&self) -> bool {
        self.energy.is_some_and(|e| e.has_energy())
    }

    pub fn is_full(&self) -> bool {
        self.count >= self.max_count
    }

    /// Same item and same stored charge; both non-empty.
    pub fn can_combine(&self, other: &ItemStack) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.item == other.item
            && self.energy == other.energy
    }

    /// A copy of this stack holding `count` items.
    pub fn copy_with_count(&self, count: u32) -> ItemStack {
        ItemStack {
            count,
            ..self.clone()
        }
    }

    /// Take up to `amount` items off this stack.
    pub fn split(&mut self, amount: u32) -> ItemStack {
        let taken = amount.min(self.count);
        let out = self.copy_with_count(taken);
        self.decrement(taken);
        out
    }

    pub fn increment(&mut self, amount: u32) {
        self.count = self.count.saturating_add(amount);
    }

    pub fn decrement(&mut self, amount: u32) {
        self.count = self.count.saturating_sub(amount);
        if self.count == 0 {
            *self = ItemStack::EMPTY;
        }
    }
}
