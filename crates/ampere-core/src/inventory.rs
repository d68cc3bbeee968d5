//! Slot groups and the composite inventory that joins them.
//!
//! A [`CompositeInventory`] exposes several named [`SlotGroup`]s through one
//! flat slot index space. Groups are laid out in declaration order: with
//! SOURCE(2), CHARGE(1), OUTPUT(3), global slots 0-1 are SOURCE, 2 is CHARGE
//! and 3-5 are OUTPUT.
//!
//! Group-scoped operations follow the same rules everywhere:
//!
//! - `add_stack` merges into compatible stacks first, then fills empty slots,
//!   both in ascending slot order, and returns exactly what did not fit.
//! - `remove_item` takes from the highest slot downwards.
//! - Slots outside any declared group read as empty and ignore writes.

use crate::id::ItemId;
use crate::item::{EMPTY_STACK, ItemStack};
use crate::routing::SlotAccess;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

// ---------------------------------------------------------------------------
// Group keys
// ---------------------------------------------------------------------------

/// Key naming one group in a [`CompositeInventory`]. The name is used as the
/// persistence key.
pub trait GroupKey: Copy + Eq + fmt::Debug {
    fn name(&self) -> &'static str;
}

/// Number of items of `source` that fit onto `target` under the per-slot cap.
fn transferable(max_stack_size: u32, source: &ItemStack, target: &ItemStack) -> u32 {
    let limit = max_stack_size
        .min(target.max_count)
        .min(source.max_count);
    limit.saturating_sub(target.count).min(source.count)
}

// ---------------------------------------------------------------------------
// SlotGroup
// ---------------------------------------------------------------------------

/// A fixed-size run of item slots sharing one per-slot stack cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotGroup {
    slots: Vec<ItemStack>,
    max_stack_size: u32,
}

impl SlotGroup {
    pub fn new(size: usize, max_stack_size: u32) -> Self {
        Self {
            slots: vec![ItemStack::EMPTY; size],
            max_stack_size: max_stack_size.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when every slot is empty (or there are no slots).
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(ItemStack::is_empty)
    }

    pub fn max_stack_size(&self) -> u32 {
        self.max_stack_size
    }

    pub fn get(&self, slot: usize) -> &ItemStack {
        self.slots.get(slot).unwrap_or(&EMPTY_STACK)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut ItemStack> {
        self.slots.get_mut(slot)
    }

    /// Replace a slot, capping the count at the group's stack size.
    /// Out-of-range writes are ignored.
    pub fn set(&mut self, slot: usize, mut stack: ItemStack) {
        let Some(target) = self.slots.get_mut(slot) else {
            return;
        };
        if stack.count > self.max_stack_size {
            stack.count = self.max_stack_size;
        }
        *target = if stack.is_empty() {
            ItemStack::EMPTY
        } else {
            stack
        };
    }

    /// Take the whole stack out of a slot.
    pub fn take(&mut self, slot: usize) -> ItemStack {
        self.slots
            .get_mut(slot)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.slots.fill(ItemStack::EMPTY);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemStack> {
        self.slots.iter()
    }

    /// Total count of `item` across all slots.
    pub fn count_of(&self, item: &ItemId) -> u64 {
        self.slots
            .iter()
            .filter(|s| s.is_of(item))
            .map(|s| s.count as u64)
            .sum()
    }

    /// Place `stack`, merging first and then filling empty slots. Returns
    /// the part that did not fit.
    #[must_use = "items that did not fit must be handled by the caller"]
    pub fn add_stack(&mut self, stack: ItemStack) -> ItemStack {
        let mut rest = stack;
        if rest.is_empty() {
            return rest;
        }
        for target in &mut self.slots {
            if rest.is_empty() {
                break;
            }
            if !target.can_combine(&rest) {
                continue;
            }
            let moved = transferable(self.max_stack_size, &rest, target);
            target.increment(moved);
            rest.decrement(moved);
        }
        for target in &mut self.slots {
            if rest.is_empty() {
                break;
            }
            if !target.is_empty() {
                continue;
            }
            let moved = self.max_stack_size.min(rest.max_count).min(rest.count);
            *target = rest.copy_with_count(moved);
            rest.decrement(moved);
        }
        rest
    }

    /// Whether `add_stack` would place at least one item. Changes nothing.
    pub fn can_insert(&self, stack: &ItemStack) -> bool {
        if stack.is_empty() {
            return false;
        }
        self.slots.iter().any(|target| {
            target.is_empty()
                || (target.can_combine(stack)
                    && transferable(self.max_stack_size, stack, target) > 0)
        })
    }

    /// Remove up to `count` of `item`, scanning from the last slot.
    pub fn remove_item(&mut self, item: &ItemId, count: u32) -> ItemStack {
        let mut removed = ItemStack::EMPTY;
        for target in self.slots.iter_mut().rev() {
            if removed.count >= count {
                break;
            }
            if !target.is_of(item) {
                continue;
            }
            let taken = target.split(count - removed.count);
            if removed.is_empty() {
                removed = taken;
            } else {
                removed.increment(taken.count);
            }
        }
        removed
    }

    pub fn can_remove_item(&self, item: &ItemId, count: u32) -> bool {
        let mut found = 0u64;
        for stack in self.slots.iter().filter(|s| s.is_of(item)) {
            found += stack.count as u64;
            if found >= count as u64 {
                return true;
            }
        }
        count == 0
    }
}

// ---------------------------------------------------------------------------
// Persistence records
// ---------------------------------------------------------------------------

/// One non-empty slot, addressed by its index within its group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRecord {
    pub slot: u32,
    pub item_id: ItemId,
    pub count: u32,
    #[serde(default = "default_record_max")]
    pub max_count: u32,
    #[serde(default)]
    pub aux: Option<crate::item::StoredCharge>,
}

fn default_record_max() -> u32 {
    crate::item::DEFAULT_MAX_STACK
}

impl SlotRecord {
    fn from_stack(slot: usize, stack: &ItemStack) -> Self {
        Self {
            slot: slot as u32,
            item_id: stack.item.clone(),
            count: stack.count,
            max_count: stack.max_count,
            aux: stack.energy,
        }
    }

    fn to_stack(&self) -> ItemStack {
        ItemStack {
            item: self.item_id.clone(),
            count: self.count,
            max_count: self.max_count,
            energy: self.aux,
        }
    }
}

/// Inventory contents keyed by group name.
pub type InventoryRecord = BTreeMap<String, Vec<SlotRecord>>;

// ---------------------------------------------------------------------------
// CompositeInventory
// ---------------------------------------------------------------------------

/// Several slot groups addressed through one flat index space.
#[derive(Debug, Clone)]
pub struct CompositeInventory<G: GroupKey> {
    groups: Vec<(G, SlotGroup)>,
    /// First global slot of each group, parallel to `groups`.
    offsets: Vec<usize>,
    /// Owning group index for every global slot.
    owners: Vec<usize>,
    dirty: bool,
}

impl<G: GroupKey> CompositeInventory<G> {
    /// Build an inventory from groups in declaration order. A repeated key
    /// keeps its first declaration.
    pub fn new(layout: impl IntoIterator<Item = (G, SlotGroup)>) -> Self {
        let mut groups: Vec<(G, SlotGroup)> = Vec::new();
        for (key, group) in layout {
            if groups.iter().any(|(k, _)| *k == key) {
                warn!(group = key.name(), "duplicate slot group ignored");
                continue;
            }
            groups.push((key, group));
        }
        let mut offsets = Vec::with_capacity(groups.len());
        let mut owners = Vec::new();
        for (index, (_, group)) in groups.iter().enumerate() {
            offsets.push(owners.len());
            owners.extend(std::iter::repeat_n(index, group.len()));
        }
        Self {
            groups,
            offsets,
            owners,
            dirty: false,
        }
    }

    fn index_of(&self, key: G) -> Option<usize> {
        self.groups.iter().position(|(k, _)| *k == key)
    }

    fn locate(&self, slot: usize) -> Option<(usize, usize)> {
        let group = *self.owners.get(slot)?;
        Some((group, slot - self.offsets[group]))
    }

    /// Total number of slots across all groups.
    pub fn size(&self) -> usize {
        self.owners.len()
    }

    pub fn group_keys(&self) -> impl Iterator<Item = G> + '_ {
        self.groups.iter().map(|(k, _)| *k)
    }

    pub fn group(&self, key: G) -> Option<&SlotGroup> {
        self.index_of(key).map(|i| &self.groups[i].1)
    }

    /// Mutable access to a whole group. Marks the inventory dirty.
    pub fn group_mut(&mut self, key: G) -> Option<&mut SlotGroup> {
        let i = self.index_of(key)?;
        self.dirty = true;
        Some(&mut self.groups[i].1)
    }

    pub fn group_of(&self, slot: usize) -> Option<G> {
        self.locate(slot).map(|(g, _)| self.groups[g].0)
    }

    /// Global index of the first slot of `key`.
    pub fn offset_of(&self, key: G) -> Option<usize> {
        self.index_of(key).map(|i| self.offsets[i])
    }

    /// Global indices of every slot in `key`, ascending.
    pub fn slots_of(&self, key: G) -> std::ops::Range<usize> {
        match self.index_of(key) {
            Some(i) => self.offsets[i]..self.offsets[i] + self.groups[i].1.len(),
            None => 0..0,
        }
    }

    pub fn get_stack(&self, slot: usize) -> &ItemStack {
        match self.locate(slot) {
            Some((g, local)) => self.groups[g].1.get(local),
            None => &EMPTY_STACK,
        }
    }

    pub fn get_stack_mut(&mut self, slot: usize) -> Option<&mut ItemStack> {
        let (g, local) = self.locate(slot)?;
        self.groups[g].1.get_mut(local)
    }

    pub fn set_stack(&mut self, slot: usize, stack: ItemStack) {
        if let Some((g, local)) = self.locate(slot) {
            self.groups[g].1.set(local, stack);
            self.dirty = true;
        }
    }

    /// Split up to `amount` items off a slot.
    pub fn remove_stack(&mut self, slot: usize, amount: u32) -> ItemStack {
        let Some(stack) = self.get_stack_mut(slot) else {
            return ItemStack::EMPTY;
        };
        let taken = stack.split(amount);
        if !taken.is_empty() {
            self.dirty = true;
        }
        taken
    }

    /// Take the whole stack out of a slot.
    pub fn take_stack(&mut self, slot: usize) -> ItemStack {
        let Some((g, local)) = self.locate(slot) else {
            return ItemStack::EMPTY;
        };
        let taken = self.groups[g].1.take(local);
        if !taken.is_empty() {
            self.dirty = true;
        }
        taken
    }

    pub fn stack_in(&self, key: G, slot: usize) -> &ItemStack {
        self.group(key).map_or(&EMPTY_STACK, |g| g.get(slot))
    }

    pub fn stack_in_mut(&mut self, key: G, slot: usize) -> Option<&mut ItemStack> {
        let i = self.index_of(key)?;
        self.groups[i].1.get_mut(slot)
    }

    pub fn set_stack_in(&mut self, key: G, slot: usize, stack: ItemStack) {
        if let Some(i) = self.index_of(key) {
            self.groups[i].1.set(slot, stack);
            self.dirty = true;
        }
    }

    /// Place a stack into one group. Undeclared groups return the input unchanged.
    #[must_use = "items that did not fit must be handled by the caller"]
    pub fn add_stack(&mut self, key: G, stack: ItemStack) -> ItemStack {
        let Some(i) = self.index_of(key) else {
            return stack;
        };
        let before = stack.count;
        let rest = self.groups[i].1.add_stack(stack);
        if rest.count != before {
            self.dirty = true;
        }
        rest
    }

    pub fn can_insert(&self, key: G, stack: &ItemStack) -> bool {
        self.group(key).is_some_and(|g| g.can_insert(stack))
    }

    pub fn remove_item(&mut self, key: G, item: &ItemId, count: u32) -> ItemStack {
        let Some(i) = self.index_of(key) else {
            return ItemStack::EMPTY;
        };
        let removed = self.groups[i].1.remove_item(item, count);
        if !removed.is_empty() {
            self.dirty = true;
        }
        removed
    }

    pub fn can_remove_item(&self, key: G, item: &ItemId, count: u32) -> bool {
        self.group(key).is_some_and(|g| g.can_remove_item(item, count))
    }

    pub fn is_group_empty(&self, key: G) -> bool {
        self.group(key).is_none_or(SlotGroup::is_empty)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|(_, g)| g.is_empty())
    }

    pub fn clear(&mut self) {
        for (_, group) in &mut self.groups {
            group.clear();
        }
        self.dirty = true;
    }

    /// Drain every non-empty stack, in global slot order.
    pub fn drain_all(&mut self) -> Vec<ItemStack> {
        let mut out = Vec::new();
        for (_, group) in &mut self.groups {
            for slot in 0..group.len() {
                let stack = group.take(slot);
                if !stack.is_empty() {
                    out.push(stack);
                }
            }
        }
        if !out.is_empty() {
            self.dirty = true;
        }
        out
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Return and reset the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Non-empty slots of every group, keyed by group name.
    pub fn to_record(&self) -> InventoryRecord {
        self.groups
            .iter()
            .map(|(key, group)| {
                let entries = group
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| !s.is_empty())
                    .map(|(i, s)| SlotRecord::from_stack(i, s))
                    .collect();
                (key.name().to_string(), entries)
            })
            .collect()
    }

    /// Restore contents from a record. Groups are cleared first. Entries
    /// whose slot lies outside their group, and groups this inventory does
    /// not declare, are skipped.
    pub fn load_record(&mut self, record: &InventoryRecord) {
        for (key, group) in &mut self.groups {
            group.clear();
            let Some(entries) = record.get(key.name()) else {
                continue;
            };
            for entry in entries {
                let slot = entry.slot as usize;
                if slot >= group.len() {
                    warn!(
                        group = key.name(),
                        slot,
                        size = group.len(),
                        "skipping out-of-range slot record"
                    );
                    continue;
                }
                group.set(slot, entry.to_stack());
            }
        }
        for name in record.keys() {
            if !self.groups.iter().any(|(k, _)| k.name() == name) {
                warn!(group = %name, "skipping records for undeclared slot group");
            }
        }
        self.dirty = true;
    }
}

impl<G: GroupKey> SlotAccess for CompositeInventory<G> {
    fn slot_count(&self) -> usize {
        self.size()
    }

    fn stack(&self, slot: usize) -> &ItemStack {
        self.get_stack(slot)
    }

    fn stack_mut(&mut self, slot: usize) -> Option<&mut ItemStack> {
        self.get_stack_mut(slot)
    }

    fn put_stack(&mut self, slot: usize, stack: ItemStack) {
        self.set_stack(slot, stack);
    }

    fn max_stack_size(&self, slot: usize) -> u32 {
        self.locate(slot)
            .map_or(0, |(g, _)| self.groups[g].1.max_stack_size())
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

impl SlotAccess for SlotGroup {
    fn slot_count(&self) -> usize {
        self.len()
    }

    fn stack(&self, slot: usize) -> &ItemStack {
        self.get(slot)
    }

    fn stack_mut(&mut self, slot: usize) -> Option<&mut ItemStack> {
        self.get_mut(slot)
    }

    fn put_stack(&mut self, slot: usize, stack: ItemStack) {
        self.set(slot, stack);
    }

    fn max_stack_size(&self, _slot: usize) -> u32 {
        self.max_stack_size
    }
}
