//! Item routing between neighbouring containers.
//!
//! Suppliers offer copies of what they can give; consumers say whether they
//! can take a stack and then take it. [`supply`] moves one unit at a time
//! and hands back anything the consumer refused, so a failed transfer
//! leaves both sides as they were.
//!
//! The slot helpers at the bottom work on any [`SlotAccess`] container and
//! mirror the rules used by plain chests: sided slot lists, merge into
//! matching stacks, fill empty slots.

use crate::item::ItemStack;
use serde::{Deserialize, Serialize};
use tracing::trace;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// A face of a block-like container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Direction {
    /// Every direction in routing order.
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::East => Direction::West,
        }
    }

    pub fn is_horizontal(self) -> bool {
        !matches!(self, Direction::Down | Direction::Up)
    }
}

// ---------------------------------------------------------------------------
// Consumer / supplier contracts
// ---------------------------------------------------------------------------

/// A container that accepts item stacks from neighbours.
pub trait ItemConsumer {
    fn can_consume(&self, stack: &ItemStack, direction: Direction) -> bool;

    /// Take as much of `stack` as possible. Returns what was not taken.
    fn consume(&mut self, stack: ItemStack, direction: Direction) -> ItemStack;
}

/// A container that gives item stacks to neighbours.
pub trait ItemSupplier {
    /// Copies of the stacks on offer. Mutating them changes nothing.
    fn can_supply(&self, direction: Direction) -> Vec<ItemStack>;

    /// Withdraw exactly `requested`. All-or-nothing.
    fn supply(&mut self, requested: &ItemStack, direction: Direction) -> bool;

    /// Take back items a consumer refused after a successful `supply`.
    fn return_stack(&mut self, stack: ItemStack, direction: Direction);
}

/// Lookup of the consumer adjacent to a supplier on each side.
pub trait Neighborhood {
    fn consumer_at(&mut self, direction: Direction) -> Option<&mut dyn ItemConsumer>;
}

/// Offer one unit of some supplied item to `consumer`.
///
/// Candidates are tried in the supplier's order. The first unit the
/// consumer takes completely ends the attempt with `true`. A partially
/// taken unit has its remainder returned to the supplier and the next
/// candidate is tried.
pub fn supply<S, C>(supplier: &mut S, consumer: &mut C, direction: Direction) -> bool
where
    S: ItemSupplier + ?Sized,
    C: ItemConsumer + ?Sized,
{
    for candidate in supplier.can_supply(direction) {
        if candidate.is_empty() || !consumer.can_consume(&candidate, direction) {
            continue;
        }
        let unit = candidate.copy_with_count(1);
        if !supplier.supply(&unit, direction) {
            continue;
        }
        let rest = consumer.consume(unit, direction);
        if rest.is_empty() {
            trace!(item = %candidate.item, ?direction, "routed one unit");
            return true;
        }
        trace!(item = %rest.item, count = rest.count, "consumer refused, returning");
        supplier.return_stack(rest, direction);
    }
    false
}

/// Try every side except `excluded`, in [`Direction::ALL`] order, stopping
/// at the first successful [`supply`].
pub fn supply_to_all_except<S, N>(supplier: &mut S, neighbors: &mut N, excluded: Direction) -> bool
where
    S: ItemSupplier + ?Sized,
    N: Neighborhood + ?Sized,
{
    for direction in Direction::ALL {
        if direction == excluded {
            continue;
        }
        let Some(consumer) = neighbors.consumer_at(direction) else {
            continue;
        };
        if supply(&mut *supplier, consumer, direction) {
            return true;
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Slot-level helpers
// ---------------------------------------------------------------------------

/// Indexed slot storage with optional sided access rules.
pub trait SlotAccess {
    fn slot_count(&self) -> usize;

    fn stack(&self, slot: usize) -> &ItemStack;

    fn stack_mut(&mut self, slot: usize) -> Option<&mut ItemStack>;

    fn put_stack(&mut self, slot: usize, stack: ItemStack);

    fn max_stack_size(&self, slot: usize) -> u32;

    fn is_valid(&self, _slot: usize, _stack: &ItemStack) -> bool {
        true
    }

    /// Slots reachable from `side`. `None` means every slot.
    fn available_slots(&self, _side: Direction) -> Option<Vec<usize>> {
        None
    }

    fn can_insert(&self, _slot: usize, _stack: &ItemStack, _side: Direction) -> bool {
        true
    }

    fn mark_dirty(&mut self) {}
}

/// Same item, same charge, and room left on `first`.
pub fn can_merge_items(first: &ItemStack, second: &ItemStack) -> bool {
    first.can_combine(second) && first.count < first.max_count
}

/// Move as much of `stack` onto `into` as its max count allows. Returns the
/// overflow.
pub fn merge_items(into: &mut ItemStack, stack: ItemStack) -> ItemStack {
    merge_items_capped(into, stack, u32::MAX)
}

/// [`merge_items`] with `into` also held to `cap` items, for slots whose
/// stack size is below the item's own max count.
pub fn merge_items_capped(into: &mut ItemStack, mut stack: ItemStack, cap: u32) -> ItemStack {
    if !into.can_combine(&stack) {
        return stack;
    }
    let room = into.max_count.min(cap).saturating_sub(into.count);
    let moved = room.min(stack.count);
    into.increment(moved);
    stack.decrement(moved);
    stack
}

/// Move `stack` into the slots of `to` reachable from `side`. Returns what
/// did not fit.
pub fn transfer<T: SlotAccess + ?Sized>(to: &mut T, mut stack: ItemStack, side: Direction) -> ItemStack {
    let slots = to
        .available_slots(side)
        .unwrap_or_else(|| (0..to.slot_count()).collect());
    for slot in slots {
        if stack.is_empty() {
            break;
        }
        stack = transfer_to_slot(&mut *to, stack, slot, side);
    }
    stack
}

/// Move `stack` into one slot of `to`: an empty slot takes up to its cap, a
/// matching slot takes what fits.
pub fn transfer_to_slot<T: SlotAccess + ?Sized>(
    to: &mut T,
    mut stack: ItemStack,
    slot: usize,
    side: Direction,
) -> ItemStack {
    if !to.is_valid(slot, &stack) || !to.can_insert(slot, &stack, side) {
        return stack;
    }
    if to.stack(slot).is_empty() {
        let cap = to.max_stack_size(slot).min(stack.max_count);
        let placed = stack.split(cap);
        to.put_stack(slot, placed);
        to.mark_dirty();
        return stack;
    }
    if !can_merge_items(to.stack(slot), &stack) {
        return stack;
    }
    let cap = to.max_stack_size(slot);
    let mut moved = 0;
    if let Some(target) = to.stack_mut(slot) {
        let room = cap.min(stack.max_count).saturating_sub(target.count);
        moved = room.min(stack.count);
        target.increment(moved);
    }
    if moved > 0 {
        stack.decrement(moved);
        to.mark_dirty();
    }
    stack
}

/// Whether some valid slot is empty or holds the same item with room left.
pub fn has_space_for<T: SlotAccess + ?Sized>(inventory: &T, stack: &ItemStack) -> bool {
    (0..inventory.slot_count()).any(|slot| {
        let target = inventory.stack(slot);
        inventory.is_valid(slot, stack)
            && (target.is_empty() || (target.item == stack.item && target.count < target.max_count))
    })
}

/// Merge `stack` into the first slot that can take it, else the first
/// empty slot; overflow moves on to the next candidate. Returns what is
/// left when no slot can take more.
pub fn consume_into<T: SlotAccess + ?Sized>(inventory: &mut T, mut stack: ItemStack) -> ItemStack {
    while !stack.is_empty() {
        let target = (0..inventory.slot_count())
            .find(|&s| inventory.is_valid(s, &stack) && can_merge_items(inventory.stack(s), &stack))
            .or_else(|| {
                (0..inventory.slot_count())
                    .find(|&s| inventory.is_valid(s, &stack) && inventory.stack(s).is_empty())
            });
        let Some(slot) = target else {
            break;
        };
        let before = stack.count;
        if inventory.stack(slot).is_empty() {
            let cap = inventory.max_stack_size(slot).min(stack.max_count);
            let placed = stack.split(cap);
            inventory.put_stack(slot, placed);
        } else if let Some(into) = inventory.stack_mut(slot) {
            stack = merge_items(into, stack);
        }
        if stack.count == before {
            break;
        }
        inventory.mark_dirty();
    }
    stack
}

/// Remove `requested.count` of `requested.item`, lowest slot first. Nothing
/// is removed unless the full amount is present.
pub fn supply_from<T: SlotAccess + ?Sized>(inventory: &mut T, requested: &ItemStack) -> bool {
    let available: u64 = (0..inventory.slot_count())
        .map(|s| inventory.stack(s))
        .filter(|s| s.is_of(&requested.item))
        .map(|s| s.count as u64)
        .sum();
    if available < requested.count as u64 {
        return false;
    }
    let mut remaining = requested.count;
    for slot in 0..inventory.slot_count() {
        if remaining == 0 {
            break;
        }
        if let Some(stack) = inventory.stack_mut(slot) {
            if stack.is_of(&requested.item) {
                remaining -= stack.split(remaining).count;
            }
        }
    }
    inventory.mark_dirty();
    true
}
