//! Per-machine event bus.
//!
//! Each machine owns a [`MachineEventBus`]. Listeners subscribe to one
//! [`MachineEvent`] kind and are called synchronously, in registration
//! order, whenever the tick driver dispatches that kind.

use crate::id::ListenerId;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

// ---------------------------------------------------------------------------
// Event kinds
// ---------------------------------------------------------------------------

/// Something that happened while a machine ticked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MachineEvent {
    /// A unit was billed for its energy this tick.
    EnergyUsed,
    /// Stored energy did not cover the per-tick requirement.
    EnergyNotEnough,
    /// A processing cycle completed.
    Processed,
    /// No processing unit was able to run.
    CanNotProcess,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 4;

impl MachineEvent {
    pub const ALL: [MachineEvent; EVENT_KIND_COUNT] = [
        MachineEvent::EnergyUsed,
        MachineEvent::EnergyNotEnough,
        MachineEvent::Processed,
        MachineEvent::CanNotProcess,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// Bus
// ---------------------------------------------------------------------------

/// A listener callback. Receives the kind it was dispatched for.
pub type Listener = Box<dyn FnMut(MachineEvent)>;

struct Registration {
    event: MachineEvent,
    listener: Listener,
}

/// Listener registry keyed by event kind.
#[derive(Default)]
pub struct MachineEventBus {
    registrations: SlotMap<ListenerId, Registration>,
    /// Registration order per kind.
    order: [Vec<ListenerId>; EVENT_KIND_COUNT],
    /// Dispatch counters per kind, including dispatches nobody listened to.
    dispatched: [u64; EVENT_KIND_COUNT],
}

impl std::fmt::Debug for MachineEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MachineEventBus")
            .field("listeners", &self.registrations.len())
            .field("dispatched", &self.dispatched)
            .finish()
    }
}

impl MachineEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `listener` to `event`.
    pub fn add_listener(&mut self, event: MachineEvent, listener: Listener) -> ListenerId {
        let id = self.registrations.insert(Registration { event, listener });
        self.order[event.index()].push(id);
        id
    }

    /// Unsubscribe. Returns `false` if the id was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let Some(reg) = self.registrations.remove(id) else {
            return false;
        };
        self.order[reg.event.index()].retain(|other| *other != id);
        true
    }

    /// Call every listener for `event`, in registration order.
    pub fn dispatch(&mut self, event: MachineEvent) {
        self.dispatched[event.index()] += 1;
        for id in &self.order[event.index()] {
            if let Some(reg) = self.registrations.get_mut(*id) {
                (reg.listener)(event);
            }
        }
    }

    pub fn listener_count(&self, event: MachineEvent) -> usize {
        self.order[event.index()].len()
    }

    pub fn dispatched_count(&self, event: MachineEvent) -> u64 {
        self.dispatched[event.index()]
    }

    pub fn clear(&mut self) {
        self.registrations.clear();
        for ids in &mut self.order {
            ids.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder(log: &Rc<RefCell<Vec<(u32, MachineEvent)>>>, tag: u32) -> Listener {
        let log = Rc::clone(log);
        Box::new(move |e| log.borrow_mut().push((tag, e)))
    }

    #[test]
    fn dispatch_reaches_only_matching_listeners() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = MachineEventBus::new();
        bus.add_listener(MachineEvent::Processed, recorder(&log, 1));
        bus.add_listener(MachineEvent::EnergyUsed, recorder(&log, 2));
        bus.dispatch(MachineEvent::Processed);
        assert_eq!(*log.borrow(), vec![(1, MachineEvent::Processed)]);
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = MachineEventBus::new();
        for tag in 0..3 {
            bus.add_listener(MachineEvent::EnergyUsed, recorder(&log, tag));
        }
        bus.dispatch(MachineEvent::EnergyUsed);
        let tags: Vec<u32> = log.borrow().iter().map(|(t, _)| *t).collect();
        assert_eq!(tags, vec![0, 1, 2]);
    }

    #[test]
    fn removed_listener_is_not_called() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = MachineEventBus::new();
        let first = bus.add_listener(MachineEvent::CanNotProcess, recorder(&log, 1));
        bus.add_listener(MachineEvent::CanNotProcess, recorder(&log, 2));
        assert!(bus.remove_listener(first));
        assert!(!bus.remove_listener(first));
        bus.dispatch(MachineEvent::CanNotProcess);
        assert_eq!(*log.borrow(), vec![(2, MachineEvent::CanNotProcess)]);
        assert_eq!(bus.listener_count(MachineEvent::CanNotProcess), 1);
    }

    #[test]
    fn dispatch_counts_without_listeners() {
        let mut bus = MachineEventBus::new();
        bus.dispatch(MachineEvent::EnergyNotEnough);
        bus.dispatch(MachineEvent::EnergyNotEnough);
        assert_eq!(bus.dispatched_count(MachineEvent::EnergyNotEnough), 2);
        assert_eq!(bus.dispatched_count(MachineEvent::Processed), 0);
    }
}
