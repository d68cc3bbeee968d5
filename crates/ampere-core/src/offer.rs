//! Energy offers: a claimable amount handed from a producer to consumers.
//!
//! A producer broadcasts one offer to several neighbours; the first to call
//! [`EnergyOffer::accept`] takes it and every later caller is refused.

use crate::energy::Energy;
use crate::routing::Direction;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// An amount of energy a consumer may claim exactly once.
pub trait EnergyOffer {
    fn amount(&self) -> Energy;

    /// Claim the offer. `false` means the producer withdrew it or another
    /// consumer got there first, and nothing may be credited.
    fn accept(&mut self) -> bool;
}

/// Result of presenting an offer to a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    /// The amount was claimed and stored.
    Accepted,
    /// Nothing changed on either side.
    Rejected,
    /// The offer exceeded the consumer's input limit and was claimed, but
    /// the consumer broke instead of storing it.
    Overloaded,
}

impl OfferOutcome {
    pub fn is_accepted(self) -> bool {
        self == OfferOutcome::Accepted
    }
}

/// Something that can take energy from a neighbour.
pub trait EnergyConsumer {
    /// Whether energy may enter from the given side.
    fn is_consume_from(&self, _direction: Direction) -> bool {
        true
    }

    fn receive_offer(&mut self, offer: &mut dyn EnergyOffer) -> OfferOutcome;
}

// ---------------------------------------------------------------------------
// SharedOffer
// ---------------------------------------------------------------------------

/// An offer whose claim flag is shared between clones.
///
/// Hand one clone to each candidate consumer; at most one `accept` call
/// across all clones returns `true`, even when consumers run on different
/// threads.
#[derive(Debug, Clone)]
pub struct SharedOffer {
    amount: Energy,
    claimed: Arc<AtomicBool>,
}

impl SharedOffer {
    pub fn new(amount: Energy) -> Self {
        Self {
            amount,
            claimed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    /// Withdraw the offer so no consumer can claim it. Returns `false` if it
    /// was already claimed.
    pub fn withdraw(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl EnergyOffer for SharedOffer {
    fn amount(&self) -> Energy {
        self.amount
    }

    fn accept(&mut self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
