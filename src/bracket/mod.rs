//! Bracket shaping module
//!
//! Pure transform from a simple bracket intent into the multi-order
//! representation a venue expects. Two idioms exist in the wild:
//! - a single order carrying take-profit/stop-loss sub-orders that attach
//!   on fill (forex brokers)
//! - three independently submitted orders linked by a shared group id
//!   (crypto exchanges)
//!
//! Shaping is deterministic apart from the generated correlation id.

mod linked;
mod on_fill;
mod types;

pub use linked::{LimitGtc, LinkedBracket, LinkedOrder, OrderConfiguration};
pub use on_fill::{ClientExtensions, OnFillBody, OnFillOrder, PriceLeg};
pub use types::{BracketIntent, BracketLevels};

use serde::Serialize;

/// Which bracket-order idiom the target venue speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketIdiom {
    /// One parent order with protective sub-orders attached on fill
    OnFill,
    /// Entry, take-profit, and stop-loss as three linked orders
    LinkedTriple,
}

/// Venue-tagged bracket payload
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum VenuePayload {
    OnFill(OnFillOrder),
    LinkedTriple(LinkedBracket),
}

/// Shape an intent for the given idiom
pub fn shape(intent: &BracketIntent, idiom: BracketIdiom) -> VenuePayload {
    match idiom {
        BracketIdiom::OnFill => VenuePayload::OnFill(on_fill::shape_on_fill(intent)),
        BracketIdiom::LinkedTriple => VenuePayload::LinkedTriple(linked::shape_linked(intent)),
    }
}
