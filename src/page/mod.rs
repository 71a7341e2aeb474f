mod controller;
mod mutations;
mod sim;

pub use controller::{CheckReason, Enforcement, PageController};
pub use mutations::{observe, MutationBatch, MutationFeed, MutationObserver, ObserveOptions};
pub use sim::{HistoryEntry, SimulatedPage, WindowId};

use crate::intercept::Location;

pub trait Page: Location {
    fn stop_loading(&self);
    fn clear_document(&self);
    fn document_is_empty(&self) -> bool;
}
