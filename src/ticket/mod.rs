//! Deduplicating, serially drained fetch cache.

mod cache;
mod inspect;

pub use cache::{Ticket, TicketCache, TicketStatus};
pub use inspect::InspectCache;
