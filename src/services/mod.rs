//! Service layer for the tracker.
//!
//! This module contains the I/O-facing collaborators of a poll cycle:
//! - Listing retrieval and validation (`ListingSource`, `HttpListingSource`)
//! - Report formatting and delivery (`Notifier`, `MessageSink`, `TelegramSink`)

mod fetcher;
mod notifier;

pub use fetcher::{HttpListingSource, Listing, ListingSource};
pub use notifier::{MessageSink, Notifier, TelegramSink};

#[cfg(test)]
pub(crate) use notifier::tests::RecordingSink;
