//! Core types and traits for the qrshort URL shortener.
//!
//! This crate holds the base-36 codec, the [`ShortCode`] identifier, the
//! error taxonomy and the [`LinkStore`] capability trait that every storage
//! backend implements.

pub mod base36;
pub mod error;
pub mod range;
pub mod record;
pub mod shortcode;
pub mod store;

pub use error::{CoreError, Result};
pub use range::{ListRange, MAX_LIST_WINDOW};
pub use record::{BulkItem, BulkRequest, ListEntry, UpsertMessage, UpsertOutcome, UpsertRespItem};
pub use shortcode::ShortCode;
pub use store::LinkStore;
