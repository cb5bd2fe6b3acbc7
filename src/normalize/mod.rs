//! Normalization of extraction output
//!
//! - [`normalize_detail`] / [`normalize_listing`]: the input-adapter boundary
//!   between untyped backend payloads and the typed model
//! - [`normalize_date`]: free-form date text to `YYYY-MM-DD`

mod date;
mod record;

pub use date::normalize_date;
pub use record::{normalize_detail, normalize_listing, DetailContext, ListingPage, Normalized};
