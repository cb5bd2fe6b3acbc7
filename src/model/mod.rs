//! Domain entities shared by the whole harvesting pipeline
//!
//! Everything past the normalization boundary works on these fully-typed
//! values; loosely-shaped backend payloads never travel further than
//! [`crate::normalize`].

mod post;
mod section;

pub use post::{PostDate, PostDetail, PostSummary};
pub use section::{PageTarget, Section};
