//! Listing filtering and normalization
//!
//! Every raw ad passes the category's [`FilterPolicy`] first and the
//! [`Normalizer`] second. Both are pure and never touch the network or the
//! store.

pub mod filter;
pub mod normalize;

pub use filter::{Exclusion, FilterPolicy};
pub use normalize::{Normalizer, Rejection};
