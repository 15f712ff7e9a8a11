//! Shared traits for the memview ecosystem.
//!
//! This crate provides the element-type oracle consulted by `memview` before
//! it accepts a view over caller-managed memory. External crates can depend
//! on `memview-traits` to implement [`Element`] for their own types without
//! orphan rule violations.

pub mod element;

pub use element::{is_reference_free, Element};
