//! RocketShoes Core - Cart data model.
//!
//! This crate provides the types shared by the cart store and its consumers:
//! product identifiers, prices, catalog and stock records, and the cart itself.
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no storage
//! access, no HTTP clients. Every [`Cart`] operation computes a complete next
//! state and leaves the original untouched, so callers can validate and persist
//! before publishing anything.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids and prices, catalog records, and the cart

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
