//! Tire Shop Core - Shared types library.
//!
//! This crate provides the domain vocabulary used across all tire shop components:
//! - `server` - Public storefront API and admin back-office API
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. This keeps business rules (quote totals, status lifecycles,
//! slug and reference-number generation, pagination arithmetic) testable in
//! isolation.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, emails, and statuses
//! - [`listing`] - Pagination and sort-column resolution
//! - [`pricing`] - Quote total computation
//! - [`reference`] - Human-facing quote/appointment numbers
//! - [`slug`] - URL slug generation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod listing;
pub mod pricing;
pub mod reference;
pub mod slug;
pub mod types;

pub use types::*;
