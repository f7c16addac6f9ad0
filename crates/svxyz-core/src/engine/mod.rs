//! # Engine Module
//!
//! The frame filter at the heart of the triage tool, plus the shared machinery the
//! workflows are built on.
//!
//! ## Architecture
//!
//! - **Records** ([`record`]) - Per-frame field values (energy, forces, stress, virial,
//!   temperature, ...) with explicit `missing` / `unconvertible` outcomes, and the
//!   annotations embedded into written frames
//! - **Filter** ([`filter`]) - Validated ranges and species predicates, the ordered
//!   conjunction applied to records, the positional frame window and exact counts
//! - **Configuration** ([`config`]) - Validated triage settings built through a builder
//! - **Progress Monitoring** ([`progress`]) - Progress events for front ends
//! - **Error Handling** ([`error`]) - Errors surfaced by workflows

pub mod config;
pub mod error;
pub mod filter;
pub mod progress;
pub mod record;
