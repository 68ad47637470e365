// Veil - Data-dictionary-driven de-identification pipeline
// Copyright (c) 2025 Veil Contributors
// Licensed under the MIT License

//! # Veil - De-Identification Pipeline
//!
//! Veil copies patient-level records from relational source databases
//! into an anonymised research destination, driven entirely by a
//! human-edited data dictionary that declares, per source column,
//! whether and how to transform it.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Loading** and validating the data dictionary (the per-column policy)
//! - **Gathering** each patient's identifying values and compiling a
//!   per-patient scrubber for free-text redaction
//! - **Transforming** every source column per its declared decision,
//!   replacing patient identifiers with deterministic keyed pseudonyms
//! - **Writing** the anonymised copy with incremental change detection
//!
//! ## Architecture
//!
//! Veil follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`pipeline`] - Orchestration (two-phase patient protocol, markers, summary)
//! - [`dictionary`] - Data dictionary model, parsing and validation
//! - [`scrub`] - Per-patient scrubber compilation and matching
//! - [`pseudonym`] - Keyed pseudonym hashing
//! - [`transform`] - Field transform engine and content hashing
//! - [`adapters`] - Database integrations behind trait seams
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use veil::config::load_config;
//! use veil::pipeline::PipelineCoordinator;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("veil.toml")?;
//!     let coordinator = PipelineCoordinator::from_config(config)?;
//!
//!     let (_stop_tx, stop_rx) = watch::channel(false);
//!     let summary = coordinator.execute(stop_rx).await?;
//!
//!     println!("Wrote {} rows", summary.rows_written);
//!     Ok(())
//! }
//! ```
//!
//! ## Safety Model
//!
//! Veil's error taxonomy separates data quality from leakage risk. A row
//! whose value contradicts its declared datatype is skipped and counted;
//! a text column marked for scrubbing with no scrubber in scope halts
//! the whole run, because writing it verbatim would leak identifiers.
//! The run summary always reports the two separately.
//!
//! ## Determinism
//!
//! Pseudonyms are `HMAC-SHA256(key, identifier)`: stable across tables
//! and runs under a fixed key, infeasible to invert without it, and
//! regenerated wholesale when the key rotates.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod dictionary;
pub mod domain;
pub mod logging;
pub mod pipeline;
pub mod pseudonym;
pub mod scrub;
pub mod transform;
