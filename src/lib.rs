// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Seedbed
//!
//! Declarative provisioning and teardown of example resource graphs.
//!
//! ## Overview
//!
//! A document names an ordered list of resources (locations, systems,
//! assets, test results and more). Seedbed creates them against a resource
//! service in declared order and can later remove them again:
//!
//! - Resources refer to earlier ones with `${id_reference}` placeholders
//! - Provisioning is idempotent: existing resources are found and reused
//! - Teardown walks in reverse and only touches resources carrying the
//!   document's cleanup tag
//! - Every run produces a [`RunReport`] with one result per resource
//!
//! ## Modules
//!
//! - [`config`]: Document loading, validation and settings
//! - [`api`]: Transport contract and the HTTP client
//! - [`adapters`]: Per-type create, lookup and delete logic
//! - [`engine`]: Reference resolution, provisioning and teardown walks
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! format_version: "1.0"
//! name: bench-lab
//! title: Bench lab
//! resources:
//!   - type: location
//!     name: Lab
//!     id_reference: lab
//!     properties:
//!       description: Main lab
//!   - type: system
//!     name: Bench
//!     id_reference: bench
//!     properties:
//!       location_id: "${lab}"
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod adapters;
pub mod api;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;

#[cfg(test)]
mod test_support;

// ============================================================================
// Re-exports
// ============================================================================

pub use adapters::{adapter_for, AdapterContext, CreateOutcome, DeleteOutcome, ResourceAdapter};
pub use api::{ApiClient, ApiRequest, OfflineExecutor, RequestExecutor};
pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{Document, DocumentLoader, DocumentValidator, ResourceDecl, ResourceType, Settings};
pub use engine::{Engine, LookupFailurePolicy, RunAborted, RunOptions, RunReport};
pub use error::{Result, SeedbedError};
