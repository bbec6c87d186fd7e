#![warn(missing_debug_implementations)]
#![deny(non_ascii_idents)]
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]
#![deny(unit_bindings)]
#![warn(unused_crate_dependencies)]
#![warn(unused_qualifications)]

// Crate dependencies used in the binary or in tests but not in the library.
// Cargo does not yet allow declaring dependencies for binaries only.
use assert_approx_eq as _;
use humantime as _;
use tracing_subscriber as _;

pub mod agent;
pub mod heuristics;
pub mod level;
pub mod search;
pub mod state;

mod errors;
#[cfg(test)]
mod test_utils;

pub use errors::SolverError;
