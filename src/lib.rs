//! # maxsat-ilp - Weighted Partial MaxSAT via 0-1 Integer Linear Programming
//!
//! `maxsat-ilp` reads weighted partial MaxSAT instances in DIMACS CNF/WCNF format, encodes them
//! as 0-1 integer linear programs and hands them to a mixed-integer programming solver. Progress
//! and results are reported in the output format of the MaxSAT evaluations.
//!
//! The pipeline is strictly sequential: [`fio::dimacs::Parser`] streams clauses into an
//! [`encoding::IlpEncoder`] which populates any solver implementing [`solvers::Mip`]. While the
//! solver runs, a [`reporter::IncumbentReporter`] prints `o` lines for improving solutions of the
//! top-level problem. Once the solver returns, [`output::write_result`] prints the status and the
//! variable assignment.
//!
//! The default solver backend is the `maxsat-ilp-bnb` crate.
//!
//! ## Features
//!
//! | Feature name | Description |
//! | --- | --- |
//! | `compression` | Enable parsing `.gz`, `.bz2` and `.xz` compressed input. |
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! Currently, the MSRV is 1.76.0.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

pub mod encoding;
pub mod fio;
pub mod output;
pub mod reporter;
pub mod solvers;
pub mod timer;
pub mod types;

/// Creates a [`types::Lit`] from a DIMACS integer, panicking on `0`
///
/// Mostly useful in tests.
#[macro_export]
macro_rules! lit {
    ($l:expr) => {
        $crate::types::Lit::from_dimacs($l).expect("DIMACS literal must be non-zero")
    };
}

/// Creates a [`types::WClause`] from a cost and a list of DIMACS integers
///
/// # Examples
///
/// ```
/// use maxsat_ilp::{wclause, types::Cost};
///
/// let cl = wclause!(Cost::Soft(3); 1, -2);
/// assert_eq!(cl.len(), 2);
/// ```
#[macro_export]
macro_rules! wclause {
    ($cost:expr; $($l:expr),* $(,)?) => {
        $crate::types::WClause::new($cost, vec![$($crate::lit!($l)),*])
    };
}
