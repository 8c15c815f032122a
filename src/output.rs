//! # Result Output
//!
//! Renders the terminal solver status in the output format of the MaxSAT evaluations: exactly one
//! `s` line, followed by the assignment in `v` lines if an optimum was found.

use std::io::{self, Write};

use itertools::Itertools;
use thiserror::Error;

use crate::{
    encoding::Encoding,
    solvers::{Mip, MipStatus, SolverError},
};

/// The number of literals per `v` line
pub const LITS_PER_LINE: usize = 10;

/// Errors from writing the result
#[derive(Error, Debug)]
pub enum Error {
    /// Writing to the output failed
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// The solver did not provide a value
    #[error("solver error: {0}")]
    Solver(#[from] SolverError),
}

/// The reported outcome of a run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// `s OPTIMUM FOUND`
    Optimum,
    /// `s UNSATISFIABLE`
    Unsatisfiable,
    /// `s UNKNOWN`
    Unknown,
}

impl Outcome {
    /// Maps a solver status to the reported outcome
    #[must_use]
    pub fn from_status(status: MipStatus) -> Self {
        match status {
            MipStatus::Optimal => Outcome::Optimum,
            MipStatus::Infeasible => Outcome::Unsatisfiable,
            _ => Outcome::Unknown,
        }
    }

    /// The process exit code for the outcome
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Optimum | Outcome::Unsatisfiable => 0,
            Outcome::Unknown => 1,
        }
    }

    /// The status line text, without the `s ` prefix
    #[must_use]
    pub fn status_line(self) -> &'static str {
        match self {
            Outcome::Optimum => "OPTIMUM FOUND",
            Outcome::Unsatisfiable => "UNSATISFIABLE",
            Outcome::Unknown => "UNKNOWN",
        }
    }
}

/// Writes the status line and, on optimality, the assignment of DIMACS variables `1..=nv`
///
/// # Errors
///
/// If writing fails or the solver cannot provide a solution value.
pub fn write_result<W, M>(writer: &mut W, solver: &M, encoding: &Encoding) -> Result<Outcome, Error>
where
    W: Write,
    M: Mip,
{
    let status = solver.status();
    let outcome = Outcome::from_status(status);
    if outcome == Outcome::Unknown {
        writeln!(writer, "c solver status: {status}")?;
    }
    writeln!(writer, "s {}", outcome.status_line())?;
    if outcome == Outcome::Optimum {
        write_assignment(writer, &encoding.assignment(solver)?)?;
    }
    writer.flush()?;
    Ok(outcome)
}

/// Writes `v` lines for an assignment of DIMACS variables starting from 1
///
/// # Errors
///
/// If writing fails.
pub fn write_assignment<W: Write>(writer: &mut W, assignment: &[bool]) -> io::Result<()> {
    if assignment.is_empty() {
        return writeln!(writer, "v");
    }
    for chunk in &assignment
        .iter()
        .enumerate()
        .map(|(idx, &val)| if val { idx as i64 + 1 } else { -(idx as i64 + 1) })
        .chunks(LITS_PER_LINE)
    {
        writeln!(writer, "v {}", chunk.format(" "))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{write_assignment, Outcome};
    use crate::solvers::MipStatus;

    fn render(assignment: &[bool]) -> String {
        let mut out = Vec::new();
        write_assignment(&mut out, assignment).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn outcome_mapping() {
        assert_eq!(Outcome::from_status(MipStatus::Optimal), Outcome::Optimum);
        assert_eq!(
            Outcome::from_status(MipStatus::Infeasible),
            Outcome::Unsatisfiable
        );
        for status in [
            MipStatus::Unsolved,
            MipStatus::TimeLimit,
            MipStatus::NodeLimit,
            MipStatus::Interrupted,
        ] {
            assert_eq!(Outcome::from_status(status), Outcome::Unknown);
        }
        assert_eq!(Outcome::Optimum.exit_code(), 0);
        assert_eq!(Outcome::Unsatisfiable.exit_code(), 0);
        assert_eq!(Outcome::Unknown.exit_code(), 1);
    }

    #[test]
    fn short_assignment() {
        assert_eq!(render(&[true, false, true]), "v 1 -2 3\n");
    }

    #[test]
    fn wrapped_assignment() {
        let assignment: Vec<bool> = (0..23).map(|i| i % 2 == 0).collect();
        let out = render(&assignment);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "v 1 -2 3 -4 5 -6 7 -8 9 -10");
        assert_eq!(lines[1], "v 11 -12 13 -14 15 -16 17 -18 19 -20");
        assert_eq!(lines[2], "v 21 -22 23");
    }

    #[test]
    fn empty_assignment() {
        assert_eq!(render(&[]), "v\n");
    }
}
