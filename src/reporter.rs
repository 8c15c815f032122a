//! # Incumbent Reporter
//!
//! Prints an `o` line every time the solver improves the best solution of the top-level problem.
//! Solvers may work on internal clones of the model; their events carry a different
//! [`ProblemId`] and are dropped.
//!
//! The reporter runs on the solver's thread of control and never panics. Failing to write a
//! progress line is logged and otherwise ignored, since the final status is reported after the
//! solver returns anyway.

use std::io::Write;

use crate::{
    solvers::{IncumbentEvent, ProblemId},
    timer::Timer,
};

/// Everything the reporter needs to know about the run it reports on. Created once before
/// solving and moved into the callback.
#[derive(Clone, Copy, Debug)]
pub struct SolveContext {
    /// The top-level problem
    pub origin: ProblemId,
    /// The process timer
    pub timer: Timer,
}

/// Writes `o <objective> wctime=<s>s cputime=<s>s` lines for improving incumbents of the
/// top-level problem
#[derive(Debug)]
pub struct IncumbentReporter<W> {
    ctx: SolveContext,
    writer: W,
    last: Option<i64>,
}

impl<W: Write> IncumbentReporter<W> {
    /// Creates a reporter writing to `writer`
    pub fn new(ctx: SolveContext, writer: W) -> Self {
        IncumbentReporter {
            ctx,
            writer,
            last: None,
        }
    }

    /// Handles an incumbent event. Returns `true` if a line was written.
    pub fn report(&mut self, event: &IncumbentEvent) -> bool {
        if event.problem != self.ctx.origin {
            tracing::trace!(problem = %event.problem, "ignoring incumbent of internal problem");
            return false;
        }
        let objective = round(event.objective);
        if self.last.is_some_and(|last| objective >= last) {
            return false;
        }
        self.last = Some(objective);
        let wall = self.ctx.timer.wall_time().as_secs_f64();
        let cpu = self.ctx.timer.cpu_time().as_secs_f64();
        if let Err(err) = writeln!(
            self.writer,
            "o {objective} wctime={wall:.6}s cputime={cpu:.6}s"
        )
        .and_then(|()| self.writer.flush())
        {
            tracing::warn!("failed to write progress line: {err}");
            return false;
        }
        true
    }

    /// Gets the last reported objective value
    pub fn last(&self) -> Option<i64> {
        self.last
    }

    /// Consumes the reporter and returns the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Rounds half away from zero, saturating at the bounds of `i64`
#[allow(clippy::cast_possible_truncation)]
fn round(val: f64) -> i64 {
    val.round() as i64
}
