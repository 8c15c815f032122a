//! # Interfaces to MIP Solvers
//!
//! This module holds the interface through which the encoder talks to a mixed-integer
//! programming solver. The main element is the [`Mip`] trait that every solver backend
//! implements. Further capabilities, such as reporting improving solutions or interrupting a
//! running search, are exposed through separate traits so that backends only implement what they
//! support.
//!
//! All models are minimization problems.
//!
//! ## Available Solvers
//!
//! ### Branch and Bound
//!
//! A self-contained 0-1 branch-and-bound solver with bound propagation and a diving heuristic.
//! It is available through the `maxsat-ilp-bnb` crate.

use core::time::Duration;
use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use thiserror::Error;

use crate::types::{LinearConstraint, Var};

/// Trait for all MIP solvers usable by the encoder.
/// Solvers outside of this library can also implement this trait to be able to
/// use them with this library.
pub trait Mip {
    /// Gets a signature of the solver implementation
    fn signature(&self) -> &'static str;
    /// Gets the identity of the top-level problem held by this solver
    fn problem_id(&self) -> ProblemId;
    /// Creates a new integer column with bounds `lb..=ub` and objective coefficient `obj`
    ///
    /// # Errors
    ///
    /// If the bounds are invalid or the solver is not accepting input.
    fn new_var(&mut self, name: &str, lb: f64, ub: f64, obj: f64) -> Result<Var, SolverError>;
    /// Creates a new binary column with objective coefficient `obj`
    ///
    /// # Errors
    ///
    /// If the solver is not accepting input.
    fn new_binary(&mut self, name: &str, obj: f64) -> Result<Var, SolverError> {
        self.new_var(name, 0., 1., obj)
    }
    /// Adds `delta` to the objective coefficient of a column
    ///
    /// # Errors
    ///
    /// If the column is unknown or the solver is not accepting input.
    fn add_obj_coef(&mut self, var: Var, delta: f64) -> SolveMightFail;
    /// Adds a linear constraint to the model
    ///
    /// # Errors
    ///
    /// If the constraint references unknown columns or the solver is not accepting input.
    fn add_linear(&mut self, constr: LinearConstraint) -> SolveMightFail;
    /// Solves the model and returns the terminal status
    ///
    /// # Errors
    ///
    /// If the solver fails internally.
    fn solve(&mut self) -> Result<MipStatus, SolverError>;
    /// Gets the status of the last call to [`Mip::solve`]
    fn status(&self) -> MipStatus;
    /// Gets the value of a column in the best solution found
    ///
    /// # Errors
    ///
    /// If no solution is available or the column is unknown.
    fn var_val(&self, var: Var) -> Result<f64, SolverError>;
    /// Gets the objective value of the best solution found, if any
    fn best_objective(&self) -> Option<f64>;
    /// Gets the number of columns in the model
    fn n_vars(&self) -> usize;
    /// Gets the number of constraints in the model
    fn n_constraints(&self) -> usize;
}

/// Trait for all solvers that notify about improving solutions.
pub trait ReportIncumbents<'cb> {
    /// Attaches an incumbent callback to the solver. The callback is called every time the best
    /// known solution of any problem instance the solver works on improves, including internal
    /// clones of the model. It may be called from a different thread than the one calling
    /// [`Mip::solve`]. Only a single callback can be attached at any time, attaching a second
    /// callback drops the first one.
    fn attach_incumbent_reporter<CB>(&mut self, cb: CB)
    where
        CB: FnMut(&IncumbentEvent) + Send + 'cb;
    /// Detaches the incumbent callback
    fn detach_incumbent_reporter(&mut self);
}

/// Trait for all solvers that pass out their log messages via a callback.
pub trait ForwardMessages<'cb> {
    /// Attaches a message callback to the solver
    fn attach_messenger<CB>(&mut self, cb: CB)
    where
        CB: FnMut(MessageLevel, &str) + Send + 'cb;
    /// Detaches the message callback
    fn detach_messenger(&mut self);
}

/// Trait for all solvers that can be asynchronously interrupt.
pub trait Interrupt {
    /// The interrupter type of the solver
    type Interrupter: InterruptSolver + Send + 'static;
    /// Gets a thread safe interrupter object that can be used to terminate the solver
    fn interrupter(&mut self) -> Self::Interrupter;
}

/// A thread safe interrupter for a solver
pub trait InterruptSolver: Sync {
    /// Interrupts the solver asynchronously
    fn interrupt(&self);
}

/// Trait for all solvers that can limit their wall-clock solving time
pub trait LimitTime {
    /// Sets or removes a limit on the time spent in [`Mip::solve`]
    ///
    /// # Errors
    ///
    /// If the solver does not accept the limit.
    fn limit_time(&mut self, limit: Option<Duration>) -> SolveMightFail;
}

/// Trait for all solvers that can limit the number of search nodes
pub trait LimitNodes {
    /// Sets or removes a limit on the number of branch-and-bound nodes
    ///
    /// # Errors
    ///
    /// If the solver does not accept the limit.
    fn limit_nodes(&mut self, limit: Option<u64>) -> SolveMightFail;
}

/// Return type of solver calls that don't return but might fail
pub type SolveMightFail = Result<(), SolverError>;

/// Boxed incumbent callback as stored by solver backends
pub type IncumbentCallback<'a> = Box<dyn FnMut(&IncumbentEvent) + Send + 'a>;
/// Boxed message callback as stored by solver backends
pub type MessageCallback<'a> = Box<dyn FnMut(MessageLevel, &str) + Send + 'a>;

/// Process-unique identity of a problem instance. Every solver and every internal clone of a
/// model gets a fresh identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProblemId(u64);

impl ProblemId {
    /// Draws a new identity that is different from all previously drawn ones
    #[must_use]
    pub fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        ProblemId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ProblemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "problem#{}", self.0)
    }
}

/// Notification about an improved best solution
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IncumbentEvent {
    /// The problem instance whose best solution improved
    pub problem: ProblemId,
    /// The objective value of the new best solution
    pub objective: f64,
}

/// Severity of a forwarded solver message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageLevel {
    /// Informational output
    Info,
    /// Something the user should know about
    Warning,
}

/// Solver statistics
#[derive(Clone, Debug, PartialEq, Default)]
pub struct SolverStats {
    /// The number of branch-and-bound nodes explored, including heuristic ones
    pub n_nodes: u64,
    /// The number of improving solutions found for the top-level problem
    pub n_incumbents: usize,
    /// The number of columns in the model
    pub n_vars: usize,
    /// The number of constraints in the model
    pub n_constraints: usize,
    /// The total CPU time spent solving
    pub cpu_solve_time: Duration,
}

/// Trait for solvers that track certain statistics.
pub trait SolveStats {
    /// Gets the available statistics from the solver
    fn stats(&self) -> SolverStats;
    /// Gets the number of explored search nodes
    fn n_nodes(&self) -> u64 {
        self.stats().n_nodes
    }
    /// Gets the number of improving solutions found
    fn n_incumbents(&self) -> usize {
        self.stats().n_incumbents
    }
    /// Gets the total CPU time spent solving.
    fn cpu_solve_time(&self) -> Duration {
        self.stats().cpu_solve_time
    }
}

/// Terminal status of a solve call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MipStatus {
    /// The model has not been solved yet
    Unsolved,
    /// A solution was found and proven optimal
    Optimal,
    /// The model has no feasible solution
    Infeasible,
    /// The time limit was reached before the search finished
    TimeLimit,
    /// The node limit was reached before the search finished
    NodeLimit,
    /// The search was interrupted before it finished
    Interrupted,
}

impl fmt::Display for MipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MipStatus::Unsolved => write!(f, "UNSOLVED"),
            MipStatus::Optimal => write!(f, "OPTIMAL"),
            MipStatus::Infeasible => write!(f, "INFEASIBLE"),
            MipStatus::TimeLimit => write!(f, "TIME LIMIT"),
            MipStatus::NodeLimit => write!(f, "NODE LIMIT"),
            MipStatus::Interrupted => write!(f, "INTERRUPTED"),
        }
    }
}

/// States that a solver can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    /// Input state, while building the model
    Input,
    /// A solve call has finished
    Solved,
}

impl fmt::Display for SolverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverState::Input => write!(f, "INPUT"),
            SolverState::Solved => write!(f, "SOLVED"),
        }
    }
}

/// Type representing solver errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    /// An API with a description
    #[error("API error: {0}")]
    Api(String),
    /// The solver was expected to be in the second [`SolverState`], but it is in the first.
    #[error("solvers needs to be in state {1} but was in state {0}")]
    State(SolverState, SolverState),
}
