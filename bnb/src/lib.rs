//! # maxsat-ilp-bnb - A 0-1 Branch-and-Bound Backend for maxsat-ilp
//!
//! A self-contained MIP solver for models whose columns take at most two integral values, as
//! produced by the [maxsat-ilp](https://docs.rs/maxsat-ilp) encoder. It is fully implemented in
//! Rust and needs no native library.
//!
//! The solver runs a depth-first branch and bound with bound propagation on the linear rows.
//! Before the main search, a diving heuristic explores an internal copy of the problem. The copy
//! has its own [`ProblemId`], so incumbent callbacks can tell its improvements apart from those of
//! the original problem.
//!
//! The search runs on a separate worker thread, which is where attached callbacks are called.
//!
//! ```
//! use maxsat_ilp::{solvers::{Mip, MipStatus}, types::LinearConstraint};
//! use maxsat_ilp_bnb::Solver;
//!
//! let mut solver = Solver::default();
//! let x = solver.new_binary("x", 2.).unwrap();
//! let y = solver.new_binary("y", 3.).unwrap();
//! let mut constr = LinearConstraint::new("cover");
//! constr.add_term(x, 1.);
//! constr.add_term(y, 1.);
//! constr.set_lhs(1.);
//! solver.add_linear(constr).unwrap();
//! assert_eq!(solver.solve().unwrap(), MipStatus::Optimal);
//! assert_eq!(solver.best_objective(), Some(2.));
//! assert_eq!(solver.var_val(x).unwrap(), 1.);
//! ```

#![warn(clippy::pedantic)]
#![warn(missing_docs)]

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use cpu_time::ProcessTime;
use maxsat_ilp::{
    solvers::{
        ForwardMessages, IncumbentCallback, IncumbentEvent, Interrupt, InterruptSolver, LimitNodes,
        LimitTime, MessageCallback, MessageLevel, Mip, MipStatus, ProblemId, ReportIncumbents,
        SolveMightFail, SolveStats, SolverError, SolverState, SolverStats,
    },
    types::{LinearConstraint, Var},
};

mod heuristics;
mod model;
mod search;

use model::Problem;
use search::{Budget, Preference, Search, Stop};

/// The default node budget of the diving heuristic
pub const DEFAULT_DIVE_NODES: u64 = 10_000;

/// A solution of the original problem
#[derive(Clone, Debug)]
pub(crate) struct Incumbent {
    pub values: Vec<f64>,
    pub objective: f64,
}

/// Access to the attached callbacks from the search thread
#[derive(Default)]
pub(crate) struct Events<'a, 'cb> {
    incumbent_cb: Option<&'a mut IncumbentCallback<'cb>>,
    message_cb: Option<&'a mut MessageCallback<'cb>>,
}

impl Events<'_, '_> {
    pub fn incumbent(&mut self, problem: ProblemId, objective: f64) {
        tracing::trace!(%problem, objective, "improved incumbent");
        if let Some(cb) = &mut self.incumbent_cb {
            cb(&IncumbentEvent { problem, objective });
        }
    }

    pub fn message(&mut self, level: MessageLevel, msg: &str) {
        tracing::debug!(?level, "{msg}");
        if let Some(cb) = &mut self.message_cb {
            cb(level, msg);
        }
    }
}

#[derive(Debug)]
struct RunConfig {
    deadline: Option<Instant>,
    node_limit: Option<u64>,
    heuristics: bool,
    dive_nodes: u64,
}

#[derive(Debug)]
struct RunResult {
    status: MipStatus,
    best: Option<Incumbent>,
    nodes: u64,
    n_incumbents: usize,
}

/// The branch-and-bound solver type
pub struct Solver<'cb> {
    problem: Problem,
    state: SolverState,
    status: MipStatus,
    best: Option<Incumbent>,
    time_limit: Option<Duration>,
    node_limit: Option<u64>,
    heuristics: bool,
    dive_nodes: u64,
    interrupt: Arc<AtomicBool>,
    incumbent_cb: Option<IncumbentCallback<'cb>>,
    message_cb: Option<MessageCallback<'cb>>,
    stats: SolverStats,
}

impl Default for Solver<'_> {
    fn default() -> Self {
        Self {
            problem: Problem::new(),
            state: SolverState::Input,
            status: MipStatus::Unsolved,
            best: None,
            time_limit: None,
            node_limit: None,
            heuristics: true,
            dive_nodes: DEFAULT_DIVE_NODES,
            interrupt: Arc::new(AtomicBool::new(false)),
            incumbent_cb: None,
            message_cb: None,
            stats: SolverStats::default(),
        }
    }
}

impl Solver<'_> {
    /// Enables or disables the diving heuristic
    pub fn set_heuristics(&mut self, enabled: bool) {
        self.heuristics = enabled;
    }

    /// Sets the node budget of the diving heuristic
    pub fn set_dive_nodes(&mut self, nodes: u64) {
        self.dive_nodes = nodes;
    }

    /// Gets the name a column was created with
    #[must_use]
    pub fn var_name(&self, var: Var) -> Option<&str> {
        self.problem
            .model
            .cols
            .get(var.idx())
            .map(|col| col.name.as_str())
    }

    fn check_input(&self) -> SolveMightFail {
        if self.state != SolverState::Input {
            return Err(SolverError::State(self.state, SolverState::Input));
        }
        Ok(())
    }
}

impl Mip for Solver<'_> {
    fn signature(&self) -> &'static str {
        concat!("maxsat-ilp-bnb ", env!("CARGO_PKG_VERSION"))
    }

    fn problem_id(&self) -> ProblemId {
        self.problem.id
    }

    fn new_var(&mut self, name: &str, lb: f64, ub: f64, obj: f64) -> Result<Var, SolverError> {
        self.check_input()?;
        self.problem.model.add_col(name, lb, ub, obj)
    }

    fn add_obj_coef(&mut self, var: Var, delta: f64) -> SolveMightFail {
        self.check_input()?;
        self.problem.model.add_obj(var, delta)
    }

    fn add_linear(&mut self, constr: LinearConstraint) -> SolveMightFail {
        self.check_input()?;
        self.problem.model.add_row(constr)
    }

    fn solve(&mut self) -> Result<MipStatus, SolverError> {
        let start = ProcessTime::now();
        let cfg = RunConfig {
            deadline: self.time_limit.map(|limit| Instant::now() + limit),
            node_limit: self.node_limit,
            heuristics: self.heuristics,
            dive_nodes: self.dive_nodes,
        };
        let problem = &self.problem;
        let interrupt = &*self.interrupt;
        let mut events = Events {
            incumbent_cb: self.incumbent_cb.as_mut(),
            message_cb: self.message_cb.as_mut(),
        };
        let result = thread::scope(|scope| {
            scope
                .spawn(|| run(problem, &cfg, interrupt, &mut events))
                .join()
        });
        self.interrupt.store(false, Ordering::Relaxed);
        self.state = SolverState::Solved;
        self.stats.cpu_solve_time += start.elapsed();
        let result =
            result.map_err(|_| SolverError::Api("search thread panicked".to_owned()))?;
        self.status = result.status;
        self.best = result.best;
        self.stats.n_nodes += result.nodes;
        self.stats.n_incumbents += result.n_incumbents;
        tracing::debug!(
            status = %self.status,
            nodes = result.nodes,
            objective = ?self.best_objective(),
            "search finished"
        );
        Ok(self.status)
    }

    fn status(&self) -> MipStatus {
        self.status
    }

    fn var_val(&self, var: Var) -> Result<f64, SolverError> {
        let best = self
            .best
            .as_ref()
            .ok_or_else(|| SolverError::Api("no solution available".to_owned()))?;
        best.values
            .get(var.idx())
            .copied()
            .ok_or_else(|| SolverError::Api(format!("unknown column {var}")))
    }

    fn best_objective(&self) -> Option<f64> {
        self.best.as_ref().map(|best| best.objective)
    }

    fn n_vars(&self) -> usize {
        self.problem.model.cols.len()
    }

    fn n_constraints(&self) -> usize {
        self.problem.model.rows.len()
    }
}

/// Runs the heuristic and the main search on the worker thread
fn run(
    problem: &Problem,
    cfg: &RunConfig,
    interrupt: &AtomicBool,
    events: &mut Events<'_, '_>,
) -> RunResult {
    let model = &problem.model;
    let mut budget = Budget::new(cfg.node_limit, cfg.deadline, interrupt);
    let mut best: Option<Incumbent> = None;
    let mut n_incumbents = 0;
    events.message(
        MessageLevel::Info,
        &format!(
            "solving 0-1 program with {} columns and {} rows",
            model.cols.len(),
            model.rows.len()
        ),
    );
    if !model.integral_objective() {
        events.message(
            MessageLevel::Warning,
            "objective coefficients are not integral, pruning is weaker",
        );
    }
    if cfg.heuristics {
        let dive = heuristics::dive(problem, &mut budget, cfg.dive_nodes, events);
        if let Some(found) = dive.best {
            events.message(
                MessageLevel::Info,
                &format!("diving heuristic found a solution of value {}", found.objective),
            );
            events.incumbent(problem.id, found.objective);
            n_incumbents += 1;
            best = Some(found);
        }
        if dive.complete {
            return RunResult {
                status: if best.is_some() {
                    MipStatus::Optimal
                } else {
                    MipStatus::Infeasible
                },
                best,
                nodes: budget.nodes,
                n_incumbents,
            };
        }
    }
    let mut search = Search::new(model, Preference::Objective);
    if let Some(found) = &best {
        search.set_cutoff(found.objective);
    }
    let stop = search.run(&mut budget, &mut |values, objective| {
        events.incumbent(problem.id, objective);
        n_incumbents += 1;
        best = Some(Incumbent {
            values: values.to_vec(),
            objective,
        });
    });
    if let Some(row) = search.root_conflict() {
        events.message(
            MessageLevel::Info,
            &format!(
                "constraint {} cannot be satisfied after root propagation",
                model.rows[row].name
            ),
        );
    }
    let status = match stop {
        Stop::Complete if best.is_some() => MipStatus::Optimal,
        Stop::Complete => MipStatus::Infeasible,
        Stop::Limit(status) => status,
    };
    RunResult {
        status,
        best,
        nodes: budget.nodes,
        n_incumbents,
    }
}

impl<'cb> ReportIncumbents<'cb> for Solver<'cb> {
    /// Sets a callback that is called for every improving solution, on the search thread.
    ///
    /// # Examples
    ///
    /// Collect the objective values of the original problem.
    ///
    /// ```
    /// use maxsat_ilp::solvers::{Mip, ReportIncumbents};
    /// use maxsat_ilp_bnb::Solver;
    ///
    /// let mut found = Vec::new();
    ///
    /// {
    ///     let found = &mut found;
    ///     let mut solver = Solver::default();
    ///     let origin = solver.problem_id();
    ///     solver.new_binary("x", -1.).unwrap();
    ///     solver.attach_incumbent_reporter(move |event| {
    ///         if event.problem == origin {
    ///             found.push(event.objective);
    ///         }
    ///     });
    ///     solver.solve().unwrap();
    /// }
    ///
    /// assert_eq!(found.last(), Some(&-1.));
    /// ```
    fn attach_incumbent_reporter<CB>(&mut self, cb: CB)
    where
        CB: FnMut(&IncumbentEvent) + Send + 'cb,
    {
        self.incumbent_cb = Some(Box::new(cb));
    }

    fn detach_incumbent_reporter(&mut self) {
        self.incumbent_cb = None;
    }
}

impl<'cb> ForwardMessages<'cb> for Solver<'cb> {
    fn attach_messenger<CB>(&mut self, cb: CB)
    where
        CB: FnMut(MessageLevel, &str) + Send + 'cb,
    {
        self.message_cb = Some(Box::new(cb));
    }

    fn detach_messenger(&mut self) {
        self.message_cb = None;
    }
}

impl Interrupt for Solver<'_> {
    type Interrupter = Interrupter;
    fn interrupter(&mut self) -> Self::Interrupter {
        Interrupter {
            flag: Arc::clone(&self.interrupt),
        }
    }
}

/// An Interrupter for the branch-and-bound solver
#[derive(Clone, Debug)]
pub struct Interrupter {
    flag: Arc<AtomicBool>,
}

impl InterruptSolver for Interrupter {
    fn interrupt(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

impl LimitTime for Solver<'_> {
    fn limit_time(&mut self, limit: Option<Duration>) -> SolveMightFail {
        self.time_limit = limit;
        Ok(())
    }
}

impl LimitNodes for Solver<'_> {
    fn limit_nodes(&mut self, limit: Option<u64>) -> SolveMightFail {
        self.node_limit = limit;
        Ok(())
    }
}

impl SolveStats for Solver<'_> {
    fn stats(&self) -> SolverStats {
        let mut stats = self.stats.clone();
        stats.n_vars = self.n_vars();
        stats.n_constraints = self.n_constraints();
        stats
    }
}
