//! # Depth-First Branch and Bound
//!
//! Iterative depth-first search over the column domains. Every node propagates the rows whose
//! columns changed: a row whose maximal activity falls short of its left hand side (or whose
//! minimal activity exceeds its right hand side) is a conflict, and a column that cannot move
//! away from its best contribution without causing such a conflict is fixed.
//!
//! The objective bound of a node is the objective with every unfixed column at its cheaper value.
//! Nodes whose bound cannot beat the incumbent are pruned.

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Instant,
};

use maxsat_ilp::solvers::MipStatus;

use crate::model::{Model, EPS};

/// How often, in nodes, the wall clock is checked
const CLOCK_INTERVAL: u64 = 64;

/// Which value of a column is explored first
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Preference {
    /// The value with the cheaper objective contribution
    Objective,
    /// The value that helps more rows, falling back to the objective for columns with cost
    Locks,
}

/// Why a search returned
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Stop {
    /// The whole tree was explored
    Complete,
    /// A resource limit was hit
    Limit(MipStatus),
}

/// Node, time and interrupt limits shared by all searches of one solve call
#[derive(Debug)]
pub(crate) struct Budget<'a> {
    pub nodes: u64,
    node_limit: Option<u64>,
    deadline: Option<Instant>,
    interrupt: &'a AtomicBool,
}

impl<'a> Budget<'a> {
    pub fn new(node_limit: Option<u64>, deadline: Option<Instant>, interrupt: &'a AtomicBool) -> Self {
        Budget {
            nodes: 0,
            node_limit,
            deadline,
            interrupt,
        }
    }

    /// A budget of at most `nodes` nodes that also respects this budget's limits
    pub fn sub_budget(&self, nodes: u64) -> Budget<'a> {
        let nodes = self
            .node_limit
            .map_or(nodes, |limit| limit.saturating_sub(self.nodes).min(nodes));
        Budget {
            nodes: 0,
            node_limit: Some(nodes),
            deadline: self.deadline,
            interrupt: self.interrupt,
        }
    }

    /// Accounts for nodes spent in a sub budget
    pub fn charge(&mut self, nodes: u64) {
        self.nodes += nodes;
    }

    fn exhausted(&self) -> Option<MipStatus> {
        if self.interrupt.load(Ordering::Relaxed) {
            return Some(MipStatus::Interrupted);
        }
        if self.node_limit.is_some_and(|limit| self.nodes >= limit) {
            return Some(MipStatus::NodeLimit);
        }
        if self.nodes % CLOCK_INTERVAL == 0
            && self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
        {
            return Some(MipStatus::TimeLimit);
        }
        None
    }
}

#[derive(Debug)]
struct Frame {
    /// Trail length before the branching decision
    mark: usize,
    col: usize,
    /// The value still to be explored
    alt: Option<f64>,
}

/// Search state over one model
#[derive(Debug)]
pub(crate) struct Search<'m> {
    model: &'m Model,
    lo: Vec<f64>,
    hi: Vec<f64>,
    /// Column and domain before it was fixed
    trail: Vec<(usize, f64, f64)>,
    /// Objective with all unfixed columns at their cheaper value
    bound: f64,
    queue: Vec<usize>,
    in_queue: Vec<bool>,
    pref: Preference,
    /// Per column, the number of rows preferring the upper and the lower value
    locks: Vec<(u32, u32)>,
    integral: bool,
    best: Option<f64>,
    /// The row of the last conflict
    conflict: Option<usize>,
    /// A row found infeasible before any branching
    root_conflict: Option<usize>,
}

impl<'m> Search<'m> {
    pub fn new(model: &'m Model, pref: Preference) -> Self {
        let lo: Vec<f64> = model.cols.iter().map(|c| c.lb).collect();
        let hi: Vec<f64> = model.cols.iter().map(|c| c.ub).collect();
        let bound = model
            .cols
            .iter()
            .map(|c| c.obj * if c.obj > 0. { c.lb } else { c.ub })
            .sum();
        let locks = if pref == Preference::Locks {
            count_locks(model)
        } else {
            Vec::new()
        };
        Search {
            model,
            lo,
            hi,
            trail: Vec::new(),
            bound,
            queue: Vec::new(),
            in_queue: vec![false; model.rows.len()],
            pref,
            locks,
            integral: model.integral_objective(),
            best: None,
            conflict: None,
            root_conflict: None,
        }
    }

    /// Only solutions strictly better than `objective` are of interest
    pub fn set_cutoff(&mut self, objective: f64) {
        self.best = Some(objective);
    }

    /// The row that made the model infeasible during root propagation, if any
    pub fn root_conflict(&self) -> Option<usize> {
        self.root_conflict
    }

    fn prunes(&self) -> bool {
        match self.best {
            None => false,
            Some(best) if self.integral => self.bound > best - 1. + 1e-6,
            Some(best) => self.bound >= best - EPS,
        }
    }

    /// Fixes a column. Returns `false` if the value is outside of the column's domain.
    fn fix(&mut self, col: usize, val: f64) -> bool {
        let (lo, hi) = (self.lo[col], self.hi[col]);
        if val < lo - EPS || val > hi + EPS {
            return false;
        }
        if lo == hi {
            return true;
        }
        let model = self.model;
        self.trail.push((col, lo, hi));
        let obj = model.cols[col].obj;
        self.bound += obj * val - obj * if obj > 0. { lo } else { hi };
        self.lo[col] = val;
        self.hi[col] = val;
        for &row in &model.occurs[col] {
            if !self.in_queue[row] {
                self.in_queue[row] = true;
                self.queue.push(row);
            }
        }
        true
    }

    fn undo_to(&mut self, mark: usize) {
        while self.trail.len() > mark {
            let Some((col, lo, hi)) = self.trail.pop() else {
                break;
            };
            let obj = self.model.cols[col].obj;
            self.bound -= obj * self.lo[col] - obj * if obj > 0. { lo } else { hi };
            self.lo[col] = lo;
            self.hi[col] = hi;
        }
        self.clear_queue();
    }

    fn clear_queue(&mut self) {
        for row in self.queue.drain(..) {
            self.in_queue[row] = false;
        }
    }

    /// Propagates all queued rows. Returns `false` on conflict.
    fn propagate(&mut self) -> bool {
        while let Some(row) = self.queue.pop() {
            self.in_queue[row] = false;
            if !self.propagate_row(row) {
                self.conflict = Some(row);
                self.clear_queue();
                return false;
            }
        }
        true
    }

    fn propagate_row(&mut self, row: usize) -> bool {
        let model = self.model;
        let row = &model.rows[row];
        let (mut min_act, mut max_act) = (0., 0.);
        for &(col, coef) in &row.terms {
            if coef > 0. {
                min_act += coef * self.lo[col];
                max_act += coef * self.hi[col];
            } else {
                min_act += coef * self.hi[col];
                max_act += coef * self.lo[col];
            }
        }
        if max_act < row.lhs - EPS || min_act > row.rhs + EPS {
            return false;
        }
        for &(col, coef) in &row.terms {
            let (lo, hi) = (self.lo[col], self.hi[col]);
            if lo == hi {
                continue;
            }
            let width = coef.abs() * (hi - lo);
            if max_act - width < row.lhs - EPS {
                self.fix(col, if coef > 0. { hi } else { lo });
                min_act += width;
            } else if min_act + width > row.rhs + EPS {
                self.fix(col, if coef > 0. { lo } else { hi });
                max_act -= width;
            }
        }
        max_act >= row.lhs - EPS && min_act <= row.rhs + EPS
    }

    /// The first unfixed column at or after `from`. All columns before the last branching
    /// column are fixed, so the scan can start after it.
    fn first_unfixed(&self, from: usize) -> Option<usize> {
        (from..self.lo.len()).find(|&col| self.lo[col] != self.hi[col])
    }

    /// The value to explore first and the alternative
    fn branch_values(&self, col: usize) -> (f64, f64) {
        let (lo, hi) = (self.lo[col], self.hi[col]);
        let obj = self.model.cols[col].obj;
        let up = match self.pref {
            Preference::Objective => obj < 0.,
            Preference::Locks if obj != 0. => obj < 0.,
            Preference::Locks => {
                let (up, down) = self.locks[col];
                up > down
            }
        };
        if up {
            (hi, lo)
        } else {
            (lo, hi)
        }
    }

    /// Runs the search. `on_improve` is called with the column values and objective of every
    /// improving solution.
    pub fn run(&mut self, budget: &mut Budget<'_>, on_improve: &mut dyn FnMut(&[f64], f64)) -> Stop {
        self.undo_to(0);
        for row in 0..self.model.rows.len() {
            self.in_queue[row] = true;
            self.queue.push(row);
        }
        if !self.propagate() {
            self.root_conflict = self.conflict;
            return Stop::Complete;
        }
        let mut stack: Vec<Frame> = Vec::new();
        let mut consistent = true;
        loop {
            if consistent {
                if let Some(status) = budget.exhausted() {
                    return Stop::Limit(status);
                }
                budget.nodes += 1;
                if !self.prunes() {
                    let from = stack.last().map_or(0, |frame| frame.col + 1);
                    if let Some(col) = self.first_unfixed(from) {
                        let (first, alt) = self.branch_values(col);
                        stack.push(Frame {
                            mark: self.trail.len(),
                            col,
                            alt: Some(alt),
                        });
                        consistent = self.fix(col, first) && self.propagate();
                        continue;
                    }
                    debug_assert!(self.model.is_feasible(&self.lo));
                    let objective = self.model.objective(&self.lo);
                    self.best = Some(objective);
                    on_improve(&self.lo, objective);
                }
            }
            // backtrack to the deepest open alternative
            consistent = false;
            while let Some(frame) = stack.last_mut() {
                let (mark, col, alt) = (frame.mark, frame.col, frame.alt.take());
                self.undo_to(mark);
                match alt {
                    Some(val) => {
                        if self.fix(col, val) && self.propagate() {
                            consistent = true;
                            break;
                        }
                    }
                    None => {
                        stack.pop();
                    }
                }
            }
            if !consistent {
                return Stop::Complete;
            }
        }
    }
}

/// Counts for each column how many row sides prefer its upper and its lower value
fn count_locks(model: &Model) -> Vec<(u32, u32)> {
    let mut locks = vec![(0, 0); model.cols.len()];
    for row in &model.rows {
        for &(col, coef) in &row.terms {
            let entry: &mut (u32, u32) = &mut locks[col];
            if row.lhs > f64::NEG_INFINITY {
                if coef > 0. {
                    entry.0 += 1;
                } else {
                    entry.1 += 1;
                }
            }
            if row.rhs < f64::INFINITY {
                if coef > 0. {
                    entry.1 += 1;
                } else {
                    entry.0 += 1;
                }
            }
        }
    }
    locks
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use maxsat_ilp::{
        solvers::MipStatus,
        types::{LinearConstraint, Var},
    };

    use super::{Budget, Preference, Search, Stop};
    use crate::model::Model;

    /// Clause `x + (1 - y) >= 1` style rows over binary columns
    fn clause(model: &mut Model, name: &str, lits: &[i32]) {
        let mut constr = LinearConstraint::new(name);
        let mut n_neg = 0.;
        for &l in lits {
            let var = Var::new(l.unsigned_abs() - 1);
            if l > 0 {
                constr.add_term(var, 1.);
            } else {
                constr.add_term(var, -1.);
                n_neg += 1.;
            }
        }
        constr.set_lhs(1. - n_neg);
        model.add_row(constr).unwrap();
    }

    fn binaries(objs: &[f64]) -> Model {
        let mut model = Model::default();
        for (idx, &obj) in objs.iter().enumerate() {
            model.add_col(&format!("x{idx}"), 0., 1., obj).unwrap();
        }
        model
    }

    fn solve(model: &Model, pref: Preference) -> (Stop, Vec<(Vec<f64>, f64)>) {
        let interrupt = AtomicBool::new(false);
        let mut budget = Budget::new(None, None, &interrupt);
        let mut search = Search::new(model, pref);
        let mut found = Vec::new();
        let stop = search.run(&mut budget, &mut |vals, obj| found.push((vals.to_vec(), obj)));
        (stop, found)
    }

    #[test]
    fn minimizes() {
        // at least two of three, costs 3, 1, 2
        let mut model = binaries(&[3., 1., 2.]);
        clause(&mut model, "a", &[1, 2]);
        clause(&mut model, "b", &[2, 3]);
        clause(&mut model, "c", &[1, 3]);
        for pref in [Preference::Objective, Preference::Locks] {
            let (stop, found) = solve(&model, pref);
            assert_eq!(stop, Stop::Complete);
            let (vals, obj) = found.last().unwrap();
            assert_eq!(*obj, 3.);
            assert_eq!(vals, &vec![0., 1., 1.]);
            assert!(found.windows(2).all(|w| w[1].1 < w[0].1));
        }
    }

    #[test]
    fn infeasible() {
        let mut model = binaries(&[0.]);
        clause(&mut model, "a", &[1]);
        clause(&mut model, "b", &[-1]);
        let interrupt = AtomicBool::new(false);
        let mut budget = Budget::new(None, None, &interrupt);
        let mut search = Search::new(&model, Preference::Objective);
        let stop = search.run(&mut budget, &mut |_, _| panic!("no solution expected"));
        assert_eq!(stop, Stop::Complete);
        assert!(search.root_conflict().is_some());
    }

    #[test]
    fn infeasible_after_branching() {
        let mut model = binaries(&[0., 0.]);
        clause(&mut model, "a", &[1, 2]);
        clause(&mut model, "b", &[-1, 2]);
        clause(&mut model, "c", &[1, -2]);
        clause(&mut model, "d", &[-1, -2]);
        let (stop, found) = solve(&model, Preference::Objective);
        assert_eq!(stop, Stop::Complete);
        assert!(found.is_empty());
    }

    #[test]
    fn fixed_columns() {
        let mut model = Model::default();
        model.add_col("one", 1., 1., 4.).unwrap();
        model.add_col("x", 0., 1., -4.).unwrap();
        let (stop, found) = solve(&model, Preference::Objective);
        assert_eq!(stop, Stop::Complete);
        assert_eq!(found.last().unwrap(), &(vec![1., 1.], 0.));
    }

    #[test]
    fn node_limit() {
        let mut model = binaries(&[1.; 6]);
        clause(&mut model, "a", &[1, 2, 3, 4, 5, 6]);
        let interrupt = AtomicBool::new(false);
        let mut budget = Budget::new(Some(3), None, &interrupt);
        let mut search = Search::new(&model, Preference::Objective);
        let stop = search.run(&mut budget, &mut |_, _| {});
        assert_eq!(stop, Stop::Limit(MipStatus::NodeLimit));
        assert_eq!(budget.nodes, 3);
    }

    #[test]
    fn interrupted() {
        let model = binaries(&[1., 1.]);
        let interrupt = AtomicBool::new(true);
        let mut budget = Budget::new(None, None, &interrupt);
        let mut search = Search::new(&model, Preference::Objective);
        let stop = search.run(&mut budget, &mut |_, _| {});
        assert_eq!(stop, Stop::Limit(MipStatus::Interrupted));
    }

    #[test]
    fn sub_budget_respects_parent() {
        let interrupt = AtomicBool::new(false);
        let mut budget = Budget::new(Some(10), None, &interrupt);
        budget.charge(7);
        let sub = budget.sub_budget(100);
        assert_eq!(sub.node_limit, Some(3));
        let unlimited = Budget::new(None, None, &interrupt);
        assert_eq!(unlimited.sub_budget(100).node_limit, Some(100));
    }

    #[test]
    fn cutoff_prunes() {
        let mut model = binaries(&[2., 3.]);
        clause(&mut model, "a", &[1, 2]);
        let interrupt = AtomicBool::new(false);
        let mut budget = Budget::new(None, None, &interrupt);
        let mut search = Search::new(&model, Preference::Objective);
        search.set_cutoff(2.);
        let mut found = 0;
        let stop = search.run(&mut budget, &mut |_, _| found += 1);
        assert_eq!(stop, Stop::Complete);
        assert_eq!(found, 0);
    }
}
