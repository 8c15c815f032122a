//! # Primal Heuristics
//!
//! A diving heuristic run before the main search. It explores a copy of the problem with its own
//! identity, fixing columns to the value that helps the majority of rows, under a small node
//! budget. Improvements on the copy are announced under the copy's identity; the caller decides
//! whether to transfer the best one to the original problem.

use crate::{
    model::Problem,
    search::{Budget, Preference, Search, Stop},
    Events, Incumbent,
};

/// Outcome of a dive
#[derive(Debug)]
pub(crate) struct Dive {
    /// The best solution found on the copy
    pub best: Option<Incumbent>,
    /// The dive explored the whole tree, so `best` is optimal or the problem infeasible
    pub complete: bool,
}

pub(crate) fn dive(
    problem: &Problem,
    budget: &mut Budget<'_>,
    max_nodes: u64,
    events: &mut Events<'_, '_>,
) -> Dive {
    let sub = problem.sub_problem();
    let mut sub_budget = budget.sub_budget(max_nodes);
    let mut search = Search::new(&sub.model, Preference::Locks);
    let mut best = None;
    let stop = search.run(&mut sub_budget, &mut |values, objective| {
        events.incumbent(sub.id, objective);
        best = Some(Incumbent {
            values: values.to_vec(),
            objective,
        });
    });
    budget.charge(sub_budget.nodes);
    tracing::debug!(problem = %sub.id, nodes = sub_budget.nodes, ?stop, "dive finished");
    Dive {
        best,
        complete: stop == Stop::Complete,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use maxsat_ilp::types::LinearConstraint;

    use super::dive;
    use crate::{model::Problem, search::Budget, Events};

    fn covering() -> Problem {
        let mut problem = Problem::new();
        let x = problem.model.add_col("x", 0., 1., 2.).unwrap();
        let y = problem.model.add_col("y", 0., 1., 3.).unwrap();
        let mut constr = LinearConstraint::new("c");
        constr.add_term(x, 1.);
        constr.add_term(y, 1.);
        constr.set_lhs(1.);
        problem.model.add_row(constr).unwrap();
        problem
    }

    #[test]
    fn complete_dive() {
        let problem = covering();
        let interrupt = AtomicBool::new(false);
        let mut budget = Budget::new(None, None, &interrupt);
        let mut events = Events::default();
        let result = dive(&problem, &mut budget, 100, &mut events);
        assert!(result.complete);
        assert_eq!(result.best.unwrap().objective, 2.);
        assert!(budget.nodes > 0);
    }

    #[test]
    fn dive_budget() {
        let problem = covering();
        let interrupt = AtomicBool::new(false);
        let mut budget = Budget::new(None, None, &interrupt);
        let mut events = Events::default();
        let result = dive(&problem, &mut budget, 1, &mut events);
        assert!(!result.complete);
        assert_eq!(budget.nodes, 1);
    }
}
