//! # Model Storage
//!
//! Columns with at most two integral values and linear rows with merged terms, plus the
//! column-to-row occurrence lists used by propagation.

use maxsat_ilp::{
    solvers::{ProblemId, SolverError},
    types::{LinearConstraint, Var},
};

/// Feasibility tolerance
pub(crate) const EPS: f64 = 1e-9;

#[derive(Clone, Debug)]
pub(crate) struct Column {
    pub name: String,
    pub lb: f64,
    pub ub: f64,
    pub obj: f64,
}

#[derive(Clone, Debug)]
pub(crate) struct Row {
    pub name: String,
    /// Column index and coefficient, sorted by column, no zero coefficients
    pub terms: Vec<(usize, f64)>,
    pub lhs: f64,
    pub rhs: f64,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Model {
    pub cols: Vec<Column>,
    pub rows: Vec<Row>,
    /// For each column, the rows it occurs in
    pub occurs: Vec<Vec<usize>>,
}

impl Model {
    pub fn add_col(&mut self, name: &str, lb: f64, ub: f64, obj: f64) -> Result<Var, SolverError> {
        if !lb.is_finite() || !ub.is_finite() || lb.fract() != 0. || ub.fract() != 0. {
            return Err(SolverError::Api(format!(
                "column {name} needs finite integral bounds, got [{lb}, {ub}]"
            )));
        }
        if ub < lb {
            return Err(SolverError::Api(format!(
                "column {name} has empty domain [{lb}, {ub}]"
            )));
        }
        if ub - lb > 1. {
            return Err(SolverError::Api(format!(
                "column {name} has domain [{lb}, {ub}], only columns with at most two values are supported"
            )));
        }
        if !obj.is_finite() {
            return Err(SolverError::Api(format!(
                "column {name} has non-finite objective coefficient {obj}"
            )));
        }
        let idx = u32::try_from(self.cols.len())
            .map_err(|_| SolverError::Api("too many columns".to_owned()))?;
        self.cols.push(Column {
            name: name.to_owned(),
            lb,
            ub,
            obj,
        });
        self.occurs.push(Vec::new());
        Ok(Var::new(idx))
    }

    pub fn add_obj(&mut self, var: Var, delta: f64) -> Result<(), SolverError> {
        if !delta.is_finite() {
            return Err(SolverError::Api(format!(
                "non-finite objective change {delta}"
            )));
        }
        let col = self
            .cols
            .get_mut(var.idx())
            .ok_or_else(|| SolverError::Api(format!("unknown column {var}")))?;
        col.obj += delta;
        Ok(())
    }

    pub fn add_row(&mut self, constr: LinearConstraint) -> Result<(), SolverError> {
        let (name, terms, lhs, rhs) = constr.decompose();
        if lhs.is_nan() || rhs.is_nan() || lhs == f64::INFINITY || rhs == f64::NEG_INFINITY {
            return Err(SolverError::Api(format!(
                "constraint {name} has invalid sides [{lhs}, {rhs}]"
            )));
        }
        let mut terms: Vec<(usize, f64)> = terms
            .into_iter()
            .map(|(var, coef)| {
                if var.idx() >= self.cols.len() {
                    return Err(SolverError::Api(format!(
                        "constraint {name} references unknown column {var}"
                    )));
                }
                if !coef.is_finite() {
                    return Err(SolverError::Api(format!(
                        "constraint {name} has non-finite coefficient {coef}"
                    )));
                }
                Ok((var.idx(), coef))
            })
            .collect::<Result<_, _>>()?;
        terms.sort_by_key(|&(col, _)| col);
        let mut merged: Vec<(usize, f64)> = Vec::with_capacity(terms.len());
        for (col, coef) in terms {
            match merged.last_mut() {
                Some(last) if last.0 == col => last.1 += coef,
                _ => merged.push((col, coef)),
            }
        }
        merged.retain(|&(_, coef)| coef != 0.);
        let row = self.rows.len();
        for &(col, _) in &merged {
            self.occurs[col].push(row);
        }
        self.rows.push(Row {
            name,
            terms: merged,
            lhs,
            rhs,
        });
        Ok(())
    }

    /// Objective value of a full assignment
    pub fn objective(&self, values: &[f64]) -> f64 {
        self.cols
            .iter()
            .zip(values)
            .map(|(col, &val)| col.obj * val)
            .sum()
    }

    /// Checks bounds and rows for a full assignment
    pub fn is_feasible(&self, values: &[f64]) -> bool {
        if values.len() != self.cols.len() {
            return false;
        }
        let in_bounds = self
            .cols
            .iter()
            .zip(values)
            .all(|(col, &val)| val >= col.lb - EPS && val <= col.ub + EPS);
        in_bounds
            && self.rows.iter().all(|row| {
                let act: f64 = row.terms.iter().map(|&(col, coef)| coef * values[col]).sum();
                act >= row.lhs - EPS && act <= row.rhs + EPS
            })
    }

    /// Checks whether every feasible objective value is integral
    pub fn integral_objective(&self) -> bool {
        self.cols.iter().all(|col| col.obj.fract() == 0.)
    }
}

/// A model together with its identity. Heuristics work on their own copies, each with a fresh
/// identity.
#[derive(Clone, Debug)]
pub(crate) struct Problem {
    pub id: ProblemId,
    pub model: Model,
}

impl Problem {
    pub fn new() -> Self {
        Problem {
            id: ProblemId::fresh(),
            model: Model::default(),
        }
    }

    /// Copies the model into a new problem with a fresh identity
    pub fn sub_problem(&self) -> Self {
        Problem {
            id: ProblemId::fresh(),
            model: self.model.clone(),
        }
    }
}
