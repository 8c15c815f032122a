//! # Constraint Types
//!
//! Linear constraints as they are handed to a MIP solver. A constraint is a sum of weighted
//! columns bounded from below and, optionally, from above.

use std::fmt;

use super::Var;

/// A linear constraint `lhs <= sum(coef * var) <= rhs`
///
/// The upper bound defaults to `+inf`, which is the only form the MaxSAT encoding needs.
///
/// # Examples
///
/// ```
/// use maxsat_ilp::types::{LinearConstraint, Var};
///
/// // x1 + (1 - x2) >= 1
/// let mut constr = LinearConstraint::new("c1");
/// constr.add_term(Var::new(1), 1.);
/// constr.add_term(Var::new(2), -1.);
/// constr.set_lhs(0.);
/// assert_eq!(constr.len(), 2);
/// assert!(constr.is_sat(&[0., 0., 0.]));
/// assert!(!constr.is_sat(&[0., 0., 1.]));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct LinearConstraint {
    name: String,
    terms: Vec<(Var, f64)>,
    lhs: f64,
    rhs: f64,
}

impl LinearConstraint {
    /// Creates an empty constraint `-inf <= 0 <= +inf`
    #[must_use]
    pub fn new<S: Into<String>>(name: S) -> Self {
        LinearConstraint {
            name: name.into(),
            terms: Vec::new(),
            lhs: f64::NEG_INFINITY,
            rhs: f64::INFINITY,
        }
    }

    /// Adds a term to the constraint. Terms on the same variable are kept separately.
    pub fn add_term(&mut self, var: Var, coef: f64) {
        self.terms.push((var, coef));
    }

    /// Changes the lower bound
    pub fn set_lhs(&mut self, lhs: f64) {
        self.lhs = lhs;
    }

    /// Changes the upper bound
    pub fn set_rhs(&mut self, rhs: f64) {
        self.rhs = rhs;
    }

    /// Gets the name of the constraint
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the terms of the constraint
    #[must_use]
    pub fn terms(&self) -> &[(Var, f64)] {
        &self.terms
    }

    /// Gets the lower bound
    #[must_use]
    pub fn lhs(&self) -> f64 {
        self.lhs
    }

    /// Gets the upper bound
    #[must_use]
    pub fn rhs(&self) -> f64 {
        self.rhs
    }

    /// Gets the number of terms
    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Checks whether the constraint has no terms
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Gets the value of the left hand side sum under a column assignment
    ///
    /// # Panics
    ///
    /// If a variable of the constraint is not covered by `values`.
    #[must_use]
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(var, coef)| coef * values[var.idx()])
            .sum()
    }

    /// Checks whether the constraint is satisfied by a column assignment
    ///
    /// # Panics
    ///
    /// If a variable of the constraint is not covered by `values`.
    #[must_use]
    pub fn is_sat(&self, values: &[f64]) -> bool {
        const EPS: f64 = 1e-9;
        let act = self.activity(values);
        act >= self.lhs - EPS && act <= self.rhs + EPS
    }

    /// Decomposes the constraint into name, terms, lower and upper bound
    #[must_use]
    pub fn decompose(self) -> (String, Vec<(Var, f64)>, f64, f64) {
        (self.name, self.terms, self.lhs, self.rhs)
    }
}

impl fmt::Display for LinearConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} <=", self.name, self.lhs)?;
        if self.terms.is_empty() {
            write!(f, " 0")?;
        }
        for (idx, (var, coef)) in self.terms.iter().enumerate() {
            if idx > 0 {
                write!(f, " +")?;
            }
            write!(f, " {coef} {var}")?;
        }
        write!(f, " <= {}", self.rhs)
    }
}
