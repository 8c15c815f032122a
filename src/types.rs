//! # Common Types for MaxSAT Encoding
//!
//! Types shared between the parser, the encoder and the solver interface. DIMACS-level data is
//! represented by [`Lit`] and [`WClause`], the ILP side by [`Var`] and [`LinearConstraint`].

use core::ffi::c_int;
use std::{fmt, ops};

use thiserror::Error;

pub mod constraints;
pub use constraints::LinearConstraint;

/// A literal as it appears in a DIMACS file: a non-zero signed integer whose absolute value is
/// the variable index. Variable indices start at 1.
#[derive(Hash, Eq, PartialEq, PartialOrd, Ord, Clone, Copy, Debug)]
#[repr(transparent)]
pub struct Lit {
    val: c_int,
}

impl Lit {
    /// Creates a literal from its DIMACS representation.
    ///
    /// # Errors
    ///
    /// [`TypeError::ZeroLit`] if `val` is zero, since `0` terminates clauses in DIMACS, and
    /// [`TypeError::NotNegatable`] for `c_int::MIN`.
    ///
    /// # Examples
    ///
    /// ```
    /// use maxsat_ilp::types::Lit;
    ///
    /// let lit = Lit::from_dimacs(-4).unwrap();
    /// assert_eq!(lit.var_idx(), 4);
    /// assert!(lit.is_neg());
    /// assert!(Lit::from_dimacs(0).is_err());
    /// ```
    pub fn from_dimacs(val: c_int) -> Result<Lit, TypeError> {
        if val == 0 {
            return Err(TypeError::ZeroLit);
        }
        if val == c_int::MIN {
            return Err(TypeError::NotNegatable(val));
        }
        Ok(Lit { val })
    }

    /// Gets the DIMACS representation of the literal
    #[inline]
    #[must_use]
    pub fn to_dimacs(self) -> c_int {
        self.val
    }

    /// Gets the 1-based DIMACS index of the variable of the literal
    #[inline]
    #[must_use]
    pub fn var_idx(self) -> u32 {
        self.val.unsigned_abs()
    }

    /// Checks whether the literal asserts its variable to be true
    #[inline]
    #[must_use]
    pub fn is_pos(self) -> bool {
        self.val > 0
    }

    /// Checks whether the literal asserts its variable to be false
    #[inline]
    #[must_use]
    pub fn is_neg(self) -> bool {
        self.val < 0
    }
}

impl ops::Not for Lit {
    type Output = Lit;

    #[inline]
    fn not(self) -> Lit {
        Lit { val: -self.val }
    }
}

impl ops::Neg for Lit {
    type Output = Lit;

    #[inline]
    fn neg(self) -> Lit {
        !self
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_dimacs())
    }
}

/// The cost of violating a clause
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cost {
    /// The clause must be satisfied
    Hard,
    /// Violating the clause adds the weight to the objective
    Soft(u64),
}

impl Cost {
    /// Checks whether the cost marks a hard clause
    #[must_use]
    pub fn is_hard(self) -> bool {
        matches!(self, Cost::Hard)
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cost::Hard => write!(f, "h"),
            Cost::Soft(w) => write!(f, "{w}"),
        }
    }
}

/// A clause record as read from a DIMACS CNF/WCNF file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WClause {
    cost: Cost,
    lits: Vec<Lit>,
}

impl WClause {
    /// Creates a new clause record
    #[must_use]
    pub fn new(cost: Cost, lits: Vec<Lit>) -> Self {
        WClause { cost, lits }
    }

    /// Gets the cost of violating the clause
    #[must_use]
    pub fn cost(&self) -> Cost {
        self.cost
    }

    /// Gets the literals of the clause in input order
    #[must_use]
    pub fn lits(&self) -> &[Lit] {
        &self.lits
    }

    /// Gets the number of literals
    #[must_use]
    pub fn len(&self) -> usize {
        self.lits.len()
    }

    /// Checks whether the clause has no literals
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lits.is_empty()
    }

    /// Checks whether the clause is satisfied by an assignment, given as a slice of values for
    /// DIMACS variables `1..=values.len()`. Variables outside of the slice count as false.
    #[must_use]
    pub fn is_sat(&self, values: &[bool]) -> bool {
        self.lits.iter().any(|&l| {
            let val = values
                .get(l.var_idx() as usize - 1)
                .copied()
                .unwrap_or(false);
            val == l.is_pos()
        })
    }

    /// Decomposes the clause into its cost and literals
    #[must_use]
    pub fn decompose(self) -> (Cost, Vec<Lit>) {
        (self.cost, self.lits)
    }
}

impl fmt::Display for WClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cost)?;
        for l in &self.lits {
            write!(f, " {l}")?;
        }
        write!(f, " 0")
    }
}

/// Handle of a column (variable) in an ILP model. Handles are handed out by the solver and are
/// only meaningful for the solver that created them.
#[derive(Hash, Eq, PartialEq, PartialOrd, Ord, Clone, Copy, Debug)]
#[repr(transparent)]
pub struct Var {
    idx: u32,
}

impl Var {
    /// Creates a variable handle with a given index. Indices start from 0.
    #[inline]
    #[must_use]
    pub fn new(idx: u32) -> Var {
        Var { idx }
    }

    /// Returns the index of the variable as a `usize` for indexing data structures
    #[inline]
    #[must_use]
    pub fn idx(self) -> usize {
        self.idx as usize
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.idx)
    }
}

/// Errors related to types
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeError {
    /// `0` is not a literal
    #[error("0 is not a valid DIMACS literal")]
    ZeroLit,
    /// The literal has no negation representable in the same integer type
    #[error("literal {0} cannot be negated")]
    NotNegatable(c_int),
}
