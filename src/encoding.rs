//! # ILP Encoding of MaxSAT Instances
//!
//! Translates weighted clauses into a 0-1 integer linear program. Every DIMACS variable `i` gets a
//! binary column `x<i>`, created the first time the variable is referenced. A column `x0` fixed
//! to `1` is created before any clause and serves as the constant `1` in the objective.
//!
//! A clause `l_1 \/ ... \/ l_k` becomes the constraint `sum(t_j) >= 1 - n` where `t_j` is `+x_v`
//! for a positive and `-x_v` for a negative literal and `n` is the number of negative literals.
//! Soft clauses additionally get a relaxation column `r<i>` with the clause weight as objective
//! coefficient that enters the constraint with coefficient `+1`. Soft unit clauses need neither:
//! their weight is folded into the objective directly.
//!
//! ```
//! use maxsat_ilp::{encoding::{EncodeOptions, IlpEncoder}, fio::dimacs::Parser};
//! # use maxsat_ilp::{solvers::*, types::*};
//! # #[derive(Default)]
//! # struct Dummy { vars: usize, constrs: usize }
//! # impl Mip for Dummy {
//! #     fn signature(&self) -> &'static str { "dummy" }
//! #     fn problem_id(&self) -> ProblemId { ProblemId::fresh() }
//! #     fn new_var(&mut self, _: &str, _: f64, _: f64, _: f64) -> Result<Var, SolverError> {
//! #         self.vars += 1;
//! #         Ok(Var::new(self.vars as u32 - 1))
//! #     }
//! #     fn add_obj_coef(&mut self, _: Var, _: f64) -> SolveMightFail { Ok(()) }
//! #     fn add_linear(&mut self, _: LinearConstraint) -> SolveMightFail { self.constrs += 1; Ok(()) }
//! #     fn solve(&mut self) -> Result<MipStatus, SolverError> { Ok(MipStatus::Unsolved) }
//! #     fn status(&self) -> MipStatus { MipStatus::Unsolved }
//! #     fn var_val(&self, _: Var) -> Result<f64, SolverError> { Ok(0.) }
//! #     fn best_objective(&self) -> Option<f64> { None }
//! #     fn n_vars(&self) -> usize { self.vars }
//! #     fn n_constraints(&self) -> usize { self.constrs }
//! # }
//! let input = "p wcnf 2 3 10\n10 1 2 0\n3 -1 0\n4 -1 -2 0\n";
//! let parser = Parser::new(std::io::Cursor::new(input)).unwrap();
//! let header = *parser.header();
//! let mut solver = Dummy::default();
//! let mut encoder = IlpEncoder::new(&mut solver, &header, EncodeOptions::default()).unwrap();
//! encoder.encode(parser).unwrap();
//! let encoding = encoder.finish();
//! assert_eq!(encoding.stats().n_constraints, 2);
//! assert_eq!(encoding.stats().n_folded_units, 1);
//! // x0, x1, x2 and one relaxation column
//! assert_eq!(solver.n_vars(), 4);
//! ```

use thiserror::Error;

use crate::{
    fio::dimacs::{self, Header},
    solvers::{Mip, SolverError},
    types::{Cost, LinearConstraint, Lit, Var, WClause},
};

/// Errors from building the ILP model
#[derive(Error, Debug)]
pub enum EncodeError {
    /// A literal references a variable beyond the number declared in the header
    #[error("literal {lit} exceeds the {n_vars} variables declared in the header")]
    VarOutOfRange {
        /// The offending literal
        lit: Lit,
        /// The number of declared variables
        n_vars: u32,
    },
    /// The solver rejected a model modification
    #[error("solver error: {0}")]
    Solver(#[from] SolverError),
    /// Reading the next clause failed
    #[error(transparent)]
    Parse(#[from] dimacs::Error),
}

/// Options for [`IlpEncoder`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Fold soft unit clauses into the objective instead of creating a constraint and a
    /// relaxation column for them
    pub fold_soft_units: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            fold_soft_units: true,
        }
    }
}

/// Counts of what the encoder produced
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncodingStats {
    /// The number of hard clauses encoded
    pub n_hard: usize,
    /// The number of soft clauses encoded
    pub n_soft: usize,
    /// The number of soft unit clauses folded into the objective
    pub n_folded_units: usize,
    /// The number of relaxation columns created
    pub n_relax_vars: usize,
    /// The number of constraints created
    pub n_constraints: usize,
    /// The number of DIMACS variables that were referenced and thus got a column
    pub n_used_vars: usize,
}

/// Builds the ILP model for a stream of weighted clauses inside a [`Mip`] solver
pub struct IlpEncoder<'s, M: Mip> {
    solver: &'s mut M,
    opts: EncodeOptions,
    n_vars: u32,
    const_true: Var,
    /// DIMACS variable index to column
    columns: Vec<Option<Var>>,
    n_clauses: usize,
    stats: EncodingStats,
}

impl<'s, M: Mip> IlpEncoder<'s, M> {
    /// Creates an encoder for an instance with the given header. Creates the constant column
    /// `x0` right away.
    ///
    /// # Errors
    ///
    /// If the solver fails to create the column.
    pub fn new(solver: &'s mut M, header: &Header, opts: EncodeOptions) -> Result<Self, EncodeError> {
        let const_true = solver.new_var("x0", 1., 1., 0.)?;
        Ok(IlpEncoder {
            solver,
            opts,
            n_vars: header.n_vars,
            const_true,
            columns: Vec::new(),
            n_clauses: 0,
            stats: EncodingStats::default(),
        })
    }

    /// Gets the column of the variable of a literal, creating it on first reference
    fn column(&mut self, lit: Lit) -> Result<Var, EncodeError> {
        let idx = lit.var_idx();
        if idx > self.n_vars {
            return Err(EncodeError::VarOutOfRange {
                lit,
                n_vars: self.n_vars,
            });
        }
        let idx = idx as usize;
        if idx >= self.columns.len() {
            self.columns.resize(idx + 1, None);
        }
        if let Some(var) = self.columns[idx] {
            return Ok(var);
        }
        let var = self.solver.new_binary(&format!("x{idx}"), 0.)?;
        self.columns[idx] = Some(var);
        self.stats.n_used_vars += 1;
        Ok(var)
    }

    /// Encodes a single clause
    ///
    /// # Errors
    ///
    /// If a literal is out of range or the solver rejects a modification.
    pub fn add_clause(&mut self, clause: WClause) -> Result<(), EncodeError> {
        self.n_clauses += 1;
        let (cost, lits) = clause.decompose();
        if cost.is_hard() {
            self.stats.n_hard += 1;
        } else {
            self.stats.n_soft += 1;
        }
        if let (Cost::Soft(weight), [lit]) = (cost, &lits[..]) {
            if self.opts.fold_soft_units {
                return self.fold_unit(*lit, weight as f64);
            }
        }
        let mut constr = LinearConstraint::new(format!("c{}", self.n_clauses));
        let mut n_neg = 0u32;
        for &lit in &lits {
            let var = self.column(lit)?;
            if lit.is_pos() {
                constr.add_term(var, 1.);
            } else {
                constr.add_term(var, -1.);
                n_neg += 1;
            }
        }
        if let Cost::Soft(weight) = cost {
            let relax = self
                .solver
                .new_binary(&format!("r{}", self.n_clauses), weight as f64)?;
            constr.add_term(relax, 1.);
            self.stats.n_relax_vars += 1;
        }
        constr.set_lhs(1. - f64::from(n_neg));
        self.solver.add_linear(constr)?;
        self.stats.n_constraints += 1;
        Ok(())
    }

    /// Adds `weight * [lit is violated]` to the objective
    fn fold_unit(&mut self, lit: Lit, weight: f64) -> Result<(), EncodeError> {
        let var = self.column(lit)?;
        if lit.is_pos() {
            // weight * (1 - x)
            self.solver.add_obj_coef(self.const_true, weight)?;
            self.solver.add_obj_coef(var, -weight)?;
        } else {
            self.solver.add_obj_coef(var, weight)?;
        }
        self.stats.n_folded_units += 1;
        Ok(())
    }

    /// Encodes all clauses from an iterator, stopping at the first error
    ///
    /// # Errors
    ///
    /// If the iterator yields an error, a literal is out of range or the solver rejects a
    /// modification.
    pub fn encode<I, E>(&mut self, clauses: I) -> Result<(), EncodeError>
    where
        I: IntoIterator<Item = Result<WClause, E>>,
        EncodeError: From<E>,
    {
        for clause in clauses {
            self.add_clause(clause?)?;
        }
        tracing::debug!(
            clauses = self.n_clauses,
            constraints = self.stats.n_constraints,
            "encoded clauses"
        );
        Ok(())
    }

    /// Finishes encoding and returns the variable table
    #[must_use]
    pub fn finish(self) -> Encoding {
        Encoding {
            n_vars: self.n_vars,
            const_true: self.const_true,
            columns: self.columns,
            stats: self.stats,
        }
    }
}

/// The variable table of an encoded instance, mapping DIMACS variables to solver columns
#[derive(Clone, Debug)]
pub struct Encoding {
    n_vars: u32,
    const_true: Var,
    columns: Vec<Option<Var>>,
    stats: EncodingStats,
}

impl Encoding {
    /// Gets the number of variables declared in the header
    #[must_use]
    pub fn n_vars(&self) -> u32 {
        self.n_vars
    }

    /// Gets the column fixed to `1`
    #[must_use]
    pub fn const_true(&self) -> Var {
        self.const_true
    }

    /// Gets the column of a DIMACS variable, if the variable was referenced by any clause
    #[must_use]
    pub fn column(&self, idx: u32) -> Option<Var> {
        self.columns.get(idx as usize).copied().flatten()
    }

    /// Gets the value of a DIMACS variable in the best solution of the solver. Variables that
    /// no clause references are false.
    ///
    /// # Errors
    ///
    /// If the solver has no solution.
    pub fn value_of<M: Mip>(&self, solver: &M, idx: u32) -> Result<bool, SolverError> {
        match self.column(idx) {
            Some(var) => Ok(solver.var_val(var)? >= 0.5),
            None => Ok(false),
        }
    }

    /// Gets the values of DIMACS variables `1..=n_vars` in the best solution of the solver
    ///
    /// # Errors
    ///
    /// If the solver has no solution.
    pub fn assignment<M: Mip>(&self, solver: &M) -> Result<Vec<bool>, SolverError> {
        (1..=self.n_vars)
            .map(|idx| self.value_of(solver, idx))
            .collect()
    }

    /// Gets the encoding statistics
    #[must_use]
    pub fn stats(&self) -> &EncodingStats {
        &self.stats
    }
}
