//! Solver session: the constraint accumulation context of one encode-and-solve cycle.

use crate::error::EncodingError;
use crate::options::PlannerOptions;
use env_param::EnvParam;
use std::fmt::{Display, Formatter};
use z3::ast::{Ast, Bool};
use z3::{Context, Model, Params, SatResult, Solver, Tactic};

/// If set to true, every asserted constraint is logged at the TRACE level.
pub static PRINT_ENCODING: EnvParam<bool> = EnvParam::new("SMTPLAN_PRINT_ENCODING", "false");

/// If set to true, constraints are simplified by Z3 before being asserted.
pub static SIMPLIFY: EnvParam<bool> = EnvParam::new("SMTPLAN_SIMPLIFY", "false");

/// Outcome of a satisfiability check.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SolveStatus {
    Satisfiable,
    Unsatisfiable,
    /// Inconclusive: timeout, resource exhaustion or incompleteness of the tactic.
    Unknown,
}

impl Display for SolveStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveStatus::Satisfiable => write!(f, "SAT"),
            SolveStatus::Unsatisfiable => write!(f, "UNSAT"),
            SolveStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

pub struct Session<'ctx> {
    solver: Solver<'ctx>,
    num_assertions: usize,
    last: Option<SolveStatus>,
}

impl<'ctx> Session<'ctx> {
    /// Opens a session whose solver is built from the tactic selected by the options.
    pub fn new(ctx: &'ctx Context, opt: &PlannerOptions) -> Result<Self, EncodingError> {
        let name = opt.tactic_name();
        let known = Tactic::list_all(ctx).filter_map(|t| t.ok()).any(|t| t == name);
        if !known {
            return Err(EncodingError::UnknownTactic(name.to_string()));
        }
        let solver = Tactic::new(ctx, name).solver();
        if let Some(timeout) = opt.timeout {
            let mut params = Params::new(ctx);
            params.set_u32("timeout", timeout.saturating_mul(1000));
            solver.set_params(&params);
        }
        Ok(Session {
            solver,
            num_assertions: 0,
            last: None,
        })
    }

    pub fn assert(&mut self, constraint: &Bool<'ctx>) {
        if SIMPLIFY.get() {
            let simplified = constraint.simplify();
            self.assert_raw(&simplified);
        } else {
            self.assert_raw(constraint);
        }
    }

    fn assert_raw(&mut self, constraint: &Bool<'ctx>) {
        if PRINT_ENCODING.get() {
            tracing::trace!("{}", constraint);
        }
        self.solver.assert(constraint);
        self.num_assertions += 1;
        self.last = None;
    }

    pub fn num_assertions(&self) -> usize {
        self.num_assertions
    }

    pub fn check(&mut self) -> SolveStatus {
        let status = match self.solver.check() {
            SatResult::Sat => SolveStatus::Satisfiable,
            SatResult::Unsat => SolveStatus::Unsatisfiable,
            SatResult::Unknown => {
                let reason = self.solver.get_reason_unknown().unwrap_or_default();
                tracing::debug!(%reason, "inconclusive check");
                SolveStatus::Unknown
            }
        };
        self.last = Some(status);
        status
    }

    /// Result of the last check, if no constraint was added since.
    pub fn status(&self) -> Option<SolveStatus> {
        self.last
    }

    /// Model of the last check, only available if it was satisfiable.
    pub fn model(&self) -> Result<Model<'ctx>, EncodingError> {
        match self.last {
            Some(SolveStatus::Satisfiable) => self
                .solver
                .get_model()
                .ok_or_else(|| EncodingError::NoModel("the solver did not produce a model".to_string())),
            Some(other) => Err(EncodingError::NoModel(other.to_string())),
            None => Err(EncodingError::NoModel("not checked".to_string())),
        }
    }
}
