//! Translation of ground expression trees into Z3 terms.
//!
//! Each call returns the term it built; the syntactic context (what is being encoded, which
//! layer values are read, which action owns the expression) is passed explicitly.

use crate::encode::variables::{Snapshot, Variables};
use crate::error::EncodingError;
use num_rational::Rational64;
use smtplan_planning::ground::*;
use smtplan_planning::printer::Printer;
use z3::ast::{Ast, Bool, Int, Real};
use z3::Context;

/// Syntactic context for which constraints are currently produced.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum EncState {
    None,
    Init,
    Goal,
    /// Guard of a conditional effect.
    Literal,
    ActionCondition,
    ActionDuration,
    ActionEffect,
}

/// Context threaded through the parsing of a tree.
#[derive(Clone, Copy)]
pub struct ParseCtx<'v, 'ctx> {
    pub state: EncState,
    /// Layer and phase whose values are read by literal tests and fluent terms.
    pub snapshot: Snapshot,
    pub action: Option<ActId>,
    /// Term denoting `?duration`, if in the scope of a durative action.
    pub duration: Option<&'v Real<'ctx>>,
    /// Timing whose conditions are extracted from a durative action's condition.
    /// Untimed conditions are at-start conditions.
    pub select: Option<Timing>,
    timing: Option<Timing>,
    below_connective: bool,
}

impl<'v, 'ctx> ParseCtx<'v, 'ctx> {
    pub fn new(state: EncState, snapshot: Snapshot) -> Self {
        ParseCtx {
            state,
            snapshot,
            action: None,
            duration: None,
            select: None,
            timing: None,
            below_connective: false,
        }
    }

    pub fn for_action(mut self, action: ActId, duration: Option<&'v Real<'ctx>>) -> Self {
        self.action = Some(action);
        self.duration = duration;
        self
    }

    pub fn selecting(mut self, timing: Timing) -> Self {
        self.select = Some(timing);
        self
    }

    fn connective(mut self) -> Self {
        self.below_connective = true;
        self
    }

    fn timed(mut self, timing: Timing) -> Self {
        self.timing = Some(timing);
        self
    }

    /// True if the untimed part of a condition does not belong to the selected timing.
    fn skips_untimed(&self) -> bool {
        matches!(self.select, Some(t) if t != Timing::AtStart) && self.timing.is_none()
    }
}

fn contains_timed(g: &Goal) -> bool {
    match g {
        Goal::Timed { .. } => true,
        Goal::Not(g) | Goal::Preference { goal: g, .. } => contains_timed(g),
        Goal::And(gs) | Goal::Or(gs) | Goal::Quantified { instances: gs, .. } => gs.iter().any(contains_timed),
        Goal::Imply(a, b) => contains_timed(a) || contains_timed(b),
        Goal::True | Goal::Literal { .. } | Goal::Compare { .. } => false,
    }
}

pub struct ExprParser<'a, 'ctx> {
    ctx: &'ctx Context,
    pb: &'a GroundProblem,
    vars: &'a Variables<'ctx>,
}

impl<'a, 'ctx> ExprParser<'a, 'ctx> {
    pub fn new(ctx: &'ctx Context, pb: &'a GroundProblem, vars: &'a Variables<'ctx>) -> Self {
        ExprParser { ctx, pb, vars }
    }

    /// Human readable description of where an expression appears.
    pub fn describe(&self, c: &ParseCtx) -> String {
        let layer = c.snapshot.layer;
        match (c.action, c.state) {
            (Some(a), _) => format!("{} at layer {layer}", self.pb.action(a).describe()),
            (None, EncState::Goal) => format!("goal at layer {layer}"),
            (None, EncState::Init) => "initial state".to_string(),
            (None, state) => format!("{state:?} at layer {layer}"),
        }
    }

    fn unsupported<T>(&self, construct: String, c: &ParseCtx) -> Result<T, EncodingError> {
        Err(EncodingError::Unsupported {
            construct,
            context: self.describe(c),
        })
    }

    pub fn bool_cst(&self, value: bool) -> Bool<'ctx> {
        Bool::from_bool(self.ctx, value)
    }

    pub fn real_cst(&self, value: Rational64) -> Real<'ctx> {
        let num = Real::from_int(&Int::from_i64(self.ctx, *value.numer()));
        if value.is_integer() {
            num
        } else {
            num.div(&Real::from_int(&Int::from_i64(self.ctx, *value.denom())))
        }
    }

    pub fn and(&self, args: &[Bool<'ctx>]) -> Bool<'ctx> {
        match args {
            [] => self.bool_cst(true),
            [single] => single.clone(),
            _ => Bool::and(self.ctx, &args.iter().collect::<Vec<_>>()),
        }
    }

    pub fn or(&self, args: &[Bool<'ctx>]) -> Bool<'ctx> {
        match args {
            [] => self.bool_cst(false),
            [single] => single.clone(),
            _ => Bool::or(self.ctx, &args.iter().collect::<Vec<_>>()),
        }
    }

    pub fn sum(&self, args: &[Real<'ctx>]) -> Real<'ctx> {
        match args {
            [] => self.real_cst(Rational64::from_integer(0)),
            [single] => single.clone(),
            _ => Real::add(self.ctx, &args.iter().collect::<Vec<_>>()),
        }
    }

    pub fn literal(&self, lit: LitId, c: &ParseCtx) -> Result<&'a Bool<'ctx>, EncodingError> {
        if lit.index() >= self.pb.num_literals() {
            return Err(EncodingError::UnknownLiteral {
                lit,
                context: self.describe(c),
            });
        }
        Ok(self.vars.literal(c.snapshot, lit))
    }

    pub fn fluent(&self, fluent: FluentId, c: &ParseCtx) -> Result<&'a Real<'ctx>, EncodingError> {
        if fluent.index() >= self.pb.num_fluents() {
            return Err(EncodingError::UnknownFluent {
                fluent,
                context: self.describe(c),
            });
        }
        Ok(self.vars.fluent(c.snapshot, fluent))
    }

    /// Builds the formula stating that `g` holds in the context `c`.
    pub fn goal(&self, g: &Goal, c: &ParseCtx<'_, 'ctx>) -> Result<Bool<'ctx>, EncodingError> {
        if c.skips_untimed() && !contains_timed(g) {
            return Ok(self.bool_cst(true));
        }
        match g {
            Goal::True => Ok(self.bool_cst(true)),
            Goal::Literal { lit, positive } => match c.state {
                EncState::Init
                | EncState::Goal
                | EncState::Literal
                | EncState::ActionCondition
                | EncState::ActionEffect => {
                    let v = self.literal(*lit, c)?;
                    Ok(v._eq(&self.bool_cst(*positive)))
                }
                EncState::ActionDuration | EncState::None => {
                    self.unsupported(Printer::new(self.pb, g).to_string(), c)
                }
            },
            Goal::Not(g) => Ok(self.goal(g, &c.connective())?.not()),
            Goal::And(gs) => {
                let parts = gs.iter().map(|g| self.goal(g, c)).collect::<Result<Vec<_>, _>>()?;
                Ok(self.and(&parts))
            }
            Goal::Or(gs) => {
                let c = c.connective();
                let parts = gs.iter().map(|g| self.goal(g, &c)).collect::<Result<Vec<_>, _>>()?;
                Ok(self.or(&parts))
            }
            Goal::Imply(a, b) => {
                let c = c.connective();
                Ok(self.goal(a, &c)?.implies(&self.goal(b, &c)?))
            }
            Goal::Compare { op, lhs, rhs } => {
                let l = self.expr(lhs, c)?;
                let r = self.expr(rhs, c)?;
                Ok(match op {
                    CmpOp::Lt => l.lt(&r),
                    CmpOp::Leq => l.le(&r),
                    CmpOp::Eq => l._eq(&r),
                    CmpOp::Geq => l.ge(&r),
                    CmpOp::Gt => l.gt(&r),
                })
            }
            Goal::Quantified { quantifier, instances } => match quantifier {
                Quantifier::Forall => {
                    let parts = instances
                        .iter()
                        .map(|g| self.goal(g, c))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(self.and(&parts))
                }
                Quantifier::Exists => {
                    let c = c.connective();
                    let parts = instances
                        .iter()
                        .map(|g| self.goal(g, &c))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(self.or(&parts))
                }
            },
            Goal::Timed { timing, goal } => {
                if c.timing.is_some() || c.below_connective || c.state != EncState::ActionCondition {
                    return self.unsupported(Printer::new(self.pb, g).to_string(), c);
                }
                match c.select {
                    Some(selected) if selected == *timing => self.goal(goal, &c.timed(*timing)),
                    Some(_) => Ok(self.bool_cst(true)),
                    None => self.unsupported(Printer::new(self.pb, g).to_string(), c),
                }
            }
            Goal::Preference { .. } => self.unsupported(Printer::new(self.pb, g).to_string(), c),
        }
    }

    /// Builds the term denoting the value of `e` in the context `c`.
    pub fn expr(&self, e: &Expr, c: &ParseCtx<'_, 'ctx>) -> Result<Real<'ctx>, EncodingError> {
        match e {
            Expr::Number(v) => Ok(self.real_cst(*v)),
            Expr::Fluent(f) => Ok(self.fluent(*f, c)?.clone()),
            Expr::Duration => match c.duration {
                Some(d) => Ok(d.clone()),
                None => self.unsupported(Printer::new(self.pb, e).to_string(), c),
            },
            Expr::TotalTime | Expr::ContinuousTime => self.unsupported(Printer::new(self.pb, e).to_string(), c),
            Expr::Add(a, b) => Ok(Real::add(self.ctx, &[&self.expr(a, c)?, &self.expr(b, c)?])),
            Expr::Sub(a, b) => Ok(Real::sub(self.ctx, &[&self.expr(a, c)?, &self.expr(b, c)?])),
            Expr::Mul(a, b) => Ok(Real::mul(self.ctx, &[&self.expr(a, c)?, &self.expr(b, c)?])),
            Expr::Div(a, b) => Ok(self.expr(a, c)?.div(&self.expr(b, c)?)),
            Expr::Neg(a) => Ok(self.expr(a, c)?.unary_minus()),
        }
    }
}
