//! Expression trees attached to ground actions and to the goal.
//!
//! All trees are variable-free: quantified nodes carry the instances produced by the grounder
//! rather than a bound variable.

use crate::ground::{FluentId, LitId};
use num_rational::Rational64;

/// Instant at which a timed condition or effect applies, relatively to a durative action.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum Timing {
    AtStart,
    OverAll,
    AtEnd,
}

/// Comparison operator of a numeric condition.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum CmpOp {
    Lt,
    Leq,
    Eq,
    Geq,
    Gt,
}

impl CmpOp {
    /// Operator `op'` such that `a op b` iff `b op' a`.
    pub fn mirror(self) -> CmpOp {
        match self {
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::Leq => CmpOp::Geq,
            CmpOp::Eq => CmpOp::Eq,
            CmpOp::Geq => CmpOp::Leq,
            CmpOp::Gt => CmpOp::Lt,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Quantifier {
    Forall,
    Exists,
}

/// Numeric expression.
#[derive(Clone, PartialEq, Debug)]
pub enum Expr {
    Number(Rational64),
    Fluent(FluentId),
    /// The `?duration` of the enclosing durative action.
    Duration,
    /// `?total-time`, only meaningful in plan metrics.
    TotalTime,
    /// `#t`, the time elapsed since the start of a continuous effect.
    ContinuousTime,
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
}

impl Expr {
    pub fn int(value: i64) -> Expr {
        Expr::Number(Rational64::from_integer(value))
    }

    pub fn fluent(f: FluentId) -> Expr {
        Expr::Fluent(f)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add(self, other: Expr) -> Expr {
        Expr::Add(Box::new(self), Box::new(other))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn sub(self, other: Expr) -> Expr {
        Expr::Sub(Box::new(self), Box::new(other))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn mul(self, other: Expr) -> Expr {
        Expr::Mul(Box::new(self), Box::new(other))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn div(self, other: Expr) -> Expr {
        Expr::Div(Box::new(self), Box::new(other))
    }

    /// Returns the constant value of the expression if it does not depend on any fluent or duration.
    pub fn as_constant(&self) -> Option<Rational64> {
        match self {
            Expr::Number(v) => Some(*v),
            Expr::Add(a, b) => Some(a.as_constant()? + b.as_constant()?),
            Expr::Sub(a, b) => Some(a.as_constant()? - b.as_constant()?),
            Expr::Mul(a, b) => Some(a.as_constant()? * b.as_constant()?),
            Expr::Div(a, b) => {
                let den = b.as_constant()?;
                if den == Rational64::from_integer(0) {
                    None
                } else {
                    Some(a.as_constant()? / den)
                }
            }
            Expr::Neg(a) => Some(-a.as_constant()?),
            Expr::Fluent(_) | Expr::Duration | Expr::TotalTime | Expr::ContinuousTime => None,
        }
    }

    /// Appends to `out` all fluents appearing in this expression.
    pub fn fluents(&self, out: &mut Vec<FluentId>) {
        match self {
            Expr::Fluent(f) => out.push(*f),
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) => {
                a.fluents(out);
                b.fluents(out);
            }
            Expr::Neg(a) => a.fluents(out),
            Expr::Number(_) | Expr::Duration | Expr::TotalTime | Expr::ContinuousTime => {}
        }
    }
}

/// Boolean condition: precondition, duration constraint or goal.
#[derive(Clone, PartialEq, Debug)]
pub enum Goal {
    True,
    Literal { lit: LitId, positive: bool },
    Not(Box<Goal>),
    And(Vec<Goal>),
    Or(Vec<Goal>),
    Imply(Box<Goal>, Box<Goal>),
    Compare { op: CmpOp, lhs: Expr, rhs: Expr },
    Quantified { quantifier: Quantifier, instances: Vec<Goal> },
    Timed { timing: Timing, goal: Box<Goal> },
    Preference { name: String, goal: Box<Goal> },
}

impl Goal {
    pub fn pos(lit: LitId) -> Goal {
        Goal::Literal { lit, positive: true }
    }

    pub fn neg(lit: LitId) -> Goal {
        Goal::Literal { lit, positive: false }
    }

    pub fn compare(lhs: Expr, op: CmpOp, rhs: Expr) -> Goal {
        Goal::Compare { op, lhs, rhs }
    }

    pub fn timed(timing: Timing, goal: Goal) -> Goal {
        Goal::Timed {
            timing,
            goal: Box::new(goal),
        }
    }

    /// Appends to `out` all literal tests `(lit, polarity)` of the condition.
    /// Tests appearing below a negation have their polarity inverted.
    pub fn literal_tests(&self, positive: bool, out: &mut Vec<(LitId, bool)>) {
        match self {
            Goal::Literal { lit, positive: p } => out.push((*lit, *p == positive)),
            Goal::Not(g) => g.literal_tests(!positive, out),
            Goal::And(gs) | Goal::Or(gs) => gs.iter().for_each(|g| g.literal_tests(positive, out)),
            Goal::Quantified { instances, .. } => instances.iter().for_each(|g| g.literal_tests(positive, out)),
            Goal::Imply(a, b) => {
                a.literal_tests(!positive, out);
                b.literal_tests(positive, out);
            }
            Goal::Timed { goal, .. } | Goal::Preference { goal, .. } => goal.literal_tests(positive, out),
            Goal::True | Goal::Compare { .. } => {}
        }
    }

    /// Appends to `out` all fluents read by the numeric comparisons of the condition.
    pub fn fluents(&self, out: &mut Vec<FluentId>) {
        match self {
            Goal::Compare { lhs, rhs, .. } => {
                lhs.fluents(out);
                rhs.fluents(out);
            }
            Goal::Not(g) | Goal::Timed { goal: g, .. } | Goal::Preference { goal: g, .. } => g.fluents(out),
            Goal::And(gs) | Goal::Or(gs) | Goal::Quantified { instances: gs, .. } => {
                gs.iter().for_each(|g| g.fluents(out))
            }
            Goal::Imply(a, b) => {
                a.fluents(out);
                b.fluents(out);
            }
            Goal::True | Goal::Literal { .. } => {}
        }
    }
}

/// Discrete update of a numeric fluent.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum AssignOp {
    Assign,
    Increase,
    Decrease,
    ScaleUp,
    ScaleDown,
}

impl AssignOp {
    /// Increases and decreases commute with each other, other updates do not.
    pub fn is_additive(self) -> bool {
        matches!(self, AssignOp::Increase | AssignOp::Decrease)
    }
}

/// Direction of a continuous change.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum FlowSign {
    Increase,
    Decrease,
}

#[derive(Clone, PartialEq, Debug)]
pub enum Effect {
    Add(LitId),
    Delete(LitId),
    Assign { op: AssignOp, fluent: FluentId, value: Expr },
    /// `(increase fluent (* #t rate))`: continuous change while the action is running.
    Continuous { sign: FlowSign, fluent: FluentId, rate: Expr },
    Forall(Vec<Effect>),
    When { condition: Goal, effects: Vec<Effect> },
    Timed { timing: Timing, effects: Vec<Effect> },
}

impl Effect {
    pub fn assign(fluent: FluentId, op: AssignOp, value: Expr) -> Effect {
        Effect::Assign { op, fluent, value }
    }

    pub fn at_start(effects: Vec<Effect>) -> Effect {
        Effect::Timed {
            timing: Timing::AtStart,
            effects,
        }
    }

    pub fn at_end(effects: Vec<Effect>) -> Effect {
        Effect::Timed {
            timing: Timing::AtEnd,
            effects,
        }
    }

    /// Invokes `f` on every leaf effect (add, delete, assignment or continuous change) of this tree.
    pub fn for_each_leaf(&self, f: &mut impl FnMut(&Effect)) {
        match self {
            Effect::Forall(es) | Effect::When { effects: es, .. } | Effect::Timed { effects: es, .. } => {
                for e in es {
                    e.for_each_leaf(f)
                }
            }
            leaf => f(leaf),
        }
    }
}
