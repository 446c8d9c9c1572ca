//! PDDL-like rendering of ground expression trees, used in diagnostics.

use crate::ground::*;
use std::fmt::{Display, Formatter, Result};

/// Association of a tree with the problem it refers to, to be able to print literal and fluent names.
pub struct Printer<'a, T: ?Sized> {
    pb: &'a GroundProblem,
    elem: &'a T,
}

impl<'a, T: ?Sized> Printer<'a, T> {
    pub fn new(pb: &'a GroundProblem, elem: &'a T) -> Self {
        Printer { pb, elem }
    }

    fn with<'b, U: ?Sized>(&'b self, elem: &'b U) -> Printer<'b, U> {
        Printer { pb: self.pb, elem }
    }
}

fn timing_str(t: Timing) -> &'static str {
    match t {
        Timing::AtStart => "at start",
        Timing::OverAll => "over all",
        Timing::AtEnd => "at end",
    }
}

impl Display for Printer<'_, Expr> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let bin = |f: &mut Formatter<'_>, op: &str, a: &Expr, b: &Expr| {
            write!(f, "({op} {} {})", self.with(a), self.with(b))
        };
        match self.elem {
            Expr::Number(v) if v.is_integer() => write!(f, "{}", v.numer()),
            Expr::Number(v) => write!(f, "{}", *v.numer() as f64 / *v.denom() as f64),
            Expr::Fluent(x) => match self.pb.fluents.get(x.index()) {
                Some(fl) => write!(f, "{}", fl.name),
                None => write!(f, "<{x}>"),
            },
            Expr::Duration => write!(f, "?duration"),
            Expr::TotalTime => write!(f, "?total-time"),
            Expr::ContinuousTime => write!(f, "#t"),
            Expr::Add(a, b) => bin(f, "+", a, b),
            Expr::Sub(a, b) => bin(f, "-", a, b),
            Expr::Mul(a, b) => bin(f, "*", a, b),
            Expr::Div(a, b) => bin(f, "/", a, b),
            Expr::Neg(a) => write!(f, "(- {})", self.with(a.as_ref())),
        }
    }
}

impl Display for Printer<'_, Goal> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let list = |f: &mut Formatter<'_>, head: &str, gs: &[Goal]| {
            write!(f, "({head}")?;
            for g in gs {
                write!(f, " {}", self.with(g))?;
            }
            write!(f, ")")
        };
        match self.elem {
            Goal::True => write!(f, "(and)"),
            Goal::Literal { lit, positive } => {
                let name = match self.pb.literals.get(lit.index()) {
                    Some(l) => l.name.clone(),
                    None => format!("<{lit}>"),
                };
                if *positive {
                    write!(f, "{name}")
                } else {
                    write!(f, "(not {name})")
                }
            }
            Goal::Not(g) => write!(f, "(not {})", self.with(g.as_ref())),
            Goal::And(gs) => list(f, "and", gs),
            Goal::Or(gs) => list(f, "or", gs),
            Goal::Imply(a, b) => write!(f, "(imply {} {})", self.with(a.as_ref()), self.with(b.as_ref())),
            Goal::Compare { op, lhs, rhs } => {
                let op = match op {
                    CmpOp::Lt => "<",
                    CmpOp::Leq => "<=",
                    CmpOp::Eq => "=",
                    CmpOp::Geq => ">=",
                    CmpOp::Gt => ">",
                };
                write!(f, "({op} {} {})", self.with(lhs), self.with(rhs))
            }
            Goal::Quantified { quantifier, instances } => match quantifier {
                Quantifier::Forall => list(f, "forall-instances", instances),
                Quantifier::Exists => list(f, "exists-instances", instances),
            },
            Goal::Timed { timing, goal } => write!(f, "({} {})", timing_str(*timing), self.with(goal.as_ref())),
            Goal::Preference { name, goal } => write!(f, "(preference {name} {})", self.with(goal.as_ref())),
        }
    }
}

impl Display for Printer<'_, Effect> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let list = |f: &mut Formatter<'_>, head: &str, es: &[Effect]| {
            write!(f, "({head}")?;
            for e in es {
                write!(f, " {}", self.with(e))?;
            }
            write!(f, ")")
        };
        match self.elem {
            Effect::Add(l) => write!(f, "{}", self.with(&Goal::pos(*l))),
            Effect::Delete(l) => write!(f, "{}", self.with(&Goal::neg(*l))),
            Effect::Assign { op, fluent, value } => {
                let op = match op {
                    AssignOp::Assign => "assign",
                    AssignOp::Increase => "increase",
                    AssignOp::Decrease => "decrease",
                    AssignOp::ScaleUp => "scale-up",
                    AssignOp::ScaleDown => "scale-down",
                };
                write!(f, "({op} {} {})", self.with(&Expr::Fluent(*fluent)), self.with(value))
            }
            Effect::Continuous { sign, fluent, rate } => {
                let op = match sign {
                    FlowSign::Increase => "increase",
                    FlowSign::Decrease => "decrease",
                };
                write!(f, "({op} {} (* #t {}))", self.with(&Expr::Fluent(*fluent)), self.with(rate))
            }
            Effect::Forall(es) => list(f, "forall-instances", es),
            Effect::When { condition, effects } => {
                write!(f, "(when {} ", self.with(condition))?;
                list(f, "and", effects)?;
                write!(f, ")")
            }
            Effect::Timed { timing, effects } => {
                write!(f, "({} ", timing_str(*timing))?;
                list(f, "and", effects)?;
                write!(f, ")")
            }
        }
    }
}
