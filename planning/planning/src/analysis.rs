//! Classification of numeric fluents, consumed by the encoder to choose how updates and
//! continuous changes of each fluent are encoded.

use crate::ground::*;
use fixedbitset::FixedBitSet;
use num_rational::Rational64;

/// How the value of a fluent may evolve along a plan.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Monotonicity {
    /// Never modified by any action: the fluent keeps its initial value.
    Constant,
    /// Only modified by increases of non-negative amounts.
    NonDecreasing,
    /// Only modified by decreases of non-negative amounts.
    NonIncreasing,
    /// Anything else (assignments, scaling, updates whose sign is unknown, ...).
    Mixed,
}

impl Monotonicity {
    fn join(self, other: Monotonicity) -> Monotonicity {
        use Monotonicity::*;
        match (self, other) {
            (Constant, x) | (x, Constant) => x,
            (a, b) if a == b => a,
            _ => Mixed,
        }
    }

    /// True if all updates of the fluent are additive and thus commute.
    pub fn is_monotone(self) -> bool {
        !matches!(self, Monotonicity::Mixed)
    }
}

/// Oracle answering questions about the algebraic behavior of fluents.
pub trait Algebraist {
    fn monotonicity(&self, fluent: FluentId) -> Monotonicity;

    /// True if some action changes the fluent continuously while it is running.
    fn is_continuous(&self, fluent: FluentId) -> bool;
}

/// Syntactic classification of the fluents of a ground problem.
#[derive(Clone, Debug)]
pub struct FluentAnalysis {
    monotonicity: Vec<Monotonicity>,
    continuous: FixedBitSet,
}

impl FluentAnalysis {
    pub fn new(pb: &GroundProblem) -> FluentAnalysis {
        let mut monotonicity = vec![Monotonicity::Constant; pb.num_fluents()];
        let mut continuous = FixedBitSet::with_capacity(pb.num_fluents());
        let zero = Rational64::from_integer(0);
        let sign_of = |e: &Expr| match e.as_constant() {
            Some(v) if v >= zero => Some(true),
            Some(_) => Some(false),
            None => None,
        };

        for a in &pb.actions {
            for eff in &a.effects {
                eff.for_each_leaf(&mut |leaf| {
                    let (fluent, update) = match leaf {
                        Effect::Assign { op, fluent, value } => {
                            let m = match (op, sign_of(value)) {
                                (AssignOp::Increase, Some(true)) | (AssignOp::Decrease, Some(false)) => {
                                    Monotonicity::NonDecreasing
                                }
                                (AssignOp::Decrease, Some(true)) | (AssignOp::Increase, Some(false)) => {
                                    Monotonicity::NonIncreasing
                                }
                                _ => Monotonicity::Mixed,
                            };
                            (*fluent, m)
                        }
                        Effect::Continuous { sign, fluent, rate } => {
                            continuous.insert(fluent.index());
                            let m = match (sign, sign_of(rate)) {
                                (FlowSign::Increase, Some(true)) | (FlowSign::Decrease, Some(false)) => {
                                    Monotonicity::NonDecreasing
                                }
                                (FlowSign::Decrease, Some(true)) | (FlowSign::Increase, Some(false)) => {
                                    Monotonicity::NonIncreasing
                                }
                                _ => Monotonicity::Mixed,
                            };
                            (*fluent, m)
                        }
                        _ => return,
                    };
                    let m = &mut monotonicity[fluent.index()];
                    *m = m.join(update);
                });
            }
        }
        FluentAnalysis {
            monotonicity,
            continuous,
        }
    }
}

impl Algebraist for FluentAnalysis {
    fn monotonicity(&self, fluent: FluentId) -> Monotonicity {
        self.monotonicity[fluent.index()]
    }

    fn is_continuous(&self, fluent: FluentId) -> bool {
        self.continuous.contains(fluent.index())
    }
}
