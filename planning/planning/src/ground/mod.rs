//! Ground (variable-free) representation of a temporal and numeric planning problem.
//!
//! This is the form produced by the grounder: literals, numeric fluents and actions are
//! identified by dense indices and all trees only refer to those indices.

mod expr;

pub use expr::*;

use num_rational::Rational64;
use std::fmt::{Display, Formatter};

macro_rules! ground_id {
    ($(#[$doc:meta])* $name:ident, $prefix:expr) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
        pub struct $name(u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl From<usize> for $name {
            fn from(i: usize) -> Self {
                $name(i as u32)
            }
        }

        impl From<$name> for usize {
            fn from(id: $name) -> Self {
                id.0 as usize
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }
    };
}

ground_id!(
    /// Identifier of a ground literal (boolean state variable), in `[0, num_literals)`.
    LitId,
    "l"
);
ground_id!(
    /// Identifier of a ground numeric fluent, in `[0, num_fluents)`.
    FluentId,
    "f"
);
ground_id!(
    /// Identifier of a ground action, event or process, in `[0, num_actions)`.
    ActId,
    "a"
);
ground_id!(
    /// Identifier of a timed initial literal, in `[0, num_timed_literals)`.
    TilId,
    "t"
);

#[derive(Clone, Debug)]
pub struct GroundLiteral {
    /// Printable form, e.g. `(on light)`.
    pub name: String,
    pub initially: bool,
}

#[derive(Clone, Debug)]
pub struct GroundFluent {
    pub name: String,
    /// Value in the initial state. `None` if the problem leaves the fluent undefined.
    pub initially: Option<Rational64>,
}

/// What a ground operator stands for.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum OperatorKind {
    /// Chosen by the planner, part of the plan. Either instantaneous or durative.
    Action,
    /// Instantaneous change that happens as soon as its condition holds.
    Event,
    /// Continuous change that is active exactly while its condition holds.
    Process,
}

impl Display for OperatorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OperatorKind::Action => write!(f, "action"),
            OperatorKind::Event => write!(f, "event"),
            OperatorKind::Process => write!(f, "process"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GroundAction {
    pub kind: OperatorKind,
    /// Printable form without parentheses, e.g. `turn-on light`.
    pub name: String,
    /// Constraint on `?duration`. `None` for instantaneous actions, events and processes.
    pub duration: Option<Goal>,
    pub condition: Goal,
    pub effects: Vec<Effect>,
}

impl GroundAction {
    pub fn instantaneous(name: impl Into<String>, condition: Goal, effects: Vec<Effect>) -> Self {
        GroundAction {
            kind: OperatorKind::Action,
            name: name.into(),
            duration: None,
            condition,
            effects,
        }
    }

    pub fn durative(name: impl Into<String>, duration: Goal, condition: Goal, effects: Vec<Effect>) -> Self {
        GroundAction {
            kind: OperatorKind::Action,
            name: name.into(),
            duration: Some(duration),
            condition,
            effects,
        }
    }

    /// An event: its discrete effects apply at every happening where `condition` holds.
    pub fn event(name: impl Into<String>, condition: Goal, effects: Vec<Effect>) -> Self {
        GroundAction {
            kind: OperatorKind::Event,
            ..Self::instantaneous(name, condition, effects)
        }
    }

    /// A process: its continuous effects apply over every interval on which `condition` holds.
    pub fn process(name: impl Into<String>, condition: Goal, effects: Vec<Effect>) -> Self {
        GroundAction {
            kind: OperatorKind::Process,
            ..Self::instantaneous(name, condition, effects)
        }
    }

    pub fn is_durative(&self) -> bool {
        self.duration.is_some()
    }

    pub fn is_event(&self) -> bool {
        self.kind == OperatorKind::Event
    }

    pub fn is_process(&self) -> bool {
        self.kind == OperatorKind::Process
    }

    /// `kind (name)`, e.g. `event (overflow tank)`.
    pub fn describe(&self) -> String {
        format!("{} ({})", self.kind, self.name)
    }
}

/// Literal that becomes true (or false) at a fixed time, independently of the plan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimedLiteral {
    pub time: Rational64,
    pub lit: LitId,
    pub value: bool,
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ProblemError {
    #[error("duplicated literal {0}")]
    DuplicatedLiteral(String),
    #[error("duplicated fluent {0}")]
    DuplicatedFluent(String),
    #[error("{context} refers to literal {lit} but only {count} literals are defined")]
    UnknownLiteral { context: String, lit: LitId, count: usize },
    #[error("{context} refers to fluent {fluent} but only {count} fluents are defined")]
    UnknownFluent {
        context: String,
        fluent: FluentId,
        count: usize,
    },
    #[error("timed literal {til} happens at negative time {time}")]
    NegativeTime { til: TilId, time: Rational64 },
}

/// A fully ground problem: the input of the encoder.
#[derive(Clone, Debug)]
pub struct GroundProblem {
    pub literals: Vec<GroundLiteral>,
    pub fluents: Vec<GroundFluent>,
    pub actions: Vec<GroundAction>,
    pub timed_literals: Vec<TimedLiteral>,
    pub goal: Goal,
}

impl GroundProblem {
    pub fn num_literals(&self) -> usize {
        self.literals.len()
    }
    pub fn num_fluents(&self) -> usize {
        self.fluents.len()
    }
    pub fn num_actions(&self) -> usize {
        self.actions.len()
    }
    pub fn num_timed_literals(&self) -> usize {
        self.timed_literals.len()
    }

    pub fn literal(&self, l: LitId) -> &GroundLiteral {
        &self.literals[l.index()]
    }
    pub fn fluent(&self, f: FluentId) -> &GroundFluent {
        &self.fluents[f.index()]
    }
    pub fn action(&self, a: ActId) -> &GroundAction {
        &self.actions[a.index()]
    }

    pub fn literal_ids(&self) -> impl Iterator<Item = LitId> {
        (0..self.literals.len()).map(LitId::from)
    }
    pub fn fluent_ids(&self) -> impl Iterator<Item = FluentId> {
        (0..self.fluents.len()).map(FluentId::from)
    }
    pub fn action_ids(&self) -> impl Iterator<Item = ActId> {
        (0..self.actions.len()).map(ActId::from)
    }
    pub fn timed_literal(&self, t: TilId) -> &TimedLiteral {
        &self.timed_literals[t.index()]
    }
    pub fn timed_literal_ids(&self) -> impl Iterator<Item = TilId> {
        (0..self.timed_literals.len()).map(TilId::from)
    }

    /// Checks that every tree only refers to existing literals and fluents.
    pub fn validate(&self) -> Result<(), ProblemError> {
        for a in &self.actions {
            let ctx = || a.describe();
            if let Some(d) = &a.duration {
                self.check_goal(d, &ctx)?;
            }
            self.check_goal(&a.condition, &ctx)?;
            for e in &a.effects {
                self.check_effect(e, &ctx)?;
            }
        }
        for t in self.timed_literal_ids() {
            let til = self.timed_literal(t);
            self.check_lit(til.lit, &|| format!("timed literal {t}"))?;
            if til.time < Rational64::from_integer(0) {
                return Err(ProblemError::NegativeTime { til: t, time: til.time });
            }
        }
        self.check_goal(&self.goal, &|| "goal".to_string())
    }

    fn check_lit(&self, lit: LitId, ctx: &dyn Fn() -> String) -> Result<(), ProblemError> {
        if lit.index() < self.literals.len() {
            Ok(())
        } else {
            Err(ProblemError::UnknownLiteral {
                context: ctx(),
                lit,
                count: self.literals.len(),
            })
        }
    }

    fn check_fluent(&self, fluent: FluentId, ctx: &dyn Fn() -> String) -> Result<(), ProblemError> {
        if fluent.index() < self.fluents.len() {
            Ok(())
        } else {
            Err(ProblemError::UnknownFluent {
                context: ctx(),
                fluent,
                count: self.fluents.len(),
            })
        }
    }

    fn check_expr(&self, e: &Expr, ctx: &dyn Fn() -> String) -> Result<(), ProblemError> {
        let mut fluents = Vec::new();
        e.fluents(&mut fluents);
        fluents.into_iter().try_for_each(|f| self.check_fluent(f, ctx))
    }

    fn check_goal(&self, g: &Goal, ctx: &dyn Fn() -> String) -> Result<(), ProblemError> {
        match g {
            Goal::True => Ok(()),
            Goal::Literal { lit, .. } => self.check_lit(*lit, ctx),
            Goal::Not(g) | Goal::Timed { goal: g, .. } | Goal::Preference { goal: g, .. } => self.check_goal(g, ctx),
            Goal::And(gs) | Goal::Or(gs) | Goal::Quantified { instances: gs, .. } => {
                gs.iter().try_for_each(|g| self.check_goal(g, ctx))
            }
            Goal::Imply(a, b) => {
                self.check_goal(a, ctx)?;
                self.check_goal(b, ctx)
            }
            Goal::Compare { lhs, rhs, .. } => {
                self.check_expr(lhs, ctx)?;
                self.check_expr(rhs, ctx)
            }
        }
    }

    fn check_effect(&self, e: &Effect, ctx: &dyn Fn() -> String) -> Result<(), ProblemError> {
        match e {
            Effect::Add(l) | Effect::Delete(l) => self.check_lit(*l, ctx),
            Effect::Assign { fluent, value, .. } => {
                self.check_fluent(*fluent, ctx)?;
                self.check_expr(value, ctx)
            }
            Effect::Continuous { fluent, rate, .. } => {
                self.check_fluent(*fluent, ctx)?;
                self.check_expr(rate, ctx)
            }
            Effect::Forall(es) | Effect::Timed { effects: es, .. } => {
                es.iter().try_for_each(|e| self.check_effect(e, ctx))
            }
            Effect::When { condition, effects } => {
                self.check_goal(condition, ctx)?;
                effects.iter().try_for_each(|e| self.check_effect(e, ctx))
            }
        }
    }
}

/// Incremental construction of a [GroundProblem], mirroring the order in which a grounder
/// discovers literals, fluents and actions.
#[derive(Default)]
pub struct ProblemBuilder {
    literals: Vec<GroundLiteral>,
    fluents: Vec<GroundFluent>,
    actions: Vec<GroundAction>,
    timed_literals: Vec<TimedLiteral>,
    goal: Option<Goal>,
}

impl ProblemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn literal(&mut self, name: impl Into<String>, initially: bool) -> LitId {
        let id = LitId::from(self.literals.len());
        self.literals.push(GroundLiteral {
            name: name.into(),
            initially,
        });
        id
    }

    pub fn fluent(&mut self, name: impl Into<String>, initially: Option<Rational64>) -> FluentId {
        let id = FluentId::from(self.fluents.len());
        self.fluents.push(GroundFluent {
            name: name.into(),
            initially,
        });
        id
    }

    pub fn action(&mut self, action: GroundAction) -> ActId {
        let id = ActId::from(self.actions.len());
        self.actions.push(action);
        id
    }

    /// Declares that `lit` takes `value` at `time`.
    pub fn timed_literal(&mut self, time: Rational64, lit: LitId, value: bool) -> TilId {
        let id = TilId::from(self.timed_literals.len());
        self.timed_literals.push(TimedLiteral { time, lit, value });
        id
    }

    pub fn goal(&mut self, goal: Goal) {
        self.goal = Some(goal);
    }

    pub fn build(self) -> Result<GroundProblem, ProblemError> {
        let mut names = std::collections::HashSet::new();
        for l in &self.literals {
            if !names.insert(l.name.as_str()) {
                return Err(ProblemError::DuplicatedLiteral(l.name.clone()));
            }
        }
        names.clear();
        for f in &self.fluents {
            if !names.insert(f.name.as_str()) {
                return Err(ProblemError::DuplicatedFluent(f.name.clone()));
            }
        }
        let pb = GroundProblem {
            literals: self.literals,
            fluents: self.fluents,
            actions: self.actions,
            timed_literals: self.timed_literals,
            goal: self.goal.unwrap_or(Goal::True),
        };
        pb.validate()?;
        Ok(pb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_dense() {
        let mut b = ProblemBuilder::new();
        let on = b.literal("(on light)", false);
        let off = b.literal("(off light)", true);
        let fuel = b.fluent("(fuel)", Some(Rational64::from_integer(10)));
        assert_eq!(on.index(), 0);
        assert_eq!(off.index(), 1);
        assert_eq!(fuel.index(), 0);
        assert_eq!(format!("{on} {off} {fuel}"), "l0 l1 f0");
        let pb = b.build().unwrap();
        assert_eq!(pb.num_literals(), 2);
        assert_eq!(pb.literal_ids().collect::<Vec<_>>(), vec![on, off]);
        assert_eq!(pb.goal, Goal::True);
    }

    #[test]
    fn unknown_literal_in_goal() {
        let mut b = ProblemBuilder::new();
        b.literal("(on light)", false);
        b.goal(Goal::pos(LitId::from(3)));
        match b.build() {
            Err(ProblemError::UnknownLiteral { lit, count, .. }) => {
                assert_eq!(lit, LitId::from(3));
                assert_eq!(count, 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn unknown_fluent_in_effect() {
        let mut b = ProblemBuilder::new();
        b.action(GroundAction::instantaneous(
            "refuel",
            Goal::True,
            vec![Effect::assign(FluentId::from(0), AssignOp::Assign, Expr::int(3))],
        ));
        assert!(matches!(b.build(), Err(ProblemError::UnknownFluent { .. })));
    }

    #[test]
    fn events_and_processes() {
        let mut b = ProblemBuilder::new();
        let full = b.literal("(full tank)", false);
        let level = b.fluent("(level tank)", Some(Rational64::from_integer(0)));
        let overflow = b.action(GroundAction::event(
            "overflow tank",
            Goal::compare(Expr::fluent(level), CmpOp::Geq, Expr::int(10)),
            vec![Effect::Add(full)],
        ));
        let fill = b.action(GroundAction::process(
            "fill tank",
            Goal::neg(full),
            vec![Effect::Continuous {
                sign: FlowSign::Increase,
                fluent: level,
                rate: Expr::int(1),
            }],
        ));
        let pb = b.build().unwrap();
        assert!(pb.action(overflow).is_event());
        assert!(!pb.action(overflow).is_durative());
        assert!(pb.action(fill).is_process());
        assert_eq!(pb.action(fill).describe(), "process (fill tank)");
    }

    #[test]
    fn timed_literals() {
        let mut b = ProblemBuilder::new();
        let open = b.literal("(open shop)", true);
        let closing = b.timed_literal(Rational64::from_integer(8), open, false);
        let pb = b.build().unwrap();
        assert_eq!(pb.num_timed_literals(), 1);
        assert_eq!(pb.timed_literal(closing).lit, open);
        assert_eq!(closing.to_string(), "t0");

        let mut b = ProblemBuilder::new();
        b.timed_literal(Rational64::from_integer(1), LitId::from(0), true);
        assert!(matches!(b.build(), Err(ProblemError::UnknownLiteral { .. })));

        let mut b = ProblemBuilder::new();
        let open = b.literal("(open shop)", true);
        let t = b.timed_literal(Rational64::new(-1, 2), open, false);
        assert_eq!(
            b.build().unwrap_err(),
            ProblemError::NegativeTime {
                til: t,
                time: Rational64::new(-1, 2)
            }
        );
    }

    #[test]
    fn duplicated_names() {
        let mut b = ProblemBuilder::new();
        b.literal("(on light)", false);
        b.literal("(on light)", true);
        assert_eq!(
            b.build().unwrap_err(),
            ProblemError::DuplicatedLiteral("(on light)".to_string())
        );
    }
}
