//! Layer-independent tables of the effects of all ground operators and timed literals, and of
//! the literals and fluents read by the conditions of the operators. The tables are instantiated
//! at each layer when building frame axioms and mutual exclusions.

use crate::error::EncodingError;
use smtplan_planning::ground::*;
use smtplan_planning::printer::Printer;

/// Instant of an action at which an effect occurs or a condition is read.
/// Effects of instantaneous actions and events occur at their start.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum Point {
    Start,
    End,
}

/// Identifies the happening of an operator that produces an effect or reads a condition.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct Key {
    pub action: ActId,
    pub point: Point,
}

/// What makes a literal effect happen.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum Trigger {
    Operator(Key),
    Timed(TilId),
}

#[derive(Clone, Debug)]
pub struct LiteralEffect<'a> {
    pub trigger: Trigger,
    /// Conditions of the enclosing conditional effects.
    pub guards: Vec<&'a Goal>,
}

#[derive(Clone, Debug)]
pub struct FluentUpdate<'a> {
    pub key: Key,
    pub guards: Vec<&'a Goal>,
    pub op: AssignOp,
    pub value: &'a Expr,
}

/// Continuous change of a fluent while a durative action or a process is running.
#[derive(Clone, Debug)]
pub struct Flow<'a> {
    pub action: ActId,
    pub sign: FlowSign,
    pub rate: &'a Expr,
}

#[derive(Default)]
pub struct EffectTables<'a> {
    /// Indexed by literal.
    pub adds: Vec<Vec<LiteralEffect<'a>>>,
    pub deletes: Vec<Vec<LiteralEffect<'a>>>,
    /// Indexed by fluent.
    pub updates: Vec<Vec<FluentUpdate<'a>>>,
    pub flows: Vec<Vec<Flow<'a>>>,
    /// Literal tests `(lit, polarity)` of the at-start and at-end conditions of each operator.
    pub reads: Vec<Vec<(Key, LitId, bool)>>,
    /// Indexed by fluent: happenings whose conditions or duration constraints compare the fluent.
    pub fluent_reads: Vec<Vec<Key>>,
}

impl<'a> EffectTables<'a> {
    pub fn new(pb: &'a GroundProblem) -> Result<Self, EncodingError> {
        let mut tables = EffectTables {
            adds: vec![Vec::new(); pb.num_literals()],
            deletes: vec![Vec::new(); pb.num_literals()],
            updates: vec![Vec::new(); pb.num_fluents()],
            flows: vec![Vec::new(); pb.num_fluents()],
            reads: vec![Vec::new(); pb.num_actions()],
            fluent_reads: vec![Vec::new(); pb.num_fluents()],
        };
        for a in pb.action_ids() {
            let action = pb.action(a);
            let mut collector = Collector {
                pb,
                action: a,
                tables: &mut tables,
                guards: Vec::new(),
            };
            for e in &action.effects {
                collector.effect(e, None)?;
            }
            if action.is_process() {
                // a process is not a happening and cannot interfere with one
                continue;
            }
            let (literals, fluents) = condition_reads(a, action);
            tables.reads[a.index()] = literals;
            for (key, fluent) in fluents {
                let Some(readers) = tables.fluent_reads.get_mut(fluent.index()) else {
                    return Err(EncodingError::UnknownFluent {
                        fluent,
                        context: format!("condition of {}", action.describe()),
                    });
                };
                if !readers.contains(&key) {
                    readers.push(key);
                }
            }
        }
        for t in pb.timed_literal_ids() {
            let til = pb.timed_literal(t);
            let table = if til.value { &mut tables.adds } else { &mut tables.deletes };
            let Some(effects) = table.get_mut(til.lit.index()) else {
                return Err(EncodingError::UnknownLiteral {
                    lit: til.lit,
                    context: format!("timed literal {t}"),
                });
            };
            effects.push(LiteralEffect {
                trigger: Trigger::Timed(t),
                guards: Vec::new(),
            });
        }
        Ok(tables)
    }

    /// Total number of discrete effects in the tables.
    pub fn num_discrete_effects(&self) -> usize {
        self.adds.iter().chain(self.deletes.iter()).map(Vec::len).sum::<usize>()
            + self.updates.iter().map(Vec::len).sum::<usize>()
    }
}

struct Collector<'a, 't> {
    pb: &'a GroundProblem,
    action: ActId,
    tables: &'t mut EffectTables<'a>,
    guards: Vec<&'a Goal>,
}

impl<'a, 't> Collector<'a, 't> {
    fn context(&self) -> String {
        self.pb.action(self.action).describe()
    }

    fn unsupported(&self, e: &Effect) -> EncodingError {
        EncodingError::Unsupported {
            construct: Printer::new(self.pb, e).to_string(),
            context: self.context(),
        }
    }

    fn check_literal(&self, lit: LitId) -> Result<(), EncodingError> {
        if lit.index() >= self.pb.num_literals() {
            return Err(EncodingError::UnknownLiteral {
                lit,
                context: format!("effects of {}", self.context()),
            });
        }
        Ok(())
    }

    fn check_fluent(&self, fluent: FluentId) -> Result<(), EncodingError> {
        if fluent.index() >= self.pb.num_fluents() {
            return Err(EncodingError::UnknownFluent {
                fluent,
                context: format!("effects of {}", self.context()),
            });
        }
        Ok(())
    }

    /// `timing` is the timing of the enclosing timed effect, if any.
    fn effect(&mut self, e: &'a Effect, timing: Option<Timing>) -> Result<(), EncodingError> {
        let action = self.pb.action(self.action);
        let durative = action.is_durative();
        // processes only change fluents continuously
        if action.is_process() && !matches!(e, Effect::Continuous { .. } | Effect::Forall(_)) {
            return Err(self.unsupported(e));
        }
        let point = match timing {
            Some(Timing::AtEnd) => Point::End,
            _ => Point::Start,
        };
        let key = Key {
            action: self.action,
            point,
        };
        match e {
            Effect::Add(lit) => {
                self.check_literal(*lit)?;
                let eff = LiteralEffect {
                    trigger: Trigger::Operator(key),
                    guards: self.guards.clone(),
                };
                self.tables.adds[lit.index()].push(eff);
            }
            Effect::Delete(lit) => {
                self.check_literal(*lit)?;
                let eff = LiteralEffect {
                    trigger: Trigger::Operator(key),
                    guards: self.guards.clone(),
                };
                self.tables.deletes[lit.index()].push(eff);
            }
            Effect::Assign { op, fluent, value } => {
                self.check_fluent(*fluent)?;
                let update = FluentUpdate {
                    key,
                    guards: self.guards.clone(),
                    op: *op,
                    value,
                };
                self.tables.updates[fluent.index()].push(update);
            }
            Effect::Continuous { sign, fluent, rate } => {
                if !(durative || action.is_process()) || timing.is_some() || !self.guards.is_empty() {
                    return Err(self.unsupported(e));
                }
                self.check_fluent(*fluent)?;
                self.tables.flows[fluent.index()].push(Flow {
                    action: self.action,
                    sign: *sign,
                    rate,
                });
            }
            Effect::Forall(effects) => {
                for e in effects {
                    self.effect(e, timing)?;
                }
            }
            Effect::When { condition, effects } => {
                self.guards.push(condition);
                for e in effects {
                    self.effect(e, timing)?;
                }
                self.guards.pop();
            }
            Effect::Timed { timing: t, effects } => {
                if !durative || timing.is_some() || *t == Timing::OverAll {
                    return Err(self.unsupported(e));
                }
                for e in effects {
                    self.effect(e, Some(*t))?;
                }
            }
        }
        Ok(())
    }
}

/// Literal tests and compared fluents of the at-start (or untimed) and at-end top-level
/// conjuncts of the condition of an operator. The duration constraint is read at start.
#[allow(clippy::type_complexity)]
fn condition_reads(action: ActId, operator: &GroundAction) -> (Vec<(Key, LitId, bool)>, Vec<(Key, FluentId)>) {
    fn conjuncts<'g>(g: &'g Goal, out: &mut Vec<&'g Goal>) {
        match g {
            Goal::And(gs) => gs.iter().for_each(|g| conjuncts(g, out)),
            _ => out.push(g),
        }
    }
    let mut top = Vec::new();
    conjuncts(&operator.condition, &mut top);

    let mut literals = Vec::new();
    let mut fluents = Vec::new();
    let mut tests = Vec::new();
    let mut compared = Vec::new();
    for g in top {
        let (point, g) = match g {
            Goal::Timed {
                timing: Timing::AtStart,
                goal,
            } => (Point::Start, goal.as_ref()),
            Goal::Timed {
                timing: Timing::AtEnd,
                goal,
            } => (Point::End, goal.as_ref()),
            // protected by the condition itself, asserted on both sides of each happening
            Goal::Timed {
                timing: Timing::OverAll,
                ..
            } => continue,
            g => (Point::Start, g),
        };
        let key = Key { action, point };
        tests.clear();
        g.literal_tests(true, &mut tests);
        literals.extend(tests.iter().map(|&(lit, positive)| (key, lit, positive)));
        compared.clear();
        g.fluents(&mut compared);
        fluents.extend(compared.iter().map(|&f| (key, f)));
    }
    if let Some(duration) = &operator.duration {
        compared.clear();
        duration.fluents(&mut compared);
        let key = Key {
            action,
            point: Point::Start,
        };
        fluents.extend(compared.iter().map(|&f| (key, f)));
    }
    (literals, fluents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_rational::Rational64;

    #[test]
    fn tables() {
        let mut b = ProblemBuilder::new();
        let on = b.literal("(on)", false);
        let broken = b.literal("(broken)", false);
        let fuel = b.fluent("(fuel)", None);
        let toggle = b.action(GroundAction::instantaneous(
            "toggle",
            Goal::And(vec![Goal::neg(broken), Goal::Not(Box::new(Goal::pos(on)))]),
            vec![
                Effect::Add(on),
                Effect::When {
                    condition: Goal::pos(on),
                    effects: vec![Effect::Delete(on)],
                },
            ],
        ));
        let drive = b.action(GroundAction::durative(
            "drive",
            Goal::compare(Expr::Duration, CmpOp::Eq, Expr::int(3)),
            Goal::And(vec![
                Goal::timed(Timing::AtStart, Goal::pos(on)),
                Goal::timed(Timing::OverAll, Goal::neg(broken)),
                Goal::timed(Timing::AtEnd, Goal::neg(broken)),
            ]),
            vec![
                Effect::at_start(vec![Effect::assign(fuel, AssignOp::Decrease, Expr::int(1))]),
                Effect::at_end(vec![Effect::Forall(vec![Effect::Delete(on), Effect::Add(broken)])]),
                Effect::Continuous {
                    sign: FlowSign::Decrease,
                    fluent: fuel,
                    rate: Expr::int(2),
                },
            ],
        ));
        let pb = b.build().unwrap();
        let t = EffectTables::new(&pb).unwrap();

        let start = |action| Key {
            action,
            point: Point::Start,
        };
        let end = |action| Key {
            action,
            point: Point::End,
        };
        let by = |key| Trigger::Operator(key);
        assert_eq!(t.adds[on.index()].len(), 1);
        assert_eq!(t.adds[on.index()][0].trigger, by(start(toggle)));
        let dels: Vec<_> = t.deletes[on.index()]
            .iter()
            .map(|e| (e.trigger, e.guards.len()))
            .collect();
        assert_eq!(dels, vec![(by(start(toggle)), 1), (by(end(drive)), 0)]);
        assert_eq!(t.adds[broken.index()][0].trigger, by(end(drive)));
        assert_eq!(t.updates[fuel.index()][0].key, start(drive));
        assert_eq!(t.flows[fuel.index()].len(), 1);
        assert_eq!(t.num_discrete_effects(), 5);

        assert_eq!(
            t.reads[toggle.index()],
            vec![(start(toggle), broken, false), (start(toggle), on, false)]
        );
        assert_eq!(
            t.reads[drive.index()],
            vec![(start(drive), on, true), (end(drive), broken, false)]
        );
    }

    #[test]
    fn compared_fluents() {
        let mut b = ProblemBuilder::new();
        let money = b.fluent("(money)", None);
        let price = b.fluent("(price)", None);
        let stock = b.fluent("(stock)", None);
        let buy = b.action(GroundAction::instantaneous(
            "buy",
            Goal::And(vec![
                Goal::compare(Expr::fluent(money), CmpOp::Geq, Expr::fluent(price)),
                Goal::compare(Expr::fluent(money), CmpOp::Gt, Expr::int(0)),
            ]),
            vec![Effect::assign(money, AssignOp::Decrease, Expr::fluent(price))],
        ));
        let deliver = b.action(GroundAction::durative(
            "deliver",
            Goal::compare(Expr::Duration, CmpOp::Eq, Expr::fluent(stock)),
            Goal::And(vec![
                Goal::timed(Timing::OverAll, Goal::compare(Expr::fluent(price), CmpOp::Leq, Expr::int(9))),
                Goal::timed(Timing::AtEnd, Goal::compare(Expr::fluent(money), CmpOp::Leq, Expr::int(9))),
            ]),
            vec![],
        ));
        b.action(GroundAction::process(
            "inflation",
            Goal::compare(Expr::fluent(price), CmpOp::Lt, Expr::int(100)),
            vec![Effect::Continuous {
                sign: FlowSign::Increase,
                fluent: price,
                rate: Expr::int(1),
            }],
        ));
        let pb = b.build().unwrap();
        let t = EffectTables::new(&pb).unwrap();
        let key = |action, point| Key { action, point };
        assert_eq!(
            t.fluent_reads[money.index()],
            vec![key(buy, Point::Start), key(deliver, Point::End)]
        );
        // over-all conditions and process conditions are not happenings
        assert_eq!(t.fluent_reads[price.index()], vec![key(buy, Point::Start)]);
        assert_eq!(t.fluent_reads[stock.index()], vec![key(deliver, Point::Start)]);
        assert_eq!(t.flows[price.index()].len(), 1);
    }

    #[test]
    fn timed_literals() {
        let mut b = ProblemBuilder::new();
        let open = b.literal("(open)", false);
        let opening = b.timed_literal(Rational64::from_integer(8), open, true);
        let closing = b.timed_literal(Rational64::from_integer(18), open, false);
        let pb = b.build().unwrap();
        let t = EffectTables::new(&pb).unwrap();
        assert_eq!(t.adds[open.index()][0].trigger, Trigger::Timed(opening));
        assert_eq!(t.deletes[open.index()][0].trigger, Trigger::Timed(closing));
        assert_eq!(t.num_discrete_effects(), 2);
    }

    #[test]
    fn misplaced_effects() {
        let mut b = ProblemBuilder::new();
        let on = b.literal("(on)", false);
        let fuel = b.fluent("(fuel)", None);
        let flow = Effect::Continuous {
            sign: FlowSign::Increase,
            fluent: fuel,
            rate: Expr::int(1),
        };
        b.action(GroundAction::instantaneous("jump", Goal::True, vec![flow.clone()]));
        b.action(GroundAction::instantaneous(
            "timed",
            Goal::True,
            vec![Effect::at_end(vec![Effect::Add(on)])],
        ));
        b.action(GroundAction::durative(
            "nested",
            Goal::True,
            Goal::True,
            vec![Effect::at_end(vec![Effect::at_start(vec![Effect::Add(on)])])],
        ));
        b.action(GroundAction::durative(
            "guarded-flow",
            Goal::True,
            Goal::True,
            vec![Effect::When {
                condition: Goal::pos(on),
                effects: vec![flow.clone()],
            }],
        ));
        b.action(GroundAction::event("flowing-event", Goal::pos(on), vec![flow]));
        b.action(GroundAction::process("switching-process", Goal::pos(on), vec![Effect::Delete(on)]));
        b.action(GroundAction::process(
            "stepping-process",
            Goal::pos(on),
            vec![Effect::assign(fuel, AssignOp::Increase, Expr::int(1))],
        ));
        let pb = b.build().unwrap();
        for a in pb.action_ids() {
            let mut single = ProblemBuilder::new();
            single.literal("(on)", false);
            single.fluent("(fuel)", None);
            single.action(pb.action(a).clone());
            let single = single.build().unwrap();
            match EffectTables::new(&single) {
                Err(EncodingError::Unsupported { context, .. }) => assert_eq!(context, pb.action(a).describe()),
                _ => panic!("effects of {} should be rejected", pb.action(a).name),
            }
        }
    }
}
