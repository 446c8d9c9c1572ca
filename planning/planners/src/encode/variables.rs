//! Allocation of the SMT variables of each layer.

use smtplan_planning::ground::{ActId, FluentId, GroundProblem, LitId, TilId};
use z3::ast::{Bool, Real};
use z3::Context;

/// Role of a variable in a layer.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Role {
    LiteralPre,
    LiteralPost,
    FluentPre,
    FluentPost,
    ActionStart,
    ActionEnd,
    ActionRunning,
    ActionDuration,
    LayerTime,
    /// True iff the timed literal happens at the layer.
    TimedLiteral,
}

/// Values just before (`Pre`) or just after (`Post`) the happening of a layer.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Phase {
    Pre,
    Post,
}

/// A point of the timeline at which literals and fluents can be read.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct Snapshot {
    pub layer: usize,
    pub phase: Phase,
}

impl Snapshot {
    pub fn pre(layer: usize) -> Snapshot {
        Snapshot {
            layer,
            phase: Phase::Pre,
        }
    }
    pub fn post(layer: usize) -> Snapshot {
        Snapshot {
            layer,
            phase: Phase::Post,
        }
    }
}

#[derive(Clone, Debug)]
pub enum Var<'ctx> {
    Bool(Bool<'ctx>),
    Real(Real<'ctx>),
}

struct LayerVars<'ctx> {
    time: Real<'ctx>,
    pre_literal: Vec<Bool<'ctx>>,
    pos_literal: Vec<Bool<'ctx>>,
    pre_fluent: Vec<Real<'ctx>>,
    pos_fluent: Vec<Real<'ctx>>,
    sta_action: Vec<Bool<'ctx>>,
    end_action: Vec<Bool<'ctx>>,
    run_action: Vec<Bool<'ctx>>,
    dur_action: Vec<Real<'ctx>>,
    til: Vec<Bool<'ctx>>,
}

/// All variables of the layers allocated so far.
///
/// Variables are created on the first request for a layer and reused afterwards:
/// a given (role, entity, layer) triple always denotes the same SMT constant.
pub struct Variables<'ctx> {
    ctx: &'ctx Context,
    num_literals: usize,
    num_fluents: usize,
    num_actions: usize,
    num_timed_literals: usize,
    layers: Vec<LayerVars<'ctx>>,
}

impl<'ctx> Variables<'ctx> {
    pub fn new(ctx: &'ctx Context, pb: &GroundProblem) -> Self {
        Variables {
            ctx,
            num_literals: pb.num_literals(),
            num_fluents: pb.num_fluents(),
            num_actions: pb.num_actions(),
            num_timed_literals: pb.num_timed_literals(),
            layers: Vec::new(),
        }
    }

    /// Number of layers for which variables exist.
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Number of variables in a single layer.
    pub fn vars_per_layer(&self) -> usize {
        2 * self.num_literals + 2 * self.num_fluents + 4 * self.num_actions + 1 + self.num_timed_literals
    }

    /// Makes sure that all variables of layers `0..=layer` exist.
    pub fn extend_to(&mut self, layer: usize) {
        while self.layers.len() <= layer {
            let n = self.layers.len();
            let ctx = self.ctx;
            let bools = |count: usize, tag: &str, id: fn(usize) -> String| -> Vec<Bool<'ctx>> {
                (0..count)
                    .map(|i| Bool::new_const(ctx, format!("{}.{tag}@{n}", id(i))))
                    .collect()
            };
            let reals = |count: usize, tag: &str, id: fn(usize) -> String| -> Vec<Real<'ctx>> {
                (0..count)
                    .map(|i| Real::new_const(ctx, format!("{}.{tag}@{n}", id(i))))
                    .collect()
            };
            let lit: fn(usize) -> String = |i| LitId::from(i).to_string();
            let fluent: fn(usize) -> String = |i| FluentId::from(i).to_string();
            let act: fn(usize) -> String = |i| ActId::from(i).to_string();
            let til: fn(usize) -> String = |i| TilId::from(i).to_string();
            self.layers.push(LayerVars {
                time: Real::new_const(ctx, format!("time@{n}")),
                pre_literal: bools(self.num_literals, "pre", lit),
                pos_literal: bools(self.num_literals, "post", lit),
                pre_fluent: reals(self.num_fluents, "pre", fluent),
                pos_fluent: reals(self.num_fluents, "post", fluent),
                sta_action: bools(self.num_actions, "start", act),
                end_action: bools(self.num_actions, "end", act),
                run_action: bools(self.num_actions, "run", act),
                dur_action: reals(self.num_actions, "dur", act),
                til: bools(self.num_timed_literals, "at", til),
            });
        }
    }

    fn layer(&self, layer: usize) -> &LayerVars<'ctx> {
        assert!(
            layer < self.layers.len(),
            "layer {layer} was not allocated ({} layers)",
            self.layers.len()
        );
        &self.layers[layer]
    }

    pub fn time(&self, layer: usize) -> &Real<'ctx> {
        &self.layer(layer).time
    }

    pub fn literal(&self, snapshot: Snapshot, lit: LitId) -> &Bool<'ctx> {
        let l = self.layer(snapshot.layer);
        match snapshot.phase {
            Phase::Pre => &l.pre_literal[lit.index()],
            Phase::Post => &l.pos_literal[lit.index()],
        }
    }

    pub fn fluent(&self, snapshot: Snapshot, fluent: FluentId) -> &Real<'ctx> {
        let l = self.layer(snapshot.layer);
        match snapshot.phase {
            Phase::Pre => &l.pre_fluent[fluent.index()],
            Phase::Post => &l.pos_fluent[fluent.index()],
        }
    }

    pub fn start(&self, act: ActId, layer: usize) -> &Bool<'ctx> {
        &self.layer(layer).sta_action[act.index()]
    }

    pub fn end(&self, act: ActId, layer: usize) -> &Bool<'ctx> {
        &self.layer(layer).end_action[act.index()]
    }

    pub fn running(&self, act: ActId, layer: usize) -> &Bool<'ctx> {
        &self.layer(layer).run_action[act.index()]
    }

    pub fn duration(&self, act: ActId, layer: usize) -> &Real<'ctx> {
        &self.layer(layer).dur_action[act.index()]
    }

    pub fn timed_literal(&self, til: TilId, layer: usize) -> &Bool<'ctx> {
        &self.layer(layer).til[til.index()]
    }

    /// Uniform access to any variable. `entity` is ignored for [Role::LayerTime].
    ///
    /// # Panics
    ///
    /// If the layer has not been allocated or if the entity is out of range for the role.
    pub fn variable(&self, role: Role, entity: usize, layer: usize) -> Var<'ctx> {
        match role {
            Role::LiteralPre => Var::Bool(self.literal(Snapshot::pre(layer), entity.into()).clone()),
            Role::LiteralPost => Var::Bool(self.literal(Snapshot::post(layer), entity.into()).clone()),
            Role::FluentPre => Var::Real(self.fluent(Snapshot::pre(layer), entity.into()).clone()),
            Role::FluentPost => Var::Real(self.fluent(Snapshot::post(layer), entity.into()).clone()),
            Role::ActionStart => Var::Bool(self.start(entity.into(), layer).clone()),
            Role::ActionEnd => Var::Bool(self.end(entity.into(), layer).clone()),
            Role::ActionRunning => Var::Bool(self.running(entity.into(), layer).clone()),
            Role::ActionDuration => Var::Real(self.duration(entity.into(), layer).clone()),
            Role::LayerTime => Var::Real(self.time(layer).clone()),
            Role::TimedLiteral => Var::Bool(self.timed_literal(entity.into(), layer).clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_rational::Rational64;
    use smtplan_planning::ground::{Goal, GroundAction, ProblemBuilder};
    use z3::Config;

    fn problem() -> GroundProblem {
        let mut b = ProblemBuilder::new();
        b.literal("(on light)", false);
        let broken = b.literal("(broken light)", false);
        b.fluent("(power)", None);
        b.action(GroundAction::instantaneous("turn-on light", Goal::True, vec![]));
        b.timed_literal(Rational64::from_integer(4), broken, true);
        b.build().unwrap()
    }

    #[test]
    fn layers_are_memoized() {
        let ctx = Context::new(&Config::new());
        let pb = problem();
        let mut vars = Variables::new(&ctx, &pb);
        assert_eq!(vars.num_layers(), 0);
        assert_eq!(vars.vars_per_layer(), 2 * 2 + 2 + 4 + 1 + 1);

        vars.extend_to(2);
        assert_eq!(vars.num_layers(), 3);
        let first = vars.literal(Snapshot::pre(1), LitId::from(1)).to_string();
        vars.extend_to(1);
        vars.extend_to(4);
        assert_eq!(vars.num_layers(), 5);
        assert_eq!(vars.literal(Snapshot::pre(1), LitId::from(1)).to_string(), first);
        match vars.variable(Role::LiteralPre, 1, 1) {
            Var::Bool(b) => assert_eq!(b.to_string(), first),
            Var::Real(_) => panic!("literals are boolean"),
        }
    }

    #[test]
    fn names_are_unique() {
        let ctx = Context::new(&Config::new());
        let pb = problem();
        let mut vars = Variables::new(&ctx, &pb);
        vars.extend_to(1);
        let mut names = std::collections::HashSet::new();
        let roles = [
            (Role::LiteralPre, 2),
            (Role::LiteralPost, 2),
            (Role::FluentPre, 1),
            (Role::FluentPost, 1),
            (Role::ActionStart, 1),
            (Role::ActionEnd, 1),
            (Role::ActionRunning, 1),
            (Role::ActionDuration, 1),
            (Role::LayerTime, 1),
            (Role::TimedLiteral, 1),
        ];
        for layer in 0..2 {
            for (role, count) in roles {
                for entity in 0..count {
                    let name = match vars.variable(role, entity, layer) {
                        Var::Bool(b) => b.to_string(),
                        Var::Real(r) => r.to_string(),
                    };
                    assert!(names.insert(name), "duplicated variable for {role:?} {entity} {layer}");
                }
            }
        }
        assert_eq!(names.len(), 2 * vars.vars_per_layer());
    }

    #[test]
    #[should_panic]
    fn unallocated_layer() {
        let ctx = Context::new(&Config::new());
        let pb = problem();
        let mut vars = Variables::new(&ctx, &pb);
        vars.extend_to(0);
        vars.time(1);
    }
}
