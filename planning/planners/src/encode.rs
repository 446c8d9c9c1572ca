//! Functions whose purpose is to encode a ground planning problem into a sequence of
//! layers of SMT variables, and the constraints relating them.
//!
//! Each layer `n` is a happening at time `time[n]`: the values of literals and fluents before
//! (`pre`) and after (`post`) the happening, and for each action whether it starts, ends or is
//! running after it. Events happen at a layer, processes run after it, and timed literals
//! happen at the layer whose time is their date.

pub mod effects;
pub mod parse;
pub mod variables;

use crate::encode::effects::{EffectTables, Key, LiteralEffect, Point, Trigger};
use crate::encode::parse::{EncState, ExprParser, ParseCtx};
use crate::encode::variables::{Snapshot, Variables};
use crate::error::EncodingError;
use crate::fmt::format_plan;
use crate::options::PlannerOptions;
use crate::plan::{extract_plan, Plan};
use crate::session::{Session, SolveStatus};
use num_rational::Rational64;
use smtplan_planning::analysis::{Algebraist, Monotonicity};
use smtplan_planning::ground::*;
use smtplan_planning::printer::Printer;
use z3::ast::{Ast, Bool, Real};
use z3::Context;

/// A durative action whose duration constraint admits no value.
/// Such an action can never be part of a plan, which is likely a modeling error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inconsistency {
    pub action: ActId,
    pub name: String,
    pub min: Rational64,
    pub max: Rational64,
}

/// Bounds on `?duration` implied by the constant comparisons at the top level of a
/// duration constraint. Each bound is a value and whether it is strict.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DurationRange {
    pub min: (Rational64, bool),
    pub max: Option<(Rational64, bool)>,
}

impl DurationRange {
    /// Durations are always strictly positive.
    pub fn of(constraint: &Goal) -> DurationRange {
        let mut range = DurationRange {
            min: (Rational64::from_integer(0), true),
            max: None,
        };
        range.restrict(constraint);
        range
    }

    fn restrict(&mut self, g: &Goal) {
        let (op, bound) = match g {
            Goal::And(gs) => return gs.iter().for_each(|g| self.restrict(g)),
            Goal::Compare { op, lhs, rhs } => match (lhs, rhs) {
                (Expr::Duration, e) => match e.as_constant() {
                    Some(c) => (*op, c),
                    None => return,
                },
                (e, Expr::Duration) => match e.as_constant() {
                    Some(c) => (op.mirror(), c),
                    None => return,
                },
                _ => return,
            },
            _ => return,
        };
        match op {
            CmpOp::Lt => self.upper(bound, true),
            CmpOp::Leq => self.upper(bound, false),
            CmpOp::Eq => {
                self.upper(bound, false);
                self.lower(bound, false)
            }
            CmpOp::Geq => self.lower(bound, false),
            CmpOp::Gt => self.lower(bound, true),
        }
    }

    fn lower(&mut self, value: Rational64, strict: bool) {
        let (lb, lb_strict) = self.min;
        if value > lb || (value == lb && strict) {
            self.min = (value, strict || (value == lb && lb_strict));
        }
    }

    fn upper(&mut self, value: Rational64, strict: bool) {
        self.max = match self.max {
            Some((ub, ub_strict)) if ub < value || (ub == value && ub_strict) => Some((ub, ub_strict)),
            _ => Some((value, strict)),
        };
    }

    pub fn is_empty(&self) -> bool {
        let (lb, lb_strict) = self.min;
        match self.max {
            None => false,
            Some((ub, ub_strict)) => lb > ub || (lb == ub && (lb_strict || ub_strict)),
        }
    }
}

/// Incremental encoder of a ground problem, owning the variables of all layers and the
/// solver session of the last encoding.
pub struct Encoder<'a, 'ctx> {
    ctx: &'ctx Context,
    pb: &'a GroundProblem,
    options: PlannerOptions,
    algebraist: &'a dyn Algebraist,
    vars: Variables<'ctx>,
    session: Session<'ctx>,
    tables: EffectTables<'a>,
    horizon: Option<usize>,
    inconsistencies: Vec<Inconsistency>,
}

impl<'a, 'ctx> Encoder<'a, 'ctx> {
    pub fn new(
        ctx: &'ctx Context,
        pb: &'a GroundProblem,
        options: &PlannerOptions,
        algebraist: &'a dyn Algebraist,
    ) -> Result<Self, EncodingError> {
        let session = Session::new(ctx, options)?;
        Ok(Encoder {
            ctx,
            pb,
            options: options.clone(),
            algebraist,
            vars: Variables::new(ctx, pb),
            session,
            tables: EffectTables::default(),
            horizon: None,
            inconsistencies: Vec::new(),
        })
    }

    pub fn problem(&self) -> &'a GroundProblem {
        self.pb
    }

    /// Horizon of the last successful call to [Encoder::encode].
    pub fn horizon(&self) -> Option<usize> {
        self.horizon
    }

    pub fn variables(&self) -> &Variables<'ctx> {
        &self.vars
    }

    /// Actions with an empty duration range, detected by the last encoding.
    pub fn inconsistencies(&self) -> &[Inconsistency] {
        &self.inconsistencies
    }

    pub fn num_assertions(&self) -> usize {
        self.session.num_assertions()
    }

    /// Adds a constraint on top of the current encoding, e.g. to force or forbid some actions.
    pub fn assert(&mut self, constraint: &Bool<'ctx>) {
        self.session.assert(constraint)
    }

    fn assert_all(&mut self, constraints: &[Bool<'ctx>]) {
        for c in constraints {
            self.session.assert(c);
        }
    }

    fn parser(&self) -> ExprParser<'_, 'ctx> {
        ExprParser::new(self.ctx, self.pb, &self.vars)
    }

    fn zero(&self) -> Real<'ctx> {
        Real::from_real(self.ctx, 0, 1)
    }

    /// Encodes the problem with layers `0..=horizon` in a fresh solver session.
    /// Variables of layers that were already allocated are reused.
    pub fn encode(&mut self, horizon: usize) -> Result<(), EncodingError> {
        if horizon == 0 {
            return Err(EncodingError::InvalidHorizon(horizon));
        }
        let encode_span = tracing::span!(tracing::Level::DEBUG, "ENCODING", horizon);
        let _x = encode_span.enter();

        self.session = Session::new(self.ctx, &self.options)?;
        self.horizon = None;
        self.inconsistencies.clear();
        self.tables = EffectTables::new(self.pb)?;
        self.check_durations();

        tracing::debug!("#literals: {}", self.pb.num_literals());
        tracing::debug!("#fluents: {}", self.pb.num_fluents());
        tracing::debug!("#actions: {}", self.pb.num_actions());
        tracing::debug!("#effects: {}", self.tables.num_discrete_effects());

        for n in 0..=horizon {
            self.encode_header(n);
        }
        {
            let span = tracing::span!(tracing::Level::TRACE, "initial state");
            let _span = span.enter();
            let constraints = self.initial_state();
            self.assert_all(&constraints);
        }
        {
            let span = tracing::span!(tracing::Level::TRACE, "timings");
            let _span = span.enter();
            let mut num_timing_constraints = 0;
            for n in 0..=horizon {
                let constraints = self.timings(n, horizon);
                num_timing_constraints += constraints.len();
                self.assert_all(&constraints);
            }
            tracing::debug!(%num_timing_constraints);
        }
        if self.pb.num_timed_literals() > 0 {
            let span = tracing::span!(tracing::Level::TRACE, "timed literals");
            let _span = span.enter();
            let constraints = self.timed_literals(horizon);
            let num_timed_literal_constraints = constraints.len();
            self.assert_all(&constraints);
            tracing::debug!(%num_timed_literal_constraints);
        }
        {
            let span = tracing::span!(tracing::Level::TRACE, "literal support");
            let _span = span.enter();
            let mut num_frame_axioms = 0;
            let mut num_mutex_constraints = 0;
            for n in 0..=horizon {
                let (frame, mutex) = self.literal_support(n)?;
                num_frame_axioms += frame.len();
                num_mutex_constraints += mutex.len();
                self.assert_all(&frame);
                self.assert_all(&mutex);
            }
            tracing::debug!(%num_frame_axioms);
            tracing::debug!(%num_mutex_constraints);
        }
        {
            let span = tracing::span!(tracing::Level::TRACE, "function support");
            let _span = span.enter();
            let mut num_function_constraints = 0;
            for n in 0..=horizon {
                let mut constraints = self.function_support(n)?;
                if n > 0 {
                    constraints.extend(self.function_flows(n)?);
                }
                num_function_constraints += constraints.len();
                self.assert_all(&constraints);
            }
            tracing::debug!(%num_function_constraints);
        }
        {
            let span = tracing::span!(tracing::Level::TRACE, "conditions");
            let _span = span.enter();
            let mut num_condition_constraints = 0;
            for n in 0..=horizon {
                let mut constraints = self.conditions(n)?;
                constraints.extend(self.durations(n)?);
                num_condition_constraints += constraints.len();
                self.assert_all(&constraints);
            }
            tracing::debug!(%num_condition_constraints);
        }
        {
            let span = tracing::span!(tracing::Level::TRACE, "events and processes");
            let _span = span.enter();
            let mut num_trigger_constraints = 0;
            for n in 0..=horizon {
                let constraints = self.triggers(n, horizon)?;
                num_trigger_constraints += constraints.len();
                self.assert_all(&constraints);
            }
            tracing::debug!(%num_trigger_constraints);
        }
        {
            let span = tracing::span!(tracing::Level::TRACE, "goal");
            let _span = span.enter();
            let goal = self.goal_state(horizon)?;
            self.session.assert(&goal);
        }

        self.horizon = Some(horizon);
        tracing::debug!("#assertions: {}", self.session.num_assertions());
        tracing::debug!("Done.");
        Ok(())
    }

    /// Checks the satisfiability of the current encoding.
    pub fn solve(&mut self) -> SolveStatus {
        let status = self.session.check();
        tracing::info!(horizon = ?self.horizon, %status);
        status
    }

    /// Plan read from the model of the last satisfiable check.
    pub fn plan(&self) -> Result<Plan, EncodingError> {
        let horizon = self
            .horizon
            .ok_or_else(|| EncodingError::NoModel("nothing encoded".to_string()))?;
        let model = self.session.model()?;
        extract_plan(&model, self.pb, &self.vars, horizon)
    }

    /// Prints the plan of the last satisfiable check on the standard output.
    pub fn print_model(&self) -> anyhow::Result<()> {
        let plan = self.plan()?;
        println!("{}", format_plan(&plan)?);
        Ok(())
    }

    fn check_durations(&mut self) {
        for a in self.pb.action_ids() {
            let action = self.pb.action(a);
            let Some(constraint) = &action.duration else {
                continue;
            };
            let range = DurationRange::of(constraint);
            if range.is_empty() {
                let max = range.max.map(|(ub, _)| ub).unwrap_or(range.min.0);
                tracing::warn!(
                    "Empty duration range for action ({}): {}",
                    action.name,
                    Printer::new(self.pb, constraint)
                );
                self.inconsistencies.push(Inconsistency {
                    action: a,
                    name: action.name.clone(),
                    min: range.min.0,
                    max,
                });
            }
        }
    }

    fn encode_header(&mut self, n: usize) {
        self.vars.extend_to(n);
    }

    fn initial_state(&self) -> Vec<Bool<'ctx>> {
        let p = self.parser();
        let init = Snapshot::pre(0);
        let mut constraints = vec![self.vars.time(0).ge(&self.zero())];
        for l in self.pb.literal_ids() {
            let value = p.bool_cst(self.pb.literal(l).initially);
            constraints.push(self.vars.literal(init, l)._eq(&value));
        }
        for f in self.pb.fluent_ids() {
            if let Some(value) = self.pb.fluent(f).initially {
                constraints.push(self.vars.fluent(init, f)._eq(&p.real_cst(value)));
            }
        }
        constraints
    }

    fn timings(&self, n: usize, horizon: usize) -> Vec<Bool<'ctx>> {
        let p = self.parser();
        let vars = &self.vars;
        let zero = self.zero();
        let mut constraints = Vec::new();
        let time = vars.time(n);
        if n > 0 {
            constraints.push(time.ge(vars.time(n - 1)));
        }
        for a in self.pb.action_ids() {
            let start = vars.start(a, n);
            let end = vars.end(a, n);
            let running = vars.running(a, n);
            if self.pb.action(a).is_process() {
                // running while its condition holds, see `triggers`
                constraints.push(start.not());
                constraints.push(end.not());
                continue;
            }
            if !self.pb.action(a).is_durative() {
                constraints.push(end.not());
                constraints.push(running.not());
                continue;
            }
            let duration = vars.duration(a, n);
            constraints.push(start.implies(&duration.gt(&zero)));
            if n == 0 {
                constraints.push(end.not());
                constraints.push(running._eq(start));
            } else {
                let was_running = vars.running(a, n - 1);
                let carried_on = p.and(&[was_running.clone(), end.not()]);
                constraints.push(running._eq(&p.or(&[start.clone(), carried_on.clone()])));
                constraints.push(end.implies(was_running));
                // no self overlap: a running instance must end to start again
                constraints.push(p.and(&[start.clone(), was_running.clone()]).implies(end));
                constraints.push(carried_on.implies(&duration._eq(vars.duration(a, n - 1))));

                // the end at `n` matches the last start before it
                let mut not_ended = Vec::new();
                for m in (0..n).rev() {
                    let mut matched = vec![vars.start(a, m).clone(), end.clone()];
                    matched.extend(not_ended.iter().cloned());
                    let elapsed = Real::sub(self.ctx, &[time, vars.time(m)]);
                    constraints.push(p.and(&matched).implies(&elapsed._eq(vars.duration(a, m))));
                    not_ended.push(vars.end(a, m).not());
                }
            }
            if n == horizon {
                constraints.push(running.not());
            }
        }
        constraints
    }

    fn indicator(&self, key: Key, n: usize) -> &Bool<'ctx> {
        match key.point {
            Point::Start => self.vars.start(key.action, n),
            Point::End => self.vars.end(key.action, n),
        }
    }

    /// Variable denoting `?duration` for an effect of the action at layer `n`.
    /// At the end of an action, its duration is the one of the previous layer.
    fn effect_duration(&self, key: Key, n: usize) -> Option<&Real<'ctx>> {
        if !self.pb.action(key.action).is_durative() {
            return None;
        }
        let layer = match key.point {
            Point::Start => n,
            Point::End => n.saturating_sub(1),
        };
        Some(self.vars.duration(key.action, layer))
    }

    /// Formula true iff the effect is triggered at layer `n`: its happening occurs and the
    /// guards of its enclosing conditional effects hold on the layer's pre-values.
    fn triggered(&self, key: Key, guards: &[&Goal], n: usize) -> Result<Bool<'ctx>, EncodingError> {
        let p = self.parser();
        let c = ParseCtx::new(EncState::Literal, Snapshot::pre(n)).for_action(key.action, self.effect_duration(key, n));
        let mut parts = vec![self.indicator(key, n).clone()];
        for g in guards {
            parts.push(p.goal(g, &c)?);
        }
        Ok(p.and(&parts))
    }

    fn literal_trigger(&self, e: &LiteralEffect, n: usize) -> Result<Bool<'ctx>, EncodingError> {
        match e.trigger {
            Trigger::Operator(key) => self.triggered(key, &e.guards, n),
            Trigger::Timed(t) => Ok(self.vars.timed_literal(t, n).clone()),
        }
    }

    /// Each timed literal happens at a layer whose time is its date, unless the plan ends before.
    fn timed_literals(&self, horizon: usize) -> Vec<Bool<'ctx>> {
        let p = self.parser();
        let mut constraints = Vec::new();
        for t in self.pb.timed_literal_ids() {
            let date = p.real_cst(self.pb.timed_literal(t).time);
            let mut layers = Vec::with_capacity(horizon + 1);
            for n in 0..=horizon {
                let happens = self.vars.timed_literal(t, n);
                constraints.push(happens.implies(&self.vars.time(n)._eq(&date)));
                layers.push(happens.clone());
            }
            constraints.push(self.vars.time(horizon).ge(&date).implies(&p.or(&layers)));
        }
        constraints
    }

    /// Frame axioms and mutual exclusions of literals at layer `n`.
    #[allow(clippy::type_complexity)]
    fn literal_support(&self, n: usize) -> Result<(Vec<Bool<'ctx>>, Vec<Bool<'ctx>>), EncodingError> {
        let p = self.parser();
        let mut frame = Vec::new();
        let mut mutex = Vec::new();
        let mut adds = Vec::with_capacity(self.pb.num_literals());
        let mut deletes = Vec::with_capacity(self.pb.num_literals());

        for l in self.pb.literal_ids() {
            let pre = self.vars.literal(Snapshot::pre(n), l);
            let post = self.vars.literal(Snapshot::post(n), l);
            if n > 0 {
                frame.push(pre._eq(self.vars.literal(Snapshot::post(n - 1), l)));
            }
            let add: Vec<Bool<'ctx>> = self.tables.adds[l.index()]
                .iter()
                .map(|e| self.literal_trigger(e, n))
                .collect::<Result<_, _>>()?;
            let del: Vec<Bool<'ctx>> = self.tables.deletes[l.index()]
                .iter()
                .map(|e| self.literal_trigger(e, n))
                .collect::<Result<_, _>>()?;

            // deletes apply before adds of the same happening
            let persists = p.and(&[pre.clone(), p.or(&del).not()]);
            let mut support = add.clone();
            support.push(persists);
            frame.push(post._eq(&p.or(&support)));

            for (ea, a) in self.tables.adds[l.index()].iter().zip(&add) {
                for (ed, d) in self.tables.deletes[l.index()].iter().zip(&del) {
                    if ea.trigger != ed.trigger {
                        mutex.push(p.and(&[a.clone(), d.clone()]).not());
                    }
                }
            }
            adds.push(add);
            deletes.push(del);
        }

        // an action may not read a literal at an instant where another happening writes its negation
        for a in self.pb.action_ids() {
            for &(key, lit, positive) in &self.tables.reads[a.index()] {
                let (effects, triggers) = if positive {
                    (&self.tables.deletes[lit.index()], &deletes[lit.index()])
                } else {
                    (&self.tables.adds[lit.index()], &adds[lit.index()])
                };
                let reader = self.indicator(key, n);
                for (e, t) in effects.iter().zip(triggers) {
                    if e.trigger != Trigger::Operator(key) {
                        mutex.push(p.and(&[reader.clone(), t.clone()]).not());
                    }
                }
            }
        }
        Ok((frame, mutex))
    }

    /// Discrete updates of fluents at layer `n`.
    fn function_support(&self, n: usize) -> Result<Vec<Bool<'ctx>>, EncodingError> {
        let p = self.parser();
        let zero = self.zero();
        let mut constraints = Vec::new();
        for f in self.pb.fluent_ids() {
            let pre = self.vars.fluent(Snapshot::pre(n), f);
            let post = self.vars.fluent(Snapshot::post(n), f);
            let monotonicity = self.algebraist.monotonicity(f);

            if monotonicity == Monotonicity::Constant {
                match self.pb.fluent(f).initially {
                    Some(value) => {
                        let value = p.real_cst(value);
                        constraints.push(pre._eq(&value));
                        constraints.push(post._eq(&value));
                    }
                    None => constraints.push(post._eq(pre)),
                }
                continue;
            }

            let updates = &self.tables.updates[f.index()];
            if updates.is_empty() {
                constraints.push(post._eq(pre));
                continue;
            }
            let mut triggers = Vec::with_capacity(updates.len());
            let mut additive = vec![pre.clone()];
            let mut assigned = Vec::new();
            for u in updates {
                let trigger = self.triggered(u.key, &u.guards, n)?;
                let c = ParseCtx::new(EncState::ActionEffect, Snapshot::pre(n))
                    .for_action(u.key.action, self.effect_duration(u.key, n));
                let value = p.expr(u.value, &c)?;
                let new_value = match u.op {
                    AssignOp::Increase => {
                        additive.push(trigger.ite(&value, &zero));
                        None
                    }
                    AssignOp::Decrease => {
                        additive.push(trigger.ite(&value.unary_minus(), &zero));
                        None
                    }
                    AssignOp::Assign => Some(value),
                    AssignOp::ScaleUp => Some(Real::mul(self.ctx, &[pre, &value])),
                    AssignOp::ScaleDown => Some(pre.div(&value)),
                };
                if let Some(new_value) = new_value {
                    constraints.push(trigger.implies(&post._eq(&new_value)));
                    assigned.push(trigger.clone());
                }
                triggers.push(trigger);
            }
            constraints.push(p.or(&assigned).not().implies(&post._eq(&p.sum(&additive))));

            // an operator may not compare the fluent at an instant where another happening updates it
            for &reader in &self.tables.fluent_reads[f.index()] {
                let reading = self.indicator(reader, n);
                for (u, t) in updates.iter().zip(&triggers) {
                    if u.key != reader {
                        constraints.push(p.and(&[reading.clone(), t.clone()]).not());
                    }
                }
            }

            // updates of a monotone fluent are all additive and commute
            if !monotonicity.is_monotone() {
                for (i, u) in updates.iter().enumerate() {
                    for (j, w) in updates.iter().enumerate().skip(i + 1) {
                        if u.key != w.key && !(u.op.is_additive() && w.op.is_additive()) {
                            constraints.push(p.and(&[triggers[i].clone(), triggers[j].clone()]).not());
                        }
                    }
                }
            }
        }
        Ok(constraints)
    }

    /// Continuous change of fluents between layers `n - 1` and `n`.
    fn function_flows(&self, n: usize) -> Result<Vec<Bool<'ctx>>, EncodingError> {
        debug_assert!(n > 0);
        let p = self.parser();
        let zero = self.zero();
        let mut constraints = Vec::new();
        let before = Snapshot::post(n - 1);
        let elapsed = Real::sub(self.ctx, &[self.vars.time(n), self.vars.time(n - 1)]);
        for f in self.pb.fluent_ids() {
            let pre = self.vars.fluent(Snapshot::pre(n), f);
            let previous = self.vars.fluent(before, f);
            let flows = &self.tables.flows[f.index()];
            if flows.is_empty() {
                constraints.push(pre._eq(previous));
                continue;
            }
            let mut changes = Vec::with_capacity(flows.len());
            for flow in flows {
                let duration = self
                    .pb
                    .action(flow.action)
                    .is_durative()
                    .then(|| self.vars.duration(flow.action, n - 1));
                let c = ParseCtx::new(EncState::ActionEffect, before).for_action(flow.action, duration);
                let mut rate_fluents = Vec::new();
                flow.rate.fluents(&mut rate_fluents);
                if rate_fluents.iter().any(|&g| self.algebraist.is_continuous(g)) {
                    return Err(EncodingError::Unsupported {
                        construct: format!("rate {} of continuous fluents", Printer::new(self.pb, flow.rate)),
                        context: p.describe(&c),
                    });
                }
                let rate = p.expr(flow.rate, &c)?;
                let rate = match flow.sign {
                    FlowSign::Increase => rate,
                    FlowSign::Decrease => rate.unary_minus(),
                };
                let change = Real::mul(self.ctx, &[&rate, &elapsed]);
                changes.push(self.vars.running(flow.action, n - 1).ite(&change, &zero));
            }
            let mut total = vec![previous.clone()];
            total.extend(changes);
            constraints.push(pre._eq(&p.sum(&total)));
        }
        Ok(constraints)
    }

    fn conditions(&self, n: usize) -> Result<Vec<Bool<'ctx>>, EncodingError> {
        let p = self.parser();
        let vars = &self.vars;
        let mut constraints = Vec::new();
        for a in self.pb.action_ids() {
            let action = self.pb.action(a);
            if action.kind != OperatorKind::Action {
                continue;
            }
            let start = vars.start(a, n);
            let at = |snapshot, duration| ParseCtx::new(EncState::ActionCondition, snapshot).for_action(a, duration);
            if !action.is_durative() {
                let cond = p.goal(&action.condition, &at(Snapshot::pre(n), None))?;
                constraints.push(start.implies(&cond));
                continue;
            }
            let duration = Some(vars.duration(a, n));
            let previous_duration = Some(vars.duration(a, n.saturating_sub(1)));

            let at_start = at(Snapshot::pre(n), duration).selecting(Timing::AtStart);
            constraints.push(start.implies(&p.goal(&action.condition, &at_start)?));

            let at_end = at(Snapshot::pre(n), previous_duration).selecting(Timing::AtEnd);
            constraints.push(vars.end(a, n).implies(&p.goal(&action.condition, &at_end)?));

            let over_all = at(Snapshot::post(n), duration).selecting(Timing::OverAll);
            constraints.push(vars.running(a, n).implies(&p.goal(&action.condition, &over_all)?));
            if n > 0 {
                let over_all = at(Snapshot::pre(n), previous_duration).selecting(Timing::OverAll);
                constraints.push(vars.running(a, n - 1).implies(&p.goal(&action.condition, &over_all)?));
            }
        }
        Ok(constraints)
    }

    /// Events happen and processes run exactly when their conditions hold.
    fn triggers(&self, n: usize, horizon: usize) -> Result<Vec<Bool<'ctx>>, EncodingError> {
        let p = self.parser();
        let vars = &self.vars;
        let mut constraints = Vec::new();
        for a in self.pb.action_ids() {
            let action = self.pb.action(a);
            let holds = |snapshot| {
                let c = ParseCtx::new(EncState::ActionCondition, snapshot).for_action(a, None);
                p.goal(&action.condition, &c)
            };
            match action.kind {
                OperatorKind::Action => {}
                OperatorKind::Event => {
                    constraints.push(vars.start(a, n)._eq(&holds(Snapshot::pre(n))?));
                    // an event enabled by a happening occurs at the same time, in the next layer
                    let pending = holds(Snapshot::post(n))?;
                    if n < horizon {
                        constraints.push(pending.implies(&vars.time(n + 1)._eq(vars.time(n))));
                    } else {
                        constraints.push(pending.not());
                    }
                }
                OperatorKind::Process => {
                    constraints.push(vars.running(a, n)._eq(&holds(Snapshot::post(n))?));
                    if n > 0 {
                        constraints.push(vars.running(a, n - 1).implies(&holds(Snapshot::pre(n))?));
                    }
                }
            }
        }
        Ok(constraints)
    }

    fn durations(&self, n: usize) -> Result<Vec<Bool<'ctx>>, EncodingError> {
        let p = self.parser();
        let mut constraints = Vec::new();
        for a in self.pb.action_ids() {
            if let Some(constraint) = &self.pb.action(a).duration {
                let c = ParseCtx::new(EncState::ActionDuration, Snapshot::pre(n))
                    .for_action(a, Some(self.vars.duration(a, n)));
                constraints.push(self.vars.start(a, n).implies(&p.goal(constraint, &c)?));
            }
        }
        Ok(constraints)
    }

    fn goal_state(&self, horizon: usize) -> Result<Bool<'ctx>, EncodingError> {
        let c = ParseCtx::new(EncState::Goal, Snapshot::post(horizon));
        self.parser().goal(&self.pb.goal, &c)
    }
}
