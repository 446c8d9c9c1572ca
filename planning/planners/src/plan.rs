//! Extraction of a timed plan from the model of a satisfiable encoding.

use crate::encode::variables::Variables;
use crate::error::EncodingError;
use itertools::Itertools;
use num_rational::Rational64;
use smtplan_planning::ground::{ActId, GroundProblem, OperatorKind};
use z3::ast::{Bool, Real};
use z3::Model;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanStep {
    pub action: ActId,
    pub name: String,
    /// Layer at which the action starts.
    pub layer: usize,
    pub start: Rational64,
    /// `None` for instantaneous actions.
    pub duration: Option<Rational64>,
}

impl PlanStep {
    pub fn end(&self) -> Rational64 {
        self.start + self.duration.unwrap_or_else(|| Rational64::from_integer(0))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Plan {
    /// Steps ordered by start time, then layer, then action.
    pub steps: Vec<PlanStep>,
    /// Horizon of the encoding the plan was found with.
    pub horizon: usize,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Time at which the last action ends.
    pub fn makespan(&self) -> Rational64 {
        self.steps
            .iter()
            .map(PlanStep::end)
            .max()
            .unwrap_or_else(|| Rational64::from_integer(0))
    }
}

fn bool_value<'ctx>(model: &Model<'ctx>, var: &Bool<'ctx>) -> bool {
    // unconstrained variables are completed with false
    model.eval(var, true).and_then(|v| v.as_bool()).unwrap_or(false)
}

fn real_value<'ctx>(model: &Model<'ctx>, var: &Real<'ctx>) -> Result<Rational64, EncodingError> {
    model
        .eval(var, true)
        .and_then(|v| v.as_real())
        .filter(|&(_, den)| den != 0)
        .map(|(num, den)| Rational64::new(num, den))
        .ok_or_else(|| EncodingError::NonRationalValue(var.to_string()))
}

/// Reads the actions started in layers `0..=horizon` of the model. Events and processes are left out.
pub fn extract_plan<'ctx>(
    model: &Model<'ctx>,
    pb: &GroundProblem,
    vars: &Variables<'ctx>,
    horizon: usize,
) -> Result<Plan, EncodingError> {
    let mut steps = Vec::new();
    for layer in 0..=horizon {
        for a in pb.action_ids() {
            let action = pb.action(a);
            // events and processes are not chosen by the planner
            if action.kind != OperatorKind::Action || !bool_value(model, vars.start(a, layer)) {
                continue;
            }
            let duration = if action.is_durative() {
                Some(real_value(model, vars.duration(a, layer))?)
            } else {
                None
            };
            steps.push(PlanStep {
                action: a,
                name: action.name.clone(),
                layer,
                start: real_value(model, vars.time(layer))?,
                duration,
            });
        }
    }
    let steps = steps
        .into_iter()
        .sorted_by_key(|s| (s.start, s.layer, s.action))
        .collect();
    Ok(Plan { steps, horizon })
}
