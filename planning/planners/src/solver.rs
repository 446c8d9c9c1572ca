use crate::encode::Encoder;
use crate::options::PlannerOptions;
use crate::plan::Plan;
use crate::session::SolveStatus;
use anyhow::Result;
use smtplan_planning::analysis::Algebraist;
use smtplan_planning::ground::GroundProblem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use z3::{Config, Context};

/// Outcome of the search over increasing horizons.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SolverResult {
    Plan(Plan),
    /// Every horizon up to the upper bound was proved unsatisfiable.
    NoPlan,
    /// No plan found and at least one horizon was inconclusive.
    Unknown,
    /// Interrupted through the abort flag.
    Aborted,
}

/// Search for a plan of `pb`.
///
/// The problem is encoded with an increasing horizon `h` (from the lower bound of the options,
/// by steps of `horizon_increment`) until the encoding is satisfiable or `h` goes over the
/// upper bound. The `abort` flag is checked before each horizon.
pub fn solve(
    pb: &GroundProblem,
    options: &PlannerOptions,
    algebraist: &dyn Algebraist,
    abort: &AtomicBool,
) -> Result<SolverResult> {
    let mut cfg = Config::new();
    cfg.set_model_generation(true);
    cfg.set_param_value("auto_config", "true");
    let ctx = Context::new(&cfg);
    let mut encoder = Encoder::new(&ctx, pb, options, algebraist)?;

    let start = Instant::now();
    let step = options.horizon_increment.max(1);
    let mut inconclusive = false;
    let mut horizon = options.lower_bound.max(1);
    while horizon <= options.upper_bound {
        if abort.load(Ordering::Relaxed) {
            tracing::info!(horizon, "aborted");
            return Ok(SolverResult::Aborted);
        }
        println!("{horizon} layers  [{:.3}s]", start.elapsed().as_secs_f32());
        encoder.encode(horizon)?;
        if horizon == options.lower_bound.max(1) {
            for inconsistency in encoder.inconsistencies() {
                println!(
                    "Inconsistent duration for ({}): min {} > max {}",
                    inconsistency.name, inconsistency.min, inconsistency.max
                );
            }
        }
        match encoder.solve() {
            SolveStatus::Satisfiable => {
                let plan = encoder.plan()?;
                println!("  Plan found  [{:.3}s]", start.elapsed().as_secs_f32());
                return Ok(SolverResult::Plan(plan));
            }
            SolveStatus::Unsatisfiable => {}
            SolveStatus::Unknown => inconclusive = true,
        }
        horizon += step;
    }
    Ok(if inconclusive {
        SolverResult::Unknown
    } else {
        SolverResult::NoPlan
    })
}
