//! Functions related to printing and formatting plans.

use crate::plan::Plan;
use anyhow::*;
use num_rational::Rational64;
use std::fmt::Write;

/// Renders a rational with three decimals, e.g. `2.500`.
/// Values too large to be counted in thousandths are rendered through `f64`.
pub fn format_time(value: Rational64) -> String {
    let exact = value
        .numer()
        .checked_mul(1000)
        .map(|numer| Rational64::new(numer, *value.denom()).round())
        .and_then(|millis| millis.numer().checked_abs().map(|abs| (*millis.numer() < 0, abs)));
    match exact {
        Some((negative, millis)) => {
            let sign = if negative { "-" } else { "" };
            format!("{sign}{}.{:03}", millis / 1000, millis % 1000)
        }
        None => format!("{:.3}", *value.numer() as f64 / *value.denom() as f64),
    }
}

/// Formats a plan in the classic temporal plan format, one action per line:
/// `start: (name) [duration]`. Instantaneous actions have no duration.
pub fn format_plan(plan: &Plan) -> Result<String> {
    let mut out = String::new();
    for step in &plan.steps {
        write!(out, "{:>5}: ({})", format_time(step.start), step.name)?;
        if let Some(duration) = step.duration {
            write!(out, " [{}]", format_time(duration))?;
        }
        writeln!(out)?;
    }
    Ok(out)
}
