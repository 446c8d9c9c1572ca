use std::str::FromStr;
use structopt::StructOpt;

/// Arithmetic theory in which fluents, durations and timepoints are reasoned about.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum NumericTheory {
    /// Non-linear real arithmetic: needed as soon as a fluent is multiplied by a duration.
    NonLinear,
    /// Linear real arithmetic.
    Linear,
}

impl NumericTheory {
    /// Tactic used to build the solver when none is explicitly requested.
    pub fn default_tactic(self) -> &'static str {
        match self {
            NumericTheory::NonLinear => "qfnra-nlsat",
            NumericTheory::Linear => "qflra",
        }
    }
}

impl FromStr for NumericTheory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nra" | "qf_nra" | "nonlinear" => Ok(NumericTheory::NonLinear),
            "lra" | "qf_lra" | "linear" => Ok(NumericTheory::Linear),
            x => Err(format!("Unknown numeric theory: '{x}'. Valid options are: 'nra', 'lra'")),
        }
    }
}

/// Options of the encoder and of the horizon search.
///
/// Meant to be flattened into the command line of a planner front-end.
#[derive(Debug, Clone, StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub struct PlannerOptions {
    /// Name of the Z3 tactic from which the solver is built.
    /// If absent, the default tactic of the numeric theory is used.
    #[structopt(long)]
    pub tactic: Option<String>,
    /// Numeric theory: "nra" (non-linear real arithmetic) or "lra" (linear real arithmetic).
    #[structopt(long, default_value = "nra")]
    pub theory: NumericTheory,
    /// Smallest horizon (number of layers after the initial one) to try.
    #[structopt(long, default_value = "1")]
    pub lower_bound: usize,
    /// Largest horizon to try before giving up.
    #[structopt(long, default_value = "100")]
    pub upper_bound: usize,
    /// Number of layers added to the horizon after each unsuccessful attempt.
    #[structopt(long = "step", default_value = "1")]
    pub horizon_increment: usize,
    /// Time limit of a single solver call, in seconds. An exhausted call is inconclusive.
    #[structopt(long)]
    pub timeout: Option<u32>,
}

impl PlannerOptions {
    pub fn tactic_name(&self) -> &str {
        self.tactic.as_deref().unwrap_or_else(|| self.theory.default_tactic())
    }
}

impl Default for PlannerOptions {
    fn default() -> Self {
        PlannerOptions {
            tactic: None,
            theory: NumericTheory::NonLinear,
            lower_bound: 1,
            upper_bound: 100,
            horizon_increment: 1,
            timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_command_line() {
        let parsed = PlannerOptions::from_iter(["smtplan"]);
        let default = PlannerOptions::default();
        assert_eq!(parsed.tactic, default.tactic);
        assert_eq!(parsed.theory, default.theory);
        assert_eq!(parsed.lower_bound, default.lower_bound);
        assert_eq!(parsed.upper_bound, default.upper_bound);
        assert_eq!(parsed.horizon_increment, default.horizon_increment);
        assert_eq!(parsed.tactic_name(), "qfnra-nlsat");
    }

    #[test]
    fn explicit_tactic() {
        let opt = PlannerOptions::from_iter(["smtplan", "--theory", "lra", "--step", "2", "--upper-bound", "8"]);
        assert_eq!(opt.tactic_name(), "qflra");
        assert_eq!(opt.horizon_increment, 2);
        assert_eq!(opt.upper_bound, 8);

        let opt = PlannerOptions::from_iter(["smtplan", "--theory", "lra", "--tactic", "smt"]);
        assert_eq!(opt.tactic_name(), "smt");
    }

    #[test]
    fn unknown_theory() {
        assert!("bitvectors".parse::<NumericTheory>().is_err());
        assert_eq!("QF_NRA".parse::<NumericTheory>(), Ok(NumericTheory::NonLinear));
    }
}
