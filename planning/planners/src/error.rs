use smtplan_planning::ground::{FluentId, LitId};

/// Structural failure of the encoding. Solver outcomes (unsat, unknown) are not errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EncodingError {
    #[error("the horizon must be a positive number of layers (got {0})")]
    InvalidHorizon(usize),
    #[error("unsupported construct `{construct}` in {context}")]
    Unsupported { construct: String, context: String },
    #[error("unknown literal {lit} in {context}")]
    UnknownLiteral { lit: LitId, context: String },
    #[error("unknown fluent {fluent} in {context}")]
    UnknownFluent { fluent: FluentId, context: String },
    #[error("unknown solver tactic \"{0}\"")]
    UnknownTactic(String),
    #[error("no model available (last check: {0})")]
    NoModel(String),
    #[error("the model has no rational value for `{0}`")]
    NonRationalValue(String),
}
