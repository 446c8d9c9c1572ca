//! Planning through satisfiability: encoding of ground temporal and numeric problems into
//! layers of SMT constraints solved with Z3.

pub mod encode;
pub mod error;
pub mod fmt;
pub mod options;
pub mod plan;
pub mod session;
pub mod solver;

pub use encode::Encoder;
pub use error::EncodingError;
pub use options::PlannerOptions;
pub use plan::{Plan, PlanStep};
pub use session::SolveStatus;
