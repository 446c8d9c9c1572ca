pub mod analysis;
pub mod ground;
pub mod printer;
