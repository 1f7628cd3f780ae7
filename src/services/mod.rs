pub mod classifier;
pub mod error;
