pub mod aggregation;
pub mod analysis;
pub mod embodied;
pub mod emissions;
pub mod error;
pub mod logger;
pub mod ratio;
pub mod rollup;
pub mod simulation;
pub mod validation;
pub mod week;
