//! Monte Carlo projection of weekly net removal under sampled operating conditions.

pub mod builder;
pub mod engine;
pub mod settings;
pub mod state;
pub mod stats;
