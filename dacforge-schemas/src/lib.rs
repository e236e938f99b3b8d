pub mod configuration;
pub mod cycle;
pub mod embodied;
pub mod file_formats;
pub mod weekly;
