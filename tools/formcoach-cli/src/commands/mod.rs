pub mod analyze;
pub mod config;
pub mod live;
pub mod synth;
pub mod validate;
