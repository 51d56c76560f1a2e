//! Business logic services

pub mod plan_import;
pub mod routing;
pub mod sequencer;
