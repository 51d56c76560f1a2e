//! Crew Sequencer - single-crew drop-off and pickup route ordering
//!
//! Orders a crew's stops for one service window so that equipment is picked
//! up before it is delivered elsewhere and early events are set up on time.

pub mod cli;
pub mod config;
pub mod defaults;
pub mod services;
pub mod types;
