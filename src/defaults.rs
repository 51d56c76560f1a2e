use chrono::NaiveTime;

/// Setup time per handled unit
pub const SETUP_MINUTES_PER_UNIT: u32 = 20;

/// Score/cost weight of one minute of lateness
pub const LATENESS_PENALTY: f64 = 100.0;

/// Score bonus per minute of distance from the home base
pub const FAR_EARLY_BONUS: f64 = 0.1;

/// Flat score bonus for high-priority stops
pub const HIGH_PRIORITY_BONUS: f64 = 50.0;

/// Longest setup accepted for a single stop
pub const MAX_SETUP_MINUTES: u32 = 24 * 60;

/// Upper bound on local-search passes
pub const MAX_IMPROVEMENT_PASSES: usize = 1000;

/// Events starting before this time are high priority
pub fn high_priority_cutoff() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).expect("valid static high priority cutoff")
}

pub fn default_morning_departure() -> NaiveTime {
    NaiveTime::from_hms_opt(6, 30, 0).expect("valid static morning departure")
}

pub fn default_afternoon_departure() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 30, 0).expect("valid static afternoon departure")
}
