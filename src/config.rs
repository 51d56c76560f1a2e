//! Configuration management

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::services::plan_import::{parse_clock_time, WindowDepartures};
use crate::services::routing::{DistanceMatrixConfig, MatrixSource};
use crate::services::sequencer::{DuplicateEquipmentPolicy, SequencerConfig};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the crew departs from and returns to
    pub home_base_address: Option<String>,

    /// Distance-matrix API endpoint (optional when a matrix file is given)
    pub matrix_api_url: Option<String>,

    /// Distance-matrix API key
    pub matrix_api_key: Option<String>,

    /// Distance-matrix request timeout
    pub matrix_timeout_seconds: u64,

    /// Directory for the daily rolling log file
    pub logs_dir: String,

    /// Scoring weights and policies
    pub sequencer: SequencerConfig,

    /// Default departures per service window
    pub departures: WindowDepartures,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut sequencer = SequencerConfig::default();
        if let Some(value) = var("SETUP_MINUTES_PER_UNIT") {
            sequencer.setup_minutes_per_unit = parse_number("SETUP_MINUTES_PER_UNIT", &value)?;
        }
        if let Some(value) = var("LATENESS_PENALTY") {
            sequencer.lateness_penalty = parse_weight("LATENESS_PENALTY", &value)?;
        }
        if let Some(value) = var("FAR_EARLY_BONUS") {
            sequencer.far_early_bonus = parse_weight("FAR_EARLY_BONUS", &value)?;
        }
        if let Some(value) = var("HIGH_PRIORITY_BONUS") {
            sequencer.high_priority_bonus = parse_weight("HIGH_PRIORITY_BONUS", &value)?;
        }
        if let Some(value) = var("HIGH_PRIORITY_CUTOFF") {
            sequencer.high_priority_cutoff =
                parse_clock_time(&value).context("HIGH_PRIORITY_CUTOFF must be HH:MM")?;
        }
        if let Some(value) = var("DUPLICATE_EQUIPMENT_POLICY") {
            sequencer.duplicate_equipment = DuplicateEquipmentPolicy::parse(&value).with_context(|| {
                format!("DUPLICATE_EQUIPMENT_POLICY must be 'reject' or 'last_wins', got '{}'", value)
            })?;
        }

        let mut departures = WindowDepartures::default();
        if let Some(value) = var("MORNING_DEPARTURE") {
            departures.morning = parse_clock_time(&value).context("MORNING_DEPARTURE must be HH:MM")?;
        }
        if let Some(value) = var("AFTERNOON_DEPARTURE") {
            departures.afternoon = parse_clock_time(&value).context("AFTERNOON_DEPARTURE must be HH:MM")?;
        }

        let matrix_timeout_seconds = match var("MATRIX_TIMEOUT_SECONDS") {
            Some(value) => parse_number("MATRIX_TIMEOUT_SECONDS", &value)?,
            None => DistanceMatrixConfig::default().timeout_seconds,
        };

        Ok(Self {
            home_base_address: var("HOME_BASE_ADDRESS"),
            matrix_api_url: var("MATRIX_API_URL"),
            matrix_api_key: var("MATRIX_API_KEY"),
            matrix_timeout_seconds,
            logs_dir: var("LOGS_DIR").unwrap_or_else(|| "logs".to_string()),
            sequencer,
            departures,
        })
    }

    /// Pick the matrix source: an explicit file wins over the API
    pub fn matrix_source(&self, matrix_file: Option<PathBuf>) -> Result<MatrixSource> {
        if let Some(path) = matrix_file {
            return Ok(MatrixSource::File(path));
        }

        let url = self
            .matrix_api_url
            .as_ref()
            .context("MATRIX_API_URL must be set when no --matrix file is given")?;

        let mut api = DistanceMatrixConfig::new(url.clone());
        api.timeout_seconds = self.matrix_timeout_seconds;
        if let Some(key) = &self.matrix_api_key {
            api = api.with_api_key(key.clone());
        }
        Ok(MatrixSource::Api(api))
    }
}

fn parse_number<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("{} must be a number, got '{}'", key, value))
}

/// Scoring weights must be finite and non-negative
fn parse_weight(key: &str, value: &str) -> Result<f64> {
    let weight: f64 = parse_number(key, value)?;
    if !weight.is_finite() || weight < 0.0 {
        anyhow::bail!("{} must be a finite, non-negative number, got '{}'", key, value);
    }
    Ok(weight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = config_from(&[]).unwrap();

        assert!(config.home_base_address.is_none());
        assert!(config.matrix_api_url.is_none());
        assert_eq!(config.matrix_timeout_seconds, 30);
        assert_eq!(config.logs_dir, "logs");
        assert_eq!(config.sequencer, SequencerConfig::default());
        assert_eq!(config.departures, WindowDepartures::default());
    }

    #[test]
    fn test_config_overrides() {
        let config = config_from(&[
            ("HOME_BASE_ADDRESS", "1 Warehouse Way"),
            ("SETUP_MINUTES_PER_UNIT", "15"),
            ("LATENESS_PENALTY", "250"),
            ("HIGH_PRIORITY_CUTOFF", "08:30"),
            ("DUPLICATE_EQUIPMENT_POLICY", "last_wins"),
            ("MORNING_DEPARTURE", "06:00"),
        ])
        .unwrap();

        assert_eq!(config.home_base_address.as_deref(), Some("1 Warehouse Way"));
        assert_eq!(config.sequencer.setup_minutes_per_unit, 15);
        assert_eq!(config.sequencer.lateness_penalty, 250.0);
        assert_eq!(config.sequencer.high_priority_cutoff, NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert_eq!(config.sequencer.duplicate_equipment, DuplicateEquipmentPolicy::LastWins);
        assert_eq!(config.departures.morning, NaiveTime::from_hms_opt(6, 0, 0).unwrap());
        assert_eq!(config.departures.afternoon, NaiveTime::from_hms_opt(12, 30, 0).unwrap());
    }

    #[test]
    fn test_config_blank_values_ignored() {
        let config = config_from(&[("MATRIX_API_URL", "  "), ("SETUP_MINUTES_PER_UNIT", "")]).unwrap();
        assert!(config.matrix_api_url.is_none());
        assert_eq!(config.sequencer.setup_minutes_per_unit, 20);
    }

    #[test]
    fn test_config_invalid_number_is_error() {
        let err = config_from(&[("SETUP_MINUTES_PER_UNIT", "twenty")]).unwrap_err();
        assert!(err.to_string().contains("SETUP_MINUTES_PER_UNIT"));

        assert!(config_from(&[("LATENESS_PENALTY", "lots")]).is_err());
        assert!(config_from(&[("DUPLICATE_EQUIPMENT_POLICY", "first_wins")]).is_err());
        assert!(config_from(&[("AFTERNOON_DEPARTURE", "noon")]).is_err());
    }

    #[test]
    fn test_config_weights_must_be_finite_and_non_negative() {
        for value in ["NaN", "inf", "-inf", "-5"] {
            let err = config_from(&[("LATENESS_PENALTY", value)]).unwrap_err();
            assert!(err.to_string().contains("LATENESS_PENALTY"), "{}", value);
        }
        assert!(config_from(&[("FAR_EARLY_BONUS", "-0.1")]).is_err());
        assert!(config_from(&[("HIGH_PRIORITY_BONUS", "NaN")]).is_err());

        let config = config_from(&[("LATENESS_PENALTY", "0"), ("FAR_EARLY_BONUS", "0.25")]).unwrap();
        assert_eq!(config.sequencer.lateness_penalty, 0.0);
        assert_eq!(config.sequencer.far_early_bonus, 0.25);
    }

    #[test]
    fn test_matrix_source_file_wins() {
        let config = config_from(&[("MATRIX_API_URL", "http://matrix.local")]).unwrap();
        let source = config.matrix_source(Some(PathBuf::from("matrix.json"))).unwrap();
        assert!(matches!(source, MatrixSource::File(_)));
    }

    #[test]
    fn test_matrix_source_api() {
        let config = config_from(&[
            ("MATRIX_API_URL", "http://matrix.local"),
            ("MATRIX_API_KEY", "secret"),
            ("MATRIX_TIMEOUT_SECONDS", "5"),
        ])
        .unwrap();

        match config.matrix_source(None).unwrap() {
            MatrixSource::Api(api) => {
                assert_eq!(api.base_url, "http://matrix.local");
                assert_eq!(api.api_key.as_deref(), Some("secret"));
                assert_eq!(api.timeout_seconds, 5);
            }
            other => panic!("expected API source, got {:?}", other),
        }
    }

    #[test]
    fn test_matrix_source_requires_url() {
        let config = config_from(&[]).unwrap();
        assert!(config.matrix_source(None).is_err());
    }
}
