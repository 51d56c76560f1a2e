//! Address-based distance-matrix API client
//!
//! Request: `GET {base_url}?origins=a|b|c&destinations=a|b|c&units=metric[&key=...]`
//! Response: one row per origin, one element per destination, each element
//! carrying its own `status`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{DistanceTimeMatrices, TravelMatrixProvider, UNREACHABLE};

/// Distance-matrix client configuration
#[derive(Debug, Clone)]
pub struct DistanceMatrixConfig {
    /// Matrix endpoint (e.g. "https://maps.example.com/distancematrix/json")
    pub base_url: String,
    /// API key appended as `key=` when present
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for DistanceMatrixConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/distancematrix/json".to_string(),
            api_key: None,
            timeout_seconds: 30,
        }
    }
}

impl DistanceMatrixConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

/// Distance-matrix HTTP client
pub struct DistanceMatrixClient {
    client: Client,
    config: DistanceMatrixConfig,
}

impl DistanceMatrixClient {
    pub fn new(config: DistanceMatrixConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &DistanceMatrixConfig {
        &self.config
    }

    /// Build the request URL with every location as both origin and destination
    fn build_matrix_url(&self, locations: &[String]) -> String {
        let joined = locations
            .iter()
            .map(|loc| urlencoding::encode(loc).into_owned())
            .collect::<Vec<_>>()
            .join("|");

        let mut url = format!(
            "{}?origins={}&destinations={}&units=metric",
            self.config.base_url, joined, joined
        );
        if let Some(key) = &self.config.api_key {
            url.push_str("&key=");
            url.push_str(&urlencoding::encode(key));
        }
        url
    }
}

/// Convert a parsed response into matrices, validating its shape
fn matrices_from_response(response: MatrixResponse, n: usize) -> Result<DistanceTimeMatrices> {
    if response.status != "OK" {
        anyhow::bail!(
            "Matrix API returned status {}: {}",
            response.status,
            response.error_message.unwrap_or_default()
        );
    }

    if response.rows.len() != n {
        anyhow::bail!("Matrix API returned {} rows for {} locations", response.rows.len(), n);
    }

    let mut distances = vec![vec![0u64; n]; n];
    let mut durations = vec![vec![0u64; n]; n];

    for (i, row) in response.rows.iter().enumerate() {
        if row.elements.len() != n {
            anyhow::bail!(
                "Matrix API returned {} elements in row {} for {} locations",
                row.elements.len(),
                i,
                n
            );
        }

        for (j, cell) in row.elements.iter().enumerate() {
            if i == j {
                continue;
            }
            match (cell.status.as_str(), &cell.distance, &cell.duration) {
                ("OK", Some(distance), Some(duration)) => {
                    distances[i][j] = distance.value;
                    durations[i][j] = duration.value;
                }
                (status, _, _) => {
                    warn!("No route for {} -> {} (status {})", i, j, status);
                    distances[i][j] = UNREACHABLE;
                    durations[i][j] = UNREACHABLE;
                }
            }
        }
    }

    Ok(DistanceTimeMatrices {
        distances,
        durations,
        size: n,
    })
}

#[async_trait]
impl TravelMatrixProvider for DistanceMatrixClient {
    async fn get_matrices(&self, locations: &[String]) -> Result<DistanceTimeMatrices> {
        let n = locations.len();

        if n == 0 {
            return Ok(DistanceTimeMatrices::empty());
        }

        if n == 1 {
            return Ok(DistanceTimeMatrices {
                distances: vec![vec![0]],
                durations: vec![vec![0]],
                size: 1,
            });
        }

        let url = self.build_matrix_url(locations);

        debug!("Requesting distance matrix for {} locations", n);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send request to matrix API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Matrix API returned error {}: {}", status, body);
        }

        let matrix_response: MatrixResponse = response
            .json()
            .await
            .context("Failed to parse matrix API response")?;

        let matrices = matrices_from_response(matrix_response, n)?;

        debug!("Received distance matrix: {}x{}", n, n);

        Ok(matrices)
    }

    fn name(&self) -> &str {
        "DistanceMatrixApi"
    }
}

// Matrix API types

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    /// "OK", "NOT_FOUND", "ZERO_RESULTS", ...
    status: String,
    distance: Option<ValueField>,
    duration: Option<ValueField>,
}

#[derive(Debug, Deserialize)]
struct ValueField {
    /// Meters for distance, seconds for duration
    value: u64,
}
