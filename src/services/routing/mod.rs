//! Travel matrix providers
//!
//! Uses an HTTP distance-matrix API for production, a static matrix for
//! offline runs and tests.

mod distance_matrix;
mod lazy;

pub use distance_matrix::{DistanceMatrixClient, DistanceMatrixConfig};
pub use lazy::{LazyMatrixProvider, ProviderState};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

/// Sentinel for a pair the provider reports as unreachable.
/// Very large but won't overflow when a few legs are summed.
pub const UNREACHABLE: u64 = u64::MAX / 4;

/// Longest single leg accepted from a provider (one week)
pub const MAX_LEG_SECONDS: u64 = 7 * 24 * 3600;

/// Distance and time matrices between locations
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceTimeMatrices {
    /// Distance in meters [i][j] from location i to location j
    pub distances: Vec<Vec<u64>>,
    /// Duration in seconds [i][j] from location i to location j
    pub durations: Vec<Vec<u64>>,
    /// Number of locations
    pub size: usize,
}

impl DistanceTimeMatrices {
    /// Create empty matrices
    pub fn empty() -> Self {
        Self {
            distances: vec![],
            durations: vec![],
            size: 0,
        }
    }

    /// Get distance from location i to location j in meters
    pub fn distance(&self, from: usize, to: usize) -> u64 {
        self.distances[from][to]
    }

    /// Get duration from location i to location j in seconds
    pub fn duration(&self, from: usize, to: usize) -> u64 {
        self.durations[from][to]
    }

    /// False when the provider had no route for this pair
    pub fn is_reachable(&self, from: usize, to: usize) -> bool {
        self.durations[from][to] < UNREACHABLE && self.distances[from][to] < UNREACHABLE
    }

    /// Check that both matrices are `expected` × `expected`
    pub fn is_square(&self, expected: usize) -> bool {
        self.size == expected
            && self.distances.len() == expected
            && self.durations.len() == expected
            && self.distances.iter().all(|row| row.len() == expected)
            && self.durations.iter().all(|row| row.len() == expected)
    }

    /// Fail on reachable legs longer than `max_seconds`. Call after `is_square`.
    pub fn check_leg_durations(&self, max_seconds: u64) -> Result<()> {
        for (i, row) in self.durations.iter().enumerate() {
            for (j, &seconds) in row.iter().enumerate() {
                if seconds > max_seconds && self.is_reachable(i, j) {
                    anyhow::bail!(
                        "Leg {} -> {} takes {} s, over the {} s limit",
                        i,
                        j,
                        seconds,
                        max_seconds
                    );
                }
            }
        }
        Ok(())
    }
}

/// Travel matrix provider abstraction (HTTP API, static, lazy wrapper)
#[async_trait]
pub trait TravelMatrixProvider: Send + Sync {
    /// Get distance and time matrices for a list of locations.
    /// First location is the home base.
    async fn get_matrices(&self, locations: &[String]) -> Result<DistanceTimeMatrices>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// On-disk matrix format. `null` cells are unreachable pairs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatrixFile {
    locations: Vec<String>,
    distances: Vec<Vec<Option<u64>>>,
    durations: Vec<Vec<Option<u64>>>,
}

/// Provider answering from a pre-computed matrix keyed by address
pub struct StaticMatrixProvider {
    index: HashMap<String, usize>,
    matrices: DistanceTimeMatrices,
    calls: AtomicUsize,
}

impl StaticMatrixProvider {
    pub fn new(locations: Vec<String>, matrices: DistanceTimeMatrices) -> Result<Self> {
        if !matrices.is_square(locations.len()) {
            anyhow::bail!(
                "Matrix does not match {} locations (size {})",
                locations.len(),
                matrices.size
            );
        }

        let mut index = HashMap::with_capacity(locations.len());
        for (i, location) in locations.into_iter().enumerate() {
            if index.insert(location.clone(), i).is_some() {
                anyhow::bail!("Location '{}' appears twice in the matrix", location);
            }
        }

        Ok(Self {
            index,
            matrices,
            calls: AtomicUsize::new(0),
        })
    }

    /// Load a matrix file (`locations`, `distances`, `durations`)
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read matrix file {}", path.display()))?;
        let file: MatrixFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse matrix file {}", path.display()))?;

        let fill = |rows: Vec<Vec<Option<u64>>>| -> Vec<Vec<u64>> {
            rows.into_iter()
                .map(|row| row.into_iter().map(|cell| cell.unwrap_or(UNREACHABLE)).collect())
                .collect()
        };

        let size = file.locations.len();
        let matrices = DistanceTimeMatrices {
            distances: fill(file.distances),
            durations: fill(file.durations),
            size,
        };

        Self::new(file.locations, matrices)
    }

    /// Number of `get_matrices` calls served
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TravelMatrixProvider for StaticMatrixProvider {
    async fn get_matrices(&self, locations: &[String]) -> Result<DistanceTimeMatrices> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let indices = locations
            .iter()
            .map(|loc| {
                self.index
                    .get(loc)
                    .copied()
                    .with_context(|| format!("Unknown location '{}'", loc))
            })
            .collect::<Result<Vec<usize>>>()?;

        let n = indices.len();
        let mut distances = vec![vec![0u64; n]; n];
        let mut durations = vec![vec![0u64; n]; n];
        for (i, &from) in indices.iter().enumerate() {
            for (j, &to) in indices.iter().enumerate() {
                distances[i][j] = self.matrices.distance(from, to);
                durations[i][j] = self.matrices.duration(from, to);
            }
        }

        Ok(DistanceTimeMatrices {
            distances,
            durations,
            size: n,
        })
    }

    fn name(&self) -> &str {
        "StaticMatrix"
    }
}

/// Where travel matrices come from
#[derive(Debug, Clone)]
pub enum MatrixSource {
    /// Pre-computed matrix file
    File(PathBuf),
    /// Distance-matrix HTTP API
    Api(DistanceMatrixConfig),
}

/// Create the matrix provider for a source.
///
/// API clients are wrapped in a [`LazyMatrixProvider`] that health-checks the
/// endpoint on first use.
pub fn create_matrix_provider(source: MatrixSource) -> Result<Arc<dyn TravelMatrixProvider>> {
    match source {
        MatrixSource::File(path) => {
            info!("Using static matrix from {}", path.display());
            Ok(Arc::new(StaticMatrixProvider::from_json_file(&path)?))
        }
        MatrixSource::Api(config) => {
            info!("Using distance matrix API at {}", config.base_url);
            Ok(Arc::new(LazyMatrixProvider::new("DistanceMatrixApi", move || {
                let config = config.clone();
                async move {
                    check_health(&config.base_url)
                        .await
                        .with_context(|| format!("Matrix API not available at {}", config.base_url))?;
                    let client: Arc<dyn TravelMatrixProvider> = Arc::new(DistanceMatrixClient::new(config)?);
                    Ok::<_, anyhow::Error>(client)
                }
            })))
        }
    }
}

/// Check if a distance-matrix API is reachable by requesting its base URL
pub async fn check_health(base_url: &str) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()?;

    let response = client.get(base_url).send().await?;

    if response.status().is_server_error() {
        anyhow::bail!("Matrix API returned status {}", response.status())
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locations() -> Vec<String> {
        vec!["base".to_string(), "a".to_string(), "b".to_string()]
    }

    fn matrices() -> DistanceTimeMatrices {
        DistanceTimeMatrices {
            distances: vec![
                vec![0, 1_000, 2_000],
                vec![1_100, 0, 1_500],
                vec![2_100, 1_600, 0],
            ],
            durations: vec![
                vec![0, 60, 120],
                vec![70, 0, UNREACHABLE],
                vec![130, 90, 0],
            ],
            size: 3,
        }
    }

    #[test]
    fn test_empty_matrices() {
        let m = DistanceTimeMatrices::empty();
        assert_eq!(m.size, 0);
        assert!(m.is_square(0));
    }

    #[test]
    fn test_is_reachable() {
        let m = matrices();
        assert!(m.is_reachable(0, 1));
        assert!(!m.is_reachable(1, 2));
        assert!(m.is_reachable(2, 1));
    }

    #[test]
    fn test_is_square_rejects_ragged() {
        let mut m = matrices();
        assert!(m.is_square(3));
        m.distances[1].pop();
        assert!(!m.is_square(3));
    }

    #[test]
    fn test_check_leg_durations() {
        let mut m = matrices();
        assert!(m.check_leg_durations(MAX_LEG_SECONDS).is_ok());

        m.durations[2][0] = MAX_LEG_SECONDS + 1;
        let err = m.check_leg_durations(MAX_LEG_SECONDS).unwrap_err();
        assert!(err.to_string().contains("2 -> 0"));
    }

    #[test]
    fn test_static_provider_rejects_mismatched_size() {
        let result = StaticMatrixProvider::new(vec!["base".to_string()], matrices());
        assert!(result.is_err());
    }

    #[test]
    fn test_static_provider_rejects_duplicate_location() {
        let locs = vec!["base".to_string(), "a".to_string(), "a".to_string()];
        assert!(StaticMatrixProvider::new(locs, matrices()).is_err());
    }

    #[tokio::test]
    async fn test_static_provider_reorders_by_request() {
        let provider = StaticMatrixProvider::new(locations(), matrices()).unwrap();
        let request = vec!["base".to_string(), "b".to_string(), "a".to_string()];

        let m = provider.get_matrices(&request).await.unwrap();

        assert_eq!(m.size, 3);
        assert_eq!(m.distance(0, 1), 2_000);
        assert_eq!(m.duration(1, 2), 90);
        assert!(!m.is_reachable(2, 1));
        assert_eq!(provider.call_count(), 1);
    }

    #[test]
    fn test_static_provider_counts_every_call() {
        let provider = StaticMatrixProvider::new(locations(), matrices()).unwrap();
        let request = vec!["a".to_string(), "base".to_string()];

        for _ in 0..3 {
            let m = tokio_test::block_on(provider.get_matrices(&request)).unwrap();
            assert_eq!(m.duration(0, 1), 70);
        }
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_static_provider_unknown_location_fails() {
        let provider = StaticMatrixProvider::new(locations(), matrices()).unwrap();
        let request = vec!["base".to_string(), "nowhere".to_string()];

        let err = provider.get_matrices(&request).await.unwrap_err();
        assert!(err.to_string().contains("nowhere"));
    }

    #[test]
    fn test_static_provider_from_json_file() {
        let dir = std::env::temp_dir().join(format!("crew-seq-matrix-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("matrix.json");
        std::fs::write(
            &path,
            r#"{
                "locations": ["base", "a"],
                "distances": [[0, 500], [null, 0]],
                "durations": [[0, 60], [null, 0]]
            }"#,
        )
        .unwrap();

        let provider = StaticMatrixProvider::from_json_file(&path).unwrap();
        assert_eq!(provider.name(), "StaticMatrix");
        assert_eq!(provider.matrices.distance(0, 1), 500);
        assert!(!provider.matrices.is_reachable(1, 0));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_create_matrix_provider_api_is_lazy() {
        let provider =
            create_matrix_provider(MatrixSource::Api(DistanceMatrixConfig::new("http://localhost:1"))).unwrap();
        assert_eq!(provider.name(), "DistanceMatrixApi");
    }

    #[test]
    fn test_create_matrix_provider_missing_file_fails() {
        let source = MatrixSource::File(PathBuf::from("/nonexistent/matrix.json"));
        assert!(create_matrix_provider(source).is_err());
    }

    #[tokio::test]
    #[ignore = "Requires network access"]
    async fn test_check_health_unreachable_url() {
        assert!(check_health("http://localhost:99999").await.is_err());
    }
}
