//! Lazily initialised matrix provider
//!
//! The wrapped provider is built on first use. Callers arriving while the
//! initialiser is still running await the same shared future instead of
//! starting a second one. A failed initialisation is remembered until the
//! next call, which starts a fresh attempt.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{info, warn};

use super::{DistanceTimeMatrices, TravelMatrixProvider};

type ProviderResult = std::result::Result<Arc<dyn TravelMatrixProvider>, Arc<anyhow::Error>>;
type InitFuture = Shared<BoxFuture<'static, ProviderResult>>;
type Initializer = Arc<dyn Fn() -> BoxFuture<'static, Result<Arc<dyn TravelMatrixProvider>>> + Send + Sync>;

/// Observable lifecycle of a lazy provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderState {
    Uninitialized,
    Initializing,
    Ready,
    /// Last initialisation error
    Failed(String),
}

enum State {
    Uninitialized,
    Initializing(InitFuture),
    Ready(Arc<dyn TravelMatrixProvider>),
    Failed(String),
}

/// Provider wrapper owning the initialisation state machine
pub struct LazyMatrixProvider {
    name: String,
    init: Initializer,
    state: Mutex<State>,
}

impl LazyMatrixProvider {
    pub fn new<F, Fut>(name: impl Into<String>, init: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn TravelMatrixProvider>>> + Send + 'static,
    {
        Self {
            name: name.into(),
            init: Arc::new(move || init().boxed()),
            state: Mutex::new(State::Uninitialized),
        }
    }

    pub fn state(&self) -> ProviderState {
        match &*self.state.lock() {
            State::Uninitialized => ProviderState::Uninitialized,
            State::Initializing(_) => ProviderState::Initializing,
            State::Ready(_) => ProviderState::Ready,
            State::Failed(reason) => ProviderState::Failed(reason.clone()),
        }
    }

    /// Get the initialised provider, starting or joining initialisation if needed
    pub async fn provider(&self) -> Result<Arc<dyn TravelMatrixProvider>> {
        let pending = {
            let mut state = self.state.lock();
            let in_flight = match &*state {
                State::Ready(provider) => return Ok(provider.clone()),
                State::Initializing(pending) => Some(pending.clone()),
                State::Uninitialized | State::Failed(_) => None,
            };

            match in_flight {
                Some(pending) => pending,
                None => {
                    info!("Initializing matrix provider {}", self.name);
                    let pending = (self.init)()
                        .map(|result| result.map_err(Arc::new))
                        .boxed()
                        .shared();
                    *state = State::Initializing(pending.clone());
                    pending
                }
            }
        };

        let result = pending.clone().await;

        let mut state = self.state.lock();
        let owns_state = matches!(&*state, State::Initializing(current) if current.ptr_eq(&pending));

        match result {
            Ok(provider) => {
                if owns_state {
                    info!("Matrix provider {} ready ({})", self.name, provider.name());
                    *state = State::Ready(provider.clone());
                }
                Ok(provider)
            }
            Err(err) => {
                if owns_state {
                    warn!("Matrix provider {} failed to initialize: {:#}", self.name, err);
                    *state = State::Failed(format!("{:#}", err));
                }
                Err(anyhow::anyhow!("{} initialization failed: {:#}", self.name, err))
            }
        }
    }
}

#[async_trait]
impl TravelMatrixProvider for LazyMatrixProvider {
    async fn get_matrices(&self, locations: &[String]) -> Result<DistanceTimeMatrices> {
        let provider = self.provider().await?;
        provider.get_matrices(locations).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
