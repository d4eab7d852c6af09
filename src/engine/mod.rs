//! Relational engine seam
//!
//! [`Engine`] is the interface the pipeline needs from a SQL engine and
//! [`Launcher`] starts one. [`EngineClient`] owns a launcher and makes
//! startup single-flight: every caller of [`EngineClient::ensure_ready`]
//! shares one launch and observes its outcome, success or failure.

pub mod decode;
pub mod memtable;

use crate::error::EngineError;
use crate::flatten::FlatRow;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{info, warn};

pub use memtable::{DataFusionLauncher, MemTableEngine};

/// One result row: column name -> value, in the engine's column order
pub type ResultRow = Map<String, Value>;

#[async_trait]
pub trait Engine: Send + Sync {
    /// Create `table` from `rows`, replacing any table of that name
    async fn materialize(&self, rows: &[FlatRow], table: &str) -> Result<(), EngineError>;

    /// Run arbitrary SQL
    async fn execute(&self, sql: &str) -> Result<Vec<ResultRow>, EngineError>;
}

#[async_trait]
pub trait Launcher: Send + Sync {
    type Engine: Engine + 'static;

    async fn launch(&self) -> Result<Self::Engine, EngineError>;

    /// How long a launch may take before it counts as failed
    fn init_timeout(&self) -> Option<Duration> {
        None
    }
}

/// Startup state as shown by a readiness indicator
#[derive(Debug, Clone, PartialEq)]
pub enum Readiness {
    Pending,
    Ready,
    Failed(EngineError),
}

type Startup<E> = OnceCell<Result<Arc<E>, EngineError>>;

/// Shared handle to a lazily started engine
pub struct EngineClient<L: Launcher = DataFusionLauncher> {
    launcher: L,
    init_timeout: Option<Duration>,
    // Swapped for a fresh cell on reset; callers already waiting keep the old one
    ready: RwLock<Arc<Startup<L::Engine>>>,
}

impl<L: Launcher> EngineClient<L> {
    /// The startup timeout defaults to the launcher's own
    pub fn new(launcher: L) -> Self {
        let init_timeout = launcher.init_timeout();
        EngineClient {
            launcher,
            init_timeout,
            ready: RwLock::new(Arc::new(OnceCell::new())),
        }
    }

    /// Override the launcher's startup timeout
    pub fn with_init_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.init_timeout = timeout;
        self
    }

    pub fn init_timeout(&self) -> Option<Duration> {
        self.init_timeout
    }

    fn startup(&self) -> Arc<Startup<L::Engine>> {
        self.ready
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Start the engine once and hand out the shared instance.
    ///
    /// Concurrent callers wait on the same launch. The outcome is memoized,
    /// failures included, until [`EngineClient::reset`] is called.
    pub async fn ensure_ready(&self) -> Result<Arc<L::Engine>, EngineError> {
        let startup = self.startup();
        startup.get_or_init(|| self.start()).await.clone()
    }

    async fn start(&self) -> Result<Arc<L::Engine>, EngineError> {
        let launch = self.launcher.launch();
        let outcome = match self.init_timeout {
            Some(limit) => match tokio::time::timeout(limit, launch).await {
                Ok(result) => result,
                Err(_) => Err(EngineError::StartupTimeout(limit)),
            },
            None => launch.await,
        };

        match outcome {
            Ok(engine) => {
                info!("engine ready");
                Ok(Arc::new(engine))
            }
            Err(err) => {
                warn!(error = %err, "engine startup failed");
                Err(err)
            }
        }
    }

    pub fn readiness(&self) -> Readiness {
        match self.startup().get() {
            None => Readiness::Pending,
            Some(Ok(_)) => Readiness::Ready,
            Some(Err(err)) => Readiness::Failed(err.clone()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.startup().get(), Some(Ok(_)))
    }

    /// Forget the memoized outcome so the next caller launches again.
    ///
    /// A running engine is dropped once its last holder lets go, together
    /// with every table it held.
    pub fn reset(&self) {
        let mut ready = self.ready.write().unwrap_or_else(PoisonError::into_inner);
        *ready = Arc::new(OnceCell::new());
        info!("engine startup reset");
    }

    pub async fn materialize(&self, rows: &[FlatRow], table: &str) -> Result<(), EngineError> {
        self.ensure_ready().await?.materialize(rows, table).await
    }

    pub async fn execute(&self, sql: &str) -> Result<Vec<ResultRow>, EngineError> {
        self.ensure_ready().await?.execute(sql).await
    }
}
