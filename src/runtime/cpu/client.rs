//! CPU execution context

use crate::dtype::DType;
#[cfg(feature = "rayon")]
use crate::error::Error;
use crate::error::Result;
use crate::runtime::{EngineConfig, ParallelismConfig, Workspace};
use crate::tensor::{NDArray, Order};
#[cfg(feature = "rayon")]
use std::sync::Arc;

/// CPU context for operation dispatch
///
/// Bundles the workspace every output buffer is charged to, the worker pool
/// that runs parallel traversals, and the configuration both were built from.
/// Clones share the workspace and the pool.
#[derive(Clone)]
pub struct CpuContext {
    config: EngineConfig,
    workspace: Workspace,
    #[cfg(feature = "rayon")]
    pool: Arc<rayon::ThreadPool>,
}

impl CpuContext {
    /// Create a context with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(EngineConfig::default())
    }

    /// Create a context configured from `NDEXEC_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::with_config(EngineConfig::from_env())
    }

    /// Create a context from an explicit configuration
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        let workspace = Workspace::new(config.workspace_limit_bytes);
        Self::build(config, workspace)
    }

    /// Same workspace, different parallelism
    pub fn with_parallelism(&self, parallelism: ParallelismConfig) -> Result<Self> {
        let config = self.config.with_parallelism(parallelism);
        Self::build(config, self.workspace.clone())
    }

    fn build(config: EngineConfig, workspace: Workspace) -> Result<Self> {
        #[cfg(feature = "rayon")]
        let pool = {
            let threads = config.parallelism.threads();
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("ndexec-worker-{i}"))
                .build()
                .map_err(|e| Error::Internal(format!("failed to build worker pool: {e}")))?;
            Arc::new(pool)
        };

        tracing::debug!(
            threads = config.parallelism.threads(),
            min_chunk_len = config.parallelism.chunk_len(),
            workspace_limit = ?config.workspace_limit_bytes,
            "created cpu context"
        );

        Ok(Self {
            config,
            workspace,
            #[cfg(feature = "rayon")]
            pool,
        })
    }

    /// Configuration this context was built from
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Workspace charged for every allocation through this context
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Number of worker threads
    pub fn num_threads(&self) -> usize {
        #[cfg(feature = "rayon")]
        {
            self.pool.current_num_threads()
        }
        #[cfg(not(feature = "rayon"))]
        {
            1
        }
    }

    /// Minimum iterations handed to one worker
    pub fn min_chunk_len(&self) -> usize {
        self.config.parallelism.chunk_len()
    }

    /// Run `f` inside this context's worker pool
    #[cfg(feature = "rayon")]
    pub fn install_parallelism<R: Send>(&self, f: impl FnOnce() -> R + Send) -> R {
        self.pool.install(f)
    }

    /// Allocate a zero-filled array charged to this context's workspace
    pub fn alloc(&self, shape: &[usize], dtype: DType, order: Order) -> Result<NDArray> {
        NDArray::zeros(shape, dtype, order, Some(&self.workspace))
    }
}

impl std::fmt::Debug for CpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuContext")
            .field("threads", &self.num_threads())
            .field("min_chunk_len", &self.min_chunk_len())
            .field("workspace", &self.workspace)
            .finish()
    }
}
