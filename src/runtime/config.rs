//! Execution configuration

use std::env;
use std::str::FromStr;

/// Environment variable overriding the worker-thread count
pub const ENV_NUM_THREADS: &str = "NDEXEC_NUM_THREADS";
/// Environment variable overriding the minimum chunk length
pub const ENV_MIN_CHUNK_LEN: &str = "NDEXEC_MIN_CHUNK_LEN";
/// Environment variable setting the workspace byte limit
pub const ENV_WORKSPACE_LIMIT: &str = "NDEXEC_WORKSPACE_LIMIT";

/// Default minimum number of iterations handed to one worker
pub const DEFAULT_MIN_CHUNK_LEN: usize = 1024;

/// Parallelism settings of an execution context
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ParallelismConfig {
    /// Worker threads; `None` uses the number of available cores
    pub num_threads: Option<usize>,
    /// Minimum iterations per chunk; `None` uses [`DEFAULT_MIN_CHUNK_LEN`]
    pub min_chunk_len: Option<usize>,
}

impl ParallelismConfig {
    /// Create a parallelism configuration
    ///
    /// Zero values are treated as unset.
    pub fn new(num_threads: Option<usize>, min_chunk_len: Option<usize>) -> Self {
        Self {
            num_threads: num_threads.filter(|&n| n > 0),
            min_chunk_len: min_chunk_len.filter(|&n| n > 0),
        }
    }

    /// Single-threaded execution
    pub fn sequential() -> Self {
        Self::new(Some(1), None)
    }

    /// Resolved worker-thread count
    pub fn threads(&self) -> usize {
        self.num_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Resolved minimum chunk length
    pub fn chunk_len(&self) -> usize {
        self.min_chunk_len.unwrap_or(DEFAULT_MIN_CHUNK_LEN)
    }
}

/// Full configuration of an execution context
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Thread pool and chunking
    pub parallelism: ParallelismConfig,
    /// Upper bound on bytes held by live buffers of the context
    pub workspace_limit_bytes: Option<usize>,
}

impl EngineConfig {
    /// Read the configuration from `NDEXEC_*` environment variables
    ///
    /// Unset variables keep their defaults; unparseable values are logged and
    /// ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let num_threads = parse_var::<usize>(&lookup, ENV_NUM_THREADS);
        let min_chunk_len = parse_var::<usize>(&lookup, ENV_MIN_CHUNK_LEN);
        let workspace_limit_bytes = parse_var::<usize>(&lookup, ENV_WORKSPACE_LIMIT);

        Self {
            parallelism: ParallelismConfig::new(num_threads, min_chunk_len),
            workspace_limit_bytes,
        }
    }

    /// Replace the parallelism settings
    pub fn with_parallelism(mut self, parallelism: ParallelismConfig) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Replace the workspace limit
    pub fn with_workspace_limit(mut self, limit: Option<usize>) -> Self {
        self.workspace_limit_bytes = limit;
        self
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable configuration value");
            None
        }
    }
}
