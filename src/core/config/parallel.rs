//! Worker pool configuration.

use serde::{Deserialize, Serialize};

/// Configuration of the worker pool used by the dataset builder.
///
/// Every sample is one task; the pool is sized once per run and torn down when
/// the run finishes or the first task fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelPolicy {
    /// Number of worker threads in the pool.
    /// Default: 2
    #[serde(default = "ParallelPolicy::default_processes")]
    pub processes: usize,
}

impl ParallelPolicy {
    /// Create a new ParallelPolicy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker threads.
    pub fn with_processes(mut self, processes: usize) -> Self {
        self.processes = processes;
        self
    }

    /// Builds a dedicated rayon thread pool with the configured number of threads.
    ///
    /// The pool is owned by the caller; dropping it joins the worker threads.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use htr_layout::core::config::ParallelPolicy;
    /// let pool = ParallelPolicy::new().with_processes(4).build_pool().unwrap();
    /// assert_eq!(pool.current_num_threads(), 4);
    /// ```
    pub fn build_pool(&self) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.processes.max(1))
            .thread_name(|idx| format!("htr-worker-{idx}"))
            .build()
    }

    fn default_processes() -> usize {
        2
    }
}

impl Default for ParallelPolicy {
    fn default() -> Self {
        Self {
            processes: Self::default_processes(),
        }
    }
}
