//! Analysis options

use std::time::Duration;

use smol_str::SmolStr;

/// Backoff of the driver after a transient failure.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Factor applied to the delay after each consecutive failure.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(64) as i32);
        let secs = self.initial_delay.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }
}

/// Options of an analysis session
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AnalysisOptions {
    /// How long one blocking-query wait lasts before the query is retried
    pub wait_interval: Duration,
    /// Upper bound of a blocking query; `None` waits forever
    pub query_timeout: Option<Duration>,
    pub retry: RetryPolicy,
    /// URIs whose (transitive) import marks a library as client code
    pub client_libraries: Vec<String>,
    /// Top-level function that makes a library launchable
    pub entry_point_name: SmolStr,
    /// Implicit supertype of classes without `extends`
    pub implicit_root: Option<SmolStr>,
    /// Parse batches of sources in parallel
    pub parallel_parse: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            wait_interval: Duration::from_millis(1000),
            query_timeout: Some(Duration::from_secs(30)),
            retry: RetryPolicy::default(),
            client_libraries: vec!["dart:html".to_string()],
            entry_point_name: SmolStr::new_static("main"),
            implicit_root: Some(SmolStr::new_static("Object")),
            parallel_parse: true,
        }
    }
}

impl AnalysisOptions {
    pub fn with_wait_interval(mut self, interval: Duration) -> Self {
        self.wait_interval = interval;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_client_libraries<I, S>(mut self, uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.client_libraries = uris.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_entry_point_name(mut self, name: impl Into<SmolStr>) -> Self {
        self.entry_point_name = name.into();
        self
    }

    pub fn with_implicit_root(mut self, root: Option<SmolStr>) -> Self {
        self.implicit_root = root;
        self
    }

    pub fn with_parallel_parse(mut self, parallel: bool) -> Self {
        self.parallel_parse = parallel;
        self
    }
}
