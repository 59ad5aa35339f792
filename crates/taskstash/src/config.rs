use core::time::Duration;

/// Tuning and naming for a [`RecordService`](crate::RecordService).
///
/// Built once at startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Number of fetch workers draining the request queue.
    pub num_workers: usize,
    /// Capacity of the bounded request queue. Callers submitting a miss while
    /// the queue is full suspend until a worker frees a slot.
    pub queue_capacity: usize,
    /// Upper bound on a single cache-miss fetch, including the time spent
    /// waiting for queue capacity. `None` waits indefinitely.
    pub fetch_timeout: Option<Duration>,
    /// How long shutdown waits for in-flight fetches before stopping workers.
    pub drain_timeout: Duration,
    /// Table holding the records.
    pub table_name: String,
    /// Table holding the identifier counter.
    pub counter_table: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            num_workers: 10,
            queue_capacity: 10,
            fetch_timeout: Some(Duration::from_secs(5)),
            drain_timeout: Duration::from_secs(3),
            table_name: "tasks".to_string(),
            counter_table: "counter".to_string(),
        }
    }
}
