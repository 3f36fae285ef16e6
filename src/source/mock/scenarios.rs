//! Pre-built mock sources for testing.
//!
//! These scenarios reproduce what Puma's control server returns for common
//! deployments.

use super::source::MockSource;

const CLUSTER_STATS: &str = r#"{
  "started_at": "2024-05-01T10:00:00Z",
  "workers": 3,
  "phase": 0,
  "booted_workers": 3,
  "old_workers": 0,
  "worker_status": [
    {"started_at": "2024-05-01T10:00:01Z", "pid": 2101, "index": 0, "phase": 0, "booted": true,
     "last_checkin": "2024-05-01T10:10:00Z",
     "last_status": {"backlog": 0, "running": 5, "pool_capacity": 5, "max_threads": 5, "requests_count": 1200}},
    {"started_at": "2024-05-01T10:00:01Z", "pid": 2102, "index": 1, "phase": 0, "booted": true,
     "last_checkin": "2024-05-01T10:10:00Z",
     "last_status": {"backlog": 2, "running": 5, "pool_capacity": 0, "max_threads": 5, "requests_count": 1450}},
    {"started_at": "2024-05-01T10:00:01Z", "pid": 2103, "index": 2, "phase": 0, "booted": true,
     "last_checkin": "2024-05-01T10:10:00Z",
     "last_status": {"backlog": 0, "running": 3, "pool_capacity": 4, "max_threads": 5, "requests_count": 980}}
  ]
}"#;

const SINGLE_STATS: &str = r#"{
  "started_at": "2024-05-01T10:00:00Z",
  "backlog": 1,
  "running": 5,
  "pool_capacity": 2,
  "max_threads": 5,
  "requests_count": 3100
}"#;

const GC_STATS: &str = r#"{
  "count": 52, "time": 311, "heap_allocated_pages": 1650, "heap_sorted_length": 1650,
  "heap_allocatable_pages": 0, "heap_available_slots": 672540, "heap_live_slots": 540122,
  "heap_free_slots": 132418, "heap_final_slots": 0, "heap_marked_slots": 402331,
  "heap_eden_pages": 1650, "heap_tomb_pages": 0, "total_allocated_pages": 1650,
  "total_freed_pages": 0, "total_allocated_objects": 7712340, "total_freed_objects": 7172218,
  "malloc_increase_bytes": 10240, "malloc_increase_bytes_limit": 16777216,
  "minor_gc_count": 41, "major_gc_count": 11, "compact_count": 0,
  "remembered_wb_unprotected_objects": 210, "remembered_wb_unprotected_objects_limit": 420,
  "old_objects": 398212, "old_objects_limit": 796424,
  "oldmalloc_increase_bytes": 20480, "oldmalloc_increase_bytes_limit": 16777216
}"#;

impl MockSource {
    /// Cluster mode with three booted workers.
    pub fn clustered() -> Self {
        Self::new().with_runtime(CLUSTER_STATS)
    }

    /// Single mode server.
    pub fn single() -> Self {
        Self::new().with_runtime(SINGLE_STATS)
    }

    /// Adds a typical Ruby 3.x `GC.stat` answer for `/gc-stats`.
    pub fn with_gc_stats(self) -> Self {
        self.with_allocator(GC_STATS)
    }
}
