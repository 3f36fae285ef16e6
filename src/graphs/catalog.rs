//! Static graph tables.
//!
//! Three families: cluster mode, single mode and allocator (GC) stats. Metric
//! names here are the keys the mappers in [`crate::metrics`] emit.

use super::{GraphDefinition, MetricSpec, Unit};

const fn gauge(name: &'static str, label: &'static str) -> MetricSpec {
    MetricSpec {
        name,
        label,
        stacked: false,
        diff: false,
    }
}

const fn counter(name: &'static str, label: &'static str) -> MetricSpec {
    MetricSpec {
        name,
        label,
        stacked: false,
        diff: true,
    }
}

const THREADS: GraphDefinition = GraphDefinition {
    name: "threads",
    label: "Puma Threads",
    unit: Unit::Integer,
    metrics: &[
        gauge("running", "Running"),
        gauge("pool_capacity", "Pool Capacity"),
        gauge("max_threads", "Max Threads"),
    ],
};

const BACKLOG: GraphDefinition = GraphDefinition {
    name: "backlog",
    label: "Puma Backlog",
    unit: Unit::Integer,
    metrics: &[gauge("backlog", "Backlog")],
};

const REQUESTS: GraphDefinition = GraphDefinition {
    name: "requests",
    label: "Puma Requests",
    unit: Unit::Integer,
    metrics: &[counter("requests_count", "Requests")],
};

/// Cluster mode graphs.
pub static CLUSTERED_GRAPHS: &[GraphDefinition] = &[
    GraphDefinition {
        name: "workers",
        label: "Puma Workers",
        unit: Unit::Integer,
        metrics: &[
            gauge("workers", "Workers"),
            gauge("booted_workers", "Booted Workers"),
            gauge("old_workers", "Old Workers"),
        ],
    },
    GraphDefinition {
        name: "phase",
        label: "Puma Phase",
        unit: Unit::Integer,
        metrics: &[gauge("phase", "Phase")],
    },
    THREADS,
    BACKLOG,
    REQUESTS,
    GraphDefinition {
        name: "worker_threads.#",
        label: "Puma Worker Threads",
        unit: Unit::Integer,
        metrics: &[
            gauge("running", "Running"),
            gauge("pool_capacity", "Pool Capacity"),
            gauge("max_threads", "Max Threads"),
        ],
    },
    GraphDefinition {
        name: "worker_backlog.#",
        label: "Puma Worker Backlog",
        unit: Unit::Integer,
        metrics: &[gauge("backlog", "Backlog")],
    },
    GraphDefinition {
        name: "worker_requests.#",
        label: "Puma Worker Requests",
        unit: Unit::Integer,
        metrics: &[counter("requests_count", "Requests")],
    },
];

/// Single mode graphs.
pub static SINGLE_GRAPHS: &[GraphDefinition] = &[THREADS, BACKLOG, REQUESTS];

/// Allocator graphs, shared by both modes.
pub static ALLOCATOR_GRAPHS: &[GraphDefinition] = &[
    GraphDefinition {
        name: "gc.count",
        label: "Puma GC Count",
        unit: Unit::Integer,
        metrics: &[
            counter("count", "Total"),
            counter("minor_gc_count", "Minor"),
            counter("major_gc_count", "Major"),
        ],
    },
    GraphDefinition {
        name: "gc.heap_pages",
        label: "Puma GC Heap Pages",
        unit: Unit::Integer,
        metrics: &[
            gauge("heap_allocated_pages", "Allocated"),
            gauge("heap_sorted_length", "Sorted Length"),
            gauge("heap_allocatable_pages", "Allocatable"),
            gauge("heap_eden_pages", "Eden"),
            gauge("heap_tomb_pages", "Tomb"),
        ],
    },
    GraphDefinition {
        name: "gc.heap_slots",
        label: "Puma GC Heap Slots",
        unit: Unit::Integer,
        metrics: &[
            gauge("heap_available_slots", "Available"),
            gauge("heap_live_slots", "Live"),
            gauge("heap_free_slots", "Free"),
            gauge("heap_final_slots", "Final"),
            gauge("heap_marked_slots", "Marked"),
        ],
    },
    GraphDefinition {
        name: "gc.total_pages",
        label: "Puma GC Total Pages",
        unit: Unit::Integer,
        metrics: &[
            counter("total_allocated_pages", "Allocated"),
            counter("total_freed_pages", "Freed"),
        ],
    },
    GraphDefinition {
        name: "gc.total_objects",
        label: "Puma GC Total Objects",
        unit: Unit::Integer,
        metrics: &[
            counter("total_allocated_objects", "Allocated"),
            counter("total_freed_objects", "Freed"),
        ],
    },
    GraphDefinition {
        name: "gc.malloc",
        label: "Puma GC Malloc",
        unit: Unit::Bytes,
        metrics: &[
            gauge("malloc_increase_bytes", "Increase"),
            gauge("malloc_increase_bytes_limit", "Increase Limit"),
            gauge("oldmalloc_increase_bytes", "Old Increase"),
            gauge("oldmalloc_increase_bytes_limit", "Old Increase Limit"),
        ],
    },
    GraphDefinition {
        name: "gc.old_objects",
        label: "Puma GC Old Objects",
        unit: Unit::Integer,
        metrics: &[
            gauge("old_objects", "Old Objects"),
            gauge("old_objects_limit", "Old Objects Limit"),
            gauge("remembered_wb_unprotected_objects", "WB Unprotected"),
            gauge("remembered_wb_unprotected_objects_limit", "WB Unprotected Limit"),
        ],
    },
];
