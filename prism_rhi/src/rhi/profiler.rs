/// Per-device profiler counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the profiler counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProfilerCounters {
    pub draw: u64,
    pub dispatch: u64,
    pub bindings_buffer_vertex: u64,
    pub bindings_buffer_index: u64,
    pub bindings_pipeline: u64,
    pub bindings_descriptor_set: u64,
    pub barriers: u64,
}

/// Counters incremented by every command list of a device
#[derive(Debug, Default)]
pub struct Profiler {
    draw: AtomicU64,
    dispatch: AtomicU64,
    bindings_buffer_vertex: AtomicU64,
    bindings_buffer_index: AtomicU64,
    bindings_pipeline: AtomicU64,
    bindings_descriptor_set: AtomicU64,
    barriers: AtomicU64,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_draw(&self) {
        self.draw.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_dispatch(&self) {
        self.dispatch.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_binding_buffer_vertex(&self) {
        self.bindings_buffer_vertex.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_binding_buffer_index(&self) {
        self.bindings_buffer_index.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_binding_pipeline(&self) {
        self.bindings_pipeline.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_binding_descriptor_set(&self) {
        self.bindings_descriptor_set.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_barrier(&self) {
        self.barriers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProfilerCounters {
        ProfilerCounters {
            draw: self.draw.load(Ordering::Relaxed),
            dispatch: self.dispatch.load(Ordering::Relaxed),
            bindings_buffer_vertex: self.bindings_buffer_vertex.load(Ordering::Relaxed),
            bindings_buffer_index: self.bindings_buffer_index.load(Ordering::Relaxed),
            bindings_pipeline: self.bindings_pipeline.load(Ordering::Relaxed),
            bindings_descriptor_set: self.bindings_descriptor_set.load(Ordering::Relaxed),
            barriers: self.barriers.load(Ordering::Relaxed),
        }
    }

    /// Zero every counter (typically once per frame)
    pub fn reset(&self) {
        for counter in [
            &self.draw,
            &self.dispatch,
            &self.bindings_buffer_vertex,
            &self.bindings_buffer_index,
            &self.bindings_pipeline,
            &self.bindings_descriptor_set,
            &self.barriers,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
