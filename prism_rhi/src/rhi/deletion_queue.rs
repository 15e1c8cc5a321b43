/// Deferred deletion of backend objects
///
/// Objects that may still be referenced by in-flight command buffers are
/// not destroyed on drop. Their handles are pushed here, tagged with their
/// resource type, and destroyed once the device has proven it is idle.

use std::sync::{Mutex, PoisonError};
use rustc_hash::FxHashMap;
use crate::rhi::definitions::{ResourceType, RhiHandle, NULL_HANDLE};

/// Order in which drained handles are handed back: views and derived
/// objects before the objects they were created from.
const DESTRUCTION_ORDER: [ResourceType; 15] = [
    ResourceType::TextureView,
    ResourceType::Pipeline,
    ResourceType::PipelineLayout,
    ResourceType::DescriptorSet,
    ResourceType::DescriptorSetLayout,
    ResourceType::Sampler,
    ResourceType::Shader,
    ResourceType::Buffer,
    ResourceType::Texture,
    ResourceType::DeviceMemory,
    ResourceType::QueryPool,
    ResourceType::CommandList,
    ResourceType::CommandPool,
    ResourceType::Semaphore,
    ResourceType::Fence,
];

/// Proof that every queue of the device has been drained
///
/// Only `Device::queue_wait_all()` hands these out.
#[derive(Debug)]
pub struct IdleToken {
    _private: (),
}

impl IdleToken {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }
}

/// Mutex-serialized deletion queue keyed by resource type
#[derive(Debug, Default)]
pub struct DeletionQueue {
    entries: Mutex<FxHashMap<ResourceType, Vec<RhiHandle>>>,
}

impl DeletionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a handle for destruction. Null handles are ignored.
    pub fn add(&self, resource_type: ResourceType, handle: RhiHandle) {
        if handle == NULL_HANDLE {
            return;
        }

        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(resource_type)
            .or_default()
            .push(handle);
    }

    /// Number of pending handles
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of pending handles of one type
    pub fn count(&self, resource_type: ResourceType) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&resource_type)
            .map_or(0, Vec::len)
    }

    /// Take every pending handle, in destruction order
    ///
    /// # Arguments
    ///
    /// * `_idle` - Proof that the GPU no longer references any of them
    pub fn drain(&self, _idle: &IdleToken) -> Vec<(ResourceType, RhiHandle)> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        let mut drained = Vec::with_capacity(entries.values().map(Vec::len).sum());
        for resource_type in DESTRUCTION_ORDER {
            if let Some(handles) = entries.remove(&resource_type) {
                drained.extend(handles.into_iter().map(|handle| (resource_type, handle)));
            }
        }

        drained
    }
}

#[cfg(test)]
#[path = "deletion_queue_tests.rs"]
mod tests;
