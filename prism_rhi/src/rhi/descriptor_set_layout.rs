/// Descriptor-set layout: the merged resource bindings of a pipeline's shaders

use std::hash::{Hash, Hasher};
use std::sync::Arc;
use rustc_hash::FxHasher;
use crate::rhi::definitions::{
    generate_object_id, DescriptorType, ObjectId, ResourceType, RhiHandle, LOG_SOURCE,
};
use crate::rhi::deletion_queue::DeletionQueue;
use crate::rhi::shader::{Descriptor, Shader};

/// Merge the descriptors of several shaders into one list sorted by slot
///
/// Entries of the same type on the same slot are combined: stage bits are
/// OR-ed and the larger struct size wins. Two shaders declaring different
/// types on one slot is a contract violation.
pub fn merge_descriptors<'a>(shaders: impl IntoIterator<Item = &'a Shader>) -> Vec<Descriptor> {
    let mut merged: Vec<Descriptor> = Vec::new();

    for shader in shaders {
        for descriptor in shader.descriptors() {
            let is_push_constant = descriptor.ty == DescriptorType::PushConstantBuffer;

            let existing = merged.iter_mut().find(|d| {
                if is_push_constant {
                    d.ty == DescriptorType::PushConstantBuffer
                } else {
                    d.ty != DescriptorType::PushConstantBuffer && d.slot == descriptor.slot
                }
            });

            match existing {
                Some(entry) => {
                    crate::rhi_assert!(
                        entry.ty == descriptor.ty,
                        LOG_SOURCE,
                        "Shader '{}' declares {:?} at slot {} but another stage declares {:?}",
                        shader.name(), descriptor.ty, descriptor.slot, entry.ty
                    );
                    entry.stage |= descriptor.stage;
                    entry.struct_size = entry.struct_size.max(descriptor.struct_size);
                    entry.array_length = entry.array_length.max(descriptor.array_length);
                }
                None => merged.push(descriptor.clone()),
            }
        }
    }

    merged.sort_by_key(|d| (d.ty == DescriptorType::PushConstantBuffer, d.slot));
    merged
}

/// Hash identifying a descriptor list (cache key of the device's layout cache)
pub fn descriptors_hash(descriptors: &[Descriptor]) -> u64 {
    let mut hasher = FxHasher::default();
    for descriptor in descriptors {
        descriptor.ty.hash(&mut hasher);
        descriptor.slot.hash(&mut hasher);
        descriptor.stage.hash(&mut hasher);
        descriptor.struct_size.hash(&mut hasher);
        descriptor.array_length.hash(&mut hasher);
    }
    hasher.finish()
}

/// Descriptor-set layout object
pub struct DescriptorSetLayout {
    id: ObjectId,
    name: String,
    descriptors: Vec<Descriptor>,
    hash: u64,
    handle: RhiHandle,
    deletion_queue: Option<Arc<DeletionQueue>>,
}

impl DescriptorSetLayout {
    pub fn new(
        name: &str,
        descriptors: Vec<Descriptor>,
        handle: RhiHandle,
        deletion_queue: Option<Arc<DeletionQueue>>,
    ) -> Self {
        let hash = descriptors_hash(&descriptors);
        Self {
            id: generate_object_id(),
            name: name.to_string(),
            descriptors,
            hash,
            handle,
            deletion_queue,
        }
    }

    pub fn object_id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    /// Descriptor at a binding slot (push constants excluded)
    pub fn descriptor_at(&self, slot: u32) -> Option<&Descriptor> {
        self.descriptors
            .iter()
            .find(|d| d.ty != DescriptorType::PushConstantBuffer && d.slot == slot)
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn rhi_handle(&self) -> RhiHandle {
        self.handle
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        if let Some(queue) = &self.deletion_queue {
            queue.add(ResourceType::DescriptorSetLayout, self.handle);
        }
    }
}

#[cfg(test)]
#[path = "descriptor_set_layout_tests.rs"]
mod tests;
