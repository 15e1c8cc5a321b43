/// GPU buffers: vertex, index, constant and structured
///
/// Buffers are host-visible; writes go through `Device::update_buffer`.

use std::ops::Deref;
use std::sync::Arc;
use crate::rhi::definitions::{generate_object_id, ObjectId, ResourceType, RhiHandle};
use crate::rhi::deletion_queue::DeletionQueue;

/// What a buffer is bound as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
    Constant,
    Structured,
}

/// Buffer creation descriptor
#[derive(Debug, Clone)]
pub struct BufferDesc {
    pub name: String,
    pub usage: BufferUsage,
    /// Size of one element in bytes
    pub stride: u32,
    pub element_count: u32,
}

impl BufferDesc {
    pub fn new(name: &str, usage: BufferUsage, stride: u32, element_count: u32) -> Self {
        Self { name: name.to_string(), usage, stride, element_count }
    }

    /// Size requested from the backend
    pub fn size(&self) -> u64 {
        self.stride as u64 * self.element_count as u64
    }
}

/// Common buffer object
pub struct Buffer {
    id: ObjectId,
    desc: BufferDesc,
    size_gpu: u64,
    handle: RhiHandle,
    deletion_queue: Option<Arc<DeletionQueue>>,
}

impl Buffer {
    /// Wrap a backend buffer
    ///
    /// # Arguments
    ///
    /// * `size_gpu` - Size actually allocated by the backend (after alignment)
    pub fn new(desc: BufferDesc, size_gpu: u64, handle: RhiHandle, deletion_queue: Option<Arc<DeletionQueue>>) -> Self {
        Self {
            id: generate_object_id(),
            desc,
            size_gpu,
            handle,
            deletion_queue,
        }
    }

    pub fn object_id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn usage(&self) -> BufferUsage {
        self.desc.usage
    }

    pub fn stride(&self) -> u32 {
        self.desc.stride
    }

    pub fn element_count(&self) -> u32 {
        self.desc.element_count
    }

    pub fn size_cpu(&self) -> u64 {
        self.desc.size()
    }

    pub fn size_gpu(&self) -> u64 {
        self.size_gpu
    }

    pub fn rhi_handle(&self) -> RhiHandle {
        self.handle
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("id", &self.id)
            .field("name", &self.desc.name)
            .field("usage", &self.desc.usage)
            .field("size_gpu", &self.size_gpu)
            .finish()
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(queue) = &self.deletion_queue {
            queue.add(ResourceType::Buffer, self.handle);
        }
    }
}

macro_rules! typed_buffer {
    ($(#[$meta:meta])* $name:ident, $usage:expr) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name(Buffer);

        impl $name {
            pub fn new(buffer: Buffer) -> Self {
                crate::rhi_assert!(
                    buffer.usage() == $usage,
                    crate::rhi::definitions::LOG_SOURCE,
                    "Buffer '{}' was created as {:?}, expected {:?}",
                    buffer.name(), buffer.usage(), $usage
                );
                Self(buffer)
            }
        }

        impl Deref for $name {
            type Target = Buffer;

            fn deref(&self) -> &Buffer {
                &self.0
            }
        }
    };
}

typed_buffer!(
    /// Vertex buffer (stride = vertex size)
    VertexBuffer, BufferUsage::Vertex
);
typed_buffer!(
    /// Index buffer (stride 2 or 4)
    IndexBuffer, BufferUsage::Index
);
typed_buffer!(
    /// Constant (uniform) buffer
    ConstantBuffer, BufferUsage::Constant
);
typed_buffer!(
    /// Structured (storage) buffer
    StructuredBuffer, BufferUsage::Structured
);

impl IndexBuffer {
    /// True for 16-bit indices
    pub fn is_16bit(&self) -> bool {
        self.stride() == 2
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
