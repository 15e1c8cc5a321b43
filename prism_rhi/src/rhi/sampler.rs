/// Samplers

use std::sync::Arc;
use crate::rhi::definitions::{generate_object_id, ObjectId, ResourceType, RhiHandle};
use crate::rhi::deletion_queue::DeletionQueue;
use crate::rhi::state::CompareFunction;

/// Texture filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    Nearest,
    Linear,
}

/// Texture addressing outside [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerAddressMode {
    Wrap,
    Mirror,
    Clamp,
    Border,
    MirrorOnce,
}

/// Sampler creation descriptor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerDesc {
    pub filter_min: Filter,
    pub filter_mag: Filter,
    pub filter_mipmap: Filter,
    pub address_mode: SamplerAddressMode,
    /// Comparison samplers are used for shadow-map lookups
    pub comparison: Option<CompareFunction>,
    /// 0 or 1 disables anisotropic filtering
    pub anisotropy: f32,
    pub mip_lod_bias: f32,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            filter_min: Filter::Linear,
            filter_mag: Filter::Linear,
            filter_mipmap: Filter::Linear,
            address_mode: SamplerAddressMode::Wrap,
            comparison: None,
            anisotropy: 0.0,
            mip_lod_bias: 0.0,
        }
    }
}

impl SamplerDesc {
    /// Point sampling with clamped addressing
    pub fn point_clamp() -> Self {
        Self {
            filter_min: Filter::Nearest,
            filter_mag: Filter::Nearest,
            filter_mipmap: Filter::Nearest,
            address_mode: SamplerAddressMode::Clamp,
            ..Default::default()
        }
    }

    /// Reverse-z shadow comparison
    pub fn comparison_depth() -> Self {
        Self {
            filter_mipmap: Filter::Nearest,
            address_mode: SamplerAddressMode::Clamp,
            comparison: Some(CompareFunction::GreaterEqual),
            ..Default::default()
        }
    }
}

/// Sampler object
#[derive(Debug)]
pub struct Sampler {
    id: ObjectId,
    desc: SamplerDesc,
    handle: RhiHandle,
    deletion_queue: Option<Arc<DeletionQueue>>,
}

impl Sampler {
    pub fn new(desc: SamplerDesc, handle: RhiHandle, deletion_queue: Option<Arc<DeletionQueue>>) -> Self {
        Self { id: generate_object_id(), desc, handle, deletion_queue }
    }

    pub fn object_id(&self) -> ObjectId {
        self.id
    }

    pub fn desc(&self) -> &SamplerDesc {
        &self.desc
    }

    pub fn rhi_handle(&self) -> RhiHandle {
        self.handle
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        if let Some(queue) = &self.deletion_queue {
            queue.add(ResourceType::Sampler, self.handle);
        }
    }
}
