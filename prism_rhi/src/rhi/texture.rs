/// Textures: metadata, backend handles and tracked image layouts

use std::sync::{Arc, Mutex, PoisonError};
use crate::rhi::definitions::{
    generate_object_id, Format, ImageAspect, ImageLayout, ObjectId, ResourceType, RhiHandle,
    LOG_SOURCE, MAX_MIP_COUNT, NULL_HANDLE,
};
use crate::rhi::deletion_queue::DeletionQueue;

bitflags::bitflags! {
    /// Texture usage flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextureFlags: u32 {
        /// Sampled in shaders
        const SRV = 1 << 0;
        /// Written by compute shaders
        const UAV = 1 << 1;
        /// Color render target
        const RTV = 1 << 2;
        /// Depth-stencil render target
        const DSV = 1 << 3;
        /// Can be cleared outside a render pass and used as blit/copy source or destination
        const CLEAR_BLIT = 1 << 4;
        /// Gets one shader view per mip (mip chain generation, per-mip UAV writes)
        const PER_MIP_VIEWS = 1 << 5;
    }
}

/// Texture creation descriptor
#[derive(Debug, Clone)]
pub struct TextureDesc {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub array_length: u32,
    pub mip_count: u32,
    pub format: Format,
    pub flags: TextureFlags,
}

impl TextureDesc {
    /// Single-mip 2D render target
    pub fn render_target(name: &str, width: u32, height: u32, format: Format, flags: TextureFlags) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            array_length: 1,
            mip_count: 1,
            format,
            flags,
        }
    }
}

/// Backend objects making up a texture
#[derive(Debug, Clone, Default)]
pub struct TextureHandles {
    /// Image (VkImage)
    pub image: RhiHandle,
    /// Shader view over every mip and slice
    pub srv: RhiHandle,
    /// One shader view per mip (only with PER_MIP_VIEWS)
    pub srv_mips: Vec<RhiHandle>,
    /// One render-target view per array slice (only with RTV or DSV)
    pub rtv: Vec<RhiHandle>,
}

/// GPU texture
pub struct Texture {
    id: ObjectId,
    desc: TextureDesc,
    handles: TextureHandles,
    layouts: Mutex<Vec<ImageLayout>>,
    deletion_queue: Option<Arc<DeletionQueue>>,
}

impl Texture {
    /// Wrap backend objects created for `desc`
    pub fn new(desc: TextureDesc, handles: TextureHandles, deletion_queue: Option<Arc<DeletionQueue>>) -> Self {
        crate::rhi_assert!(desc.width > 0 && desc.height > 0, LOG_SOURCE,
            "Texture '{}' has a zero dimension ({}x{})", desc.name, desc.width, desc.height);
        crate::rhi_assert!(desc.mip_count >= 1 && desc.mip_count <= MAX_MIP_COUNT, LOG_SOURCE,
            "Texture '{}' has an invalid mip count {}", desc.name, desc.mip_count);
        crate::rhi_assert!(desc.array_length >= 1, LOG_SOURCE,
            "Texture '{}' has an array length of 0", desc.name);

        let layouts = vec![ImageLayout::Undefined; desc.mip_count as usize];
        Self {
            id: generate_object_id(),
            desc,
            handles,
            layouts: Mutex::new(layouts),
            deletion_queue,
        }
    }

    pub fn object_id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn width(&self) -> u32 {
        self.desc.width
    }

    pub fn height(&self) -> u32 {
        self.desc.height
    }

    pub fn format(&self) -> Format {
        self.desc.format
    }

    pub fn flags(&self) -> TextureFlags {
        self.desc.flags
    }

    pub fn mip_count(&self) -> u32 {
        self.desc.mip_count
    }

    pub fn array_length(&self) -> u32 {
        self.desc.array_length
    }

    pub fn is_depth_format(&self) -> bool {
        self.desc.format.is_depth()
    }

    pub fn is_stencil_format(&self) -> bool {
        self.desc.format.has_stencil()
    }

    pub fn aspect_mask(&self) -> ImageAspect {
        ImageAspect::from_format(self.desc.format)
    }

    pub fn rhi_image(&self) -> RhiHandle {
        self.handles.image
    }

    pub fn rhi_srv(&self) -> RhiHandle {
        self.handles.srv
    }

    /// Shader view of a single mip, falls back to the full view
    pub fn rhi_srv_mip(&self, mip: u32) -> RhiHandle {
        self.handles.srv_mips.get(mip as usize).copied().unwrap_or(self.handles.srv)
    }

    /// Render-target view of an array slice
    pub fn rhi_rtv(&self, slice: u32) -> RhiHandle {
        self.handles.rtv.get(slice as usize).copied().unwrap_or(NULL_HANDLE)
    }

    /// Tracked layout of a mip
    pub fn layout(&self, mip: u32) -> ImageLayout {
        let layouts = self.layouts.lock().unwrap_or_else(PoisonError::into_inner);
        layouts.get(mip as usize).copied().unwrap_or(ImageLayout::Undefined)
    }

    /// Tracked layout of a mip range, None when the mips disagree or the range is out of bounds
    pub fn layout_of_range(&self, mip_start: u32, mip_range: u32) -> Option<ImageLayout> {
        let layouts = self.layouts.lock().unwrap_or_else(PoisonError::into_inner);
        let end = mip_start.checked_add(mip_range)?;
        let range = layouts.get(mip_start as usize..end as usize)?;
        let first = *range.first()?;
        range.iter().all(|layout| *layout == first).then_some(first)
    }

    /// Record the layout a barrier moved a mip range to
    pub fn set_layout(&self, mip_start: u32, mip_range: u32, layout: ImageLayout) {
        crate::rhi_assert!(mip_range_in_bounds(mip_start, mip_range, self.desc.mip_count), LOG_SOURCE,
            "Mip range {} + {} is out of bounds for texture '{}' ({} mips)",
            mip_start, mip_range, self.desc.name, self.desc.mip_count);

        let mut layouts = self.layouts.lock().unwrap_or_else(PoisonError::into_inner);
        for mip in mip_start..mip_start + mip_range {
            layouts[mip as usize] = layout;
        }
    }
}

/// True when `mip_start..mip_start + mip_range` fits in `mip_count` mips
pub(crate) fn mip_range_in_bounds(mip_start: u32, mip_range: u32, mip_count: u32) -> bool {
    mip_start.checked_add(mip_range).is_some_and(|end| end <= mip_count)
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("name", &self.desc.name)
            .field("size", &(self.desc.width, self.desc.height))
            .field("format", &self.desc.format)
            .finish()
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        if let Some(queue) = &self.deletion_queue {
            for view in self.handles.rtv.iter().chain(self.handles.srv_mips.iter()) {
                queue.add(ResourceType::TextureView, *view);
            }
            queue.add(ResourceType::TextureView, self.handles.srv);
            queue.add(ResourceType::Texture, self.handles.image);
        }
    }
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
