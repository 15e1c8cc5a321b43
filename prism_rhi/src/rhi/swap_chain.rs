/// Swap chain interface consumed by pipeline states and command lists
///
/// Presentation (acquire, present, resize) is backend specific; the core
/// only reads format, dimensions and the current backbuffer.

use crate::rhi::definitions::{Format, ImageLayout, ObjectId, RhiHandle};

pub trait SwapChain: Send + Sync {
    /// Process-unique identity
    fn object_id(&self) -> ObjectId;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn format(&self) -> Format;

    /// Image of the currently acquired backbuffer
    fn rhi_image(&self) -> RhiHandle;

    /// Render-target view of the currently acquired backbuffer
    fn rhi_rtv(&self) -> RhiHandle;

    /// Tracked layout of the currently acquired backbuffer
    fn layout(&self) -> ImageLayout;

    /// Record the layout a barrier moved the current backbuffer to
    fn set_layout(&self, layout: ImageLayout);
}
