/// Pipeline state: the value describing one draw or dispatch configuration
///
/// Shaders and render targets are compared by identity (object id),
/// fixed-function states by value. Two equal pipeline states always map to
/// the same cached pipeline object.

use std::hash::{Hash, Hasher};
use std::sync::Arc;
use rustc_hash::FxHasher;
use crate::rhi::definitions::{Format, ObjectId, MAX_RENDER_TARGET_COUNT};
use crate::rhi::shader::Shader;
use crate::rhi::state::{BlendState, DepthStencilState, PrimitiveTopology, RasterizerState, Viewport};
use crate::rhi::swap_chain::SwapChain;
use crate::rhi::texture::Texture;

/// What happens to a render target when a render pass begins
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LoadOp<T> {
    /// Keep the current content
    #[default]
    Load,
    /// Content is undefined
    DontCare,
    /// Clear to the value
    Clear(T),
}

impl<T> LoadOp<T> {
    pub fn is_clear(&self) -> bool {
        matches!(self, LoadOp::Clear(_))
    }
}

trait HashBits {
    fn hash_bits<H: Hasher>(&self, state: &mut H);
}

impl HashBits for [f32; 4] {
    fn hash_bits<H: Hasher>(&self, state: &mut H) {
        for channel in self {
            channel.to_bits().hash(state);
        }
    }
}

impl HashBits for f32 {
    fn hash_bits<H: Hasher>(&self, state: &mut H) {
        self.to_bits().hash(state);
    }
}

impl HashBits for u32 {
    fn hash_bits<H: Hasher>(&self, state: &mut H) {
        self.hash(state);
    }
}

impl<T: HashBits> HashBits for LoadOp<T> {
    fn hash_bits<H: Hasher>(&self, state: &mut H) {
        match self {
            LoadOp::Load => 0u8.hash(state),
            LoadOp::DontCare => 1u8.hash(state),
            LoadOp::Clear(value) => {
                2u8.hash(state);
                value.hash_bits(state);
            }
        }
    }
}

fn id_of<T: ?Sized>(object: &Option<Arc<T>>, id: impl Fn(&T) -> ObjectId) -> ObjectId {
    object.as_deref().map_or(0, id)
}

/// Pipeline state descriptor
#[derive(Clone, Default)]
pub struct PipelineState {
    /// Debug name, used to name the compiled objects
    pub name: String,

    // Shaders
    pub shader_vertex: Option<Arc<Shader>>,
    pub shader_pixel: Option<Arc<Shader>>,
    pub shader_compute: Option<Arc<Shader>>,

    // Fixed-function states
    pub rasterizer_state: RasterizerState,
    pub blend_state: BlendState,
    pub depth_stencil_state: DepthStencilState,

    // Render targets
    pub render_target_swapchain: Option<Arc<dyn SwapChain>>,
    pub render_target_color_textures: [Option<Arc<Texture>>; MAX_RENDER_TARGET_COUNT],
    pub render_target_color_texture_array_index: u32,
    pub render_target_depth_texture: Option<Arc<Texture>>,
    pub render_target_depth_texture_array_index: u32,
    pub render_target_depth_texture_read_only: bool,

    // Clear values applied when the render pass begins
    pub clear_color: [LoadOp<[f32; 4]>; MAX_RENDER_TARGET_COUNT],
    pub clear_depth: LoadOp<f32>,
    pub clear_stencil: LoadOp<u32>,

    // Misc
    pub primitive_topology: PrimitiveTopology,
    /// Adds a per-instance 4x4 transform stream at binding 1
    pub instancing: bool,
    /// Scissor is set by the command list instead of baked at creation
    pub dynamic_scissor: bool,
    /// Vertex positions are generated in the vertex shader, no vertex input
    pub is_fullscreen_triangle: bool,
    /// Explicit viewport; when undefined the full render target is used
    pub viewport: Viewport,
}

impl PipelineState {
    /// True for a vertex/pixel configuration without a compute shader
    pub fn is_graphics(&self) -> bool {
        (self.shader_vertex.is_some() || self.shader_pixel.is_some()) && self.shader_compute.is_none()
    }

    /// True for a compute-only configuration
    pub fn is_compute(&self) -> bool {
        self.shader_compute.is_some() && self.shader_vertex.is_none() && self.shader_pixel.is_none()
    }

    /// A valid state is exactly one of graphics or compute, and a graphics
    /// state has a vertex shader and something to render into
    pub fn is_valid(&self) -> bool {
        if self.is_graphics() == self.is_compute() {
            return false;
        }

        if self.is_graphics() {
            return self.shader_vertex.is_some() && self.has_render_target();
        }

        true
    }

    pub fn has_render_target(&self) -> bool {
        self.render_target_swapchain.is_some()
            || self.render_target_color_textures[0].is_some()
            || self.render_target_depth_texture.is_some()
    }

    /// Active color textures: the slots up to the first empty one
    pub fn color_textures(&self) -> impl Iterator<Item = &Arc<Texture>> {
        self.render_target_color_textures.iter().map_while(|slot| slot.as_ref())
    }

    /// Number of color attachments (the swap chain counts as one)
    pub fn color_target_count(&self) -> usize {
        if self.render_target_swapchain.is_some() {
            1
        } else {
            self.color_textures().count()
        }
    }

    /// Formats of the color attachments
    pub fn color_formats(&self) -> Vec<Format> {
        match &self.render_target_swapchain {
            Some(swap_chain) => vec![swap_chain.format()],
            None => self.color_textures().map(|texture| texture.format()).collect(),
        }
    }

    /// Width of the render area
    pub fn width(&self) -> u32 {
        if let Some(swap_chain) = &self.render_target_swapchain {
            return swap_chain.width();
        }
        if let Some(texture) = &self.render_target_color_textures[0] {
            return texture.width();
        }
        self.render_target_depth_texture.as_ref().map_or(0, |texture| texture.width())
    }

    /// Height of the render area
    pub fn height(&self) -> u32 {
        if let Some(swap_chain) = &self.render_target_swapchain {
            return swap_chain.height();
        }
        if let Some(texture) = &self.render_target_color_textures[0] {
            return texture.height();
        }
        self.render_target_depth_texture.as_ref().map_or(0, |texture| texture.height())
    }

    /// Viewport used at creation: the explicit one or the full render area
    pub fn resolved_viewport(&self) -> Viewport {
        if self.viewport.is_defined() {
            self.viewport
        } else {
            Viewport::new(0.0, 0.0, self.width() as f32, self.height() as f32)
        }
    }

    /// Stable hash over everything that affects the compiled pipeline
    pub fn hash_value(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.hash(&mut hasher);
        hasher.finish()
    }

    fn identity_key(&self) -> [ObjectId; 4 + MAX_RENDER_TARGET_COUNT + 1] {
        let mut key = [0; 4 + MAX_RENDER_TARGET_COUNT + 1];
        key[0] = id_of(&self.shader_vertex, Shader::object_id);
        key[1] = id_of(&self.shader_pixel, Shader::object_id);
        key[2] = id_of(&self.shader_compute, Shader::object_id);
        key[3] = id_of(&self.render_target_swapchain, |s| s.object_id());
        for (i, slot) in self.render_target_color_textures.iter().enumerate() {
            key[4 + i] = id_of(slot, Texture::object_id);
        }
        key[4 + MAX_RENDER_TARGET_COUNT] = id_of(&self.render_target_depth_texture, Texture::object_id);
        key
    }
}

impl PartialEq for PipelineState {
    fn eq(&self, other: &Self) -> bool {
        self.identity_key() == other.identity_key()
            && self.rasterizer_state == other.rasterizer_state
            && self.blend_state == other.blend_state
            && self.depth_stencil_state == other.depth_stencil_state
            && self.render_target_color_texture_array_index == other.render_target_color_texture_array_index
            && self.render_target_depth_texture_array_index == other.render_target_depth_texture_array_index
            && self.render_target_depth_texture_read_only == other.render_target_depth_texture_read_only
            && self.clear_color == other.clear_color
            && self.clear_depth == other.clear_depth
            && self.clear_stencil == other.clear_stencil
            && self.primitive_topology == other.primitive_topology
            && self.instancing == other.instancing
            && self.dynamic_scissor == other.dynamic_scissor
            && self.is_fullscreen_triangle == other.is_fullscreen_triangle
            && self.viewport == other.viewport
    }
}

impl Eq for PipelineState {}

impl Hash for PipelineState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity_key().hash(state);
        self.rasterizer_state.hash(state);
        self.blend_state.hash(state);
        self.depth_stencil_state.hash(state);
        self.render_target_color_texture_array_index.hash(state);
        self.render_target_depth_texture_array_index.hash(state);
        self.render_target_depth_texture_read_only.hash(state);
        for clear in &self.clear_color {
            clear.hash_bits(state);
        }
        self.clear_depth.hash_bits(state);
        self.clear_stencil.hash_bits(state);
        self.primitive_topology.hash(state);
        self.instancing.hash(state);
        self.dynamic_scissor.hash(state);
        self.is_fullscreen_triangle.hash(state);
        self.viewport.hash(state);
    }
}

impl std::fmt::Debug for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineState")
            .field("name", &self.name)
            .field("graphics", &self.is_graphics())
            .field("compute", &self.is_compute())
            .field("color_targets", &self.color_target_count())
            .field("instancing", &self.instancing)
            .finish()
    }
}

#[cfg(test)]
#[path = "pipeline_state_tests.rs"]
mod tests;
