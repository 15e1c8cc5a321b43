/// Pipeline objects and the backend-neutral pipeline description
///
/// `PipelineDesc::build` resolves a pipeline state into everything a
/// backend needs to compile it: set-layout list, push-constant ranges,
/// shader stages, vertex input, fixed-function state, dynamic state and
/// rendering formats. Backends translate it 1:1 into native objects.

use std::sync::Arc;
use crate::rhi::definitions::{
    generate_object_id, DescriptorType, Format, ObjectId, ResourceType, RhiHandle, ShaderStage,
    DEPTH_BIAS_UNIT, LOG_SOURCE, NULL_HANDLE,
};
use crate::rhi::deletion_queue::DeletionQueue;
use crate::rhi::descriptor_set_layout::DescriptorSetLayout;
use crate::rhi::pipeline_state::PipelineState;
use crate::rhi::shader::Shader;
use crate::rhi::state::{
    BlendState, DepthStencilState, PrimitiveTopology, RasterizerState, Rectangle, Viewport,
};

/// Index of the caller's descriptor-set layout in every pipeline layout
pub const SET_INDEX_RESOURCES: u32 = 0;
/// Index of the comparison-sampler set layout
pub const SET_INDEX_SAMPLERS_COMPARISON: u32 = 1;
/// Index of the regular-sampler set layout
pub const SET_INDEX_SAMPLERS_REGULAR: u32 = 2;

/// Stride of the per-instance stream: one 4x4 f32 transform
pub const INSTANCE_STRIDE: u32 = std::mem::size_of::<glam::Mat4>() as u32;

/// Bytes between two rows of the instance transform
const INSTANCE_ROW_SIZE: u32 = std::mem::size_of::<glam::Vec4>() as u32;

/// Push-constant range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushConstantRange {
    pub offset: u32,
    pub size: u32,
    pub stages: ShaderStage,
}

/// One shader stage of a pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderStageDesc {
    /// Single stage bit
    pub stage: ShaderStage,
    pub module: RhiHandle,
    pub entry_point: String,
}

/// Vertex input rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexInputRate {
    Vertex,
    Instance,
}

/// Vertex buffer binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBindingDesc {
    pub binding: u32,
    pub stride: u32,
    pub input_rate: VertexInputRate,
}

/// Vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttributeDesc {
    pub location: u32,
    pub binding: u32,
    pub format: Format,
    pub offset: u32,
}

/// Pipeline state that can be changed while recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicState {
    Viewport,
    Scissor,
}

/// Resolved depth bias
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthBiasDesc {
    pub enabled: bool,
    /// floor(bias * 2^24)
    pub constant_factor: f32,
    pub clamp: f32,
    pub slope_factor: f32,
}

impl DepthBiasDesc {
    fn from_rasterizer(rasterizer: &RasterizerState) -> Self {
        Self {
            enabled: rasterizer.depth_bias != 0.0,
            constant_factor: (rasterizer.depth_bias * DEPTH_BIAS_UNIT).floor(),
            clamp: rasterizer.depth_bias_clamp,
            slope_factor: rasterizer.depth_bias_slope_scaled,
        }
    }
}

/// Graphics-only part of a pipeline description
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsPipelineDesc {
    // Vertex input
    pub vertex_bindings: Vec<VertexBindingDesc>,
    pub vertex_attributes: Vec<VertexAttributeDesc>,
    pub topology: PrimitiveTopology,

    // Viewport & scissor
    pub dynamic_states: Vec<DynamicState>,
    pub viewport: Viewport,
    /// Used when the scissor is not dynamic: the full viewport
    pub scissor: Rectangle,

    // Rasterizer
    pub rasterizer: RasterizerState,
    pub depth_bias: DepthBiasDesc,
    pub front_face_clockwise: bool,

    // Depth-stencil
    pub depth_stencil: DepthStencilState,
    pub stencil_reference: u32,
    /// (min, max) = (1.0, 0.0) for reverse-z
    pub depth_bounds: (f32, f32),

    // Blend
    pub blend: BlendState,
    /// One attachment per color target, all sharing `blend`
    pub blend_attachment_count: usize,
    pub blend_constants: [f32; 4],

    // Rendering formats
    pub color_formats: Vec<Format>,
    pub depth_format: Format,
    pub stencil_format: Format,
}

impl GraphicsPipelineDesc {
    pub fn is_dynamic(&self, state: DynamicState) -> bool {
        self.dynamic_states.contains(&state)
    }
}

/// Fully resolved pipeline description
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineDesc {
    pub name: String,
    /// [resources, comparison samplers, regular samplers]
    pub set_layouts: [RhiHandle; 3],
    pub push_constant_ranges: Vec<PushConstantRange>,
    pub stages: Vec<ShaderStageDesc>,
    /// None for compute pipelines
    pub graphics: Option<GraphicsPipelineDesc>,
}

impl PipelineDesc {
    /// Resolve a pipeline state against a descriptor-set layout
    ///
    /// Every contract violation (state neither or both graphics and compute,
    /// null layouts, null shader modules, push constants larger than the
    /// device allows) is fatal.
    ///
    /// # Arguments
    ///
    /// * `state` - Pipeline state to compile
    /// * `layout` - Descriptor-set layout of the state's shaders
    /// * `sampler_layouts` - Device sampler set layouts (comparison, regular)
    /// * `max_push_constant_size` - Device limit in bytes
    pub fn build(
        state: &PipelineState,
        layout: &DescriptorSetLayout,
        sampler_layouts: (RhiHandle, RhiHandle),
        max_push_constant_size: u32,
    ) -> Self {
        crate::rhi_assert!(state.is_graphics() != state.is_compute(), LOG_SOURCE,
            "Pipeline state '{}' must be either graphics or compute (graphics: {}, compute: {})",
            state.name, state.is_graphics(), state.is_compute());

        let set_layouts = [layout.rhi_handle(), sampler_layouts.0, sampler_layouts.1];
        for (index, handle) in set_layouts.iter().enumerate() {
            crate::rhi_assert!(*handle != NULL_HANDLE, LOG_SOURCE,
                "Pipeline '{}': descriptor set layout {} is null", state.name, index);
        }

        let push_constant_ranges = layout
            .descriptors()
            .iter()
            .filter(|descriptor| descriptor.ty == DescriptorType::PushConstantBuffer)
            .map(|descriptor| {
                crate::rhi_assert!(descriptor.struct_size <= max_push_constant_size, LOG_SOURCE,
                    "Pipeline '{}': push constant '{}' is {} bytes, the device allows {}",
                    state.name, descriptor.name, descriptor.struct_size, max_push_constant_size);

                PushConstantRange {
                    offset: 0,
                    size: descriptor.struct_size,
                    stages: descriptor.stage
                        & (ShaderStage::VERTEX | ShaderStage::PIXEL | ShaderStage::COMPUTE),
                }
            })
            .collect();

        let stages = [&state.shader_vertex, &state.shader_pixel, &state.shader_compute]
            .into_iter()
            .flatten()
            .map(|shader| Self::stage_desc(&state.name, shader))
            .collect();

        let graphics = state.is_graphics().then(|| Self::build_graphics(state));

        Self {
            name: state.name.clone(),
            set_layouts,
            push_constant_ranges,
            stages,
            graphics,
        }
    }

    pub fn is_compute(&self) -> bool {
        self.graphics.is_none()
    }

    fn stage_desc(pipeline_name: &str, shader: &Shader) -> ShaderStageDesc {
        crate::rhi_assert!(shader.rhi_module() != NULL_HANDLE, LOG_SOURCE,
            "Pipeline '{}': shader '{}' has no module", pipeline_name, shader.name());
        crate::rhi_assert!(!shader.entry_point().is_empty(), LOG_SOURCE,
            "Pipeline '{}': shader '{}' has no entry point", pipeline_name, shader.name());

        ShaderStageDesc {
            stage: shader.stage(),
            module: shader.rhi_module(),
            entry_point: shader.entry_point().to_string(),
        }
    }

    fn build_graphics(state: &PipelineState) -> GraphicsPipelineDesc {
        // Viewport is always dynamic, the scissor only on request
        let mut dynamic_states = vec![DynamicState::Viewport];
        if state.dynamic_scissor {
            dynamic_states.push(DynamicState::Scissor);
        }
        let viewport = state.resolved_viewport();
        let scissor = Rectangle::new(0.0, 0.0, viewport.width, viewport.height);

        let (vertex_bindings, vertex_attributes) = Self::vertex_input(state);

        let depth_format = state
            .render_target_depth_texture
            .as_ref()
            .map_or(Format::Undefined, |texture| texture.format());
        let stencil_format = if depth_format.has_stencil() { depth_format } else { Format::Undefined };

        let blend = state.blend_state;

        GraphicsPipelineDesc {
            vertex_bindings,
            vertex_attributes,
            topology: state.primitive_topology,
            dynamic_states,
            viewport,
            scissor,
            rasterizer: state.rasterizer_state,
            depth_bias: DepthBiasDesc::from_rasterizer(&state.rasterizer_state),
            front_face_clockwise: true,
            depth_stencil: state.depth_stencil_state,
            stencil_reference: 1,
            depth_bounds: (1.0, 0.0),
            blend,
            blend_attachment_count: state.color_target_count(),
            blend_constants: [blend.blend_factor; 4],
            color_formats: state.color_formats(),
            depth_format,
            stencil_format,
        }
    }

    fn vertex_input(state: &PipelineState) -> (Vec<VertexBindingDesc>, Vec<VertexAttributeDesc>) {
        let shader = match &state.shader_vertex {
            Some(shader) if !state.is_fullscreen_triangle => shader,
            _ => return (Vec::new(), Vec::new()),
        };

        let input_layout = shader.input_layout();
        let mut bindings = vec![VertexBindingDesc {
            binding: 0,
            stride: input_layout.vertex_size(),
            input_rate: VertexInputRate::Vertex,
        }];

        let mut attributes: Vec<VertexAttributeDesc> = input_layout
            .attributes()
            .iter()
            .map(|attribute| VertexAttributeDesc {
                location: attribute.location,
                binding: attribute.binding,
                format: attribute.format,
                offset: attribute.offset,
            })
            .collect();

        if state.instancing {
            bindings.push(VertexBindingDesc {
                binding: 1,
                stride: INSTANCE_STRIDE,
                input_rate: VertexInputRate::Instance,
            });

            // One attribute per matrix row
            let first_location = attributes.len() as u32;
            attributes.extend((0..4).map(|row| VertexAttributeDesc {
                location: first_location + row,
                binding: 1,
                format: Format::R32G32B32A32_Float,
                offset: row * INSTANCE_ROW_SIZE,
            }));
        }

        (bindings, attributes)
    }
}

/// Native objects returned by a backend for one pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NativePipeline {
    pub layout: RhiHandle,
    pub pipeline: RhiHandle,
}

/// Compiled pipeline: owns its pipeline layout and pipeline handles
pub struct Pipeline {
    id: ObjectId,
    state: PipelineState,
    descriptor_set_layout: Arc<DescriptorSetLayout>,
    push_constant_stages: ShaderStage,
    native: NativePipeline,
    deletion_queue: Arc<DeletionQueue>,
}

impl Pipeline {
    pub fn new(
        state: PipelineState,
        descriptor_set_layout: Arc<DescriptorSetLayout>,
        desc: &PipelineDesc,
        native: NativePipeline,
        deletion_queue: Arc<DeletionQueue>,
    ) -> Self {
        let push_constant_stages = desc
            .push_constant_ranges
            .iter()
            .fold(ShaderStage::empty(), |stages, range| stages | range.stages);

        Self {
            id: generate_object_id(),
            state,
            descriptor_set_layout,
            push_constant_stages,
            native,
            deletion_queue,
        }
    }

    pub fn object_id(&self) -> ObjectId {
        self.id
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn descriptor_set_layout(&self) -> &Arc<DescriptorSetLayout> {
        &self.descriptor_set_layout
    }

    pub fn is_compute(&self) -> bool {
        self.state.is_compute()
    }

    /// Stages the push-constant range is visible to
    pub fn push_constant_stages(&self) -> ShaderStage {
        self.push_constant_stages
    }

    pub fn rhi_pipeline(&self) -> RhiHandle {
        self.native.pipeline
    }

    pub fn rhi_pipeline_layout(&self) -> RhiHandle {
        self.native.layout
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("id", &self.id)
            .field("name", &self.state.name)
            .field("native", &self.native)
            .finish()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.deletion_queue.add(ResourceType::Pipeline, self.native.pipeline);
        self.deletion_queue.add(ResourceType::PipelineLayout, self.native.layout);
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
