use super::*;
use crate::rhi::definitions::Format;
use crate::rhi::descriptor_set_layout::merge_descriptors;
use crate::rhi::mock_device::{
    mock_compute_shader, mock_pixel_shader, mock_shader, mock_texture, mock_vertex_shader,
    MockSwapChain, COMPARISON_SAMPLER_LAYOUT, MAX_PUSH_CONSTANT_SIZE, REGULAR_SAMPLER_LAYOUT,
};
use crate::rhi::shader::Descriptor;
use crate::rhi::state::BlendState;
use crate::rhi::texture::TextureFlags;

const SAMPLER_LAYOUTS: (RhiHandle, RhiHandle) = (COMPARISON_SAMPLER_LAYOUT, REGULAR_SAMPLER_LAYOUT);

fn layout_for(state: &PipelineState) -> DescriptorSetLayout {
    let shaders = [&state.shader_vertex, &state.shader_pixel, &state.shader_compute];
    let descriptors = merge_descriptors(shaders.into_iter().flatten().map(Arc::as_ref));
    DescriptorSetLayout::new(&state.name, descriptors, 77, None)
}

fn build(state: &PipelineState) -> PipelineDesc {
    PipelineDesc::build(state, &layout_for(state), SAMPLER_LAYOUTS, MAX_PUSH_CONSTANT_SIZE)
}

fn forward_state() -> PipelineState {
    let mut state = PipelineState {
        name: "forward".to_string(),
        shader_vertex: Some(mock_vertex_shader()),
        shader_pixel: Some(mock_pixel_shader()),
        render_target_depth_texture: Some(mock_texture("depth", 1280, 720, Format::D32_Float, TextureFlags::DSV)),
        ..Default::default()
    };
    state.render_target_color_textures[0] = Some(mock_texture(
        "hdr", 1280, 720, Format::R16G16B16A16_Float, TextureFlags::RTV,
    ));
    state
}

fn graphics(desc: &PipelineDesc) -> &GraphicsPipelineDesc {
    desc.graphics.as_ref().unwrap()
}

// ============================================================================
// LAYOUT & STAGES
// ============================================================================

#[test]
fn test_set_layout_order() {
    let desc = build(&forward_state());
    assert_eq!(desc.set_layouts, [77, COMPARISON_SAMPLER_LAYOUT, REGULAR_SAMPLER_LAYOUT]);
}

#[test]
fn test_graphics_stages_in_order() {
    let state = forward_state();
    let desc = build(&state);

    assert_eq!(desc.stages.len(), 2);
    assert_eq!(desc.stages[0].stage, ShaderStage::VERTEX);
    assert_eq!(desc.stages[0].module, state.shader_vertex.as_ref().unwrap().rhi_module());
    assert_eq!(desc.stages[1].stage, ShaderStage::PIXEL);
    assert_eq!(desc.stages[1].entry_point, "main");
}

#[test]
fn test_compute_path_has_single_stage_and_no_graphics_state() {
    let state = PipelineState {
        name: "blur".to_string(),
        shader_compute: Some(mock_compute_shader()),
        ..Default::default()
    };
    let desc = build(&state);

    assert!(desc.is_compute());
    assert_eq!(desc.stages.len(), 1);
    assert_eq!(desc.stages[0].stage, ShaderStage::COMPUTE);
    assert_eq!(desc.set_layouts[1], COMPARISON_SAMPLER_LAYOUT);
}

#[test]
#[should_panic(expected = "must be either graphics or compute")]
fn test_empty_state_is_fatal() {
    let state = PipelineState::default();
    build(&state);
}

#[test]
#[should_panic(expected = "must be either graphics or compute")]
fn test_mixed_state_is_fatal() {
    let mut state = forward_state();
    state.shader_compute = Some(mock_compute_shader());
    build(&state);
}

#[test]
#[should_panic(expected = "descriptor set layout 0 is null")]
fn test_null_layout_is_fatal() {
    let state = forward_state();
    let layout = DescriptorSetLayout::new("null", Vec::new(), NULL_HANDLE, None);
    PipelineDesc::build(&state, &layout, SAMPLER_LAYOUTS, MAX_PUSH_CONSTANT_SIZE);
}

#[test]
#[should_panic(expected = "has no module")]
fn test_null_shader_module_is_fatal() {
    let mut state = forward_state();
    state.shader_pixel = Some(Arc::new(Shader::new(
        "broken.ps", ShaderStage::PIXEL, "main", NULL_HANDLE, Default::default(), None,
    )));
    build(&state);
}

// ============================================================================
// PUSH CONSTANTS
// ============================================================================

#[test]
fn test_push_constant_range_from_descriptor() {
    let state = PipelineState {
        shader_compute: Some(mock_compute_shader()),
        ..Default::default()
    };
    let desc = build(&state);

    assert_eq!(desc.push_constant_ranges, vec![PushConstantRange {
        offset: 0,
        size: 16,
        stages: ShaderStage::COMPUTE,
    }]);
}

#[test]
fn test_push_constant_stages_are_merged() {
    let constants = |stage| Descriptor::new("draw", DescriptorType::PushConstantBuffer, 0, stage, 64);
    let mut state = forward_state();
    state.shader_vertex = Some(mock_shader("vs", ShaderStage::VERTEX, &[], vec![constants(ShaderStage::VERTEX)]));
    state.shader_pixel = Some(mock_shader("ps", ShaderStage::PIXEL, &[], vec![constants(ShaderStage::PIXEL)]));
    state.is_fullscreen_triangle = true;

    let desc = build(&state);
    assert_eq!(desc.push_constant_ranges.len(), 1);
    assert_eq!(desc.push_constant_ranges[0].stages, ShaderStage::VERTEX | ShaderStage::PIXEL);
}

#[test]
#[should_panic(expected = "the device allows 128")]
fn test_push_constants_over_device_limit_are_fatal() {
    let oversized = Descriptor::new("huge", DescriptorType::PushConstantBuffer, 0, ShaderStage::COMPUTE, 256);
    let state = PipelineState {
        shader_compute: Some(mock_shader("huge.cs", ShaderStage::COMPUTE, &[], vec![oversized])),
        ..Default::default()
    };
    build(&state);
}

// ============================================================================
// DYNAMIC STATE
// ============================================================================

#[test]
fn test_viewport_always_dynamic_scissor_baked_by_default() {
    let desc = build(&forward_state());
    let graphics = graphics(&desc);

    assert!(graphics.is_dynamic(DynamicState::Viewport));
    assert!(!graphics.is_dynamic(DynamicState::Scissor));
    assert_eq!(graphics.scissor, Rectangle::new(0.0, 0.0, 1280.0, 720.0));
}

#[test]
fn test_dynamic_scissor() {
    let mut state = forward_state();
    state.dynamic_scissor = true;
    let desc = build(&state);

    assert_eq!(graphics(&desc).dynamic_states, vec![DynamicState::Viewport, DynamicState::Scissor]);
}

#[test]
fn test_baked_scissor_follows_explicit_viewport_size() {
    let mut state = forward_state();
    state.viewport = Viewport::new(100.0, 50.0, 512.0, 256.0);
    let desc = build(&state);

    assert_eq!(graphics(&desc).viewport, state.viewport);
    assert_eq!(graphics(&desc).scissor, Rectangle::new(0.0, 0.0, 512.0, 256.0));
}

// ============================================================================
// VERTEX INPUT
// ============================================================================

#[test]
fn test_vertex_input_from_reflection() {
    let desc = build(&forward_state());
    let graphics = graphics(&desc);

    assert_eq!(graphics.vertex_bindings, vec![VertexBindingDesc {
        binding: 0,
        stride: 32,
        input_rate: VertexInputRate::Vertex,
    }]);
    assert_eq!(graphics.vertex_attributes.len(), 3);
    assert_eq!(graphics.vertex_attributes[2].offset, 24);
    assert_eq!(graphics.vertex_attributes[2].format, Format::R32G32_Float);
}

#[test]
fn test_instancing_adds_matrix_stream() {
    let mut state = forward_state();
    state.instancing = true;
    let desc = build(&state);
    let graphics = graphics(&desc);

    assert_eq!(graphics.vertex_bindings.len(), 2);
    assert_eq!(graphics.vertex_bindings[1], VertexBindingDesc {
        binding: 1,
        stride: 64,
        input_rate: VertexInputRate::Instance,
    });

    let rows: Vec<_> = graphics.vertex_attributes[3..].to_vec();
    assert_eq!(rows.len(), 4);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.location, 3 + i as u32);
        assert_eq!(row.binding, 1);
        assert_eq!(row.format, Format::R32G32B32A32_Float);
        assert_eq!(row.offset, i as u32 * 16);
    }
}

#[test]
fn test_fullscreen_triangle_has_no_vertex_input() {
    let mut state = forward_state();
    state.is_fullscreen_triangle = true;
    state.instancing = true;
    let desc = build(&state);

    assert!(graphics(&desc).vertex_bindings.is_empty());
    assert!(graphics(&desc).vertex_attributes.is_empty());
}

// ============================================================================
// FIXED FUNCTION
// ============================================================================

#[test]
fn test_depth_bias_is_scaled_to_fixed_point() {
    let mut state = forward_state();
    state.rasterizer_state = state.rasterizer_state.with_depth_bias(0.0001, 0.5, 1.5);
    let bias = graphics(&build(&state)).depth_bias;

    assert!(bias.enabled);
    assert_eq!(bias.constant_factor, (0.0001f32 * 16_777_216.0).floor());
    assert_eq!(bias.constant_factor, 1677.0);
    assert_eq!(bias.clamp, 0.5);
    assert_eq!(bias.slope_factor, 1.5);
}

#[test]
fn test_zero_depth_bias_is_disabled() {
    let bias = graphics(&build(&forward_state())).depth_bias;
    assert!(!bias.enabled);
    assert_eq!(bias.constant_factor, 0.0);
}

#[test]
fn test_reverse_z_and_stencil_defaults() {
    let desc = build(&forward_state());
    let graphics = graphics(&desc);

    assert!(graphics.front_face_clockwise);
    assert_eq!(graphics.depth_bounds, (1.0, 0.0));
    assert_eq!(graphics.stencil_reference, 1);
}

#[test]
fn test_blend_attachments_match_color_targets() {
    let mut state = forward_state();
    let extra = mock_texture("normals", 1280, 720, Format::R8G8B8A8_Unorm, TextureFlags::RTV);
    state.render_target_color_textures[1] = Some(extra);
    state.blend_state = BlendState::additive();
    let desc = build(&state);
    let graphics = graphics(&desc);

    assert_eq!(graphics.blend_attachment_count, 2);
    assert_eq!(graphics.blend_constants, [1.0; 4]);
    assert_eq!(graphics.color_formats, vec![Format::R16G16B16A16_Float, Format::R8G8B8A8_Unorm]);
}

#[test]
fn test_swap_chain_target_formats() {
    let state = PipelineState {
        name: "present".to_string(),
        shader_vertex: Some(mock_vertex_shader()),
        render_target_swapchain: Some(Arc::new(MockSwapChain::new(640, 480))),
        is_fullscreen_triangle: true,
        ..Default::default()
    };
    let desc = build(&state);
    let graphics = graphics(&desc);

    assert_eq!(graphics.blend_attachment_count, 1);
    assert_eq!(graphics.color_formats, vec![Format::B8R8G8A8_Unorm]);
    assert_eq!(graphics.depth_format, Format::Undefined);
    assert_eq!(graphics.stencil_format, Format::Undefined);
}

#[test]
fn test_stencil_format_only_with_stencil_channel() {
    let desc = build(&forward_state());
    assert_eq!(graphics(&desc).depth_format, Format::D32_Float);
    assert_eq!(graphics(&desc).stencil_format, Format::Undefined);

    let mut state = forward_state();
    state.render_target_depth_texture = Some(mock_texture(
        "depth_stencil", 1280, 720, Format::D32_Float_S8X24_Uint, TextureFlags::DSV,
    ));
    let desc = build(&state);
    assert_eq!(graphics(&desc).stencil_format, Format::D32_Float_S8X24_Uint);
}

#[test]
fn test_equal_states_build_equal_descriptions() {
    let a = forward_state();
    let b = a.clone();
    assert_eq!(build(&a), build(&b));
}

// ============================================================================
// PIPELINE OBJECT
// ============================================================================

#[test]
fn test_pipeline_drop_enqueues_both_handles() {
    let queue = Arc::new(DeletionQueue::new());
    let state = forward_state();
    let layout = Arc::new(layout_for(&state));
    let desc = build(&state);

    let pipeline = Pipeline::new(state, layout, &desc, NativePipeline { layout: 5, pipeline: 6 }, queue.clone());
    assert_eq!(pipeline.rhi_pipeline(), 6);
    assert_eq!(pipeline.rhi_pipeline_layout(), 5);
    assert!(pipeline.push_constant_stages().is_empty());

    drop(pipeline);
    assert_eq!(queue.count(ResourceType::Pipeline), 1);
    assert_eq!(queue.count(ResourceType::PipelineLayout), 1);
}
