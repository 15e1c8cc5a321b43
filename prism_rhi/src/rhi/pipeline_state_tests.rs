use super::*;
use crate::rhi::mock_device::{
    mock_compute_shader, mock_pixel_shader, mock_texture, mock_vertex_shader, MockSwapChain,
};
use crate::rhi::state::CullMode;
use crate::rhi::texture::TextureFlags;

fn forward_state(color: &Arc<Texture>, depth: &Arc<Texture>) -> PipelineState {
    let mut state = PipelineState {
        name: "forward".to_string(),
        shader_vertex: Some(mock_vertex_shader()),
        shader_pixel: Some(mock_pixel_shader()),
        render_target_depth_texture: Some(depth.clone()),
        ..Default::default()
    };
    state.render_target_color_textures[0] = Some(color.clone());
    state
}

fn targets() -> (Arc<Texture>, Arc<Texture>) {
    (
        mock_texture("hdr", 1920, 1080, Format::R16G16B16A16_Float, TextureFlags::RTV | TextureFlags::SRV),
        mock_texture("depth", 1920, 1080, Format::D32_Float, TextureFlags::DSV),
    )
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

#[test]
fn test_default_state_is_neither_graphics_nor_compute() {
    let state = PipelineState::default();
    assert!(!state.is_graphics());
    assert!(!state.is_compute());
    assert!(!state.is_valid());
}

#[test]
fn test_graphics_state() {
    let (color, depth) = targets();
    let state = forward_state(&color, &depth);
    assert!(state.is_graphics());
    assert!(!state.is_compute());
    assert!(state.is_valid());
}

#[test]
fn test_compute_state() {
    let state = PipelineState {
        shader_compute: Some(mock_compute_shader()),
        ..Default::default()
    };
    assert!(state.is_compute());
    assert!(!state.is_graphics());
    assert!(state.is_valid());
}

#[test]
fn test_mixed_state_is_invalid() {
    let (color, depth) = targets();
    let mut state = forward_state(&color, &depth);
    state.shader_compute = Some(mock_compute_shader());
    assert!(!state.is_graphics());
    assert!(!state.is_compute());
    assert!(!state.is_valid());
}

#[test]
fn test_graphics_without_targets_is_invalid() {
    let state = PipelineState {
        shader_vertex: Some(mock_vertex_shader()),
        ..Default::default()
    };
    assert!(state.is_graphics());
    assert!(!state.is_valid());
}

// ============================================================================
// RENDER TARGETS
// ============================================================================

#[test]
fn test_color_targets_stop_at_first_empty_slot() {
    let (color, depth) = targets();
    let mut state = forward_state(&color, &depth);
    state.render_target_color_textures[1] = Some(color.clone());
    state.render_target_color_textures[3] = Some(color.clone());

    assert_eq!(state.color_target_count(), 2);
    assert_eq!(state.color_formats(), vec![Format::R16G16B16A16_Float; 2]);
}

#[test]
fn test_swap_chain_counts_as_one_target() {
    let state = PipelineState {
        shader_vertex: Some(mock_vertex_shader()),
        render_target_swapchain: Some(Arc::new(MockSwapChain::new(800, 600))),
        ..Default::default()
    };

    assert_eq!(state.color_target_count(), 1);
    assert_eq!(state.color_formats(), vec![Format::B8R8G8A8_Unorm]);
    assert_eq!((state.width(), state.height()), (800, 600));
}

#[test]
fn test_depth_only_state_takes_depth_dimensions() {
    let depth = mock_texture("shadow", 2048, 2048, Format::D32_Float, TextureFlags::DSV);
    let state = PipelineState {
        shader_vertex: Some(mock_vertex_shader()),
        render_target_depth_texture: Some(depth),
        ..Default::default()
    };

    assert_eq!(state.color_target_count(), 0);
    assert_eq!((state.width(), state.height()), (2048, 2048));
    assert!(state.is_valid());
}

#[test]
fn test_undefined_viewport_resolves_to_render_area() {
    let (color, depth) = targets();
    let state = forward_state(&color, &depth);
    assert_eq!(state.resolved_viewport(), Viewport::new(0.0, 0.0, 1920.0, 1080.0));
}

#[test]
fn test_explicit_viewport_is_kept() {
    let (color, depth) = targets();
    let mut state = forward_state(&color, &depth);
    state.viewport = Viewport::new(10.0, 20.0, 640.0, 480.0);
    assert_eq!(state.resolved_viewport(), state.viewport);
}

// ============================================================================
// EQUALITY & HASHING
// ============================================================================

#[test]
fn test_clones_are_equal_and_hash_equal() {
    let (color, depth) = targets();
    let a = forward_state(&color, &depth);
    let b = a.clone();
    assert_eq!(a, b);
    assert_eq!(a.hash_value(), b.hash_value());
}

#[test]
fn test_shaders_compare_by_identity() {
    let (color, depth) = targets();
    let a = forward_state(&color, &depth);
    let mut b = a.clone();
    // Same reflection, different object
    b.shader_vertex = Some(mock_vertex_shader());
    assert_ne!(a, b);
    assert_ne!(a.hash_value(), b.hash_value());
}

#[test]
fn test_sub_states_compare_by_value() {
    let (color, depth) = targets();
    let a = forward_state(&color, &depth);
    let mut b = a.clone();
    b.rasterizer_state.cull_mode = CullMode::None;
    assert_ne!(a, b);

    b.rasterizer_state.cull_mode = a.rasterizer_state.cull_mode;
    assert_eq!(a, b);
}

#[test]
fn test_clear_values_take_part_in_equality() {
    let (color, depth) = targets();
    let a = forward_state(&color, &depth);
    let mut b = a.clone();
    b.clear_color[0] = LoadOp::Clear([0.0, 0.0, 0.0, 1.0]);
    assert_ne!(a, b);
    assert_ne!(a.hash_value(), b.hash_value());
}

#[test]
fn test_load_op_default_is_load() {
    assert_eq!(LoadOp::<f32>::default(), LoadOp::Load);
    assert!(LoadOp::Clear(0.0f32).is_clear());
    assert!(!LoadOp::<f32>::DontCare.is_clear());
}
