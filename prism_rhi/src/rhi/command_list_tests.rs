use super::*;
use crate::error::Result;
use crate::rhi::definitions::Format;
use crate::rhi::mock_device::{
    mock_compute_shader, mock_device, mock_pixel_shader, mock_texture, mock_vertex_shader,
    MockRecorder, MockSwapChain,
};
use crate::rhi::pipeline_state::LoadOp;
use crate::rhi::texture::TextureDesc;

fn recording_list() -> (Device, MockRecorder, CommandList) {
    let (device, recorder) = mock_device();
    let mut list = device.create_command_list(QueueType::Graphics, "main");
    list.begin();
    (device, recorder, list)
}

fn forward_state(target: &Arc<Texture>) -> PipelineState {
    let mut state = PipelineState {
        name: "forward".to_string(),
        shader_vertex: Some(mock_vertex_shader()),
        shader_pixel: Some(mock_pixel_shader()),
        ..Default::default()
    };
    state.render_target_color_textures[0] = Some(target.clone());
    state.clear_color[0] = LoadOp::Clear([0.0, 0.0, 0.0, 1.0]);
    state
}

fn compute_state() -> PipelineState {
    PipelineState {
        name: "blur".to_string(),
        shader_compute: Some(mock_compute_shader()),
        ..Default::default()
    }
}

fn color_target(name: &str, width: u32, height: u32) -> Arc<Texture> {
    mock_texture(name, width, height, Format::R16G16B16A16_Float,
        TextureFlags::RTV | TextureFlags::SRV | TextureFlags::CLEAR_BLIT)
}

// ============================================================================
// STATE MACHINE
// ============================================================================

#[test]
fn test_new_list_is_idle() {
    let (device, _) = mock_device();
    let list = device.create_command_list(QueueType::Graphics, "main");
    assert_eq!(list.state(), CommandListState::Idle);
    assert_eq!(list.queue_type(), QueueType::Graphics);
    assert!(!list.is_executing());
}

#[test]
fn test_full_cycle() {
    let (_device, recorder, mut list) = recording_list();
    assert_eq!(list.state(), CommandListState::Recording);

    list.end();
    assert_eq!(list.state(), CommandListState::Ended);

    list.submit();
    assert_eq!(list.state(), CommandListState::Submitted);
    assert!(list.is_executing());

    list.wait_for_execution();
    assert_eq!(list.state(), CommandListState::Idle);
    assert!(!list.is_executing());

    let events = recorder.events();
    let cycle: Vec<_> = events.iter().filter(|e| ["begin", "end", "submit", "wait"].contains(&e.as_str())).collect();
    assert_eq!(cycle, vec!["begin", "end", "submit", "wait"]);
}

#[test]
fn test_begin_after_submit_waits_first() {
    let (_device, recorder, mut list) = recording_list();
    list.end();
    list.submit();

    list.begin();

    assert_eq!(list.state(), CommandListState::Recording);
    assert_eq!(recorder.count("wait"), 1);
}

#[test]
#[should_panic(expected = "begin() called while Recording")]
fn test_begin_twice_is_fatal() {
    let (_device, _recorder, mut list) = recording_list();
    list.begin();
}

#[test]
#[should_panic(expected = "begin() called while Ended")]
fn test_begin_after_end_is_fatal() {
    let (_device, _recorder, mut list) = recording_list();
    list.end();
    list.begin();
}

#[test]
#[should_panic(expected = "submit() called while Recording")]
fn test_submit_before_end_is_fatal() {
    let (_device, _recorder, mut list) = recording_list();
    list.submit();
}

#[test]
#[should_panic(expected = "draw() called while Idle")]
fn test_draw_outside_recording_is_fatal() {
    let (device, _) = mock_device();
    let mut list = device.create_command_list(QueueType::Graphics, "main");
    list.draw(3, 0);
}

#[test]
#[should_panic(expected = "set_viewport() called while Ended")]
fn test_setter_after_end_is_fatal() {
    let (_device, _recorder, mut list) = recording_list();
    list.end();
    list.set_viewport(&Viewport::new(0.0, 0.0, 1.0, 1.0));
}

#[test]
fn test_drop_waits_and_releases_pool() {
    let (device, recorder) = mock_device();
    let list = device.create_command_list(QueueType::Compute, "async");
    recorder.clear();

    drop(list);

    assert_eq!(recorder.count("queue_wait_all"), 1);
    assert_eq!(device.deletion_queue().count(ResourceType::CommandPool), 1);
}

// ============================================================================
// BUFFER BINDING
// ============================================================================

#[test]
fn test_redundant_vertex_buffer_bind_is_skipped() {
    let (device, recorder, mut list) = recording_list();
    let buffer = device.create_vertex_buffer("quad", &[[0.0f32; 4]; 4]);

    list.set_buffer_vertex(0, &buffer);
    list.set_buffer_vertex(0, &buffer);
    list.set_buffer_vertex(0, &buffer);

    assert_eq!(device.profiler().snapshot().bindings_buffer_vertex, 1);
    assert_eq!(recorder.count("bind_vertex_buffer"), 1);
}

#[test]
fn test_different_vertex_buffers_rebind() {
    let (device, _recorder, mut list) = recording_list();
    let a = device.create_vertex_buffer("a", &[[0.0f32; 4]; 4]);
    let b = device.create_vertex_buffer("b", &[[0.0f32; 4]; 4]);

    list.set_buffer_vertex(0, &a);
    list.set_buffer_vertex(0, &b);
    list.set_buffer_vertex(1, &b);

    assert_eq!(device.profiler().snapshot().bindings_buffer_vertex, 3);
}

#[test]
fn test_bind_cache_is_reset_by_begin() {
    let (device, _recorder, mut list) = recording_list();
    let buffer = device.create_index_buffer("indices", &[0u16, 1, 2]);

    list.set_buffer_index(&buffer);
    list.end();
    list.submit();
    list.begin();
    list.set_buffer_index(&buffer);

    assert_eq!(device.profiler().snapshot().bindings_buffer_index, 2);
}

// ============================================================================
// PIPELINE & DRAWS
// ============================================================================

#[test]
fn test_set_pipeline_state_sets_viewport() {
    let (_device, recorder, mut list) = recording_list();
    let target = color_target("hdr", 1280, 720);

    list.set_pipeline_state(&forward_state(&target));

    assert!(recorder.contains("set_viewport 1280x720"));
    assert_eq!(recorder.count("set_scissor"), 0);
}

#[test]
fn test_dynamic_scissor_is_reset_with_state() {
    let (_device, recorder, mut list) = recording_list();
    let target = color_target("hdr", 1280, 720);
    let mut state = forward_state(&target);
    state.dynamic_scissor = true;

    list.set_pipeline_state(&state);
    list.set_scissor_rectangle(&Rectangle::new(0.0, 0.0, 64.0, 64.0));

    assert!(recorder.contains("set_scissor 1280x720"));
    assert!(recorder.contains("set_scissor 64x64"));
}

#[test]
#[should_panic(expected = "was not created with a dynamic scissor")]
fn test_scissor_on_static_state_is_fatal() {
    let (_device, _recorder, mut list) = recording_list();
    let target = color_target("hdr", 1280, 720);
    list.set_pipeline_state(&forward_state(&target));
    list.set_scissor_rectangle(&Rectangle::new(0.0, 0.0, 64.0, 64.0));
}

#[test]
fn test_pipeline_is_bound_once_for_several_draws() {
    let (device, recorder, mut list) = recording_list();
    let target = color_target("hdr", 1280, 720);
    let state = forward_state(&target);

    list.set_pipeline_state(&state);
    list.set_pipeline_state(&state);
    list.begin_render_pass();
    list.draw(3, 0);
    list.draw(6, 3);
    list.end_render_pass();

    let counters = device.profiler().snapshot();
    assert_eq!(counters.draw, 2);
    assert_eq!(counters.bindings_pipeline, 1);
    assert_eq!(recorder.count("bind_pipeline"), 1);
    assert_eq!(recorder.count("create_pipeline"), 1);
}

#[test]
fn test_descriptors_flush_on_draw() {
    let (device, recorder, mut list) = recording_list();
    let target = color_target("hdr", 1280, 720);
    let albedo = mock_texture("albedo", 256, 256, Format::R8G8B8A8_Unorm, TextureFlags::SRV);
    let frame = device.create_constant_buffer("frame", &[0.0f32; 32]);

    list.set_pipeline_state(&forward_state(&target));
    list.set_constant_buffer(0, &frame);
    list.set_texture(1, &albedo, ALL_MIPS, false);
    list.begin_render_pass();
    list.draw(3, 0);
    list.draw(3, 0);
    list.end_render_pass();

    assert_eq!(recorder.count("bind_descriptors 2"), 1);
    assert_eq!(device.profiler().snapshot().bindings_descriptor_set, 1);
    assert_eq!(albedo.layout(0), ImageLayout::ShaderReadOnlyOptimal);
}

#[test]
fn test_indexed_draw() {
    let (device, recorder, mut list) = recording_list();
    let target = color_target("hdr", 1280, 720);
    let indices = device.create_index_buffer("indices", &[0u32, 1, 2]);

    list.set_pipeline_state(&forward_state(&target));
    list.begin_render_pass();
    list.set_buffer_index(&indices);
    list.draw_indexed(3, 0, 0);
    list.end_render_pass();

    assert!(recorder.contains("draw_indexed 3 1"));
}

#[test]
#[should_panic(expected = "without an index buffer")]
fn test_indexed_draw_without_index_buffer_is_fatal() {
    let (_device, _recorder, mut list) = recording_list();
    let target = color_target("hdr", 1280, 720);
    list.set_pipeline_state(&forward_state(&target));
    list.begin_render_pass();
    list.draw_indexed(3, 0, 0);
}

#[test]
#[should_panic(expected = "requires a pipeline state")]
fn test_draw_without_pipeline_is_fatal() {
    let (_device, _recorder, mut list) = recording_list();
    list.draw(3, 0);
}

#[test]
#[should_panic(expected = "outside a render pass")]
fn test_draw_outside_render_pass_is_fatal() {
    let (_device, _recorder, mut list) = recording_list();
    let target = color_target("hdr", 1280, 720);
    list.set_pipeline_state(&forward_state(&target));
    list.draw(3, 0);
}

#[test]
fn test_dispatch_with_push_constants() {
    let (device, recorder, mut list) = recording_list();

    list.set_pipeline_state(&compute_state());
    list.push_constants_typed(&[1.0f32, 0.0, 0.5, 0.25]);
    list.dispatch(8, 8, 1);

    assert!(recorder.contains("push_constants 4 0 16"));
    assert!(recorder.contains("dispatch 8 8 1"));
    assert_eq!(device.profiler().snapshot().dispatch, 1);
}

#[test]
#[should_panic(expected = "dispatch() with a graphics pipeline")]
fn test_dispatch_with_graphics_pipeline_is_fatal() {
    let (_device, _recorder, mut list) = recording_list();
    let target = color_target("hdr", 1280, 720);
    list.set_pipeline_state(&forward_state(&target));
    list.dispatch(1, 1, 1);
}

#[test]
#[should_panic(expected = "is not valid")]
fn test_invalid_state_is_fatal() {
    let (_device, _recorder, mut list) = recording_list();
    list.set_pipeline_state(&PipelineState::default());
}

// ============================================================================
// RENDER PASSES
// ============================================================================

#[test]
fn test_render_pass_transitions_targets() {
    let (_device, recorder, mut list) = recording_list();
    let target = color_target("hdr", 1280, 720);
    let depth = mock_texture("depth", 1280, 720, Format::D32_Float, TextureFlags::DSV);
    let mut state = forward_state(&target);
    state.render_target_depth_texture = Some(depth.clone());

    list.set_pipeline_state(&state);
    list.begin_render_pass();

    assert!(list.is_rendering());
    assert!(recorder.contains("begin_rendering 1280x720 colors=1 depth=true"));
    assert_eq!(target.layout(0), ImageLayout::ColorAttachmentOptimal);
    assert_eq!(depth.layout(0), ImageLayout::DepthAttachmentOptimal);
}

#[test]
fn test_render_pass_to_swap_chain() {
    let (_device, recorder, mut list) = recording_list();
    let swap_chain = Arc::new(MockSwapChain::new(800, 600));
    let state = PipelineState {
        name: "present".to_string(),
        shader_vertex: Some(mock_vertex_shader()),
        render_target_swapchain: Some(swap_chain.clone()),
        ..Default::default()
    };

    list.set_pipeline_state(&state);
    list.begin_render_pass();

    assert!(recorder.contains("begin_rendering 800x600 colors=1 depth=false"));
    assert_eq!(swap_chain.layout(), ImageLayout::ColorAttachmentOptimal);
}

#[test]
fn test_new_state_ends_active_render_pass() {
    let (_device, recorder, mut list) = recording_list();
    let a = color_target("a", 640, 480);
    let b = color_target("b", 640, 480);

    list.set_pipeline_state(&forward_state(&a));
    list.begin_render_pass();
    list.set_pipeline_state(&forward_state(&b));

    assert!(!list.is_rendering());
    assert_eq!(recorder.count("end_rendering"), 1);
}

#[test]
#[should_panic(expected = "end() called with an active render pass")]
fn test_end_with_active_render_pass_is_fatal() {
    let (_device, _recorder, mut list) = recording_list();
    let target = color_target("hdr", 1280, 720);
    list.set_pipeline_state(&forward_state(&target));
    list.begin_render_pass();
    list.end();
}

#[test]
#[should_panic(expected = "needs a layout transition inside a render pass")]
fn test_texture_transition_inside_render_pass_is_fatal() {
    let (_device, _recorder, mut list) = recording_list();
    let target = color_target("hdr", 1280, 720);
    let albedo = mock_texture("albedo", 256, 256, Format::R8G8B8A8_Unorm, TextureFlags::SRV);

    list.set_pipeline_state(&forward_state(&target));
    list.begin_render_pass();
    list.set_texture(1, &albedo, ALL_MIPS, false);
}

#[test]
fn test_clear_render_target() {
    let (_device, recorder, mut list) = recording_list();
    let target = color_target("hdr", 64, 64);

    list.clear_render_target(&target, ClearValue::Color([1.0, 0.0, 0.0, 1.0]));

    assert_eq!(target.layout(0), ImageLayout::TransferDstOptimal);
    assert!(recorder.contains(&format!("clear_image {}", target.rhi_image())));
}

#[test]
#[should_panic(expected = "does not match the format")]
fn test_depth_clear_on_color_target_is_fatal() {
    let (_device, _recorder, mut list) = recording_list();
    let target = color_target("hdr", 64, 64);
    list.clear_render_target(&target, ClearValue::DepthStencil { depth: 0.0, stencil: 0 });
}

// ============================================================================
// BLIT & COPY
// ============================================================================

#[test]
fn test_blit_smaller_source_to_swap_chain() {
    let (_device, recorder, mut list) = recording_list();
    let source = color_target("scene", 640, 360);
    let swap_chain = MockSwapChain::new(1280, 720);

    list.blit_to_swap_chain(&source, &swap_chain);

    assert_eq!(recorder.count("blit"), 1);
    assert_eq!(source.layout(0), ImageLayout::TransferSrcOptimal);
    assert_eq!(swap_chain.layout(), ImageLayout::PresentSrc);
}

#[test]
fn test_blit_equal_size_to_swap_chain() {
    let (_device, recorder, mut list) = recording_list();
    let source = color_target("scene", 1280, 720);
    let swap_chain = MockSwapChain::new(1280, 720);

    list.blit_to_swap_chain(&source, &swap_chain);
    assert_eq!(recorder.count("blit"), 1);
}

#[test]
#[should_panic(expected = "is larger than the swap chain")]
fn test_blit_larger_source_is_fatal() {
    let (_device, _recorder, mut list) = recording_list();
    let source = color_target("scene", 1920, 1080);
    let swap_chain = MockSwapChain::new(1280, 720);
    list.blit_to_swap_chain(&source, &swap_chain);
}

#[test]
#[should_panic(expected = "must be created with CLEAR_BLIT")]
fn test_blit_without_clear_blit_flag_is_fatal() {
    let (_device, _recorder, mut list) = recording_list();
    let source = mock_texture("scene", 640, 360, Format::R8G8B8A8_Unorm, TextureFlags::RTV);
    let swap_chain = MockSwapChain::new(1280, 720);
    list.blit_to_swap_chain(&source, &swap_chain);
}

#[test]
#[should_panic(expected = "does not match the swap chain")]
fn test_copy_needs_equal_dimensions() {
    let (_device, _recorder, mut list) = recording_list();
    let source = color_target("scene", 640, 360);
    let swap_chain = MockSwapChain::new(1280, 720);
    list.copy_to_swap_chain(&source, &swap_chain);
}

#[test]
fn test_copy_to_swap_chain() {
    let (_device, recorder, mut list) = recording_list();
    let source = color_target("scene", 1280, 720);
    let swap_chain = MockSwapChain::new(1280, 720);

    list.copy_to_swap_chain(&source, &swap_chain);

    assert_eq!(recorder.count("copy"), 1);
    assert_eq!(swap_chain.layout(), ImageLayout::PresentSrc);
}

#[test]
fn test_blit_all_mips() {
    let (device, recorder, mut list) = recording_list();
    let desc = |name: &str| TextureDesc {
        name: name.to_string(),
        width: 256,
        height: 256,
        array_length: 1,
        mip_count: 4,
        format: Format::R8G8B8A8_Unorm,
        flags: TextureFlags::SRV | TextureFlags::CLEAR_BLIT,
    };
    let source = device.create_texture(desc("source"));
    let destination = device.create_texture(desc("destination"));

    list.blit(&source, &destination, true);

    assert_eq!(recorder.count("blit"), 4);
    assert_eq!(destination.layout_of_range(0, 4), Some(ImageLayout::TransferDstOptimal));
}

// ============================================================================
// BARRIERS
// ============================================================================

#[test]
fn test_texture_barrier_tracks_layout() {
    let (device, recorder, mut list) = recording_list();
    let texture = color_target("hdr", 64, 64);

    list.insert_memory_barrier_texture(&texture, 0, 1, ImageLayout::ShaderReadOnlyOptimal);
    list.insert_memory_barrier_texture(&texture, 0, 1, ImageLayout::ColorAttachmentOptimal);

    let image = texture.rhi_image();
    assert!(recorder.contains(&format!("barrier {} mips 0+1 Undefined->ShaderReadOnlyOptimal", image)));
    assert!(recorder.contains(&format!("barrier {} mips 0+1 ShaderReadOnlyOptimal->ColorAttachmentOptimal", image)));
    assert_eq!(texture.layout(0), ImageLayout::ColorAttachmentOptimal);
    assert_eq!(device.profiler().snapshot().barriers, 2);
}

#[test]
fn test_wait_for_write_keeps_layout() {
    let (_device, recorder, mut list) = recording_list();
    let texture = mock_texture("output", 64, 64, Format::R16G16B16A16_Float, TextureFlags::UAV);

    list.insert_memory_barrier_texture(&texture, 0, 1, ImageLayout::General);
    list.insert_memory_barrier_image_wait_for_write(&texture);

    assert!(recorder.contains(&format!("barrier {} mips 0+1 General->General", texture.rhi_image())));
}

#[test]
fn test_raw_barrier() {
    let (_device, recorder, mut list) = recording_list();
    list.insert_memory_barrier_image(
        42, ImageAspect::COLOR, 0, 1, 1, ImageLayout::Undefined, ImageLayout::TransferDstOptimal,
    );
    assert!(recorder.contains("barrier 42 mips 0+1 Undefined->TransferDstOptimal"));
}

#[test]
fn test_texture_barrier_all_mips_covers_every_mip() {
    let (device, recorder, mut list) = recording_list();
    let texture = device.create_texture(TextureDesc {
        name: "bloom_chain".to_string(),
        width: 128,
        height: 128,
        array_length: 1,
        mip_count: 5,
        format: Format::R16G16B16A16_Float,
        flags: TextureFlags::SRV | TextureFlags::UAV,
    });

    list.insert_memory_barrier_texture(&texture, 0, ALL_MIPS, ImageLayout::General);

    assert!(recorder.contains(&format!("barrier {} mips 0+5 Undefined->General", texture.rhi_image())));
    assert_eq!(texture.layout_of_range(0, 5), Some(ImageLayout::General));
}

#[test]
#[should_panic(expected = "out of bounds")]
fn test_texture_barrier_past_last_mip_is_fatal() {
    let (_device, _recorder, mut list) = recording_list();
    let texture = color_target("single_mip", 64, 64);

    list.insert_memory_barrier_texture(&texture, 0, 2, ImageLayout::General);
}

#[test]
#[should_panic(expected = "out of bounds")]
fn test_texture_barrier_with_overflowing_range_is_fatal() {
    let (_device, _recorder, mut list) = recording_list();
    let texture = color_target("single_mip", 64, 64);

    list.insert_memory_barrier_texture(&texture, 1, u32::MAX - 1, ImageLayout::General);
}

// ============================================================================
// MARKERS & TIMING
// ============================================================================

#[test]
fn test_timestamps_are_read_after_execution() {
    let (_device, _recorder, mut list) = recording_list();
    let first = list.begin_timestamp();
    list.end_timestamp(first);
    let second = list.begin_timestamp();
    list.end_timestamp(second);
    list.end();
    list.submit();
    list.wait_for_execution();

    assert_eq!((first, second), (0, 2));
    assert!((list.timestamp_duration(first) - 1.0).abs() < 1e-6);
    assert!((list.timestamp_duration(second) - 1.0).abs() < 1e-6);
}

#[test]
#[should_panic(expected = "more than 512 timestamps")]
fn test_timestamp_overflow_is_fatal() {
    let (_device, _recorder, mut list) = recording_list();
    for _ in 0..=MAX_TIMESTAMPS / 2 {
        let index = list.begin_timestamp();
        list.end_timestamp(index);
    }
}

#[test]
fn test_timeblock_with_marker_and_timing() {
    let (_device, recorder, mut list) = recording_list();

    list.begin_timeblock("shadows", true, true);
    let index = list.end_timeblock();

    assert_eq!(index, Some(0));
    assert_eq!(
        recorder.events().iter().rev().take(4).rev().cloned().collect::<Vec<_>>(),
        vec!["begin_marker shadows", "timestamp 0", "timestamp 1", "end_marker"]
    );
}

#[test]
#[should_panic(expected = "timeblock 'inner' started inside 'outer'")]
fn test_nested_timeblock_is_fatal() {
    let (_device, _recorder, mut list) = recording_list();
    list.begin_timeblock("outer", false, false);
    list.begin_timeblock("inner", false, false);
}

// ============================================================================
// BACKEND DEFAULTS
// ============================================================================

/// Encoder implementing only the required methods
struct BareEncoder;

impl CommandEncoder for BareEncoder {
    fn begin(&mut self) -> Result<()> { Ok(()) }
    fn end(&mut self) -> Result<()> { Ok(()) }
    fn submit(&mut self) -> Result<()> { Ok(()) }
    fn wait(&mut self) -> Result<()> { Ok(()) }
    fn is_executing(&self) -> bool { false }
    fn bind_pipeline(&mut self, _: RhiHandle, _: RhiHandle, _: bool) {}
    fn bind_descriptors(&mut self, _: RhiHandle, _: RhiHandle, _: bool, _: &[DescriptorWrite]) -> Result<()> { Ok(()) }
    fn set_viewport(&mut self, _: &Viewport) {}
    fn set_scissor(&mut self, _: &Rectangle) {}
    fn bind_vertex_buffer(&mut self, _: u32, _: RhiHandle) {}
    fn bind_index_buffer(&mut self, _: RhiHandle, _: bool) {}
    fn draw(&mut self, _: u32, _: u32, _: u32, _: u32) {}
    fn draw_indexed(&mut self, _: u32, _: u32, _: u32, _: i32, _: u32) {}
    fn begin_rendering(&mut self, _: &RenderingInfo) -> Result<()> { Ok(()) }
    fn end_rendering(&mut self) {}
    fn image_barrier(&mut self, _: &ImageBarrier) {}
}

#[test]
#[should_panic(expected = "begin_marker is not implemented")]
fn test_optional_encoder_methods_default_to_fatal() {
    BareEncoder.begin_marker("frame");
}

#[test]
#[should_panic(expected = "dispatch is not implemented")]
fn test_default_dispatch_is_fatal() {
    BareEncoder.dispatch(1, 1, 1);
}
