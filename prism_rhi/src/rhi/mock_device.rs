/// Mock backend for unit tests
///
/// `MockBackend` and `MockEncoder` hand out fake handles and record every
/// call as a string into a shared `MockRecorder`, so tests can assert on
/// what reached the backend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use crate::error::{Error, Result};
use crate::rhi::backend::{
    ClearValue, CommandEncoder, DescriptorWrite, DeviceBackend, DeviceLimits, ImageBarrier,
    ImageRegion, RenderingInfo, SamplerLayoutKind,
};
use crate::rhi::buffer::BufferDesc;
use crate::rhi::definitions::{
    generate_object_id, ApiType, DescriptorType, Format, ImageAspect, ImageLayout, ObjectId,
    PhysicalDeviceType, QueueType, ResourceType, RhiHandle, ShaderStage,
};
use crate::rhi::device::Device;
use crate::rhi::pipeline::{NativePipeline, PipelineDesc};
use crate::rhi::sampler::SamplerDesc;
use crate::rhi::shader::{Descriptor, InputLayout, Shader, ShaderDesc, ShaderReflection};
use crate::rhi::state::{Rectangle, Viewport};
use crate::rhi::swap_chain::SwapChain;
use crate::rhi::texture::{Texture, TextureDesc, TextureFlags, TextureHandles};

pub const COMPARISON_SAMPLER_LAYOUT: RhiHandle = 1;
pub const REGULAR_SAMPLER_LAYOUT: RhiHandle = 2;
pub const MAX_PUSH_CONSTANT_SIZE: u32 = 128;
/// One tick per microsecond: a timestamp pair 1000 ticks apart lasts 1 ms
pub const TIMESTAMP_PERIOD_NS: f32 = 1000.0;
pub const TIMESTAMP_TICKS_PER_PAIR: u64 = 1000;

/// Shared event log
#[derive(Debug, Clone, Default)]
pub struct MockRecorder {
    events: Arc<Mutex<Vec<String>>>,
    pipeline_descs: Arc<Mutex<Vec<PipelineDesc>>>,
}

impl MockRecorder {
    pub fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Number of events starting with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.events.lock().unwrap().iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn contains(&self, event: &str) -> bool {
        self.events.lock().unwrap().iter().any(|e| e == event)
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    /// Every description `create_pipeline` received
    pub fn pipeline_descs(&self) -> Vec<PipelineDesc> {
        self.pipeline_descs.lock().unwrap().clone()
    }
}

/// Backend handing out increasing fake handles
pub struct MockBackend {
    recorder: MockRecorder,
    next_handle: AtomicU64,
    pub fail_naming: bool,
    pub fail_pipelines: bool,
}

impl MockBackend {
    pub fn new(recorder: MockRecorder) -> Self {
        Self {
            recorder,
            next_handle: AtomicU64::new(100),
            fail_naming: false,
            fail_pipelines: false,
        }
    }

    fn handle(&self) -> RhiHandle {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }
}

impl DeviceBackend for MockBackend {
    fn api_type(&self) -> ApiType {
        ApiType::Vulkan
    }

    fn limits(&self) -> DeviceLimits {
        DeviceLimits {
            max_push_constant_size: MAX_PUSH_CONSTANT_SIZE,
            max_texture_dimension_2d: 16384,
            timestamp_period_ns: TIMESTAMP_PERIOD_NS,
            min_uniform_buffer_offset_alignment: 256,
            device_name: "Mock GPU".to_string(),
            device_type: PhysicalDeviceType::Cpu,
        }
    }

    fn sampler_set_layout(&self, kind: SamplerLayoutKind) -> RhiHandle {
        match kind {
            SamplerLayoutKind::Comparison => COMPARISON_SAMPLER_LAYOUT,
            SamplerLayoutKind::Regular => REGULAR_SAMPLER_LAYOUT,
        }
    }

    fn create_descriptor_set_layout(&self, name: &str, descriptors: &[Descriptor]) -> Result<RhiHandle> {
        self.recorder.push(format!("create_descriptor_set_layout {} {}", name, descriptors.len()));
        Ok(self.handle())
    }

    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<NativePipeline> {
        if self.fail_pipelines {
            return Err(Error::BackendError("VK_ERROR_UNKNOWN".to_string()));
        }
        self.recorder.push(format!("create_pipeline {}", desc.name));
        self.recorder.pipeline_descs.lock().unwrap().push(desc.clone());
        Ok(NativePipeline { layout: self.handle(), pipeline: self.handle() })
    }

    fn create_shader(&self, desc: &ShaderDesc) -> Result<(RhiHandle, ShaderReflection)> {
        self.recorder.push(format!("create_shader {}", desc.name));
        Ok((self.handle(), ShaderReflection::default()))
    }

    fn create_texture(&self, desc: &TextureDesc) -> Result<TextureHandles> {
        self.recorder.push(format!("create_texture {}", desc.name));
        Ok(TextureHandles {
            image: self.handle(),
            srv: self.handle(),
            srv_mips: Vec::new(),
            rtv: (0..desc.array_length).map(|_| self.handle()).collect(),
        })
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<(RhiHandle, u64)> {
        self.recorder.push(format!("create_buffer {} {}", desc.name, desc.size()));
        Ok((self.handle(), desc.size().next_multiple_of(16)))
    }

    fn update_buffer(&self, buffer: RhiHandle, offset: u64, data: &[u8]) -> Result<()> {
        self.recorder.push(format!("update_buffer {} {} {}", buffer, offset, data.len()));
        Ok(())
    }

    fn create_sampler(&self, _desc: &SamplerDesc) -> Result<RhiHandle> {
        self.recorder.push("create_sampler".to_string());
        Ok(self.handle())
    }

    fn create_command_pool(&self, queue: QueueType) -> Result<RhiHandle> {
        self.recorder.push(format!("create_command_pool {:?}", queue));
        Ok(self.handle())
    }

    fn create_command_encoder(&self, _queue: QueueType, _pool: RhiHandle, name: &str) -> Result<Box<dyn CommandEncoder>> {
        self.recorder.push(format!("create_command_encoder {}", name));
        Ok(Box::new(MockEncoder::new(self.recorder.clone())))
    }

    fn queue_wait_all(&self) -> Result<()> {
        self.recorder.push("queue_wait_all".to_string());
        Ok(())
    }

    fn destroy(&self, resource_type: ResourceType, handle: RhiHandle) {
        self.recorder.push(format!("destroy {:?} {}", resource_type, handle));
    }

    fn set_name(&self, resource_type: ResourceType, _handle: RhiHandle, name: &str) -> Result<()> {
        if self.fail_naming {
            return Err(Error::BackendError("VK_ERROR_OUT_OF_HOST_MEMORY".to_string()));
        }
        self.recorder.push(format!("set_name {:?} {}", resource_type, name));
        Ok(())
    }
}

/// Encoder recording every command
pub struct MockEncoder {
    recorder: MockRecorder,
    executing: bool,
}

impl MockEncoder {
    pub fn new(recorder: MockRecorder) -> Self {
        Self { recorder, executing: false }
    }
}

impl CommandEncoder for MockEncoder {
    fn begin(&mut self) -> Result<()> {
        self.recorder.push("begin".to_string());
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.recorder.push("end".to_string());
        Ok(())
    }

    fn submit(&mut self) -> Result<()> {
        self.recorder.push("submit".to_string());
        self.executing = true;
        Ok(())
    }

    fn wait(&mut self) -> Result<()> {
        self.recorder.push("wait".to_string());
        self.executing = false;
        Ok(())
    }

    fn is_executing(&self) -> bool {
        self.executing
    }

    fn bind_pipeline(&mut self, pipeline: RhiHandle, _layout: RhiHandle, is_compute: bool) {
        self.recorder.push(format!("bind_pipeline {} compute={}", pipeline, is_compute));
    }

    fn bind_descriptors(&mut self, _layout: RhiHandle, _set_layout: RhiHandle, _is_compute: bool, writes: &[DescriptorWrite]) -> Result<()> {
        self.recorder.push(format!("bind_descriptors {}", writes.len()));
        Ok(())
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        self.recorder.push(format!("set_viewport {}x{}", viewport.width, viewport.height));
    }

    fn set_scissor(&mut self, rectangle: &Rectangle) {
        self.recorder.push(format!("set_scissor {}x{}", rectangle.width(), rectangle.height()));
    }

    fn bind_vertex_buffer(&mut self, binding: u32, buffer: RhiHandle) {
        self.recorder.push(format!("bind_vertex_buffer {} {}", binding, buffer));
    }

    fn bind_index_buffer(&mut self, buffer: RhiHandle, is_16bit: bool) {
        self.recorder.push(format!("bind_index_buffer {} 16bit={}", buffer, is_16bit));
    }

    fn push_constants(&mut self, _layout: RhiHandle, stages: ShaderStage, offset: u32, data: &[u8]) {
        self.recorder.push(format!("push_constants {} {} {}", stages.bits(), offset, data.len()));
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32, _vertex_offset: u32, _instance_offset: u32) {
        self.recorder.push(format!("draw {} {}", vertex_count, instance_count));
    }

    fn draw_indexed(&mut self, index_count: u32, instance_count: u32, _index_offset: u32, _vertex_offset: i32, _instance_offset: u32) {
        self.recorder.push(format!("draw_indexed {} {}", index_count, instance_count));
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.recorder.push(format!("dispatch {} {} {}", x, y, z));
    }

    fn begin_rendering(&mut self, info: &RenderingInfo) -> Result<()> {
        self.recorder.push(format!(
            "begin_rendering {}x{} colors={} depth={}",
            info.width, info.height, info.color.len(), info.depth.is_some()
        ));
        Ok(())
    }

    fn end_rendering(&mut self) {
        self.recorder.push("end_rendering".to_string());
    }

    fn image_barrier(&mut self, barrier: &ImageBarrier) {
        self.recorder.push(format!(
            "barrier {} mips {}+{} {:?}->{:?}",
            barrier.image, barrier.mip_index, barrier.mip_range, barrier.layout_old, barrier.layout_new
        ));
    }

    fn clear_image(&mut self, image: RhiHandle, _aspect: ImageAspect, _mip_count: u32, _value: ClearValue) {
        self.recorder.push(format!("clear_image {}", image));
    }

    fn blit(&mut self, source: &ImageRegion, destination: &ImageRegion) {
        self.recorder.push(format!("blit {}->{} mip {}", source.image, destination.image, source.mip));
    }

    fn copy(&mut self, source: &ImageRegion, destination: &ImageRegion) {
        self.recorder.push(format!("copy {}->{} mip {}", source.image, destination.image, source.mip));
    }

    fn write_timestamp(&mut self, index: u32) {
        self.recorder.push(format!("timestamp {}", index));
    }

    fn read_timestamps(&mut self, out: &mut [u64]) -> Result<()> {
        for (index, value) in out.iter_mut().enumerate() {
            *value = (index as u64 / 2) * 10_000 + (index as u64 % 2) * TIMESTAMP_TICKS_PER_PAIR;
        }
        Ok(())
    }

    fn begin_marker(&mut self, name: &str) {
        self.recorder.push(format!("begin_marker {}", name));
    }

    fn end_marker(&mut self) {
        self.recorder.push("end_marker".to_string());
    }
}

/// Swap chain with a fixed backbuffer
pub struct MockSwapChain {
    id: ObjectId,
    width: u32,
    height: u32,
    format: Format,
    image: RhiHandle,
    layout: Mutex<ImageLayout>,
}

impl MockSwapChain {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            id: generate_object_id(),
            width,
            height,
            format: Format::B8R8G8A8_Unorm,
            image: 9000,
            layout: Mutex::new(ImageLayout::Undefined),
        }
    }
}

impl SwapChain for MockSwapChain {
    fn object_id(&self) -> ObjectId {
        self.id
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> Format {
        self.format
    }

    fn rhi_image(&self) -> RhiHandle {
        self.image
    }

    fn rhi_rtv(&self) -> RhiHandle {
        self.image + 1
    }

    fn layout(&self) -> ImageLayout {
        *self.layout.lock().unwrap()
    }

    fn set_layout(&self, layout: ImageLayout) {
        *self.layout.lock().unwrap() = layout;
    }
}

// ===== FIXTURES =====

/// Device over a fresh mock backend
pub fn mock_device() -> (Device, MockRecorder) {
    let recorder = MockRecorder::default();
    let device = Device::new(Box::new(MockBackend::new(recorder.clone())));
    (device, recorder)
}

/// Shader with hand-written reflection and no deletion queue
pub fn mock_shader(name: &str, stage: ShaderStage, inputs: &[(&str, u32, Format)], descriptors: Vec<Descriptor>) -> Arc<Shader> {
    let reflection = ShaderReflection {
        input_layout: InputLayout::packed(inputs),
        descriptors,
    };
    Arc::new(Shader::new(name, stage, "main", generate_object_id(), reflection, None))
}

/// Vertex shader reading position, normal and uv
pub fn mock_vertex_shader() -> Arc<Shader> {
    mock_shader(
        "mesh.vs",
        ShaderStage::VERTEX,
        &[
            ("position", 0, Format::R32G32B32_Float),
            ("normal", 1, Format::R32G32B32_Float),
            ("uv", 2, Format::R32G32_Float),
        ],
        vec![Descriptor::new("frame", DescriptorType::ConstantBuffer, 0, ShaderStage::VERTEX, 128)],
    )
}

/// Pixel shader sampling one texture
pub fn mock_pixel_shader() -> Arc<Shader> {
    mock_shader(
        "mesh.ps",
        ShaderStage::PIXEL,
        &[],
        vec![
            Descriptor::new("frame", DescriptorType::ConstantBuffer, 0, ShaderStage::PIXEL, 128),
            Descriptor::new("albedo", DescriptorType::Texture, 1, ShaderStage::PIXEL, 0),
        ],
    )
}

pub fn mock_compute_shader() -> Arc<Shader> {
    mock_shader(
        "blur.cs",
        ShaderStage::COMPUTE,
        &[],
        vec![
            Descriptor::new("output", DescriptorType::TextureStorage, 0, ShaderStage::COMPUTE, 0),
            Descriptor::new("params", DescriptorType::PushConstantBuffer, 0, ShaderStage::COMPUTE, 16),
        ],
    )
}

/// Texture with fake handles and no deletion queue
pub fn mock_texture(name: &str, width: u32, height: u32, format: Format, flags: TextureFlags) -> Arc<Texture> {
    let image = generate_object_id() * 10;
    Arc::new(Texture::new(
        TextureDesc::render_target(name, width, height, format, flags),
        TextureHandles {
            image,
            srv: image + 1,
            srv_mips: Vec::new(),
            rtv: vec![image + 2],
        },
        None,
    ))
}
