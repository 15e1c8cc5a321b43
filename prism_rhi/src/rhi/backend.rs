/// Backend seams
///
/// A backend implements `DeviceBackend` once per native device and hands
/// out one `CommandEncoder` per command list. The core never sees native
/// types: every object crosses the seam as an `RhiHandle`.

use crate::error::Result;
use crate::rhi::buffer::BufferDesc;
use crate::rhi::definitions::{
    ApiType, Format, ImageAspect, ImageLayout, PhysicalDeviceType, QueueType, ResourceType,
    RhiHandle, ShaderStage, LOG_SOURCE,
};
use crate::rhi::pipeline::{NativePipeline, PipelineDesc};
use crate::rhi::pipeline_state::LoadOp;
use crate::rhi::sampler::SamplerDesc;
use crate::rhi::shader::{Descriptor, ShaderDesc, ShaderReflection};
use crate::rhi::state::{Rectangle, Viewport};
use crate::rhi::texture::{TextureDesc, TextureHandles};

/// Device limits and identity queried once at device creation
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceLimits {
    pub max_push_constant_size: u32,
    pub max_texture_dimension_2d: u32,
    /// Nanoseconds per timestamp tick
    pub timestamp_period_ns: f32,
    pub min_uniform_buffer_offset_alignment: u64,
    pub device_name: String,
    pub device_type: PhysicalDeviceType,
}

/// The two fixed sampler set layouts every pipeline layout carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerLayoutKind {
    Comparison,
    Regular,
}

/// Resource written into a descriptor slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorResource {
    ConstantBuffer { buffer: RhiHandle, range: u64 },
    StructuredBuffer { buffer: RhiHandle, range: u64 },
    Texture { view: RhiHandle, layout: ImageLayout },
    TextureStorage { view: RhiHandle },
    Sampler { sampler: RhiHandle },
}

/// Pending write into descriptor set 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorWrite {
    pub slot: u32,
    pub resource: DescriptorResource,
}

/// Color attachment of a dynamic-rendering scope
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorAttachment {
    pub view: RhiHandle,
    pub image: RhiHandle,
    pub format: Format,
    pub load: LoadOp<[f32; 4]>,
}

/// Depth(-stencil) attachment of a dynamic-rendering scope
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthAttachment {
    pub view: RhiHandle,
    pub image: RhiHandle,
    pub format: Format,
    pub load_depth: LoadOp<f32>,
    pub load_stencil: LoadOp<u32>,
    pub read_only: bool,
}

/// Everything a backend needs to begin rendering
#[derive(Debug, Clone, PartialEq)]
pub struct RenderingInfo {
    pub width: u32,
    pub height: u32,
    pub color: Vec<ColorAttachment>,
    pub depth: Option<DepthAttachment>,
}

/// Image layout transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBarrier {
    pub image: RhiHandle,
    pub aspect: ImageAspect,
    pub mip_index: u32,
    pub mip_range: u32,
    pub array_length: u32,
    pub layout_old: ImageLayout,
    pub layout_new: ImageLayout,
}

/// Value written by an out-of-pass clear
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u32 },
}

/// One mip level of an image, source or destination of a blit or copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRegion {
    pub image: RhiHandle,
    pub aspect: ImageAspect,
    pub mip: u32,
    pub array_length: u32,
    pub width: u32,
    pub height: u32,
}

/// Native device operations the core relies on
///
/// Object creation returns `Result`; the device turns failures into fatal
/// diagnostics naming the operation.
pub trait DeviceBackend: Send + Sync {
    fn api_type(&self) -> ApiType;

    fn limits(&self) -> DeviceLimits;

    /// Handle of one of the two fixed sampler set layouts
    fn sampler_set_layout(&self, kind: SamplerLayoutKind) -> RhiHandle;

    fn create_descriptor_set_layout(&self, name: &str, descriptors: &[Descriptor]) -> Result<RhiHandle>;

    /// Translate a resolved description into a pipeline layout and pipeline
    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<NativePipeline>;

    /// Create a shader module and reflect its interface
    fn create_shader(&self, desc: &ShaderDesc) -> Result<(RhiHandle, ShaderReflection)>;

    fn create_texture(&self, desc: &TextureDesc) -> Result<TextureHandles>;

    /// Create a host-visible buffer, returns the handle and the allocated size
    fn create_buffer(&self, desc: &BufferDesc) -> Result<(RhiHandle, u64)>;

    fn update_buffer(&self, buffer: RhiHandle, offset: u64, data: &[u8]) -> Result<()>;

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<RhiHandle>;

    fn create_command_pool(&self, queue: QueueType) -> Result<RhiHandle>;

    /// Allocate a command buffer (plus fence and query pool) from a pool
    fn create_command_encoder(&self, queue: QueueType, pool: RhiHandle, name: &str) -> Result<Box<dyn CommandEncoder>>;

    /// Block until every queue of the device is idle
    fn queue_wait_all(&self) -> Result<()>;

    /// Destroy a backend object. Only called with handles drained from the
    /// deletion queue, after a full queue wait.
    fn destroy(&self, resource_type: ResourceType, handle: RhiHandle);

    /// Attach a debug name to a backend object
    fn set_name(&self, resource_type: ResourceType, handle: RhiHandle, name: &str) -> Result<()>;
}

/// Native command recording for one command list
///
/// The command list validates state before calling in; encoders translate
/// and record. Optional capabilities default to a fatal "not implemented".
pub trait CommandEncoder: Send {
    // ===== LIFECYCLE =====

    /// Reset the command buffer and start recording
    fn begin(&mut self) -> Result<()>;

    fn end(&mut self) -> Result<()>;

    /// Submit to the queue, signalling the encoder's fence on completion
    fn submit(&mut self) -> Result<()>;

    /// Block until the last submission has completed
    fn wait(&mut self) -> Result<()>;

    fn is_executing(&self) -> bool;

    // ===== BINDING =====

    /// Bind a pipeline (and the fixed sampler sets at indices 1 and 2)
    fn bind_pipeline(&mut self, pipeline: RhiHandle, layout: RhiHandle, is_compute: bool);

    /// Write and bind descriptor set 0
    fn bind_descriptors(
        &mut self,
        layout: RhiHandle,
        set_layout: RhiHandle,
        is_compute: bool,
        writes: &[DescriptorWrite],
    ) -> Result<()>;

    fn set_viewport(&mut self, viewport: &Viewport);

    fn set_scissor(&mut self, rectangle: &Rectangle);

    fn bind_vertex_buffer(&mut self, binding: u32, buffer: RhiHandle);

    fn bind_index_buffer(&mut self, buffer: RhiHandle, is_16bit: bool);

    fn push_constants(&mut self, _layout: RhiHandle, _stages: ShaderStage, _offset: u32, _data: &[u8]) {
        crate::rhi_not_implemented!(LOG_SOURCE, "push_constants");
    }

    // ===== DRAW & DISPATCH =====

    fn draw(&mut self, vertex_count: u32, instance_count: u32, vertex_offset: u32, instance_offset: u32);

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        index_offset: u32,
        vertex_offset: i32,
        instance_offset: u32,
    );

    fn dispatch(&mut self, _x: u32, _y: u32, _z: u32) {
        crate::rhi_not_implemented!(LOG_SOURCE, "dispatch");
    }

    // ===== RENDERING =====

    fn begin_rendering(&mut self, info: &RenderingInfo) -> Result<()>;

    fn end_rendering(&mut self);

    fn image_barrier(&mut self, barrier: &ImageBarrier);

    /// Clear an image outside a render pass (image is in TransferDstOptimal)
    fn clear_image(&mut self, _image: RhiHandle, _aspect: ImageAspect, _mip_count: u32, _value: ClearValue) {
        crate::rhi_not_implemented!(LOG_SOURCE, "clear_image");
    }

    /// Scaled copy (source in TransferSrcOptimal, destination in TransferDstOptimal)
    fn blit(&mut self, _source: &ImageRegion, _destination: &ImageRegion) {
        crate::rhi_not_implemented!(LOG_SOURCE, "blit");
    }

    /// Exact copy (same layouts as blit)
    fn copy(&mut self, _source: &ImageRegion, _destination: &ImageRegion) {
        crate::rhi_not_implemented!(LOG_SOURCE, "copy");
    }

    // ===== PROFILING =====

    fn write_timestamp(&mut self, _index: u32) {
        crate::rhi_not_implemented!(LOG_SOURCE, "write_timestamp");
    }

    /// Read back the first `out.len()` timestamps of the last execution
    fn read_timestamps(&mut self, _out: &mut [u64]) -> Result<()> {
        crate::rhi_not_implemented!(LOG_SOURCE, "read_timestamps");
    }

    fn begin_marker(&mut self, _name: &str) {
        crate::rhi_not_implemented!(LOG_SOURCE, "begin_marker");
    }

    fn end_marker(&mut self) {
        crate::rhi_not_implemented!(LOG_SOURCE, "end_marker");
    }
}
