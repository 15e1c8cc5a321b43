/// VulkanDevice - Vulkan implementation of the DeviceBackend trait
///
/// Owns instance and device creation, adapter selection and the two fixed
/// sampler sets every pipeline layout carries at indices 1 and 2. Object
/// creation is delegated to the resource, shader and pipeline modules.
///
/// `VulkanDevice` is a cheap clonable handle: keep one clone to create swap
/// chains and hand another to `prism::rhi::Device::new`.

use std::ffi::{c_char, CStr, CString};
use std::sync::Arc;
use ash::vk;
use ash::vk::Handle;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use prism_rhi::prism::rhi::{
    ApiType, BufferDesc, CommandEncoder, Descriptor, DeviceBackend, DeviceLimits, Filter,
    NativePipeline, PipelineDesc, QueueType, ResourceType, RhiHandle, SamplerAddressMode,
    SamplerDesc, SamplerLayoutKind, ShaderDesc, ShaderReflection, TextureDesc, TextureHandles,
};
use prism_rhi::prism::{Error, Result};
use prism_rhi::rhi_err;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::vulkan_command_list::VulkanCommandEncoder;
use crate::vulkan_config::DeviceConfig;
use crate::vulkan_context::{GpuContext, LOG_SOURCE};
use crate::vulkan_conversions::{device_type_from_vk, object_type_to_vk};
use crate::vulkan_swapchain::VulkanSwapChain;
use crate::{vulkan_pipeline, vulkan_resources, vulkan_shader};

/// Samplers of the regular sampler set, one binding each, in binding order
pub(crate) const REGULAR_SAMPLERS: [(&str, Filter, Filter, SamplerAddressMode, f32); 8] = [
    ("point_clamp", Filter::Nearest, Filter::Nearest, SamplerAddressMode::Clamp, 0.0),
    ("point_wrap", Filter::Nearest, Filter::Nearest, SamplerAddressMode::Wrap, 0.0),
    ("bilinear_clamp", Filter::Linear, Filter::Nearest, SamplerAddressMode::Clamp, 0.0),
    ("bilinear_wrap", Filter::Linear, Filter::Nearest, SamplerAddressMode::Wrap, 0.0),
    ("trilinear_clamp", Filter::Linear, Filter::Linear, SamplerAddressMode::Clamp, 0.0),
    ("trilinear_wrap", Filter::Linear, Filter::Linear, SamplerAddressMode::Wrap, 0.0),
    ("anisotropic_clamp", Filter::Linear, Filter::Linear, SamplerAddressMode::Clamp, 16.0),
    ("anisotropic_wrap", Filter::Linear, Filter::Linear, SamplerAddressMode::Wrap, 16.0),
];

/// Fixed sampler sets and the objects behind them
struct SamplerSets {
    layouts: [vk::DescriptorSetLayout; 2],
    sets: [vk::DescriptorSet; 2],
    pool: vk::DescriptorPool,
    samplers: Vec<vk::Sampler>,
}

/// State shared by every clone of a `VulkanDevice`
struct DeviceShared {
    ctx: Arc<GpuContext>,
    config: DeviceConfig,
    limits: DeviceLimits,
    samplers: SamplerSets,
    /// Instance has the surface extensions of a window system
    presentable: bool,
}

impl Drop for DeviceShared {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();
            self.ctx.device.destroy_descriptor_pool(self.samplers.pool, None);
            for layout in self.samplers.layouts {
                self.ctx.device.destroy_descriptor_set_layout(layout, None);
            }
            for sampler in self.samplers.samplers.drain(..) {
                self.ctx.device.destroy_sampler(sampler, None);
            }
        }

        #[cfg(feature = "vulkan-validation")]
        {
            if self.config.validation_active() {
                crate::vulkan_debug::cleanup_debug_config();
            }
        }

        prism_rhi::rhi_info!(LOG_SOURCE, "Vulkan device '{}' released", self.limits.device_name);
    }
}

/// Vulkan device backend
#[derive(Clone)]
pub struct VulkanDevice {
    shared: Arc<DeviceShared>,
}

/// Adapter chosen for the device
struct Adapter {
    physical_device: vk::PhysicalDevice,
    properties: vk::PhysicalDeviceProperties,
    features: vk::PhysicalDeviceFeatures,
    graphics_queue_family: u32,
    /// VK_EXT_depth_clip_enable and its feature are available
    depth_clip_enable: bool,
}

impl VulkanDevice {
    /// Create a device able to present to the window system of `window`
    ///
    /// # Arguments
    ///
    /// * `window` - Any window of the target display (surfaces are created later)
    /// * `config` - Device configuration
    pub fn new(window: &impl HasDisplayHandle, config: DeviceConfig) -> Result<Self> {
        let display_handle = window.display_handle().map_err(|e| {
            prism_rhi::rhi_error!(LOG_SOURCE, "Failed to get display handle: {}", e);
            Error::InitializationFailed(format!("Failed to get display handle: {}", e))
        })?;
        let surface_extensions = ash_window::enumerate_required_extensions(display_handle.as_raw())
            .map_err(|e| {
                prism_rhi::rhi_error!(LOG_SOURCE, "Failed to get required surface extensions: {:?}", e);
                Error::InitializationFailed(format!("Failed to get required surface extensions: {:?}", e))
            })?
            .to_vec();

        Self::create(config, surface_extensions)
    }

    /// Create a device without presentation support
    pub fn new_headless(config: DeviceConfig) -> Result<Self> {
        Self::create(config, Vec::new())
    }

    fn create(config: DeviceConfig, surface_extensions: Vec<*const c_char>) -> Result<Self> {
        let presentable = !surface_extensions.is_empty();

        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                prism_rhi::rhi_error!(LOG_SOURCE, "Failed to load Vulkan: {}", e);
                Error::InitializationFailed(format!("Failed to load Vulkan: {}", e))
            })?;

            // ========== INSTANCE ==========
            let app_name = CString::new(config.application_name.as_str())
                .map_err(|e| Error::InitializationFailed(format!("Invalid application name: {}", e)))?;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"Prism")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let validation = config.validation_active() && validation_layer_available(&entry);
            if config.validation_active() && !validation {
                prism_rhi::rhi_warn!(LOG_SOURCE, "VK_LAYER_KHRONOS_validation not found, validation disabled");
            }

            let mut extension_names = surface_extensions;
            let mut layer_names: Vec<*const c_char> = Vec::new();
            if validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
                layer_names.push(c"VK_LAYER_KHRONOS_validation".as_ptr());
            }

            let instance_create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry.create_instance(&instance_create_info, None).map_err(|e| {
                prism_rhi::rhi_error!(LOG_SOURCE, "Failed to create instance: {:?}", e);
                Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
            })?;

            let debug_utils = if validation {
                create_debug_messenger(&entry, &instance, &config)
            } else {
                None
            };

            // From here on, failures must release what was created
            let destroy_instance = |debug_utils: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>| {
                if let Some((loader, messenger)) = debug_utils {
                    loader.destroy_debug_utils_messenger(messenger, None);
                }
                instance.destroy_instance(None);
            };

            // ========== ADAPTER ==========
            let adapter = match select_adapter(&instance, &config, presentable) {
                Ok(adapter) => adapter,
                Err(error) => {
                    destroy_instance(debug_utils);
                    return Err(error);
                }
            };

            // ========== DEVICE ==========
            let device = match create_logical_device(&instance, &adapter, presentable) {
                Ok(device) => device,
                Err(error) => {
                    destroy_instance(debug_utils);
                    return Err(error);
                }
            };

            let allocator = match Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device: adapter.physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            }) {
                Ok(allocator) => allocator,
                Err(e) => {
                    device.destroy_device(None);
                    destroy_instance(debug_utils);
                    prism_rhi::rhi_error!(LOG_SOURCE, "Failed to create allocator: {:?}", e);
                    return Err(Error::InitializationFailed(format!("Failed to create allocator: {:?}", e)));
                }
            };

            // The context owns destruction from now on
            let mut context = GpuContext::new(
                entry,
                instance,
                adapter.physical_device,
                device,
                allocator,
                adapter.graphics_queue_family,
                debug_utils,
            );
            context.depth_clip_enable = adapter.depth_clip_enable;
            let ctx = Arc::new(context);

            let limits = limits_from_properties(&adapter.properties);
            let samplers = create_sampler_sets(&ctx, adapter.features.sampler_anisotropy == vk::TRUE)?;

            prism_rhi::rhi_info!(LOG_SOURCE, "Vulkan device created: {} ({:?}), validation {}",
                limits.device_name, limits.device_type, if validation { "on" } else { "off" });

            Ok(Self {
                shared: Arc::new(DeviceShared {
                    ctx,
                    config,
                    limits,
                    samplers,
                    presentable,
                }),
            })
        }
    }

    /// Create a swap chain presenting to `window`
    ///
    /// # Arguments
    ///
    /// * `window` - Target window
    /// * `width` - Backbuffer width, used when the surface does not impose one
    /// * `height` - Backbuffer height
    pub fn create_swap_chain(
        &self,
        window: &(impl HasDisplayHandle + HasWindowHandle),
        width: u32,
        height: u32,
    ) -> Result<Arc<VulkanSwapChain>> {
        if !self.shared.presentable {
            return Err(rhi_err!(LOG_SOURCE, "Headless device cannot create a swap chain"));
        }

        let ctx = &self.shared.ctx;
        let display_handle = window.display_handle()
            .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to get display handle: {}", e))?;
        let window_handle = window.window_handle()
            .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to get window handle: {}", e))?;

        let surface = unsafe {
            ash_window::create_surface(&ctx.entry, &ctx.instance, display_handle.as_raw(), window_handle.as_raw(), None)
        }
        .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to create surface: {:?}", e))?;

        let swap_chain = VulkanSwapChain::new(ctx.clone(), surface, width, height, self.shared.config.present_mode)?;
        Ok(Arc::new(swap_chain))
    }

    /// Configuration the device was created with
    pub fn config(&self) -> &DeviceConfig {
        &self.shared.config
    }

    /// Raw handles of the fixed sampler sets (comparison, regular)
    fn sampler_sets(&self) -> [vk::DescriptorSet; 2] {
        self.shared.samplers.sets
    }
}

// ===== INITIALIZATION =====

unsafe fn validation_layer_available(entry: &ash::Entry) -> bool {
    entry
        .enumerate_instance_layer_properties()
        .unwrap_or_default()
        .iter()
        .any(|layer| layer.layer_name_as_c_str().is_ok_and(|name| name == c"VK_LAYER_KHRONOS_validation"))
}

#[cfg(feature = "vulkan-validation")]
unsafe fn create_debug_messenger(
    entry: &ash::Entry,
    instance: &ash::Instance,
    config: &DeviceConfig,
) -> Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
    crate::vulkan_debug::init_debug_config(config);
    let loader = ash::ext::debug_utils::Instance::new(entry, instance);
    let create_info = crate::vulkan_debug::messenger_create_info(config.debug_severity);
    match loader.create_debug_utils_messenger(&create_info, None) {
        Ok(messenger) => Some((loader, messenger)),
        Err(e) => {
            prism_rhi::rhi_warn!(LOG_SOURCE, "Failed to create debug messenger: {:?}", e);
            None
        }
    }
}

#[cfg(not(feature = "vulkan-validation"))]
unsafe fn create_debug_messenger(
    _entry: &ash::Entry,
    _instance: &ash::Instance,
    _config: &DeviceConfig,
) -> Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
    None
}

/// Rank an adapter, None when it cannot run the RHI
pub(crate) fn adapter_score(
    api_version: u32,
    device_type: vk::PhysicalDeviceType,
    has_graphics_queue: bool,
    dynamic_rendering: bool,
    prefer_discrete: bool,
) -> Option<u32> {
    if api_version < vk::API_VERSION_1_3 || !has_graphics_queue || !dynamic_rendering {
        return None;
    }
    let score = match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU if prefer_discrete => 1000,
        vk::PhysicalDeviceType::INTEGRATED_GPU if !prefer_discrete => 1000,
        vk::PhysicalDeviceType::DISCRETE_GPU | vk::PhysicalDeviceType::INTEGRATED_GPU => 500,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 100,
        _ => 10,
    };
    Some(score)
}

unsafe fn select_adapter(instance: &ash::Instance, config: &DeviceConfig, presentable: bool) -> Result<Adapter> {
    let physical_devices = instance.enumerate_physical_devices().map_err(|e| {
        prism_rhi::rhi_error!(LOG_SOURCE, "Failed to enumerate physical devices: {:?}", e);
        Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
    })?;

    let mut best: Option<(u32, Adapter)> = None;
    for physical_device in physical_devices {
        let properties = instance.get_physical_device_properties(physical_device);
        let features = instance.get_physical_device_features(physical_device);
        let name = properties.device_name_as_c_str().map(CStr::to_string_lossy).unwrap_or_default();

        let depth_clip_extension = has_device_extension(instance, physical_device, ash::ext::depth_clip_enable::NAME);
        let mut features_13 = vk::PhysicalDeviceVulkan13Features::default();
        let mut depth_clip_features = vk::PhysicalDeviceDepthClipEnableFeaturesEXT::default();
        if properties.api_version >= vk::API_VERSION_1_3 {
            let mut features_2 = vk::PhysicalDeviceFeatures2::default().push_next(&mut features_13);
            if depth_clip_extension {
                features_2 = features_2.push_next(&mut depth_clip_features);
            }
            instance.get_physical_device_features2(physical_device, &mut features_2);
        }
        let dynamic_rendering = features_13.dynamic_rendering == vk::TRUE;
        let depth_clip_enable = depth_clip_extension && depth_clip_features.depth_clip_enable == vk::TRUE;

        let graphics_queue_family = instance
            .get_physical_device_queue_family_properties(physical_device)
            .iter()
            .position(|family| family.queue_flags.contains(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE))
            .map(|index| index as u32);

        let swapchain_supported = !presentable || has_device_extension(instance, physical_device, ash::khr::swapchain::NAME);

        let score = adapter_score(
            properties.api_version,
            properties.device_type,
            graphics_queue_family.is_some() && swapchain_supported,
            dynamic_rendering,
            config.prefer_discrete_gpu,
        );
        prism_rhi::rhi_debug!(LOG_SOURCE, "Adapter '{}' ({:?}): score {:?}", name, properties.device_type, score);

        if let (Some(score), Some(graphics_queue_family)) = (score, graphics_queue_family) {
            if best.as_ref().map_or(true, |(best_score, _)| score > *best_score) {
                best = Some((score, Adapter {
                    physical_device,
                    properties,
                    features,
                    graphics_queue_family,
                    depth_clip_enable,
                }));
            }
        }
    }

    best.map(|(_, adapter)| adapter).ok_or_else(|| {
        prism_rhi::rhi_error!(LOG_SOURCE, "No adapter supports Vulkan 1.3 with dynamic rendering");
        Error::InitializationFailed("No adapter supports Vulkan 1.3 with dynamic rendering".to_string())
    })
}

unsafe fn has_device_extension(instance: &ash::Instance, physical_device: vk::PhysicalDevice, wanted: &CStr) -> bool {
    instance
        .enumerate_device_extension_properties(physical_device)
        .unwrap_or_default()
        .iter()
        .any(|extension| extension.extension_name_as_c_str().is_ok_and(|name| name == wanted))
}

unsafe fn create_logical_device(instance: &ash::Instance, adapter: &Adapter, presentable: bool) -> Result<ash::Device> {
    let queue_priorities = [1.0];
    let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
        .queue_family_index(adapter.graphics_queue_family)
        .queue_priorities(&queue_priorities)];

    let mut extension_names: Vec<*const c_char> = Vec::new();
    if presentable {
        extension_names.push(ash::khr::swapchain::NAME.as_ptr());
    }
    if adapter.depth_clip_enable {
        extension_names.push(ash::ext::depth_clip_enable::NAME.as_ptr());
    }

    // Optional features are enabled only where supported
    let supported = &adapter.features;
    let features = vk::PhysicalDeviceFeatures::default()
        .sampler_anisotropy(supported.sampler_anisotropy == vk::TRUE)
        .fill_mode_non_solid(supported.fill_mode_non_solid == vk::TRUE)
        .wide_lines(supported.wide_lines == vk::TRUE);
    let mut features_13 = vk::PhysicalDeviceVulkan13Features::default().dynamic_rendering(true);
    let mut depth_clip_features = vk::PhysicalDeviceDepthClipEnableFeaturesEXT::default().depth_clip_enable(true);

    let mut device_create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extension_names)
        .enabled_features(&features)
        .push_next(&mut features_13);
    if adapter.depth_clip_enable {
        device_create_info = device_create_info.push_next(&mut depth_clip_features);
    }

    instance.create_device(adapter.physical_device, &device_create_info, None).map_err(|e| {
        prism_rhi::rhi_error!(LOG_SOURCE, "Failed to create device: {:?}", e);
        Error::InitializationFailed(format!("Failed to create device: {:?}", e))
    })
}

fn limits_from_properties(properties: &vk::PhysicalDeviceProperties) -> DeviceLimits {
    DeviceLimits {
        max_push_constant_size: properties.limits.max_push_constants_size,
        max_texture_dimension_2d: properties.limits.max_image_dimension2_d,
        timestamp_period_ns: properties.limits.timestamp_period,
        min_uniform_buffer_offset_alignment: properties.limits.min_uniform_buffer_offset_alignment,
        device_name: properties
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "Unknown".to_string()),
        device_type: device_type_from_vk(properties.device_type),
    }
}

/// Create both sampler set layouts, their sets and the samplers written into them
fn create_sampler_sets(ctx: &GpuContext, anisotropy_supported: bool) -> Result<SamplerSets> {
    let mut samplers = Vec::with_capacity(REGULAR_SAMPLERS.len() + 1);

    // Samplers first, so a failure only has samplers to release
    let mut descs = vec![SamplerDesc::comparison_depth()];
    for (_, filter_min_mag, filter_mipmap, address_mode, anisotropy) in REGULAR_SAMPLERS {
        descs.push(SamplerDesc {
            filter_min: filter_min_mag,
            filter_mag: filter_min_mag,
            filter_mipmap,
            address_mode,
            anisotropy: if anisotropy_supported { anisotropy } else { 0.0 },
            ..Default::default()
        });
    }
    for desc in &descs {
        match vulkan_resources::create_sampler(ctx, desc) {
            Ok(sampler) => samplers.push(vk::Sampler::from_raw(sampler)),
            Err(error) => {
                for sampler in samplers {
                    unsafe { ctx.device.destroy_sampler(sampler, None) };
                }
                return Err(error);
            }
        }
    }
    ctx.name_object(samplers[0], "sampler_comparison_depth");
    for (sampler, (name, ..)) in samplers[1..].iter().zip(REGULAR_SAMPLERS.iter()) {
        ctx.name_object(*sampler, &format!("sampler_{}", name));
    }

    let binding = |index: u32| {
        vk::DescriptorSetLayoutBinding::default()
            .binding(index)
            .descriptor_type(vk::DescriptorType::SAMPLER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::ALL)
    };
    let comparison_bindings = [binding(0)];
    let regular_bindings: Vec<_> = (0..REGULAR_SAMPLERS.len() as u32).map(binding).collect();

    unsafe {
        let result = (|| -> std::result::Result<SamplerSets, vk::Result> {
            let comparison_layout = ctx.device.create_descriptor_set_layout(
                &vk::DescriptorSetLayoutCreateInfo::default().bindings(&comparison_bindings), None)?;
            let regular_layout = match ctx.device.create_descriptor_set_layout(
                &vk::DescriptorSetLayoutCreateInfo::default().bindings(&regular_bindings), None) {
                Ok(layout) => layout,
                Err(e) => {
                    ctx.device.destroy_descriptor_set_layout(comparison_layout, None);
                    return Err(e);
                }
            };
            let layouts = [comparison_layout, regular_layout];

            let pool_sizes = [vk::DescriptorPoolSize {
                ty: vk::DescriptorType::SAMPLER,
                descriptor_count: samplers.len() as u32,
            }];
            let pool = match ctx.device.create_descriptor_pool(
                &vk::DescriptorPoolCreateInfo::default().max_sets(2).pool_sizes(&pool_sizes), None) {
                Ok(pool) => pool,
                Err(e) => {
                    for layout in layouts {
                        ctx.device.destroy_descriptor_set_layout(layout, None);
                    }
                    return Err(e);
                }
            };

            let allocated = ctx.device.allocate_descriptor_sets(
                &vk::DescriptorSetAllocateInfo::default().descriptor_pool(pool).set_layouts(&layouts));
            let sets = match allocated {
                Ok(sets) => [sets[0], sets[1]],
                Err(e) => {
                    ctx.device.destroy_descriptor_pool(pool, None);
                    for layout in layouts {
                        ctx.device.destroy_descriptor_set_layout(layout, None);
                    }
                    return Err(e);
                }
            };

            // Written once, never updated
            let image_infos: Vec<vk::DescriptorImageInfo> = samplers
                .iter()
                .map(|sampler| vk::DescriptorImageInfo {
                    sampler: *sampler,
                    image_view: vk::ImageView::null(),
                    image_layout: vk::ImageLayout::UNDEFINED,
                })
                .collect();
            let writes: Vec<vk::WriteDescriptorSet> = image_infos
                .iter()
                .enumerate()
                .map(|(index, info)| {
                    let (set, binding) = if index == 0 { (sets[0], 0) } else { (sets[1], index as u32 - 1) };
                    vk::WriteDescriptorSet::default()
                        .dst_set(set)
                        .dst_binding(binding)
                        .descriptor_type(vk::DescriptorType::SAMPLER)
                        .image_info(std::slice::from_ref(info))
                })
                .collect();
            ctx.device.update_descriptor_sets(&writes, &[]);

            Ok(SamplerSets {
                layouts,
                sets,
                pool,
                samplers: samplers.clone(),
            })
        })();

        result.map_err(|e| {
            for sampler in &samplers {
                ctx.device.destroy_sampler(*sampler, None);
            }
            rhi_err!(LOG_SOURCE, "Failed to create the fixed sampler sets: {:?}", e)
        })
    }
}

// ===== DEVICE BACKEND =====

impl DeviceBackend for VulkanDevice {
    fn api_type(&self) -> ApiType {
        ApiType::Vulkan
    }

    fn limits(&self) -> DeviceLimits {
        self.shared.limits.clone()
    }

    fn sampler_set_layout(&self, kind: SamplerLayoutKind) -> RhiHandle {
        let layouts = &self.shared.samplers.layouts;
        match kind {
            SamplerLayoutKind::Comparison => layouts[0].as_raw(),
            SamplerLayoutKind::Regular => layouts[1].as_raw(),
        }
    }

    fn create_descriptor_set_layout(&self, name: &str, descriptors: &[Descriptor]) -> Result<RhiHandle> {
        vulkan_pipeline::create_descriptor_set_layout(&self.shared.ctx, name, descriptors)
    }

    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<NativePipeline> {
        vulkan_pipeline::create_pipeline(&self.shared.ctx, desc)
    }

    fn create_shader(&self, desc: &ShaderDesc) -> Result<(RhiHandle, ShaderReflection)> {
        vulkan_shader::create_shader(&self.shared.ctx, desc)
    }

    fn create_texture(&self, desc: &TextureDesc) -> Result<TextureHandles> {
        vulkan_resources::create_texture(&self.shared.ctx, desc)
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<(RhiHandle, u64)> {
        vulkan_resources::create_buffer(&self.shared.ctx, desc)
    }

    fn update_buffer(&self, buffer: RhiHandle, offset: u64, data: &[u8]) -> Result<()> {
        vulkan_resources::update_buffer(&self.shared.ctx, buffer, offset, data)
    }

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<RhiHandle> {
        vulkan_resources::create_sampler(&self.shared.ctx, desc)
    }

    fn create_command_pool(&self, queue: QueueType) -> Result<RhiHandle> {
        // Every queue type is served by the graphics family
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(self.shared.ctx.graphics_queue_family)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        let pool = unsafe { self.shared.ctx.device.create_command_pool(&create_info, None) }
            .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to create {:?} command pool: {:?}", queue, e))?;
        Ok(pool.as_raw())
    }

    fn create_command_encoder(&self, _queue: QueueType, pool: RhiHandle, name: &str) -> Result<Box<dyn CommandEncoder>> {
        let encoder = VulkanCommandEncoder::new(
            self.shared.ctx.clone(),
            vk::CommandPool::from_raw(pool),
            name,
            self.sampler_sets(),
        )?;
        Ok(Box::new(encoder))
    }

    fn queue_wait_all(&self) -> Result<()> {
        let ctx = &self.shared.ctx;
        let _queue = ctx.lock_queue();
        unsafe { ctx.device.queue_wait_idle(ctx.graphics_queue) }
            .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to wait for queue idle: {:?}", e))
    }

    fn destroy(&self, resource_type: ResourceType, handle: RhiHandle) {
        vulkan_resources::destroy_resource(&self.shared.ctx, resource_type, handle);
    }

    fn set_name(&self, resource_type: ResourceType, handle: RhiHandle, name: &str) -> Result<()> {
        self.shared.ctx
            .set_object_name(object_type_to_vk(resource_type), handle, name)
            .map_err(|e| Error::BackendError(format!("{:?}", e)))
    }
}

#[cfg(test)]
#[path = "vulkan_device_tests.rs"]
mod tests;
