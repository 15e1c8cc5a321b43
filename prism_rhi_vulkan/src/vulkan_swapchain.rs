/// VulkanSwapChain - Vulkan implementation of the SwapChain trait
///
/// Acquisition waits on a fence and presentation waits for the command
/// list that rendered the frame, so no semaphore crosses the RHI seam.
/// The layout of every backbuffer is tracked for the command lists that
/// transition it.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use ash::vk;
use ash::vk::Handle;
use prism_rhi::prism::rhi::{
    generate_object_id, CommandList, Format, ImageLayout, ObjectId, PresentMode, RhiHandle,
    SwapChain,
};
use prism_rhi::prism::{Error, Result};
use prism_rhi::{rhi_assert, rhi_err};

use crate::vulkan_context::{GpuContext, LOG_SOURCE};
use crate::vulkan_conversions::{format_from_vk, present_mode_to_vk};

/// Backbuffers requested from the presentation engine
const BUFFER_COUNT: u32 = 2;

/// Objects rebuilt on every resize
struct SwapChainImages {
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    views: Vec<vk::ImageView>,
    layouts: Vec<ImageLayout>,
    format: Format,
    extent: vk::Extent2D,
}

/// Vulkan swap chain
pub struct VulkanSwapChain {
    id: ObjectId,
    ctx: Arc<GpuContext>,
    surface: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,
    swapchain_loader: ash::khr::swapchain::Device,
    present_mode: PresentMode,
    /// Signalled by acquisition
    acquire_fence: vk::Fence,
    images: Mutex<SwapChainImages>,
    image_index: AtomicU32,
}

impl VulkanSwapChain {
    /// Create a swap chain for a surface and acquire its first backbuffer
    ///
    /// # Arguments
    ///
    /// * `ctx` - Shared GPU context
    /// * `surface` - Window surface, owned by the swap chain from now on
    /// * `width` - Requested width (used when the surface leaves it to us)
    /// * `height` - Requested height
    /// * `present_mode` - Preferred present mode, FIFO when unsupported
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        surface: vk::SurfaceKHR,
        width: u32,
        height: u32,
        present_mode: PresentMode,
    ) -> Result<Self> {
        let surface_loader = ash::khr::surface::Instance::new(&ctx.entry, &ctx.instance);
        let swapchain_loader = ash::khr::swapchain::Device::new(&ctx.instance, &ctx.device);

        unsafe {
            let supported = surface_loader
                .get_physical_device_surface_support(ctx.physical_device, ctx.graphics_queue_family, surface)
                .unwrap_or(false);
            if !supported {
                surface_loader.destroy_surface(surface, None);
                prism_rhi::rhi_error!(LOG_SOURCE, "Graphics queue cannot present to this surface");
                return Err(Error::InitializationFailed("Graphics queue cannot present to this surface".to_string()));
            }

            let acquire_fence = match ctx.device.create_fence(&vk::FenceCreateInfo::default(), None) {
                Ok(fence) => fence,
                Err(e) => {
                    surface_loader.destroy_surface(surface, None);
                    return Err(rhi_err!(LOG_SOURCE, "Failed to create acquire fence: {:?}", e));
                }
            };

            let images = match create_images(&ctx, &surface_loader, &swapchain_loader, surface, width, height,
                present_mode, vk::SwapchainKHR::null()) {
                Ok(images) => images,
                Err(error) => {
                    ctx.device.destroy_fence(acquire_fence, None);
                    surface_loader.destroy_surface(surface, None);
                    return Err(error);
                }
            };

            prism_rhi::rhi_info!(LOG_SOURCE, "Swap chain created: {}x{}, {:?}, {} buffers, {:?}",
                images.extent.width, images.extent.height, images.format, images.images.len(), present_mode);

            let swap_chain = Self {
                id: generate_object_id(),
                ctx,
                surface,
                surface_loader,
                swapchain_loader,
                present_mode,
                acquire_fence,
                images: Mutex::new(images),
                image_index: AtomicU32::new(0),
            };
            swap_chain.acquire_next_image()?;
            Ok(swap_chain)
        }
    }

    fn lock_images(&self) -> MutexGuard<'_, SwapChainImages> {
        self.images.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Index of the current backbuffer
    pub fn image_index(&self) -> u32 {
        self.image_index.load(Ordering::Acquire)
    }

    /// Number of backbuffers
    pub fn buffer_count(&self) -> usize {
        self.lock_images().images.len()
    }

    pub fn present_mode(&self) -> PresentMode {
        self.present_mode
    }

    /// Acquire the next backbuffer and block until it can be written
    ///
    /// Returns `false` when the swap chain is out of date and must be resized.
    pub fn acquire_next_image(&self) -> Result<bool> {
        let swapchain = self.lock_images().swapchain;
        let acquired = unsafe {
            self.swapchain_loader.acquire_next_image(swapchain, u64::MAX, vk::Semaphore::null(), self.acquire_fence)
        };

        let index = match acquired {
            Ok((index, _suboptimal)) => index,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                prism_rhi::rhi_warn!(LOG_SOURCE, "Swap chain is out of date, resize required");
                return Ok(false);
            }
            Err(e) => return Err(rhi_err!(LOG_SOURCE, "Failed to acquire next image: {:?}", e)),
        };

        unsafe {
            self.ctx.device.wait_for_fences(&[self.acquire_fence], true, u64::MAX)
                .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to wait for image acquisition: {:?}", e))?;
            self.ctx.device.reset_fences(&[self.acquire_fence])
                .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to reset acquire fence: {:?}", e))?;
        }

        self.image_index.store(index, Ordering::Release);
        Ok(true)
    }

    /// Present the current backbuffer and acquire the next one
    ///
    /// Waits for the command list that rendered the frame. The backbuffer
    /// must already be in `PresentSrc`. Returns `false` when the swap
    /// chain is out of date and must be resized.
    pub fn present(&self, command_list: &mut CommandList) -> Result<bool> {
        rhi_assert!(self.layout() == ImageLayout::PresentSrc, LOG_SOURCE,
            "Swap chain backbuffer must be in PresentSrc before present, it is in {:?}", self.layout());

        command_list.wait_for_execution();

        let swapchains = [self.lock_images().swapchain];
        let indices = [self.image_index()];
        let present_info = vk::PresentInfoKHR::default()
            .swapchains(&swapchains)
            .image_indices(&indices);

        let presented = {
            let _queue = self.ctx.lock_queue();
            unsafe { self.swapchain_loader.queue_present(self.ctx.graphics_queue, &present_info) }
        };

        match presented {
            Ok(false) => self.acquire_next_image(),
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                prism_rhi::rhi_warn!(LOG_SOURCE, "Swap chain is out of date or suboptimal, resize required");
                Ok(false)
            }
            Err(e) => Err(rhi_err!(LOG_SOURCE, "Failed to present: {:?}", e)),
        }
    }

    /// Recreate the swap chain at a new size and acquire a backbuffer
    ///
    /// A zero width or height (minimized window) is ignored.
    pub fn resize(&self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            prism_rhi::rhi_debug!(LOG_SOURCE, "Ignoring swap chain resize to {}x{}", width, height);
            return Ok(());
        }

        unsafe { self.ctx.device.device_wait_idle() }
            .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to wait for device idle before resize: {:?}", e))?;

        {
            let mut images = self.lock_images();
            let recreated = unsafe {
                create_images(&self.ctx, &self.surface_loader, &self.swapchain_loader, self.surface, width, height,
                    self.present_mode, images.swapchain)?
            };
            let old = std::mem::replace(&mut *images, recreated);
            unsafe { destroy_images(&self.ctx, &self.swapchain_loader, old) };

            prism_rhi::rhi_info!(LOG_SOURCE, "Swap chain resized to {}x{}", images.extent.width, images.extent.height);
        }

        self.acquire_next_image()?;
        Ok(())
    }
}

/// Create the swap chain, its images and their views
///
/// # Safety
///
/// `surface` must be a live surface of the context's instance.
#[allow(clippy::too_many_arguments)]
unsafe fn create_images(
    ctx: &GpuContext,
    surface_loader: &ash::khr::surface::Instance,
    swapchain_loader: &ash::khr::swapchain::Device,
    surface: vk::SurfaceKHR,
    width: u32,
    height: u32,
    present_mode: PresentMode,
    old_swapchain: vk::SwapchainKHR,
) -> Result<SwapChainImages> {
    let capabilities = surface_loader
        .get_physical_device_surface_capabilities(ctx.physical_device, surface)
        .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to get surface capabilities: {:?}", e))?;
    let surface_formats = surface_loader
        .get_physical_device_surface_formats(ctx.physical_device, surface)
        .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to get surface formats: {:?}", e))?;
    let present_modes = surface_loader
        .get_physical_device_surface_present_modes(ctx.physical_device, surface)
        .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to get present modes: {:?}", e))?;

    // Linear formats only: shaders write final values
    let Some(surface_format) = [vk::Format::B8G8R8A8_UNORM, vk::Format::R8G8B8A8_UNORM]
        .iter()
        .find_map(|wanted| surface_formats.iter().find(|f| f.format == *wanted))
        .or_else(|| surface_formats.iter().find(|f| format_from_vk(f.format) != Format::Undefined))
    else {
        return Err(rhi_err!(LOG_SOURCE, "Surface offers no supported format ({} formats)", surface_formats.len()));
    };

    let wanted_mode = present_mode_to_vk(present_mode);
    let vk_present_mode = if present_modes.contains(&wanted_mode) {
        wanted_mode
    } else {
        prism_rhi::rhi_warn!(LOG_SOURCE, "Present mode {:?} unsupported, falling back to FIFO", present_mode);
        vk::PresentModeKHR::FIFO
    };

    // u32::MAX means the surface size follows the swap chain
    let extent = if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: width.clamp(capabilities.min_image_extent.width, capabilities.max_image_extent.width),
            height: height.clamp(capabilities.min_image_extent.height, capabilities.max_image_extent.height),
        }
    };

    let mut image_count = BUFFER_COUNT.max(capabilities.min_image_count);
    if capabilities.max_image_count > 0 {
        image_count = image_count.min(capabilities.max_image_count);
    }

    let create_info = vk::SwapchainCreateInfoKHR::default()
        .surface(surface)
        .min_image_count(image_count)
        .image_format(surface_format.format)
        .image_color_space(surface_format.color_space)
        .image_extent(extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
        .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        .pre_transform(capabilities.current_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(vk_present_mode)
        .clipped(true)
        .old_swapchain(old_swapchain);

    let swapchain = swapchain_loader.create_swapchain(&create_info, None)
        .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to create swap chain: {:?}", e))?;

    let images = match swapchain_loader.get_swapchain_images(swapchain) {
        Ok(images) => images,
        Err(e) => {
            swapchain_loader.destroy_swapchain(swapchain, None);
            return Err(rhi_err!(LOG_SOURCE, "Failed to get swap chain images: {:?}", e));
        }
    };

    let mut views = Vec::with_capacity(images.len());
    for (index, image) in images.iter().enumerate() {
        let view_info = vk::ImageViewCreateInfo::default()
            .image(*image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(surface_format.format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });
        match ctx.device.create_image_view(&view_info, None) {
            Ok(view) => {
                ctx.name_object(*image, &format!("swap_chain_image_{}", index));
                views.push(view);
            }
            Err(e) => {
                for view in views {
                    ctx.device.destroy_image_view(view, None);
                }
                swapchain_loader.destroy_swapchain(swapchain, None);
                return Err(rhi_err!(LOG_SOURCE, "Failed to create swap chain image view: {:?}", e));
            }
        }
    }

    Ok(SwapChainImages {
        swapchain,
        layouts: vec![ImageLayout::Undefined; images.len()],
        images,
        views,
        format: format_from_vk(surface_format.format),
        extent,
    })
}

/// # Safety
///
/// No submitted work may still reference the images.
unsafe fn destroy_images(ctx: &GpuContext, swapchain_loader: &ash::khr::swapchain::Device, images: SwapChainImages) {
    for view in images.views {
        ctx.device.destroy_image_view(view, None);
    }
    swapchain_loader.destroy_swapchain(images.swapchain, None);
}

impl SwapChain for VulkanSwapChain {
    fn object_id(&self) -> ObjectId {
        self.id
    }

    fn width(&self) -> u32 {
        self.lock_images().extent.width
    }

    fn height(&self) -> u32 {
        self.lock_images().extent.height
    }

    fn format(&self) -> Format {
        self.lock_images().format
    }

    fn rhi_image(&self) -> RhiHandle {
        let index = self.image_index() as usize;
        self.lock_images().images.get(index).map_or(0, |image| image.as_raw())
    }

    fn rhi_rtv(&self) -> RhiHandle {
        let index = self.image_index() as usize;
        self.lock_images().views.get(index).map_or(0, |view| view.as_raw())
    }

    fn layout(&self) -> ImageLayout {
        let index = self.image_index() as usize;
        self.lock_images().layouts.get(index).copied().unwrap_or(ImageLayout::Undefined)
    }

    fn set_layout(&self, layout: ImageLayout) {
        let index = self.image_index() as usize;
        if let Some(tracked) = self.lock_images().layouts.get_mut(index) {
            *tracked = layout;
        }
    }
}

impl Drop for VulkanSwapChain {
    fn drop(&mut self) {
        unsafe {
            let _ = self.ctx.device.device_wait_idle();
            let images = std::mem::replace(
                self.images.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner()),
                SwapChainImages {
                    swapchain: vk::SwapchainKHR::null(),
                    images: Vec::new(),
                    views: Vec::new(),
                    layouts: Vec::new(),
                    format: Format::Undefined,
                    extent: vk::Extent2D::default(),
                },
            );
            destroy_images(&self.ctx, &self.swapchain_loader, images);
            self.ctx.device.destroy_fence(self.acquire_fence, None);
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}
