/// GpuContext - Native Vulkan state shared by the device, encoders and swap chains
///
/// Contains everything needed for GPU operations:
/// - Entry, instance and logical device
/// - Allocator and the allocations backing images and buffers
/// - Graphics queue (all queue types are served by this family)
/// - Debug-utils loaders for object names and labels
///
/// The last owner to release its `Arc<GpuContext>` destroys the device and
/// the instance, so encoders and swap chains may outlive the `VulkanDevice`.

use ash::vk;
use ash::vk::Handle;
use gpu_allocator::vulkan::{Allocation, Allocator};
use prism_rhi::prism::rhi::RhiHandle;
use rustc_hash::FxHashMap;
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Log source of every Vulkan backend diagnostic
pub const LOG_SOURCE: &str = "prism::vulkan";

/// Shared native context
pub struct GpuContext {
    /// Vulkan loader (must outlive the instance)
    pub(crate) entry: ash::Entry,

    pub(crate) instance: ash::Instance,

    pub(crate) physical_device: vk::PhysicalDevice,

    /// Vulkan logical device
    pub device: ash::Device,

    /// GPU memory allocator
    /// Wrapped in ManuallyDrop so it is dropped BEFORE the device is destroyed
    allocator: ManuallyDrop<Mutex<Allocator>>,

    /// Allocations keyed by the raw image or buffer handle they back
    allocations: Mutex<FxHashMap<RhiHandle, Allocation>>,

    /// Graphics queue for command submission
    pub graphics_queue: vk::Queue,

    /// Graphics queue family index
    pub graphics_queue_family: u32,

    /// Queue submissions must be externally synchronized
    queue_lock: Mutex<()>,

    /// VK_EXT_depth_clip_enable is enabled, depth clipping is pipeline state
    pub(crate) depth_clip_enable: bool,

    /// Debug utils loaders (present when validation is compiled in and enabled)
    pub(crate) debug_utils_instance: Option<ash::ext::debug_utils::Instance>,
    pub(crate) debug_utils_device: Option<ash::ext::debug_utils::Device>,
    pub(crate) debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl GpuContext {
    /// Create a new GPU context
    ///
    /// # Arguments
    ///
    /// * `entry` - Vulkan loader
    /// * `instance` - Vulkan instance
    /// * `physical_device` - Selected adapter
    /// * `device` - Vulkan logical device
    /// * `allocator` - GPU memory allocator
    /// * `graphics_queue_family` - Graphics queue family index
    /// * `debug_utils` - Instance loader and messenger (if validation enabled)
    pub(crate) fn new(
        entry: ash::Entry,
        instance: ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
        allocator: Allocator,
        graphics_queue_family: u32,
        debug_utils: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    ) -> Self {
        let graphics_queue = unsafe { device.get_device_queue(graphics_queue_family, 0) };
        let debug_utils_device = debug_utils
            .as_ref()
            .map(|_| ash::ext::debug_utils::Device::new(&instance, &device));
        let (debug_utils_instance, debug_messenger) = match debug_utils {
            Some((loader, messenger)) => (Some(loader), Some(messenger)),
            None => (None, None),
        };

        Self {
            entry,
            instance,
            physical_device,
            device,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            allocations: Mutex::new(FxHashMap::default()),
            graphics_queue,
            graphics_queue_family,
            queue_lock: Mutex::new(()),
            depth_clip_enable: false,
            debug_utils_instance,
            debug_utils_device,
            debug_messenger,
        }
    }

    pub(crate) fn allocator(&self) -> MutexGuard<'_, Allocator> {
        self.allocator.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remember the allocation backing an image or buffer
    pub(crate) fn track_allocation(&self, handle: RhiHandle, allocation: Allocation) {
        self.allocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle, allocation);
    }

    /// Release the allocation backing an image or buffer, if any
    pub(crate) fn free_allocation(&self, handle: RhiHandle) {
        let allocation = self
            .allocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle);

        if let Some(allocation) = allocation {
            if let Err(e) = self.allocator().free(allocation) {
                prism_rhi::rhi_warn!(LOG_SOURCE, "Failed to free allocation of {:#x}: {:?}", handle, e);
            }
        }
    }

    /// Run `f` on the persistently mapped bytes of a host-visible buffer
    pub(crate) fn with_mapped<R>(&self, handle: RhiHandle, f: impl FnOnce(&mut [u8]) -> R) -> Option<R> {
        let mut allocations = self.allocations.lock().unwrap_or_else(PoisonError::into_inner);
        let slice = allocations.get_mut(&handle)?.mapped_slice_mut()?;
        Some(f(slice))
    }

    /// Lock the graphics queue for a submit or present
    pub(crate) fn lock_queue(&self) -> MutexGuard<'_, ()> {
        self.queue_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach a debug name to any Vulkan object (no-op without debug utils)
    pub(crate) fn set_object_name(&self, object_type: vk::ObjectType, handle: u64, name: &str) -> Result<(), vk::Result> {
        let Some(debug_utils) = &self.debug_utils_device else {
            return Ok(());
        };
        // Names with interior NULs are truncated at the first one
        let name = std::ffi::CString::new(name.split('\0').next().unwrap_or_default())
            .unwrap_or_default();
        let info = vk::DebugUtilsObjectNameInfoEXT {
            object_type,
            object_handle: handle,
            ..Default::default()
        }
        .object_name(&name);
        unsafe { debug_utils.set_debug_utils_object_name(&info) }
    }

    /// Typed convenience for `set_object_name`
    pub(crate) fn name_object<T: Handle>(&self, object: T, name: &str) {
        if let Err(e) = self.set_object_name(T::TYPE, object.as_raw(), name) {
            prism_rhi::rhi_warn!(LOG_SOURCE, "Failed to name {:?} '{}': {:?}", T::TYPE, name, e);
        }
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            // 1. Free every allocation still tracked, then the allocator itself,
            //    while the device is alive
            let leftovers: Vec<_> = self
                .allocations
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner)
                .drain()
                .collect();
            if !leftovers.is_empty() {
                prism_rhi::rhi_warn!(LOG_SOURCE, "{} allocation(s) still alive at device destruction", leftovers.len());
            }
            for (_, allocation) in leftovers {
                self.allocator().free(allocation).ok();
            }
            ManuallyDrop::drop(&mut self.allocator);

            // 2. Destroy the debug messenger BEFORE device and instance
            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils_instance, self.debug_messenger) {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            // 3. Destroy device and instance
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}
