//! Vulkan physical and logical device management.

use std::ffi::{c_char, CStr};

use ash::khr::surface;
use ash::vk;

use crate::error::GraphicsError;

/// Presentation surface used to filter queue families.
pub struct SurfaceQuery<'a> {
    pub loader: &'a surface::Instance,
    pub surface: vk::SurfaceKHR,
}

/// Selected GPU and the queue family driving it.
#[derive(Debug, Clone, Copy)]
pub struct DeviceSelection {
    pub physical_device: vk::PhysicalDevice,
    pub queue_family: u32,
}

/// Select the best physical device for rendering.
///
/// Prefers discrete GPUs over integrated GPUs. Devices without a queue family
/// that can both draw and present to `surface` are skipped.
pub fn select_physical_device(
    instance: &ash::Instance,
    surface: Option<&SurfaceQuery<'_>>,
) -> Result<DeviceSelection, GraphicsError> {
    let devices = unsafe { instance.enumerate_physical_devices() }.map_err(|e| {
        GraphicsError::InitializationFailed(format!(
            "Failed to enumerate physical devices: {:?}",
            e
        ))
    })?;

    if devices.is_empty() {
        return Err(GraphicsError::InitializationFailed(
            "No Vulkan-capable GPU found".to_string(),
        ));
    }

    let mut best: Option<DeviceSelection> = None;
    let mut best_score = 0;

    for device in devices {
        let properties = unsafe { instance.get_physical_device_properties(device) };
        let device_name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) };

        if properties.api_version < vk::make_api_version(0, 1, 3, 0) {
            log::info!("Skipping GPU {:?}: Vulkan 1.3 not supported", device_name);
            continue;
        }

        if !supports_descriptor_indexing(instance, device) {
            log::info!("Skipping GPU {:?}: descriptor indexing missing", device_name);
            continue;
        }

        let Some(queue_family) = find_queue_family(instance, device, surface) else {
            continue;
        };

        let mut score = 1;
        if properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
            score += 1000;
        } else if properties.device_type == vk::PhysicalDeviceType::INTEGRATED_GPU {
            score += 100;
        }
        score += properties.limits.max_image_dimension2_d / 1024;

        log::info!(
            "Found GPU: {:?} (type: {:?}, score: {})",
            device_name,
            properties.device_type,
            score
        );

        if score > best_score {
            best_score = score;
            best = Some(DeviceSelection {
                physical_device: device,
                queue_family,
            });
        }
    }

    best.ok_or_else(|| GraphicsError::InitializationFailed("No suitable GPU found".to_string()))
}

/// Find a queue family that supports graphics (and therefore transfer) work,
/// and presentation when a surface is given.
fn find_queue_family(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    surface: Option<&SurfaceQuery<'_>>,
) -> Option<u32> {
    let queue_families =
        unsafe { instance.get_physical_device_queue_family_properties(physical_device) };

    queue_families
        .iter()
        .enumerate()
        .filter(|(_, family)| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))
        .map(|(index, _)| index as u32)
        .find(|&index| match surface {
            Some(query) => unsafe {
                query.loader.get_physical_device_surface_support(
                    physical_device,
                    index,
                    query.surface,
                )
            }
            .unwrap_or(false),
            None => true,
        })
}

fn supports_descriptor_indexing(instance: &ash::Instance, device: vk::PhysicalDevice) -> bool {
    let mut vulkan_12 = vk::PhysicalDeviceVulkan12Features::default();
    let mut vulkan_13 = vk::PhysicalDeviceVulkan13Features::default();
    let mut features = vk::PhysicalDeviceFeatures2::default()
        .push_next(&mut vulkan_12)
        .push_next(&mut vulkan_13);
    unsafe { instance.get_physical_device_features2(device, &mut features) };

    vulkan_12.descriptor_binding_partially_bound == vk::TRUE
        && vulkan_12.descriptor_binding_variable_descriptor_count == vk::TRUE
        && vulkan_12.runtime_descriptor_array == vk::TRUE
        && vulkan_12.shader_sampled_image_array_non_uniform_indexing == vk::TRUE
        && vulkan_13.dynamic_rendering == vk::TRUE
        && vulkan_13.synchronization2 == vk::TRUE
}

/// Create a logical device with required features and extensions.
pub fn create_logical_device(
    instance: &ash::Instance,
    selection: DeviceSelection,
    presentation: bool,
) -> Result<ash::Device, GraphicsError> {
    let queue_priorities = [1.0f32];
    let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
        .queue_family_index(selection.queue_family)
        .queue_priorities(&queue_priorities)];

    let mut device_extensions: Vec<*const c_char> = Vec::new();
    if presentation {
        device_extensions.push(ash::khr::swapchain::NAME.as_ptr());
    }

    let features = vk::PhysicalDeviceFeatures::default();

    // Unbounded texture array indexed per instance
    let mut vulkan_12_features = vk::PhysicalDeviceVulkan12Features::default()
        .descriptor_binding_partially_bound(true)
        .descriptor_binding_variable_descriptor_count(true)
        .runtime_descriptor_array(true)
        .shader_sampled_image_array_non_uniform_indexing(true);

    let mut vulkan_13_features = vk::PhysicalDeviceVulkan13Features::default()
        .dynamic_rendering(true)
        .synchronization2(true);

    let create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&device_extensions)
        .enabled_features(&features)
        .push_next(&mut vulkan_12_features)
        .push_next(&mut vulkan_13_features);

    unsafe { instance.create_device(selection.physical_device, &create_info, None) }.map_err(|e| {
        GraphicsError::InitializationFailed(format!("Failed to create logical device: {:?}", e))
    })
}
