//! Validation layer output routed into `log`.
//!
//! Messages go to the [`VALIDATION_TARGET`] target so they can be filtered
//! separately from the renderer's own logging, e.g.
//! `RUST_LOG=tile_renderer::validation=warn`.

use std::ffi::{c_void, CStr};

use ash::vk;

use crate::error::GraphicsError;

/// Log target of every validation message.
pub const VALIDATION_TARGET: &str = "tile_renderer::validation";

/// Severities forwarded to the callback. Verbose output is left out.
fn forwarded_severities() -> vk::DebugUtilsMessageSeverityFlagsEXT {
    vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
        | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
}

/// Register the validation callback on `debug_utils`.
pub fn create_debug_messenger(
    debug_utils: &ash::ext::debug_utils::Instance,
) -> Result<vk::DebugUtilsMessengerEXT, GraphicsError> {
    let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(forwarded_severities())
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(validation_callback));

    unsafe { debug_utils.create_debug_utils_messenger(&create_info, None) }.map_err(|e| {
        GraphicsError::InitializationFailed(format!(
            "Failed to register validation callback: {:?}",
            e
        ))
    })
}

/// Log level for a validation severity. Informational layer chatter is
/// demoted to debug so it stays out of normal runs.
fn level_for(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> log::Level {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::Level::Error
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::Level::Warn
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        log::Level::Debug
    } else {
        log::Level::Trace
    }
}

/// Short label for a message type; validation wins over performance.
fn kind_label(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "performance"
    } else {
        "general"
    }
}

/// # Safety
/// `ptr` must be null or point at a nul-terminated string.
unsafe fn lossy_string(ptr: *const std::ffi::c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

unsafe extern "system" fn validation_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    let level = level_for(severity);
    if !log::log_enabled!(target: VALIDATION_TARGET, level) {
        return vk::FALSE;
    }

    // SAFETY: the layer hands us valid callback data for the duration of the call
    let (id, message) = match unsafe { callback_data.as_ref() } {
        Some(data) => unsafe {
            (
                lossy_string(data.p_message_id_name),
                lossy_string(data.p_message),
            )
        },
        None => (None, None),
    };

    log::log!(
        target: VALIDATION_TARGET,
        level,
        "{} [{}] {}",
        kind_label(message_type),
        id.as_deref().unwrap_or("-"),
        message.as_deref().unwrap_or("(no message)")
    );

    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR, log::Level::Error)]
    #[case(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING, log::Level::Warn)]
    #[case(vk::DebugUtilsMessageSeverityFlagsEXT::INFO, log::Level::Debug)]
    #[case(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE, log::Level::Trace)]
    fn test_severity_levels(
        #[case] severity: vk::DebugUtilsMessageSeverityFlagsEXT,
        #[case] level: log::Level,
    ) {
        assert_eq!(level_for(severity), level);
    }

    #[test]
    fn test_kind_label_prefers_validation() {
        assert_eq!(
            kind_label(
                vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
            ),
            "validation"
        );
        assert_eq!(
            kind_label(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE),
            "performance"
        );
        assert_eq!(kind_label(vk::DebugUtilsMessageTypeFlagsEXT::empty()), "general");
    }

    #[test]
    fn test_lossy_string_handles_null() {
        assert_eq!(unsafe { lossy_string(std::ptr::null()) }, None);
        assert_eq!(
            unsafe { lossy_string(c"VUID-test".as_ptr()) }.as_deref(),
            Some("VUID-test")
        );
    }
}
