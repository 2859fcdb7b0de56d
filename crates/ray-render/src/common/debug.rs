use anyhow::Result;
use ash::vk;
use std::ffi::{
    c_void,
    CStr,
};

/// Label printed in front of a forwarded driver message.
pub fn message_prefix(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
) -> &'static str {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        "ERROR"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "PERFORMANCE"
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        "WARNING"
    } else {
        "INFO"
    }
}

unsafe extern "system" fn vulkan_debug_utils_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*p_callback_data).p_message).to_string_lossy();
    let prefix = message_prefix(message_severity, message_type);

    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::error!("{}: {}", prefix, message);
    } else {
        log::warn!("{}: {}", prefix, message);
    }

    vk::FALSE
}

pub fn create_debug_messenger_create_info() -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
        )
        .pfn_user_callback(Some(vulkan_debug_utils_callback))
}

/// Report callback registration. The loader holds the extension entry points
/// for the lifetime of the instance.
pub struct DebugUtils {
    debug_utils_loader: ash::ext::debug_utils::Instance,
    utils_messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugUtils {
    pub fn new(entry: &ash::Entry, instance: &ash::Instance) -> Result<Self> {
        let debug_utils_loader = ash::ext::debug_utils::Instance::new(entry, instance);
        let create_info = create_debug_messenger_create_info();
        let utils_messenger =
            unsafe { debug_utils_loader.create_debug_utils_messenger(&create_info, None)? };
        Ok(Self {
            debug_utils_loader,
            utils_messenger,
        })
    }
}

impl Drop for DebugUtils {
    fn drop(&mut self) {
        unsafe {
            self.debug_utils_loader
                .destroy_debug_utils_messenger(self.utils_messenger, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_win_over_type() {
        let prefix = message_prefix(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        );
        assert_eq!(prefix, "ERROR");
    }

    #[test]
    fn performance_warnings_are_labelled() {
        let prefix = message_prefix(
            vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
            vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        );
        assert_eq!(prefix, "PERFORMANCE");
        let prefix = message_prefix(
            vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
            vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
        );
        assert_eq!(prefix, "WARNING");
    }
}
