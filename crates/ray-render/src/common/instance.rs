use super::{
    consts::{
        APPLICATION_NAME,
        ENGINE_NAME,
    },
    debug::create_debug_messenger_create_info,
    extension::{
        missing_extensions,
        required_extension_names,
    },
    layer::{
        find_missing_layer,
        required_layer_names,
    },
};
use crate::error::{
    SetupError,
    Stage,
};
use anyhow::{
    Context as _,
    Result,
};
use ash::vk;
use std::ffi::CString;
use winit::raw_window_handle::RawDisplayHandle;

pub struct Instance {
    instance: ash::Instance,
}

impl Instance {
    /// Fails with `ExtensionNotPresent` before anything is created when any
    /// platform or debug extension is unsupported.
    pub fn new(
        entry: &ash::Entry,
        display_handle: RawDisplayHandle,
        validation: bool,
    ) -> Result<Self> {
        let app_name = CString::new(APPLICATION_NAME)?;
        let engine_name = CString::new(ENGINE_NAME)?;

        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .api_version(vk::API_VERSION_1_0)
            .engine_name(&engine_name)
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .application_version(vk::make_api_version(0, 0, 1, 0));

        let required_extensions = required_extension_names(display_handle, validation)?;
        let supported = unsafe { entry.enumerate_instance_extension_properties(None)? };
        let supported_names = supported
            .iter()
            .map(|extension| extension.extension_name_as_c_str())
            .collect::<Result<Vec<_>, _>>()?;
        let missing = missing_extensions(&required_extensions, &supported_names);
        if !missing.is_empty() {
            return Err(SetupError::ExtensionNotPresent(
                missing
                    .iter()
                    .map(|name| name.to_string_lossy().into_owned())
                    .collect(),
            )
            .into());
        }

        let layer_names = required_layer_names(validation);
        if let Some(layer) = find_missing_layer(entry, &layer_names)? {
            return Err(SetupError::LayerNotPresent(layer).into());
        }

        let extension_names = required_extensions
            .iter()
            .map(|name| name.as_ptr())
            .collect::<Vec<_>>();
        let layer_names_ptrs = layer_names
            .iter()
            .map(|name| name.as_ptr())
            .collect::<Vec<_>>();

        // catches messages from instance creation itself
        let mut debug_messenger_create_info = create_debug_messenger_create_info();
        let mut create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extension_names)
            .enabled_layer_names(&layer_names_ptrs);
        if validation {
            create_info = create_info.push_next(&mut debug_messenger_create_info);
        }

        let instance = unsafe { entry.create_instance(&create_info, None) }
            .context(SetupError::resource(Stage::Instance, "instance", -3))?;
        Ok(Self { instance })
    }

    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe {
            self.instance.destroy_instance(None);
        }
    }
}
