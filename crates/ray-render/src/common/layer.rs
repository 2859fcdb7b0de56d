use anyhow::Result;
use std::ffi::CStr;

pub const LAYER_KHRONOS_VALIDATION: &CStr = c"VK_LAYER_KHRONOS_validation";

pub fn required_layer_names(validation: bool) -> Vec<&'static CStr> {
    if validation {
        vec![LAYER_KHRONOS_VALIDATION]
    } else {
        vec![]
    }
}

/// First required layer the loader does not expose, if any.
pub fn find_missing_layer(entry: &ash::Entry, layer_names: &[&CStr]) -> Result<Option<String>> {
    let layer_properties = unsafe { entry.enumerate_instance_layer_properties()? };

    if layer_properties.is_empty() {
        log::warn!("No available layers.");
    } else {
        log::debug!("Instance Available Layers: ");
        for layer in layer_properties.iter() {
            log::debug!("\t{:?}", layer.layer_name_as_c_str()?);
        }
    }

    let available = layer_properties
        .iter()
        .map(|layer| layer.layer_name_as_c_str())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(layer_names
        .iter()
        .find(|name| !available.contains(*name))
        .map(|name| name.to_string_lossy().into_owned()))
}
