use anyhow::Result;
use ash::ext::debug_utils;
use std::ffi::CStr;
use winit::raw_window_handle::RawDisplayHandle;

/// Platform surface extensions for `display_handle`, plus debug utils when
/// validation is on.
pub fn required_extension_names(
    display_handle: RawDisplayHandle,
    validation: bool,
) -> Result<Vec<&'static CStr>> {
    let platform = ash_window::enumerate_required_extensions(display_handle)?;
    let mut names: Vec<&'static CStr> = platform
        .iter()
        .map(|&name| unsafe { CStr::from_ptr(name) })
        .collect();
    if validation {
        names.push(debug_utils::NAME);
    }
    Ok(names)
}

pub fn missing_extensions<'a>(required: &[&'a CStr], available: &[&CStr]) -> Vec<&'a CStr> {
    required
        .iter()
        .filter(|name| !available.contains(*name))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SURFACE: &CStr = ash::khr::surface::NAME;
    const XLIB: &CStr = ash::khr::xlib_surface::NAME;

    #[test]
    fn all_present_means_nothing_missing() {
        let available = [XLIB, debug_utils::NAME, SURFACE];
        let required = [SURFACE, XLIB, debug_utils::NAME];
        assert!(missing_extensions(&required, &available).is_empty());
    }

    #[test]
    fn dropping_any_required_name_is_reported() {
        let required = [SURFACE, XLIB, debug_utils::NAME];
        for removed in 0..required.len() {
            let available: Vec<&CStr> = required
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != removed)
                .map(|(_, name)| *name)
                .collect();
            assert_eq!(
                missing_extensions(&required, &available),
                vec![required[removed]]
            );
        }
    }
}
