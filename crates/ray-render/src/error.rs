use ash::vk;
use thiserror::Error;

/// Setup step that raised an error. Each step numbers its failure sites on
/// its own, so a status is only meaningful together with its stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Instance,
    Device,
    Window,
    RenderSetup,
    RendererCreate,
    Pipeline,
    RenderCommands,
    Texture,
}

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("required instance extensions not present: {0:?}")]
    ExtensionNotPresent(Vec<String>),

    #[error("validation layer {0} not present")]
    LayerNotPresent(String),

    #[error("no discrete or integrated GPU with graphics, compute and transfer queues")]
    NoSuitableDevice,

    #[error("failed to create presentation surface")]
    SurfaceCreation,

    #[error("graphics queue family {family} cannot present to the surface")]
    PresentNotSupported { family: u32 },

    #[error("failed to create swapchain")]
    SwapchainCreation,

    #[error("no memory type in {type_bits:#034b} with {flags:?}")]
    NoMemoryType {
        type_bits: u32,
        flags: vk::MemoryPropertyFlags,
    },

    #[error("{stage:?}: failed to create {resource} (status {status})")]
    ResourceCreation {
        stage: Stage,
        resource: &'static str,
        status: i32,
    },
}

impl SetupError {
    pub fn resource(stage: Stage, resource: &'static str, status: i32) -> Self {
        debug_assert!(status < 0);
        Self::ResourceCreation {
            stage,
            resource,
            status,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Self::ExtensionNotPresent(_) | Self::LayerNotPresent(_) => Stage::Instance,
            Self::NoSuitableDevice => Stage::Device,
            Self::SurfaceCreation | Self::PresentNotSupported { .. } | Self::SwapchainCreation => {
                Stage::Window
            }
            Self::NoMemoryType { .. } => Stage::RendererCreate,
            Self::ResourceCreation { stage, .. } => *stage,
        }
    }

    /// Negative, distinct per failure site within a stage.
    pub fn status(&self) -> i32 {
        match self {
            Self::ExtensionNotPresent(_) => -1,
            Self::LayerNotPresent(_) => -2,
            Self::NoSuitableDevice => -2,
            Self::SurfaceCreation => -1,
            Self::PresentNotSupported { .. } => -2,
            Self::SwapchainCreation => -3,
            Self::NoMemoryType { .. } => -1,
            Self::ResourceCreation { status, .. } => *status,
        }
    }
}

/// Status reported for an error chain: the taxonomy status when one is
/// present, otherwise a generic failure.
pub fn status_of(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<SetupError>()
        .or_else(|| {
            error
                .chain()
                .find_map(|cause| cause.downcast_ref::<SetupError>())
        })
        .map_or(-1, SetupError::status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context as _;

    #[test]
    fn statuses_are_negative() {
        let errors = [
            SetupError::ExtensionNotPresent(vec!["VK_KHR_surface".to_owned()]),
            SetupError::NoSuitableDevice,
            SetupError::SurfaceCreation,
            SetupError::PresentNotSupported { family: 0 },
            SetupError::SwapchainCreation,
            SetupError::resource(Stage::RenderSetup, "command pool", -6),
        ];
        for error in errors.iter() {
            assert!(error.status() < 0, "{error}");
        }
    }

    #[test]
    fn window_sites_are_distinct() {
        let statuses = [
            SetupError::SurfaceCreation.status(),
            SetupError::PresentNotSupported { family: 2 }.status(),
            SetupError::SwapchainCreation.status(),
        ];
        assert_eq!(statuses, [-1, -2, -3]);
        assert_eq!(
            SetupError::PresentNotSupported { family: 2 }.stage(),
            Stage::Window
        );
    }

    #[test]
    fn status_survives_added_context() {
        let result: anyhow::Result<()> = Err(SetupError::NoSuitableDevice.into());
        let error = result.context("initialising device").unwrap_err();
        assert_eq!(status_of(&error), -2);
    }

    #[test]
    fn raw_driver_errors_are_lifted() {
        let result: Result<(), vk::Result> = Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        let error = result
            .context(SetupError::resource(Stage::RenderCommands, "fence", -2))
            .unwrap_err();
        assert_eq!(status_of(&error), -2);
        assert!(error
            .chain()
            .any(|cause| cause.downcast_ref::<vk::Result>().is_some()));
    }

    #[test]
    fn untyped_errors_map_to_generic_failure() {
        let error = anyhow::anyhow!("something else");
        assert_eq!(status_of(&error), -1);
    }
}
