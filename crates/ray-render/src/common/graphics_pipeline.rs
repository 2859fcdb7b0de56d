use anyhow::Result;
use ash::vk;

pub struct GraphicsPipeline {
    pipelines: Vec<vk::Pipeline>,
    device: ash::Device,
}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        for &vk_pipeline in self.pipelines.iter() {
            unsafe {
                self.device.destroy_pipeline(vk_pipeline, None);
            }
        }
    }
}

impl GraphicsPipeline {
    /// Creates every pipeline in one call. On partial failure the pipelines
    /// that were created are destroyed before returning.
    pub fn new(
        pipeline_create_infos: &[vk::GraphicsPipelineCreateInfo],
        device: ash::Device,
    ) -> Result<Self> {
        let pipelines = unsafe {
            device.create_graphics_pipelines(vk::PipelineCache::null(), pipeline_create_infos, None)
        };
        match pipelines {
            Ok(pipelines) => Ok(Self { pipelines, device }),
            Err((partial, error)) => {
                for pipeline in partial.into_iter().filter(|p| *p != vk::Pipeline::null()) {
                    unsafe { device.destroy_pipeline(pipeline, None) };
                }
                Err(error.into())
            }
        }
    }

    pub fn vk_pipeline(&self, index: usize) -> vk::Pipeline {
        self.pipelines[index]
    }
}
