use super::render_pass::VulkanRenderPass;
use super::shader::ShaderModule;
use super::{device::VulkanDevice, swapchain::VulkanSwapchain};
use crate::config::RendererConfig;
use crate::error::{RendererError, Result};
use log::*;
use vulkanalia::vk::{self, DeviceV1_0, Handle, HasBuilder};
use vulkanalia::Device;

/// The fixed triangle pipeline and its (empty) layout.
#[derive(Debug)]
pub struct VulkanPipeline {
    device: Device,
    pub layout: vk::PipelineLayout,
    pub handle: vk::Pipeline,
}

impl VulkanPipeline {
    pub unsafe fn create(
        device: &VulkanDevice,
        swapchain: &VulkanSwapchain,
        render_pass: &VulkanRenderPass,
        config: &RendererConfig,
    ) -> Result<VulkanPipeline> {
        // Dropped at the end of this function, once the pipeline is linked.
        let vertex_shader_module = ShaderModule::load(device, &config.vertex_shader)?;
        let fragment_shader_module = ShaderModule::load(device, &config.fragment_shader)?;

        let vert_stage = vk::PipelineShaderStageCreateInfo::builder()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(vertex_shader_module.handle)
            .name(b"main\0");

        let frag_stage = vk::PipelineShaderStageCreateInfo::builder()
            .stage(vk::ShaderStageFlags::FRAGMENT)
            .module(fragment_shader_module.handle)
            .name(b"main\0");

        // Vertices are generated in the vertex shader.
        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::builder();
        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        let viewport = vk::Viewport::builder()
            .x(0.0)
            .y(0.0)
            .width(swapchain.extent.width as f32)
            .height(swapchain.extent.height as f32)
            .min_depth(0.0)
            .max_depth(1.0);

        let scissor = vk::Rect2D::builder()
            .offset(vk::Offset2D { x: 0, y: 0 })
            .extent(swapchain.extent);

        let viewports = &[viewport];
        let scissors = &[scissor];
        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewports(viewports)
            .scissors(scissors);

        // rasterizer
        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::BACK)
            .front_face(vk::FrontFace::CLOCKWISE)
            .depth_bias_enable(false);

        // multisampling
        let multisample_state = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::_1);

        // color blending
        let attachments = &[color_blend_attachment()];
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .logic_op(vk::LogicOp::COPY)
            .attachments(attachments)
            .blend_constants([0.0, 0.0, 0.0, 0.0]);

        // layout
        let layout_info = vk::PipelineLayoutCreateInfo::builder();
        let layout = device
            .vk_device
            .create_pipeline_layout(&layout_info, None)?;

        let mut pipeline = VulkanPipeline {
            device: device.vk_device.clone(),
            layout,
            handle: vk::Pipeline::null(),
        };

        let stages = &[vert_stage, frag_stage];
        let info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .layout(pipeline.layout)
            .render_pass(render_pass.handle)
            .subpass(0)
            .base_pipeline_handle(vk::Pipeline::null())
            .base_pipeline_index(-1);

        pipeline.handle = device
            .vk_device
            .create_graphics_pipelines(vk::PipelineCache::null(), &[info], None)
            .map_err(RendererError::PipelineCreationFailed)?
            .0[0];
        debug!("Created graphics pipeline.");

        Ok(pipeline)
    }
}

impl Drop for VulkanPipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.handle, None);
            self.device.destroy_pipeline_layout(self.layout, None);
        }
        debug!("Destroyed graphics pipeline.");
    }
}

/// Standard alpha blending on all four channels:
/// `src * src_alpha + dst * (1 - src_alpha)` for color, `src` for alpha.
pub fn color_blend_attachment() -> vk::PipelineColorBlendAttachmentState {
    vk::PipelineColorBlendAttachmentState::builder()
        .color_write_mask(vk::ColorComponentFlags::all())
        .blend_enable(true)
        .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
        .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
        .color_blend_op(vk::BlendOp::ADD)
        .src_alpha_blend_factor(vk::BlendFactor::ONE)
        .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
        .alpha_blend_op(vk::BlendOp::ADD)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blending_writes_every_channel() {
        let attachment = color_blend_attachment();

        assert_eq!(attachment.blend_enable, vk::TRUE);
        assert_eq!(
            attachment.color_write_mask,
            vk::ColorComponentFlags::R
                | vk::ColorComponentFlags::G
                | vk::ColorComponentFlags::B
                | vk::ColorComponentFlags::A
        );
    }

    #[test]
    fn alpha_is_replaced_not_blended() {
        let attachment = color_blend_attachment();

        assert_eq!(attachment.src_color_blend_factor, vk::BlendFactor::SRC_ALPHA);
        assert_eq!(
            attachment.dst_color_blend_factor,
            vk::BlendFactor::ONE_MINUS_SRC_ALPHA
        );
        assert_eq!(attachment.src_alpha_blend_factor, vk::BlendFactor::ONE);
        assert_eq!(attachment.dst_alpha_blend_factor, vk::BlendFactor::ZERO);
    }
}
