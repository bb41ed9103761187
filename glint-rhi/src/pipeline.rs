use std::{ffi::CStr, sync::Arc};

use ash::vk;

use crate::{
    AshHandle, VkHandle, descriptor::DescriptorSetLayout, device::device::Device,
    render_pass::RenderPass,
};

/// Vertex fetch layout shared by every pipeline compiled for a material.
#[derive(Debug, Clone, Default)]
pub struct VertexFormat {
    pub bindings: Vec<vk::VertexInputBindingDescription>,
    pub attributes: Vec<vk::VertexInputAttributeDescription>,
}

impl VertexFormat {
    pub fn new(
        bindings: Vec<vk::VertexInputBindingDescription>,
        attributes: Vec<vk::VertexInputAttributeDescription>,
    ) -> Arc<Self> {
        Arc::new(Self {
            bindings,
            attributes,
        })
    }
}

pub struct PipelineLayout {
    device: Arc<Device>,
    layout: vk::PipelineLayout,
}

impl VkHandle for PipelineLayout {
    type Handle = vk::PipelineLayout;

    #[inline]
    fn vk_handle(&self) -> Self::Handle {
        self.layout
    }
}

impl PipelineLayout {
    pub fn new(device: Arc<Device>, set_layouts: &[&Arc<DescriptorSetLayout>]) -> Arc<Self> {
        let vk_set_layouts: Vec<vk::DescriptorSetLayout> = set_layouts
            .iter()
            .map(|layout| layout.vk_handle())
            .collect();

        let create_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&vk_set_layouts);

        let layout = unsafe {
            device
                .ash_handle()
                .create_pipeline_layout(&create_info, None)
                .expect("Failed to create pipeline layout")
        };

        Arc::new(Self { device, layout })
    }
}

impl Drop for PipelineLayout {
    fn drop(&mut self) {
        unsafe {
            self.device
                .ash_handle()
                .destroy_pipeline_layout(self.layout, None);
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineShaderStage {
    pub stage: vk::ShaderStageFlags,
    pub module: vk::ShaderModule,
}

pub struct GraphicsPipelineCreateInfo<'a> {
    pub stages: &'a [PipelineShaderStage],
    pub vertex_format: &'a VertexFormat,
    pub layout: &'a PipelineLayout,
    pub render_pass: &'a RenderPass,
    pub depth_write: bool,
    pub depth_test: bool,
    pub src_blend_factor: vk::BlendFactor,
    pub dst_blend_factor: vk::BlendFactor,
}

pub struct GraphicsPipeline {
    device: Arc<Device>,
    pipeline: vk::Pipeline,
}

impl VkHandle for GraphicsPipeline {
    type Handle = vk::Pipeline;

    #[inline]
    fn vk_handle(&self) -> Self::Handle {
        self.pipeline
    }
}

const SHADER_ENTRY_POINT: &CStr = c"main";

impl GraphicsPipeline {
    /// Bakes one pipeline for one render pass. Viewport and scissor are left
    /// dynamic; they are set when commands are recorded against a concrete
    /// framebuffer.
    pub fn new(device: Arc<Device>, create_info: GraphicsPipelineCreateInfo) -> Self {
        let stages: Vec<vk::PipelineShaderStageCreateInfo> = create_info
            .stages
            .iter()
            .map(|stage| {
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(stage.stage)
                    .module(stage.module)
                    .name(SHADER_ENTRY_POINT)
            })
            .collect();

        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&create_info.vertex_format.bindings)
            .vertex_attribute_descriptions(&create_info.vertex_format.attributes);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let cull_mode = if create_info.render_pass.inverts_faces() {
            vk::CullModeFlags::FRONT
        } else {
            vk::CullModeFlags::BACK
        };

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(vk::PolygonMode::FILL)
            .cull_mode(cull_mode)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .line_width(1.0);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(create_info.depth_test)
            .depth_write_enable(create_info.depth_write)
            .depth_compare_op(vk::CompareOp::LESS);

        // Blending only applies to passes that actually have color output.
        let blend_enable = create_info.src_blend_factor != vk::BlendFactor::ONE
            || create_info.dst_blend_factor != vk::BlendFactor::ZERO;
        let color_blend_attachment = vk::PipelineColorBlendAttachmentState::default()
            .blend_enable(blend_enable)
            .src_color_blend_factor(create_info.src_blend_factor)
            .dst_color_blend_factor(create_info.dst_blend_factor)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(create_info.src_blend_factor)
            .dst_alpha_blend_factor(create_info.dst_blend_factor)
            .alpha_blend_op(vk::BlendOp::ADD)
            .color_write_mask(vk::ColorComponentFlags::RGBA);

        let color_blend_attachments = if create_info.render_pass.has_color_attachments() {
            std::slice::from_ref(&color_blend_attachment)
        } else {
            &[]
        };

        let color_blend_state =
            vk::PipelineColorBlendStateCreateInfo::default().attachments(color_blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .depth_stencil_state(&depth_stencil_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(create_info.layout.vk_handle())
            .render_pass(create_info.render_pass.vk_handle())
            .subpass(0);

        let pipeline = unsafe {
            device
                .ash_handle()
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
                .expect("Failed to create graphics pipeline")[0]
        };

        Self { device, pipeline }
    }
}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        unsafe {
            self.device
                .ash_handle()
                .destroy_pipeline(self.pipeline, None);
        }
    }
}
