use std::sync::Arc;

use ash::vk;
use log::debug;
use smallvec::SmallVec;

use glint_rhi::{
    VkHandle,
    descriptor::{DescriptorBinding, DescriptorSetLayout, DescriptorType},
    device::Device,
    pipeline::{
        GraphicsPipeline, GraphicsPipelineCreateInfo, PipelineLayout, PipelineShaderStage,
        VertexFormat,
    },
    shader::{BindingType, ShaderModule},
};

use crate::contract::RenderingContract;

#[derive(Debug, thiserror::Error)]
pub enum MaterialError {
    #[error("shader stages disagree on the descriptor type of per-object binding {binding}")]
    DescriptorTypeMismatch { binding: u32 },
    #[error("shader stages disagree on the descriptor count of per-object binding {binding}")]
    DescriptorCountMismatch { binding: u32 },
}

pub struct MaterialCreateInfo {
    pub vertex_format: Arc<VertexFormat>,
    pub stages: Vec<Arc<ShaderModule>>,
    pub depth_write: bool,
    pub depth_test: bool,
    pub src_blend_factor: vk::BlendFactor,
    pub dst_blend_factor: vk::BlendFactor,
}

/// One surface appearance compiled against a contract: a per-object
/// descriptor-set layout merged from the shader stages, and one pipeline per
/// contract render pass. The pipeline at index i is valid only for the
/// contract's pass at index i.
pub struct Material {
    contract: Arc<RenderingContract>,
    per_object_layout: Arc<DescriptorSetLayout>,
    pipeline_layout: Arc<PipelineLayout>,
    pipelines: Vec<GraphicsPipeline>,
}

/// Derives the layout binding for a reflected type. Arrays multiply the
/// descriptor count of their element; samplers become combined image
/// samplers; everything buffer-shaped becomes a uniform buffer.
fn derive_binding(
    binding: u32,
    ty: &BindingType,
    stage_flags: vk::ShaderStageFlags,
) -> DescriptorBinding {
    match ty {
        BindingType::Array {
            element, length, ..
        } => {
            let mut derived = derive_binding(binding, element, stage_flags);
            derived.descriptor_count *= length;
            derived
        }
        BindingType::Sampler(_) => DescriptorBinding {
            binding,
            descriptor_type: DescriptorType::CombinedImageSampler,
            descriptor_count: 1,
            stage_flags,
        },
        BindingType::Numeric(_) | BindingType::Structure { .. } => DescriptorBinding {
            binding,
            descriptor_type: DescriptorType::UniformBuffer,
            descriptor_count: 1,
            stage_flags,
        },
    }
}

/// Folds a stage's binding into the merged per-object set. Bindings declared
/// by several stages must agree on type and count; their visibility is OR'd.
fn merge_binding(
    merged: &mut Vec<DescriptorBinding>,
    binding: DescriptorBinding,
) -> Result<(), MaterialError> {
    for existing in merged.iter_mut() {
        if existing.binding != binding.binding {
            continue;
        }
        if existing.descriptor_type != binding.descriptor_type {
            return Err(MaterialError::DescriptorTypeMismatch {
                binding: binding.binding,
            });
        }
        if existing.descriptor_count != binding.descriptor_count {
            return Err(MaterialError::DescriptorCountMismatch {
                binding: binding.binding,
            });
        }
        existing.stage_flags |= binding.stage_flags;
        return Ok(());
    }
    merged.push(binding);
    Ok(())
}

impl Material {
    pub fn new(
        device: &Arc<Device>,
        contract: Arc<RenderingContract>,
        create_info: MaterialCreateInfo,
    ) -> Result<Arc<Self>, MaterialError> {
        // Shared sets occupy indices 0..k-1, so the per-object set is always
        // index k and reflected bindings for lower sets belong to the
        // contract, not the material.
        let per_object_set_index = contract.shared_set_count() as u32;

        let mut per_object_bindings = Vec::new();
        let mut stages: SmallVec<[PipelineShaderStage; 4]> = SmallVec::new();
        let mut vertex_domain_stages: SmallVec<[PipelineShaderStage; 4]> = SmallVec::new();

        for module in &create_info.stages {
            let stage = PipelineShaderStage {
                stage: module.stage(),
                module: module.vk_handle(),
            };
            stages.push(stage);
            if !module.stage().contains(vk::ShaderStageFlags::FRAGMENT) {
                vertex_domain_stages.push(stage);
            }

            for descriptor in module.descriptors() {
                if descriptor.set != per_object_set_index {
                    continue;
                }
                let derived = derive_binding(descriptor.binding, &descriptor.ty, module.stage());
                merge_binding(&mut per_object_bindings, derived)?;
            }
        }

        let per_object_layout = DescriptorSetLayout::new(device.clone(), per_object_bindings);

        let mut set_layouts: Vec<&Arc<DescriptorSetLayout>> =
            contract.shared_layouts().iter().collect();
        set_layouts.push(&per_object_layout);
        let pipeline_layout = PipelineLayout::new(device.clone(), &set_layouts);

        let pipelines: Vec<GraphicsPipeline> = contract
            .render_passes()
            .iter()
            .map(|render_pass| {
                // Depth-only passes have no color output; the fragment stage
                // is left out entirely.
                let pass_stages: &[PipelineShaderStage] = if render_pass.has_color_attachments() {
                    &stages
                } else {
                    &vertex_domain_stages
                };

                GraphicsPipeline::new(
                    device.clone(),
                    GraphicsPipelineCreateInfo {
                        stages: pass_stages,
                        vertex_format: &create_info.vertex_format,
                        layout: &pipeline_layout,
                        render_pass,
                        depth_write: create_info.depth_write,
                        depth_test: create_info.depth_test,
                        src_blend_factor: create_info.src_blend_factor,
                        dst_blend_factor: create_info.dst_blend_factor,
                    },
                )
            })
            .collect();

        debug!(
            "compiled material: {} pipelines, {} per-object bindings",
            pipelines.len(),
            per_object_layout.bindings().len()
        );

        Ok(Arc::new(Self {
            contract,
            per_object_layout,
            pipeline_layout,
            pipelines,
        }))
    }

    #[inline]
    pub fn contract(&self) -> &Arc<RenderingContract> {
        &self.contract
    }

    #[inline]
    pub fn per_object_layout(&self) -> &Arc<DescriptorSetLayout> {
        &self.per_object_layout
    }

    #[inline]
    pub fn pipeline_layout(&self) -> &Arc<PipelineLayout> {
        &self.pipeline_layout
    }

    /// Pipeline variant for the contract render pass at `pass_index`.
    #[inline]
    pub fn pipeline(&self, pass_index: usize) -> &GraphicsPipeline {
        &self.pipelines[pass_index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_rhi::shader::{NumericType, SamplerType, ScalarKind};

    fn mat4() -> BindingType {
        BindingType::Numeric(NumericType {
            scalar: ScalarKind::Float,
            rows: 4,
            columns: 4,
            matrix_layout: None,
        })
    }

    fn shadow_sampler() -> BindingType {
        BindingType::Sampler(SamplerType {
            view_type: vk::ImageViewType::TYPE_2D,
            multisampled: false,
            shadow: true,
        })
    }

    #[test]
    fn numeric_and_structure_bindings_become_uniform_buffers() {
        let derived = derive_binding(2, &mat4(), vk::ShaderStageFlags::VERTEX);
        assert_eq!(derived.descriptor_type, DescriptorType::UniformBuffer);
        assert_eq!(derived.descriptor_count, 1);

        let structure = BindingType::Structure {
            name: "Lighting".into(),
            members: Vec::new(),
        };
        let derived = derive_binding(0, &structure, vk::ShaderStageFlags::FRAGMENT);
        assert_eq!(derived.descriptor_type, DescriptorType::UniformBuffer);
    }

    #[test]
    fn sampler_bindings_become_combined_image_samplers() {
        let derived = derive_binding(1, &shadow_sampler(), vk::ShaderStageFlags::FRAGMENT);
        assert_eq!(derived.descriptor_type, DescriptorType::CombinedImageSampler);
        assert_eq!(derived.descriptor_count, 1);
    }

    #[test]
    fn nested_arrays_multiply_descriptor_counts() {
        let ty = BindingType::Array {
            element: Box::new(BindingType::Array {
                element: Box::new(shadow_sampler()),
                length: 4,
                stride: None,
            }),
            length: 2,
            stride: None,
        };

        let derived = derive_binding(3, &ty, vk::ShaderStageFlags::FRAGMENT);
        assert_eq!(derived.descriptor_type, DescriptorType::CombinedImageSampler);
        assert_eq!(derived.descriptor_count, 8);
    }

    #[test]
    fn merging_the_same_binding_ors_stage_visibility() {
        let mut merged = Vec::new();
        merge_binding(
            &mut merged,
            derive_binding(3, &mat4(), vk::ShaderStageFlags::VERTEX),
        )
        .unwrap();
        merge_binding(
            &mut merged,
            derive_binding(3, &mat4(), vk::ShaderStageFlags::FRAGMENT),
        )
        .unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(
            merged[0].stage_flags,
            vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT
        );
    }

    #[test]
    fn stages_disagreeing_on_type_fail_to_merge() {
        let mut merged = Vec::new();
        merge_binding(
            &mut merged,
            derive_binding(3, &mat4(), vk::ShaderStageFlags::VERTEX),
        )
        .unwrap();

        let err = merge_binding(
            &mut merged,
            derive_binding(3, &shadow_sampler(), vk::ShaderStageFlags::FRAGMENT),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MaterialError::DescriptorTypeMismatch { binding: 3 }
        ));
    }

    #[test]
    fn stages_disagreeing_on_count_fail_to_merge() {
        let array_of = |length| BindingType::Array {
            element: Box::new(mat4()),
            length,
            stride: None,
        };

        let mut merged = Vec::new();
        merge_binding(
            &mut merged,
            derive_binding(1, &array_of(2), vk::ShaderStageFlags::VERTEX),
        )
        .unwrap();

        let err = merge_binding(
            &mut merged,
            derive_binding(1, &array_of(3), vk::ShaderStageFlags::FRAGMENT),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MaterialError::DescriptorCountMismatch { binding: 1 }
        ));
    }

    #[test]
    fn distinct_bindings_do_not_merge() {
        let mut merged = Vec::new();
        merge_binding(
            &mut merged,
            derive_binding(0, &mat4(), vk::ShaderStageFlags::VERTEX),
        )
        .unwrap();
        merge_binding(
            &mut merged,
            derive_binding(1, &shadow_sampler(), vk::ShaderStageFlags::FRAGMENT),
        )
        .unwrap();

        assert_eq!(merged.len(), 2);
    }
}
