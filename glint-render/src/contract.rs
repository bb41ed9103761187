use std::sync::Arc;

use glint_rhi::{
    descriptor::{DescriptorBinding, DescriptorSetLayout},
    device::Device,
    pipeline::PipelineLayout,
    render_pass::RenderPass,
};

#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("render pass does not belong to this contract")]
    PassNotInContract,
}

/// The fixed agreement every material in a scene compiles against: which
/// render passes a frame executes, in which order, and which descriptor-set
/// layouts are bound once per frame and shared by all of them. Immutable
/// after construction; materials are only interchangeable when built against
/// the same contract instance.
pub struct RenderingContract {
    render_passes: Vec<Arc<RenderPass>>,
    shared_layouts: Vec<Arc<DescriptorSetLayout>>,
    shared_pipeline_layout: Arc<PipelineLayout>,
}

impl RenderingContract {
    pub fn new(
        device: &Arc<Device>,
        render_passes: Vec<Arc<RenderPass>>,
        shared_sets: Vec<Vec<DescriptorBinding>>,
    ) -> Arc<Self> {
        let shared_layouts: Vec<Arc<DescriptorSetLayout>> = shared_sets
            .into_iter()
            .map(|bindings| DescriptorSetLayout::new(device.clone(), bindings))
            .collect();

        // Layout-compatibility probe covering only the shared sets. Binding
        // the shared sets through it keeps them valid across every
        // material's own pipeline layout.
        let layout_refs: Vec<&Arc<DescriptorSetLayout>> = shared_layouts.iter().collect();
        let shared_pipeline_layout = PipelineLayout::new(device.clone(), &layout_refs);

        Arc::new(Self {
            render_passes,
            shared_layouts,
            shared_pipeline_layout,
        })
    }

    #[inline]
    pub fn render_passes(&self) -> &[Arc<RenderPass>] {
        &self.render_passes
    }

    #[inline]
    pub fn shared_layouts(&self) -> &[Arc<DescriptorSetLayout>] {
        &self.shared_layouts
    }

    #[inline]
    pub fn shared_set_count(&self) -> usize {
        self.shared_layouts.len()
    }

    #[inline]
    pub(crate) fn shared_pipeline_layout(&self) -> &Arc<PipelineLayout> {
        &self.shared_pipeline_layout
    }

    /// Resolves a render pass to its position in the contract, which is also
    /// the index of every material's pipeline variant for that pass.
    pub fn pass_index(&self, render_pass: &Arc<RenderPass>) -> Result<usize, ContractError> {
        self.render_passes
            .iter()
            .position(|pass| Arc::ptr_eq(pass, render_pass))
            .ok_or(ContractError::PassNotInContract)
    }
}
