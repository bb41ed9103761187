use std::sync::Arc;

use ash::vk;

use crate::{AshHandle, VkHandle, device::device::Device};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Uint,
    Int,
    Float,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatrixLayout {
    pub stride: u32,
    pub row_major: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NumericType {
    pub scalar: ScalarKind,
    pub rows: u32,
    pub columns: u32,
    pub matrix_layout: Option<MatrixLayout>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerType {
    pub view_type: vk::ImageViewType,
    pub multisampled: bool,
    pub shadow: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructureMember {
    pub name: String,
    pub ty: BindingType,
    pub offset: Option<u32>,
}

/// The reflected type of one descriptor binding, as reported by the shader
/// tool chain. Samplers and buffer-backed data are told apart here; the
/// material layer derives descriptor kinds from this tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindingType {
    Sampler(SamplerType),
    Numeric(NumericType),
    Array {
        element: Box<BindingType>,
        length: u32,
        stride: Option<u32>,
    },
    Structure {
        name: String,
        members: Vec<StructureMember>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderDescriptor {
    pub set: u32,
    pub binding: u32,
    pub name: String,
    pub ty: BindingType,
}

/// Reflection info for one shader stage. Produced outside this crate by
/// whatever compiles and reflects the SPIR-V.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderInfo {
    pub stage: vk::ShaderStageFlags,
    pub descriptors: Vec<ShaderDescriptor>,
}

pub struct ShaderModule {
    device: Arc<Device>,
    module: vk::ShaderModule,
    info: ShaderInfo,
}

impl VkHandle for ShaderModule {
    type Handle = vk::ShaderModule;

    #[inline]
    fn vk_handle(&self) -> Self::Handle {
        self.module
    }
}

impl ShaderModule {
    pub fn new(device: Arc<Device>, spirv: &[u32], info: ShaderInfo) -> Arc<Self> {
        let create_info = vk::ShaderModuleCreateInfo::default().code(spirv);

        let module = unsafe {
            device
                .ash_handle()
                .create_shader_module(&create_info, None)
                .expect("Failed to create shader module")
        };

        Arc::new(Self {
            device,
            module,
            info,
        })
    }

    #[inline]
    pub fn stage(&self) -> vk::ShaderStageFlags {
        self.info.stage
    }

    #[inline]
    pub fn descriptors(&self) -> &[ShaderDescriptor] {
        &self.info.descriptors
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device
                .ash_handle()
                .destroy_shader_module(self.module, None);
        }
    }
}
