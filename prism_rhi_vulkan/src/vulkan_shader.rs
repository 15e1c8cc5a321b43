/// Shader modules and SPIR-V reflection (spirq)
///
/// Reflection produces the core `ShaderReflection`: the packed vertex input
/// layout of a vertex shader and every descriptor of set 0. Sets 1 and 2
/// belong to the device's fixed sampler sets and are not reflected.

use ash::vk;
use ash::vk::Handle;
use prism_rhi::prism::rhi::{
    Descriptor, DescriptorType, Format, InputLayout, RhiHandle, ShaderDesc, ShaderReflection,
    ShaderStage, SET_INDEX_RESOURCES,
};
use prism_rhi::prism::Result;
use prism_rhi::{rhi_bail, rhi_err};
use spirq::ty::{DescriptorType as SpirqDescriptorType, ScalarType, Type};
use spirq::var::Variable;

use crate::vulkan_context::{GpuContext, LOG_SOURCE};

/// Create a shader module and reflect it
pub(crate) fn create_shader(ctx: &GpuContext, desc: &ShaderDesc) -> Result<(RhiHandle, ShaderReflection)> {
    let reflection = reflect(desc.code, desc.stage, desc.entry_point)?;

    let create_info = vk::ShaderModuleCreateInfo::default().code(desc.code);
    let module = unsafe { ctx.device.create_shader_module(&create_info, None) }
        .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to create shader module '{}': {:?}", desc.name, e))?;

    prism_rhi::rhi_debug!(LOG_SOURCE, "Shader '{}' reflected: {} input(s), {} descriptor(s)",
        desc.name, reflection.input_layout.attributes().len(), reflection.descriptors.len());

    Ok((module.as_raw(), reflection))
}

/// Reflect one entry point of a SPIR-V module
pub(crate) fn reflect(code: &[u32], stage: ShaderStage, entry_point: &str) -> Result<ShaderReflection> {
    let entry_points = spirq::ReflectConfig::new()
        .spv(code)
        .ref_all_rscs(true)
        .reflect()
        .map_err(|e| rhi_err!(LOG_SOURCE, "SPIR-V reflection failed: {:?}", e))?;

    let Some(entry) = entry_points.iter().find(|ep| ep.name == entry_point) else {
        rhi_bail!(LOG_SOURCE, "SPIR-V module has no entry point named '{}'", entry_point);
    };

    let mut inputs: Vec<(String, u32, Format)> = Vec::new();
    let mut descriptors: Vec<Descriptor> = Vec::new();

    for var in entry.vars.iter() {
        match var {
            Variable::Input { name, location, ty } if stage == ShaderStage::VERTEX => {
                let name = name.clone().unwrap_or_default();
                let format = vertex_format(ty).ok_or_else(|| {
                    rhi_err!(LOG_SOURCE, "Vertex input '{}' has an unsupported type {:?}", name, ty)
                })?;
                inputs.push((name, location.loc(), format));
            }
            Variable::Descriptor { name, desc_bind, desc_ty, ty, nbind } => {
                if desc_bind.set() != SET_INDEX_RESOURCES {
                    continue;
                }
                let name = name.clone().unwrap_or_default();
                let Some(descriptor_type) = descriptor_type(desc_ty) else {
                    rhi_bail!(LOG_SOURCE, "Descriptor '{}' has an unsupported type {:?}", name, desc_ty);
                };
                let struct_size = ty.nbyte().unwrap_or(0) as u32;
                let mut descriptor = Descriptor::new(&name, descriptor_type, desc_bind.bind(), stage, struct_size);
                descriptor.array_length = (*nbind).max(1);
                descriptors.push(descriptor);
            }
            Variable::PushConstant { name, ty } => {
                let name = name.clone().unwrap_or_default();
                let struct_size = ty.nbyte().unwrap_or(0) as u32;
                descriptors.push(Descriptor::new(&name, DescriptorType::PushConstantBuffer, 0, stage, struct_size));
            }
            _ => {}
        }
    }

    let inputs: Vec<(&str, u32, Format)> = inputs
        .iter()
        .map(|(name, location, format)| (name.as_str(), *location, *format))
        .collect();

    Ok(ShaderReflection {
        input_layout: InputLayout::packed(&inputs),
        descriptors,
    })
}

/// Map a reflected descriptor type onto the core's descriptor types
fn descriptor_type(desc_ty: &SpirqDescriptorType) -> Option<DescriptorType> {
    match desc_ty {
        SpirqDescriptorType::Sampler() => Some(DescriptorType::Sampler),
        SpirqDescriptorType::SampledImage() => Some(DescriptorType::Texture),
        SpirqDescriptorType::StorageImage(..) => Some(DescriptorType::TextureStorage),
        SpirqDescriptorType::UniformBuffer() => Some(DescriptorType::ConstantBuffer),
        SpirqDescriptorType::StorageBuffer(..) => Some(DescriptorType::StructuredBuffer),
        _ => None,
    }
}

/// Vertex attribute format of a reflected input type
fn vertex_format(ty: &Type) -> Option<Format> {
    let (scalar, count) = match ty {
        Type::Scalar(scalar) => (scalar, 1),
        Type::Vector(vector) => (&vector.scalar_ty, vector.nscalar),
        _ => return None,
    };

    let formats = match scalar {
        ScalarType::Float { bits: 32 } => [
            Format::R32_Float,
            Format::R32G32_Float,
            Format::R32G32B32_Float,
            Format::R32G32B32A32_Float,
        ],
        ScalarType::Integer { bits: 32, is_signed: false } => [
            Format::R32_Uint,
            Format::R32G32_Uint,
            Format::R32G32B32_Uint,
            Format::R32G32B32A32_Uint,
        ],
        ScalarType::Integer { bits: 32, is_signed: true } => [
            Format::R32_Sint,
            Format::R32G32_Sint,
            Format::R32G32B32_Sint,
            Format::R32G32B32A32_Sint,
        ],
        _ => return None,
    };

    (count as usize).checked_sub(1).and_then(|index| formats.get(index).copied())
}

#[cfg(test)]
#[path = "vulkan_shader_tests.rs"]
mod tests;
