/// Compiled shader objects and their reflection data

use std::sync::Arc;
use crate::rhi::definitions::{
    generate_object_id, DescriptorType, Format, ObjectId, ResourceType, RhiHandle, ShaderStage,
    NULL_HANDLE,
};
use crate::rhi::deletion_queue::DeletionQueue;

/// One vertex input attribute reported by reflection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub name: String,
    pub location: u32,
    pub binding: u32,
    pub format: Format,
    pub offset: u32,
}

/// Vertex input layout of a vertex shader
///
/// Attributes are tightly packed in location order; `vertex_size` is the
/// stride of binding 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct InputLayout {
    attributes: Vec<VertexAttribute>,
    vertex_size: u32,
}

impl InputLayout {
    /// Build a packed layout from (name, location, format) triples
    pub fn packed(inputs: &[(&str, u32, Format)]) -> Self {
        let mut sorted: Vec<_> = inputs.to_vec();
        sorted.sort_by_key(|(_, location, _)| *location);

        let mut offset = 0;
        let attributes = sorted
            .into_iter()
            .map(|(name, location, format)| {
                let attribute = VertexAttribute {
                    name: name.to_string(),
                    location,
                    binding: 0,
                    format,
                    offset,
                };
                offset += format.bytes_per_texel();
                attribute
            })
            .collect();

        Self { attributes, vertex_size: offset }
    }

    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    pub fn vertex_size(&self) -> u32 {
        self.vertex_size
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// A resource binding a shader expects
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Descriptor {
    pub name: String,
    pub ty: DescriptorType,
    /// Binding slot inside descriptor set 0
    pub slot: u32,
    pub stage: ShaderStage,
    /// Byte size of the struct (constant and push-constant buffers)
    pub struct_size: u32,
    /// Array length (1 for non-arrays)
    pub array_length: u32,
}

impl Descriptor {
    pub fn new(name: &str, ty: DescriptorType, slot: u32, stage: ShaderStage, struct_size: u32) -> Self {
        Self {
            name: name.to_string(),
            ty,
            slot,
            stage,
            struct_size,
            array_length: 1,
        }
    }
}

/// Reflection output of a backend
#[derive(Debug, Clone, Default)]
pub struct ShaderReflection {
    pub input_layout: InputLayout,
    pub descriptors: Vec<Descriptor>,
}

/// Shader creation descriptor
#[derive(Debug, Clone)]
pub struct ShaderDesc<'a> {
    /// Exactly one stage bit
    pub stage: ShaderStage,
    /// SPIR-V words
    pub code: &'a [u32],
    pub entry_point: &'a str,
    pub name: &'a str,
}

/// Compiled shader module
pub struct Shader {
    id: ObjectId,
    name: String,
    stage: ShaderStage,
    entry_point: String,
    module: RhiHandle,
    reflection: ShaderReflection,
    deletion_queue: Option<Arc<DeletionQueue>>,
}

impl Shader {
    /// Wrap a compiled backend module
    ///
    /// # Arguments
    ///
    /// * `module` - Backend module handle (may be null for shaders that failed to compile)
    /// * `deletion_queue` - Queue receiving the module on drop, None when nothing owns a backend object
    pub fn new(
        name: &str,
        stage: ShaderStage,
        entry_point: &str,
        module: RhiHandle,
        reflection: ShaderReflection,
        deletion_queue: Option<Arc<DeletionQueue>>,
    ) -> Self {
        Self {
            id: generate_object_id(),
            name: name.to_string(),
            stage,
            entry_point: entry_point.to_string(),
            module,
            reflection,
            deletion_queue,
        }
    }

    pub fn object_id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn rhi_module(&self) -> RhiHandle {
        self.module
    }

    /// True when the backend module exists and an entry point is known
    pub fn is_compiled(&self) -> bool {
        self.module != NULL_HANDLE && !self.entry_point.is_empty()
    }

    pub fn input_layout(&self) -> &InputLayout {
        &self.reflection.input_layout
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.reflection.descriptors
    }
}

impl std::fmt::Debug for Shader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shader")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("stage", &self.stage)
            .field("entry_point", &self.entry_point)
            .finish()
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        if let Some(queue) = &self.deletion_queue {
            queue.add(ResourceType::Shader, self.module);
        }
    }
}
