use super::*;
use crate::rhi::definitions::ShaderStage;
use crate::rhi::shader::ShaderReflection;

fn shader(name: &str, stage: ShaderStage, descriptors: Vec<Descriptor>) -> Shader {
    Shader::new(
        name,
        stage,
        "main",
        1,
        ShaderReflection { descriptors, ..Default::default() },
        None,
    )
}

#[test]
fn test_merge_ors_stage_bits_for_shared_slots() {
    let vs = shader("vs", ShaderStage::VERTEX, vec![
        Descriptor::new("frame", DescriptorType::ConstantBuffer, 0, ShaderStage::VERTEX, 256),
    ]);
    let ps = shader("ps", ShaderStage::PIXEL, vec![
        Descriptor::new("frame", DescriptorType::ConstantBuffer, 0, ShaderStage::PIXEL, 256),
        Descriptor::new("albedo", DescriptorType::Texture, 3, ShaderStage::PIXEL, 0),
    ]);

    let merged = merge_descriptors([&vs, &ps]);
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].slot, 0);
    assert_eq!(merged[0].stage, ShaderStage::VERTEX | ShaderStage::PIXEL);
    assert_eq!(merged[1].ty, DescriptorType::Texture);
}

#[test]
fn test_merge_combines_push_constants_and_sorts_them_last() {
    let vs = shader("vs", ShaderStage::VERTEX, vec![
        Descriptor::new("pass", DescriptorType::PushConstantBuffer, 0, ShaderStage::VERTEX, 64),
        Descriptor::new("frame", DescriptorType::ConstantBuffer, 1, ShaderStage::VERTEX, 128),
    ]);
    let ps = shader("ps", ShaderStage::PIXEL, vec![
        Descriptor::new("pass", DescriptorType::PushConstantBuffer, 0, ShaderStage::PIXEL, 96),
    ]);

    let merged = merge_descriptors([&vs, &ps]);
    assert_eq!(merged.len(), 2);
    let push = &merged[1];
    assert_eq!(push.ty, DescriptorType::PushConstantBuffer);
    assert_eq!(push.stage, ShaderStage::VERTEX | ShaderStage::PIXEL);
    assert_eq!(push.struct_size, 96);
}

#[test]
#[should_panic(expected = "declares")]
fn test_merge_conflicting_types_is_fatal() {
    let vs = shader("vs", ShaderStage::VERTEX, vec![
        Descriptor::new("a", DescriptorType::ConstantBuffer, 2, ShaderStage::VERTEX, 16),
    ]);
    let ps = shader("ps", ShaderStage::PIXEL, vec![
        Descriptor::new("b", DescriptorType::Texture, 2, ShaderStage::PIXEL, 0),
    ]);
    merge_descriptors([&vs, &ps]);
}

#[test]
fn test_layout_hash_depends_on_descriptors() {
    let a = vec![Descriptor::new("t", DescriptorType::Texture, 0, ShaderStage::PIXEL, 0)];
    let b = vec![Descriptor::new("t", DescriptorType::Texture, 1, ShaderStage::PIXEL, 0)];
    assert_eq!(descriptors_hash(&a), descriptors_hash(&a.clone()));
    assert_ne!(descriptors_hash(&a), descriptors_hash(&b));
}

#[test]
fn test_layout_drop_enqueues_handle() {
    let queue = Arc::new(DeletionQueue::new());
    let layout = DescriptorSetLayout::new(
        "layout",
        vec![Descriptor::new("t", DescriptorType::Texture, 4, ShaderStage::PIXEL, 0)],
        77,
        Some(queue.clone()),
    );
    assert!(layout.descriptor_at(4).is_some());
    assert!(layout.descriptor_at(0).is_none());

    drop(layout);
    assert_eq!(queue.count(ResourceType::DescriptorSetLayout), 1);
}
