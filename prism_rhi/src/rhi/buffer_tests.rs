use super::*;

fn buffer(usage: BufferUsage, stride: u32, count: u32) -> Buffer {
    let desc = BufferDesc::new("test", usage, stride, count);
    let size = desc.size();
    Buffer::new(desc, size, 5, None)
}

#[test]
fn test_desc_size() {
    assert_eq!(BufferDesc::new("quad", BufferUsage::Vertex, 32, 4).size(), 128);
}

#[test]
fn test_index_width() {
    assert!(IndexBuffer::new(buffer(BufferUsage::Index, 2, 6)).is_16bit());
    assert!(!IndexBuffer::new(buffer(BufferUsage::Index, 4, 6)).is_16bit());
}

#[test]
fn test_typed_buffer_derefs_to_buffer() {
    let vb = VertexBuffer::new(buffer(BufferUsage::Vertex, 32, 3));
    assert_eq!(vb.stride(), 32);
    assert_eq!(vb.size_gpu(), 96);
    assert_eq!(vb.rhi_handle(), 5);
}

#[test]
fn test_each_buffer_has_its_own_identity() {
    let a = VertexBuffer::new(buffer(BufferUsage::Vertex, 32, 3));
    let b = VertexBuffer::new(buffer(BufferUsage::Vertex, 32, 3));
    assert_ne!(a.object_id(), b.object_id());
}

#[test]
#[should_panic(expected = "expected Vertex")]
fn test_wrong_usage_is_fatal() {
    VertexBuffer::new(buffer(BufferUsage::Index, 2, 3));
}

#[test]
fn test_drop_enqueues_buffer() {
    let queue = Arc::new(DeletionQueue::new());
    let desc = BufferDesc::new("cb", BufferUsage::Constant, 256, 1);
    drop(ConstantBuffer::new(Buffer::new(desc, 256, 9, Some(queue.clone()))));
    assert_eq!(queue.count(ResourceType::Buffer), 1);
}
