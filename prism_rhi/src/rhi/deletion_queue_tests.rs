use super::*;
use std::sync::Arc;

#[test]
fn test_null_handles_are_ignored() {
    let queue = DeletionQueue::new();
    queue.add(ResourceType::Pipeline, NULL_HANDLE);
    assert!(queue.is_empty());
}

#[test]
fn test_entries_are_keyed_by_type() {
    let queue = DeletionQueue::new();
    queue.add(ResourceType::Pipeline, 11);
    queue.add(ResourceType::PipelineLayout, 12);
    queue.add(ResourceType::Pipeline, 13);

    assert_eq!(queue.len(), 3);
    assert_eq!(queue.count(ResourceType::Pipeline), 2);
    assert_eq!(queue.count(ResourceType::PipelineLayout), 1);
    assert_eq!(queue.count(ResourceType::Texture), 0);
}

#[test]
fn test_drain_empties_queue_in_destruction_order() {
    let queue = DeletionQueue::new();
    queue.add(ResourceType::Texture, 1);
    queue.add(ResourceType::PipelineLayout, 2);
    queue.add(ResourceType::TextureView, 3);
    queue.add(ResourceType::Pipeline, 4);

    let drained = queue.drain(&IdleToken::new());
    assert_eq!(
        drained,
        vec![
            (ResourceType::TextureView, 3),
            (ResourceType::Pipeline, 4),
            (ResourceType::PipelineLayout, 2),
            (ResourceType::Texture, 1),
        ]
    );
    assert!(queue.is_empty());
}

#[test]
fn test_concurrent_adds_are_serialized() {
    let queue = Arc::new(DeletionQueue::new());

    let handles: Vec<_> = (0..8u64)
        .map(|thread| {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                for i in 0..250u64 {
                    queue.add(ResourceType::Buffer, thread * 1000 + i + 1);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(queue.count(ResourceType::Buffer), 2000);
    assert_eq!(queue.drain(&IdleToken::new()).len(), 2000);
}
