use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use image::RgbaImage;

use crate::detection::DetectionRecord;

/// A frame ready for display with the detections drawn onto it.
#[derive(Debug, Clone)]
pub struct AnnotatedFrame {
    pub index: u64,
    pub image: RgbaImage,
    pub detections: Vec<DetectionRecord>,
}

#[derive(Default)]
struct SlotInner {
    pending: Mutex<Option<AnnotatedFrame>>,
    dropped: AtomicU64,
}

/// Holds at most one undisplayed frame; publishing replaces whatever is pending.
#[derive(Clone, Default)]
pub struct FrameSlot {
    inner: Arc<SlotInner>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `frame` as the pending frame. A frame still pending is discarded.
    pub fn publish(&self, frame: AnnotatedFrame) {
        let replaced = self.lock().replace(frame);
        if replaced.is_some() {
            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Take the pending frame, if any.
    pub fn take(&self) -> Option<AnnotatedFrame> {
        self.lock().take()
    }

    /// Frames overwritten before the presentation loop took them.
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, Option<AnnotatedFrame>> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: u64) -> AnnotatedFrame {
        AnnotatedFrame {
            index,
            image: RgbaImage::new(1, 1),
            detections: Vec::new(),
        }
    }

    #[test]
    fn newest_frame_wins() {
        let slot = FrameSlot::new();
        assert!(slot.take().is_none());
        slot.publish(frame(1));
        slot.publish(frame(2));
        assert_eq!(slot.take().map(|f| f.index), Some(2));
        assert!(slot.take().is_none());
        assert_eq!(slot.dropped(), 1);
    }

    #[test]
    fn clones_share_the_slot() {
        let producer = FrameSlot::new();
        let consumer = producer.clone();
        std::thread::spawn(move || producer.publish(frame(7)))
            .join()
            .unwrap();
        assert_eq!(consumer.take().map(|f| f.index), Some(7));
    }
}
