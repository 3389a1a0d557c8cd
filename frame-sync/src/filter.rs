//! Frame-synchronization filter
//!
//! Buffers incoming stamped items until their declared frame is resolvable
//! against the target frame, then releases them through a registered
//! delivery callback. The queue is bounded: when full, the oldest buffered
//! item is discarded.

use crate::frames::{FrameId, Stamped};
use crate::transform::TransformBuffer;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

type DeliveryFn<T> = Box<dyn Fn(T) + Send + Sync>;

/// Synchronizes stamped items with the transform tree
///
/// The filter is a passive callback target: items are delivered on whichever
/// thread calls [`push`](Self::push) or [`poll`](Self::poll), and the filter
/// spawns no threads of its own.
pub struct FrameFilter<T> {
    buffer: Arc<dyn TransformBuffer>,
    target_frame: RwLock<FrameId>,
    queue_depth: usize,
    pending: Mutex<VecDeque<T>>,
    callback: RwLock<Option<DeliveryFn<T>>>,
    dropped: AtomicU64,
}

impl<T: Stamped + Send> FrameFilter<T> {
    /// Create a filter targeting `target_frame` with a bounded pending queue
    pub fn new(
        buffer: Arc<dyn TransformBuffer>,
        target_frame: impl Into<FrameId>,
        queue_depth: usize,
    ) -> Self {
        Self {
            buffer,
            target_frame: RwLock::new(target_frame.into()),
            queue_depth,
            pending: Mutex::new(VecDeque::new()),
            callback: RwLock::new(None),
            dropped: AtomicU64::new(0),
        }
    }

    /// Register the delivery callback
    ///
    /// At most one callback is active; connecting again replaces it.
    pub fn connect<F>(&self, callback: F)
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        *self.callback.write() = Some(Box::new(callback));
    }

    /// Feed an item into the filter
    ///
    /// Resolvable items are delivered immediately; the rest are buffered.
    /// Items with an empty frame id can never resolve and are discarded.
    pub fn push(&self, item: T) {
        if item.frame_id().is_empty() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!("discarding item with empty frame id");
            return;
        }

        if self.resolvable(&item) {
            self.deliver(item);
            return;
        }

        if self.queue_depth == 0 {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let mut pending = self.pending.lock();
        if pending.len() >= self.queue_depth {
            // Queue full: the oldest item loses its slot.
            pending.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(
                queue_depth = self.queue_depth,
                "frame filter queue full, dropping oldest item"
            );
        }
        pending.push_back(item);
    }

    /// Re-evaluate buffered items, delivering those that became resolvable
    ///
    /// Returns the number of items released. Arrival order is preserved
    /// among released items.
    pub fn poll(&self) -> usize {
        let ready: Vec<T> = {
            let mut pending = self.pending.lock();
            let mut ready = Vec::new();
            let mut keep = VecDeque::with_capacity(pending.len());
            for item in pending.drain(..) {
                if self.resolvable(&item) {
                    ready.push(item);
                } else {
                    keep.push_back(item);
                }
            }
            *pending = keep;
            ready
        };

        let released = ready.len();
        if released > 0 {
            debug!(released, "frame filter released buffered items");
        }
        for item in ready {
            self.deliver(item);
        }
        released
    }

    /// Change the target frame
    ///
    /// Buffered items are re-evaluated against the new target on the next
    /// [`poll`](Self::poll).
    pub fn set_target_frame(&self, frame: impl Into<FrameId>) {
        *self.target_frame.write() = frame.into();
    }

    /// Discard all buffered items
    pub fn clear(&self) {
        self.pending.lock().clear();
    }

    /// Current target frame
    pub fn target_frame(&self) -> FrameId {
        self.target_frame.read().clone()
    }

    /// Number of items currently buffered
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Total items discarded (queue overflow or empty frame id)
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn resolvable(&self, item: &T) -> bool {
        let target = self.target_frame.read();
        self.buffer
            .can_transform(&target, item.frame_id(), item.stamp())
    }

    fn deliver(&self, item: T) {
        if let Some(callback) = self.callback.read().as_ref() {
            callback(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::Header;
    use crate::transform::FrameSetBuffer;
    use chrono::Utc;
    use parking_lot::Mutex as PlMutex;

    fn filter_with_frames(
        frames: &[&str],
        target: &str,
        depth: usize,
    ) -> (Arc<FrameSetBuffer>, FrameFilter<Header>) {
        let buffer = Arc::new(FrameSetBuffer::new());
        buffer.add_frame(target);
        for frame in frames {
            buffer.add_frame(*frame);
        }
        let filter = FrameFilter::new(buffer.clone(), target, depth);
        (buffer, filter)
    }

    fn collect(filter: &FrameFilter<Header>) -> Arc<PlMutex<Vec<FrameId>>> {
        let seen = Arc::new(PlMutex::new(Vec::new()));
        let sink = seen.clone();
        filter.connect(move |item: Header| sink.lock().push(item.frame_id.clone()));
        seen
    }

    #[test]
    fn test_resolvable_item_delivered_immediately() {
        let (_buffer, filter) = filter_with_frames(&["base_link"], "map", 10);
        let seen = collect(&filter);

        filter.push(Header::new("base_link", Utc::now()));
        assert_eq!(seen.lock().len(), 1);
        assert_eq!(filter.pending_len(), 0);
    }

    #[test]
    fn test_unresolvable_item_buffered_then_released() {
        let (buffer, filter) = filter_with_frames(&[], "map", 10);
        let seen = collect(&filter);

        filter.push(Header::new("lidar", Utc::now()));
        assert_eq!(seen.lock().len(), 0);
        assert_eq!(filter.pending_len(), 1);

        // Nothing changed yet, poll releases nothing.
        assert_eq!(filter.poll(), 0);

        buffer.add_frame("lidar");
        assert_eq!(filter.poll(), 1);
        assert_eq!(seen.lock().len(), 1);
        assert_eq!(filter.pending_len(), 0);
    }

    #[test]
    fn test_release_preserves_arrival_order() {
        let (buffer, filter) = filter_with_frames(&[], "map", 10);
        let seen = collect(&filter);

        filter.push(Header::new("a", Utc::now()));
        filter.push(Header::new("b", Utc::now()));
        filter.push(Header::new("a", Utc::now()));

        buffer.add_frame("a");
        buffer.add_frame("b");
        assert_eq!(filter.poll(), 3);

        let frames: Vec<String> = seen.lock().iter().map(|f| f.to_string()).collect();
        assert_eq!(frames, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_queue_overflow_drops_oldest() {
        let (buffer, filter) = filter_with_frames(&[], "map", 2);
        let seen = collect(&filter);

        filter.push(Header::new("first", Utc::now()));
        filter.push(Header::new("second", Utc::now()));
        filter.push(Header::new("third", Utc::now()));

        assert_eq!(filter.pending_len(), 2);
        assert_eq!(filter.dropped(), 1);

        buffer.add_frame("first");
        buffer.add_frame("second");
        buffer.add_frame("third");
        filter.poll();

        let frames: Vec<String> = seen.lock().iter().map(|f| f.to_string()).collect();
        assert_eq!(frames, vec!["second", "third"]);
    }

    #[test]
    fn test_empty_frame_id_discarded() {
        let (_buffer, filter) = filter_with_frames(&["base_link"], "map", 10);
        let seen = collect(&filter);

        filter.push(Header::new("", Utc::now()));
        assert_eq!(seen.lock().len(), 0);
        assert_eq!(filter.pending_len(), 0);
        assert_eq!(filter.dropped(), 1);
    }

    #[test]
    fn test_clear_discards_buffered() {
        let (_buffer, filter) = filter_with_frames(&[], "map", 10);
        filter.push(Header::new("lidar", Utc::now()));
        filter.push(Header::new("lidar", Utc::now()));
        assert_eq!(filter.pending_len(), 2);

        filter.clear();
        assert_eq!(filter.pending_len(), 0);
        // Cleared items are not counted as drops.
        assert_eq!(filter.dropped(), 0);
    }

    #[test]
    fn test_retarget_changes_resolvability() {
        let buffer = Arc::new(FrameSetBuffer::new());
        buffer.add_frame("map");
        buffer.add_frame("odom");
        buffer.add_frame("base_link");

        let filter: FrameFilter<Header> = FrameFilter::new(buffer.clone(), "missing", 10);
        let seen = collect(&filter);

        filter.push(Header::new("base_link", Utc::now()));
        assert_eq!(filter.pending_len(), 1);

        filter.set_target_frame("odom");
        assert_eq!(filter.target_frame(), FrameId::from("odom"));
        assert_eq!(filter.poll(), 1);
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_zero_depth_drops_unresolvable() {
        let (_buffer, filter) = filter_with_frames(&[], "map", 0);
        filter.push(Header::new("lidar", Utc::now()));
        assert_eq!(filter.pending_len(), 0);
        assert_eq!(filter.dropped(), 1);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn pending_never_exceeds_depth(
                depth in 0usize..16,
                pushes in 0usize..64,
            ) {
                let buffer = Arc::new(FrameSetBuffer::new());
                buffer.add_frame("map");
                let filter: FrameFilter<Header> =
                    FrameFilter::new(buffer, "map", depth);

                for i in 0..pushes {
                    filter.push(Header::new(format!("frame_{i}"), Utc::now()));
                    prop_assert!(filter.pending_len() <= depth);
                }

                let buffered = filter.pending_len() as u64;
                prop_assert_eq!(filter.dropped() + buffered, pushes as u64);
            }
        }
    }
}
