//! Bounded LRU of recently processed event ids.
//!
//! Ids are recorded only after successful processing, so a redelivered
//! message that failed transiently is not mistaken for a duplicate.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

struct DedupeInner {
    seen: HashSet<String>,
    order: VecDeque<String>,
}

pub struct DedupeCache {
    inner: Mutex<DedupeInner>,
    capacity: usize,
}

impl DedupeCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(DedupeInner {
                seen: HashSet::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
            }),
            capacity: capacity.max(1),
        }
    }

    /// Whether this id completed processing recently.
    pub fn contains(&self, event_id: &str) -> bool {
        self.inner.lock().unwrap().seen.contains(event_id)
    }

    /// Records a successfully processed id, evicting the oldest entry when
    /// full.
    pub fn record(&self, event_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        if inner.seen.contains(event_id) {
            return;
        }
        if inner.order.len() >= self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.seen.remove(&oldest);
            }
        }
        inner.order.push_back(event_id.to_string());
        inner.seen.insert(event_id.to_string());
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_contains() {
        let cache = DedupeCache::new(8);
        assert!(!cache.contains("msg_a_0000000000000000"));
        cache.record("msg_a_0000000000000000");
        assert!(cache.contains("msg_a_0000000000000000"));
        cache.record("msg_a_0000000000000000");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_lru_eviction() {
        let cache = DedupeCache::new(2);
        cache.record("first");
        cache.record("second");
        cache.record("third");

        assert!(!cache.contains("first"));
        assert!(cache.contains("second"));
        assert!(cache.contains("third"));
        assert_eq!(cache.len(), 2);
    }
}
