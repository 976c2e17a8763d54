use parking_lot::Mutex;
use std::collections::HashSet;

pub mod comment_helpers;
pub mod feed_helpers;
pub mod media_helpers;
pub mod post_helpers;
pub mod reaction_helpers;
pub mod sanitization_helpers;
pub mod search_helpers;

/// Keys (post ids) with a mutation currently being sent. Used to refuse a
/// second submission for the same post until the first one settles.
#[derive(Default)]
pub(crate) struct InFlightSet {
    keys: Mutex<HashSet<String>>,
}

impl InFlightSet {
    /// Marks `key` busy. Returns `None` if it already is. The mark is
    /// cleared when the returned guard drops, including on cancellation.
    pub(crate) fn try_begin(&self, key: &str) -> Option<InFlightGuard<'_>> {
        if self.keys.lock().insert(key.to_string()) {
            Some(InFlightGuard { set: self, key: key.to_string() })
        } else {
            None
        }
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.keys.lock().contains(key)
    }
}

pub(crate) struct InFlightGuard<'a> {
    set: &'a InFlightSet,
    key: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.keys.lock().remove(&self.key);
    }
}
