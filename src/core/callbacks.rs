use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Handle returned when registering a callback; used to unregister it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallbackId(u64);

impl CallbackId {
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Ordered set of shared callbacks receiving `&T`.
///
/// Callbacks are invoked from a snapshot of the set so a callback may register
/// or unregister callbacks without invalidating the iteration.
pub struct CallbackSet<T> {
    entries: Vec<(CallbackId, Rc<dyn Fn(&T)>)>,
    next_id: u64,
}

impl<T> Default for CallbackSet<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }
}

impl<T> fmt::Debug for CallbackSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackSet")
            .field("len", &self.entries.len())
            .finish()
    }
}

impl<T> CallbackSet<T> {
    pub fn add(&mut self, callback: Rc<dyn Fn(&T)>) -> CallbackId {
        let id = CallbackId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.entries.push((id, callback));
        id
    }

    pub fn remove(&mut self, id: CallbackId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        before != self.entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clones the registered callbacks so they can run after the owner's borrow ends.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Rc<dyn Fn(&T)>> {
        self.entries
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect()
    }

    pub fn call(&self, arg: &T) {
        for callback in self.snapshot() {
            callback(arg);
        }
    }
}
