use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::core::callbacks::{CallbackId, CallbackSet};

pub type Datum = serde_json::Value;

static NEXT_DATASET_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DatasetId(u64);

impl DatasetId {
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dataset#{}", self.0)
    }
}

struct DatasetInner {
    id: DatasetId,
    data: RefCell<Vec<Datum>>,
    metadata: RefCell<Datum>,
    callbacks: RefCell<CallbackSet<Dataset>>,
}

/// Shared handle to an ordered collection of datums.
///
/// Cloning the handle shares the underlying data; plots subscribe to
/// `on_update` to learn about replacements.
#[derive(Clone)]
pub struct Dataset {
    inner: Rc<DatasetInner>,
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("id", &self.inner.id)
            .field("len", &self.inner.data.borrow().len())
            .finish()
    }
}

impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Dataset {}

impl Default for Dataset {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Dataset {
    #[must_use]
    pub fn new(data: Vec<Datum>) -> Self {
        Self {
            inner: Rc::new(DatasetInner {
                id: DatasetId(NEXT_DATASET_ID.fetch_add(1, Ordering::Relaxed)),
                data: RefCell::new(data),
                metadata: RefCell::new(Datum::Null),
                callbacks: RefCell::new(CallbackSet::default()),
            }),
        }
    }

    #[must_use]
    pub fn with_metadata(self, metadata: Datum) -> Self {
        self.inner.metadata.replace(metadata);
        self
    }

    #[must_use]
    pub fn id(&self) -> DatasetId {
        self.inner.id
    }

    /// Returns a copy of the current datums.
    #[must_use]
    pub fn data(&self) -> Vec<Datum> {
        self.inner.data.borrow().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.data.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.data.borrow().is_empty()
    }

    #[must_use]
    pub fn datum(&self, index: usize) -> Option<Datum> {
        self.inner.data.borrow().get(index).cloned()
    }

    /// Replaces the datums and notifies subscribers.
    pub fn set_data(&self, data: Vec<Datum>) {
        self.inner.data.replace(data);
        self.notify();
    }

    #[must_use]
    pub fn metadata(&self) -> Datum {
        self.inner.metadata.borrow().clone()
    }

    pub fn set_metadata(&self, metadata: Datum) {
        self.inner.metadata.replace(metadata);
        self.notify();
    }

    pub fn on_update(&self, callback: Rc<dyn Fn(&Dataset)>) -> CallbackId {
        self.inner.callbacks.borrow_mut().add(callback)
    }

    pub fn off_update(&self, id: CallbackId) -> bool {
        self.inner.callbacks.borrow_mut().remove(id)
    }

    fn notify(&self) {
        let callbacks = self.inner.callbacks.borrow().snapshot();
        for callback in callbacks {
            callback(self);
        }
    }
}
