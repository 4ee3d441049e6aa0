use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::layout::ComponentId;

/// Reason a component asked to be re-rendered from outside the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvalidationTopic {
    Data,
    Scale,
    Layout,
    Style,
}

impl InvalidationTopic {
    const fn bit(self) -> u8 {
        match self {
            Self::Data => 1 << 0,
            Self::Scale => 1 << 1,
            Self::Layout => 1 << 2,
            Self::Style => 1 << 3,
        }
    }
}

/// Bitmask of invalidation topics merged per component until the next flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InvalidationTopics {
    bits: u8,
}

impl InvalidationTopics {
    const ALL_BITS: u8 = InvalidationTopic::Data.bit()
        | InvalidationTopic::Scale.bit()
        | InvalidationTopic::Layout.bit()
        | InvalidationTopic::Style.bit();

    #[must_use]
    pub const fn none() -> Self {
        Self { bits: 0 }
    }

    #[must_use]
    pub const fn all() -> Self {
        Self {
            bits: Self::ALL_BITS,
        }
    }

    #[must_use]
    pub const fn from_topic(topic: InvalidationTopic) -> Self {
        Self { bits: topic.bit() }
    }

    #[must_use]
    pub const fn with_topic(self, topic: InvalidationTopic) -> Self {
        Self {
            bits: self.bits | topic.bit(),
        }
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        (self.bits & other.bits) != 0
    }

    #[must_use]
    pub const fn contains_topic(self, topic: InvalidationTopic) -> bool {
        self.intersects(Self::from_topic(topic))
    }

    #[must_use]
    pub const fn is_none(self) -> bool {
        self.bits == 0
    }
}

impl From<InvalidationTopic> for InvalidationTopics {
    fn from(topic: InvalidationTopic) -> Self {
        Self::from_topic(topic)
    }
}

/// Queue of invalidations raised by dataset and scale callbacks.
///
/// Callbacks run outside of any `&mut` borrow of the tree, so they only record
/// the request here; the tree drains the inbox before each flush.
#[derive(Debug, Clone, Default)]
pub struct UpdateInbox {
    pending: Rc<RefCell<IndexMap<ComponentId, InvalidationTopics>>>,
}

impl UpdateInbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, component: ComponentId, topics: InvalidationTopics) {
        let mut pending = self.pending.borrow_mut();
        let entry = pending.entry(component).or_default();
        *entry = entry.union(topics);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    #[must_use]
    pub fn pending_topics(&self, component: ComponentId) -> InvalidationTopics {
        self.pending
            .borrow()
            .get(&component)
            .copied()
            .unwrap_or_default()
    }

    /// Takes every queued request in arrival order.
    pub fn drain(&self) -> Vec<(ComponentId, InvalidationTopics)> {
        self.pending.borrow_mut().drain(..).collect()
    }
}
