use crate::layout::ComponentId;

/// Ordered children that all receive the group's full rectangle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupLayout {
    components: Vec<ComponentId>,
}

impl GroupLayout {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }

    #[must_use]
    pub fn has(&self, component: ComponentId) -> bool {
        self.components.contains(&component)
    }

    /// Appends `component`; returns `false` when it was already present.
    pub fn append(&mut self, component: ComponentId) -> bool {
        if self.has(component) {
            return false;
        }
        self.components.push(component);
        true
    }

    pub fn remove(&mut self, component: ComponentId) -> bool {
        let before = self.components.len();
        self.components.retain(|existing| *existing != component);
        before != self.components.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
