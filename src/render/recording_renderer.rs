use indexmap::IndexMap;

use crate::error::ChartResult;
use crate::layout::ComponentId;
use crate::render::{PaintTarget, Renderer, Scene};

/// Headless renderer used by tests and embedding hosts without a backend.
///
/// It still validates scene content so tests catch invalid geometry before a
/// real backend sees it, and keeps the last scene painted per component.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    scenes: IndexMap<ComponentId, (PaintTarget, Scene)>,
    paint_counts: IndexMap<ComponentId, usize>,
    total_paints: usize,
}

impl RecordingRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn last_scene(&self, component: ComponentId) -> Option<&Scene> {
        self.scenes.get(&component).map(|(_, scene)| scene)
    }

    #[must_use]
    pub fn last_target(&self, component: ComponentId) -> Option<PaintTarget> {
        self.scenes.get(&component).map(|(target, _)| *target)
    }

    #[must_use]
    pub fn paint_count(&self, component: ComponentId) -> usize {
        self.paint_counts.get(&component).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_paints(&self) -> usize {
        self.total_paints
    }

    pub fn painted(&self) -> impl Iterator<Item = (PaintTarget, &Scene)> {
        self.scenes.values().map(|(target, scene)| (*target, scene))
    }
}

impl Renderer for RecordingRenderer {
    fn paint(&mut self, target: PaintTarget, scene: &Scene) -> ChartResult<()> {
        scene.validate()?;
        self.scenes
            .insert(target.component, (target, scene.clone()));
        *self.paint_counts.entry(target.component).or_default() += 1;
        self.total_paints += 1;
        Ok(())
    }

    fn clear(&mut self, component: ComponentId) {
        self.scenes.shift_remove(&component);
    }
}
