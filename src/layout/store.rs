use indexmap::IndexMap;
use tracing::trace;

use crate::core::{Point, Size, SpaceRequest, Viewport};
use crate::error::{ChartError, ChartResult};
use crate::layout::content::RenderContext;
use crate::layout::node::{ComponentNode, LifecycleState, NodeKind, ResizeEvent};
use crate::layout::{ComponentId, LayoutOffer, RootId};
use crate::render::{PaintTarget, Renderer, Scene};
use crate::scheduler::{
    FlushRequest, FlushTarget, InvalidationTopic, RenderController, UpdateInbox,
};

/// Arena of component nodes plus the backend they paint into.
///
/// Kept separate from the render controller so a flush can borrow both at
/// once: the controller drives, the store is the [`FlushTarget`].
#[derive(Debug)]
pub(crate) struct ComponentStore<R: Renderer> {
    pub(crate) nodes: IndexMap<ComponentId, ComponentNode>,
    pub(crate) roots: IndexMap<RootId, Viewport>,
    pub(crate) renderer: R,
    pub(crate) inbox: UpdateInbox,
    next_component: u32,
    next_root: u32,
}

impl<R: Renderer> ComponentStore<R> {
    pub(crate) fn new(renderer: R) -> Self {
        Self {
            nodes: IndexMap::new(),
            roots: IndexMap::new(),
            renderer,
            inbox: UpdateInbox::new(),
            next_component: 1,
            next_root: 1,
        }
    }

    pub(crate) fn allocate_id(&mut self) -> ComponentId {
        let id = ComponentId::from_raw(self.next_component);
        self.next_component = self.next_component.saturating_add(1);
        id
    }

    pub(crate) fn allocate_root(&mut self, viewport: Viewport) -> RootId {
        let id = RootId::from_raw(self.next_root);
        self.next_root = self.next_root.saturating_add(1);
        self.roots.insert(id, viewport);
        id
    }

    /// Live node lookup: unknown and destroyed ids are usage errors.
    pub(crate) fn node(&self, id: ComponentId) -> ChartResult<&ComponentNode> {
        match self.nodes.get(&id) {
            None => Err(ChartError::UnknownComponent(id)),
            Some(node) if node.state == LifecycleState::Destroyed => {
                Err(ChartError::Destroyed(id))
            }
            Some(node) => Ok(node),
        }
    }

    pub(crate) fn node_mut(&mut self, id: ComponentId) -> ChartResult<&mut ComponentNode> {
        match self.nodes.get_mut(&id) {
            None => Err(ChartError::UnknownComponent(id)),
            Some(node) if node.state == LifecycleState::Destroyed => {
                Err(ChartError::Destroyed(id))
            }
            Some(node) => Ok(node),
        }
    }

    pub(crate) fn children(&self, id: ComponentId) -> Vec<ComponentId> {
        self.nodes
            .get(&id)
            .map(|node| node.kind.children())
            .unwrap_or_default()
    }

    /// `id` followed by every component below it, depth first.
    pub(crate) fn subtree(&self, id: ComponentId) -> Vec<ComponentId> {
        let mut out = vec![id];
        let mut cursor = 0;
        while cursor < out.len() {
            let children = self.children(out[cursor]);
            out.extend(children);
            cursor += 1;
        }
        out
    }

    pub(crate) fn is_ancestor(&self, ancestor: ComponentId, of: ComponentId) -> bool {
        let mut current = Some(of);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(&id).and_then(|node| node.parent);
        }
        false
    }

    /// Topmost ancestor of `id` (itself when it has no parent).
    pub(crate) fn top_of(&self, id: ComponentId) -> ComponentId {
        let mut current = id;
        while let Some(parent) = self.nodes.get(&current).and_then(|node| node.parent) {
            current = parent;
        }
        current
    }

    pub(crate) fn origin_to_root(&self, id: ComponentId) -> ChartResult<Point> {
        let mut origin = self.node(id)?.origin;
        let mut parent = self.node(id)?.parent;
        while let Some(current) = parent {
            let node = self.node(current)?;
            origin = origin.offset(node.origin);
            parent = node.parent;
        }
        Ok(origin)
    }

    pub(crate) fn requested_space(&self, id: ComponentId, width: f64, height: f64) -> SpaceRequest {
        let Some(node) = self.nodes.get(&id) else {
            return SpaceRequest::zero();
        };
        match &node.kind {
            NodeKind::Leaf(content) => content.requested_space(width, height).sanitized(),
            NodeKind::Group(group) => group.components().iter().fold(
                SpaceRequest::zero(),
                |acc, child| {
                    let request = self.requested_space(*child, width, height);
                    SpaceRequest::new(
                        acc.min_width.max(request.min_width),
                        acc.min_height.max(request.min_height),
                    )
                },
            ),
            NodeKind::Table(table) => table.requested_space(
                width,
                height,
                &|child, w, h| self.requested_space(child, w, h),
                &|child| self.fixity(child),
            ),
        }
    }

    /// `(fixed_width, fixed_height)`; containers are fixed only when every
    /// child is.
    pub(crate) fn fixity(&self, id: ComponentId) -> (bool, bool) {
        let Some(node) = self.nodes.get(&id) else {
            return (false, false);
        };
        match &node.kind {
            NodeKind::Leaf(content) => (content.fixed_width(), content.fixed_height()),
            NodeKind::Group(group) => {
                group
                    .components()
                    .iter()
                    .fold((true, true), |(width, height), child| {
                        let (child_width, child_height) = self.fixity(*child);
                        (width && child_width, height && child_height)
                    })
            }
            NodeKind::Table(table) => {
                let fixity = |child: ComponentId| self.fixity(child);
                (table.fixed_width(&fixity), table.fixed_height(&fixity))
            }
        }
    }

    /// Layout entry point: `None` is only accepted for root components,
    /// which take their root viewport.
    pub(crate) fn compute_layout(
        &mut self,
        id: ComponentId,
        offer: Option<LayoutOffer>,
    ) -> ChartResult<()> {
        let node = self.node(id)?;
        if !node.state.is_anchored() {
            return Err(ChartError::NotAnchored(id));
        }
        let offer = match offer {
            Some(offer) => offer,
            None => self.root_offer(id)?.ok_or(ChartError::MissingLayoutOffer(id))?,
        };
        offer.validate()?;
        self.apply_layout(id, offer)
    }

    /// Re-runs layout from the root viewport, or from the last offer for
    /// components below a root.
    pub(crate) fn relayout(&mut self, id: ComponentId) -> ChartResult<()> {
        let offer = match self.root_offer(id)? {
            Some(offer) => Some(offer),
            None => self.node(id)?.last_offer,
        };
        self.compute_layout(id, Some(offer.ok_or(ChartError::MissingLayoutOffer(id))?))
    }

    fn root_offer(&self, id: ComponentId) -> ChartResult<Option<LayoutOffer>> {
        let node = self.node(id)?;
        if node.parent.is_some() {
            return Ok(None);
        }
        Ok(node
            .root
            .and_then(|root| self.roots.get(&root))
            .map(|viewport| {
                let size = viewport.size();
                LayoutOffer::sized(size.width, size.height)
            }))
    }

    fn apply_layout(&mut self, id: ComponentId, offer: LayoutOffer) -> ChartResult<()> {
        let request = self.requested_space(id, offer.width, offer.height);
        let (fixed_width, fixed_height) = self.fixity(id);
        let width = if fixed_width {
            offer.width.min(request.min_width)
        } else {
            offer.width
        };
        let height = if fixed_height {
            offer.height.min(request.min_height)
        } else {
            offer.height
        };

        let node = self.node(id)?;
        let origin = Point::new(
            offer.origin.x + (offer.width - width) * node.x_alignment.proportion(),
            offer.origin.y + (offer.height - height) * node.y_alignment.proportion(),
        );
        let child_offers: Vec<(ComponentId, LayoutOffer)> = match &node.kind {
            NodeKind::Leaf(_) => Vec::new(),
            NodeKind::Group(group) => group
                .components()
                .iter()
                .map(|child| (*child, LayoutOffer::sized(width, height)))
                .collect(),
            NodeKind::Table(table) => {
                let request_fn =
                    |child: ComponentId, w: f64, h: f64| self.requested_space(child, w, h);
                let fixity_fn = |child: ComponentId| self.fixity(child);
                let allocation = table.allocate(
                    offer.width,
                    offer.height,
                    width,
                    height,
                    &request_fn,
                    &fixity_fn,
                );
                table.cell_offers(&allocation)
            }
        };

        let size = Size::new(width, height);
        let node = self.node_mut(id)?;
        let resized = node.size != Some(size);
        node.origin = origin;
        node.size = Some(size);
        node.last_offer = Some(offer);
        if node.state == LifecycleState::Anchored {
            node.state = LifecycleState::LaidOut;
        }
        if let NodeKind::Leaf(content) = &mut node.kind {
            content.on_layout(size);
        }
        let resize_callbacks = if resized {
            node.on_resize.snapshot()
        } else {
            Vec::new()
        };
        trace!(component = %id, width, height, "layout resolved");

        let event = ResizeEvent {
            component: id,
            size,
        };
        for callback in resize_callbacks {
            callback(&event);
        }
        for (child, child_offer) in child_offers {
            self.apply_layout(child, child_offer)?;
        }
        Ok(())
    }

    /// Drains out-of-band invalidations. Returns `true` when the active
    /// policy asked for an inline flush.
    pub(crate) fn absorb(&mut self, controller: &mut RenderController) -> bool {
        let mut flush_now = false;
        for (id, topics) in self.inbox.drain() {
            let Ok(node) = self.node_mut(id) else {
                continue;
            };
            if let NodeKind::Leaf(content) = &mut node.kind {
                content.invalidate(topics);
            }
            if !node.state.is_anchored() || node.size.is_none() {
                continue;
            }
            let request = if topics.contains_topic(InvalidationTopic::Layout) {
                controller.register_to_compute_layout(self.top_of(id))
            } else {
                controller.register_to_render(id)
            };
            flush_now |= request == FlushRequest::FlushNow;
        }
        flush_now
    }

    fn paint_leaf(&mut self, id: ComponentId) -> ChartResult<()> {
        let origin = self.origin_to_root(id)?;
        let Some(node) = self.nodes.get_mut(&id) else {
            return Err(ChartError::UnknownComponent(id));
        };
        let (Some(size), Some(root)) = (node.size, node.root) else {
            return Ok(());
        };
        let ComponentNode { kind, scene, .. } = node;
        let NodeKind::Leaf(content) = kind else {
            return Ok(());
        };
        *scene = Scene::new(size);
        let context = RenderContext {
            component: id,
            size,
        };
        content
            .render_immediately(&context, scene)
            .map_err(|err| match err {
                ChartError::RenderFailed { .. } => err,
                other => ChartError::RenderFailed {
                    component: id,
                    message: other.to_string(),
                },
            })?;

        let target = PaintTarget {
            component: id,
            root,
            origin,
            size,
        };
        self.renderer.paint(target, scene)?;
        node.state = LifecycleState::Rendered;
        Ok(())
    }
}

impl<R: Renderer> FlushTarget for ComponentStore<R> {
    fn absorb_updates(&mut self, controller: &mut RenderController) {
        let _ = self.absorb(controller);
    }

    fn compute_layout(&mut self, component: ComponentId) -> Result<(), ChartError> {
        match self.nodes.get(&component) {
            // Forgotten between registration and flush.
            None => Ok(()),
            Some(node) if !node.state.is_anchored() => Ok(()),
            Some(_) => self.relayout(component),
        }
    }

    fn render(&mut self, component: ComponentId, controller: &mut RenderController) {
        let Some(node) = self.nodes.get(&component) else {
            return;
        };
        if !node.state.is_anchored() || node.size.is_none() {
            return;
        }
        let _ = controller.register_to_render(component);
        for child in node.kind.children() {
            self.render(child, controller);
        }
    }

    fn render_immediately(
        &mut self,
        component: ComponentId,
        _controller: &mut RenderController,
    ) -> Result<(), ChartError> {
        match self.nodes.get_mut(&component) {
            None => Ok(()),
            Some(node) if !node.state.is_anchored() || node.size.is_none() => Ok(()),
            Some(node) if node.kind.is_container() => {
                node.state = LifecycleState::Rendered;
                Ok(())
            }
            Some(_) => self.paint_leaf(component),
        }
    }
}
