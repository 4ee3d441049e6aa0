use std::rc::Rc;

use tracing::debug;

use crate::core::{Bounds, CallbackId, Point, Size, SpaceRequest, Viewport};
use crate::error::{ChartError, ChartResult};
use crate::layout::alignment::{XAlignment, YAlignment};
use crate::layout::content::{ComponentContent, ContentBinding, Spacer};
use crate::layout::group::GroupLayout;
use crate::layout::node::{ComponentNode, LifecycleState, NodeKind, ResizeEvent};
use crate::layout::store::ComponentStore;
use crate::layout::table::TableLayout;
use crate::layout::{ComponentId, LayoutOffer, RootId};
use crate::render::{Renderer, Scene};
use crate::scheduler::{
    FlushReport, FlushRequest, FlushTarget, FlushTiming, RenderController, RenderPolicy,
    RenderPolicyKind, SchedulerConfig,
};

/// Owner of every component, its render backend and the render controller.
///
/// Components are addressed by [`ComponentId`]. Containers own their
/// children through their membership lists; children keep a plain parent id.
#[derive(Debug)]
pub struct ComponentTree<R: Renderer> {
    store: ComponentStore<R>,
    controller: RenderController,
    last_report: Option<FlushReport>,
}

impl<R: Renderer> ComponentTree<R> {
    #[must_use]
    pub fn new(renderer: R) -> Self {
        Self {
            store: ComponentStore::new(renderer),
            controller: RenderController::default(),
            last_report: None,
        }
    }

    pub fn with_config(renderer: R, config: &SchedulerConfig) -> ChartResult<Self> {
        Ok(Self {
            store: ComponentStore::new(renderer),
            controller: RenderController::from_config(config)?,
            last_report: None,
        })
    }

    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.store.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.store.renderer
    }

    #[must_use]
    pub fn controller(&self) -> &RenderController {
        &self.controller
    }

    #[must_use]
    pub fn render_policy(&self) -> RenderPolicyKind {
        self.controller.render_policy()
    }

    pub fn set_render_policy(&mut self, policy: Box<dyn RenderPolicy>) {
        self.controller.set_render_policy(policy);
    }

    // ---- roots ----

    /// Registers a page element of the given box size to anchor trees into.
    pub fn create_root(&mut self, viewport: Viewport) -> ChartResult<RootId> {
        validate_viewport(viewport)?;
        Ok(self.store.allocate_root(viewport))
    }

    /// Resizes a root element; components anchored at it are relaid out.
    pub fn set_root_viewport(&mut self, root: RootId, viewport: Viewport) -> ChartResult<()> {
        validate_viewport(viewport)?;
        let Some(current) = self.store.roots.get_mut(&root) else {
            return Err(unknown_root(root));
        };
        *current = viewport;
        let anchored: Vec<ComponentId> = self
            .store
            .nodes
            .iter()
            .filter(|(_, node)| {
                node.root == Some(root) && node.parent.is_none() && node.state.is_anchored()
            })
            .map(|(id, _)| *id)
            .collect();
        for id in anchored {
            self.redraw(id)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn root_viewport(&self, root: RootId) -> Option<Viewport> {
        self.store.roots.get(&root).copied()
    }

    // ---- construction ----

    /// Adds a leaf component. The content is bound to the tree's update inbox.
    pub fn add<C: ComponentContent>(&mut self, mut content: C) -> ComponentId {
        let id = self.store.allocate_id();
        content.bind(ContentBinding::new(id, self.store.inbox.clone()));
        self.insert(id, NodeKind::Leaf(Box::new(content)))
    }

    pub fn add_spacer(&mut self, spacer: Spacer) -> ComponentId {
        self.add(spacer)
    }

    pub fn group(&mut self) -> ComponentId {
        let id = self.store.allocate_id();
        self.insert(id, NodeKind::Group(GroupLayout::new()))
    }

    /// Creates a group holding `components` in order.
    pub fn group_of(&mut self, components: &[ComponentId]) -> ChartResult<ComponentId> {
        let group = self.group();
        for component in components {
            self.append(group, *component)?;
        }
        Ok(group)
    }

    pub fn table(&mut self) -> ComponentId {
        let id = self.store.allocate_id();
        self.insert(id, NodeKind::Table(TableLayout::new()))
    }

    /// Creates a table from a grid of optional cells.
    pub fn table_from_rows(
        &mut self,
        rows: &[Vec<Option<ComponentId>>],
    ) -> ChartResult<ComponentId> {
        let table = self.table();
        for (row, cells) in rows.iter().enumerate() {
            for (column, cell) in cells.iter().enumerate() {
                if let Some(component) = cell {
                    self.add_to_table(table, *component, row, column)?;
                }
            }
        }
        Ok(table)
    }

    fn insert(&mut self, id: ComponentId, kind: NodeKind) -> ComponentId {
        self.store.nodes.insert(id, ComponentNode::new(kind));
        id
    }

    // ---- content access ----

    /// Downcasts leaf content to `T`.
    #[must_use]
    pub fn content<T: ComponentContent>(&self, id: ComponentId) -> Option<&T> {
        match &self.store.node(id).ok()?.kind {
            NodeKind::Leaf(content) => content.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn content_mut<T: ComponentContent>(&mut self, id: ComponentId) -> Option<&mut T> {
        match &mut self.store.node_mut(id).ok()?.kind {
            NodeKind::Leaf(content) => content.as_any_mut().downcast_mut::<T>(),
            _ => None,
        }
    }

    /// Mutates leaf content, then absorbs any invalidation it raised.
    pub fn update<T, F, O>(&mut self, id: ComponentId, mutate: F) -> ChartResult<O>
    where
        T: ComponentContent,
        F: FnOnce(&mut T) -> O,
    {
        let content = self.content_mut::<T>(id).ok_or_else(|| {
            ChartError::InvalidData(format!("component {id} does not hold the requested content"))
        })?;
        let output = mutate(content);
        if let Some(report) = self.pump() {
            self.last_report = Some(report);
        }
        Ok(output)
    }

    /// Last painted scene of a leaf component.
    #[must_use]
    pub fn scene(&self, id: ComponentId) -> Option<&Scene> {
        self.store.node(id).ok().map(|node| &node.scene)
    }

    // ---- containers ----

    /// Appends `component` to a group, detaching it from any previous
    /// container. Returns `false` when it was already a member.
    pub fn append(&mut self, group: ComponentId, component: ComponentId) -> ChartResult<bool> {
        self.check_adoptable(group, component)?;
        match &self.store.node(group)?.kind {
            NodeKind::Group(layout) if layout.has(component) => return Ok(false),
            NodeKind::Group(_) => {}
            _ => return Err(ChartError::NotAContainer { container: group }),
        }
        self.release(component)?;
        if let NodeKind::Group(layout) = &mut self.store.node_mut(group)?.kind {
            layout.append(component);
        }
        self.adopt(group, component)?;
        Ok(true)
    }

    /// Places `component` in a table cell. Adding a current member is a no-op.
    pub fn add_to_table(
        &mut self,
        table: ComponentId,
        component: ComponentId,
        row: usize,
        column: usize,
    ) -> ChartResult<bool> {
        self.check_adoptable(table, component)?;
        match &self.store.node(table)?.kind {
            NodeKind::Table(layout) if layout.has(component) => return Ok(false),
            NodeKind::Table(layout) if layout.component_at(row, column).is_some() => {
                return Err(ChartError::CellOccupied { row, column });
            }
            NodeKind::Table(_) => {}
            _ => return Err(ChartError::NotAContainer { container: table }),
        }
        self.release(component)?;
        if let NodeKind::Table(layout) = &mut self.store.node_mut(table)?.kind {
            layout.add(component, row, column)?;
        }
        self.adopt(table, component)?;
        Ok(true)
    }

    /// Removes `component` from `container` and detaches it.
    pub fn remove(&mut self, container: ComponentId, component: ComponentId) -> ChartResult<bool> {
        if !self.has(container, component)? {
            return Ok(false);
        }
        self.detach(component)?;
        self.redraw(container)?;
        Ok(true)
    }

    pub fn has(&self, container: ComponentId, component: ComponentId) -> ChartResult<bool> {
        match &self.store.node(container)?.kind {
            NodeKind::Group(group) => Ok(group.has(component)),
            NodeKind::Table(table) => Ok(table.has(component)),
            NodeKind::Leaf(_) => Err(ChartError::NotAContainer { container }),
        }
    }

    pub fn components(&self, container: ComponentId) -> ChartResult<Vec<ComponentId>> {
        let node = self.store.node(container)?;
        if !node.kind.is_container() {
            return Err(ChartError::NotAContainer { container });
        }
        Ok(node.kind.children())
    }

    pub fn is_empty(&self, container: ComponentId) -> ChartResult<bool> {
        Ok(self.components(container)?.is_empty())
    }

    /// Detaches every child of `container`.
    pub fn detach_all(&mut self, container: ComponentId) -> ChartResult<()> {
        for child in self.components(container)? {
            self.detach(child)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn table_layout(&self, table: ComponentId) -> Option<&TableLayout> {
        match &self.store.node(table).ok()?.kind {
            NodeKind::Table(layout) => Some(layout),
            _ => None,
        }
    }

    pub fn component_at(
        &self,
        table: ComponentId,
        row: usize,
        column: usize,
    ) -> ChartResult<Option<ComponentId>> {
        Ok(self.table_ref(table)?.component_at(row, column))
    }

    pub fn row_padding(&self, table: ComponentId) -> ChartResult<f64> {
        Ok(self.table_ref(table)?.row_padding())
    }

    pub fn column_padding(&self, table: ComponentId) -> ChartResult<f64> {
        Ok(self.table_ref(table)?.column_padding())
    }

    pub fn set_row_padding(&mut self, table: ComponentId, padding: f64) -> ChartResult<()> {
        self.table_mut(table)?.set_row_padding(padding)?;
        self.redraw(table)
    }

    pub fn set_column_padding(&mut self, table: ComponentId, padding: f64) -> ChartResult<()> {
        self.table_mut(table)?.set_column_padding(padding)?;
        self.redraw(table)
    }

    pub fn row_weight(&self, table: ComponentId, row: usize) -> ChartResult<Option<f64>> {
        Ok(self.table_ref(table)?.row_weight(row))
    }

    pub fn column_weight(&self, table: ComponentId, column: usize) -> ChartResult<Option<f64>> {
        Ok(self.table_ref(table)?.column_weight(column))
    }

    pub fn set_row_weight(
        &mut self,
        table: ComponentId,
        row: usize,
        weight: f64,
    ) -> ChartResult<()> {
        self.table_mut(table)?.set_row_weight(row, weight)?;
        self.redraw(table)
    }

    pub fn set_column_weight(
        &mut self,
        table: ComponentId,
        column: usize,
        weight: f64,
    ) -> ChartResult<()> {
        self.table_mut(table)?.set_column_weight(column, weight)?;
        self.redraw(table)
    }

    fn table_ref(&self, table: ComponentId) -> ChartResult<&TableLayout> {
        match &self.store.node(table)?.kind {
            NodeKind::Table(layout) => Ok(layout),
            _ => Err(ChartError::NotAContainer { container: table }),
        }
    }

    fn table_mut(&mut self, table: ComponentId) -> ChartResult<&mut TableLayout> {
        match &mut self.store.node_mut(table)?.kind {
            NodeKind::Table(layout) => Ok(layout),
            _ => Err(ChartError::NotAContainer { container: table }),
        }
    }

    fn check_adoptable(&self, container: ComponentId, component: ComponentId) -> ChartResult<()> {
        self.store.node(container)?;
        self.store.node(component)?;
        if self.store.is_ancestor(component, container) {
            return Err(ChartError::ContainmentCycle(component));
        }
        Ok(())
    }

    /// Detaches `component` from its current container, if any.
    fn release(&mut self, component: ComponentId) -> ChartResult<()> {
        if self.store.node(component)?.parent.is_some() {
            self.detach(component)?;
        }
        Ok(())
    }

    fn adopt(&mut self, container: ComponentId, component: ComponentId) -> ChartResult<()> {
        self.store.node_mut(component)?.parent = Some(container);
        let container_node = self.store.node(container)?;
        if let (true, Some(root)) = (container_node.state.is_anchored(), container_node.root) {
            self.anchor(component, root)?;
        }
        self.redraw(container)
    }

    // ---- parent linkage ----

    #[must_use]
    pub fn parent(&self, id: ComponentId) -> Option<ComponentId> {
        self.store.node(id).ok()?.parent
    }

    /// Sets the parent back-reference. The container must already list the
    /// component; `None` also drops it from its current container.
    pub fn set_parent(
        &mut self,
        id: ComponentId,
        container: Option<ComponentId>,
    ) -> ChartResult<()> {
        match container {
            Some(container) => {
                if !self.has(container, id)? {
                    return Err(ChartError::InvalidParent {
                        container,
                        component: id,
                    });
                }
                self.store.node_mut(id)?.parent = Some(container);
            }
            None => self.unlink_parent(id)?,
        }
        Ok(())
    }

    fn unlink_parent(&mut self, id: ComponentId) -> ChartResult<()> {
        let Some(parent) = self.store.node_mut(id)?.parent.take() else {
            return Ok(());
        };
        if let Ok(node) = self.store.node_mut(parent) {
            match &mut node.kind {
                NodeKind::Group(group) => {
                    group.remove(id);
                }
                NodeKind::Table(table) => {
                    table.remove(id);
                }
                NodeKind::Leaf(_) => {}
            }
        }
        Ok(())
    }

    // ---- lifecycle ----

    /// Binds `id` and its subtree to `root`. Anchoring to another root
    /// detaches first; anchoring again to the same root is a no-op.
    pub fn anchor(&mut self, id: ComponentId, root: RootId) -> ChartResult<()> {
        if !self.store.roots.contains_key(&root) {
            return Err(unknown_root(root));
        }
        let node = self.store.node(id)?;
        if node.state.is_anchored() {
            if node.root == Some(root) {
                return Ok(());
            }
            self.detach(id)?;
        }

        let mut fired = Vec::new();
        for member in self.store.subtree(id) {
            let Ok(node) = self.store.node_mut(member) else {
                continue;
            };
            if node.state.is_anchored() && node.root == Some(root) {
                continue;
            }
            node.root = Some(root);
            node.state = if node.size.is_some() {
                LifecycleState::LaidOut
            } else {
                LifecycleState::Anchored
            };
            if let NodeKind::Leaf(content) = &mut node.kind {
                content.on_anchor();
            }
            fired.push((member, node.on_anchor.snapshot()));
        }
        debug!(component = %id, %root, "anchored");
        for (member, callbacks) in fired {
            for callback in callbacks {
                callback(&member);
            }
        }
        Ok(())
    }

    /// Unbinds `id` from its root and container. Detach callbacks fire even
    /// when the component was never anchored.
    pub fn detach(&mut self, id: ComponentId) -> ChartResult<()> {
        self.store.node(id)?;
        self.unlink_parent(id)?;

        let mut fired = Vec::new();
        for member in self.store.subtree(id) {
            self.controller.forget(member);
            self.store.renderer.clear(member);
            let Ok(node) = self.store.node_mut(member) else {
                continue;
            };
            let was_anchored = node.state.is_anchored();
            if was_anchored {
                node.state = LifecycleState::Detached;
                node.root = None;
                if let NodeKind::Leaf(content) = &mut node.kind {
                    content.on_detach();
                }
            }
            if member == id || was_anchored {
                fired.push((member, node.on_detach.snapshot()));
            }
        }
        for (member, callbacks) in fired {
            for callback in callbacks {
                callback(&member);
            }
        }
        Ok(())
    }

    /// Terminal: detaches, destroys children, and forbids any further use.
    pub fn destroy(&mut self, id: ComponentId) -> ChartResult<()> {
        self.store.node(id)?;
        for child in self.store.children(id) {
            self.destroy(child)?;
        }
        self.detach(id)?;
        let node = self.store.node_mut(id)?;
        if let NodeKind::Leaf(content) = &mut node.kind {
            content.on_destroy();
        }
        node.state = LifecycleState::Destroyed;
        node.scene.clear();
        node.on_anchor = Default::default();
        node.on_detach = Default::default();
        node.on_resize = Default::default();
        debug!(component = %id, "destroyed");
        Ok(())
    }

    #[must_use]
    pub fn state(&self, id: ComponentId) -> Option<LifecycleState> {
        self.store.nodes.get(&id).map(|node| node.state)
    }

    #[must_use]
    pub fn is_anchored(&self, id: ComponentId) -> bool {
        self.state(id).is_some_and(LifecycleState::is_anchored)
    }

    #[must_use]
    pub fn is_root(&self, id: ComponentId) -> bool {
        self.store
            .node(id)
            .is_ok_and(|node| node.parent.is_none() && node.root.is_some())
    }

    #[must_use]
    pub fn root_of(&self, id: ComponentId) -> Option<RootId> {
        self.store.node(id).ok()?.root
    }

    // ---- layout ----

    /// Resolves geometry for `id` and its subtree. Without an offer only a
    /// root component can derive one, from its root viewport.
    pub fn compute_layout(
        &mut self,
        id: ComponentId,
        offer: Option<LayoutOffer>,
    ) -> ChartResult<()> {
        self.store.compute_layout(id, offer)
    }

    pub fn requested_space(
        &self,
        id: ComponentId,
        width: f64,
        height: f64,
    ) -> ChartResult<SpaceRequest> {
        self.store.node(id)?;
        Ok(self.store.requested_space(id, width, height))
    }

    pub fn fixed_width(&self, id: ComponentId) -> ChartResult<bool> {
        self.store.node(id)?;
        Ok(self.store.fixity(id).0)
    }

    pub fn fixed_height(&self, id: ComponentId) -> ChartResult<bool> {
        self.store.node(id)?;
        Ok(self.store.fixity(id).1)
    }

    /// Origin relative to the parent; a copy.
    pub fn origin(&self, id: ComponentId) -> ChartResult<Point> {
        Ok(self.store.node(id)?.origin)
    }

    pub fn origin_to_root(&self, id: ComponentId) -> ChartResult<Point> {
        self.store.origin_to_root(id)
    }

    /// Resolved size, `None` before the first layout.
    pub fn size(&self, id: ComponentId) -> ChartResult<Option<Size>> {
        Ok(self.store.node(id)?.size)
    }

    /// Bounds relative to the parent, `None` before the first layout.
    pub fn bounds(&self, id: ComponentId) -> ChartResult<Option<Bounds>> {
        let node = self.store.node(id)?;
        Ok(node
            .size
            .map(|size| Bounds::from_origin_size(node.origin, size)))
    }

    pub fn x_alignment(&self, id: ComponentId) -> ChartResult<XAlignment> {
        Ok(self.store.node(id)?.x_alignment)
    }

    pub fn y_alignment(&self, id: ComponentId) -> ChartResult<YAlignment> {
        Ok(self.store.node(id)?.y_alignment)
    }

    pub fn set_x_alignment(&mut self, id: ComponentId, alignment: XAlignment) -> ChartResult<()> {
        self.store.node_mut(id)?.x_alignment = alignment;
        self.redraw(id)
    }

    pub fn set_y_alignment(&mut self, id: ComponentId, alignment: YAlignment) -> ChartResult<()> {
        self.store.node_mut(id)?.y_alignment = alignment;
        self.redraw(id)
    }

    /// Parses `"left"`, `"center"` or `"right"`.
    pub fn set_x_alignment_str(&mut self, id: ComponentId, alignment: &str) -> ChartResult<()> {
        self.set_x_alignment(id, alignment.parse()?)
    }

    /// Parses `"top"`, `"center"` or `"bottom"`.
    pub fn set_y_alignment_str(&mut self, id: ComponentId, alignment: &str) -> ChartResult<()> {
        self.set_y_alignment(id, alignment.parse()?)
    }

    // ---- callbacks ----

    /// Registers an anchor callback; it fires right away when already anchored.
    pub fn on_anchor(
        &mut self,
        id: ComponentId,
        callback: Rc<dyn Fn(&ComponentId)>,
    ) -> ChartResult<CallbackId> {
        let node = self.store.node_mut(id)?;
        let handle = node.on_anchor.add(Rc::clone(&callback));
        if node.state.is_anchored() {
            callback(&id);
        }
        Ok(handle)
    }

    pub fn off_anchor(&mut self, id: ComponentId, callback: CallbackId) -> ChartResult<bool> {
        Ok(self.store.node_mut(id)?.on_anchor.remove(callback))
    }

    pub fn on_detach(
        &mut self,
        id: ComponentId,
        callback: Rc<dyn Fn(&ComponentId)>,
    ) -> ChartResult<CallbackId> {
        Ok(self.store.node_mut(id)?.on_detach.add(callback))
    }

    pub fn off_detach(&mut self, id: ComponentId, callback: CallbackId) -> ChartResult<bool> {
        Ok(self.store.node_mut(id)?.on_detach.remove(callback))
    }

    pub fn on_resize(
        &mut self,
        id: ComponentId,
        callback: Rc<dyn Fn(&ResizeEvent)>,
    ) -> ChartResult<CallbackId> {
        Ok(self.store.node_mut(id)?.on_resize.add(callback))
    }

    pub fn off_resize(&mut self, id: ComponentId, callback: CallbackId) -> ChartResult<bool> {
        Ok(self.store.node_mut(id)?.on_resize.remove(callback))
    }

    // ---- rendering ----

    /// Queues `id` (and, for containers, its subtree) for painting. No-op
    /// before the first layout.
    pub fn render(&mut self, id: ComponentId) -> ChartResult<()> {
        self.store.node(id)?;
        self.store.render(id, &mut self.controller);
        if self.controller.is_scheduled()
            && self.controller.render_policy() == RenderPolicyKind::Immediate
        {
            self.flush_inline();
        }
        Ok(())
    }

    /// Paints `id` synchronously, bypassing the controller.
    pub fn render_immediately(&mut self, id: ComponentId) -> ChartResult<()> {
        self.store.node(id)?;
        self.store.render_immediately(id, &mut self.controller)
    }

    /// Schedules a layout and render pass from the topmost ancestor of `id`.
    pub fn redraw(&mut self, id: ComponentId) -> ChartResult<()> {
        self.store.node(id)?;
        let top = self.store.top_of(id);
        if !self.is_anchored(top) {
            return Ok(());
        }
        if self.controller.register_to_compute_layout_and_render(top) == FlushRequest::FlushNow {
            self.flush_inline();
        }
        Ok(())
    }

    /// Detaches `id`, anchors it at `root`, lays it out and flushes.
    pub fn render_to(&mut self, id: ComponentId, root: RootId) -> ChartResult<FlushReport> {
        if self.store.node(id)?.parent.is_some() || self.root_of(id) != Some(root) {
            self.detach(id)?;
        }
        self.anchor(id, root)?;
        let _ = self.controller.register_to_compute_layout_and_render(id);
        Ok(self.flush())
    }

    /// Runs one flush if one is scheduled.
    pub fn flush(&mut self) -> FlushReport {
        let report = self.controller.flush(&mut self.store);
        if !report.is_clean() {
            debug!(failures = report.failures.len(), "flush reported failures");
        }
        report
    }

    /// Absorbs queued content invalidations. Under the immediate policy the
    /// resulting flush runs inline and its report is returned.
    pub fn pump(&mut self) -> Option<FlushReport> {
        if self.store.absorb(&mut self.controller) {
            return Some(self.flush());
        }
        None
    }

    /// Deferred flush the host should arm a callback for.
    pub fn take_wakeup(&mut self) -> Option<FlushTiming> {
        self.controller.take_wakeup()
    }

    /// Report of the last flush that ran inline inside another call.
    pub fn take_last_report(&mut self) -> Option<FlushReport> {
        self.last_report.take()
    }

    fn flush_inline(&mut self) {
        let report = self.flush();
        self.last_report = Some(report);
    }
}

fn validate_viewport(viewport: Viewport) -> ChartResult<()> {
    if !viewport.is_valid() {
        return Err(ChartError::InvalidViewport {
            width: viewport.width,
            height: viewport.height,
        });
    }
    Ok(())
}

fn unknown_root(root: RootId) -> ChartError {
    ChartError::InvalidData(format!("unknown root {root}"))
}
