use std::cell::RefCell;
use std::rc::Rc;

use plotframe::core::{Point, Size, SpaceRequest, Viewport};
use plotframe::layout::{
    ComponentId, ComponentTree, LayoutOffer, LifecycleState, ResizeEvent, Spacer, XAlignment,
    YAlignment,
};
use plotframe::render::RecordingRenderer;
use plotframe::ChartError;

fn tree() -> ComponentTree<RecordingRenderer> {
    ComponentTree::new(RecordingRenderer::new())
}

#[test]
fn compute_layout_before_anchor_is_a_usage_error() {
    let mut tree = tree();
    let spacer = tree.add_spacer(Spacer::flexible());

    let err = tree
        .compute_layout(spacer, Some(LayoutOffer::sized(100.0, 50.0)))
        .expect_err("not anchored");
    assert!(matches!(err, ChartError::NotAnchored(id) if id == spacer));
}

#[test]
fn flexible_component_takes_the_full_offer() {
    let mut tree = tree();
    let root = tree.create_root(Viewport::new(400, 300)).expect("root");
    let spacer = tree.add_spacer(Spacer::flexible());
    tree.anchor(spacer, root).expect("anchor");

    tree.compute_layout(spacer, Some(LayoutOffer::at(10.0, 20.0, 120.0, 80.0)))
        .expect("layout");
    assert_eq!(tree.size(spacer).expect("size"), Some(Size::new(120.0, 80.0)));
    assert_eq!(tree.origin(spacer).expect("origin"), Point::new(10.0, 20.0));
    assert_eq!(tree.state(spacer), Some(LifecycleState::LaidOut));
}

#[test]
fn root_layout_without_offer_uses_the_root_viewport() {
    let mut tree = tree();
    let root = tree.create_root(Viewport::new(640, 480)).expect("root");
    let spacer = tree.add_spacer(Spacer::flexible());
    tree.anchor(spacer, root).expect("anchor");

    tree.compute_layout(spacer, None).expect("layout");
    assert_eq!(tree.size(spacer).expect("size"), Some(Size::new(640.0, 480.0)));
}

#[test]
fn fixed_component_is_clamped_and_aligned_in_its_slack() {
    let mut tree = tree();
    let root = tree.create_root(Viewport::new(400, 300)).expect("root");
    let spacer = tree.add_spacer(Spacer::fixed(40.0, 500.0));
    tree.anchor(spacer, root).expect("anchor");
    tree.set_x_alignment(spacer, XAlignment::Right).expect("x alignment");
    tree.set_y_alignment(spacer, YAlignment::Center).expect("y alignment");

    tree.compute_layout(spacer, Some(LayoutOffer::sized(100.0, 60.0)))
        .expect("layout");
    assert_eq!(tree.size(spacer).expect("size"), Some(Size::new(40.0, 60.0)));
    assert_eq!(tree.origin(spacer).expect("origin"), Point::new(60.0, 0.0));

    tree.set_x_alignment_str(spacer, "center").expect("center");
    tree.compute_layout(spacer, Some(LayoutOffer::sized(100.0, 60.0)))
        .expect("layout");
    assert_eq!(tree.origin(spacer).expect("origin").x, 30.0);
}

#[test]
fn fixed_component_ignores_offered_space_in_its_request() {
    let mut tree = tree();
    let spacer = tree.add_spacer(Spacer::fixed(30.0, 12.0));
    let small = tree.requested_space(spacer, 1.0, 1.0).expect("request");
    let large = tree.requested_space(spacer, 1000.0, 1000.0).expect("request");
    assert_eq!(small, SpaceRequest::new(30.0, 12.0));
    assert_eq!(small, large);
    assert!(tree.fixed_width(spacer).expect("fixed width"));
}

#[test]
fn invalid_alignment_strings_are_rejected() {
    let mut tree = tree();
    let spacer = tree.add_spacer(Spacer::flexible());
    assert!(matches!(
        tree.set_x_alignment_str(spacer, "top"),
        Err(ChartError::InvalidAlignment(_))
    ));
    assert!(matches!(
        tree.set_y_alignment_str(spacer, "left"),
        Err(ChartError::InvalidAlignment(_))
    ));
    assert_eq!(tree.x_alignment(spacer).expect("alignment"), XAlignment::Left);
}

#[test]
fn returned_origin_is_a_copy() {
    let mut tree = tree();
    let root = tree.create_root(Viewport::new(100, 100)).expect("root");
    let spacer = tree.add_spacer(Spacer::flexible());
    tree.anchor(spacer, root).expect("anchor");
    tree.compute_layout(spacer, Some(LayoutOffer::at(5.0, 6.0, 10.0, 10.0)))
        .expect("layout");

    let mut origin = tree.origin(spacer).expect("origin");
    origin.x = 999.0;
    assert_eq!(tree.origin(spacer).expect("origin"), Point::new(5.0, 6.0));
}

#[test]
fn anchor_callbacks_fire_once_and_detach_callbacks_always_fire() {
    let mut tree = tree();
    let root = tree.create_root(Viewport::new(100, 100)).expect("root");
    let spacer = tree.add_spacer(Spacer::flexible());
    let events = Rc::new(RefCell::new(Vec::new()));

    let sink = Rc::clone(&events);
    tree.on_anchor(spacer, Rc::new(move |_: &ComponentId| sink.borrow_mut().push("anchor")))
        .expect("on anchor");
    let sink = Rc::clone(&events);
    tree.on_detach(spacer, Rc::new(move |_: &ComponentId| sink.borrow_mut().push("detach")))
        .expect("on detach");

    // Never anchored, still notified.
    tree.detach(spacer).expect("detach");
    tree.anchor(spacer, root).expect("anchor");
    tree.anchor(spacer, root).expect("same root again");
    tree.detach(spacer).expect("detach");

    assert_eq!(*events.borrow(), vec!["detach", "anchor", "detach"]);
}

#[test]
fn on_anchor_fires_immediately_when_already_anchored() {
    let mut tree = tree();
    let root = tree.create_root(Viewport::new(100, 100)).expect("root");
    let spacer = tree.add_spacer(Spacer::flexible());
    tree.anchor(spacer, root).expect("anchor");

    let count = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&count);
    let handle = tree
        .on_anchor(spacer, Rc::new(move |_: &ComponentId| *sink.borrow_mut() += 1))
        .expect("on anchor");
    assert_eq!(*count.borrow(), 1);
    assert!(tree.off_anchor(spacer, handle).expect("off anchor"));
}

#[test]
fn switching_roots_detaches_first() {
    let mut tree = tree();
    let first = tree.create_root(Viewport::new(100, 100)).expect("root");
    let second = tree.create_root(Viewport::new(200, 200)).expect("root");
    let spacer = tree.add_spacer(Spacer::flexible());
    let detached = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&detached);
    tree.on_detach(spacer, Rc::new(move |_: &ComponentId| *sink.borrow_mut() += 1))
        .expect("on detach");

    tree.anchor(spacer, first).expect("anchor first");
    tree.anchor(spacer, second).expect("anchor second");
    assert_eq!(*detached.borrow(), 1);
    assert_eq!(tree.root_of(spacer), Some(second));
}

#[test]
fn resize_callbacks_fire_only_when_the_size_changes() {
    let mut tree = tree();
    let root = tree.create_root(Viewport::new(100, 100)).expect("root");
    let spacer = tree.add_spacer(Spacer::flexible());
    tree.anchor(spacer, root).expect("anchor");
    let sizes = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&sizes);
    tree.on_resize(spacer, Rc::new(move |event: &ResizeEvent| sink.borrow_mut().push(event.size)))
        .expect("on resize");

    tree.compute_layout(spacer, None).expect("layout");
    tree.compute_layout(spacer, None).expect("same layout");
    tree.set_root_viewport(root, Viewport::new(50, 40)).expect("resize root");
    let report = tree.flush();
    assert!(report.flushed);

    assert_eq!(
        *sizes.borrow(),
        vec![Size::new(100.0, 100.0), Size::new(50.0, 40.0)]
    );
}

#[test]
fn destroyed_components_reject_further_use() {
    let mut tree = tree();
    let root = tree.create_root(Viewport::new(100, 100)).expect("root");
    let spacer = tree.add_spacer(Spacer::flexible());
    tree.anchor(spacer, root).expect("anchor");

    tree.destroy(spacer).expect("destroy");
    assert_eq!(tree.state(spacer), Some(LifecycleState::Destroyed));
    assert!(matches!(tree.anchor(spacer, root), Err(ChartError::Destroyed(_))));
    assert!(matches!(tree.origin(spacer), Err(ChartError::Destroyed(_))));
}

#[test]
fn invalid_viewport_and_offer_are_rejected() {
    let mut tree = tree();
    assert!(matches!(
        tree.create_root(Viewport::new(0, 10)),
        Err(ChartError::InvalidViewport { .. })
    ));
    let root = tree.create_root(Viewport::new(10, 10)).expect("root");
    let spacer = tree.add_spacer(Spacer::flexible());
    tree.anchor(spacer, root).expect("anchor");
    assert!(tree
        .compute_layout(spacer, Some(LayoutOffer::sized(f64::NAN, 10.0)))
        .is_err());
}
