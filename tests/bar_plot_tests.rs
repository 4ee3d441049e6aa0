use std::rc::Rc;

use approx::assert_relative_eq;
use serde_json::json;

use plotframe::core::{Bounds, CategoryScale, Dataset, LinearScale, Point, Scale, Value, Viewport};
use plotframe::layout::{ComponentContent, ComponentId, ComponentTree};
use plotframe::plot::bar_labels::{ON_BAR_CLASS, OFF_BAR_CLASS};
use plotframe::plot::bar_plot::{STACK_TOTALS_LAYER, STACK_TOTAL_CLASS};
use plotframe::plot::{
    Accessor, BarPlot, Formatter, Orientation, PlotEntity, StackedBarPlot, StackingOrder,
};
use plotframe::render::{Element, ElementKind, RecordingRenderer, Scene};
use plotframe::ChartError;

fn category_scale() -> Rc<dyn Scale> {
    Rc::new(
        CategoryScale::new()
            .with_padding(0.0, 0.25)
            .expect("padding")
            .with_domain(["A", "B"])
            .with_range(0.0, 100.0),
    )
}

fn linear_scale(start: f64, end: f64) -> Rc<dyn Scale> {
    Rc::new(LinearScale::new().with_domain(start, end).expect("domain"))
}

fn vertical_plot(dataset: &Dataset, value_scale: Rc<dyn Scale>) -> BarPlot {
    let mut plot = BarPlot::new(Orientation::Vertical);
    plot.set_x(Accessor::field("name"), Some(category_scale()));
    plot.set_y(Accessor::field("value"), Some(value_scale));
    plot.add_dataset(dataset.clone());
    plot
}

fn two_bars(a: f64, b: f64) -> Dataset {
    Dataset::new(vec![
        json!({"name": "A", "value": a}),
        json!({"name": "B", "value": b}),
    ])
}

/// Renders `plot` into a fresh root and returns the tree and component.
fn render<C: ComponentContent>(
    plot: C,
    width: u32,
    height: u32,
) -> (ComponentTree<RecordingRenderer>, ComponentId) {
    let mut tree = ComponentTree::new(RecordingRenderer::new());
    let root = tree.create_root(Viewport::new(width, height)).expect("root");
    let id = tree.add(plot);
    let report = tree.render_to(id, root).expect("render_to");
    assert!(report.is_clean(), "flush failures: {:?}", report.failures);
    (tree, id)
}

fn bars<'a>(scene: &'a Scene, dataset: &Dataset) -> &'a [Element] {
    scene.layer(&format!("bars-{}", dataset.id()))
}

fn rect_of(element: &Element) -> (f64, f64, f64, f64) {
    (
        element.number("x").expect("x"),
        element.number("y").expect("y"),
        element.number("width").expect("width"),
        element.number("height").expect("height"),
    )
}

#[test]
fn vertical_bars_grow_from_the_baseline() {
    let dataset = two_bars(5.0, 10.0);
    let (tree, id) = render(vertical_plot(&dataset, linear_scale(0.0, 10.0)), 100, 100);
    let scene = tree.renderer().last_scene(id).expect("painted");

    let drawn = bars(scene, &dataset);
    assert_eq!(drawn.len(), 2);
    assert!(drawn.iter().all(|bar| bar.kind == ElementKind::Rect && bar.has_class("bar")));
    assert_eq!(rect_of(&drawn[0]), (10.0, 50.0, 40.0, 50.0));
    assert_eq!(rect_of(&drawn[1]), (50.0, 0.0, 40.0, 100.0));

    let baseline = &scene.layer("baseline")[0];
    assert!(baseline.has_class("baseline"));
    assert_eq!(baseline.number("y1"), Some(100.0));
    assert_eq!(baseline.number("x2"), Some(100.0));

    let plot = tree.content::<BarPlot>(id).expect("plot");
    assert_relative_eq!(plot.bar_pixel_width(), 40.0);
    assert_eq!(plot.baseline_value(), Value::Number(0.0));
}

#[test]
fn bars_below_the_baseline_start_at_it() {
    let dataset = two_bars(-5.0, 5.0);
    // 200 px tall: the baseline lands at y = 100.
    let (tree, id) = render(vertical_plot(&dataset, linear_scale(-10.0, 10.0)), 100, 200);
    let scene = tree.renderer().last_scene(id).expect("painted");

    let drawn = bars(scene, &dataset);
    let (_, y, _, height) = rect_of(&drawn[0]);
    assert_eq!((y, height), (100.0, 50.0));
    let (_, y, _, height) = rect_of(&drawn[1]);
    assert_eq!((y, height), (50.0, 50.0));

    let entities = tree.content::<BarPlot>(id).expect("plot").entities();
    assert_eq!(entities[0].position, Point::new(30.0, 150.0));
    assert_eq!(entities[1].position, Point::new(70.0, 50.0));
}

#[test]
fn nearest_entity_prefers_the_value_axis() {
    // B first, so a tie cannot be won by position in the dataset.
    let dataset = Dataset::new(vec![
        json!({"name": "B", "value": 10.0}),
        json!({"name": "A", "value": 5.0}),
    ]);
    let (tree, id) = render(vertical_plot(&dataset, linear_scale(0.0, 10.0)), 100, 100);
    let plot = tree.content::<BarPlot>(id).expect("plot");
    let name = |entity: &PlotEntity| entity.datum["name"].clone();

    // Above bar A, but closer to the top of bar B along y.
    let nearest = plot.entity_nearest(Point::new(30.0, 20.0)).expect("nearest");
    assert_eq!(name(&nearest), json!("B"));
    assert_eq!(nearest.component, Some(id));

    // Equal y distance to both tops: the bar spanning x wins.
    let tie = plot.entity_nearest(Point::new(40.0, 25.0)).expect("tie");
    assert_eq!(name(&tie), json!("A"));
    assert_eq!(tie.index, 1);

    let inside = plot.entity_nearest(Point::new(70.0, 60.0)).expect("inside");
    assert_eq!(inside.index, 0);
    assert_eq!(inside.datum, json!({"name": "B", "value": 10.0}));
}

#[test]
fn region_queries_return_intersecting_bars() {
    let dataset = two_bars(5.0, 10.0);
    let (tree, id) = render(vertical_plot(&dataset, linear_scale(0.0, 10.0)), 100, 100);
    let plot = tree.content::<BarPlot>(id).expect("plot");

    let at = plot.entities_at(Point::new(30.0, 75.0));
    assert_eq!(at.len(), 1);
    assert_eq!(at[0].index, 0);

    let strip = Bounds::from_corners(Point::new(0.0, 0.0), Point::new(100.0, 10.0));
    let top_strip = plot.entities_in(strip);
    assert_eq!(top_strip.len(), 1);
    assert_eq!(top_strip[0].index, 1);
    assert!(plot.entities_at(Point::new(2.0, 2.0)).is_empty());
}

#[test]
fn entity_nearest_needs_a_layout() {
    let dataset = two_bars(5.0, 10.0);
    let plot = vertical_plot(&dataset, linear_scale(0.0, 10.0));
    assert!(plot.entity_nearest(Point::new(0.0, 0.0)).is_none());
}

#[test]
fn labels_sit_inside_tall_bars() {
    let dataset = two_bars(5.0, 10.0);
    let mut plot = vertical_plot(&dataset, linear_scale(0.0, 10.0));
    plot.set_labels_enabled(true);
    let (tree, id) = render(plot, 100, 100);
    let scene = tree.renderer().last_scene(id).expect("painted");

    let labels = scene.layer(&format!("labels-{}", dataset.id()));
    assert_eq!(labels.len(), 2);
    assert_eq!(labels[0].text.as_deref(), Some("5"));
    assert_eq!(labels[0].number("x"), Some(26.5));
    assert_eq!(labels[0].number("y"), Some(55.0));
    assert_eq!(labels[1].text.as_deref(), Some("10"));
    assert_eq!(labels[1].number("y"), Some(5.0));
    assert!(labels.iter().all(|label| label.has_class(ON_BAR_CLASS)));
    assert!(labels.iter().all(|label| !label.has_class(OFF_BAR_CLASS)));
}

#[test]
fn one_label_too_wide_hides_every_label() {
    let dataset = two_bars(5.0, 10.0);
    let mut plot = vertical_plot(&dataset, linear_scale(0.0, 10.0));
    plot.set_labels_enabled(true);
    plot.set_label_formatter(Formatter::new(|value: &Value| {
        if value == &Value::Number(5.0) {
            "a rather long label".to_owned()
        } else {
            "ok".to_owned()
        }
    }));
    let (mut tree, id) = render(plot, 100, 100);
    let layer = format!("labels-{}", dataset.id());
    assert!(tree.renderer().last_scene(id).expect("painted").layer(&layer).is_empty());

    tree.update::<BarPlot, _, _>(id, |plot| plot.set_hide_labels_if_any_too_wide(false))
        .expect("update");
    tree.flush();
    assert_eq!(tree.renderer().last_scene(id).expect("painted").layer(&layer).len(), 2);
}

#[test]
fn dataset_changes_schedule_a_repaint() {
    let dataset = two_bars(5.0, 10.0);
    let (mut tree, id) = render(vertical_plot(&dataset, linear_scale(0.0, 10.0)), 100, 100);
    assert_eq!(tree.renderer().paint_count(id), 1);

    dataset.set_data(vec![
        json!({"name": "A", "value": 2}),
        json!({"name": "B", "value": 8}),
    ]);
    let report = tree.flush();
    assert!(report.flushed);
    assert_eq!(report.rendered, vec![id]);
    assert_eq!(tree.renderer().paint_count(id), 2);

    let scene = tree.renderer().last_scene(id).expect("painted");
    assert_eq!(rect_of(&bars(scene, &dataset)[0]), (10.0, 80.0, 40.0, 20.0));
}

#[test]
fn removed_datasets_lose_their_layers_and_updates() {
    let first = two_bars(5.0, 10.0);
    let second = two_bars(1.0, 2.0);
    let mut plot = vertical_plot(&first, linear_scale(0.0, 10.0));
    assert!(plot.add_dataset(second.clone()));
    assert!(!plot.add_dataset(second.clone()));
    let (mut tree, id) = render(plot, 100, 100);
    assert_eq!(bars(tree.renderer().last_scene(id).expect("painted"), &second).len(), 2);

    let removed = tree
        .update::<BarPlot, _, _>(id, |plot| plot.remove_dataset(&second))
        .expect("update");
    assert!(removed);
    tree.flush();
    let scene = tree.renderer().last_scene(id).expect("painted");
    assert!(bars(scene, &second).is_empty());
    assert_eq!(bars(scene, &first).len(), 2);

    // No longer observed.
    second.set_data(Vec::new());
    assert!(!tree.flush().flushed);
}

#[test]
fn orientation_strings_are_validated() {
    assert!(matches!(
        BarPlot::with_orientation_str("diagonal"),
        Err(ChartError::InvalidOrientation(name)) if name == "diagonal"
    ));
    let plot = BarPlot::with_orientation_str("horizontal").expect("horizontal");
    assert_eq!(plot.orientation(), Orientation::Horizontal);
    assert_eq!("vertical".parse::<Orientation>().expect("vertical"), Orientation::Vertical);
}

#[test]
fn time_value_axes_default_to_an_epoch_baseline() {
    let mut plot = BarPlot::new(Orientation::Vertical);
    plot.set_y(Accessor::field("at"), Some(Rc::new(LinearScale::time())));
    assert_eq!(plot.baseline_value(), Value::epoch());

    plot.set_baseline_value(3.0);
    assert_eq!(plot.baseline_value(), Value::Number(3.0));
}

#[test]
fn continuous_base_extents_are_widened_by_half_a_bar() {
    let x = Rc::new(LinearScale::new());
    x.set_pad_proportion(0.0).expect("pad");
    let dataset = Dataset::new(vec![
        json!({"x": 1, "y": 2}),
        json!({"x": 2, "y": 4}),
        json!({"x": 3, "y": 6}),
    ]);
    let mut plot = BarPlot::new(Orientation::Vertical);
    let base: Rc<dyn Scale> = x.clone();
    plot.set_x(Accessor::field("x"), Some(base));
    plot.set_y(Accessor::field("y"), Some(linear_scale(0.0, 10.0)));
    plot.add_dataset(dataset);
    let (_tree, _id) = render(plot, 100, 100);

    let (start, end) = x.numeric_domain();
    assert!(start < 1.0, "domain start {start} should leave room for the first bar");
    assert!(end > 3.0, "domain end {end} should leave room for the last bar");
}

#[test]
fn single_bar_extents_follow_the_laid_out_width() {
    let x = Rc::new(LinearScale::new());
    x.set_pad_proportion(0.0).expect("pad");
    let mut plot = BarPlot::new(Orientation::Vertical);
    let base: Rc<dyn Scale> = x.clone();
    plot.set_x(Accessor::field("x"), Some(base));
    plot.set_y(Accessor::field("y"), Some(linear_scale(0.0, 10.0)));
    plot.add_dataset(Dataset::new(vec![json!({"x": 5, "y": 2})]));
    let (_tree, _id) = render(plot, 100, 100);

    // Anchored before layout, the lone value widened to (4, 6). Layout then
    // gives a 38 px bar, which is 0.38 on either side of 5.
    let (start, end) = x.numeric_domain();
    assert_relative_eq!(start, 4.62, epsilon = 1e-9);
    assert_relative_eq!(end, 5.38, epsilon = 1e-9);
}

/// A on the positive side only, B on the negative side only.
fn stacked_datasets() -> (Dataset, Dataset) {
    (two_bars(4.0, -2.0), two_bars(3.0, -5.0))
}

fn stacked_plot(first: &Dataset, second: &Dataset, value_scale: Rc<dyn Scale>) -> StackedBarPlot {
    let mut plot = StackedBarPlot::new(Orientation::Vertical);
    plot.set_x(Accessor::field("name"), Some(category_scale()));
    plot.set_y(Accessor::field("value"), Some(value_scale));
    plot.add_dataset(first.clone());
    plot.add_dataset(second.clone());
    plot
}

#[test]
fn stacked_bars_start_where_the_previous_dataset_ended() {
    let (first, second) = stacked_datasets();
    // 200 px tall over -10..10: zero lands at y = 100, 10 px per unit.
    let (tree, id) = render(stacked_plot(&first, &second, linear_scale(-10.0, 10.0)), 100, 200);
    let scene = tree.renderer().last_scene(id).expect("painted");

    assert_eq!(rect_of(&bars(scene, &first)[0]), (10.0, 60.0, 40.0, 40.0));
    assert_eq!(rect_of(&bars(scene, &second)[0]), (10.0, 30.0, 40.0, 30.0));
    assert_eq!(rect_of(&bars(scene, &first)[1]), (50.0, 100.0, 40.0, 20.0));
    assert_eq!(rect_of(&bars(scene, &second)[1]), (50.0, 120.0, 40.0, 50.0));

    let plot = tree.content::<StackedBarPlot>(id).expect("plot");
    assert_eq!(plot.stacking_order(), StackingOrder::BottomUp);
    let stacks = plot.stacking_result().expect("stacked");
    assert_eq!(stacks.get(second.id(), "A").map(|segment| segment.offset), Some(4.0));
    assert_eq!(stacks.get(second.id(), "B").map(|segment| segment.end()), Some(-7.0));
    // Dataset order: the second dataset's A bar is third.
    assert_eq!(plot.entities()[2].position, Point::new(30.0, 30.0));
}

#[test]
fn stacked_extent_feeds_the_value_scale() {
    let (first, second) = stacked_datasets();
    let y = Rc::new(LinearScale::new());
    y.set_pad_proportion(0.0).expect("pad");
    let value_scale: Rc<dyn Scale> = y.clone();
    let (mut tree, id) = render(stacked_plot(&first, &second, value_scale), 100, 200);

    assert_eq!(tree.content::<StackedBarPlot>(id).expect("plot").stacked_extent(), (-7.0, 7.0));
    assert_eq!(y.numeric_domain(), (-7.0, 7.0));

    // Totals grow, so does the domain.
    second.set_data(vec![
        json!({"name": "A", "value": 6}),
        json!({"name": "B", "value": -1}),
    ]);
    assert!(tree.flush().is_clean());
    assert_eq!(y.numeric_domain(), (-3.0, 10.0));
}

#[test]
fn stack_totals_sit_past_each_stack_end() {
    let (first, second) = stacked_datasets();
    let mut plot = stacked_plot(&first, &second, linear_scale(-10.0, 10.0));
    plot.set_labels_enabled(true);
    let (tree, id) = render(plot, 100, 200);
    let scene = tree.renderer().last_scene(id).expect("painted");

    // Stack ends on the baseline (B above zero, A below it) get no total.
    let totals = scene.layer(STACK_TOTALS_LAYER);
    assert_eq!(totals.len(), 2);
    assert_eq!(totals[0].text.as_deref(), Some("7"));
    assert_eq!((totals[0].number("x"), totals[0].number("y")), (Some(26.5), Some(13.0)));
    assert_eq!(totals[1].text.as_deref(), Some("-7"));
    assert_eq!((totals[1].number("x"), totals[1].number("y")), (Some(63.0), Some(175.0)));
    assert!(totals.iter().all(|total| total.has_class(STACK_TOTAL_CLASS) && total.visible));
    assert!(totals.iter().all(|total| total.has_class(OFF_BAR_CLASS)));

    for dataset in [&first, &second] {
        assert!(scene.layer(&format!("labels-{}", dataset.id())).is_empty());
    }
}

#[test]
fn stack_totals_past_the_plot_edge_are_hidden() {
    let (first, second) = stacked_datasets();
    let mut plot = stacked_plot(&first, &second, linear_scale(-7.0, 7.0));
    plot.set_labels_enabled(true);
    let (tree, id) = render(plot, 100, 200);
    let totals = tree.renderer().last_scene(id).expect("painted").layer(STACK_TOTALS_LAYER);

    assert_eq!(totals.len(), 2);
    assert!(totals.iter().all(|total| !total.visible));
}

#[test]
fn one_wide_total_hides_every_total() {
    let (first, second) = stacked_datasets();
    let mut plot = stacked_plot(&first, &second, linear_scale(-10.0, 10.0));
    plot.set_labels_enabled(true);
    plot.set_label_formatter(Formatter::new(|value: &Value| {
        if value == &Value::Number(-7.0) {
            "a rather long total".to_owned()
        } else {
            value.to_string()
        }
    }));
    let (mut tree, id) = render(plot, 100, 200);
    assert!(tree.renderer().last_scene(id).expect("painted").layer(STACK_TOTALS_LAYER).is_empty());

    tree.update::<StackedBarPlot, _, _>(id, |plot| plot.set_hide_labels_if_any_too_wide(false))
        .expect("update");
    tree.flush();
    let scene = tree.renderer().last_scene(id).expect("painted");
    assert_eq!(scene.layer(STACK_TOTALS_LAYER).len(), 2);
}

#[test]
fn top_down_stacking_puts_the_last_dataset_first() {
    let (first, second) = stacked_datasets();
    let (mut tree, id) = render(stacked_plot(&first, &second, linear_scale(-10.0, 10.0)), 100, 200);

    tree.update::<StackedBarPlot, _, _>(id, |plot| plot.set_stacking_order(StackingOrder::TopDown))
        .expect("update");
    tree.flush();
    let scene = tree.renderer().last_scene(id).expect("painted");
    assert_eq!(rect_of(&bars(scene, &second)[0]), (10.0, 70.0, 40.0, 30.0));
    assert_eq!(rect_of(&bars(scene, &first)[0]), (10.0, 30.0, 40.0, 40.0));
    assert_eq!(rect_of(&bars(scene, &second)[1]), (50.0, 100.0, 40.0, 50.0));
}
