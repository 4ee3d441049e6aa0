use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use plotframe::core::{Size, Viewport};
use plotframe::error::ChartResult;
use plotframe::layout::{
    ComponentContent, ComponentId, ComponentTree, ContentBinding, RenderContext, Spacer,
};
use plotframe::render::{Element, RecordingRenderer, Scene};
use plotframe::scheduler::{
    FlushPhase, FlushTiming, ImmediatePolicy, InvalidationTopic, InvalidationTopics,
    RenderPolicyKind, SchedulerConfig,
};
use plotframe::ChartError;

/// Leaf that paints one rect and can be told to fail.
#[derive(Default)]
struct Beacon {
    failing: Rc<Cell<bool>>,
    paints: Rc<Cell<usize>>,
    seen: InvalidationTopics,
    binding: Option<ContentBinding>,
}

impl ComponentContent for Beacon {
    fn bind(&mut self, binding: ContentBinding) {
        self.binding = Some(binding);
    }

    fn invalidate(&mut self, topics: InvalidationTopics) {
        self.seen = self.seen.union(topics);
    }

    fn render_immediately(
        &mut self,
        context: &RenderContext,
        scene: &mut Scene,
    ) -> ChartResult<()> {
        if self.failing.get() {
            return Err(ChartError::InvalidData("beacon asked to fail".to_owned()));
        }
        self.paints.set(self.paints.get() + 1);
        scene.push(
            "beacon",
            Element::rect(0.0, 0.0, context.size.width, context.size.height),
        );
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct Fixture {
    tree: ComponentTree<RecordingRenderer>,
    group: ComponentId,
}

/// Two beacons side by side in a laid-out group.
fn fixture(first: Beacon, second: Beacon) -> (Fixture, ComponentId, ComponentId) {
    let mut tree = ComponentTree::new(RecordingRenderer::new());
    let root = tree.create_root(Viewport::new(100, 60)).expect("root");
    let a = tree.add(first);
    let b = tree.add(second);
    let group = tree.group_of(&[a, b]).expect("group");
    tree.anchor(group, root).expect("anchor");
    tree.compute_layout(group, None).expect("layout");
    (Fixture { tree, group }, a, b)
}

#[test]
fn repeated_registrations_coalesce_into_one_paint() {
    let (mut fx, a, b) = fixture(Beacon::default(), Beacon::default());

    for _ in 0..5 {
        fx.tree.render(a).expect("render a");
    }
    fx.tree.render(b).expect("render b");
    assert_eq!(fx.tree.take_wakeup(), Some(FlushTiming::NextAnimationFrame));
    assert_eq!(fx.tree.take_wakeup(), None);
    assert_eq!(fx.tree.renderer().total_paints(), 0);

    let report = fx.tree.flush();
    assert!(report.flushed);
    assert!(report.is_clean());
    assert_eq!(report.rendered, vec![a, b]);
    assert_eq!(fx.tree.renderer().paint_count(a), 1);
    assert_eq!(fx.tree.renderer().paint_count(b), 1);

    let idle = fx.tree.flush();
    assert!(!idle.flushed);
}

#[test]
fn rendering_a_container_paints_its_children() {
    let (mut fx, a, b) = fixture(Beacon::default(), Beacon::default());
    fx.tree.render(fx.group).expect("render group");
    let report = fx.tree.flush();
    assert!(report.rendered.contains(&a));
    assert!(report.rendered.contains(&b));
    assert!(report.rendered.contains(&fx.group));
}

#[test]
fn one_failing_component_does_not_block_the_others() {
    let failing = Rc::new(Cell::new(true));
    let bad = Beacon {
        failing: Rc::clone(&failing),
        ..Beacon::default()
    };
    let good_paints = Rc::new(Cell::new(0));
    let good = Beacon {
        paints: Rc::clone(&good_paints),
        ..Beacon::default()
    };
    let (mut fx, bad_id, good_id) = fixture(bad, good);

    fx.tree.render(bad_id).expect("render bad");
    fx.tree.render(good_id).expect("render good");
    let report = fx.tree.flush();

    assert_eq!(report.rendered, vec![good_id]);
    assert_eq!(report.failed_components(), vec![bad_id]);
    assert_eq!(report.failures[0].phase, FlushPhase::Paint);
    assert!(matches!(
        report.failures[0].error,
        ChartError::RenderFailed { component, .. } if component == bad_id
    ));
    assert_eq!(good_paints.get(), 1);
    assert!(fx.tree.controller().needs_render(bad_id));
    assert!(!fx.tree.controller().is_scheduled());

    // Retried with the next flush.
    failing.set(false);
    fx.tree.render(good_id).expect("render good again");
    let report = fx.tree.flush();
    assert_eq!(report.rendered, vec![bad_id, good_id]);
    assert!(fx.tree.controller().pending_renders().is_empty());
}

#[test]
fn immediate_policy_flushes_inline() {
    let (mut fx, a, _) = fixture(Beacon::default(), Beacon::default());
    fx.tree.set_render_policy(Box::new(ImmediatePolicy));
    assert_eq!(fx.tree.render_policy(), RenderPolicyKind::Immediate);

    fx.tree.render(a).expect("render");
    assert_eq!(fx.tree.take_wakeup(), None);
    assert_eq!(fx.tree.renderer().paint_count(a), 1);
    let report = fx.tree.take_last_report().expect("inline report");
    assert_eq!(report.rendered, vec![a]);
}

#[test]
fn timeout_policy_from_config_defers_with_a_delay() {
    let config = SchedulerConfig::default()
        .with_policy(RenderPolicyKind::Timeout)
        .with_timeout_delay_ms(20.0);
    let mut tree = ComponentTree::with_config(RecordingRenderer::new(), &config).expect("tree");
    let root = tree.create_root(Viewport::new(10, 10)).expect("root");
    let spacer = tree.add_spacer(Spacer::flexible());
    tree.anchor(spacer, root).expect("anchor");
    tree.compute_layout(spacer, None).expect("layout");

    tree.render(spacer).expect("render");
    assert!(matches!(
        tree.take_wakeup(),
        Some(FlushTiming::After(delay)) if delay.as_millis() == 20
    ));
}

#[test]
fn invalid_scheduler_config_is_rejected() {
    let config = SchedulerConfig::default().with_timeout_delay_ms(-1.0);
    assert!(ComponentTree::with_config(RecordingRenderer::new(), &config).is_err());

    let parsed: SchedulerConfig =
        serde_json::from_str(r#"{ "policy": "immediate" }"#).expect("config json");
    assert_eq!(parsed.policy, RenderPolicyKind::Immediate);
    assert!(parsed.validate().is_ok());
}

#[test]
fn render_to_lays_out_and_paints_at_the_root() {
    let mut tree = ComponentTree::new(RecordingRenderer::new());
    let root = tree.create_root(Viewport::new(80, 40)).expect("root");
    let beacon = tree.add(Beacon::default());

    let report = tree.render_to(beacon, root).expect("render_to");
    assert!(report.flushed);
    assert_eq!(report.laid_out, vec![beacon]);
    assert_eq!(report.rendered, vec![beacon]);

    let target = tree.renderer().last_target(beacon).expect("painted");
    assert_eq!(target.root, root);
    assert_eq!(target.size, Size::new(80.0, 40.0));
    let scene = tree.scene(beacon).expect("scene");
    assert_eq!(scene.layer("beacon").len(), 1);
}

#[test]
fn detached_components_are_dropped_from_pending_work() {
    let (mut fx, a, b) = fixture(Beacon::default(), Beacon::default());
    fx.tree.render(a).expect("render a");
    fx.tree.render(b).expect("render b");
    fx.tree.detach(a).expect("detach a");
    assert!(!fx.tree.controller().needs_render(a));

    let report = fx.tree.flush();
    assert_eq!(report.rendered, vec![b]);
    assert_eq!(fx.tree.renderer().paint_count(a), 0);
}

#[test]
fn content_invalidations_are_absorbed_before_the_flush() {
    let (mut fx, a, _) = fixture(Beacon::default(), Beacon::default());

    fx.tree
        .update::<Beacon, _, _>(a, |beacon| {
            if let Some(binding) = &beacon.binding {
                binding.invalidate(InvalidationTopic::Data);
                binding.invalidate(InvalidationTopic::Style);
            }
        })
        .expect("update");
    assert!(fx.tree.controller().needs_render(a));

    let report = fx.tree.flush();
    assert_eq!(report.rendered, vec![a]);
    let beacon = fx.tree.content::<Beacon>(a).expect("beacon");
    assert!(beacon.seen.contains_topic(InvalidationTopic::Data));
    assert!(beacon.seen.contains_topic(InvalidationTopic::Style));
    assert!(!beacon.seen.contains_topic(InvalidationTopic::Layout));
}

#[test]
fn layout_invalidation_relayouts_the_topmost_component() {
    let (mut fx, a, _) = fixture(Beacon::default(), Beacon::default());
    fx.tree
        .update::<Beacon, _, _>(a, |beacon| {
            if let Some(binding) = &beacon.binding {
                binding.invalidate(InvalidationTopic::Layout);
            }
        })
        .expect("update");
    assert!(fx.tree.controller().needs_layout(fx.group));

    let report = fx.tree.flush();
    assert_eq!(report.laid_out, vec![fx.group]);
    assert!(report.rendered.contains(&a));
}
