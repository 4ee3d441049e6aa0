use plotframe::core::{SpaceRequest, Viewport};
use plotframe::layout::{
    ComponentId, ComponentTree, LayoutOffer, Spacer, TableLayout, XAlignment, YAlignment,
};
use plotframe::render::RecordingRenderer;
use proptest::prelude::*;

fn alignments() -> impl Strategy<Value = (XAlignment, YAlignment)> {
    (
        prop_oneof![Just(XAlignment::Left), Just(XAlignment::Center), Just(XAlignment::Right)],
        prop_oneof![Just(YAlignment::Top), Just(YAlignment::Center), Just(YAlignment::Bottom)],
    )
}

proptest! {
    #[test]
    fn fixed_requests_ignore_the_offer(
        width in 0.0f64..2_000.0,
        height in 0.0f64..2_000.0,
        offered_width in 0.0f64..5_000.0,
        offered_height in 0.0f64..5_000.0
    ) {
        let mut tree = ComponentTree::new(RecordingRenderer::new());
        let spacer = tree.add_spacer(Spacer::fixed(width, height));
        let request = tree
            .requested_space(spacer, offered_width, offered_height)
            .expect("request");
        prop_assert_eq!(request, SpaceRequest::new(width, height));
    }

    #[test]
    fn flexible_components_fill_their_offer(
        x in -500.0f64..500.0,
        y in -500.0f64..500.0,
        width in 0.0f64..2_000.0,
        height in 0.0f64..2_000.0,
        (x_alignment, y_alignment) in alignments()
    ) {
        let mut tree = ComponentTree::new(RecordingRenderer::new());
        let root = tree.create_root(Viewport::new(10, 10)).expect("root");
        let spacer = tree.add_spacer(Spacer::flexible());
        tree.anchor(spacer, root).expect("anchor");
        tree.set_x_alignment(spacer, x_alignment).expect("x alignment");
        tree.set_y_alignment(spacer, y_alignment).expect("y alignment");

        tree.compute_layout(spacer, Some(LayoutOffer::at(x, y, width, height))).expect("layout");
        let size = tree.size(spacer).expect("size").expect("laid out");
        let origin = tree.origin(spacer).expect("origin");
        prop_assert_eq!((size.width, size.height), (width, height));
        prop_assert!((origin.x - x).abs() <= 1e-9);
        prop_assert!((origin.y - y).abs() <= 1e-9);
    }

    #[test]
    fn fixed_components_stay_inside_their_offer(
        width in 0.0f64..1_000.0,
        height in 0.0f64..1_000.0,
        offered_width in 0.0f64..1_000.0,
        offered_height in 0.0f64..1_000.0,
        (x_alignment, y_alignment) in alignments()
    ) {
        let mut tree = ComponentTree::new(RecordingRenderer::new());
        let root = tree.create_root(Viewport::new(10, 10)).expect("root");
        let spacer = tree.add_spacer(Spacer::fixed(width, height));
        tree.anchor(spacer, root).expect("anchor");
        tree.set_x_alignment(spacer, x_alignment).expect("x alignment");
        tree.set_y_alignment(spacer, y_alignment).expect("y alignment");

        tree.compute_layout(spacer, Some(LayoutOffer::sized(offered_width, offered_height)))
            .expect("layout");
        let size = tree.size(spacer).expect("size").expect("laid out");
        let origin = tree.origin(spacer).expect("origin");

        prop_assert_eq!(size.width, width.min(offered_width));
        prop_assert_eq!(size.height, height.min(offered_height));
        prop_assert!(origin.x >= -1e-9 && origin.y >= -1e-9);
        prop_assert!(origin.x + size.width <= offered_width + 1e-9);
        prop_assert!(origin.y + size.height <= offered_height + 1e-9);
    }

    #[test]
    fn fixed_columns_get_their_request_and_flexible_columns_the_rest(
        fixed_width in 0.0f64..300.0,
        padding in 0.0f64..20.0,
        slack in 0.0f64..1_000.0
    ) {
        let axis = ComponentId::from_raw(1);
        let plot = ComponentId::from_raw(2);
        let mut table = TableLayout::new();
        table.add(axis, 0, 0).expect("axis");
        table.add(plot, 0, 1).expect("plot");
        table.set_column_padding(padding).expect("padding");
        let available = fixed_width + padding + slack;

        let request = |component: ComponentId, _: f64, _: f64| {
            if component == axis {
                SpaceRequest::new(fixed_width, 0.0)
            } else {
                SpaceRequest::zero()
            }
        };
        let fixity = |component: ComponentId| (component == axis, false);
        let allocation = table.allocate(available, 100.0, available, 100.0, &request, &fixity);
        let widths = allocation.column_widths();

        prop_assert!((widths[0] - fixed_width).abs() <= 1e-6);
        prop_assert!(widths.iter().all(|width| *width >= 0.0));
        prop_assert!((widths[0] + widths[1] + padding - available).abs() <= 1e-6);
    }
}
