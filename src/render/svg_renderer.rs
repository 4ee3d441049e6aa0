use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::core::Size;
use crate::error::ChartResult;
use crate::layout::ComponentId;
use crate::render::{AttrValue, ElementKind, PaintTarget, Renderer, Scene};

const SVG_NS: &str = "http://www.w3.org/2000/svg";

/// Composes painted component scenes into one SVG document.
#[derive(Debug, Default)]
pub struct SvgRenderer {
    scenes: IndexMap<ComponentId, (PaintTarget, Scene)>,
}

impl SvgRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes every retained scene, translated to its origin in the root.
    #[must_use]
    pub fn to_svg_string(&self, size: Size) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            r#"<svg xmlns="{SVG_NS}" width="{}" height="{}" viewBox="0 0 {} {}">"#,
            size.width, size.height, size.width, size.height
        );

        for (target, scene) in self.scenes.values() {
            let _ = writeln!(
                out,
                r#"<g class="component" transform="translate({},{})">"#,
                target.origin.x, target.origin.y
            );
            for (layer, elements) in scene.layers() {
                let _ = writeln!(out, r#"<g class="{}">"#, escape_xml(layer));
                for element in elements {
                    write_element(&mut out, element);
                }
                out.push_str("</g>\n");
            }
            out.push_str("</g>\n");
        }

        out.push_str("</svg>\n");
        out
    }
}

impl Renderer for SvgRenderer {
    fn paint(&mut self, target: PaintTarget, scene: &Scene) -> ChartResult<()> {
        scene.validate()?;
        self.scenes.insert(target.component, (target, scene.clone()));
        Ok(())
    }

    fn clear(&mut self, component: ComponentId) {
        self.scenes.shift_remove(&component);
    }
}

fn write_element(out: &mut String, element: &crate::render::Element) {
    let tag = match element.kind {
        ElementKind::Rect => "rect",
        ElementKind::Line => "line",
        ElementKind::Text => "text",
    };
    let _ = write!(out, "<{tag}");
    if !element.classes.is_empty() {
        let _ = write!(out, r#" class="{}""#, escape_xml(&element.classes.join(" ")));
    }
    for (name, value) in &element.attrs {
        let rendered = match value {
            AttrValue::Text(text) => escape_xml(text),
            other => other.to_string(),
        };
        let _ = write!(out, r#" {name}="{rendered}""#);
    }
    if !element.visible {
        out.push_str(r#" visibility="hidden""#);
    }
    match (&element.kind, &element.text) {
        (ElementKind::Text, Some(text)) => {
            let _ = writeln!(out, ">{}</{tag}>", escape_xml(text));
        }
        _ => out.push_str("/>\n"),
    }
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
