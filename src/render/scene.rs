use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::core::{Bounds, Point, Size};
use crate::error::{ChartError, ChartResult};
use crate::render::{AttrValue, Color};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Rect,
    Line,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    Linear,
    #[default]
    ExpOut,
}

impl Easing {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::ExpOut => "exp-out",
        }
    }
}

/// Timing attached to an element by an animator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub delay_ms: f64,
    pub duration_ms: f64,
    pub easing: Easing,
}

/// One retained visual element with ordered attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub kind: ElementKind,
    pub classes: SmallVec<[String; 4]>,
    pub attrs: IndexMap<&'static str, AttrValue>,
    pub text: Option<String>,
    pub visible: bool,
    pub transition: Option<Transition>,
}

impl Element {
    #[must_use]
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            classes: SmallVec::new(),
            attrs: IndexMap::new(),
            text: None,
            visible: true,
            transition: None,
        }
    }

    #[must_use]
    pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(ElementKind::Rect)
            .with_attr("x", x)
            .with_attr("y", y)
            .with_attr("width", width)
            .with_attr("height", height)
    }

    #[must_use]
    pub fn line(from: Point, to: Point) -> Self {
        Self::new(ElementKind::Line)
            .with_attr("x1", from.x)
            .with_attr("y1", from.y)
            .with_attr("x2", to.x)
            .with_attr("y2", to.y)
    }

    #[must_use]
    pub fn text(content: impl Into<String>, x: f64, y: f64) -> Self {
        let mut element = Self::new(ElementKind::Text)
            .with_attr("x", x)
            .with_attr("y", y);
        element.text = Some(content.into());
        element
    }

    #[must_use]
    pub fn with_attr(mut self, name: &'static str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name, value.into());
        self
    }

    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        let class = class.into();
        if !self.has_class(&class) {
            self.classes.push(class);
        }
        self
    }

    #[must_use]
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn set_attr(&mut self, name: &'static str, value: impl Into<AttrValue>) {
        self.attrs.insert(name, value.into());
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    #[must_use]
    pub fn number(&self, name: &str) -> Option<f64> {
        self.attr(name).and_then(AttrValue::as_number)
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|existing| existing == class)
    }

    /// Pixel bounds of rects and lines; `None` for text.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        match self.kind {
            ElementKind::Rect => {
                let origin = Point::new(self.number("x")?, self.number("y")?);
                let size = Size::new(self.number("width")?, self.number("height")?);
                Some(Bounds::from_origin_size(origin, size))
            }
            ElementKind::Line => Some(Bounds::from_corners(
                Point::new(self.number("x1")?, self.number("y1")?),
                Point::new(self.number("x2")?, self.number("y2")?),
            )),
            ElementKind::Text => None,
        }
    }

    pub fn validate(&self) -> ChartResult<()> {
        for (name, value) in &self.attrs {
            match value {
                AttrValue::Number(number) if !number.is_finite() => {
                    return Err(ChartError::InvalidData(format!(
                        "attribute `{name}` must be finite"
                    )));
                }
                AttrValue::Color(color) => color.validate()?,
                _ => {}
            }
        }
        if self.kind == ElementKind::Rect {
            for name in ["width", "height"] {
                if self.number(name).is_some_and(|value| value < 0.0) {
                    return Err(ChartError::InvalidData(format!(
                        "rect `{name}` must be >= 0"
                    )));
                }
            }
        }
        if self.kind == ElementKind::Text && self.text.as_deref().is_none_or(str::is_empty) {
            return Err(ChartError::InvalidData(
                "text element must not be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Retained output of one component paint: named layers of elements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    pub size: Size,
    layers: IndexMap<String, Vec<Element>>,
}

impl Scene {
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            size,
            layers: IndexMap::new(),
        }
    }

    /// Returns the named layer, creating it after existing layers.
    pub fn layer_mut(&mut self, name: &str) -> &mut Vec<Element> {
        self.layers.entry(name.to_owned()).or_default()
    }

    #[must_use]
    pub fn layer(&self, name: &str) -> &[Element] {
        self.layers.get(name).map_or(&[][..], Vec::as_slice)
    }

    pub fn layers(&self) -> impl Iterator<Item = (&str, &[Element])> {
        self.layers
            .iter()
            .map(|(name, elements)| (name.as_str(), elements.as_slice()))
    }

    pub fn remove_layer(&mut self, name: &str) -> Option<Vec<Element>> {
        self.layers.shift_remove(name)
    }

    pub fn push(&mut self, layer: &str, element: Element) {
        self.layer_mut(layer).push(element);
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.layers.values().flatten()
    }

    pub fn elements_with_class<'a>(&'a self, class: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |element| element.has_class(class))
    }

    pub fn clear(&mut self) {
        self.layers.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.values().all(Vec::is_empty)
    }

    pub fn validate(&self) -> ChartResult<()> {
        for element in self.elements() {
            element.validate()?;
        }
        Ok(())
    }
}

/// Fill used when a bar has no explicit fill attribute.
pub const DEFAULT_FILL: Color = Color::rgb(82.0 / 255.0, 121.0 / 255.0, 199.0 / 255.0);
