use std::fmt;
use std::rc::Rc;

use crate::core::{Dataset, Datum, Scale, Value};

pub type AccessorFn = Rc<dyn Fn(&Datum, usize, &Dataset) -> Value>;

/// Reads one projected value out of a datum.
#[derive(Clone)]
pub enum Accessor {
    /// Top-level JSON field of an object datum.
    Field(String),
    Constant(Value),
    Function(AccessorFn),
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.debug_tuple("Field").field(name).finish(),
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::Function(_) => f.write_str("Function"),
        }
    }
}

impl Accessor {
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    #[must_use]
    pub fn constant(value: impl Into<Value>) -> Self {
        Self::Constant(value.into())
    }

    pub fn from_fn(accessor: impl Fn(&Datum, usize, &Dataset) -> Value + 'static) -> Self {
        Self::Function(Rc::new(accessor))
    }

    #[must_use]
    pub fn value(&self, datum: &Datum, index: usize, dataset: &Dataset) -> Value {
        match self {
            Self::Field(name) => datum
                .get(name.as_str())
                .map_or(Value::Missing, Value::from_json),
            Self::Constant(value) => value.clone(),
            Self::Function(accessor) => accessor(datum, index, dataset),
        }
    }
}

/// An accessor paired with the scale that maps its values to pixels.
#[derive(Debug, Clone)]
pub struct ScaleBinding {
    pub accessor: Accessor,
    pub scale: Option<Rc<dyn Scale>>,
}

impl ScaleBinding {
    #[must_use]
    pub fn new(accessor: Accessor, scale: Option<Rc<dyn Scale>>) -> Self {
        Self { accessor, scale }
    }

    /// Pixel position of a datum; NaN when the value cannot be mapped.
    #[must_use]
    pub fn project(&self, datum: &Datum, index: usize, dataset: &Dataset) -> f64 {
        self.project_value(&self.accessor.value(datum, index, dataset))
    }

    #[must_use]
    pub fn project_value(&self, value: &Value) -> f64 {
        match &self.scale {
            Some(scale) => scale.scale(value),
            None => value.as_f64().unwrap_or(f64::NAN),
        }
    }
}
