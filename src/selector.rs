//! Strongly-typed field references: `property!(|b: Book| b.reviews)` resolves to `"reviews"`.
//!
//! The macro type-checks the access against the model at compile time and keeps the
//! expression text; [`PropertyRef::name`] accepts only a direct `param.field` access.

use crate::error::LoadError;
use regex::Regex;
use std::sync::OnceLock;

fn direct_access() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*\.\s*([A-Za-z_][A-Za-z0-9_]*)\s*$")
            .expect("static pattern")
    })
}

/// A captured `|param: Model| expr` selector.
#[derive(Clone, Copy, Debug)]
pub struct PropertyRef {
    model: &'static str,
    param: &'static str,
    expr: &'static str,
}

impl PropertyRef {
    /// Prefer [`property!`](crate::property), which also checks the access compiles.
    pub fn new<T: ?Sized>(param: &'static str, expr: &'static str) -> Self {
        Self {
            model: std::any::type_name::<T>(),
            param,
            expr,
        }
    }

    pub fn model(&self) -> &'static str {
        self.model
    }

    pub fn expr(&self) -> &'static str {
        self.expr
    }

    /// Declared field name, or `UnsupportedSelector` for anything but `param.field`.
    pub fn name(&self) -> Result<&'static str, LoadError> {
        let unsupported = || LoadError::UnsupportedSelector(format!("|{}| {}", self.param, self.expr));
        let caps = direct_access().captures(self.expr).ok_or_else(unsupported)?;
        match (caps.get(1), caps.get(2)) {
            (Some(receiver), Some(field)) if receiver.as_str() == self.param => Ok(field.as_str()),
            _ => Err(unsupported()),
        }
    }
}

/// Build a [`PropertyRef`] from a closure-shaped selector: `property!(|b: Book| b.reviews)`.
#[macro_export]
macro_rules! property {
    (|$param:ident : $model:ty| $body:expr) => {{
        let _ = |$param: &$model| {
            let _ = &$body;
        };
        $crate::PropertyRef::new::<$model>(stringify!($param), stringify!($body))
    }};
}
