//! View-model marker and the loadable-field side table.
//!
//! The engine never reads this metadata; it exists for documentation, e.g. the OpenAPI
//! description of the `fields` query parameter.

use crate::config::DispatchConfig;
use std::any::Any;
use utoipa::openapi::path::{Parameter, ParameterBuilder, ParameterIn};
use utoipa::openapi::schema::{ObjectBuilder, Schema, Type};
use utoipa::openapi::{RefOr, Required};

/// A response type that field loaders can populate.
pub trait ViewModel: Any + Send + Sync {
    /// Fields that are only filled when requested through the fields parameter.
    fn loadable_fields() -> &'static [LoadableField]
    where
        Self: Sized,
    {
        &[]
    }
}

/// Marks a field as loaded on demand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadableField {
    pub name: &'static str,
    pub description: &'static str,
}

impl LoadableField {
    pub const fn new(name: &'static str, description: &'static str) -> Self {
        Self { name, description }
    }
}

/// OpenAPI query parameter listing the on-demand fields of `T`.
pub fn fields_parameter<T: ViewModel>(config: &DispatchConfig) -> Parameter {
    let mut description = String::from("Comma-separated optional fields to load. Use parent.child for nested detail.");
    let fields = T::loadable_fields();
    if !fields.is_empty() {
        description.push_str(" Available:");
        for field in fields {
            description.push_str(&format!("\n- `{}`: {}", field.name, field.description));
        }
    }
    let schema = ObjectBuilder::new().schema_type(Type::String).build();
    ParameterBuilder::new()
        .name(config.param_name.clone())
        .parameter_in(ParameterIn::Query)
        .required(Required::False)
        .description(Some(description))
        .schema(Some(RefOr::T(Schema::Object(schema))))
        .build()
}
