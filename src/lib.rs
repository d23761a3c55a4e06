//! Fieldset SDK: sparse fieldset loading for REST responses.
//!
//! Clients ask for optional data with `?fields=reviews,owner.name`; registered async loaders
//! populate those fields on the response view-model (or list of them) before serialization.

pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod extractors;
pub mod fields;
pub mod loader;
pub mod registry;
pub mod response;
pub mod selector;
pub mod view_model;

pub use config::DispatchConfig;
pub use context::{ResponseContext, ResultValue};
pub use dispatch::FieldDispatcher;
pub use error::{BoxError, LoadError};
pub use extractors::QueryPairs;
pub use fields::{parse_fields, sub_fields, FieldContext, FIELD_DELIMITER};
pub use loader::{ModelLoader, ViewModelLoader};
pub use registry::{list_patch, patch, FieldPatch, FieldRegistry, ListPatch};
pub use response::{success_many, success_one, SuccessMany, SuccessOne};
pub use selector::PropertyRef;
pub use view_model::{fields_parameter, LoadableField, ViewModel};
