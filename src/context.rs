//! Boundary between the HTTP layer and the dispatcher: query parameters plus the result value.

use crate::error::LoadError;
use crate::view_model::ViewModel;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;

/// Type-erased mutable view-model.
pub(crate) type AnyMut<'a> = &'a mut (dyn Any + Send + Sync);

/// Moves an erased view-model to an ancestor type it embeds (see `FieldDispatcher::register_parent`).
pub(crate) type Upcast = fn(&mut (dyn Any + Send + Sync)) -> Option<&mut (dyn Any + Send + Sync)>;

/// One hop towards an ancestor: the projection and the type it lands on.
#[derive(Clone, Copy)]
pub(crate) struct Projection {
    pub(crate) upcast: Upcast,
    pub(crate) target: &'static str,
}

/// What a matched loader is invoked with.
pub(crate) enum Target<'a> {
    One(AnyMut<'a>),
    Many(Vec<AnyMut<'a>>),
}

enum Shape<'a> {
    One(AnyMut<'a>),
    Many {
        element: TypeId,
        element_name: &'static str,
        items: Vec<AnyMut<'a>>,
    },
    /// Containers other than a single-element-type list, e.g. maps. Never loaded.
    Unsupported,
}

/// The response value about to be serialized, tagged by shape once at the boundary.
pub struct ResultValue<'a> {
    type_name: &'static str,
    shape: Shape<'a>,
}

impl<'a> ResultValue<'a> {
    pub fn one<T: ViewModel>(item: &'a mut T) -> Self {
        Self {
            type_name: type_name::<T>(),
            shape: Shape::One(item),
        }
    }

    pub fn many<T: ViewModel>(items: &'a mut [T]) -> Self {
        Self {
            type_name: type_name::<Vec<T>>(),
            shape: Shape::Many {
                element: TypeId::of::<T>(),
                element_name: type_name::<T>(),
                items: items.iter_mut().map(|item| item as AnyMut<'a>).collect(),
            },
        }
    }

    /// Keyed collections carry two type parameters and are skipped.
    pub fn map<K: 'static, V: 'static>(_map: &'a mut HashMap<K, V>) -> Self {
        Self {
            type_name: type_name::<HashMap<K, V>>(),
            shape: Shape::Unsupported,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is_list(&self) -> bool {
        matches!(self.shape, Shape::Many { .. })
    }

    /// Type loaders are matched against: the value's own type, or a list's element type.
    pub fn effective_type(&self) -> Option<(TypeId, &'static str)> {
        match &self.shape {
            Shape::One(item) => Some(((**item).type_id(), self.type_name)),
            Shape::Many {
                element, element_name, ..
            } => Some((*element, *element_name)),
            Shape::Unsupported => None,
        }
    }

    /// Reborrow the value for one loader, projected through `path` to the loader's type.
    pub(crate) fn target(&mut self, path: &[Projection]) -> Result<Option<Target<'_>>, LoadError> {
        Ok(match &mut self.shape {
            Shape::One(item) => Some(Target::One(project(&mut **item, path)?)),
            Shape::Many { items, .. } => Some(Target::Many(
                items
                    .iter_mut()
                    .map(|item| project(&mut **item, path))
                    .collect::<Result<_, _>>()?,
            )),
            Shape::Unsupported => None,
        })
    }
}

fn project<'b>(mut item: AnyMut<'b>, path: &[Projection]) -> Result<AnyMut<'b>, LoadError> {
    for step in path {
        item = (step.upcast)(item).ok_or(LoadError::TypeMismatch { expected: step.target })?;
    }
    Ok(item)
}

/// Everything the dispatcher needs from one request/response exchange.
pub struct ResponseContext<'a> {
    query: &'a [(String, String)],
    result: Option<ResultValue<'a>>,
}

impl<'a> ResponseContext<'a> {
    pub fn new(query: &'a [(String, String)], result: Option<ResultValue<'a>>) -> Self {
        Self { query, result }
    }

    pub fn query(&self) -> &'a [(String, String)] {
        self.query
    }

    /// All values for `name` (case-insensitive key), joined with `,`. `None` if the parameter is absent.
    pub fn query_value(&self, name: &str) -> Option<String> {
        let values: Vec<&str> = self
            .query
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect();
        (!values.is_empty()).then(|| values.join(","))
    }

    pub fn result(&self) -> Option<&ResultValue<'a>> {
        self.result.as_ref()
    }

    pub(crate) fn result_mut(&mut self) -> Option<&mut ResultValue<'a>> {
        self.result.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Book {
        title: String,
    }

    impl ViewModel for Book {}

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_query_value_matches_name_case_insensitively() {
        let query = pairs(&[("page", "2"), ("Fields", "reviews")]);
        let ctx = ResponseContext::new(&query, None);
        assert_eq!(ctx.query_value("fields").as_deref(), Some("reviews"));
        assert_eq!(ctx.query_value("limit"), None);
        assert_eq!(ctx.query().len(), 2);
    }

    #[test]
    fn test_query_value_joins_repeated_parameters() {
        let query = pairs(&[("fields", "reviews"), ("FIELDS", "owner.name")]);
        let ctx = ResponseContext::new(&query, None);
        assert_eq!(ctx.query_value("fields").as_deref(), Some("reviews,owner.name"));
    }

    #[test]
    fn test_effective_type_single_and_list() {
        let mut book = Book { title: "Dune".into() };
        let one = ResultValue::one(&mut book);
        assert_eq!(one.effective_type().map(|(id, _)| id), Some(TypeId::of::<Book>()));
        assert!(!one.is_list());

        let mut books = vec![Book { title: "Emma".into() }];
        let many = ResultValue::many(&mut books);
        assert_eq!(many.effective_type().map(|(id, _)| id), Some(TypeId::of::<Book>()));
        assert!(many.is_list());
    }

    #[test]
    fn test_empty_list_still_has_element_type() {
        let mut books: Vec<Book> = Vec::new();
        let many = ResultValue::many(&mut books);
        assert_eq!(many.effective_type().map(|(id, _)| id), Some(TypeId::of::<Book>()));
    }

    #[test]
    fn test_map_has_no_effective_type() {
        let mut by_title: HashMap<String, u32> = HashMap::new();
        let value = ResultValue::map(&mut by_title);
        assert!(value.effective_type().is_none());
        assert!(value.type_name().contains("HashMap"));
    }

    #[test]
    fn test_target_downcasts_without_projection() {
        let mut books = vec![Book { title: "a".into() }, Book { title: "b".into() }];
        let mut value = ResultValue::many(&mut books);
        match value.target(&[]).unwrap() {
            Some(Target::Many(items)) => {
                let titles: Vec<String> = items
                    .into_iter()
                    .map(|item| item.downcast_mut::<Book>().unwrap().title.clone())
                    .collect();
                assert_eq!(titles, vec!["a", "b"]);
            }
            _ => panic!("expected a list target"),
        }
    }

    fn refuse(_: &mut (dyn Any + Send + Sync)) -> Option<&mut (dyn Any + Send + Sync)> {
        None
    }

    #[test]
    fn test_failed_projection_names_ancestor_type() {
        let mut books = vec![Book { title: "a".into() }];
        let mut value = ResultValue::many(&mut books);
        let path = [Projection {
            upcast: refuse,
            target: "catalog::Listing",
        }];
        match value.target(&path) {
            Err(LoadError::TypeMismatch { expected }) => assert_eq!(expected, "catalog::Listing"),
            _ => panic!("expected a type mismatch"),
        }
    }
}
