//! Per-view-model field registry: normalized field name -> single and list loader.
//!
//! Loaders fetch concurrently against shared references and hand back a patch; once every
//! requested field has loaded, the patches are applied to the target in request order.

use crate::error::LoadError;
use crate::fields::{normalize_field, normalize_fields, sub_fields, top_level_fields, FieldContext};
use crate::selector::PropertyRef;
use futures::future::{self, BoxFuture};
use std::collections::HashMap;

/// Writes a loaded value onto one view-model.
pub type FieldPatch<T> = Box<dyn FnOnce(&mut T) + Send>;
/// Writes loaded values onto every item of a list, in the order the loader received them.
pub type ListPatch<T> = Box<dyn FnOnce(&mut [&mut T]) + Send>;

type LoadOne<T, D> = Box<
    dyn for<'a> Fn(&'a T, FieldContext<'a, D>) -> BoxFuture<'a, Result<FieldPatch<T>, LoadError>>
        + Send
        + Sync,
>;
type LoadMany<T, D> = Box<
    dyn for<'a> Fn(&'a [&'a T], FieldContext<'a, D>) -> BoxFuture<'a, Result<ListPatch<T>, LoadError>>
        + Send
        + Sync,
>;

pub fn patch<T, F>(f: F) -> FieldPatch<T>
where
    F: FnOnce(&mut T) + Send + 'static,
{
    Box::new(f)
}

pub fn list_patch<T, F>(f: F) -> ListPatch<T>
where
    F: FnOnce(&mut [&mut T]) + Send + 'static,
{
    Box::new(f)
}

/// Loaders for one field.
pub struct FieldLoader<T, D> {
    name: String,
    one: LoadOne<T, D>,
    many: LoadMany<T, D>,
}

impl<T, D> FieldLoader<T, D> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

pub struct FieldRegistry<T, D> {
    loaders: HashMap<String, FieldLoader<T, D>>,
}

impl<T, D> Default for FieldRegistry<T, D> {
    fn default() -> Self {
        Self {
            loaders: HashMap::new(),
        }
    }
}

impl<T, D> FieldRegistry<T, D>
where
    T: Send + Sync + 'static,
    D: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the loaders for `name`; an existing registration for the same normalized name is replaced.
    pub fn register<One, Many>(&mut self, name: &str, one: One, many: Many) -> &mut Self
    where
        One: for<'a> Fn(&'a T, FieldContext<'a, D>) -> BoxFuture<'a, Result<FieldPatch<T>, LoadError>>
            + Send
            + Sync
            + 'static,
        Many: for<'a> Fn(&'a [&'a T], FieldContext<'a, D>) -> BoxFuture<'a, Result<ListPatch<T>, LoadError>>
            + Send
            + Sync
            + 'static,
    {
        let name = normalize_field(name);
        let loader = FieldLoader {
            name: name.clone(),
            one: Box::new(one),
            many: Box::new(many),
        };
        if self.loaders.insert(name.clone(), loader).is_some() {
            tracing::debug!(field = %name, model = std::any::type_name::<T>(), "field loader replaced");
        }
        self
    }

    /// Same as [`register`](Self::register), keyed by a `property!` selector.
    pub fn register_property<One, Many>(
        &mut self,
        property: PropertyRef,
        one: One,
        many: Many,
    ) -> Result<&mut Self, LoadError>
    where
        One: for<'a> Fn(&'a T, FieldContext<'a, D>) -> BoxFuture<'a, Result<FieldPatch<T>, LoadError>>
            + Send
            + Sync
            + 'static,
        Many: for<'a> Fn(&'a [&'a T], FieldContext<'a, D>) -> BoxFuture<'a, Result<ListPatch<T>, LoadError>>
            + Send
            + Sync
            + 'static,
    {
        let name = property.name()?;
        Ok(self.register(name, one, many))
    }

    pub fn contains(&self, field: &str) -> bool {
        self.loaders.contains_key(&normalize_field(field))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.loaders.values().map(FieldLoader::name)
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    pub fn sub_fields<S: AsRef<str>>(&self, parent: &str, requested: &[S]) -> Vec<String> {
        sub_fields(parent, requested)
    }

    /// Loaders for every top-level field in `fields`; unknown fields fail before anything runs.
    fn select(&self, fields: &[String]) -> Result<Vec<&FieldLoader<T, D>>, LoadError> {
        top_level_fields(fields)
            .into_iter()
            .map(|field| {
                self.loaders.get(field).ok_or_else(|| LoadError::UnknownField {
                    field: field.to_string(),
                    model: std::any::type_name::<T>(),
                })
            })
            .collect()
    }

    /// Load every requested top-level field onto one view-model.
    pub async fn load_one<S: AsRef<str>>(&self, item: &mut T, requested: &[S], shared: &D) -> Result<(), LoadError> {
        let fields = normalize_fields(requested);
        let selected = self.select(&fields)?;
        if selected.is_empty() {
            return Ok(());
        }
        tracing::debug!(
            model = std::any::type_name::<T>(),
            fields = ?selected.iter().map(|l| l.name()).collect::<Vec<_>>(),
            "loading fields"
        );
        let patches = {
            let view: &T = &*item;
            let ctx = FieldContext::new(&fields, shared);
            future::try_join_all(selected.iter().map(|loader| (loader.one)(view, ctx))).await?
        };
        for patch in patches {
            patch(&mut *item);
        }
        Ok(())
    }

    /// Load every requested top-level field onto a list; each list loader runs once for all items.
    pub async fn load_many<S: AsRef<str>>(
        &self,
        items: &mut [&mut T],
        requested: &[S],
        shared: &D,
    ) -> Result<(), LoadError> {
        let fields = normalize_fields(requested);
        let selected = self.select(&fields)?;
        if selected.is_empty() {
            return Ok(());
        }
        tracing::debug!(
            model = std::any::type_name::<T>(),
            items = items.len(),
            fields = ?selected.iter().map(|l| l.name()).collect::<Vec<_>>(),
            "loading fields"
        );
        let patches = {
            let shared_items: Vec<&T> = items.iter().map(|item| &**item).collect();
            let view: &[&T] = &shared_items;
            let ctx = FieldContext::new(&fields, shared);
            future::try_join_all(selected.iter().map(|loader| (loader.many)(view, ctx))).await?
        };
        for patch in patches {
            patch(&mut *items);
        }
        Ok(())
    }
}
