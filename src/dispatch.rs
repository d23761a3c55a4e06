//! Dispatch engine: picks the loaders for a response's type and runs them once per request.
//!
//! Loaders are keyed by the `TypeId` of their view-model. A result whose type embeds a
//! registered parent (`register_parent`) is also handled by the parent's loader.

use crate::config::DispatchConfig;
use crate::context::{Projection, ResponseContext, Target};
use crate::error::LoadError;
use crate::fields::parse_fields;
use crate::loader::{ModelLoader, ViewModelLoader};
use crate::view_model::ViewModel;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::{type_name, Any, TypeId};
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;

/// A view-model loader with its model type erased.
trait ErasedLoader<D>: Send + Sync {
    fn model_name(&self) -> &'static str;

    fn load<'a>(&'a self, target: Target<'a>, fields: &'a [String], shared: &'a D) -> BoxFuture<'a, Result<(), LoadError>>;
}

fn downcast<T: Any>(item: &mut (dyn Any + Send + Sync)) -> Result<&mut T, LoadError> {
    item.downcast_mut::<T>().ok_or(LoadError::TypeMismatch {
        expected: type_name::<T>(),
    })
}

impl<L: ViewModelLoader> ErasedLoader<L::Shared> for ModelLoader<L> {
    fn model_name(&self) -> &'static str {
        type_name::<L::Model>()
    }

    fn load<'a>(
        &'a self,
        target: Target<'a>,
        fields: &'a [String],
        shared: &'a L::Shared,
    ) -> BoxFuture<'a, Result<(), LoadError>> {
        async move {
            match target {
                Target::One(item) => {
                    let item = downcast::<L::Model>(item)?;
                    self.load_one(item, fields, shared).await
                }
                Target::Many(items) => {
                    let mut items = items
                        .into_iter()
                        .map(downcast::<L::Model>)
                        .collect::<Result<Vec<_>, _>>()?;
                    self.load_many(&mut items, fields, shared).await
                }
            }
        }
        .boxed()
    }
}

fn upcast<Derived, Base>(item: &mut (dyn Any + Send + Sync)) -> Option<&mut (dyn Any + Send + Sync)>
where
    Derived: AsMut<Base> + 'static,
    Base: Any + Send + Sync,
{
    item.downcast_mut::<Derived>()
        .map(|derived| <Derived as AsMut<Base>>::as_mut(derived) as &mut (dyn Any + Send + Sync))
}

struct Parent {
    id: TypeId,
    step: Projection,
}

/// Registered view-model loaders sharing one request-scoped payload type `D`.
///
/// Configure it fully, then share it (e.g. `Arc<FieldDispatcher<D>>` in router state);
/// registration takes `&mut self`, so nothing changes once requests are being served.
pub struct FieldDispatcher<D> {
    config: DispatchConfig,
    loaders: HashMap<TypeId, Box<dyn ErasedLoader<D>>>,
    parents: HashMap<TypeId, Vec<Parent>>,
}

impl<D: Send + Sync + 'static> Default for FieldDispatcher<D> {
    fn default() -> Self {
        Self::new(DispatchConfig::default())
    }
}

impl<D: Send + Sync + 'static> FieldDispatcher<D> {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            loaders: HashMap::new(),
            parents: HashMap::new(),
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Register the loader for `L::Model`; replaces any earlier loader for that type.
    pub fn register_loader<L>(&mut self, loader: L) -> &mut Self
    where
        L: ViewModelLoader<Shared = D>,
    {
        let id = TypeId::of::<L::Model>();
        if self.loaders.insert(id, Box::new(ModelLoader::new(loader))).is_some() {
            tracing::debug!(model = type_name::<L::Model>(), "view-model loader replaced");
        }
        self
    }

    /// Declare that `Derived` embeds `Base`, so loaders for `Base` also run for `Derived` results.
    pub fn register_parent<Derived, Base>(&mut self) -> &mut Self
    where
        Derived: ViewModel + AsMut<Base>,
        Base: ViewModel,
    {
        let parents = self.parents.entry(TypeId::of::<Derived>()).or_default();
        let id = TypeId::of::<Base>();
        if !parents.iter().any(|p| p.id == id) {
            parents.push(Parent {
                id,
                step: Projection {
                    upcast: upcast::<Derived, Base>,
                    target: type_name::<Base>(),
                },
            });
        }
        self
    }

    pub fn has_loader<T: ViewModel>(&self) -> bool {
        self.loaders.contains_key(&TypeId::of::<T>())
    }

    /// Loaders for `ty` and its ancestors (breadth-first), each with the projection path to its model.
    fn select(&self, ty: TypeId) -> Vec<(&dyn ErasedLoader<D>, Vec<Projection>)> {
        let mut selected = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([(ty, Vec::new())]);
        while let Some((ty, path)) = queue.pop_front() {
            if !visited.insert(ty) {
                continue;
            }
            for parent in self.parents.get(&ty).into_iter().flatten() {
                tracing::trace!(parent = parent.step.target, "following parent link");
                let mut next: Vec<Projection> = path.clone();
                next.push(parent.step);
                queue.push_back((parent.id, next));
            }
            if let Some(loader) = self.loaders.get(&ty) {
                selected.push((loader.as_ref(), path));
            }
        }
        selected
    }

    /// Load the requested fields onto the context's result.
    ///
    /// No-op (and `fetch_shared` is not called) when there is no result, the result is not a
    /// single view-model or single-element-type list, the fields parameter is absent or blank,
    /// or no loader matches. Otherwise `fetch_shared` runs exactly once.
    pub async fn process<'a, F, Fut>(&self, ctx: ResponseContext<'a>, fetch_shared: F) -> Result<(), LoadError>
    where
        F: FnOnce(&ResponseContext<'a>) -> Fut + Send,
        Fut: Future<Output = Result<D, LoadError>> + Send,
    {
        let mut ctx = ctx;
        let Some(result) = ctx.result() else {
            tracing::debug!("no result value, skipping field loading");
            return Ok(());
        };
        let Some((effective, effective_name)) = result.effective_type() else {
            tracing::debug!(result = result.type_name(), "unsupported result shape, skipping field loading");
            return Ok(());
        };
        let Some(raw) = ctx.query_value(&self.config.param_name) else {
            return Ok(());
        };
        let fields = parse_fields(&raw);
        if fields.is_empty() {
            return Ok(());
        }
        let selected = self.select(effective);
        if selected.is_empty() {
            tracing::debug!(model = effective_name, "no field loaders registered");
            return Ok(());
        }

        let shared = fetch_shared(&ctx).await?;
        tracing::debug!(
            model = effective_name,
            fields = ?fields,
            loaders = selected.len(),
            "dispatching field loaders"
        );

        let Some(result) = ctx.result_mut() else {
            return Ok(());
        };
        for (loader, path) in selected {
            let Some(target) = result.target(&path)? else {
                continue;
            };
            tracing::trace!(loader = loader.model_name(), "running view-model loader");
            loader.load(target, &fields, &shared).await?;
        }
        Ok(())
    }
}
