//! View-model loaders: user code registers fields once; `ModelLoader` builds the registry lazily.

use crate::error::LoadError;
use crate::fields::sub_fields;
use crate::registry::FieldRegistry;
use crate::view_model::ViewModel;
use tokio::sync::OnceCell;

/// Field loaders for one view-model type.
///
/// ```ignore
/// struct BookLoader { reviews: ReviewStore }
///
/// impl ViewModelLoader for BookLoader {
///     type Model = Book;
///     type Shared = Viewer;
///
///     fn register_fields(&self, fields: &mut FieldRegistry<Book, Viewer>) -> Result<(), LoadError> {
///         let store = self.reviews.clone();
///         fields.register("reviews", move |book, ctx| { /* ... */ }, move |books, ctx| { /* ... */ });
///         Ok(())
///     }
/// }
/// ```
pub trait ViewModelLoader: Send + Sync + 'static {
    type Model: ViewModel;
    /// Request-scoped payload fetched once per dispatch and shared by every field loader.
    type Shared: Send + Sync + 'static;

    /// Called once, before the first load.
    fn register_fields(&self, fields: &mut FieldRegistry<Self::Model, Self::Shared>) -> Result<(), LoadError>;
}

pub struct ModelLoader<L: ViewModelLoader> {
    inner: L,
    registry: OnceCell<FieldRegistry<L::Model, L::Shared>>,
}

impl<L: ViewModelLoader> ModelLoader<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            registry: OnceCell::new(),
        }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    /// The field registry, built on first call.
    pub async fn registry(&self) -> Result<&FieldRegistry<L::Model, L::Shared>, LoadError> {
        self.registry
            .get_or_try_init(|| async move {
                let mut registry = FieldRegistry::new();
                self.inner.register_fields(&mut registry)?;
                tracing::debug!(
                    model = std::any::type_name::<L::Model>(),
                    fields = registry.len(),
                    "field registry initialized"
                );
                Ok::<_, LoadError>(registry)
            })
            .await
    }

    pub fn sub_fields<S: AsRef<str>>(&self, parent: &str, requested: &[S]) -> Vec<String> {
        sub_fields(parent, requested)
    }

    pub async fn load_one<S: AsRef<str>>(
        &self,
        item: &mut L::Model,
        requested: &[S],
        shared: &L::Shared,
    ) -> Result<(), LoadError> {
        self.registry().await?.load_one(item, requested, shared).await
    }

    pub async fn load_many<S: AsRef<str>>(
        &self,
        items: &mut [&mut L::Model],
        requested: &[S],
        shared: &L::Shared,
    ) -> Result<(), LoadError> {
        self.registry().await?.load_many(items, requested, shared).await
    }

    /// [`load_many`](Self::load_many) over an owned slice.
    pub async fn load_all<S: AsRef<str>>(
        &self,
        items: &mut [L::Model],
        requested: &[S],
        shared: &L::Shared,
    ) -> Result<(), LoadError> {
        let mut targets: Vec<&mut L::Model> = items.iter_mut().collect();
        self.load_many(&mut targets, requested, shared).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{list_patch, patch};
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Author {
        id: u32,
        books: Option<usize>,
    }

    impl ViewModel for Author {}

    struct AuthorLoader {
        registrations: Arc<AtomicUsize>,
    }

    impl ViewModelLoader for AuthorLoader {
        type Model = Author;
        type Shared = usize;

        fn register_fields(&self, fields: &mut FieldRegistry<Author, usize>) -> Result<(), LoadError> {
            self.registrations.fetch_add(1, Ordering::SeqCst);
            fields.register(
                "books",
                |author, ctx| {
                    let count = author.id as usize + *ctx.shared();
                    async move { Ok(patch(move |a: &mut Author| a.books = Some(count))) }.boxed()
                },
                |authors, ctx| {
                    let base = *ctx.shared() + authors.len();
                    async move {
                        Ok(list_patch(move |authors: &mut [&mut Author]| {
                            for author in authors.iter_mut() {
                                author.books = Some(base);
                            }
                        }))
                    }
                    .boxed()
                },
            );
            Ok(())
        }
    }

    struct BrokenLoader;

    impl ViewModelLoader for BrokenLoader {
        type Model = Author;
        type Shared = usize;

        fn register_fields(&self, fields: &mut FieldRegistry<Author, usize>) -> Result<(), LoadError> {
            fields.register_property(
                crate::property!(|a: Author| a.books.unwrap_or(0)),
                |_a, _ctx| async { Ok(patch(|_: &mut Author| {})) }.boxed(),
                |_a, _ctx| async { Ok(list_patch(|_: &mut [&mut Author]| {})) }.boxed(),
            )?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_registry_built_once() {
        let registrations = Arc::new(AtomicUsize::new(0));
        let loader = ModelLoader::new(AuthorLoader {
            registrations: registrations.clone(),
        });
        let mut author = Author { id: 2, ..Default::default() };

        for _ in 0..3 {
            loader.load_one(&mut author, &["books"], &10).await.unwrap();
        }

        assert_eq!(registrations.load(Ordering::SeqCst), 1);
        assert_eq!(loader.inner().registrations.load(Ordering::SeqCst), 1);
        assert_eq!(author.books, Some(12));
    }

    #[tokio::test]
    async fn test_load_all_uses_list_loader() {
        let loader = ModelLoader::new(AuthorLoader {
            registrations: Arc::default(),
        });
        let mut authors: Vec<Author> = (0..4).map(|id| Author { id, ..Default::default() }).collect();

        loader.load_all(&mut authors, &["BOOKS"], &1).await.unwrap();

        assert!(authors.iter().all(|a| a.books == Some(5)));
    }

    #[tokio::test]
    async fn test_registration_error_surfaces_on_load() {
        let loader = ModelLoader::new(BrokenLoader);
        let mut author = Author::default();

        let err = loader.load_one(&mut author, &["books"], &0).await.unwrap_err();

        assert!(matches!(err, LoadError::UnsupportedSelector(_)));
    }

    #[test]
    fn test_sub_fields_delegates() {
        let loader = ModelLoader::new(BrokenLoader);
        assert_eq!(loader.sub_fields("books", &["books.title", "id"]), vec!["title"]);
    }
}
