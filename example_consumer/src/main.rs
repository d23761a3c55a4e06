//! Example consumer: an in-memory bookstore API whose handlers load optional fields on request.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Then try `curl 'http://127.0.0.1:3000/books?fields=reviews,owner.name&lang=fr'`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use fieldset_sdk::{
    fields_parameter, list_patch, patch, property, success_many, success_one, DispatchConfig, FieldDispatcher,
    FieldRegistry, LoadError, LoadableField, QueryPairs, ResponseContext, ResultValue, ViewModel, ViewModelLoader,
};
use futures::future::{self, FutureExt, Ready};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Serialize, Clone)]
struct Review {
    stars: u8,
    text: String,
}

#[derive(Serialize, Clone, Default)]
struct Owner {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

#[derive(Serialize, Clone)]
struct Book {
    id: u32,
    title: String,
    #[serde(skip)]
    owner_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    reviews: Option<Vec<Review>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    owner: Option<Owner>,
}

impl ViewModel for Book {
    fn loadable_fields() -> &'static [LoadableField] {
        const FIELDS: &[LoadableField] = &[
            LoadableField::new("reviews", "Reader reviews, localized by `lang`"),
            LoadableField::new("owner", "Lending owner; select parts with owner.name, owner.email"),
        ];
        FIELDS
    }
}

/// A book promoted on the front page; carries every `Book` field plus its pitch.
#[derive(Serialize)]
struct FeaturedBook {
    #[serde(flatten)]
    book: Book,
    pitch: String,
}

impl ViewModel for FeaturedBook {}

impl AsMut<Book> for FeaturedBook {
    fn as_mut(&mut self) -> &mut Book {
        &mut self.book
    }
}

struct Catalog {
    books: Vec<Book>,
    reviews: HashMap<u32, Vec<Review>>,
    owners: HashMap<u32, (String, String)>,
}

impl Catalog {
    fn seed() -> Self {
        let book = |id, title: &str, owner_id| Book {
            id,
            title: title.to_string(),
            owner_id,
            reviews: None,
            owner: None,
        };
        let review = |stars, text: &str| Review {
            stars,
            text: text.to_string(),
        };
        Self {
            books: vec![book(1, "Dune", 10), book(2, "Emma", 11), book(3, "Ulysses", 10)],
            reviews: HashMap::from([
                (1, vec![review(5, "spice"), review(4, "long")]),
                (2, vec![review(4, "witty")]),
            ]),
            owners: HashMap::from([
                (10, ("Ada".to_string(), "ada@example.com".to_string())),
                (11, ("Grace".to_string(), "grace@example.com".to_string())),
            ]),
        }
    }

    fn reviews_for(&self, id: u32, locale: &str) -> Vec<Review> {
        self.reviews
            .get(&id)
            .into_iter()
            .flatten()
            .map(|r| Review {
                stars: r.stars,
                text: format!("[{locale}] {}", r.text),
            })
            .collect()
    }

    /// Only the owner parts named in `detail`; all of them when `detail` is empty.
    fn owner_for(&self, owner_id: u32, detail: &[String]) -> Option<Owner> {
        let (name, email) = self.owners.get(&owner_id)?;
        let wants = |part: &str| detail.is_empty() || detail.iter().any(|d| d == part);
        Some(Owner {
            name: wants("name").then(|| name.clone()),
            email: wants("email").then(|| email.clone()),
        })
    }
}

/// Request-scoped data every loader sees.
struct Viewer {
    locale: String,
}

fn viewer(ctx: &ResponseContext<'_>) -> Ready<Result<Viewer, LoadError>> {
    let locale = ctx.query_value("lang").unwrap_or_else(|| "en".to_string());
    future::ready(Ok(Viewer { locale }))
}

struct BookLoader {
    catalog: Arc<Catalog>,
}

impl ViewModelLoader for BookLoader {
    type Model = Book;
    type Shared = Viewer;

    fn register_fields(&self, fields: &mut FieldRegistry<Book, Viewer>) -> Result<(), LoadError> {
        let (one, many) = (self.catalog.clone(), self.catalog.clone());
        fields.register_property(
            property!(|b: Book| b.reviews),
            move |book, ctx| {
                let reviews = one.reviews_for(book.id, &ctx.shared().locale);
                async move { Ok(patch(move |b: &mut Book| b.reviews = Some(reviews))) }.boxed()
            },
            move |books, ctx| {
                let loaded: Vec<Vec<Review>> = books
                    .iter()
                    .map(|b| many.reviews_for(b.id, &ctx.shared().locale))
                    .collect();
                async move {
                    Ok(list_patch(move |books: &mut [&mut Book]| {
                        for (book, reviews) in books.iter_mut().zip(loaded) {
                            book.reviews = Some(reviews);
                        }
                    }))
                }
                .boxed()
            },
        )?;

        let (one, many) = (self.catalog.clone(), self.catalog.clone());
        fields.register_property(
            property!(|b: Book| b.owner),
            move |book, ctx| {
                let owner = one.owner_for(book.owner_id, &ctx.sub_fields("owner"));
                async move { Ok(patch(move |b: &mut Book| b.owner = owner)) }.boxed()
            },
            move |books, ctx| {
                let detail = ctx.sub_fields("owner");
                let loaded: Vec<Option<Owner>> = books.iter().map(|b| many.owner_for(b.owner_id, &detail)).collect();
                async move {
                    Ok(list_patch(move |books: &mut [&mut Book]| {
                        for (book, owner) in books.iter_mut().zip(loaded) {
                            book.owner = owner;
                        }
                    }))
                }
                .boxed()
            },
        )?;
        Ok(())
    }
}

#[derive(Clone)]
struct AppState {
    catalog: Arc<Catalog>,
    dispatcher: Arc<FieldDispatcher<Viewer>>,
}

fn not_found(id: u32) -> Response {
    (StatusCode::NOT_FOUND, format!("no book with id {id}")).into_response()
}

async fn list_books(State(state): State<AppState>, query: QueryPairs) -> Result<impl IntoResponse, LoadError> {
    let mut books = state.catalog.books.clone();
    state
        .dispatcher
        .process(query.context(Some(ResultValue::many(&mut books))), viewer)
        .await?;
    Ok(success_many(books, query.requested_fields(state.dispatcher.config())))
}

async fn get_book(State(state): State<AppState>, Path(id): Path<u32>, query: QueryPairs) -> Response {
    let Some(mut book) = state.catalog.books.iter().find(|b| b.id == id).cloned() else {
        return not_found(id);
    };
    if let Err(e) = state
        .dispatcher
        .process(query.context(Some(ResultValue::one(&mut book))), viewer)
        .await
    {
        return e.into_response();
    }
    success_one(book, query.requested_fields(state.dispatcher.config())).into_response()
}

async fn featured(State(state): State<AppState>, query: QueryPairs) -> Result<impl IntoResponse, LoadError> {
    let mut picks: Vec<FeaturedBook> = state
        .catalog
        .books
        .iter()
        .take(2)
        .map(|book| FeaturedBook {
            pitch: format!("Staff pick: {}", book.title),
            book: book.clone(),
        })
        .collect();
    state
        .dispatcher
        .process(query.context(Some(ResultValue::many(&mut picks))), viewer)
        .await?;
    Ok(success_many(picks, query.requested_fields(state.dispatcher.config())))
}

async fn fields_doc(State(state): State<AppState>) -> impl IntoResponse {
    Json(fields_parameter::<Book>(state.dispatcher.config()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("fieldset_sdk=info,example_consumer=info")),
        )
        .init();

    let config = DispatchConfig::from_env();
    let param = config.param_name.clone();
    let catalog = Arc::new(Catalog::seed());
    let mut dispatcher = FieldDispatcher::new(config);
    dispatcher
        .register_loader(BookLoader {
            catalog: catalog.clone(),
        })
        .register_parent::<FeaturedBook, Book>();

    let state = AppState {
        catalog,
        dispatcher: Arc::new(dispatcher),
    };
    let app = Router::new()
        .route("/books", get(list_books))
        .route("/books/:id", get(get_book))
        .route("/featured", get(featured))
        .route("/openapi/fields", get(fields_doc))
        .with_state(state);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into());
    let listener = TcpListener::bind(&addr).await?;
    let port = listener.local_addr()?.port();
    tracing::info!(%param, "Example consumer listening on http://127.0.0.1:{}", port);
    axum::serve(listener, app).await?;
    Ok(())
}
