//! REST handlers for the bookkeeping resources
//!
//! Every resource gets the same five routes, generic over the entity and the
//! store backend:
//!
//! | Method | Path | Result |
//! |---|---|---|
//! | `GET` | `/{resource}/` | `PaginatedResult` of filtered, ordered entities |
//! | `GET` | `/{resource}/{id}` | the entity |
//! | `POST` | `/{resource}/` | `201` with the created entity |
//! | `PUT` | `/{resource}/{id}` | the updated entity (partial update) |
//! | `DELETE` | `/{resource}/{id}` | `204` |
//!
//! # Example
//!
//! ```rust
//! use axum::Router;
//! use moneta::domain::Tag;
//! use moneta::handlers::crud_routes;
//! use moneta::state::AppState;
//! use moneta::store::MemoryStore;
//!
//! let router: Router<AppState<MemoryStore>> = crud_routes::<Tag, MemoryStore>("tag");
//! # let _ = router;
//! ```

mod crud;
mod query;

use axum::{routing::get, Router};

use crate::filters::Filterable;
use crate::state::AppState;
use crate::store::Store;

pub use crud::{create, destroy, list, retrieve, update};
pub use query::{ListQuery, ORDERING_KEY};

/// Routes for one resource, mounted at `/{resource}`
///
/// The collection answers with and without a trailing slash.
pub fn crud_routes<E: Filterable, St: Store>(resource: &str) -> Router<AppState<St>> {
    Router::new()
        .route(
            &format!("/{resource}"),
            get(list::<E, St>).post(create::<E, St>),
        )
        .route(
            &format!("/{resource}/"),
            get(list::<E, St>).post(create::<E, St>),
        )
        .route(
            &format!("/{resource}/{{id}}"),
            get(retrieve::<E, St>)
                .put(update::<E, St>)
                .delete(destroy::<E, St>),
        )
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::{Config, PaginationStyle};
    use crate::domain::{seed_owner, Category, Tag, Transaction};
    use crate::entity::Entity;
    use crate::server::build_router;
    use crate::state::AppState;
    use crate::store::MemoryStore;

    fn app(store: &MemoryStore, config: Config) -> Router {
        build_router(AppState::new(config, store.clone()))
    }

    async fn send(router: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn seed_tags(store: &MemoryStore, names: &[&str]) {
        let rows = names.iter().enumerate().map(|(i, name)| {
            json!({
                "id": i as i64 + 1,
                "name": name,
                "description": null,
                "created_at": "2024-01-01T00:00:00",
                "updated_at": "2024-01-01T00:00:00",
            })
            .as_object()
            .cloned()
            .unwrap()
        });
        store.seed(Tag::meta(), rows).await;
    }

    #[tokio::test]
    async fn test_crud_round_trip() {
        let store = MemoryStore::new();
        let config = Config::default();

        let (status, created) = send(
            app(&store, config.clone()),
            "POST",
            "/tag/",
            Some(json!({"name": "groceries"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_i64().unwrap();
        assert!(created["created_at"].is_string());

        let (status, fetched) =
            send(app(&store, config.clone()), "GET", &format!("/tag/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["name"], "groceries");

        let (status, updated) = send(
            app(&store, config.clone()),
            "PUT",
            &format!("/tag/{id}"),
            Some(json!({"description": "food and household"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "groceries");
        assert_eq!(updated["description"], "food and household");

        let (status, _) =
            send(app(&store, config.clone()), "DELETE", &format!("/tag/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(app(&store, config), "GET", &format!("/tag/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Not Found");
    }

    #[tokio::test]
    async fn test_list_filters_orders_and_paginates() {
        let store = MemoryStore::new();
        seed_tags(&store, &["Food", "fast food", "Rent", "Seafood", "Salary"]).await;

        let (status, body) = send(
            app(&store, Config::default()),
            "GET",
            "/tag/?name__icontains=food&ordering=-name&limit=2&offset=0",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let names: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["fast food", "Seafood"]);
        assert_eq!(body["pagination"], json!({"count": 3, "limit": 2, "offset": 0}));
    }

    #[tokio::test]
    async fn test_unpaginated_list_has_no_metadata() {
        let store = MemoryStore::new();
        seed_tags(&store, &["a", "b"]).await;

        let (status, body) = send(app(&store, Config::default()), "GET", "/tag", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert!(body.get("pagination").is_none());
    }

    #[tokio::test]
    async fn test_page_number_style() {
        let store = MemoryStore::new();
        seed_tags(&store, &["a", "b", "c", "d", "e", "f"]).await;
        let mut config = Config::default();
        config.pagination.style = PaginationStyle::PageNumber;

        let (status, body) = send(
            app(&store, config),
            "GET",
            "/tag/?page=3&page_size=2&ordering=id",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["name"], "e");
        assert_eq!(
            body["pagination"],
            json!({
                "count": 6,
                "page": 3,
                "page_size": 2,
                "previous_page": 2,
                "total_pages": 3,
            })
        );
    }

    #[tokio::test]
    async fn test_invalid_filter_is_unprocessable() {
        let store = MemoryStore::new();
        let (status, body) = send(
            app(&store, Config::default()),
            "GET",
            "/transaction/?amount__between=1",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, _) = send(
            app(&store, Config::default()),
            "GET",
            "/transaction/?limit=500&offset=0",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_identity_mismatch_is_bad_request() {
        let store = MemoryStore::new();
        seed_tags(&store, &["a"]).await;

        let (status, body) = send(
            app(&store, Config::default()),
            "PUT",
            "/tag/1",
            Some(json!({"id": 2, "name": "b"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
        assert_eq!(store.rows(Tag::meta()).await[0]["name"], "a");
    }

    #[tokio::test]
    async fn test_duplicate_is_store_error_with_debug_diagnostic() {
        let store = MemoryStore::new();
        seed_tags(&store, &["rent"]).await;

        let (status, body) = send(
            app(&store, Config::default()),
            "POST",
            "/tag/",
            Some(json!({"name": "rent"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["detail"],
            "Could not connect or perform the operation to the database"
        );
        assert!(body.get("debug_message").is_none());

        let mut config = Config::default();
        config.service.debug = true;
        let (status, body) = send(
            app(&store, config),
            "POST",
            "/tag/",
            Some(json!({"name": "rent"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["debug_message"].as_str().unwrap().contains("name"));
        assert_eq!(store.rows(Tag::meta()).await.len(), 1);
    }

    #[tokio::test]
    async fn test_category_kind_filter() {
        let store = MemoryStore::new();
        let config = Config::default();
        for (name, kind) in [("Salary", "Income"), ("Rent", "Expense"), ("Food", "Expense")] {
            let (status, _) = send(
                app(&store, config.clone()),
                "POST",
                "/category/",
                Some(json!({"name": name, "type": kind})),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, body) = send(
            app(&store, config),
            "GET",
            "/category/?type__ieq=expense&ordering=name",
            None,
        )
        .await;
        let names: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Food", "Rent"]);
        assert_eq!(store.rows(Category::meta()).await.len(), 3);
    }

    #[tokio::test]
    async fn test_transaction_date_defaults_to_today() {
        let store = MemoryStore::new();
        seed_owner(&store).await;
        let (status, body) = send(
            app(&store, Config::default()),
            "POST",
            "/transaction/",
            Some(json!({
                "account_id": 1,
                "user_id": 1,
                "category_id": 1,
                "amount": 42.5,
                "transaction_type": "Expense",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(
            body["date"],
            chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string()
        );
        assert_eq!(store.rows(Transaction::meta()).await.len(), 1);
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) =
            send(app(&MemoryStore::new(), Config::default()), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }
}
