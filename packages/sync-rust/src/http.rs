//! REST adapter: [`RemoteCollection`] over `reqwest`.
//!
//! Routes, relative to the base URL:
//!
//! | Operation | Request                        |
//! |-----------|--------------------------------|
//! | `list`    | `GET /<resource>?<params>`     |
//! | `get`     | `GET /<resource>/<id>`         |
//! | `create`  | `POST /<resource>`             |
//! | `update`  | `PUT /<resource>/<id>`         |
//! | `delete`  | `DELETE /<resource>/<id>`      |
//!
//! List responses are `{ "items": [...], "total": n }`. Non-2xx answers are
//! decoded with [`RemoteError::from_body`]; connection failures, timeouts,
//! and undecodable bodies become [`RemoteError::Transport`].

use std::marker::PhantomData;

use async_trait::async_trait;
use reqwest::{Client, Response};
use rollcall_core::{Entity, EntityId, ListResult, RemoteError, TransportQuery};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::SyncConfig;
use crate::traits::RemoteCollection;

#[derive(Deserialize)]
struct ListBody<T> {
    items: Vec<T>,
    total: u64,
}

/// One entity collection on the REST backend.
pub struct HttpCollection<T> {
    client: Client,
    base_url: String,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> HttpCollection<T> {
    /// Collection under `base_url` with the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, config: &SyncConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(transport)?;
        Ok(Self::with_client(client, base_url))
    }

    /// Collection sharing an existing client.
    #[must_use]
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            _entity: PhantomData,
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.base_url, T::RESOURCE)
    }

    fn record_url(&self, id: &EntityId) -> String {
        format!("{}/{}/{}", self.base_url, T::RESOURCE, id)
    }
}

fn transport(error: reqwest::Error) -> RemoteError {
    if error.is_timeout() {
        RemoteError::Transport(format!("request timed out: {error}"))
    } else {
        RemoteError::Transport(error.to_string())
    }
}

async fn decode<V: DeserializeOwned>(response: Response) -> Result<V, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<V>().await.map_err(transport);
    }
    // Error bodies are optional; a missing or non-JSON body still carries the status.
    let body = response.json::<Json>().await.unwrap_or(Json::Null);
    debug!(status = status.as_u16(), "remote answered with an error");
    Err(RemoteError::from_body(Some(status.as_u16()), &body))
}

async fn expect_success(response: Response) -> Result<(), RemoteError> {
    if response.status().is_success() {
        return Ok(());
    }
    decode::<Json>(response).await.map(|_| ())
}

#[async_trait]
impl<T> RemoteCollection<T> for HttpCollection<T>
where
    T: Entity + DeserializeOwned,
    T::Draft: Serialize,
{
    async fn list(
        &self,
        query: &TransportQuery,
        cancel: CancellationToken,
    ) -> Result<ListResult<T>, RemoteError> {
        let params = query.to_params(&T::VOCABULARY);
        let request = async {
            let response = self
                .client
                .get(self.collection_url())
                .query(&params)
                .send()
                .await
                .map_err(transport)?;
            decode::<ListBody<T>>(response).await
        };
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(RemoteError::Cancelled),
            body = request => body.map(|body| ListResult::new(body.items, body.total)),
        }
    }

    async fn get(&self, id: &EntityId, cancel: CancellationToken) -> Result<T, RemoteError> {
        let request = async {
            let response = self
                .client
                .get(self.record_url(id))
                .send()
                .await
                .map_err(transport)?;
            decode::<T>(response).await
        };
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(RemoteError::Cancelled),
            entity = request => entity,
        }
    }

    async fn create(&self, draft: &T::Draft) -> Result<T, RemoteError> {
        let response = self
            .client
            .post(self.collection_url())
            .json(draft)
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    async fn update(&self, id: &EntityId, draft: &T::Draft) -> Result<T, RemoteError> {
        let response = self
            .client
            .put(self.record_url(id))
            .json(draft)
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    async fn delete(&self, id: &EntityId) -> Result<(), RemoteError> {
        let response = self
            .client
            .delete(self.record_url(id))
            .send()
            .await
            .map_err(transport)?;
        expect_success(response).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response as AxumResponse};
    use axum::routing::get;
    use axum::{Json as AxumJson, Router};
    use parking_lot::Mutex;
    use rollcall_core::entities::{Shelter, ShelterDraft};
    use rollcall_core::{compose, QueryDefaults, SortSpec};
    use serde_json::json;

    use super::*;

    type Seen = Arc<Mutex<Vec<HashMap<String, String>>>>;

    fn shelter(id: &str, name: &str) -> Shelter {
        Shelter::from_draft(
            EntityId::from(id),
            &ShelterDraft {
                name: Some(name.into()),
                city: Some("Recife".into()),
                state: Some("PE".into()),
                capacity: None,
            },
        )
    }

    async fn list_shelters(
        State(seen): State<Seen>,
        Query(params): Query<HashMap<String, String>>,
    ) -> AxumResponse {
        seen.lock().push(params);
        AxumJson(json!({ "items": [shelter("s-1", "Lar A")], "total": 31 })).into_response()
    }

    async fn create_shelter(AxumJson(draft): AxumJson<ShelterDraft>) -> AxumResponse {
        if draft.name.is_none() {
            let body = json!({ "message": ["name should not be empty", "name must be a string"] });
            return (StatusCode::BAD_REQUEST, AxumJson(body)).into_response();
        }
        (StatusCode::CREATED, AxumJson(Shelter::from_draft(EntityId::from("new"), &draft)))
            .into_response()
    }

    async fn get_shelter(Path(id): Path<String>) -> AxumResponse {
        if id == "missing" {
            let body = json!({ "message": format!("Registro {id} não encontrado") });
            return (StatusCode::NOT_FOUND, AxumJson(body)).into_response();
        }
        AxumJson(shelter(&id, "Lar A")).into_response()
    }

    async fn update_shelter(
        Path(id): Path<String>,
        AxumJson(draft): AxumJson<ShelterDraft>,
    ) -> AxumResponse {
        let mut row = shelter(&id, "Lar A");
        row.apply_draft(&draft);
        AxumJson(row).into_response()
    }

    async fn delete_shelter(Path(id): Path<String>) -> AxumResponse {
        if id == "locked" {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
        StatusCode::NO_CONTENT.into_response()
    }

    async fn slow() -> AxumResponse {
        tokio::time::sleep(Duration::from_secs(10)).await;
        AxumJson(json!({ "items": [], "total": 0 })).into_response()
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn backend() -> (String, Seen) {
        let seen = Seen::default();
        let router = Router::new()
            .route("/shelters", get(list_shelters).post(create_shelter))
            .route(
                "/shelters/{id}",
                get(get_shelter).put(update_shelter).delete(delete_shelter),
            )
            .with_state(Arc::clone(&seen));
        (serve(router).await, seen)
    }

    fn collection(base: &str) -> HttpCollection<Shelter> {
        HttpCollection::new(base, &SyncConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn list_sends_composed_params() {
        let (base, seen) = backend().await;
        let remote = collection(&base);
        let query = rollcall_core::Query::new(&QueryDefaults {
            page_size: 12,
            sort: Some(SortSpec::desc("city")),
        })
        .with_filter("search", "lar")
        .with_page(2);

        let result = remote
            .list(&compose(&query, &Shelter::VOCABULARY), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.total, 31);
        assert_eq!(result.rows[0].name, "Lar A");

        let params = seen.lock().pop().unwrap();
        assert_eq!(params["page"], "3");
        assert_eq!(params["limit"], "12");
        assert_eq!(params["sort"], "address.city");
        assert_eq!(params["order"], "DESC");
        assert_eq!(params["searchString"], "lar");
    }

    #[tokio::test]
    async fn crud_round_trip() {
        let (base, _seen) = backend().await;
        let remote = collection(&format!("{base}/"));

        let created = remote
            .create(&ShelterDraft {
                name: Some("Lar Novo".into()),
                ..ShelterDraft::default()
            })
            .await
            .unwrap();
        assert_eq!(created.id.as_str(), "new");

        let fetched = remote
            .get(&EntityId::from("s-7"), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(fetched.id.as_str(), "s-7");

        let updated = remote
            .update(
                &EntityId::from("s-7"),
                &ShelterDraft {
                    capacity: Some(12),
                    ..ShelterDraft::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.capacity, Some(12));

        remote.delete(&EntityId::from("s-7")).await.unwrap();
    }

    #[tokio::test]
    async fn error_bodies_become_server_errors() {
        let (base, _seen) = backend().await;
        let remote = collection(&base);

        let err = remote.create(&ShelterDraft::default()).await.unwrap_err();
        assert_eq!(
            err,
            RemoteError::Server {
                status: Some(400),
                message: Some("name should not be empty; name must be a string".into()),
            }
        );

        let err = remote
            .get(&EntityId::from("missing"), CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.user_message("Erro ao carregar abrigo"), "Registro missing não encontrado");

        let err = remote.delete(&EntityId::from("locked")).await.unwrap_err();
        assert_eq!(
            err,
            RemoteError::Server {
                status: Some(500),
                message: None,
            }
        );
        assert_eq!(err.user_message("Erro ao excluir abrigo"), "Erro ao excluir abrigo");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let remote = collection(&format!("http://{addr}"));
        let err = remote.delete(&EntityId::from("a")).await.unwrap_err();
        assert!(matches!(err, RemoteError::Transport(_)));
    }

    #[tokio::test]
    async fn cancellation_aborts_slow_list() {
        let base = serve(Router::new().route("/shelters", get(slow))).await;
        let remote = collection(&base);
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let query = compose(
            &rollcall_core::Query::new(&QueryDefaults::for_entity::<Shelter>(12)),
            &Shelter::VOCABULARY,
        );
        let started = std::time::Instant::now();
        let result = remote.list(&query, token).await;
        assert_eq!(result, Err(RemoteError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn timeout_is_a_transport_error() {
        let base = serve(Router::new().route("/shelters/{id}", get(slow))).await;
        let config = SyncConfig {
            http_timeout: Duration::from_millis(100),
            ..SyncConfig::default()
        };
        let remote = HttpCollection::<Shelter>::new(base, &config).unwrap();

        let err = remote
            .get(&EntityId::from("a"), CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            RemoteError::Transport(message) => assert!(message.starts_with("request timed out")),
            other => panic!("expected transport error, got {other:?}"),
        }
    }
}
