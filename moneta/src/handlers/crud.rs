//! Generic CRUD handlers
//!
//! Each handler opens its own session, drives one [`Service`] and drops the
//! session on return, so a failed request never leaves staged work behind.

use axum::{
    extract::{Path, State},
    http::{StatusCode, Uri},
    Json,
};

use crate::entity::Record;
use crate::error::Result;
use crate::filters::{FilterManager, Filterable};
use crate::pagination::PaginatedResult;
use crate::repository::Crud;
use crate::service::Service;
use crate::state::AppState;
use crate::store::Store;

use super::ListQuery;

/// `GET /{resource}/`
pub async fn list<E: Filterable, St: Store>(
    State(state): State<AppState<St>>,
    uri: Uri,
) -> Result<PaginatedResult<E>> {
    let params = ListQuery::from_uri(&uri, E::filter_schema(), &state.config().pagination)?;
    let filters = FilterManager::<E>::new(&params.filters, params.ordering.as_ref())?;
    let mut pagination = params.pagination;

    let mut session = state.store().session();
    let mut service = Service::<E, _>::new(&mut session);
    let data = service
        .list(Some(&filters), Some(pagination.as_mut()), &Record::new())
        .await?;

    Ok(PaginatedResult::new(data, pagination.describe()))
}

/// `GET /{resource}/{id}`
pub async fn retrieve<E: Filterable, St: Store>(
    State(state): State<AppState<St>>,
    Path(id): Path<i64>,
) -> Result<Json<E>> {
    let mut session = state.store().session();
    let entity = Service::<E, _>::new(&mut session).retrieve_by_id(id).await?;
    Ok(Json(entity))
}

/// `POST /{resource}/`
pub async fn create<E: Filterable, St: Store>(
    State(state): State<AppState<St>>,
    Json(payload): Json<Record>,
) -> Result<(StatusCode, Json<E>)> {
    let mut session = state.store().session();
    let entity = Service::<E, _>::new(&mut session).create(payload).await?;
    Ok((StatusCode::CREATED, Json(entity)))
}

/// `PUT /{resource}/{id}`, a partial update of the supplied keys
pub async fn update<E: Filterable, St: Store>(
    State(state): State<AppState<St>>,
    Path(id): Path<i64>,
    Json(payload): Json<Record>,
) -> Result<Json<E>> {
    let mut session = state.store().session();
    let entity = Service::<E, _>::new(&mut session)
        .update(id, payload)
        .await?;
    Ok(Json(entity))
}

/// `DELETE /{resource}/{id}`
pub async fn destroy<E: Filterable, St: Store>(
    State(state): State<AppState<St>>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    let mut session = state.store().session();
    Service::<E, _>::new(&mut session).destroy(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
