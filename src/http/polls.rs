use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use base64::prelude::{BASE64_STANDARD, Engine as _};
use chrono::{DateTime, Utc};

use crate::entities::poll::{PollStatus, PollVisibility};
use crate::models::Pagination;
use crate::models::poll::{
    CategoryView, CreatePollRequest, ExtendPollRequest, ListFiltersEcho, ListPollsResponse,
    PollDetailsView, PollResultsView, UserPollsResponse,
};
use crate::service::{CreateOptionInput, CreatePollInput, ExtendPollInput, ListPollsInput};
use crate::state::AppState;

use super::HttpError;

const DEFAULT_PAGE_LIMIT: u64 = 20;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/polls", get(list_polls).post(create_poll))
        .route("/polls/{poll_id}", get(get_poll))
        .route("/polls/{poll_id}/results", get(get_results))
        .route("/polls/{poll_id}/close", post(close_poll))
        .route("/polls/{poll_id}/extend", patch(extend_poll))
        .route("/users/{user_id}/polls", get(user_polls))
        .route("/categories", get(list_categories))
}

#[derive(Debug, serde::Deserialize, Default)]
#[serde(default)]
struct ListPollsQuery {
    category: Option<String>,
    min_votes: Option<u64>,
    max_votes: Option<u64>,
    created_from: Option<DateTime<Utc>>,
    created_to: Option<DateTime<Utc>>,
    status: Option<PollStatus>,
    page: Option<u64>,
    limit: Option<u64>,
}

#[derive(Debug, serde::Deserialize, Default)]
#[serde(default)]
struct PageQuery {
    page: Option<u64>,
    limit: Option<u64>,
}

#[derive(Debug, serde::Deserialize, Default)]
#[serde(default)]
struct ResultsQuery {
    user_id: Option<i64>,
}

async fn create_poll(
    State(state): State<AppState>,
    Json(request): Json<CreatePollRequest>,
) -> Result<(StatusCode, Json<PollDetailsView>), HttpError> {
    let image_data = decode_image(request.image_data.as_deref())?;

    let mut options = Vec::with_capacity(request.options.len());
    for option in request.options {
        options.push(CreateOptionInput {
            text: option.text,
            image_data: decode_image(option.image_data.as_deref())?,
            image_type: option.image_type,
        });
    }

    let input = CreatePollInput {
        title: request.title,
        description: request.description,
        image_data,
        image_type: request.image_type,
        visibility: request.visibility,
        status: request.status,
        start_at: request.start_at.map(|dt| dt.fixed_offset()),
        end_at: request.end_at.map(|dt| dt.fixed_offset()),
        expected_votes: request.expected_votes,
        creator_id: request.creator_id,
        category_ids: request.category_ids,
        options,
    };

    let created = state.polls.create(input).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

async fn list_polls(
    Query(query): Query<ListPollsQuery>,
    State(state): State<AppState>,
) -> Result<Json<ListPollsResponse>, HttpError> {
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);

    let input = ListPollsInput {
        category: query.category.clone(),
        min_votes: query.min_votes,
        max_votes: query.max_votes,
        created_from: query.created_from.map(|dt| dt.fixed_offset()),
        created_to: query.created_to.map(|dt| dt.fixed_offset()),
        status: query.status,
        page,
        limit,
    };

    let (items, total) = state.polls.list(input).await?;

    let response = ListPollsResponse {
        polls: items.into_iter().map(Into::into).collect(),
        pagination: Pagination { page, limit, total },
        filters: ListFiltersEcho {
            category: query.category,
            min_votes: query.min_votes,
            max_votes: query.max_votes,
            created_from: query.created_from,
            created_to: query.created_to,
            status: query.status,
        },
    };
    Ok(Json(response))
}

async fn get_poll(
    Path(poll_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<PollDetailsView>, HttpError> {
    let found = state.polls.details(poll_id).await?;
    Ok(Json(found.into()))
}

async fn get_results(
    Path(poll_id): Path<i64>,
    Query(query): Query<ResultsQuery>,
    State(state): State<AppState>,
) -> Result<Json<PollResultsView>, HttpError> {
    // Only results of public polls are ever cached, so a hit is safe to
    // serve without re-running the visibility check.
    if let Some(cached) = state.cache.results.get(&poll_id).await {
        return Ok(Json((*cached).clone()));
    }

    let view = state.results.results(poll_id, query.user_id).await?;
    if view.visibility == PollVisibility::Public {
        state
            .cache
            .results
            .insert(poll_id, Arc::new(view.clone()))
            .await;
    }
    Ok(Json(view))
}

async fn close_poll(
    Path(poll_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, HttpError> {
    state.polls.close(poll_id).await?;
    state.cache.results.invalidate(&poll_id).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn extend_poll(
    Path(poll_id): Path<i64>,
    State(state): State<AppState>,
    Json(request): Json<ExtendPollRequest>,
) -> Result<StatusCode, HttpError> {
    let input = ExtendPollInput {
        end_at: request.end_at.map(|dt| dt.fixed_offset()),
        expected_votes: request.expected_votes,
    };
    state.polls.extend(poll_id, input).await?;
    state.cache.results.invalidate(&poll_id).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn user_polls(
    Path(user_id): Path<i64>,
    Query(query): Query<PageQuery>,
    State(state): State<AppState>,
) -> Result<Json<UserPollsResponse>, HttpError> {
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);

    let (polls, total) = state.polls.created_by(user_id, page, limit).await?;
    let response = UserPollsResponse {
        polls: polls.into_iter().map(Into::into).collect(),
        pagination: Pagination { page, limit, total },
    };
    Ok(Json(response))
}

async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryView>>, HttpError> {
    let categories = state.polls.categories().await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

fn decode_image(encoded: Option<&str>) -> Result<Option<Vec<u8>>, HttpError> {
    match encoded {
        None => Ok(None),
        Some(payload) => BASE64_STANDARD.decode(payload).map(Some).map_err(|_| {
            HttpError::new(
                StatusCode::BAD_REQUEST,
                "image_data must be valid base64".to_string(),
            )
        }),
    }
}
