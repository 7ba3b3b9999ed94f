use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::models::Pagination;
use crate::models::vote::{CastVoteRequest, UserVotesResponse, VoteView};
use crate::state::AppState;

use super::HttpError;

const DEFAULT_PAGE_LIMIT: u64 = 20;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/votes", post(cast_vote))
        .route("/users/{user_id}/votes", get(user_votes))
}

async fn cast_vote(
    State(state): State<AppState>,
    Json(request): Json<CastVoteRequest>,
) -> Result<(StatusCode, Json<VoteView>), HttpError> {
    let cast = state
        .voting
        .cast_vote(request.user_id, request.poll_id, request.option_id)
        .await?;

    // The cached tally for this poll is stale now.
    state.cache.results.invalidate(&request.poll_id).await;

    Ok((StatusCode::CREATED, Json(cast.into())))
}

#[derive(Debug, serde::Deserialize, Default)]
#[serde(default)]
struct PageQuery {
    page: Option<u64>,
    limit: Option<u64>,
}

async fn user_votes(
    Path(user_id): Path<i64>,
    Query(query): Query<PageQuery>,
    State(state): State<AppState>,
) -> Result<Json<UserVotesResponse>, HttpError> {
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);

    let (votes, total) = state.voting.voted_by(user_id, page, limit).await?;
    let response = UserVotesResponse {
        votes: votes.into_iter().map(Into::into).collect(),
        pagination: Pagination { page, limit, total },
    };
    Ok(Json(response))
}
