use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};

use crate::entities::category;
use crate::entities::poll::{self, PollStatus, PollVisibility};
use crate::entities::poll_option;
use crate::store::{PollListItem, PollWithOptions};

use super::Pagination;

// Request/Response types for the poll HTTP API

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePollRequest {
    pub title: String,
    pub description: Option<String>,
    /// Base64-encoded image payload; decoded before it reaches the use case.
    pub image_data: Option<String>,
    pub image_type: Option<String>,
    pub visibility: Option<PollVisibility>,
    pub status: Option<PollStatus>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub expected_votes: Option<i32>,
    pub creator_id: i64,
    #[serde(default)]
    pub category_ids: Vec<i64>,
    pub options: Vec<CreateOptionRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOptionRequest {
    pub text: String,
    pub image_data: Option<String>,
    pub image_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ExtendPollRequest {
    pub end_at: Option<DateTime<Utc>>,
    pub expected_votes: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollView {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub visibility: PollVisibility,
    pub status: PollStatus,
    pub start_at: DateTimeWithTimeZone,
    pub end_at: Option<DateTimeWithTimeZone>,
    pub expected_votes: Option<i32>,
    pub creator_id: i64,
    pub image_type: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl From<poll::Model> for PollView {
    fn from(model: poll::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            visibility: model.visibility,
            status: model.status,
            start_at: model.start_at,
            end_at: model.end_at,
            expected_votes: model.expected_votes,
            creator_id: model.creator_id,
            image_type: model.image_type,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollOptionView {
    pub id: i64,
    pub text: String,
    pub position: i32,
    pub image_type: Option<String>,
}

impl From<poll_option::Model> for PollOptionView {
    fn from(model: poll_option::Model) -> Self {
        Self {
            id: model.id,
            text: model.text,
            position: model.position,
            image_type: model.image_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollDetailsView {
    pub poll: PollView,
    pub options: Vec<PollOptionView>,
}

impl From<PollWithOptions> for PollDetailsView {
    fn from(found: PollWithOptions) -> Self {
        Self {
            poll: found.poll.into(),
            options: found.options.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryView {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl From<category::Model> for CategoryView {
    fn from(model: category::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollListEntry {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub visibility: PollVisibility,
    pub status: PollStatus,
    pub start_at: DateTimeWithTimeZone,
    pub end_at: Option<DateTimeWithTimeZone>,
    pub expected_votes: Option<i32>,
    pub total_votes: u64,
    pub created_at: DateTimeWithTimeZone,
    pub creator_id: i64,
    pub categories: Vec<CategoryView>,
}

impl From<PollListItem> for PollListEntry {
    fn from(item: PollListItem) -> Self {
        Self {
            id: item.poll.id,
            title: item.poll.title,
            description: item.poll.description,
            visibility: item.poll.visibility,
            status: item.poll.status,
            start_at: item.poll.start_at,
            end_at: item.poll.end_at,
            expected_votes: item.poll.expected_votes,
            total_votes: item.total_votes,
            created_at: item.poll.created_at,
            creator_id: item.poll.creator_id,
            categories: item.categories.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListFiltersEcho {
    pub category: Option<String>,
    pub min_votes: Option<u64>,
    pub max_votes: Option<u64>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub status: Option<PollStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListPollsResponse {
    pub polls: Vec<PollListEntry>,
    pub pagination: Pagination,
    pub filters: ListFiltersEcho,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserPollsResponse {
    pub polls: Vec<PollView>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollResultsView {
    pub poll_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: PollStatus,
    pub visibility: PollVisibility,
    pub total_votes: u64,
    pub options: Vec<OptionResultView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionResultView {
    pub id: i64,
    pub text: String,
    pub votes: u64,
    pub percentage: f64,
}
