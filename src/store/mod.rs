use async_trait::async_trait;
use sea_orm::prelude::DateTimeWithTimeZone;

use crate::entities::poll::{self, PollStatus, PollVisibility};
use crate::entities::{category, poll_option, vote};
use crate::error::ServiceError;

pub mod postgres;

#[cfg(test)]
pub mod memory;

/// Row offset for a 1-based page. Saturates so an absurd page number
/// yields an empty page instead of overflowing the multiplication.
pub(crate) fn page_offset(page: u64, limit: u64) -> u64 {
    page.saturating_sub(1).saturating_mul(limit)
}


/// Poll fields as validated by the create-poll factory rules. Identity and
/// row timestamps are assigned by the store at insert time.
#[derive(Debug, Clone)]
pub struct NewPoll {
    pub title: String,
    pub description: Option<String>,
    pub image_data: Option<Vec<u8>>,
    pub image_type: Option<String>,
    pub visibility: PollVisibility,
    pub status: PollStatus,
    pub start_at: DateTimeWithTimeZone,
    pub end_at: Option<DateTimeWithTimeZone>,
    pub expected_votes: Option<i32>,
    pub creator_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewPollOption {
    pub text: String,
    pub image_data: Option<Vec<u8>>,
    pub image_type: Option<String>,
    pub position: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct NewVote {
    pub user_id: i64,
    pub poll_id: i64,
    pub option_id: i64,
}

#[derive(Debug, Clone)]
pub struct PollWithOptions {
    pub poll: poll::Model,
    pub options: Vec<poll_option::Model>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExtendPollChanges {
    pub end_at: Option<DateTimeWithTimeZone>,
    pub expected_votes: Option<i32>,
}

/// Store-level listing filters. Vote-count bounds are deliberately absent:
/// they are applied by the list use case as a post-filter over the fetched
/// page.
#[derive(Debug, Clone, Default)]
pub struct PollPageQuery {
    pub category: Option<String>,
    pub status: Option<PollStatus>,
    pub created_from: Option<DateTimeWithTimeZone>,
    pub created_to: Option<DateTimeWithTimeZone>,
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Clone)]
pub struct PollListItem {
    pub poll: poll::Model,
    pub total_votes: u64,
    pub categories: Vec<category::Model>,
}

#[derive(Debug, Clone)]
pub struct UserVoteDetails {
    pub poll_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub voted_at: DateTimeWithTimeZone,
    pub option_id: i64,
    pub option_text: String,
}

#[async_trait]
pub trait PollStore: Send + Sync {
    /// Persists a poll together with its options and category associations
    /// as one atomic unit.
    async fn create(
        &self,
        poll: NewPoll,
        options: Vec<NewPollOption>,
        category_ids: Vec<i64>,
    ) -> Result<poll::Model, ServiceError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<poll::Model>, ServiceError>;

    async fn find_by_id_with_options(
        &self,
        id: i64,
    ) -> Result<Option<PollWithOptions>, ServiceError>;

    async fn find_by_creator(
        &self,
        creator_id: i64,
        page: u64,
        limit: u64,
    ) -> Result<Vec<poll::Model>, ServiceError>;

    async fn count_by_creator(&self, creator_id: i64) -> Result<u64, ServiceError>;

    /// Conditional OPEN → CLOSED transition. Updates only rows matching the
    /// id AND status = OPEN; returns the affected-row count so the caller
    /// can distinguish a transition from an already-closed no-op.
    async fn close(&self, id: i64) -> Result<u64, ServiceError>;

    async fn extend(&self, id: i64, changes: ExtendPollChanges) -> Result<(), ServiceError>;

    async fn find_page(&self, query: &PollPageQuery) -> Result<Vec<PollListItem>, ServiceError>;

    async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError>;
}

#[async_trait]
pub trait VoteStore: Send + Sync {
    /// Inserts exactly one vote with a server-assigned timestamp. A
    /// (user_id, poll_id) uniqueness violation must surface as
    /// `ServiceError::Conflict`; the database constraint is the
    /// authoritative guard against concurrent double votes.
    async fn create(&self, vote: NewVote) -> Result<vote::Model, ServiceError>;

    async fn has_user_voted(&self, user_id: i64, poll_id: i64) -> Result<bool, ServiceError>;

    async fn count_by_poll(&self, poll_id: i64) -> Result<u64, ServiceError>;

    async fn count_by_option(&self, option_id: i64) -> Result<u64, ServiceError>;

    async fn find_user_votes_with_details(
        &self,
        user_id: i64,
        page: u64,
        limit: u64,
    ) -> Result<Vec<UserVoteDetails>, ServiceError>;

    async fn count_by_user(&self, user_id: i64) -> Result<u64, ServiceError>;
}
