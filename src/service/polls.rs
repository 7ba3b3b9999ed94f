use std::sync::Arc;

use chrono::Utc;
use sea_orm::DbErr;
use sea_orm::prelude::DateTimeWithTimeZone;
use tracing::info;

use crate::entities::poll::{self, PollStatus, PollVisibility};
use crate::entities::category;
use crate::error::ServiceError;
use crate::store::{
    ExtendPollChanges, NewPoll, NewPollOption, PollListItem, PollPageQuery, PollStore,
    PollWithOptions,
};

use super::validate_page_bounds;

const MAX_TITLE_LEN: usize = 255;
const MAX_OPTION_TEXT_LEN: usize = 255;
const MIN_OPTIONS: usize = 2;

#[derive(Debug, Clone)]
pub struct CreatePollInput {
    pub title: String,
    pub description: Option<String>,
    pub image_data: Option<Vec<u8>>,
    pub image_type: Option<String>,
    pub visibility: Option<PollVisibility>,
    pub status: Option<PollStatus>,
    pub start_at: Option<DateTimeWithTimeZone>,
    pub end_at: Option<DateTimeWithTimeZone>,
    pub expected_votes: Option<i32>,
    pub creator_id: i64,
    pub category_ids: Vec<i64>,
    pub options: Vec<CreateOptionInput>,
}

#[derive(Debug, Clone)]
pub struct CreateOptionInput {
    pub text: String,
    pub image_data: Option<Vec<u8>>,
    pub image_type: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExtendPollInput {
    pub end_at: Option<DateTimeWithTimeZone>,
    pub expected_votes: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct ListPollsInput {
    pub category: Option<String>,
    pub min_votes: Option<u64>,
    pub max_votes: Option<u64>,
    pub created_from: Option<DateTimeWithTimeZone>,
    pub created_to: Option<DateTimeWithTimeZone>,
    pub status: Option<PollStatus>,
    pub page: u64,
    pub limit: u64,
}

pub struct PollService {
    polls: Arc<dyn PollStore>,
}

impl PollService {
    pub fn new(polls: Arc<dyn PollStore>) -> Self {
        Self { polls }
    }

    /// Creates a poll with its options and category associations as one
    /// atomic unit, then reloads it through the read path so the response
    /// cannot drift from what was persisted.
    pub async fn create(&self, input: CreatePollInput) -> Result<PollWithOptions, ServiceError> {
        if input.options.len() < MIN_OPTIONS {
            return Err(ServiceError::InvalidArgument(
                "poll must have at least 2 options".to_string(),
            ));
        }

        let title = input.title.trim();
        if title.is_empty() {
            return Err(ServiceError::InvalidArgument(
                "poll title is required".to_string(),
            ));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(ServiceError::InvalidArgument(
                "poll title must be at most 255 characters".to_string(),
            ));
        }

        // An unbounded poll would never stop accepting votes.
        if input.end_at.is_none() && input.expected_votes.is_none() {
            return Err(ServiceError::InvalidArgument(
                "poll must have either an end date or an expected vote count".to_string(),
            ));
        }

        let now = Utc::now().fixed_offset();
        if input.end_at.is_some_and(|end_at| end_at < now) {
            return Err(ServiceError::InvalidArgument(
                "poll end date cannot be in the past".to_string(),
            ));
        }

        if input.expected_votes.is_some_and(|expected| expected < 1) {
            return Err(ServiceError::InvalidArgument(
                "expected votes must be at least 1".to_string(),
            ));
        }

        let mut options = Vec::with_capacity(input.options.len());
        for (index, option) in input.options.into_iter().enumerate() {
            let text = option.text.trim();
            if text.is_empty() {
                return Err(ServiceError::InvalidArgument(
                    "option text is required".to_string(),
                ));
            }
            if text.chars().count() > MAX_OPTION_TEXT_LEN {
                return Err(ServiceError::InvalidArgument(
                    "option text must be at most 255 characters".to_string(),
                ));
            }
            options.push(NewPollOption {
                text: text.to_string(),
                image_data: option.image_data,
                image_type: option.image_type,
                position: index as i32,
            });
        }

        let description = input
            .description
            .as_deref()
            .map(str::trim)
            .filter(|trimmed| !trimmed.is_empty())
            .map(str::to_string);

        let new_poll = NewPoll {
            title: title.to_string(),
            description,
            image_data: input.image_data,
            image_type: input.image_type,
            visibility: input.visibility.unwrap_or(PollVisibility::Public),
            status: input.status.unwrap_or(PollStatus::Open),
            start_at: input.start_at.unwrap_or(now),
            end_at: input.end_at,
            expected_votes: input.expected_votes,
            creator_id: input.creator_id,
        };

        let created = self
            .polls
            .create(new_poll, options, input.category_ids)
            .await?;

        self.polls
            .find_by_id_with_options(created.id)
            .await?
            .ok_or_else(|| {
                ServiceError::Database(DbErr::RecordNotFound(
                    "created poll missing on reload".to_string(),
                ))
            })
    }

    /// Closes a poll through a conditional update; a poll that is no longer
    /// OPEN (a concurrent close, or one that never opened) is treated as
    /// already closed rather than an error.
    pub async fn close(&self, poll_id: i64) -> Result<(), ServiceError> {
        self.polls
            .find_by_id(poll_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("poll", poll_id))?;

        let affected = self.polls.close(poll_id).await?;
        if affected == 0 {
            info!("poll {poll_id} was already closed");
        }
        Ok(())
    }

    pub async fn extend(&self, poll_id: i64, input: ExtendPollInput) -> Result<(), ServiceError> {
        let found = self
            .polls
            .find_by_id(poll_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("poll", poll_id))?;

        if found.status != PollStatus::Open {
            return Err(ServiceError::InvalidState(
                "only open polls can be extended".to_string(),
            ));
        }

        if let Some(new_end) = input.end_at {
            if found.end_at.is_some_and(|current| new_end <= current) {
                return Err(ServiceError::InvalidArgument(
                    "new end date must be later than current end date".to_string(),
                ));
            }
            if new_end <= Utc::now().fixed_offset() {
                return Err(ServiceError::InvalidArgument(
                    "end date cannot be in the past".to_string(),
                ));
            }
        }

        // Deliberately no lower bound against the current vote count; an
        // extend may set expected_votes below the votes already cast.
        if input.expected_votes.is_some_and(|expected| expected < 1) {
            return Err(ServiceError::InvalidArgument(
                "expected votes must be at least 1".to_string(),
            ));
        }

        if input.end_at.is_none() && input.expected_votes.is_none() {
            return Ok(());
        }

        self.polls
            .extend(
                poll_id,
                ExtendPollChanges {
                    end_at: input.end_at,
                    expected_votes: input.expected_votes,
                },
            )
            .await
    }

    /// Filtered listing. Vote-count bounds are applied over the fetched page,
    /// so the reported total reflects the filtered subset of that page only,
    /// not a global count.
    pub async fn list(
        &self,
        input: ListPollsInput,
    ) -> Result<(Vec<PollListItem>, u64), ServiceError> {
        validate_page_bounds(input.page, input.limit)?;

        if let (Some(min), Some(max)) = (input.min_votes, input.max_votes) {
            if min > max {
                return Err(ServiceError::InvalidArgument(
                    "min_votes cannot be greater than max_votes".to_string(),
                ));
            }
        }

        if let (Some(from), Some(to)) = (input.created_from, input.created_to) {
            if from > to {
                return Err(ServiceError::InvalidArgument(
                    "created_from cannot be later than created_to".to_string(),
                ));
            }
        }

        let query = PollPageQuery {
            category: input.category,
            status: input.status,
            created_from: input.created_from,
            created_to: input.created_to,
            page: input.page,
            limit: input.limit,
        };

        let mut items = self.polls.find_page(&query).await?;
        if input.min_votes.is_some() || input.max_votes.is_some() {
            items.retain(|item| {
                input.min_votes.is_none_or(|min| item.total_votes >= min)
                    && input.max_votes.is_none_or(|max| item.total_votes <= max)
            });
        }

        let total = items.len() as u64;
        Ok((items, total))
    }

    pub async fn details(&self, poll_id: i64) -> Result<PollWithOptions, ServiceError> {
        self.polls
            .find_by_id_with_options(poll_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("poll", poll_id))
    }

    pub async fn created_by(
        &self,
        user_id: i64,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<poll::Model>, u64), ServiceError> {
        validate_page_bounds(page, limit)?;
        let polls = self.polls.find_by_creator(user_id, page, limit).await?;
        let total = self.polls.count_by_creator(user_id).await?;
        Ok((polls, total))
    }

    pub async fn categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        self.polls.list_categories().await
    }
}
