use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr, TransactionTrait,
};
use tracing::warn;

use crate::entities::poll::{self, PollStatus};
use crate::entities::{category, poll_category, poll_option, vote};
use crate::error::ServiceError;

use super::{
    ExtendPollChanges, NewPoll, NewPollOption, NewVote, PollListItem, PollPageQuery, PollStore,
    PollWithOptions, UserVoteDetails, VoteStore,
};

pub struct PgPollStore {
    database: DatabaseConnection,
}

impl PgPollStore {
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }
}

#[async_trait]
impl PollStore for PgPollStore {
    async fn create(
        &self,
        new_poll: NewPoll,
        options: Vec<NewPollOption>,
        category_ids: Vec<i64>,
    ) -> Result<poll::Model, ServiceError> {
        let now = Utc::now().fixed_offset();
        let txn = self.database.begin().await?;

        let created = poll::ActiveModel {
            title: Set(new_poll.title),
            description: Set(new_poll.description),
            image_data: Set(new_poll.image_data),
            image_type: Set(new_poll.image_type),
            visibility: Set(new_poll.visibility),
            status: Set(new_poll.status),
            start_at: Set(new_poll.start_at),
            end_at: Set(new_poll.end_at),
            expected_votes: Set(new_poll.expected_votes),
            creator_id: Set(new_poll.creator_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for option in options {
            poll_option::ActiveModel {
                poll_id: Set(created.id),
                text: Set(option.text),
                image_data: Set(option.image_data),
                image_type: Set(option.image_type),
                position: Set(option.position),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        for category_id in category_ids {
            let insert = poll_category::ActiveModel {
                poll_id: Set(created.id),
                category_id: Set(category_id),
            }
            .insert(&txn)
            .await;

            if let Err(err) = insert {
                return match err.sql_err() {
                    Some(SqlErr::ForeignKeyConstraintViolation(_)) => Err(
                        ServiceError::InvalidArgument(format!("unknown category {category_id}")),
                    ),
                    _ => Err(ServiceError::Database(err)),
                };
            }
        }

        txn.commit().await?;
        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<poll::Model>, ServiceError> {
        let found = poll::Entity::find_by_id(id).one(&self.database).await?;
        Ok(found)
    }

    async fn find_by_id_with_options(
        &self,
        id: i64,
    ) -> Result<Option<PollWithOptions>, ServiceError> {
        let Some(found) = poll::Entity::find_by_id(id).one(&self.database).await? else {
            return Ok(None);
        };

        let options = found
            .find_related(poll_option::Entity)
            .order_by_asc(poll_option::Column::Position)
            .all(&self.database)
            .await?;

        Ok(Some(PollWithOptions {
            poll: found,
            options,
        }))
    }

    async fn find_by_creator(
        &self,
        creator_id: i64,
        page: u64,
        limit: u64,
    ) -> Result<Vec<poll::Model>, ServiceError> {
        let polls = poll::Entity::find()
            .filter(poll::Column::CreatorId.eq(creator_id))
            .order_by_desc(poll::Column::CreatedAt)
            .offset(super::page_offset(page, limit))
            .limit(limit)
            .all(&self.database)
            .await?;
        Ok(polls)
    }

    async fn count_by_creator(&self, creator_id: i64) -> Result<u64, ServiceError> {
        let total = poll::Entity::find()
            .filter(poll::Column::CreatorId.eq(creator_id))
            .count(&self.database)
            .await?;
        Ok(total)
    }

    async fn close(&self, id: i64) -> Result<u64, ServiceError> {
        let result = poll::Entity::update_many()
            .col_expr(poll::Column::Status, Expr::value(PollStatus::Closed))
            .col_expr(
                poll::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(poll::Column::Id.eq(id))
            .filter(poll::Column::Status.eq(PollStatus::Open))
            .exec(&self.database)
            .await?;
        Ok(result.rows_affected)
    }

    async fn extend(&self, id: i64, changes: ExtendPollChanges) -> Result<(), ServiceError> {
        let mut update = poll::Entity::update_many()
            .col_expr(
                poll::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(poll::Column::Id.eq(id));

        if let Some(end_at) = changes.end_at {
            update = update.col_expr(poll::Column::EndAt, Expr::value(end_at));
        }

        if let Some(expected_votes) = changes.expected_votes {
            update = update.col_expr(poll::Column::ExpectedVotes, Expr::value(expected_votes));
        }

        update.exec(&self.database).await?;
        Ok(())
    }

    async fn find_page(&self, query: &PollPageQuery) -> Result<Vec<PollListItem>, ServiceError> {
        let mut select = poll::Entity::find();

        if let Some(status) = query.status {
            select = select.filter(poll::Column::Status.eq(status));
        }

        if let Some(created_from) = query.created_from {
            select = select.filter(poll::Column::CreatedAt.gte(created_from));
        }

        if let Some(created_to) = query.created_to {
            select = select.filter(poll::Column::CreatedAt.lte(created_to));
        }

        if let Some(slug) = query.category.as_deref() {
            let Some(found) = category::Entity::find()
                .filter(category::Column::Slug.eq(slug))
                .one(&self.database)
                .await?
            else {
                return Ok(Vec::new());
            };

            let poll_ids: Vec<i64> = poll_category::Entity::find()
                .filter(poll_category::Column::CategoryId.eq(found.id))
                .all(&self.database)
                .await?
                .into_iter()
                .map(|link| link.poll_id)
                .collect();

            if poll_ids.is_empty() {
                return Ok(Vec::new());
            }

            select = select.filter(poll::Column::Id.is_in(poll_ids));
        }

        let polls = select
            .order_by_desc(poll::Column::CreatedAt)
            .offset(super::page_offset(query.page, query.limit))
            .limit(query.limit)
            .all(&self.database)
            .await?;

        let mut items = Vec::with_capacity(polls.len());
        for found in polls {
            let total_votes = vote::Entity::find()
                .filter(vote::Column::PollId.eq(found.id))
                .count(&self.database)
                .await?;
            let categories = found
                .find_related(category::Entity)
                .all(&self.database)
                .await?;
            items.push(PollListItem {
                poll: found,
                total_votes,
                categories,
            });
        }

        Ok(items)
    }

    async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        let categories = category::Entity::find()
            .order_by_asc(category::Column::Name)
            .all(&self.database)
            .await?;
        Ok(categories)
    }
}

pub struct PgVoteStore {
    database: DatabaseConnection,
}

impl PgVoteStore {
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }
}

#[async_trait]
impl VoteStore for PgVoteStore {
    async fn create(&self, new_vote: NewVote) -> Result<vote::Model, ServiceError> {
        let inserted = vote::ActiveModel {
            user_id: Set(new_vote.user_id),
            poll_id: Set(new_vote.poll_id),
            option_id: Set(new_vote.option_id),
            voted_at: Set(Utc::now().fixed_offset()),
            ..Default::default()
        }
        .insert(&self.database)
        .await;

        match inserted {
            Ok(model) => Ok(model),
            // The unique (user_id, poll_id) index is the authoritative guard;
            // a violation here means a concurrent request won the race.
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Err(ServiceError::Conflict(
                    "user has already voted in this poll".to_string(),
                )),
                _ => Err(ServiceError::Database(err)),
            },
        }
    }

    async fn has_user_voted(&self, user_id: i64, poll_id: i64) -> Result<bool, ServiceError> {
        let existing = vote::Entity::find()
            .filter(vote::Column::UserId.eq(user_id))
            .filter(vote::Column::PollId.eq(poll_id))
            .one(&self.database)
            .await?;
        Ok(existing.is_some())
    }

    async fn count_by_poll(&self, poll_id: i64) -> Result<u64, ServiceError> {
        let total = vote::Entity::find()
            .filter(vote::Column::PollId.eq(poll_id))
            .count(&self.database)
            .await?;
        Ok(total)
    }

    async fn count_by_option(&self, option_id: i64) -> Result<u64, ServiceError> {
        let total = vote::Entity::find()
            .filter(vote::Column::OptionId.eq(option_id))
            .count(&self.database)
            .await?;
        Ok(total)
    }

    async fn find_user_votes_with_details(
        &self,
        user_id: i64,
        page: u64,
        limit: u64,
    ) -> Result<Vec<UserVoteDetails>, ServiceError> {
        let votes = vote::Entity::find()
            .filter(vote::Column::UserId.eq(user_id))
            .order_by_desc(vote::Column::VotedAt)
            .offset(super::page_offset(page, limit))
            .limit(limit)
            .find_also_related(poll::Entity)
            .all(&self.database)
            .await?;

        let option_ids: Vec<i64> = votes.iter().map(|(cast, _)| cast.option_id).collect();
        let options_by_id: HashMap<i64, poll_option::Model> = poll_option::Entity::find()
            .filter(poll_option::Column::Id.is_in(option_ids))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|option| (option.id, option))
            .collect();

        let mut details = Vec::with_capacity(votes.len());
        for (cast, related_poll) in votes {
            let (Some(related_poll), Some(option)) =
                (related_poll, options_by_id.get(&cast.option_id))
            else {
                // Votes reference polls and options by foreign key, so a
                // missing row indicates external tampering with the schema.
                warn!("vote {} references a missing poll or option", cast.id);
                continue;
            };

            details.push(UserVoteDetails {
                poll_id: related_poll.id,
                title: related_poll.title,
                description: related_poll.description,
                voted_at: cast.voted_at,
                option_id: option.id,
                option_text: option.text.clone(),
            });
        }

        Ok(details)
    }

    async fn count_by_user(&self, user_id: i64) -> Result<u64, ServiceError> {
        let total = vote::Entity::find()
            .filter(vote::Column::UserId.eq(user_id))
            .count(&self.database)
            .await?;
        Ok(total)
    }
}
