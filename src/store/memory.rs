//! In-memory store used to exercise the use cases in tests. Emulates the
//! database-level guarantees the services rely on: the (user_id, poll_id)
//! unique constraint and the conditional OPEN -> CLOSED update.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::entities::poll::{self, PollStatus};
use crate::entities::{category, poll_category, poll_option, vote};
use crate::error::ServiceError;

use super::{
    ExtendPollChanges, NewPoll, NewPollOption, NewVote, PollListItem, PollPageQuery, PollStore,
    PollWithOptions, UserVoteDetails, VoteStore,
};

#[derive(Default)]
struct Inner {
    polls: Vec<poll::Model>,
    options: Vec<poll_option::Model>,
    votes: Vec<vote::Model>,
    categories: Vec<category::Model>,
    links: Vec<poll_category::Model>,
    next_id: i64,
}

impl Inner {
    fn assign_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_category(&self, name: &str, slug: &str) -> i64 {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.assign_id();
        inner.categories.push(category::Model {
            id,
            name: name.to_string(),
            slug: slug.to_string(),
        });
        id
    }

    pub fn poll(&self, id: i64) -> Option<poll::Model> {
        let inner = self.inner.lock().unwrap();
        inner.polls.iter().find(|p| p.id == id).cloned()
    }

    /// Test hook: moves a poll's end date without the extend-only-forward
    /// rule, to simulate a poll whose window lapsed while still OPEN.
    pub fn backdate_end(&self, poll_id: i64, end_at: chrono::DateTime<chrono::FixedOffset>) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(found) = inner.polls.iter_mut().find(|p| p.id == poll_id) {
            found.end_at = Some(end_at);
        }
    }

    pub fn vote_count(&self, poll_id: i64) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.votes.iter().filter(|v| v.poll_id == poll_id).count()
    }
}

#[async_trait]
impl PollStore for MemoryStore {
    async fn create(
        &self,
        new_poll: NewPoll,
        options: Vec<NewPollOption>,
        category_ids: Vec<i64>,
    ) -> Result<poll::Model, ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now().fixed_offset();

        for category_id in &category_ids {
            if !inner.categories.iter().any(|c| c.id == *category_id) {
                return Err(ServiceError::InvalidArgument(format!(
                    "unknown category {category_id}"
                )));
            }
        }

        let poll_id = inner.assign_id();
        let created = poll::Model {
            id: poll_id,
            title: new_poll.title,
            description: new_poll.description,
            image_data: new_poll.image_data,
            image_type: new_poll.image_type,
            visibility: new_poll.visibility,
            status: new_poll.status,
            start_at: new_poll.start_at,
            end_at: new_poll.end_at,
            expected_votes: new_poll.expected_votes,
            creator_id: new_poll.creator_id,
            created_at: now,
            updated_at: now,
        };
        inner.polls.push(created.clone());

        for option in options {
            let option_id = inner.assign_id();
            inner.options.push(poll_option::Model {
                id: option_id,
                poll_id,
                text: option.text,
                image_data: option.image_data,
                image_type: option.image_type,
                position: option.position,
                created_at: now,
            });
        }

        for category_id in category_ids {
            inner.links.push(poll_category::Model {
                poll_id,
                category_id,
            });
        }

        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<poll::Model>, ServiceError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.polls.iter().find(|p| p.id == id).cloned())
    }

    async fn find_by_id_with_options(
        &self,
        id: i64,
    ) -> Result<Option<PollWithOptions>, ServiceError> {
        let inner = self.inner.lock().unwrap();
        let Some(found) = inner.polls.iter().find(|p| p.id == id).cloned() else {
            return Ok(None);
        };
        let mut options: Vec<poll_option::Model> = inner
            .options
            .iter()
            .filter(|o| o.poll_id == id)
            .cloned()
            .collect();
        options.sort_by_key(|o| o.position);
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
        let inner = self.inner.lock().unwrap();
        let mut polls: Vec<poll::Model> = inner
            .polls
            .iter()
            .filter(|p| p.creator_id == creator_id)
            .cloned()
            .collect();
        polls.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(polls
            .into_iter()
            .skip(super::page_offset(page, limit) as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count_by_creator(&self, creator_id: i64) -> Result<u64, ServiceError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .polls
            .iter()
            .filter(|p| p.creator_id == creator_id)
            .count() as u64)
    }

    async fn close(&self, id: i64) -> Result<u64, ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(found) = inner
            .polls
            .iter_mut()
            .find(|p| p.id == id && p.status == PollStatus::Open)
        else {
            return Ok(0);
        };
        found.status = PollStatus::Closed;
        found.updated_at = Utc::now().fixed_offset();
        Ok(1)
    }

    async fn extend(&self, id: i64, changes: ExtendPollChanges) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(found) = inner.polls.iter_mut().find(|p| p.id == id) {
            if let Some(end_at) = changes.end_at {
                found.end_at = Some(end_at);
            }
            if let Some(expected_votes) = changes.expected_votes {
                found.expected_votes = Some(expected_votes);
            }
            found.updated_at = Utc::now().fixed_offset();
        }
        Ok(())
    }

    async fn find_page(&self, query: &PollPageQuery) -> Result<Vec<PollListItem>, ServiceError> {
        let inner = self.inner.lock().unwrap();

        let category_id = match query.category.as_deref() {
            Some(slug) => match inner.categories.iter().find(|c| c.slug == slug) {
                Some(found) => Some(found.id),
                None => return Ok(Vec::new()),
            },
            None => None,
        };

        let mut polls: Vec<poll::Model> = inner
            .polls
            .iter()
            .filter(|p| query.status.is_none_or(|status| p.status == status))
            .filter(|p| query.created_from.is_none_or(|from| p.created_at >= from))
            .filter(|p| query.created_to.is_none_or(|to| p.created_at <= to))
            .filter(|p| {
                category_id.is_none_or(|category_id| {
                    inner
                        .links
                        .iter()
                        .any(|l| l.poll_id == p.id && l.category_id == category_id)
                })
            })
            .cloned()
            .collect();
        polls.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        let page: Vec<poll::Model> = polls
            .into_iter()
            .skip(super::page_offset(query.page, query.limit) as usize)
            .take(query.limit as usize)
            .collect();

        Ok(page
            .into_iter()
            .map(|found| {
                let total_votes = inner.votes.iter().filter(|v| v.poll_id == found.id).count();
                let categories = inner
                    .links
                    .iter()
                    .filter(|l| l.poll_id == found.id)
                    .filter_map(|l| {
                        inner
                            .categories
                            .iter()
                            .find(|c| c.id == l.category_id)
                            .cloned()
                    })
                    .collect();
                PollListItem {
                    poll: found,
                    total_votes: total_votes as u64,
                    categories,
                }
            })
            .collect())
    }

    async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        let inner = self.inner.lock().unwrap();
        let mut categories = inner.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }
}

#[async_trait]
impl VoteStore for MemoryStore {
    async fn create(&self, new_vote: NewVote) -> Result<vote::Model, ServiceError> {
        let mut inner = self.inner.lock().unwrap();

        // Same behavior as the unique (user_id, poll_id) index.
        let duplicate = inner
            .votes
            .iter()
            .any(|v| v.user_id == new_vote.user_id && v.poll_id == new_vote.poll_id);
        if duplicate {
            return Err(ServiceError::Conflict(
                "user has already voted in this poll".to_string(),
            ));
        }

        let id = inner.assign_id();
        let created = vote::Model {
            id,
            user_id: new_vote.user_id,
            poll_id: new_vote.poll_id,
            option_id: new_vote.option_id,
            voted_at: Utc::now().fixed_offset(),
        };
        inner.votes.push(created.clone());
        Ok(created)
    }

    async fn has_user_voted(&self, user_id: i64, poll_id: i64) -> Result<bool, ServiceError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .votes
            .iter()
            .any(|v| v.user_id == user_id && v.poll_id == poll_id))
    }

    async fn count_by_poll(&self, poll_id: i64) -> Result<u64, ServiceError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.votes.iter().filter(|v| v.poll_id == poll_id).count() as u64)
    }

    async fn count_by_option(&self, option_id: i64) -> Result<u64, ServiceError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .votes
            .iter()
            .filter(|v| v.option_id == option_id)
            .count() as u64)
    }

    async fn find_user_votes_with_details(
        &self,
        user_id: i64,
        page: u64,
        limit: u64,
    ) -> Result<Vec<UserVoteDetails>, ServiceError> {
        let inner = self.inner.lock().unwrap();
        let mut votes: Vec<vote::Model> = inner
            .votes
            .iter()
            .filter(|v| v.user_id == user_id)
            .cloned()
            .collect();
        votes.sort_by(|a, b| (b.voted_at, b.id).cmp(&(a.voted_at, a.id)));

        Ok(votes
            .into_iter()
            .skip(super::page_offset(page, limit) as usize)
            .take(limit as usize)
            .filter_map(|cast| {
                let found = inner.polls.iter().find(|p| p.id == cast.poll_id)?;
                let option = inner.options.iter().find(|o| o.id == cast.option_id)?;
                Some(UserVoteDetails {
                    poll_id: found.id,
                    title: found.title.clone(),
                    description: found.description.clone(),
                    voted_at: cast.voted_at,
                    option_id: option.id,
                    option_text: option.text.clone(),
                })
            })
            .collect())
    }

    async fn count_by_user(&self, user_id: i64) -> Result<u64, ServiceError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.votes.iter().filter(|v| v.user_id == user_id).count() as u64)
    }
}
