use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::entities::poll::PollStatus;
use crate::entities::vote;
use crate::error::ServiceError;
use crate::store::{NewVote, PollStore, UserVoteDetails, VoteStore};

use super::validate_page_bounds;

pub struct VotingService {
    polls: Arc<dyn PollStore>,
    votes: Arc<dyn VoteStore>,
}

impl VotingService {
    pub fn new(polls: Arc<dyn PollStore>, votes: Arc<dyn VoteStore>) -> Self {
        Self { polls, votes }
    }

    /// Validates and commits a single vote. Checks run in a fixed order so
    /// the first violation is the one reported; nothing is mutated on
    /// failure. The duplicate pre-check gives a fast user-facing error, but
    /// the store's unique (user, poll) constraint is what actually prevents
    /// a concurrent double vote, and a violation at insert time surfaces as
    /// the same Conflict.
    pub async fn cast_vote(
        &self,
        user_id: i64,
        poll_id: i64,
        option_id: i64,
    ) -> Result<vote::Model, ServiceError> {
        let found = self
            .polls
            .find_by_id_with_options(poll_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("poll", poll_id))?;

        if found.poll.status != PollStatus::Open {
            return Err(ServiceError::InvalidState("poll is closed".to_string()));
        }

        let now = Utc::now().fixed_offset();
        if found.poll.start_at > now {
            return Err(ServiceError::InvalidState(
                "poll has not started".to_string(),
            ));
        }

        if found.poll.end_at.is_some_and(|end_at| end_at < now) {
            return Err(ServiceError::InvalidState("poll has ended".to_string()));
        }

        if self.votes.has_user_voted(user_id, poll_id).await? {
            return Err(ServiceError::Conflict(
                "user has already voted in this poll".to_string(),
            ));
        }

        if !found.options.iter().any(|option| option.id == option_id) {
            return Err(ServiceError::InvalidArgument(
                "option does not belong to this poll".to_string(),
            ));
        }

        // Best-effort capacity check: the count-read and the insert are not
        // atomic, so concurrent requests may transiently overshoot the
        // ceiling by a small number of votes.
        if let Some(expected) = found.poll.expected_votes {
            let current = self.votes.count_by_poll(poll_id).await?;
            if current >= expected as u64 {
                return Err(ServiceError::Conflict(
                    "poll has reached its expected number of votes".to_string(),
                ));
            }
        }

        let cast = self
            .votes
            .create(NewVote {
                user_id,
                poll_id,
                option_id,
            })
            .await?;

        debug!("user {user_id} voted for option {option_id} in poll {poll_id}");
        Ok(cast)
    }

    pub async fn voted_by(
        &self,
        user_id: i64,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<UserVoteDetails>, u64), ServiceError> {
        validate_page_bounds(page, limit)?;
        let votes = self
            .votes
            .find_user_votes_with_details(user_id, page, limit)
            .await?;
        let total = self.votes.count_by_user(user_id).await?;
        Ok((votes, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::poll::PollVisibility;
    use crate::service::polls::{CreateOptionInput, CreatePollInput, PollService};
    use crate::store::memory::MemoryStore;
    use chrono::Duration;
    use sea_orm::prelude::DateTimeWithTimeZone;

    struct Fixture {
        polls: PollService,
        voting: VotingService,
        store: Arc<MemoryStore>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        Fixture {
            polls: PollService::new(store.clone()),
            voting: VotingService::new(store.clone(), store.clone()),
            store,
        }
    }

    fn poll_input(
        status: Option<PollStatus>,
        start_at: Option<DateTimeWithTimeZone>,
        end_at: Option<DateTimeWithTimeZone>,
        expected_votes: Option<i32>,
    ) -> CreatePollInput {
        CreatePollInput {
            title: "Lunch spot?".to_string(),
            description: None,
            image_data: None,
            image_type: None,
            visibility: Some(PollVisibility::Public),
            status,
            start_at,
            end_at,
            expected_votes,
            creator_id: 1,
            category_ids: Vec::new(),
            options: vec![
                CreateOptionInput {
                    text: "Tacos".to_string(),
                    image_data: None,
                    image_type: None,
                },
                CreateOptionInput {
                    text: "Ramen".to_string(),
                    image_data: None,
                    image_type: None,
                },
            ],
        }
    }

    #[tokio::test]
    async fn vote_on_missing_poll_is_not_found() {
        let fx = fixture();
        assert!(matches!(
            fx.voting.cast_vote(1, 99, 1).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn vote_creates_exactly_one_row() {
        let fx = fixture();
        let created = fx
            .polls
            .create(poll_input(None, None, None, Some(10)))
            .await
            .unwrap();

        let cast = fx
            .voting
            .cast_vote(7, created.poll.id, created.options[0].id)
            .await
            .unwrap();
        assert_eq!(cast.user_id, 7);
        assert_eq!(cast.poll_id, created.poll.id);
        assert_eq!(cast.option_id, created.options[0].id);
        assert!(cast.voted_at <= Utc::now().fixed_offset());
        assert_eq!(fx.store.vote_count(created.poll.id), 1);
    }

    #[tokio::test]
    async fn second_vote_by_same_user_conflicts() {
        let fx = fixture();
        let created = fx
            .polls
            .create(poll_input(None, None, None, Some(10)))
            .await
            .unwrap();

        fx.voting
            .cast_vote(7, created.poll.id, created.options[0].id)
            .await
            .unwrap();

        // Even when switching to the other option.
        let err = fx
            .voting
            .cast_vote(7, created.poll.id, created.options[1].id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(fx.store.vote_count(created.poll.id), 1);

        // Other users are unaffected.
        fx.voting
            .cast_vote(8, created.poll.id, created.options[1].id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn vote_on_non_open_poll_is_invalid_state() {
        let fx = fixture();
        let draft = fx
            .polls
            .create(poll_input(Some(PollStatus::Draft), None, None, Some(10)))
            .await
            .unwrap();
        assert!(matches!(
            fx.voting
                .cast_vote(1, draft.poll.id, draft.options[0].id)
                .await
                .unwrap_err(),
            ServiceError::InvalidState(_)
        ));

        let open = fx
            .polls
            .create(poll_input(None, None, None, Some(10)))
            .await
            .unwrap();
        fx.polls.close(open.poll.id).await.unwrap();
        assert!(matches!(
            fx.voting
                .cast_vote(1, open.poll.id, open.options[0].id)
                .await
                .unwrap_err(),
            ServiceError::InvalidState(_)
        ));
    }

    #[tokio::test]
    async fn vote_outside_time_window_is_invalid_state() {
        let fx = fixture();

        let not_started = fx
            .polls
            .create(poll_input(
                None,
                Some((Utc::now() + Duration::hours(1)).fixed_offset()),
                None,
                Some(10),
            ))
            .await
            .unwrap();
        assert!(matches!(
            fx.voting
                .cast_vote(1, not_started.poll.id, not_started.options[0].id)
                .await
                .unwrap_err(),
            ServiceError::InvalidState(_)
        ));

        // A poll whose end date has passed while it is still marked OPEN.
        let mut input = poll_input(None, None, None, Some(10));
        input.start_at = Some((Utc::now() - Duration::hours(2)).fixed_offset());
        let ended = fx.polls.create(input).await.unwrap();
        fx.store
            .backdate_end(ended.poll.id, (Utc::now() - Duration::hours(1)).fixed_offset());
        assert!(matches!(
            fx.voting
                .cast_vote(1, ended.poll.id, ended.options[0].id)
                .await
                .unwrap_err(),
            ServiceError::InvalidState(_)
        ));
    }

    #[tokio::test]
    async fn vote_with_foreign_option_is_invalid_argument() {
        let fx = fixture();
        let first = fx
            .polls
            .create(poll_input(None, None, None, Some(10)))
            .await
            .unwrap();
        let second = fx
            .polls
            .create(poll_input(None, None, None, Some(10)))
            .await
            .unwrap();

        let err = fx
            .voting
            .cast_vote(1, first.poll.id, second.options[0].id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn capacity_ceiling_rejects_once_reached() {
        let fx = fixture();
        let created = fx
            .polls
            .create(poll_input(None, None, None, Some(2)))
            .await
            .unwrap();

        fx.voting
            .cast_vote(1, created.poll.id, created.options[0].id)
            .await
            .unwrap();
        fx.voting
            .cast_vote(2, created.poll.id, created.options[1].id)
            .await
            .unwrap();

        let err = fx
            .voting
            .cast_vote(3, created.poll.id, created.options[0].id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(fx.store.vote_count(created.poll.id), 2);
    }

    #[tokio::test]
    async fn duplicate_check_precedes_option_membership() {
        let fx = fixture();
        let first = fx
            .polls
            .create(poll_input(None, None, None, Some(10)))
            .await
            .unwrap();
        let second = fx
            .polls
            .create(poll_input(None, None, None, Some(10)))
            .await
            .unwrap();

        fx.voting
            .cast_vote(1, first.poll.id, first.options[0].id)
            .await
            .unwrap();

        // A repeat vote with a foreign option reports the duplicate, not the
        // bad option: the checks short-circuit in order.
        let err = fx
            .voting
            .cast_vote(1, first.poll.id, second.options[0].id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn voted_by_lists_details_newest_first() {
        let fx = fixture();
        let first = fx
            .polls
            .create(poll_input(None, None, None, Some(10)))
            .await
            .unwrap();
        let second = fx
            .polls
            .create(poll_input(None, None, None, Some(10)))
            .await
            .unwrap();

        fx.voting
            .cast_vote(1, first.poll.id, first.options[0].id)
            .await
            .unwrap();
        fx.voting
            .cast_vote(1, second.poll.id, second.options[1].id)
            .await
            .unwrap();

        let (votes, total) = fx.voting.voted_by(1, 1, 10).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(votes.len(), 2);
        assert_eq!(votes[0].poll_id, second.poll.id);
        assert_eq!(votes[0].option_text, "Ramen");
        assert_eq!(votes[1].poll_id, first.poll.id);

        assert!(matches!(
            fx.voting.voted_by(1, 0, 10).await.unwrap_err(),
            ServiceError::InvalidArgument(_)
        ));
    }
}
