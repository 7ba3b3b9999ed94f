use std::sync::Arc;

use tokio::task::JoinSet;

use crate::entities::poll::PollVisibility;
use crate::error::ServiceError;
use crate::models::poll::{OptionResultView, PollResultsView};
use crate::store::{PollStore, VoteStore};

pub struct ResultsService {
    polls: Arc<dyn PollStore>,
    votes: Arc<dyn VoteStore>,
}

impl ResultsService {
    pub fn new(polls: Arc<dyn PollStore>, votes: Arc<dyn VoteStore>) -> Self {
        Self { polls, votes }
    }

    /// Aggregates per-option tallies for a poll. Results of PRIVATE polls
    /// are visible to the creator only. Per-option counts are independent
    /// reads, so they are fetched concurrently.
    pub async fn results(
        &self,
        poll_id: i64,
        requesting_user: Option<i64>,
    ) -> Result<PollResultsView, ServiceError> {
        let found = self
            .polls
            .find_by_id_with_options(poll_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("poll", poll_id))?;

        if found.poll.visibility == PollVisibility::Private
            && requesting_user != Some(found.poll.creator_id)
        {
            return Err(ServiceError::Forbidden(
                "only the poll creator can view results of private polls".to_string(),
            ));
        }

        let total_votes = self.votes.count_by_poll(poll_id).await?;

        let mut tasks = JoinSet::new();
        for (index, option) in found.options.iter().enumerate() {
            let votes = Arc::clone(&self.votes);
            let option_id = option.id;
            tasks.spawn(async move { (index, votes.count_by_option(option_id).await) });
        }

        let mut counts = vec![0u64; found.options.len()];
        while let Some(joined) = tasks.join_next().await {
            let (index, count) = joined?;
            counts[index] = count?;
        }

        let mut options: Vec<OptionResultView> = found
            .options
            .into_iter()
            .zip(counts)
            .map(|(option, votes)| OptionResultView {
                id: option.id,
                text: option.text,
                votes,
                percentage: percentage(votes, total_votes),
            })
            .collect();
        // Stable sort keeps position order among ties.
        options.sort_by(|a, b| b.votes.cmp(&a.votes));

        Ok(PollResultsView {
            poll_id: found.poll.id,
            title: found.poll.title,
            description: found.poll.description,
            status: found.poll.status,
            visibility: found.poll.visibility,
            total_votes,
            options,
        })
    }
}

/// Share of the total as a percentage, rounded to two decimal places; zero
/// when no votes have been cast.
fn percentage(votes: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = (votes as f64 / total as f64) * 100.0;
    (raw * 100.0).round() / 100.0
}
