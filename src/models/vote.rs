use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};

use crate::entities::vote;
use crate::store::UserVoteDetails;

use super::Pagination;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CastVoteRequest {
    pub user_id: i64,
    pub poll_id: i64,
    pub option_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteView {
    pub id: i64,
    pub user_id: i64,
    pub poll_id: i64,
    pub option_id: i64,
    pub voted_at: DateTimeWithTimeZone,
}

impl From<vote::Model> for VoteView {
    fn from(model: vote::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            poll_id: model.poll_id,
            option_id: model.option_id,
            voted_at: model.voted_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChosenOptionView {
    pub id: i64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserVoteView {
    pub poll_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub voted_at: DateTimeWithTimeZone,
    pub option_chosen: ChosenOptionView,
}

impl From<UserVoteDetails> for UserVoteView {
    fn from(details: UserVoteDetails) -> Self {
        Self {
            poll_id: details.poll_id,
            title: details.title,
            description: details.description,
            voted_at: details.voted_at,
            option_chosen: ChosenOptionView {
                id: details.option_id,
                text: details.option_text,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserVotesResponse {
    pub votes: Vec<UserVoteView>,
    pub pagination: Pagination,
}
