//! Use cases orchestrating validation and persistence. Each service is
//! constructed once at startup with its store collaborators injected; the
//! persistence layer is the sole synchronization point.

mod polls;
mod results;
mod voting;

pub use polls::{CreateOptionInput, CreatePollInput, ExtendPollInput, ListPollsInput, PollService};
pub use results::ResultsService;
pub use voting::VotingService;

use crate::error::ServiceError;

pub const MAX_PAGE_LIMIT: u64 = 100;

/// Shared pagination validation: page >= 1, limit within [1, 100].
pub(crate) fn validate_page_bounds(page: u64, limit: u64) -> Result<(), ServiceError> {
    if page < 1 {
        return Err(ServiceError::InvalidArgument(
            "page must be greater than 0".to_string(),
        ));
    }
    if limit < 1 || limit > MAX_PAGE_LIMIT {
        return Err(ServiceError::InvalidArgument(
            "limit must be between 1 and 100".to_string(),
        ));
    }
    Ok(())
}
