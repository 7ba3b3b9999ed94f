use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::Cache;
use sea_orm::DatabaseConnection;

use crate::config::CacheConfig;
use crate::models::poll::PollResultsView;
use crate::service::{PollService, ResultsService, VotingService};

#[derive(Clone)]
pub struct AppState {
    pub database: DatabaseConnection,
    pub polls: Arc<PollService>,
    pub voting: Arc<VotingService>,
    pub results: Arc<ResultsService>,
    pub cache: Arc<ApiCache>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        database: DatabaseConnection,
        polls: Arc<PollService>,
        voting: Arc<VotingService>,
        results: Arc<ResultsService>,
        cache: Arc<ApiCache>,
    ) -> Self {
        assert!(
            cache.results_capacity >= 10,
            "Results cache capacity must be configured"
        );
        Self {
            database,
            polls,
            voting,
            results,
            cache,
            start_time: Instant::now(),
        }
    }
}

/// Read-side cache for aggregated poll results. Only results of PUBLIC
/// polls are ever inserted, so a cache hit is safe to serve to anyone;
/// entries are invalidated whenever a vote, close, or extend touches the
/// poll.
pub struct ApiCache {
    pub results: Cache<i64, Arc<PollResultsView>>,
    pub results_capacity: u64,
}

impl ApiCache {
    pub fn new(config: &CacheConfig) -> Self {
        assert!(
            config.results_max_capacity >= 10,
            "Results cache capacity threshold"
        );

        let results = Cache::builder()
            .max_capacity(config.results_max_capacity)
            .time_to_live(Duration::from_secs(config.results_ttl_seconds))
            .time_to_idle(Duration::from_secs(config.results_ttl_seconds / 2 + 1))
            .build();

        Self {
            results,
            results_capacity: config.results_max_capacity,
        }
    }
}
