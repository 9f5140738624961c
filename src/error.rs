use thiserror::Error;

/// Errors surfaced by [`SearchEngine::perform_search`](crate::engine::SearchEngine::perform_search).
///
/// Provider outages, single-source failures, cache and history errors are
/// all recovered internally; only a search that reached no source at all
/// is reported.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search temporarily unavailable: all {attempted} content sources failed")]
    Unavailable { attempted: usize },
}
