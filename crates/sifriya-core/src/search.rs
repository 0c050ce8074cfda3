//! Debounced full-text search.
//!
//! Every keystroke goes through [`SearchSession::on_input`], which returns a
//! ticket for the new query. The caller runs [`run_debounced`] for it (and
//! may abort the previous run); [`SearchSession::accept`] only applies
//! results for the newest ticket.

use std::time::Duration;
use tracing::{debug, warn};

use crate::api::LibraryApi;
use crate::error::Result;
use crate::model::{SearchOptions, SearchResults};

/// Input must be idle this long before a search is sent
pub const SEARCH_QUIET_PERIOD: Duration = Duration::from_millis(300);

pub const DEFAULT_SEARCH_SIZE: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub query: String,
    pub options: SearchOptions,
    generation: u64,
}

#[derive(Debug, Clone)]
pub struct SearchSession {
    query: String,
    options: SearchOptions,
    results: Option<SearchResults>,
    error: Option<String>,
    pending: bool,
    generation: u64,
}

impl Default for SearchSession {
    fn default() -> Self {
        Self::new(SearchOptions {
            size: Some(DEFAULT_SEARCH_SIZE),
            ..SearchOptions::default()
        })
    }
}

impl SearchSession {
    pub fn new(options: SearchOptions) -> Self {
        Self {
            query: String::new(),
            options,
            results: None,
            error: None,
            pending: false,
            generation: 0,
        }
    }

    /// Record new input; None when the query is blank and results were cleared
    pub fn on_input(&mut self, query: &str) -> Option<SearchTicket> {
        self.generation += 1;
        self.query = query.to_string();

        let trimmed = query.trim();
        if trimmed.is_empty() {
            self.results = None;
            self.error = None;
            self.pending = false;
            return None;
        }

        self.pending = true;
        Some(SearchTicket {
            query: trimmed.to_string(),
            options: self.options.clone(),
            generation: self.generation,
        })
    }

    pub fn is_current(&self, ticket: &SearchTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Apply results; false when newer input has arrived since
    pub fn accept(&mut self, ticket: &SearchTicket, result: Result<SearchResults>) -> bool {
        if !self.is_current(ticket) {
            debug!(query = %ticket.query, "dropping superseded search");
            return false;
        }
        self.pending = false;
        match result {
            Ok(results) => {
                self.results = Some(results);
                self.error = None;
            }
            Err(err) => {
                warn!(query = %ticket.query, error = %err, "search failed");
                self.error = Some(err.to_string());
            }
        }
        true
    }

    pub fn clear(&mut self) {
        self.on_input("");
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> Option<&SearchResults> {
        self.results.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

/// Wait out the quiet period, then search
pub async fn run_debounced(api: &LibraryApi, ticket: &SearchTicket) -> Result<SearchResults> {
    tokio::time::sleep(SEARCH_QUIET_PERIOD).await;
    api.search(&ticket.query, &ticket.options).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::scripted_api;
    use crate::error::ApiError;
    use crate::fetch::testing::ok;
    use tokio::time::Instant;

    const HITS: &str = r#"{"hits": {"total": {"value": 1}, "hits": [
        {"_source": {"ref": "Genesis 1:1", "heRef": "בראשית א׳:א׳"},
         "highlight": {"exact": ["In the <b>beginning</b>"]}}
    ]}}"#;

    fn results(total: u64) -> SearchResults {
        SearchResults {
            total,
            hits: Vec::new(),
        }
    }

    #[test]
    fn test_blank_input_clears() {
        let mut session = SearchSession::default();
        let ticket = session.on_input("light").unwrap();
        session.accept(&ticket, Ok(results(4)));
        assert!(session.results().is_some());

        assert!(session.on_input("   ").is_none());
        assert!(session.results().is_none());
        assert!(!session.is_pending());
    }

    #[test]
    fn test_only_newest_ticket_applies() {
        let mut session = SearchSession::default();
        let old = session.on_input("lig").unwrap();
        let new = session.on_input("light").unwrap();

        assert!(!session.accept(&old, Ok(results(100))));
        assert!(session.is_pending());
        assert!(session.accept(&new, Ok(results(7))));
        assert_eq!(session.results().map(|r| r.total), Some(7));
    }

    #[test]
    fn test_error_keeps_previous_results() {
        let mut session = SearchSession::default();
        let ticket = session.on_input("light").unwrap();
        session.accept(&ticket, Ok(results(7)));

        let ticket = session.on_input("lights").unwrap();
        let err = ApiError::InvalidResponse {
            operation: "search",
            input: "lights".to_string(),
            detail: "bad".to_string(),
        };
        assert!(session.accept(&ticket, Err(err)));
        assert_eq!(session.results().map(|r| r.total), Some(7));
        assert!(session.error().is_some());
    }

    #[test]
    fn test_ticket_carries_trimmed_query_and_size() {
        let mut session = SearchSession::default();
        let ticket = session.on_input("  shalom ").unwrap();
        assert_eq!(ticket.query, "shalom");
        assert_eq!(ticket.options.size, Some(DEFAULT_SEARCH_SIZE));
        assert_eq!(session.query(), "  shalom ");
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_waits_for_quiet_period() {
        let (api, transport) = scripted_api(vec![ok(HITS)]);
        let mut session = SearchSession::default();
        let ticket = session.on_input("beginning").unwrap();

        let start = Instant::now();
        let result = run_debounced(&api, &ticket).await;
        assert!(transport.instants()[0] - start >= SEARCH_QUIET_PERIOD);

        assert!(session.accept(&ticket, result));
        let results = session.results().unwrap();
        assert_eq!(results.total, 1);
        assert_eq!(results.hits[0].reference, "Genesis 1:1");
        assert_eq!(
            transport.urls(),
            vec!["https://example.org/api/search-wrapper?q=beginning&size=20"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborted_run_sends_nothing() {
        let (api, transport) = scripted_api(vec![ok(HITS)]);
        let mut session = SearchSession::default();
        let ticket = session.on_input("begin").unwrap();

        let handle = tokio::spawn(async move { run_debounced(&api, &ticket).await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
        assert!(transport.urls().is_empty());
    }
}
