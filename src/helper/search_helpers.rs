use crate::models::api_operations::FeedApi;
use crate::models::{Notification, UserSummary};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
pub const EMPTY_QUERY_MESSAGE: &str = "Please enter a search term.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    /// The input is blank; no request is made.
    NeedsQuery { message: &'static str },
    /// Waiting for typing to settle.
    Scheduled { query: String },
    Loading { query: String, generation: u64 },
    Results { query: String, users: Vec<UserSummary> },
    /// The search ran and matched nobody.
    NoResults { query: String, message: String },
    Failed { query: String, alert: Notification },
}

struct SearchShared {
    api: Arc<dyn FeedApi>,
    generation: AtomicU64,
    dispatched: AtomicU64,
    state: Mutex<SearchState>,
}

impl SearchShared {
    /// Tags a new request with the next generation and shows it as loading.
    fn begin_dispatch(&self, query: &str) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.dispatched.fetch_add(1, Ordering::SeqCst);
        *self.state.lock() = SearchState::Loading { query: query.to_string(), generation };
        log::debug!("Dispatching user search #{} for '{}'", generation, query);
        generation
    }

    /// Runs the request and applies the response only if no newer request
    /// has been dispatched in the meantime.
    async fn complete(&self, generation: u64, query: String) {
        let result = self.api.search_users(&query).await;

        let mut state = self.state.lock();
        let current = self.generation.load(Ordering::SeqCst);
        if current != generation {
            log::debug!("Discarding stale search #{} for '{}' (current #{})", generation, query, current);
            return;
        }
        *state = match result {
            Ok(users) if users.is_empty() => SearchState::NoResults {
                message: format!("No users found for \"{}\".", query),
                query,
            },
            Ok(users) => SearchState::Results { query, users },
            Err(e) => {
                log::error!("User search for '{}' failed: {}", query, e);
                SearchState::Failed { query, alert: Notification::error(e.user_message()) }
            }
        };
    }
}

/// Debounced, race-safe user search.
///
/// Each keystroke cancels the pending timer and starts a new one; only the
/// last input inside the quiet window reaches the network. Requests that
/// were already sent are never aborted. Their responses are dropped by the
/// generation check instead.
///
/// `on_query_change` spawns onto the current tokio runtime.
pub struct SearchDispatcher {
    shared: Arc<SearchShared>,
    window: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
    query: Mutex<String>,
}

impl SearchDispatcher {
    pub fn new(api: Arc<dyn FeedApi>, window: Duration) -> Self {
        Self {
            shared: Arc::new(SearchShared {
                api,
                generation: AtomicU64::new(0),
                dispatched: AtomicU64::new(0),
                state: Mutex::new(SearchState::Idle),
            }),
            window,
            pending: Mutex::new(None),
            query: Mutex::new(String::new()),
        }
    }

    fn cancel_pending(&self) {
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }
    }

    /// Handles blank input: no request, an immediate prompt, and any request
    /// still out is invalidated so it cannot replace the prompt.
    fn show_needs_query(&self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        *self.shared.state.lock() = SearchState::NeedsQuery { message: EMPTY_QUERY_MESSAGE };
    }

    pub fn on_query_change(&self, text: &str) {
        self.cancel_pending();
        *self.query.lock() = text.to_string();

        let query = text.trim().to_string();
        if query.is_empty() {
            self.show_needs_query();
            return;
        }

        *self.shared.state.lock() = SearchState::Scheduled { query: query.clone() };
        let shared = self.shared.clone();
        let window = self.window;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            // From here on nothing awaits, so an abort either lands before
            // the dispatch or not at all. The request itself runs detached.
            let generation = shared.begin_dispatch(&query);
            tokio::spawn(async move { shared.complete(generation, query).await });
        });
        *self.pending.lock() = Some(timer);
    }

    /// Searches immediately, skipping the debounce window (Enter key).
    pub async fn submit_now(&self, text: &str) {
        self.cancel_pending();
        *self.query.lock() = text.to_string();

        let query = text.trim().to_string();
        if query.is_empty() {
            self.show_needs_query();
            return;
        }
        let generation = self.shared.begin_dispatch(&query);
        self.shared.complete(generation, query).await;
    }

    pub fn state(&self) -> SearchState {
        self.shared.state.lock().clone()
    }

    pub fn query(&self) -> String {
        self.query.lock().clone()
    }

    pub fn current_generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    /// Number of requests actually sent.
    pub fn dispatch_count(&self) -> u64 {
        self.shared.dispatched.load(Ordering::SeqCst)
    }

    pub fn has_pending_dispatch(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for SearchDispatcher {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
