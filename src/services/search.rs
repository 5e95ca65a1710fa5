//! Type-ahead search over clients and policies
//!
//! `DebouncedSearch` waits for the user to stop typing before running the
//! search function, and abandons a pending search as soon as a newer query
//! arrives. Results are published on a `watch` channel so a UI only ever
//! sees the state for the latest query.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::services::store::Snapshot;
use crate::types::{Client, Policy, RecordId};

/// Dropdown size for type-ahead suggestions
pub const MAX_DROPDOWN_RESULTS: usize = 5;

/// Delay before a query is searched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebouncePolicy {
    /// Queries of two or more characters
    pub delay: Duration,
    /// Single-character queries match almost everything; wait longer
    pub short_query_delay: Duration,
    /// Shorter queries clear the results instead of searching
    pub min_len: usize,
}

impl Default for DebouncePolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(300),
            short_query_delay: Duration::from_millis(500),
            min_len: 1,
        }
    }
}

impl DebouncePolicy {
    /// `None` when the query is too short to search.
    pub fn delay_for(&self, query: &str) -> Option<Duration> {
        let len = query.trim().chars().count();
        if len == 0 || len < self.min_len {
            None
        } else if len == 1 {
            Some(self.short_query_delay)
        } else {
            Some(self.delay)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchState<T> {
    Idle,
    Pending { query: String },
    Ready { query: String, hits: Vec<T> },
}

pub struct DebouncedSearch<T, F> {
    policy: DebouncePolicy,
    search: Arc<F>,
    tx: Arc<watch::Sender<SearchState<T>>>,
    generation: Arc<AtomicU64>,
    pending: Option<JoinHandle<()>>,
}

impl<T, F> DebouncedSearch<T, F>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(&str) -> Vec<T> + Send + Sync + 'static,
{
    pub fn new(policy: DebouncePolicy, search: F) -> Self {
        let (tx, _rx) = watch::channel(SearchState::Idle);
        Self {
            policy,
            search: Arc::new(search),
            tx: Arc::new(tx),
            generation: Arc::new(AtomicU64::new(0)),
            pending: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState<T>> {
        self.tx.subscribe()
    }

    /// Schedule a search for `query`, replacing any pending one.
    /// Must be called from within a tokio runtime.
    pub fn submit(&mut self, query: &str) {
        let generation = self.abandon_pending();

        let Some(delay) = self.policy.delay_for(query) else {
            self.tx.send_replace(SearchState::Idle);
            return;
        };

        let query = query.trim().to_string();
        self.tx.send_replace(SearchState::Pending {
            query: query.clone(),
        });
        trace!(%query, ?delay, generation, "search scheduled");

        let tx = Arc::clone(&self.tx);
        let search = Arc::clone(&self.search);
        let current = Arc::clone(&self.generation);

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let hits = search(&query);
            // A newer submit may have raced past the abort
            tx.send_if_modified(|state| {
                if current.load(Ordering::SeqCst) != generation {
                    return false;
                }
                *state = SearchState::Ready { query, hits };
                true
            });
        }));
    }

    /// Drop the pending search and clear the results.
    pub fn cancel(&mut self) {
        self.abandon_pending();
        self.tx.send_replace(SearchState::Idle);
    }

    fn abandon_pending(&mut self) -> u64 {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl<T, F> Drop for DebouncedSearch<T, F> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

/// Case-insensitive match on name or legal name, plain match on INN.
pub fn client_matches(client: &Client, query: &str) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();

    client.name.to_lowercase().contains(&needle)
        || client
            .legal_name
            .as_deref()
            .is_some_and(|n| n.to_lowercase().contains(&needle))
        || client.inn.as_deref().is_some_and(|inn| inn.contains(query))
}

pub fn search_clients(clients: &[Client], query: &str, limit: usize) -> Vec<Client> {
    clients
        .iter()
        .filter(|c| client_matches(c, query))
        .take(limit)
        .cloned()
        .collect()
}

/// Match on policy id, client name, coverage type or underwriter.
///
/// `client_names` comes from [`Snapshot::client_names`]; the policy's own
/// `client_name` covers clients missing from the snapshot.
pub fn policy_matches(
    client_names: &HashMap<RecordId, &str>,
    policy: &Policy,
    query: &str,
) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    let contains = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(&needle));
    let client_name = policy.client.and_then(|id| client_names.get(&id).copied());

    policy.id.to_string().contains(query)
        || contains(client_name)
        || contains(policy.client_name.as_deref())
        || contains(policy.coverage_type.as_deref())
        || contains(policy.underwriter.as_deref())
}

pub fn search_policies(snapshot: &Snapshot, query: &str, limit: usize) -> Vec<Policy> {
    let client_names = snapshot.client_names();
    snapshot
        .policies
        .iter()
        .filter(|p| policy_matches(&client_names, p, query))
        .take(limit)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn clients() -> Vec<Client> {
        vec![
            Client {
                id: 1,
                name: "Orient Trade".into(),
                legal_name: Some("ООО Ориент Трейд".into()),
                inn: Some("301234567".into()),
                ..Default::default()
            },
            Client {
                id: 2,
                name: "Samarkand Agro".into(),
                inn: Some("302999111".into()),
                ..Default::default()
            },
            Client {
                id: 3,
                name: "Oriental Foods".into(),
                ..Default::default()
            },
        ]
    }

    fn counting_search(
        calls: Arc<AtomicUsize>,
    ) -> impl Fn(&str) -> Vec<Client> + Send + Sync + 'static {
        let all = clients();
        move |q: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
            search_clients(&all, q, MAX_DROPDOWN_RESULTS)
        }
    }

    fn ready_ids(state: &SearchState<Client>) -> Option<(String, Vec<u64>)> {
        match state {
            SearchState::Ready { query, hits } => {
                Some((query.clone(), hits.iter().map(|c| c.id).collect()))
            }
            _ => None,
        }
    }

    // ========== matching ==========

    #[test]
    fn test_client_matches_name_case_insensitive() {
        let all = clients();
        let ids: Vec<u64> = search_clients(&all, "ORIENT", 5).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_client_matches_cyrillic_legal_name() {
        let all = clients();
        let hits = search_clients(&all, "ориент", 5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);
    }

    #[test]
    fn test_client_matches_inn() {
        let all = clients();
        let hits = search_clients(&all, "302999", 5);
        assert_eq!(hits[0].id, 2);
    }

    #[test]
    fn test_search_limit() {
        let all = clients();
        assert_eq!(search_clients(&all, "a", 1).len(), 1);
    }

    #[test]
    fn test_policy_matches_fields() {
        let snapshot = Snapshot::new(
            clients(),
            vec![
                Policy {
                    id: 1042,
                    client: Some(2),
                    underwriter: Some("Karimova".into()),
                    coverage_type: Some("Полное покрытие".into()),
                    ..Default::default()
                },
                Policy {
                    id: 7,
                    client: Some(1),
                    ..Default::default()
                },
            ],
        );

        assert_eq!(search_policies(&snapshot, "104", 5).len(), 1);
        assert_eq!(search_policies(&snapshot, "samarkand", 5)[0].id, 1042);
        assert_eq!(search_policies(&snapshot, "karim", 5)[0].id, 1042);
        assert_eq!(search_policies(&snapshot, "полное", 5)[0].id, 1042);
        assert_eq!(search_policies(&snapshot, "orient", 5)[0].id, 7);
    }

    #[test]
    fn test_policy_matches_falls_back_to_embedded_client_name() {
        let names: HashMap<RecordId, &str> = HashMap::from([(1, "Orient Trade")]);
        let orphan = Policy {
            id: 9,
            client: Some(99),
            client_name: Some("Archived LLC".into()),
            ..Default::default()
        };

        assert!(policy_matches(&names, &orphan, "archived"));
        assert!(!policy_matches(&names, &orphan, "orient"));
        assert!(policy_matches(&HashMap::new(), &orphan, " "));
    }

    // ========== DebouncePolicy ==========

    #[test]
    fn test_delay_policy() {
        let policy = DebouncePolicy::default();
        assert_eq!(policy.delay_for(""), None);
        assert_eq!(policy.delay_for("   "), None);
        assert_eq!(policy.delay_for("o"), Some(Duration::from_millis(500)));
        assert_eq!(policy.delay_for("or"), Some(Duration::from_millis(300)));
    }

    #[test]
    fn test_delay_policy_min_len() {
        let policy = DebouncePolicy {
            min_len: 3,
            ..Default::default()
        };
        assert_eq!(policy.delay_for("or"), None);
        assert_eq!(policy.delay_for("ori"), Some(Duration::from_millis(300)));
    }

    // ========== DebouncedSearch ==========

    #[tokio::test(start_paused = true)]
    async fn test_debounced_search_publishes_after_delay() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut search =
            DebouncedSearch::new(DebouncePolicy::default(), counting_search(calls.clone()));
        let rx = search.subscribe();

        search.submit("orient");
        assert_eq!(
            *rx.borrow(),
            SearchState::Pending {
                query: "orient".into()
            }
        );

        tokio::time::sleep(Duration::from_millis(299)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        let ready = ready_ids(&rx.borrow()).unwrap();
        assert_eq!(ready, ("orient".to_string(), vec![1, 3]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_char_waits_longer() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut search =
            DebouncedSearch::new(DebouncePolicy::default(), counting_search(calls.clone()));
        let rx = search.subscribe();

        search.submit("s");
        tokio::time::sleep(Duration::from_millis(301)).await;
        assert!(ready_ids(&rx.borrow()).is_none());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(ready_ids(&rx.borrow()).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_query_supersedes_pending() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut search =
            DebouncedSearch::new(DebouncePolicy::default(), counting_search(calls.clone()));
        let rx = search.subscribe();

        search.submit("or");
        tokio::time::sleep(Duration::from_millis(100)).await;
        search.submit("sam");
        tokio::time::sleep(Duration::from_millis(1000)).await;

        let ready = ready_ids(&rx.borrow()).unwrap();
        assert_eq!(ready, ("sam".to_string(), vec![2]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_query_clears_results() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut search =
            DebouncedSearch::new(DebouncePolicy::default(), counting_search(calls.clone()));
        let rx = search.subscribe();

        search.submit("or");
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(ready_ids(&rx.borrow()).is_some());

        search.submit("");
        assert_eq!(*rx.borrow(), SearchState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut search =
            DebouncedSearch::new(DebouncePolicy::default(), counting_search(calls.clone()));
        let rx = search.subscribe();

        search.submit("orient");
        search.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(*rx.borrow(), SearchState::Idle);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
