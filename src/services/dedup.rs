use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio::sync::Mutex;

const PRUNE_EVERY: u64 = 1024;

/// How long admitted message ids are remembered. `Unbounded` never forgets,
/// so memory grows with the number of distinct ids seen by the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    #[default]
    Unbounded,
    /// Remember only the most recently seen ids. A capacity of 0 is treated
    /// as 1.
    MaxEntries(usize),
    /// Forget an id once its admission is older than the given age.
    MaxAge(Duration),
    Bounded {
        max_entries: usize,
        max_age: Duration,
    },
}

impl EvictionPolicy {
    fn max_entries(&self) -> Option<NonZeroUsize> {
        match self {
            Self::MaxEntries(max) | Self::Bounded { max_entries: max, .. } => {
                Some(NonZeroUsize::new(*max).unwrap_or(NonZeroUsize::MIN))
            }
            _ => None,
        }
    }

    fn max_age(&self) -> Option<Duration> {
        match self {
            Self::MaxAge(age) | Self::Bounded { max_age: age, .. } => Some(*age),
            _ => None,
        }
    }
}

enum SeenSet {
    Unbounded(HashMap<String, Instant>),
    Lru(LruCache<String, Instant>),
}

impl SeenSet {
    fn get(&mut self, id: &str) -> Option<Instant> {
        match self {
            Self::Unbounded(map) => map.get(id).copied(),
            Self::Lru(cache) => cache.get(id).copied(),
        }
    }

    fn insert(&mut self, id: String, at: Instant) {
        match self {
            Self::Unbounded(map) => {
                map.insert(id, at);
            }
            Self::Lru(cache) => {
                cache.put(id, at);
            }
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Unbounded(map) => map.len(),
            Self::Lru(cache) => cache.len(),
        }
    }

    fn prune(&mut self, now: Instant, max_age: Duration) {
        if let Self::Unbounded(map) = self {
            map.retain(|_, at| now.duration_since(*at) < max_age);
        }
    }
}

struct DedupState {
    seen: SeenSet,
    admissions: u64,
}

/// Idempotency filter over message ids, shared by the poll and push paths.
pub struct DedupCache {
    state: Mutex<DedupState>,
    max_age: Option<Duration>,
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DedupCache {
    pub fn new() -> Self {
        Self::with_policy(EvictionPolicy::Unbounded)
    }

    pub fn with_policy(policy: EvictionPolicy) -> Self {
        let seen = match policy.max_entries() {
            Some(capacity) => SeenSet::Lru(LruCache::new(capacity)),
            None => SeenSet::Unbounded(HashMap::new()),
        };
        Self {
            state: Mutex::new(DedupState {
                seen,
                admissions: 0,
            }),
            max_age: policy.max_age(),
        }
    }

    /// Returns `true` the first time an id is offered and `false` afterwards.
    /// Check and insert happen under one lock, so concurrent callers offering
    /// the same id see exactly one `true`.
    pub async fn admit(&self, message_id: &str) -> bool {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        let fresh = match state.seen.get(message_id) {
            Some(admitted_at) => self
                .max_age
                .is_some_and(|max_age| now.duration_since(admitted_at) >= max_age),
            None => true,
        };
        if !fresh {
            return false;
        }
        state.seen.insert(message_id.to_string(), now);
        state.admissions += 1;
        if let Some(max_age) = self.max_age {
            if state.admissions % PRUNE_EVERY == 0 {
                state.seen.prune(now, max_age);
            }
        }
        true
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.seen.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
