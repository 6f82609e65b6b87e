//! Sender → pseudonym assignments.
//!
//! Every admitted sender gets one word from the pool for the lifetime of the
//! process. No two senders hold the same word at the same time.

use std::{
    collections::{HashMap, HashSet},
    fs,
    path::Path,
    sync::Mutex,
};

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::Deserialize;

use crate::{domain::UserId, errors::Error, Result};

pub const DEFAULT_MAX_ATTEMPTS: usize = 1000;

/// Candidate pseudonym words, immutable after load.
#[derive(Clone, Debug)]
pub struct WordPool {
    words: Vec<String>,
}

#[derive(Deserialize)]
struct WordPoolFile {
    words: Vec<String>,
}

impl WordPool {
    /// Trims words, drops empties and duplicates (first occurrence wins).
    pub fn new(words: impl IntoIterator<Item = impl Into<String>>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for w in words {
            let w = w.into().trim().to_string();
            if w.is_empty() || !seen.insert(w.clone()) {
                continue;
            }
            out.push(w);
        }

        if out.is_empty() {
            return Err(Error::Config("word pool is empty".to_string()));
        }
        Ok(Self { words: out })
    }

    /// Load `{"words": [...]}` from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read word pool {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
            .map_err(|e| Error::Config(format!("invalid word pool {}: {e}", path.display())))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: WordPoolFile = serde_json::from_str(raw)?;
        Self::new(file.words)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }
}

struct Assignments {
    by_user: HashMap<UserId, String>,
    in_use: HashSet<String>,
    rng: StdRng,
}

/// Concurrency-safe pseudonym store.
///
/// A single mutex covers lookup, word selection and insert, so two racing
/// first messages from the same sender resolve to one word, and the in-use
/// set can never hand the same word to two senders. The lock is never held
/// across an `.await`.
pub struct PseudonymRegistry {
    pool: WordPool,
    max_attempts: usize,
    inner: Mutex<Assignments>,
}

impl PseudonymRegistry {
    pub fn new(pool: WordPool, max_attempts: usize) -> Self {
        Self::with_rng(pool, max_attempts, StdRng::from_entropy())
    }

    /// Deterministic word selection (tests, reproducible runs).
    pub fn with_seed(pool: WordPool, max_attempts: usize, seed: u64) -> Self {
        Self::with_rng(pool, max_attempts, StdRng::seed_from_u64(seed))
    }

    fn with_rng(pool: WordPool, max_attempts: usize, rng: StdRng) -> Self {
        Self {
            pool,
            max_attempts: max_attempts.max(1),
            inner: Mutex::new(Assignments {
                by_user: HashMap::new(),
                in_use: HashSet::new(),
                rng,
            }),
        }
    }

    /// Return the sender's pseudonym, assigning a fresh one on first use.
    pub fn resolve(&self, user_id: UserId) -> Result<String> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let state = &mut *guard;

        if let Some(word) = state.by_user.get(&user_id) {
            return Ok(word.clone());
        }

        let word = self.pick_unused(state)?;
        state.in_use.insert(word.clone());
        state.by_user.insert(user_id, word.clone());
        tracing::debug!(
            user_id = user_id.0,
            assigned = state.by_user.len(),
            pool = self.pool.len(),
            "assigned pseudonym"
        );
        Ok(word)
    }

    fn pick_unused(&self, state: &mut Assignments) -> Result<String> {
        let exhausted = || Error::PoolExhausted {
            pool_size: self.pool.len(),
        };
        if state.in_use.len() >= self.pool.len() {
            return Err(exhausted());
        }

        for _ in 0..self.max_attempts {
            let Some(word) = self.pool.words.choose(&mut state.rng) else {
                return Err(exhausted());
            };
            if !state.in_use.contains(word) {
                return Ok(word.clone());
            }
        }

        // Sampling cap hit on a crowded pool: pick uniformly among what is left.
        let free: Vec<&String> = self
            .pool
            .words
            .iter()
            .filter(|w| !state.in_use.contains(*w))
            .collect();
        tracing::debug!(
            attempts = self.max_attempts,
            free = free.len(),
            "pseudonym sampling cap reached"
        );
        free.choose(&mut state.rng)
            .map(|w| (*w).clone())
            .ok_or_else(exhausted)
    }

    pub fn lookup(&self, user_id: UserId) -> Option<String> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.by_user.get(&user_id).cloned()
    }

    pub fn assigned_count(&self) -> usize {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.by_user.len()
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }
}
