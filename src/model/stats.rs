//! Interned stat-key dictionary.
//!
//! A two-generation cache: lookups first check the current
//! generation, then fall back to the previous one before minting a
//! new id, so the cache may hold stale entries but never fabricates
//! one — ids are always strictly monotonic.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct StatTokens {
    next_id: u64,
    current: HashMap<String, u64>,
    previous: HashMap<String, u64>,
}

impl StatTokens {
    pub fn new() -> Self {
        StatTokens::default()
    }

    /// Returns the id for `token`, minting a new one if it has never
    /// been seen in either generation.
    pub fn intern(&mut self, token: &str) -> u64 {
        if let Some(&id) = self.current.get(token) {
            return id;
        }
        if let Some(&id) = self.previous.get(token) {
            self.current.insert(token.to_string(), id);
            return id;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.current.insert(token.to_string(), id);
        id
    }

    /// Ages the current generation into the previous one, starting a
    /// fresh current generation. Callers run this on a schedule to
    /// bound cache size without ever reassigning an id.
    pub fn rotate(&mut self) {
        self.previous = std::mem::take(&mut self.current);
    }
}
