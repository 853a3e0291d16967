//! Compiled search pattern with per-method memoisation.

use crate::parser::methods::{FrameKey, MethodId, MethodTable};
use crate::utils::error::SearchError;
use log::debug;
use regex::Regex;
use std::collections::HashMap;

/// Regex over frame titles, caching the verdict for every method id
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    pattern: Regex,
    cache: HashMap<MethodId, bool>,
}

impl MethodMatcher {
    pub fn new(pattern: &str) -> Result<Self, SearchError> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            cache: HashMap::new(),
        })
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }

    /// Whether the title of `id` matches; unknown methods never match
    pub fn matches(&mut self, id: MethodId, methods: &MethodTable) -> bool {
        if let Some(&hit) = self.cache.get(&id) {
            return hit;
        }
        let hit = match methods.info(id) {
            Ok(info) => self.pattern.is_match(&info.title()),
            Err(e) => {
                debug!("Search skips method {}: {}", id, e);
                false
            }
        };
        self.cache.insert(id, hit);
        hit
    }

    /// The synthetic root is never a search hit
    pub fn matches_key(&mut self, key: FrameKey, methods: &MethodTable) -> bool {
        match key {
            FrameKey::Root => false,
            FrameKey::Method(id) => self.matches(id, methods),
        }
    }

    /// Number of memoised verdicts
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
