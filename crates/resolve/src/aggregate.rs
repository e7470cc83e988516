//! Deduplication of resolved results by work identity.

use crosstune_music::{ResolutionResult, WorkIdentity};
use std::collections::HashMap;

/// Outcome of offering a result to the [`Aggregator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accepted {
    /// First time this work has been seen.
    New,
    /// Same work as an earlier result; its links were merged into that one.
    Duplicate(WorkIdentity),
}

/// Folds resolved results into one result per distinct work.
///
/// Two results are the same work when their [`WorkIdentity`] matches: the
/// primary identifier if there is one, otherwise the case-insensitive,
/// whitespace-collapsed artist and title. There is no fuzzy matching.
#[derive(Debug, Default)]
pub struct Aggregator {
    results: Vec<ResolutionResult>,
    seen: HashMap<WorkIdentity, usize>,
}
impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, result: ResolutionResult) -> Accepted {
        let Some(identity) = result.identity() else {
            // Only an empty result has no identity. Nothing to merge it with.
            self.results.push(result);
            return Accepted::New;
        };
        match self.seen.get(&identity) {
            Some(&index) => {
                self.results[index].extend_links(result.links().iter().cloned());
                Accepted::Duplicate(identity)
            },
            None => {
                self.seen.insert(identity, self.results.len());
                self.results.push(result);
                Accepted::New
            },
        }
    }

    /// Add an input link to an already accepted work. Returns `false` if the
    /// work hasn't been seen.
    pub fn merge_link(&mut self, identity: &WorkIdentity, link: impl Into<String>) -> bool {
        match self.seen.get(identity) {
            Some(&index) => {
                self.results[index].add_link(link);
                true
            },
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Every distinct work, in the order it was first accepted.
    pub fn into_results(self) -> Vec<ResolutionResult> {
        self.results
    }
}
