//! The ordered, deduplicated set of blocked domains.

use serde::Serialize;

use crate::domain::Domain;

/// Outcome of [`BlockList::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

/// Outcome of [`BlockList::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
}

/// Blocked domains in insertion order. A domain never appears twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BlockList {
    domains: Vec<Domain>,
}

impl BlockList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `domain` unless it is already listed.
    pub fn add(&mut self, domain: Domain) -> AddOutcome {
        if self.contains(&domain) {
            return AddOutcome::AlreadyPresent;
        }
        self.domains.push(domain);
        AddOutcome::Added
    }

    pub fn remove(&mut self, domain: &Domain) -> RemoveOutcome {
        match self.domains.iter().position(|d| d == domain) {
            Some(index) => {
                self.domains.remove(index);
                RemoveOutcome::Removed
            }
            None => RemoveOutcome::NotFound,
        }
    }

    /// Remove every domain, returning how many were removed.
    pub fn clear(&mut self) -> usize {
        let count = self.domains.len();
        self.domains.clear();
        count
    }

    /// Owned, ordered copy for the editor and the scheduler.
    pub fn snapshot(&self) -> Vec<Domain> {
        self.domains.clone()
    }

    pub fn contains(&self, domain: &Domain) -> bool {
        self.domains.contains(domain)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Domain> {
        self.domains.iter()
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

impl FromIterator<Domain> for BlockList {
    fn from_iter<I: IntoIterator<Item = Domain>>(iter: I) -> Self {
        let mut list = Self::new();
        for domain in iter {
            list.add(domain);
        }
        list
    }
}
