//! Do-not-call list domain model
//!
//! A business-scoped set of phone numbers that must never be dialed.
//! Checked at call creation and re-checked before every dial attempt,
//! since numbers can be added after a call was scheduled.

use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{BusinessId, PhoneNumber};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One blocked number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DncEntry {
    pub phone: PhoneNumber,
    pub reason: String,
    pub added_at: DateTime<Utc>,
}

impl DncEntry {
    pub fn new(phone: PhoneNumber, reason: impl Into<String>) -> Self {
        Self {
            phone,
            reason: reason.into(),
            added_at: Utc::now(),
        }
    }
}

/// In-memory blocked-number set for one business
///
/// Matching is on the normalized phone number, so formatting differences
/// between the list and a recipient cannot leak a call through.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoNotCallList {
    entries: HashMap<String, DncEntry>,
}

impl DoNotCallList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: DncEntry) {
        self.entries.insert(entry.phone.as_str().to_string(), entry);
    }

    pub fn remove(&mut self, phone: &PhoneNumber) -> bool {
        self.entries.remove(phone.as_str()).is_some()
    }

    pub fn contains(&self, phone: &PhoneNumber) -> bool {
        self.entries.contains_key(phone.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &DncEntry> {
        self.entries.values()
    }
}

/// Repository interface for the do-not-call lists
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DoNotCallRepository: Send + Sync {
    /// Is the number blocked for this business?
    async fn check(&self, business_id: &BusinessId, phone: &PhoneNumber) -> Result<bool>;

    /// Block a number
    async fn add(
        &self,
        business_id: &BusinessId,
        phone: &PhoneNumber,
        reason: &str,
    ) -> Result<()>;

    /// Unblock a number; returns whether it was present
    async fn remove(&self, business_id: &BusinessId, phone: &PhoneNumber) -> Result<bool>;

    /// All blocked numbers for a business
    async fn list(&self, business_id: &BusinessId) -> Result<Vec<DncEntry>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_membership_is_normalized() {
        let mut list = DoNotCallList::new();
        list.add(DncEntry::new(
            PhoneNumber::parse("+1 (555) 123-4567").unwrap(),
            "customer request",
        ));

        assert!(list.contains(&PhoneNumber::parse("+15551234567").unwrap()));
        assert!(list.contains(&PhoneNumber::parse("+1 555 123 4567").unwrap()));
        assert!(!list.contains(&PhoneNumber::parse("+15550000000").unwrap()));
    }

    #[test]
    fn test_add_remove() {
        let mut list = DoNotCallList::new();
        let phone = PhoneNumber::parse("5551234567").unwrap();

        list.add(DncEntry::new(phone.clone(), "opt-out"));
        assert_eq!(list.len(), 1);

        assert!(list.remove(&phone));
        assert!(!list.remove(&phone));
        assert!(list.is_empty());
    }

    #[test]
    fn test_duplicate_add_replaces() {
        let mut list = DoNotCallList::new();
        let phone = PhoneNumber::parse("5551234567").unwrap();

        list.add(DncEntry::new(phone.clone(), "first"));
        list.add(DncEntry::new(phone, "second"));

        assert_eq!(list.len(), 1);
        assert_eq!(list.entries().next().unwrap().reason, "second");
    }
}
