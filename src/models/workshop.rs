use serde::{Deserialize, Serialize};
use std::fmt;

/// Subscription state of one workshop item, as derived from the Steam workshop log.
///
/// Records are plain values. The parser produces a fresh set on every pass and the
/// [`ItemRegistry`](crate::state::ItemRegistry) copies them into its own slots, so nobody
/// relies on shared mutation to see updates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkshopRecord {
    /// Numeric workshop id, kept as text exactly as it appears in the log
    pub id: String,

    /// `yyyy-MM-dd HH:mm:ss` of the last state-changing line for this id
    pub timestamp: String,

    /// `false` once the item has been unsubscribed (it stays listed)
    pub subscribed: bool,
}

impl WorkshopRecord {
    pub fn new(id: impl Into<String>, timestamp: impl Into<String>, subscribed: bool) -> Self {
        Self {
            id: id.into(),
            timestamp: timestamp.into(),
            subscribed,
        }
    }
}

/// Copy progress of a tracked item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CopyStatus {
    #[default]
    NotCopied,
    Copying,
    Success,
    Failed,
}

impl CopyStatus {
    pub fn label(&self) -> &'static str {
        match self {
            CopyStatus::NotCopied => "not copied",
            CopyStatus::Copying => "copying",
            CopyStatus::Success => "success",
            CopyStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for CopyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A workshop record plus the copy bookkeeping the registry keeps for it.
///
/// Updates replace the whole value inside the registry, so a reader always observes a
/// consistent record/status pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedItem {
    pub record: WorkshopRecord,
    pub copy_status: CopyStatus,

    /// Failure reason, only present while `copy_status` is [`CopyStatus::Failed`]
    pub copy_message: Option<String>,
}

impl TrackedItem {
    pub fn new(record: WorkshopRecord) -> Self {
        Self {
            record,
            copy_status: CopyStatus::NotCopied,
            copy_message: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// Copy of this item carrying a different record, status untouched
    pub fn with_record(&self, record: WorkshopRecord) -> Self {
        Self {
            record,
            copy_status: self.copy_status,
            copy_message: self.copy_message.clone(),
        }
    }

    /// Copy of this item carrying a different status.
    ///
    /// The message is dropped for every status except [`CopyStatus::Failed`].
    pub fn with_status(&self, status: CopyStatus, message: Option<String>) -> Self {
        let copy_message = match status {
            CopyStatus::Failed => message,
            _ => None,
        };

        Self {
            record: self.record.clone(),
            copy_status: status,
            copy_message,
        }
    }

    pub fn is_copied(&self) -> bool {
        self.copy_status == CopyStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_item_is_not_copied() {
        let item = TrackedItem::new(WorkshopRecord::new("123", "2024-01-01 10:00:00", true));
        assert_eq!(item.copy_status, CopyStatus::NotCopied);
        assert!(item.copy_message.is_none());
        assert_eq!(item.id(), "123");
    }

    #[test]
    fn test_with_record_keeps_status() {
        let item = TrackedItem::new(WorkshopRecord::new("1", "2024-01-01 10:00:00", true))
            .with_status(CopyStatus::Success, None);

        let updated = item.with_record(WorkshopRecord::new("1", "2024-01-02 10:00:00", false));

        assert_eq!(updated.copy_status, CopyStatus::Success);
        assert_eq!(updated.record.timestamp, "2024-01-02 10:00:00");
        assert!(!updated.record.subscribed);
    }

    #[test]
    fn test_message_only_kept_for_failures() {
        let item = TrackedItem::new(WorkshopRecord::new("1", "2024-01-01 10:00:00", true));

        let failed = item.with_status(CopyStatus::Failed, Some("disk full".to_string()));
        assert_eq!(failed.copy_message.as_deref(), Some("disk full"));

        let copying = failed.with_status(CopyStatus::Copying, Some("ignored".to_string()));
        assert!(copying.copy_message.is_none());
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(CopyStatus::NotCopied.to_string(), "not copied");
        assert_eq!(CopyStatus::Failed.to_string(), "failed");
        assert_eq!(CopyStatus::default(), CopyStatus::NotCopied);
    }
}
