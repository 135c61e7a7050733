//! Tenant-grouped buffering
//!
//! Input rows are expected sorted by tenant, so at most one group is open at a
//! time. When a record for a different tenant arrives, the open group is
//! handed back for commit before the new one starts. Memory stays bounded by
//! the largest single group regardless of input size.
//!
//! Unsorted input is not detected: a tenant that reappears later simply opens
//! a new group and is committed again.

use crate::record::{Group, Record, TenantKey};

/// Buffers records of the currently open tenant group
#[derive(Debug)]
pub struct TenantBuffer {
    key: TenantKey,
    open: Option<Group>,
}

impl TenantBuffer {
    pub fn new(key: TenantKey) -> Self {
        Self { key, open: None }
    }

    /// Add a record, returning the previous group if this record closed it
    pub fn absorb(&mut self, record: Record) -> Option<Group> {
        let tenant_id = self.key.tenant_id(&record);

        let evicted = match self.open.take() {
            Some(group) if group.tenant_id == tenant_id => {
                self.open = Some(group);
                None
            },
            previous => previous,
        };

        self.open
            .get_or_insert_with(|| Group::new(tenant_id))
            .push(record);

        evicted
    }

    /// Take the remaining group, leaving the buffer empty
    pub fn drain(&mut self) -> Option<Group> {
        self.open.take()
    }

    /// Records held in the open group
    pub fn pending(&self) -> usize {
        self.open.as_ref().map_or(0, Group::len)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::record::TenantId;

    fn record(tenant: &str, id: &str, n: &str) -> Record {
        [("Tenant", tenant), ("ID", id), ("N", n)].into_iter().collect()
    }

    #[test]
    fn test_same_tenant_accumulates() {
        let mut buffer = TenantBuffer::new(TenantKey::default());
        assert!(buffer.absorb(record("t", "A", "1")).is_none());
        assert!(buffer.absorb(record("t", "A", "2")).is_none());
        assert_eq!(buffer.pending(), 2);

        let group = buffer.drain().unwrap();
        assert_eq!(group.tenant_id, TenantId::new("t:A"));
        assert_eq!(group.len(), 2);
        assert!(buffer.drain().is_none());
        assert_eq!(buffer.pending(), 0);
    }

    #[test]
    fn test_new_tenant_evicts_previous_group() {
        let mut buffer = TenantBuffer::new(TenantKey::default());
        buffer.absorb(record("t", "A", "1"));
        buffer.absorb(record("t", "A", "2"));

        let evicted = buffer.absorb(record("t", "B", "3")).unwrap();
        assert_eq!(evicted.tenant_id.as_str(), "t:A");
        assert_eq!(
            evicted.records.iter().map(|r| r.get("N").unwrap()).collect::<Vec<_>>(),
            vec!["1", "2"]
        );
        assert_eq!(buffer.pending(), 1);

        let last = buffer.drain().unwrap();
        assert_eq!(last.tenant_id.as_str(), "t:B");
    }

    #[test]
    fn test_unsorted_input_fragments_groups() {
        let mut buffer = TenantBuffer::new(TenantKey::default());
        buffer.absorb(record("t", "A", "1"));
        let b = buffer.absorb(record("t", "B", "2"));
        let a = buffer.absorb(record("t", "A", "3"));

        assert_eq!(b.unwrap().tenant_id.as_str(), "t:A");
        assert_eq!(a.unwrap().tenant_id.as_str(), "t:B");
        assert_eq!(buffer.drain().unwrap().len(), 1);
    }

    #[test]
    fn test_drain_on_empty_buffer() {
        let mut buffer = TenantBuffer::new(TenantKey::default());
        assert!(buffer.drain().is_none());
    }
}
