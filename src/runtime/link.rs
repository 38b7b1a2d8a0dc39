//! Per-call-site link caches
//!
//! Each `call_indirect` / `return_call_indirect` instruction owns one [`LinkSlot`], stored with
//! the compiled function code. The slot remembers the last `(table, slot, target)` it resolved
//! and the callee's registered type. A repeat dispatch that resolves to the same target reuses
//! the entry; a different target overwrites it in place. Either way the slot never grows.
//!
//! The cache saves the function lookup, not the signature check: the caller compares
//! signatures on every dispatch.

use super::{FuncAddr, RuntimeError, TableAddr};
use crate::module::TypeIdx;
use std::cell::Cell;
use tracing::trace;

/// A resolved indirect call target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkEntry {
    pub table: TableAddr,
    pub slot: u32,
    pub target: FuncAddr,
    /// Registered type of the target
    pub type_idx: TypeIdx,
}

/// Link cache for a single call site
#[derive(Debug, Default)]
pub struct LinkSlot {
    entry: Cell<Option<LinkEntry>>,
    hits: Cell<u64>,
    relinks: Cell<u64>,
}

impl LinkSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a dispatch through this site.
    ///
    /// `target_type` is only consulted when the cached entry does not match.
    pub fn link(
        &self,
        table: TableAddr,
        slot: u32,
        target: FuncAddr,
        target_type: impl FnOnce(FuncAddr) -> Result<TypeIdx, RuntimeError>,
    ) -> Result<LinkEntry, RuntimeError> {
        if let Some(entry) = self.entry.get() {
            if entry.table == table && entry.slot == slot && entry.target == target {
                self.hits.set(self.hits.get() + 1);
                return Ok(entry);
            }
        }

        let entry = LinkEntry {
            table,
            slot,
            target,
            type_idx: target_type(target)?,
        };
        if let Some(previous) = self.entry.replace(Some(entry)) {
            self.relinks.set(self.relinks.get() + 1);
            trace!(
                table = table.0,
                slot,
                from = previous.target.0,
                to = target.0,
                "relinking call site"
            );
        }
        Ok(entry)
    }

    /// The current entry, if the site has been dispatched through
    pub fn entry(&self) -> Option<LinkEntry> {
        self.entry.get()
    }

    /// Dispatches served from the existing entry
    pub fn hits(&self) -> u64 {
        self.hits.get()
    }

    /// Times the entry was overwritten by a different resolution
    pub fn relinks(&self) -> u64 {
        self.relinks.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_dispatch_links() {
        let site = LinkSlot::new();
        assert!(site.entry().is_none());

        let entry = site.link(TableAddr(0), 3, FuncAddr(5), |_| Ok(2)).unwrap();
        assert_eq!(
            entry,
            LinkEntry {
                table: TableAddr(0),
                slot: 3,
                target: FuncAddr(5),
                type_idx: 2
            }
        );
        assert_eq!((site.hits(), site.relinks()), (0, 0));
    }

    #[test]
    fn test_repeat_dispatch_is_a_hit() {
        let site = LinkSlot::new();
        site.link(TableAddr(0), 1, FuncAddr(4), |_| Ok(0)).unwrap();
        for _ in 0..1000 {
            let entry = site
                .link(TableAddr(0), 1, FuncAddr(4), |_| panic!("type lookup on a hit"))
                .unwrap();
            assert_eq!(entry.target, FuncAddr(4));
        }
        assert_eq!(site.hits(), 1000);
        assert_eq!(site.relinks(), 0);
    }

    #[test]
    fn test_different_target_relinks_in_place() {
        let site = LinkSlot::new();
        site.link(TableAddr(0), 0, FuncAddr(1), |_| Ok(0)).unwrap();
        site.link(TableAddr(0), 1, FuncAddr(2), |_| Ok(1)).unwrap();
        site.link(TableAddr(0), 0, FuncAddr(1), |_| Ok(0)).unwrap();

        assert_eq!(site.relinks(), 2);
        assert_eq!(site.entry().map(|e| e.target), Some(FuncAddr(1)));
    }

    #[test]
    fn test_failed_resolution_keeps_entry() {
        let site = LinkSlot::new();
        site.link(TableAddr(0), 0, FuncAddr(1), |_| Ok(0)).unwrap();
        let result = site.link(TableAddr(0), 0, FuncAddr(9), |addr| {
            Err(RuntimeError::FunctionIndexOutOfBounds(addr.0 as u32))
        });
        assert!(result.is_err());
        assert_eq!(site.entry().map(|e| e.target), Some(FuncAddr(1)));
    }
}
