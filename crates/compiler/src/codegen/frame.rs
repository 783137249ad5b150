//! Per-function frame layout
//!
//! Offsets are assigned once when a function's emission starts and
//! discarded when it ends; nothing leaks across function boundaries.
//! Every slot gets a positive offset from `rbp`, computed as the running
//! sum of slot sizes, so the first slot lives at `[rbp - 8]`.

use crate::ast::LocalSlot;
use indexmap::IndexMap;

#[derive(Debug, Clone, Default)]
pub struct FrameLayout {
    offsets: IndexMap<String, u64>,
    /// Total frame size reserved with `sub rsp`
    pub size: u64,
}

impl FrameLayout {
    /// Assign offsets to the slots in declaration order.
    pub fn build(locals: &[LocalSlot]) -> FrameLayout {
        let mut offsets = IndexMap::new();
        let mut running = 0u64;
        for slot in locals {
            running += slot.size;
            offsets.insert(slot.name.clone(), running);
        }
        FrameLayout {
            offsets,
            size: running,
        }
    }

    pub fn offset_of(&self, name: &str) -> Option<u64> {
        self.offsets.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.offsets.contains_key(name)
    }
}
