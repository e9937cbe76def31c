//! The shared control table.
//!
//! The engine learns one base address (`CTRL_BASE_PTR`) and derives
//! every channel's control-block address from it: primary block `n` at
//! `base + 16 * n`, and the whole alternate half at `base + 512`. That
//! makes the table's layout and alignment load-bearing, so both are
//! fixed by the type: 32 primary blocks, 32 alternate blocks, and a
//! base alignment equal to the table's total size.

use core::cell::UnsafeCell;

use crate::block::ControlBlock;

/// Hardware channels on both Milandr families.
pub const CHANNEL_COUNT: usize = 32;

/// The control-block table the engine walks.
///
/// Allocate one in a `static` and register it once with
/// [`Dma::set_control_table`](crate::Dma::set_control_table):
///
/// ```
/// use mdr_dma::ControlTable;
///
/// static CONTROL_TABLE: ControlTable = ControlTable::new();
/// ```
///
/// The table is interior-mutable because the engine writes into it:
/// live cycle counts drain in place, and scatter-gather sequences load
/// task records into alternate slots. Software never touches the slots
/// directly; channel methods do, through volatile accesses.
#[repr(C, align(1024))]
pub struct ControlTable {
    blocks: UnsafeCell<[ControlBlock; 2 * CHANNEL_COUNT]>,
}

// Safety: intended for static allocation. Slot access goes through
// volatile pointer operations on Channel, which is move-only.
unsafe impl Sync for ControlTable {}

const _: () = assert!(core::mem::size_of::<ControlTable>() == 1024);
const _: () = assert!(core::mem::align_of::<ControlTable>() == 1024);

impl ControlTable {
    /// Create a table of stopped control blocks.
    pub const fn new() -> Self {
        ControlTable {
            blocks: UnsafeCell::new([ControlBlock::stopped(); 2 * CHANNEL_COUNT]),
        }
    }

    pub(crate) fn base(&self) -> *mut ControlBlock {
        self.blocks.get().cast()
    }
}

impl Default for ControlTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alternate_half_starts_at_0x200() {
        let table = ControlTable::new();
        let base = table.base() as usize;
        let alternate = unsafe { table.base().add(CHANNEL_COUNT) } as usize;
        assert_eq!(alternate - base, 0x200);
    }

    #[test]
    fn base_alignment_matches_table_size() {
        let table = std::boxed::Box::new(ControlTable::new());
        assert_eq!(table.base() as usize % 1024, 0);
    }
}
