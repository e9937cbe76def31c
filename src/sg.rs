//! Scatter-gather sequences.
//!
//! A scatter-gather sequence repurposes the engine to move its own
//! configuration: the channel's primary control block describes a copy
//! of application-owned task records into the channel's *alternate*
//! slot. The engine loads task N, executes the transfer it describes,
//! then returns to the primary block for task N + 1 — no CPU
//! involvement once the channel is enabled and requested.
//!
//! Each task is an ordinary [`ControlBlock`], encoded with the
//! alternate scatter-gather mode (the final task switches to a plain
//! mode so the sequence terminates). Build tasks with [`task`], keep
//! them alive for the whole sequence, and hand them to
//! [`Channel::init_scatter_gather`].

use crate::block::{
    addr, Arbitration, ControlBlock, CycleMode, DataSize, Increment, Protection, Transfer,
};
use crate::channel::{Bank, Channel, Priority};
use crate::Error;

/// Each task record is four words; the engine copies them whole.
const WORDS_PER_TASK: usize = 4;

/// The flavor of a scatter-gather sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScatterGather {
    /// Tasks run back to back off a single request.
    Memory,
    /// Each task waits for the peripheral's request line.
    Peripheral,
}

impl ScatterGather {
    fn primary_mode(self) -> CycleMode {
        match self {
            ScatterGather::Memory => CycleMode::MemoryScatterGatherPrimary,
            ScatterGather::Peripheral => CycleMode::PeripheralScatterGatherPrimary,
        }
    }

    fn task_mode(self, last: bool) -> CycleMode {
        match (self, last) {
            (ScatterGather::Memory, false) => CycleMode::MemoryScatterGatherAlternate,
            (ScatterGather::Memory, true) => CycleMode::AutoRequest,
            (ScatterGather::Peripheral, false) => CycleMode::PeripheralScatterGatherAlternate,
            (ScatterGather::Peripheral, true) => CycleMode::Basic,
        }
    }
}

/// Encode one task of a scatter-gather sequence.
///
/// The transfer's `mode` field is overridden with the mode the
/// sequence position demands: the alternate scatter-gather mode, or a
/// terminating plain mode when `last` is set.
pub fn task(transfer: &Transfer, kind: ScatterGather, last: bool) -> Result<ControlBlock, Error> {
    let mut transfer = *transfer;
    transfer.mode = kind.task_mode(last);
    ControlBlock::new(&transfer)
}

/// Everything `Channel::init_scatter_gather` programs.
#[derive(Debug, Clone, Copy)]
pub struct ScatterGatherConfig<'a> {
    /// The ordered task records, `1..=256` of them.
    ///
    /// The engine reads this array while the sequence runs; it must
    /// stay alive and unmoved until the final task completes.
    pub tasks: &'a [ControlBlock],
    /// Memory or peripheral sequencing.
    pub kind: ScatterGather,
    /// Respond only to burst requests.
    pub use_burst: bool,
    /// Arbitrate at high priority.
    pub high_priority: bool,
}

impl Channel {
    /// Configure this channel to run a scatter-gather sequence.
    ///
    /// Writes a primary control block that copies `tasks` — four words
    /// per record, arbitration after four transfers so records load
    /// whole — into this channel's own alternate slot. Starts on the
    /// primary bank with the request line unmasked; the channel stays
    /// disabled.
    ///
    /// Fails with [`Error::TaskCount`] when the task count is outside
    /// `1..=256`, and with [`Error::ControlTableUnset`] when no control
    /// table is registered.
    pub fn init_scatter_gather(&mut self, config: &ScatterGatherConfig<'_>) -> Result<(), Error> {
        let count = config.tasks.len();
        if !(1..=256).contains(&count) {
            return Err(Error::TaskCount(count));
        }
        let alternate = self.slot_address(Bank::Alternate)?;

        let primary = ControlBlock::new(&Transfer {
            source: addr(config.tasks.as_ptr()),
            source_increment: Increment::Bits32,
            source_size: DataSize::Bits32,
            destination: alternate,
            destination_increment: Increment::Bits32,
            destination_size: DataSize::Bits32,
            mode: config.kind.primary_mode(),
            cycle_size: (WORDS_PER_TASK * count) as u16,
            arbitration: Arbitration::After4,
            source_protection: Protection::default(),
            destination_protection: Protection::default(),
            next_useburst: false,
        })?;

        self.write_block(Bank::Primary, &primary)?;
        self.set_use_burst(config.use_burst);
        self.set_priority(if config.high_priority {
            Priority::High
        } else {
            Priority::Default
        });
        self.set_active_bank(Bank::Primary);
        self.unmask_requests();
        Ok(())
    }
}
