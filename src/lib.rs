//! Direct Memory Access (DMA) driver for Milandr MDR32 microcontrollers.
//!
//! `mdr-dma` drives the PL230-style micro-DMA controller shared by the
//! MDR32F2xQI (Cortex-M0) and MDR32VF0xI (RISC-V) families. It provides
//!
//! - an unsafe API for defining and scheduling transfers with DMA
//!   `Channel`s.
//! - the control-block encoder and the aligned control table the engine
//!   walks.
//! - scatter-gather sequences: chains of transfers the engine executes
//!   without CPU involvement.
//!
//! This DMA driver may be re-exported from a hardware abstraction layer
//! (HAL). If it is, you should use the safer APIs provided by your HAL.
//!
//! # Getting started
//!
//! Assign a [`Dma`] and a [`ControlTable`] to statics, register the
//! table, then allocate [`Channel`](crate::channel::Channel)s:
//!
//! ```no_run
//! use mdr_dma::{ControlTable, Dma, MDR_DMA};
//!
//! // Safety: address and channel count are valid for these parts.
//! static DMA: Dma<32> = unsafe { Dma::new(MDR_DMA) };
//! static CONTROL_TABLE: ControlTable = ControlTable::new();
//!
//! DMA.set_control_table(&CONTROL_TABLE);
//! DMA.enable();
//!
//! // Safety: we only allocate one DMA channel 7 object.
//! let mut channel = unsafe { DMA.channel(7) };
//! ```
//!
//! Once you have a channel, describe a transfer with a
//! [`Transfer`] (the slice constructors cover the common shapes),
//! configure the channel with [`ChannelConfig`], and enable it. The
//! actual data movement happens in hardware after a request fires —
//! either the peripheral's request line (see [`request`] for the wiring
//! of your family) or a software request.
//!
//! Before any of this takes effect, the clock controller must enable
//! the DMA peripheral clock. That's outside this crate, as is routing
//! the completion interrupt: completion and the sticky bus-error flag
//! are polled here, never delivered.
//!
//! ### License
//!
//! Licensed under either of
//!
//! - [Apache License, Version 2.0](http://www.apache.org/licenses/LICENSE-2.0)
//! - [MIT License](http://opensource.org/licenses/MIT)
//!
//! at your option.
//!
//! Unless you explicitly state otherwise, any contribution intentionally submitted
//! for inclusion in the work by you, as defined in the Apache-2.0 license, shall be
//! dual licensed as above, without any additional terms or conditions.

#![no_std]

#[cfg(test)]
extern crate std;

mod block;
pub mod channel;
mod element;
mod error;
mod ral;
pub mod request;
pub mod sg;
mod table;

pub use block::{
    Arbitration, Control, ControlBlock, CycleMode, DataSize, Increment, Protection, Transfer,
};
pub use channel::{Bank, Channel, ChannelConfig, Priority};
pub use element::Element;
pub use error::Error;
pub use ral::dma::MDR_DMA;
pub use sg::{ScatterGather, ScatterGatherConfig};
pub use table::{ControlTable, CHANNEL_COUNT};

use core::sync::atomic::{AtomicUsize, Ordering};

/// A DMA result
pub type Result<T> = core::result::Result<T, Error>;

/// A DMA driver.
///
/// The driver manages the DMA controller. It's configured with a
/// pointer to the register block and, once at startup, with the
/// [`ControlTable`] the engine walks.
///
/// `Dma` allocates [`Channel`](channel::Channel)s. `Channel` provides
/// the interface for scheduling transfers.
pub struct Dma<const CHANNELS: usize> {
    controller: ral::Static<ral::dma::RegisterBlock>,
    // Native copy of CTRL_BASE_PTR. The register is 32 bits wide; slot
    // arithmetic needs the full pointer width.
    pub(crate) table: AtomicUsize,
}

// Safety: OK to allocate a DMA driver in a static context.
unsafe impl<const CHANNELS: usize> Sync for Dma<CHANNELS> {}

impl<const CHANNELS: usize> Dma<CHANNELS> {
    /// Create the DMA driver.
    ///
    /// Note that this can evaluate at compile time. Consider using this
    /// to expose a `Dma` through your higher-level API that you can use
    /// to allocate DMA channels.
    ///
    /// `CHANNELS` specifies the total number of channels supported by
    /// the DMA controller. It's referenced when allocating channels.
    ///
    /// # Safety
    ///
    /// Caller must make sure that `controller` is a pointer to the
    /// start of the DMA controller register block; [`MDR_DMA`] is the
    /// address on both Milandr families.
    ///
    /// An incorrect `CHANNELS` value prevents proper bounds checking
    /// when allocating channels. This may result in DMA channels that
    /// point to invalid memory.
    pub const unsafe fn new(controller: *const ()) -> Self {
        Self {
            controller: ral::Static(controller.cast()),
            table: AtomicUsize::new(0),
        }
    }

    pub(crate) fn registers(&self) -> ral::Static<ral::dma::RegisterBlock> {
        self.controller
    }

    /// Register the control table the engine walks.
    ///
    /// Call this once, before configuring any channel. The table's
    /// alignment and layout obligations are carried by the
    /// [`ControlTable`] type itself.
    pub fn set_control_table(&self, table: &'static ControlTable) {
        self.table.store(table.base() as usize, Ordering::Release);
        self.controller
            .CTRL_BASE_PTR
            .write(block::addr(table.base()));
    }

    /// The alternate control-block base, as derived by hardware from
    /// `CTRL_BASE_PTR`.
    pub fn alternate_control_base(&self) -> u32 {
        self.controller.ALT_CTRL_BASE_PTR.read()
    }

    /// Master-enable the controller.
    pub fn enable(&self) {
        ral::write_reg!(ral::dma, self.controller, CFG, MASTER_ENABLE: 1);
    }

    /// Master-enable the controller, driving `protection` on
    /// control-block fetches.
    pub fn enable_protected(&self, protection: Protection) {
        ral::write_reg!(
            ral::dma,
            self.controller,
            CFG,
            MASTER_ENABLE: 1,
            CHNL_PROT_CTRL: protection.bits()
        );
    }

    /// Master-disable the controller.
    ///
    /// Takes effect per hardware semantics; an in-flight transfer may
    /// complete first. There is no wait-for-idle here — poll
    /// [`state`](Self::state) if you need confirmation.
    pub fn disable(&self) {
        ral::write_reg!(ral::dma, self.controller, CFG, 0);
    }

    /// Returns `true` if the controller is master-enabled.
    pub fn is_enabled(&self) -> bool {
        ral::read_reg!(ral::dma, self.controller, STATUS, MASTER_ENABLE == 1)
    }

    /// Number of channels this silicon implements.
    pub fn channels(&self) -> usize {
        let minus_1 = ral::read_reg!(ral::dma, self.controller, STATUS, CHNLS_MINUS1);
        minus_1 as usize + 1
    }

    /// The engine's control state machine.
    pub fn state(&self) -> MasterState {
        MasterState::from_bits(ral::read_reg!(ral::dma, self.controller, STATUS, STATE))
    }

    /// Returns `true` if a transfer raised a bus error.
    ///
    /// The flag is sticky; acknowledge it with
    /// [`clear_error`](Self::clear_error). There's no interrupt-driven
    /// path for this in the driver.
    pub fn is_error(&self) -> bool {
        ral::read_reg!(ral::dma, self.controller, ERR_CLR, ERR == 1)
    }

    /// Clear the sticky bus-error flag.
    pub fn clear_error(&self) {
        ral::write_reg!(ral::dma, self.controller, ERR_CLR, ERR: 1);
    }

    /// Return the controller to its reset configuration.
    ///
    /// Masks every request line, disables every channel, clears the
    /// burst / bank / priority selections and the error flag, and
    /// forgets the control table.
    pub fn reset(&self) {
        let regs = self.controller;
        regs.CFG.write(0);
        regs.CHNL_REQ_MASK_SET.write(u32::MAX);
        regs.CHNL_ENABLE_CLR.write(u32::MAX);
        regs.CHNL_USEBURST_CLR.write(u32::MAX);
        regs.CHNL_PRI_ALT_CLR.write(u32::MAX);
        regs.CHNL_PRIORITY_CLR.write(u32::MAX);
        ral::write_reg!(ral::dma, regs, ERR_CLR, ERR: 1);
        regs.CTRL_BASE_PTR.write(0);
        self.table.store(0, Ordering::Release);
    }
}

/// The engine's control state machine, from `STATUS.STATE`.
///
/// Purely informational: the engine moves through these on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum MasterState {
    /// At rest.
    Idle,
    /// Fetching a control block.
    ReadingChannelData,
    /// Fetching a source end pointer.
    ReadingSourceEndPointer,
    /// Fetching a destination end pointer.
    ReadingDestinationEndPointer,
    /// Reading source data.
    ReadingSourceData,
    /// Writing destination data.
    WritingDestinationData,
    /// Waiting for a request to clear.
    WaitingForRequest,
    /// Writing a control block back.
    WritingChannelData,
    /// Stalled on the bus.
    Stalled,
    /// Cycle complete.
    Done,
    /// Transitioning between peripheral scatter-gather tasks.
    ScatterGatherTransition,
    /// A reserved encoding. Not produced by working hardware.
    Undefined,
}

impl MasterState {
    fn from_bits(bits: u32) -> Self {
        match bits {
            0 => MasterState::Idle,
            1 => MasterState::ReadingChannelData,
            2 => MasterState::ReadingSourceEndPointer,
            3 => MasterState::ReadingDestinationEndPointer,
            4 => MasterState::ReadingSourceData,
            5 => MasterState::WritingDestinationData,
            6 => MasterState::WaitingForRequest,
            7 => MasterState::WritingChannelData,
            8 => MasterState::Stalled,
            9 => MasterState::Done,
            10 => MasterState::ScatterGatherTransition,
            _ => MasterState::Undefined,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A simulated register file.
    //!
    //! Hosts stand in for the silicon: the register block is plain
    //! heap memory, and these helpers peek and poke it by byte offset
    //! so tests can observe write-only registers and plant read-only
    //! ones.

    use crate::ral::dma::RegisterBlock;
    use crate::{ControlTable, Dma};
    use std::boxed::Box;

    pub(crate) const STATUS: usize = 0x00;
    pub(crate) const CFG: usize = 0x04;
    pub(crate) const CTRL_BASE_PTR: usize = 0x08;
    pub(crate) const WAITONREQ_STATUS: usize = 0x10;
    pub(crate) const CHNL_SW_REQUEST: usize = 0x14;
    pub(crate) const CHNL_USEBURST_SET: usize = 0x18;
    pub(crate) const CHNL_USEBURST_CLR: usize = 0x1C;
    pub(crate) const CHNL_REQ_MASK_SET: usize = 0x20;
    pub(crate) const CHNL_REQ_MASK_CLR: usize = 0x24;
    pub(crate) const CHNL_ENABLE_SET: usize = 0x28;
    pub(crate) const CHNL_ENABLE_CLR: usize = 0x2C;
    pub(crate) const CHNL_PRI_ALT_SET: usize = 0x30;
    pub(crate) const CHNL_PRI_ALT_CLR: usize = 0x34;
    pub(crate) const CHNL_PRIORITY_SET: usize = 0x38;
    pub(crate) const CHNL_PRIORITY_CLR: usize = 0x3C;
    pub(crate) const ERR_CLR: usize = 0x4C;

    pub(crate) struct Fixture {
        pub(crate) dma: &'static Dma<32>,
        pub(crate) table: &'static ControlTable,
        registers: &'static RegisterBlock,
    }

    impl Fixture {
        /// A driver over zeroed fake registers, control table
        /// registered.
        pub(crate) fn new() -> Self {
            let registers: &'static RegisterBlock =
                Box::leak(Box::new(unsafe { core::mem::zeroed() }));
            let dma: &'static Dma<32> = Box::leak(Box::new(unsafe {
                Dma::new(registers as *const RegisterBlock as *const ())
            }));
            let table: &'static ControlTable = Box::leak(Box::new(ControlTable::new()));
            dma.set_control_table(table);
            Fixture {
                dma,
                table,
                registers,
            }
        }

        /// A driver with no control table registered.
        pub(crate) fn bare() -> Self {
            let registers: &'static RegisterBlock =
                Box::leak(Box::new(unsafe { core::mem::zeroed() }));
            let dma: &'static Dma<32> = Box::leak(Box::new(unsafe {
                Dma::new(registers as *const RegisterBlock as *const ())
            }));
            let table: &'static ControlTable = Box::leak(Box::new(ControlTable::new()));
            Fixture {
                dma,
                table,
                registers,
            }
        }

        pub(crate) fn peek(&self, offset: usize) -> u32 {
            let base = self.registers as *const RegisterBlock as *const u32;
            unsafe { base.add(offset / 4).read_volatile() }
        }

        pub(crate) fn poke(&self, offset: usize, value: u32) {
            let base = self.registers as *const RegisterBlock as *mut u32;
            unsafe { base.add(offset / 4).write_volatile(value) }
        }
    }
}
