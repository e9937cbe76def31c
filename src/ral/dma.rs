//! DMA register block and fields
//!
//! The Milandr controller is an ARM PL230 micro-DMA. Registers fall in
//! two groups: the configuration / base-pointer registers up front, and
//! the per-channel bitmask registers. Each bitmask register dedicates
//! bit `n` to channel `n`; the SET/CLR pairs have write-one semantics,
//! so a single-bit store touches exactly one channel.

#![allow(non_upper_case_globals)] // RAL field-module convention

use super::{RORegister, RWRegister, WORegister};

/// DMA controller base address, common to both Milandr families.
pub const MDR_DMA: *const () = 0x4002_8000 as _;

/// DMA registers.
#[repr(C)]
pub struct RegisterBlock {
    /// Controller status: master enable, state machine, channel count.
    pub STATUS: RORegister<u32>,
    /// Controller configuration: master enable, bus protection.
    pub CFG: WORegister<u32>,
    /// Base address of the primary control-block table.
    pub CTRL_BASE_PTR: RWRegister<u32>,
    /// Base address of the alternate half, derived by hardware.
    pub ALT_CTRL_BASE_PTR: RORegister<u32>,
    /// Channels waiting on a request signal.
    pub WAITONREQ_STATUS: RORegister<u32>,
    /// Software transfer request, one bit per channel.
    pub CHNL_SW_REQUEST: WORegister<u32>,
    /// Burst-only mode set / status.
    pub CHNL_USEBURST_SET: RWRegister<u32>,
    /// Burst-only mode clear.
    pub CHNL_USEBURST_CLR: WORegister<u32>,
    /// Request mask set / status.
    pub CHNL_REQ_MASK_SET: RWRegister<u32>,
    /// Request mask clear.
    pub CHNL_REQ_MASK_CLR: WORegister<u32>,
    /// Channel enable set / status.
    pub CHNL_ENABLE_SET: RWRegister<u32>,
    /// Channel enable clear.
    pub CHNL_ENABLE_CLR: WORegister<u32>,
    /// Alternate-bank select set / status.
    pub CHNL_PRI_ALT_SET: RWRegister<u32>,
    /// Alternate-bank select clear.
    pub CHNL_PRI_ALT_CLR: WORegister<u32>,
    /// High-priority set / status.
    pub CHNL_PRIORITY_SET: RWRegister<u32>,
    /// High-priority clear.
    pub CHNL_PRIORITY_CLR: WORegister<u32>,
    _reserved: [u32; 3],
    /// Sticky bus-error flag, write one to clear.
    pub ERR_CLR: RWRegister<u32>,
}

// Did I calculate my reservations correctly?
const _: () = assert!(core::mem::offset_of!(RegisterBlock, CHNL_SW_REQUEST) == 0x14);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, CHNL_ENABLE_SET) == 0x28);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, ERR_CLR) == 0x4C);

pub mod STATUS {
    /// Master enable state.
    pub mod MASTER_ENABLE {
        pub const offset: u32 = 0;
        pub const mask: u32 = 0b1 << offset;
        pub mod R {}
        pub mod W {}
        pub mod RW {}
    }
    /// Control state machine of the engine.
    pub mod STATE {
        pub const offset: u32 = 4;
        pub const mask: u32 = 0b1111 << offset;
        pub mod R {}
        pub mod W {}
        pub mod RW {}
    }
    /// Number of supported channels, minus one.
    pub mod CHNLS_MINUS1 {
        pub const offset: u32 = 16;
        pub const mask: u32 = 0b1_1111 << offset;
        pub mod R {}
        pub mod W {}
        pub mod RW {}
    }
}

pub mod CFG {
    /// Master enable.
    pub mod MASTER_ENABLE {
        pub const offset: u32 = 0;
        pub const mask: u32 = 0b1 << offset;
        pub mod R {}
        pub mod W {}
        pub mod RW {}
    }
    /// HPROT control for control-block fetches.
    pub mod CHNL_PROT_CTRL {
        pub const offset: u32 = 5;
        pub const mask: u32 = 0b111 << offset;
        pub mod R {}
        pub mod W {}
        pub mod RW {}
    }
}

pub mod ERR_CLR {
    /// Sticky bus-error flag.
    pub mod ERR {
        pub const offset: u32 = 0;
        pub const mask: u32 = 0b1 << offset;
        pub mod R {}
        pub mod W {}
        pub mod RW {}
    }
}
