//! Control blocks: the 16-byte records the DMA engine fetches.
//!
//! A [`ControlBlock`] describes one transfer cycle. The engine reads it
//! from the control table, so the layout here is dictated by silicon:
//! source end address, destination end address, a packed control word,
//! and a reserved word. The end-address convention is unusual: the
//! engine counts *down* from the end address, so software stores
//! `base + (cycle_size - 1) * stride`, or `base` itself when the
//! address doesn't increment.
//!
//! The control word is packed with explicit shifts and masks. Don't
//! reach for bitfields; their layout isn't guaranteed.

use crate::element::Element;
use crate::Error;

/// Element width moved per transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSize {
    /// Byte elements.
    Bits8 = 0b00,
    /// Halfword elements.
    Bits16 = 0b01,
    /// Word elements.
    Bits32 = 0b10,
}

impl DataSize {
    fn from_bits(bits: u32) -> Self {
        match bits {
            0b00 => DataSize::Bits8,
            0b01 => DataSize::Bits16,
            _ => DataSize::Bits32,
        }
    }
}

/// Address increment applied after each element.
///
/// `None` re-reads or re-writes the same location every transfer; use
/// it for peripheral FIFO registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Increment {
    /// Advance by a byte.
    Bits8 = 0b00,
    /// Advance by a halfword.
    Bits16 = 0b01,
    /// Advance by a word.
    Bits32 = 0b10,
    /// Don't advance.
    None = 0b11,
}

impl Increment {
    fn from_bits(bits: u32) -> Self {
        match bits {
            0b00 => Increment::Bits8,
            0b01 => Increment::Bits16,
            0b10 => Increment::Bits32,
            _ => Increment::None,
        }
    }

    /// log2 of the stride in bytes, or `None` when the address is
    /// fixed.
    fn stride_shift(self) -> Option<u32> {
        match self {
            Increment::Bits8 => Some(0),
            Increment::Bits16 => Some(1),
            Increment::Bits32 => Some(2),
            Increment::None => None,
        }
    }
}

/// The operating mode the engine applies to a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleMode {
    /// Channel does nothing. The reset state of a control block.
    Stop = 0b000,
    /// One cycle, one request re-arbitrated per arbitration period.
    Basic = 0b001,
    /// Like `Basic`, but a single request carries the whole cycle.
    /// Use for memory-to-memory copies with a software request.
    AutoRequest = 0b010,
    /// Alternate between the primary and alternate banks, letting
    /// software refill the idle bank.
    PingPong = 0b011,
    /// Primary block of a memory scatter-gather sequence: copies task
    /// records into this channel's alternate block.
    MemoryScatterGatherPrimary = 0b100,
    /// Alternate block of a memory scatter-gather sequence; what a
    /// task becomes once loaded.
    MemoryScatterGatherAlternate = 0b101,
    /// Primary block of a peripheral scatter-gather sequence.
    PeripheralScatterGatherPrimary = 0b110,
    /// Alternate block of a peripheral scatter-gather sequence.
    PeripheralScatterGatherAlternate = 0b111,
}

impl CycleMode {
    fn from_bits(bits: u32) -> Self {
        match bits & 0b111 {
            0b000 => CycleMode::Stop,
            0b001 => CycleMode::Basic,
            0b010 => CycleMode::AutoRequest,
            0b011 => CycleMode::PingPong,
            0b100 => CycleMode::MemoryScatterGatherPrimary,
            0b101 => CycleMode::MemoryScatterGatherAlternate,
            0b110 => CycleMode::PeripheralScatterGatherPrimary,
            _ => CycleMode::PeripheralScatterGatherAlternate,
        }
    }

    /// Scatter-gather primary modes address the channel's own
    /// alternate slot, not a data buffer.
    fn is_scatter_gather_primary(self) -> bool {
        matches!(
            self,
            CycleMode::MemoryScatterGatherPrimary | CycleMode::PeripheralScatterGatherPrimary
        )
    }
}

/// How many transfers a channel performs before the engine
/// re-arbitrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arbitration {
    /// Re-arbitrate after each transfer.
    After1 = 0b0000,
    After2 = 0b0001,
    After4 = 0b0010,
    After8 = 0b0011,
    After16 = 0b0100,
    After32 = 0b0101,
    After64 = 0b0110,
    After128 = 0b0111,
    After256 = 0b1000,
    After512 = 0b1001,
    /// Never re-arbitrate within a cycle.
    After1024 = 0b1010,
}

/// AHB HPROT bits driven during transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Protection {
    /// Privileged access.
    pub privileged: bool,
    /// Bufferable access.
    pub bufferable: bool,
    /// Cacheable access.
    pub cacheable: bool,
}

impl Protection {
    pub(crate) const fn bits(self) -> u32 {
        (self.privileged as u32) | (self.bufferable as u32) << 1 | (self.cacheable as u32) << 2
    }

    fn from_bits(bits: u32) -> Self {
        Protection {
            privileged: bits & 0b001 != 0,
            bufferable: bits & 0b010 != 0,
            cacheable: bits & 0b100 != 0,
        }
    }
}

// Control word layout. n_minus_1 is 10 bits; everything else is
// exactly as wide as its mask.
const CYCLE_CTRL_MASK: u32 = 0b111;
const NEXT_USEBURST: u32 = 1 << 3;
const N_MINUS_1_SHIFT: u32 = 4;
const N_MINUS_1_MASK: u32 = 0x3FF << N_MINUS_1_SHIFT;
const R_POWER_SHIFT: u32 = 14;
const R_POWER_MASK: u32 = 0xF << R_POWER_SHIFT;
const SRC_PROT_SHIFT: u32 = 18;
const SRC_PROT_MASK: u32 = 0b111 << SRC_PROT_SHIFT;
const DST_PROT_SHIFT: u32 = 21;
const DST_PROT_MASK: u32 = 0b111 << DST_PROT_SHIFT;
const SRC_SIZE_SHIFT: u32 = 24;
const SRC_SIZE_MASK: u32 = 0b11 << SRC_SIZE_SHIFT;
const SRC_INC_SHIFT: u32 = 26;
const SRC_INC_MASK: u32 = 0b11 << SRC_INC_SHIFT;
const DST_SIZE_SHIFT: u32 = 28;
const DST_SIZE_MASK: u32 = 0b11 << DST_SIZE_SHIFT;
const DST_INC_SHIFT: u32 = 30;
const DST_INC_MASK: u32 = 0b11 << DST_INC_SHIFT;

/// The packed control word of a control block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Control(u32);

impl Control {
    /// The raw word, as the engine reads it.
    pub const fn bits(self) -> u32 {
        self.0
    }

    pub fn cycle_mode(self) -> CycleMode {
        CycleMode::from_bits(self.0 & CYCLE_CTRL_MASK)
    }

    pub fn next_useburst(self) -> bool {
        self.0 & NEXT_USEBURST != 0
    }

    /// Transfers remaining in the cycle, minus one. Hardware drains
    /// this field as the cycle runs.
    pub fn n_minus_1(self) -> u32 {
        (self.0 & N_MINUS_1_MASK) >> N_MINUS_1_SHIFT
    }

    pub fn cycle_size(self) -> u32 {
        self.n_minus_1() + 1
    }

    /// The raw arbitration code: re-arbitrate after `2^r_power`
    /// transfers.
    pub fn r_power(self) -> u32 {
        (self.0 & R_POWER_MASK) >> R_POWER_SHIFT
    }

    pub fn source_protection(self) -> Protection {
        Protection::from_bits((self.0 & SRC_PROT_MASK) >> SRC_PROT_SHIFT)
    }

    pub fn destination_protection(self) -> Protection {
        Protection::from_bits((self.0 & DST_PROT_MASK) >> DST_PROT_SHIFT)
    }

    pub fn source_size(self) -> DataSize {
        DataSize::from_bits((self.0 & SRC_SIZE_MASK) >> SRC_SIZE_SHIFT)
    }

    pub fn source_increment(self) -> Increment {
        Increment::from_bits((self.0 & SRC_INC_MASK) >> SRC_INC_SHIFT)
    }

    pub fn destination_size(self) -> DataSize {
        DataSize::from_bits((self.0 & DST_SIZE_MASK) >> DST_SIZE_SHIFT)
    }

    pub fn destination_increment(self) -> Increment {
        Increment::from_bits((self.0 & DST_INC_MASK) >> DST_INC_SHIFT)
    }

    fn set_cycle_mode(&mut self, mode: CycleMode) {
        self.0 = (self.0 & !CYCLE_CTRL_MASK) | mode as u32;
    }

    fn set_n_minus_1(&mut self, n_minus_1: u32) {
        self.0 = (self.0 & !N_MINUS_1_MASK) | (n_minus_1 << N_MINUS_1_SHIFT);
    }
}

/// A semantic transfer description.
///
/// This is what you hand to [`ControlBlock::new`]. Addresses are the
/// 32-bit addresses the engine drives on the bus; build them from
/// pointers with the slice constructors, or supply them directly for
/// peripheral registers.
#[derive(Debug, Clone, Copy)]
pub struct Transfer {
    /// Source base address.
    pub source: u32,
    /// Source address increment.
    pub source_increment: Increment,
    /// Source element width.
    pub source_size: DataSize,
    /// Destination base address.
    pub destination: u32,
    /// Destination address increment.
    pub destination_increment: Increment,
    /// Destination element width.
    pub destination_size: DataSize,
    /// Operating mode of the cycle.
    pub mode: CycleMode,
    /// Number of transfers in the cycle, `1..=1024`.
    pub cycle_size: u16,
    /// Arbitration period.
    pub arbitration: Arbitration,
    /// HPROT bits for source reads.
    pub source_protection: Protection,
    /// HPROT bits for destination writes.
    pub destination_protection: Protection,
    /// Burst-only hint for the next cycle of a scatter-gather
    /// sequence.
    pub next_useburst: bool,
}

/// Truncate a pointer to the 32-bit address the engine sees.
pub(crate) fn addr<T>(pointer: *const T) -> u32 {
    pointer as usize as u32
}

impl Transfer {
    /// A memory-to-memory copy, driven by a software request.
    ///
    /// Copies as many elements as the shorter slice holds. The
    /// description captures addresses only; keep both buffers alive
    /// until the transfer completes.
    pub fn memory_to_memory<E: Element>(source: &[E], destination: &mut [E]) -> Self {
        let cycle = source.len().min(destination.len());
        Transfer {
            source: addr(source.as_ptr()),
            source_increment: E::INCREMENT,
            source_size: E::DATA_SIZE,
            destination: addr(destination.as_ptr()),
            destination_increment: E::INCREMENT,
            destination_size: E::DATA_SIZE,
            mode: CycleMode::AutoRequest,
            cycle_size: u16::try_from(cycle).unwrap_or(u16::MAX),
            arbitration: Arbitration::After1024,
            source_protection: Protection::default(),
            destination_protection: Protection::default(),
            next_useburst: false,
        }
    }

    /// Transmit a buffer into a peripheral data register.
    pub fn memory_to_peripheral<E: Element>(source: &[E], destination: *const E) -> Self {
        Transfer {
            source: addr(source.as_ptr()),
            source_increment: E::INCREMENT,
            source_size: E::DATA_SIZE,
            destination: addr(destination),
            destination_increment: Increment::None,
            destination_size: E::DATA_SIZE,
            mode: CycleMode::Basic,
            cycle_size: u16::try_from(source.len()).unwrap_or(u16::MAX),
            arbitration: Arbitration::After1,
            source_protection: Protection::default(),
            destination_protection: Protection::default(),
            next_useburst: false,
        }
    }

    /// Receive from a peripheral data register into a buffer.
    pub fn peripheral_to_memory<E: Element>(source: *const E, destination: &mut [E]) -> Self {
        Transfer {
            source: addr(source),
            source_increment: Increment::None,
            source_size: E::DATA_SIZE,
            destination: addr(destination.as_ptr()),
            destination_increment: E::INCREMENT,
            destination_size: E::DATA_SIZE,
            mode: CycleMode::Basic,
            cycle_size: u16::try_from(destination.len()).unwrap_or(u16::MAX),
            arbitration: Arbitration::After1,
            source_protection: Protection::default(),
            destination_protection: Protection::default(),
            next_useburst: false,
        }
    }
}

/// One hardware control block.
///
/// 16 bytes, fetched by the engine from the control table (or, for
/// scatter-gather tasks, copied by the engine itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ControlBlock {
    source_end: u32,
    destination_end: u32,
    control: Control,
    _reserved: u32,
}

const _: () = assert!(core::mem::size_of::<ControlBlock>() == 16);

fn end_address(base: u32, increment: Increment, n_minus_1: u32) -> u32 {
    match increment.stride_shift() {
        Some(shift) => base.wrapping_add(n_minus_1 << shift),
        None => base,
    }
}

impl ControlBlock {
    /// A stopped block. Channels fetch this harmlessly until software
    /// writes a real description.
    pub const fn stopped() -> Self {
        ControlBlock {
            source_end: 0,
            destination_end: 0,
            control: Control(0),
            _reserved: 0,
        }
    }

    /// Encode a transfer description into the hardware record.
    ///
    /// Fails with [`Error::CycleSize`] when the cycle size is outside
    /// `1..=1024`. For scatter-gather primary modes the destination end
    /// address is pinned to `destination + 12`: the destination is the
    /// channel's own four-word alternate slot, and the engine wants the
    /// address of its last word.
    pub fn new(transfer: &Transfer) -> Result<Self, Error> {
        let cycle_size = u32::from(transfer.cycle_size);
        if !(1..=1024).contains(&cycle_size) {
            return Err(Error::CycleSize(cycle_size));
        }
        let n_minus_1 = cycle_size - 1;

        let source_end = end_address(transfer.source, transfer.source_increment, n_minus_1);
        let destination_end = if transfer.mode.is_scatter_gather_primary() {
            transfer.destination.wrapping_add(12)
        } else {
            end_address(
                transfer.destination,
                transfer.destination_increment,
                n_minus_1,
            )
        };

        let next_useburst = if transfer.next_useburst {
            NEXT_USEBURST
        } else {
            0
        };
        let control = Control(
            transfer.mode as u32
                | next_useburst
                | n_minus_1 << N_MINUS_1_SHIFT
                | (transfer.arbitration as u32) << R_POWER_SHIFT
                | transfer.source_protection.bits() << SRC_PROT_SHIFT
                | transfer.destination_protection.bits() << DST_PROT_SHIFT
                | (transfer.source_size as u32) << SRC_SIZE_SHIFT
                | (transfer.source_increment as u32) << SRC_INC_SHIFT
                | (transfer.destination_size as u32) << DST_SIZE_SHIFT
                | (transfer.destination_increment as u32) << DST_INC_SHIFT,
        );

        Ok(ControlBlock {
            source_end,
            destination_end,
            control,
            _reserved: 0,
        })
    }

    pub fn source_end(&self) -> u32 {
        self.source_end
    }

    pub fn destination_end(&self) -> u32 {
        self.destination_end
    }

    pub fn control(&self) -> Control {
        self.control
    }

    /// Restart the cycle description with a new mode and size.
    ///
    /// Rewrites only the cycle mode and the transfer count; addresses,
    /// arbitration, sizes, increments and protection stay as encoded.
    /// Intended for re-arming a channel whose cycle completed (the
    /// engine leaves the mode at `Stop` and the count drained).
    pub fn reload(&mut self, mode: CycleMode, cycle_size: u16) -> Result<(), Error> {
        let cycle_size = u32::from(cycle_size);
        if !(1..=1024).contains(&cycle_size) {
            return Err(Error::CycleSize(cycle_size));
        }
        self.control.set_cycle_mode(mode);
        self.control.set_n_minus_1(cycle_size - 1);
        Ok(())
    }
}
