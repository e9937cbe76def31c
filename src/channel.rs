//! DMA channel

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::block::{ControlBlock, CycleMode, Transfer};
use crate::ral::{dma::RegisterBlock, Static};
use crate::table::CHANNEL_COUNT;
use crate::Error;

impl<const CHANNELS: usize> crate::Dma<CHANNELS> {
    /// Creates the DMA channel described by `index`.
    ///
    /// # Safety
    ///
    /// This will create a handle that may alias global, mutable state. You should only create
    /// one channel per index. If there are multiple channels for the same index, you're
    /// responsible for ensuring synchronized access.
    ///
    /// # Panics
    ///
    /// Panics if `index` is greater than or equal to the maximum number of channels.
    pub unsafe fn channel(&'static self, index: usize) -> Channel {
        assert!(index < CHANNELS);
        Channel {
            index,
            registers: self.registers(),
            table: &self.table,
        }
    }
}

/// A DMA channel
///
/// You should rely on your HAL to allocate `Channel`s. If your HAL does not allocate channels,
/// or if you're desigining the HAL, use [`Dma`](crate::Dma) to create channels.
///
/// A channel exists as long as the peripheral is powered; this handle
/// only leases it. The handle stores memory addresses independent of
/// the memory lifetime. You must make sure that the channel's control
/// blocks are valid before enabling a transfer!
pub struct Channel {
    /// Our channel number, expected to be between [0, 32)
    index: usize,
    /// Reference to the DMA registers
    registers: Static<RegisterBlock>,
    /// The driver's native copy of the control-table base.
    table: &'static AtomicUsize,
}

// It's OK to send a channel across an execution context.
// They can't be cloned or copied, so there's no chance of
// them being (mutably) shared.
unsafe impl Send for Channel {}

/// Which control-block slot a channel reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bank {
    /// The primary slot.
    Primary,
    /// The alternate slot; ping-pong and scatter-gather cycles flip
    /// to it.
    Alternate,
}

/// Channel arbitration priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Serviced in channel-index order.
    Default,
    /// Serviced before any default-priority channel.
    High,
}

/// Everything `Channel::init` programs at once.
///
/// Transfers are encoded and written into the channel's control-block
/// slot(s); the remaining fields land in the per-channel bitmask
/// registers. The request line is unmasked as part of `init`.
#[derive(Debug, Clone, Copy)]
pub struct ChannelConfig {
    /// The primary control block, if this configuration writes one.
    pub primary: Option<Transfer>,
    /// The alternate control block, for ping-pong cycles.
    pub alternate: Option<Transfer>,
    /// Respond only to burst requests.
    pub use_burst: bool,
    /// Arbitrate at high priority.
    pub high_priority: bool,
    /// The bank the channel starts on.
    pub bank: Bank,
}

impl ChannelConfig {
    /// A single-bank configuration: primary block only, defaults
    /// elsewhere.
    pub const fn new(primary: Transfer) -> Self {
        ChannelConfig {
            primary: Some(primary),
            alternate: None,
            use_burst: false,
            high_priority: false,
            bank: Bank::Primary,
        }
    }
}

/// Let the engine observe a fully-written control block.
///
/// The engine fetches blocks over the bus; a store buffer could
/// otherwise let an enable overtake the block write.
pub(crate) fn complete_write() {
    cfg_if::cfg_if! {
        if #[cfg(all(target_arch = "arm", target_os = "none"))] {
            cortex_m::asm::dsb();
        } else {
            core::sync::atomic::compiler_fence(Ordering::SeqCst);
        }
    }
}

impl Channel {
    /// Returns the DMA channel number
    ///
    /// Channels are unique and numbered within the half-open range `[0, CHANNEL_COUNT)`.
    pub fn channel(&self) -> usize {
        self.index
    }

    fn mask(&self) -> u32 {
        1 << self.index
    }

    /// This channel's control-block slot in the registered table.
    fn slot(&self, bank: Bank) -> Result<*mut ControlBlock, Error> {
        let base = self.table.load(Ordering::Acquire);
        if base == 0 {
            return Err(Error::ControlTableUnset);
        }
        let offset = match bank {
            Bank::Primary => self.index,
            Bank::Alternate => CHANNEL_COUNT + self.index,
        };
        // Safety: the base came from a ControlTable, which holds
        // 2 * CHANNEL_COUNT blocks, and index < CHANNEL_COUNT.
        Ok(unsafe { (base as *mut ControlBlock).add(offset) })
    }

    /// The bus address of this channel's slot, as the engine computes
    /// it.
    pub(crate) fn slot_address(&self, bank: Bank) -> Result<u32, Error> {
        let slot = self.slot(bank)?;
        Ok(crate::block::addr(slot))
    }

    /// Configure the channel.
    ///
    /// Encodes and writes the control block(s), programs burst,
    /// priority and bank selection, and unmasks the request line. The
    /// channel stays disabled; call [`enable`](Self::enable) when the
    /// source and destination are ready.
    ///
    /// Nothing is written to hardware unless every transfer
    /// description validates.
    pub fn init(&mut self, config: &ChannelConfig) -> Result<(), Error> {
        let primary = match &config.primary {
            Some(transfer) => Some(ControlBlock::new(transfer)?),
            None => None,
        };
        let alternate = match &config.alternate {
            Some(transfer) => Some(ControlBlock::new(transfer)?),
            None => None,
        };
        if let Some(block) = &primary {
            self.write_block(Bank::Primary, block)?;
        }
        if let Some(block) = &alternate {
            self.write_block(Bank::Alternate, block)?;
        }
        self.set_use_burst(config.use_burst);
        self.set_priority(if config.high_priority {
            Priority::High
        } else {
            Priority::Default
        });
        self.set_active_bank(config.bank);
        self.unmask_requests();
        Ok(())
    }

    /// Write a control block into this channel's slot.
    pub fn write_block(&mut self, bank: Bank, block: &ControlBlock) -> Result<(), Error> {
        let slot = self.slot(bank)?;
        // Safety: slot points into the registered control table.
        unsafe { slot.write_volatile(*block) };
        complete_write();
        Ok(())
    }

    /// Read back this channel's control block.
    ///
    /// Reflects whatever the engine left there: drained counts, a
    /// `Stop` mode after completion, or a loaded scatter-gather task.
    pub fn read_block(&self, bank: Bank) -> Result<ControlBlock, Error> {
        let slot = self.slot(bank)?;
        // Safety: slot points into the registered control table.
        Ok(unsafe { slot.read_volatile() })
    }

    /// Restart a completed cycle with a new mode and transfer count.
    ///
    /// Rewrites the live control word in place; the addresses and
    /// attributes encoded at `init` stay put. Call it after the cycle
    /// completes and before re-enabling the channel.
    pub fn reload_cycle(
        &mut self,
        bank: Bank,
        mode: CycleMode,
        cycle_size: u16,
    ) -> Result<(), Error> {
        let slot = self.slot(bank)?;
        // Safety: slot points into the registered control table.
        unsafe {
            let mut block = slot.read_volatile();
            block.reload(mode, cycle_size)?;
            // Only the control word goes back out; it's the third word
            // of the repr(C) block.
            (slot as *mut u32)
                .add(2)
                .write_volatile(block.control().bits());
        }
        complete_write();
        Ok(())
    }

    /// Transfers left in the cycle, from the live control block.
    ///
    /// Approximate while the engine is running the cycle.
    pub fn transfers_remaining(&self, bank: Bank) -> Result<u16, Error> {
        Ok(self.read_block(bank)?.control().cycle_size() as u16)
    }

    /// Enable the channel.
    ///
    /// The transfer starts on the next request: the wired peripheral's
    /// line, or [`request`](Self::request).
    ///
    /// # Safety
    ///
    /// This could initiate a DMA transaction that uses an invalid source or destination.
    /// Caller must ensure that the control blocks set for the channel are valid for
    /// the lifetime of the transfer.
    pub unsafe fn enable(&self) {
        // Write-one-to-set; exactly this channel's bit.
        self.registers.CHNL_ENABLE_SET.write(self.mask());
    }

    /// Disable the channel, preventing any DMA transfers
    ///
    /// Takes effect per hardware semantics; an in-flight transfer may
    /// complete first.
    pub fn disable(&self) {
        self.registers.CHNL_ENABLE_CLR.write(self.mask());
    }

    /// Indicates if this DMA channel is enabled
    ///
    /// The engine clears the bit itself when a basic or auto-request
    /// cycle completes.
    pub fn is_enabled(&self) -> bool {
        self.registers.CHNL_ENABLE_SET.read() & self.mask() != 0
    }

    /// Issue a software transfer request.
    ///
    /// Needed for auto-request cycles (memory-to-memory), or to kick a
    /// peripheral cycle from software.
    ///
    /// # Safety
    ///
    /// This could initiate a DMA transaction that uses an invalid source or destination.
    /// Caller must ensure that the control blocks set for the channel are valid for
    /// the lifetime of the transfer.
    pub unsafe fn request(&self) {
        self.registers.CHNL_SW_REQUEST.write(self.mask());
    }

    /// Ignore the channel's hardware request line.
    ///
    /// Software requests still work. Use this for channels driven
    /// purely by [`request`](Self::request).
    pub fn mask_requests(&mut self) {
        self.registers.CHNL_REQ_MASK_SET.write(self.mask());
    }

    /// Honor the channel's hardware request line again.
    pub fn unmask_requests(&mut self) {
        self.registers.CHNL_REQ_MASK_CLR.write(self.mask());
    }

    /// Returns `true` if the hardware request line is masked.
    pub fn is_requests_masked(&self) -> bool {
        self.registers.CHNL_REQ_MASK_SET.read() & self.mask() != 0
    }

    /// Respond only to burst requests.
    ///
    /// With burst-only set, single-transfer requests from the
    /// peripheral are ignored.
    pub fn set_use_burst(&mut self, use_burst: bool) {
        if use_burst {
            self.registers.CHNL_USEBURST_SET.write(self.mask());
        } else {
            self.registers.CHNL_USEBURST_CLR.write(self.mask());
        }
    }

    /// Returns `true` if the channel is in burst-only mode.
    pub fn is_use_burst(&self) -> bool {
        self.registers.CHNL_USEBURST_SET.read() & self.mask() != 0
    }

    /// Set the channel's arbitration priority.
    pub fn set_priority(&mut self, priority: Priority) {
        match priority {
            Priority::High => self.registers.CHNL_PRIORITY_SET.write(self.mask()),
            Priority::Default => self.registers.CHNL_PRIORITY_CLR.write(self.mask()),
        }
    }

    /// The channel's arbitration priority.
    pub fn priority(&self) -> Priority {
        if self.registers.CHNL_PRIORITY_SET.read() & self.mask() != 0 {
            Priority::High
        } else {
            Priority::Default
        }
    }

    /// Select which control-block bank the channel reads.
    ///
    /// The engine flips this bit itself during ping-pong and
    /// scatter-gather cycles.
    pub fn set_active_bank(&mut self, bank: Bank) {
        match bank {
            Bank::Alternate => self.registers.CHNL_PRI_ALT_SET.write(self.mask()),
            Bank::Primary => self.registers.CHNL_PRI_ALT_CLR.write(self.mask()),
        }
    }

    /// The bank the channel currently reads.
    pub fn active_bank(&self) -> Bank {
        if self.registers.CHNL_PRI_ALT_SET.read() & self.mask() != 0 {
            Bank::Alternate
        } else {
            Bank::Primary
        }
    }

    /// Returns `true` if the channel is waiting on a request signal.
    pub fn is_waiting_on_request(&self) -> bool {
        self.registers.WAITONREQ_STATUS.read() & self.mask() != 0
    }
}

#[cfg(test)]
mod tests {
    use super::{Bank, ChannelConfig, Priority};
    use crate::block::{Arbitration, CycleMode, DataSize, Increment, Protection, Transfer};
    use crate::testing::{self, Fixture};
    use crate::{request, Error};

    fn ssp_tx_transfer(source: &[u8], fifo: u32) -> Transfer {
        Transfer {
            source: source.as_ptr() as usize as u32,
            source_increment: Increment::None,
            source_size: DataSize::Bits8,
            destination: fifo,
            destination_increment: Increment::Bits8,
            destination_size: DataSize::Bits8,
            mode: CycleMode::Basic,
            cycle_size: 16,
            arbitration: Arbitration::After1,
            source_protection: Protection::default(),
            destination_protection: Protection::default(),
            next_useburst: false,
        }
    }

    #[test]
    fn enable_and_disable_touch_exactly_one_bit() {
        let fx = Fixture::new();
        let channel = unsafe { fx.dma.channel(4) };
        unsafe { channel.enable() };
        assert_eq!(fx.peek(testing::CHNL_ENABLE_SET), 1 << 4);
        assert_eq!(fx.peek(testing::CHNL_ENABLE_CLR), 0);
        assert!(channel.is_enabled());

        channel.disable();
        assert_eq!(fx.peek(testing::CHNL_ENABLE_CLR), 1 << 4);
    }

    #[test]
    fn software_request_sets_the_channel_bit() {
        let fx = Fixture::new();
        let channel = unsafe { fx.dma.channel(9) };
        unsafe { channel.request() };
        assert_eq!(fx.peek(testing::CHNL_SW_REQUEST), 1 << 9);
    }

    #[test]
    fn bitmask_controls_route_to_their_registers() {
        let fx = Fixture::new();
        let mut channel = unsafe { fx.dma.channel(17) };

        channel.set_use_burst(true);
        assert_eq!(fx.peek(testing::CHNL_USEBURST_SET), 1 << 17);
        assert!(channel.is_use_burst());
        channel.set_use_burst(false);
        assert_eq!(fx.peek(testing::CHNL_USEBURST_CLR), 1 << 17);

        channel.set_priority(Priority::High);
        assert_eq!(fx.peek(testing::CHNL_PRIORITY_SET), 1 << 17);
        assert_eq!(channel.priority(), Priority::High);

        channel.set_active_bank(Bank::Alternate);
        assert_eq!(fx.peek(testing::CHNL_PRI_ALT_SET), 1 << 17);
        assert_eq!(channel.active_bank(), Bank::Alternate);

        channel.mask_requests();
        assert_eq!(fx.peek(testing::CHNL_REQ_MASK_SET), 1 << 17);
        assert!(channel.is_requests_masked());
        channel.unmask_requests();
        assert_eq!(fx.peek(testing::CHNL_REQ_MASK_CLR), 1 << 17);
    }

    #[test]
    fn waiting_on_request_reads_the_status_bit() {
        let fx = Fixture::new();
        let channel = unsafe { fx.dma.channel(11) };
        assert!(!channel.is_waiting_on_request());
        fx.poke(testing::WAITONREQ_STATUS, 1 << 11);
        assert!(channel.is_waiting_on_request());
    }

    #[test]
    #[should_panic]
    fn out_of_range_channel_panics() {
        let fx = Fixture::new();
        let _ = unsafe { fx.dma.channel(32) };
    }

    #[test]
    fn ssp_tx_init_writes_the_expected_primary_block() {
        let fx = Fixture::new();
        let mut channel = unsafe { fx.dma.channel(request::SSP0_TX) };
        let source = [0u8; 16];
        let fifo = 0x4004_0008;

        channel
            .init(&ChannelConfig::new(ssp_tx_transfer(&source, fifo)))
            .unwrap();

        let block = channel.read_block(Bank::Primary).unwrap();
        assert_eq!(block.source_end(), source.as_ptr() as usize as u32);
        assert_eq!(block.destination_end(), fifo + 15);
        assert_eq!(block.control().n_minus_1(), 15);
        assert_eq!(block.control().cycle_mode(), CycleMode::Basic);
        assert_eq!(block.control().r_power(), Arbitration::After1 as u32);

        // The block landed in this channel's slot of the table, and
        // nowhere else.
        let slot = unsafe { fx.table.base().add(request::SSP0_TX).read_volatile() };
        assert_eq!(slot, block);
        let neighbor = unsafe { fx.table.base().add(request::SSP0_TX + 1).read_volatile() };
        assert_eq!(neighbor.control().bits(), 0);

        // init leaves the request line unmasked and the channel on the
        // primary bank, still disabled.
        assert_eq!(fx.peek(testing::CHNL_REQ_MASK_CLR), 1 << request::SSP0_TX);
        assert_eq!(fx.peek(testing::CHNL_ENABLE_SET), 0);
    }

    #[test]
    fn init_without_a_table_is_an_error() {
        let fx = Fixture::bare();
        let mut channel = unsafe { fx.dma.channel(4) };
        let source = [0u8; 16];
        let err = channel
            .init(&ChannelConfig::new(ssp_tx_transfer(&source, 0x4004_0008)))
            .unwrap_err();
        assert_eq!(err, Error::ControlTableUnset);
    }

    #[test]
    fn invalid_transfer_leaves_hardware_untouched() {
        let fx = Fixture::new();
        let mut channel = unsafe { fx.dma.channel(4) };
        let source = [0u8; 16];
        let mut transfer = ssp_tx_transfer(&source, 0x4004_0008);
        transfer.cycle_size = 2000;

        let mut config = ChannelConfig::new(transfer);
        config.high_priority = true;
        assert_eq!(
            channel.init(&config).unwrap_err(),
            Error::CycleSize(2000)
        );
        assert_eq!(fx.peek(testing::CHNL_PRIORITY_SET), 0);
        let slot = unsafe { fx.table.base().add(4).read_volatile() };
        assert_eq!(slot.control().bits(), 0);
    }

    #[test]
    fn reload_cycle_rewrites_only_the_live_cycle_fields() {
        let fx = Fixture::new();
        let mut channel = unsafe { fx.dma.channel(2) };
        let source = [0u8; 16];
        channel
            .init(&ChannelConfig::new(ssp_tx_transfer(&source, 0x4004_0008)))
            .unwrap();
        let before = channel.read_block(Bank::Primary).unwrap();

        channel
            .reload_cycle(Bank::Primary, CycleMode::Basic, 8)
            .unwrap();

        let after = channel.read_block(Bank::Primary).unwrap();
        assert_eq!(after.control().cycle_size(), 8);
        assert_eq!(after.source_end(), before.source_end());
        assert_eq!(after.destination_end(), before.destination_end());
        assert_eq!(after.control().r_power(), before.control().r_power());
        assert_eq!(
            after.control().source_increment(),
            before.control().source_increment()
        );
        assert_eq!(channel.transfers_remaining(Bank::Primary).unwrap(), 8);
    }

    #[test]
    fn ping_pong_init_fills_both_banks() {
        let fx = Fixture::new();
        let mut channel = unsafe { fx.dma.channel(6) };
        let first = [0u8; 16];
        let second = [0u8; 16];
        let mut primary = ssp_tx_transfer(&first, 0x4004_0008);
        primary.mode = CycleMode::PingPong;
        let mut alternate = ssp_tx_transfer(&second, 0x4004_0008);
        alternate.mode = CycleMode::PingPong;

        let config = ChannelConfig {
            primary: Some(primary),
            alternate: Some(alternate),
            use_burst: false,
            high_priority: false,
            bank: Bank::Primary,
        };
        channel.init(&config).unwrap();

        let primary = channel.read_block(Bank::Primary).unwrap();
        let alternate = channel.read_block(Bank::Alternate).unwrap();
        assert_eq!(primary.control().cycle_mode(), CycleMode::PingPong);
        assert_eq!(alternate.control().cycle_mode(), CycleMode::PingPong);
        assert_eq!(
            primary.source_end(),
            first.as_ptr() as usize as u32
        );
        assert_eq!(
            alternate.source_end(),
            second.as_ptr() as usize as u32
        );
    }
}
