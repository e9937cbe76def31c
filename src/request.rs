//! DMA request-line assignments.
//!
//! There's no request multiplexer on these parts; each peripheral's
//! request line is wired to a fixed channel index. These constants name
//! that wiring, per family. Any channel can still be driven purely by
//! software requests — mask the hardware line with
//! [`Channel::mask_requests`](crate::Channel::mask_requests) and kick
//! it with [`Channel::request`](crate::Channel::request).

cfg_if::cfg_if! {
    if #[cfg(feature = "mdr32vf0xi")] {
        /// UART0 transmit.
        pub const UART0_TX: usize = 0;
        /// UART0 receive.
        pub const UART0_RX: usize = 1;
        /// UART1 transmit.
        pub const UART1_TX: usize = 2;
        /// UART1 receive.
        pub const UART1_RX: usize = 3;
        /// SSP0 transmit.
        pub const SSP0_TX: usize = 4;
        /// SSP0 receive.
        pub const SSP0_RX: usize = 5;
        /// SSP1 transmit.
        pub const SSP1_TX: usize = 6;
        /// SSP1 receive.
        pub const SSP1_RX: usize = 7;
        /// ADC end of conversion.
        pub const ADC: usize = 8;
        /// ADCUI metering block, channel F0.
        pub const ADCUI_F0: usize = 9;
        /// ADCUI metering block, channel F1.
        pub const ADCUI_F1: usize = 10;
        /// ADCUI metering block, channel F2.
        pub const ADCUI_F2: usize = 11;
        /// Timer 0 events.
        pub const TIMER0: usize = 12;
        /// Timer 1 events.
        pub const TIMER1: usize = 13;
        /// CRC block.
        pub const CRC: usize = 14;
    } else {
        /// UART0 transmit.
        pub const UART0_TX: usize = 0;
        /// UART0 receive.
        pub const UART0_RX: usize = 1;
        /// UART1 transmit.
        pub const UART1_TX: usize = 2;
        /// UART1 receive.
        pub const UART1_RX: usize = 3;
        /// SSP0 transmit.
        pub const SSP0_TX: usize = 4;
        /// SSP0 receive.
        pub const SSP0_RX: usize = 5;
        /// ADC end of conversion.
        pub const ADC: usize = 6;
        /// Timer 0 events.
        pub const TIMER0: usize = 7;
        /// Timer 1 events.
        pub const TIMER1: usize = 8;
    }
}
