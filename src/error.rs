//! Configuration errors.

/// An error while describing a DMA transfer.
///
/// These are software-side configuration errors. Hardware bus faults
/// never surface here; poll [`Dma::is_error`](crate::Dma::is_error)
/// and clear the sticky flag with
/// [`Dma::clear_error`](crate::Dma::clear_error).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The cycle size is outside `1..=1024`.
    ///
    /// The engine encodes the transfer count in a 10 bit field, as
    /// `count - 1`.
    CycleSize(u32),
    /// The scatter-gather task count is outside `1..=256`.
    ///
    /// Each task occupies four words of the primary cycle, and the
    /// cycle maxes out at 1024 transfers.
    TaskCount(usize),
    /// No control table was registered with the driver.
    ///
    /// Call [`Dma::set_control_table`](crate::Dma::set_control_table)
    /// before configuring channel control blocks.
    ControlTableUnset,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::CycleSize(size) => {
                write!(f, "cycle size {size} is outside 1..=1024")
            }
            Error::TaskCount(count) => {
                write!(f, "scatter-gather task count {count} is outside 1..=256")
            }
            Error::ControlTableUnset => {
                write!(f, "no DMA control table has been registered")
            }
        }
    }
}
