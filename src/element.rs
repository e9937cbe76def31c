//! DMA transfer elements.

use crate::block::{DataSize, Increment};

/// Describes a DMA element: a primitive the engine can move in one
/// read / write pair.
///
/// The trait is sealed to the integer widths the engine supports.
pub trait Element: private::Sealed + Copy {
    /// The element width the hardware encodes into the control word.
    const DATA_SIZE: DataSize;
    /// The address increment matching the element width.
    const INCREMENT: Increment;
}

mod private {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for i8 {}
    impl Sealed for u16 {}
    impl Sealed for i16 {}
    impl Sealed for u32 {}
    impl Sealed for i32 {}
}

macro_rules! element {
    ($type:ty, $size:ident) => {
        impl Element for $type {
            const DATA_SIZE: DataSize = DataSize::$size;
            const INCREMENT: Increment = Increment::$size;
        }
    };
}

element!(u8, Bits8);
element!(i8, Bits8);
element!(u16, Bits16);
element!(i16, Bits16);
element!(u32, Bits32);
element!(i32, Bits32);
