//! A RAL-like module to support DMA register access
//!
//! There's no published RAL for the Milandr parts, and the register map
//! of this DMA controller is small enough to carry here. Both the
//! MDR32F2xQI and MDR32VF0xI families expose the same map, so there's
//! one register block and no per-family dispatch.
//!
//! The module keeps the RAL conventions so that we can use the RAL
//! macros, where applicable.

#![allow(
    non_snake_case, // Compatibility with RAL
    unused, // Prototyping convenience
)]

pub mod dma;

pub use ral_registers::{modify_reg, read_reg, write_reg};
use ral_registers::{RORegister, RWRegister, WORegister};

//
// Helper types for static memory
//
// Similar to the RAL's `Instance` type, but more copy.
//

pub(crate) struct Static<T>(pub(crate) *const T);
impl<T> core::ops::Deref for Static<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        // Safety: pointer points to static memory (peripheral memory)
        unsafe { &*self.0 }
    }
}
impl<T> Clone for Static<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Static<T> {}
