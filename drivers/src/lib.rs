/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the FRTS access drivers.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

mod access;
mod bounded_address;
mod dma;
pub mod memory_layout;
pub mod printer;
mod table_arena;

pub use access::{AccessBackend, DmaAccess};
pub use bounded_address::FrtsMemDesc;
pub use dma::{align_down, align_up, DmaEngine, DmaIndex, DmaWindow};
pub use frts_error::{FrtsError, FrtsErrorKind, FrtsResult};
pub use printer::HexBytes;
pub use table_arena::{
    arena_size, CachedTable, DefaultTableArena, TableArena, TableBufferSpec, DEFAULT_ARENA_SIZE,
    DEFAULT_TABLE_LAYOUT,
};

cfg_if::cfg_if! {
    if #[cfg(feature = "emu")] {
        mod uart;

        pub use uart::Uart;
    }
}
