/*++
Licensed under the Apache-2.0 license.

File Name:

    memory_layout.rs

Abstract:

    The file contains the FRTS transfer geometry and the sizes of the
    fixed buffers that back it.

--*/

use frts_image_types::{
    FRTS_DESC_V1_BYTE_SIZE, VDPA_CERT30_MAX_ENTRY_COUNT, VDPA_ENTRY_CERT30_BYTE_SIZE,
};

//
// DMA Geometry
//
pub const FRTS_DMA_ALIGN: u32 = 256;
pub const FRTS_MAX_SIZE: u64 = 1024 * 1024;

//
// Emulator UART
//
pub const EMU_UART_ORG: u32 = 0x3003_00C8;

//
// Buffer Sizes In Bytes
//
pub const DESC_BUFFER_SIZE: usize = FRTS_DMA_ALIGN as usize;
pub const VDPA_BUFFER_SIZE: usize = 4 * 1024;

const _: () = assert!(FRTS_DESC_V1_BYTE_SIZE <= DESC_BUFFER_SIZE);
const _: () = assert!(
    VDPA_CERT30_MAX_ENTRY_COUNT as usize * VDPA_ENTRY_CERT30_BYTE_SIZE <= VDPA_BUFFER_SIZE
);
const _: () = assert!(VDPA_BUFFER_SIZE % FRTS_DMA_ALIGN as usize == 0);
const _: () = assert!(FRTS_DMA_ALIGN.is_power_of_two());
