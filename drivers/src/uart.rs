/*++

Licensed under the Apache-2.0 license.

File Name:

    uart.rs

Abstract:

    File contains API for accessing the emulator UART

--*/

use crate::memory_layout::EMU_UART_ORG;

/// Emulator UART
#[derive(Default, Debug)]
pub struct Uart {}

impl Uart {
    /// Create an instance of the emulator UART
    pub fn new() -> Self {
        Self {}
    }

    /// Write the string to UART
    ///
    /// # Arguments
    ///
    /// `str` - String to write to UART
    pub fn write(&mut self, str: &str) {
        for byte in str.bytes() {
            match byte {
                0x20..=0x7e | b'\n' | b'\t' => self.write_byte(byte),
                _ => self.write_byte(0xfe),
            }
        }
    }

    /// Write the byte to UART
    ///
    /// # Arguments
    ///
    /// `byte` - Byte to write to UART
    pub fn write_byte(&mut self, byte: u8) {
        let reg = EMU_UART_ORG as *mut u32;
        unsafe { reg.write_volatile(byte as u32) };
    }
}
