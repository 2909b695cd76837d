//! Non-volatile storage abstraction (EEPROM or flash emulation)

use crate::error::HalResult;

/// Byte-addressed non-volatile store
pub trait NvStorage {
    /// Store capacity in bytes
    fn capacity(&self) -> usize;

    /// Read `buffer.len()` bytes starting at `offset`
    fn read(&mut self, offset: usize, buffer: &mut [u8]) -> HalResult<()>;

    /// Write `data` starting at `offset`
    fn write(&mut self, offset: usize, data: &[u8]) -> HalResult<()>;

    /// Write only the bytes that differ from the stored content.
    ///
    /// Saves wear on EEPROM cells when a record is stored unchanged.
    fn update(&mut self, offset: usize, data: &[u8]) -> HalResult<()> {
        for (index, &byte) in data.iter().enumerate() {
            let mut current = [0u8; 1];
            self.read(offset + index, &mut current)?;
            if current[0] != byte {
                self.write(offset + index, &[byte])?;
            }
        }
        Ok(())
    }
}
