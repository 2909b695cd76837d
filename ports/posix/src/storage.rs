//! Non-volatile storage on the host
//!
//! [`MemStorage`] forgets everything when dropped; [`FileStorage`] mirrors
//! every write into a file so the configuration survives a restart. Both
//! start erased (all `0xFF`), like a fresh EEPROM.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use hal::{HalError, HalResult, NvStorage};
use log::{debug, warn};

use crate::error::{SimError, SimResult};

/// Capacity of the ATmega EEPROM the firmware was sized for
pub const DEFAULT_CAPACITY: usize = 512;

const ERASED: u8 = 0xFF;

/// EEPROM held in memory
#[derive(Debug, Clone)]
pub struct MemStorage {
    cells: Vec<u8>,
}

impl MemStorage {
    /// Erased storage of `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            cells: vec![ERASED; capacity],
        }
    }

    /// Raw contents
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }
}

impl Default for MemStorage {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl NvStorage for MemStorage {
    fn capacity(&self) -> usize {
        self.cells.len()
    }

    fn read(&mut self, offset: usize, buffer: &mut [u8]) -> HalResult<()> {
        let cells = self
            .cells
            .get(offset..offset + buffer.len())
            .ok_or(HalError::InvalidParameter)?;
        buffer.copy_from_slice(cells);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> HalResult<()> {
        self.cells
            .get_mut(offset..offset + data.len())
            .ok_or(HalError::InvalidParameter)?
            .copy_from_slice(data);
        Ok(())
    }
}

/// EEPROM image backed by a file
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    memory: MemStorage,
}

impl FileStorage {
    /// Load the image at `path`; a missing file reads as erased
    pub fn open(path: impl AsRef<Path>, capacity: usize) -> SimResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut memory = MemStorage::new(capacity);

        match fs::read(&path) {
            Ok(image) => {
                if image.len() > capacity {
                    return Err(SimError::StorageSize {
                        found: image.len(),
                        capacity,
                    });
                }
                memory.cells[..image.len()].copy_from_slice(&image);
                debug!("loaded {} bytes from {}", image.len(), path.display());
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("{} not found, starting erased", path.display());
            }
            Err(err) => return Err(err.into()),
        }

        Ok(Self { path, memory })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NvStorage for FileStorage {
    fn capacity(&self) -> usize {
        self.memory.capacity()
    }

    fn read(&mut self, offset: usize, buffer: &mut [u8]) -> HalResult<()> {
        self.memory.read(offset, buffer)
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> HalResult<()> {
        self.memory.write(offset, data)?;
        fs::write(&self.path, self.memory.cells()).map_err(|err| {
            warn!("writing {} failed: {}", self.path.display(), err);
            HalError::Storage
        })
    }
}
