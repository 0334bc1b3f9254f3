//! Byte-addressable little-endian memory with a warn-and-continue bounds
//! policy.
//!
//! Multi-byte accessors are compositions of the byte accessors, so nothing
//! here requires natural alignment. An access at or past the end of the
//! image prints a warning and is neutralized: reads resolve to 0, writes are
//! dropped. The simulator never halts on an out-of-range data access.

use std::fs;
use std::io;
use std::io::Write;
use std::path::Path;

use thiserror::Error;

use crate::hex;

/// Errors raised while loading a flat binary image into memory.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The image file could not be opened or read.
    #[error("Can't open file '{path}' for reading.")]
    Open {
        /// Path handed to [`Memory::load_image`].
        path: String,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// The image is larger than the memory it is being loaded into.
    #[error("Program too big.")]
    TooBig {
        /// Image length in bytes.
        image: usize,
        /// Memory capacity in bytes.
        capacity: usize,
    },
}

/// A contiguous byte store addressed from 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    bytes: Vec<u8>,
}

impl Memory {
    /// Byte value freshly constructed memory is filled with.
    pub const FILL: u8 = 0xA5;

    /// Creates a memory of `size` bytes, rounded up to the next multiple
    /// of 16, filled with [`Self::FILL`].
    #[must_use]
    pub fn new(size: u32) -> Self {
        let rounded = size.wrapping_add(15) & 0xFFFF_FFF0;
        Self {
            bytes: vec![Self::FILL; rounded as usize],
        }
    }

    /// Returns the memory size in bytes.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn size(&self) -> u32 {
        self.bytes.len() as u32
    }

    /// Bounds check shared by every accessor. Out-of-range addresses warn
    /// on stdout; the caller neutralizes the access.
    fn check_range(&self, addr: u32) -> bool {
        if (addr as usize) < self.bytes.len() {
            true
        } else {
            println!("WARNING: Address out of range: {}", hex::to_hex0x32(addr));
            false
        }
    }

    /// Reads one byte; out-of-range reads yield 0.
    #[must_use]
    pub fn get8(&self, addr: u32) -> u8 {
        if self.check_range(addr) {
            self.bytes[addr as usize]
        } else {
            0
        }
    }

    /// Little-endian 16-bit read composed from two byte reads.
    #[must_use]
    pub fn get16(&self, addr: u32) -> u16 {
        u16::from(self.get8(addr)) | u16::from(self.get8(addr.wrapping_add(1))) << 8
    }

    /// Little-endian 32-bit read composed from two halfword reads.
    #[must_use]
    pub fn get32(&self, addr: u32) -> u32 {
        u32::from(self.get16(addr)) | u32::from(self.get16(addr.wrapping_add(2))) << 16
    }

    /// Byte read, sign-extended to a signed 32-bit value.
    #[must_use]
    pub fn get8_sx(&self, addr: u32) -> i32 {
        i32::from(self.get8(addr) as i8)
    }

    /// Halfword read, sign-extended to a signed 32-bit value.
    #[must_use]
    pub fn get16_sx(&self, addr: u32) -> i32 {
        i32::from(self.get16(addr) as i16)
    }

    /// Word read returned as a signed 32-bit value.
    #[must_use]
    pub fn get32_sx(&self, addr: u32) -> i32 {
        self.get32(addr) as i32
    }

    /// Writes one byte; out-of-range writes are dropped.
    pub fn set8(&mut self, addr: u32, value: u8) {
        if self.check_range(addr) {
            self.bytes[addr as usize] = value;
        }
    }

    /// Little-endian 16-bit write composed from two byte writes.
    pub fn set16(&mut self, addr: u32, value: u16) {
        self.set8(addr, value as u8);
        self.set8(addr.wrapping_add(1), (value >> 8) as u8);
    }

    /// Little-endian 32-bit write composed from two halfword writes.
    pub fn set32(&mut self, addr: u32, value: u32) {
        self.set16(addr, value as u16);
        self.set16(addr.wrapping_add(2), (value >> 16) as u16);
    }

    /// Loads a raw flat binary image starting at address 0. The file is a
    /// headerless byte-for-byte copy; no relocation is performed.
    ///
    /// # Errors
    ///
    /// [`LoadError::Open`] when the file cannot be read,
    /// [`LoadError::TooBig`] when the image exceeds the memory size. The
    /// length check runs before any byte is copied.
    pub fn load_image<P: AsRef<Path>>(&mut self, path: P) -> Result<(), LoadError> {
        let path = path.as_ref();
        let image = fs::read(path).map_err(|source| LoadError::Open {
            path: path.display().to_string(),
            source,
        })?;
        if image.len() > self.bytes.len() {
            return Err(LoadError::TooBig {
                image: image.len(),
                capacity: self.bytes.len(),
            });
        }
        self.bytes[..image.len()].copy_from_slice(&image);
        Ok(())
    }

    /// Writes the hex/ASCII dump of the whole image, 16 bytes per row:
    /// address, 8 bytes, a gap, 8 bytes, then the printable-ASCII rendering
    /// with `.` standing in for non-printable bytes.
    ///
    /// # Errors
    ///
    /// Propagates any failure from the output sink.
    pub fn dump<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for (row, chunk) in self.bytes.chunks(16).enumerate() {
            let addr = (row * 16) as u32;
            write!(out, "{}:", hex::to_hex32(addr))?;
            for (i, byte) in chunk.iter().enumerate() {
                if i == 8 {
                    write!(out, " ")?;
                }
                write!(out, " {}", hex::to_hex8(*byte))?;
            }
            let ascii: String = chunk
                .iter()
                .map(|&b| {
                    if b.is_ascii_graphic() || b == b' ' {
                        b as char
                    } else {
                        '.'
                    }
                })
                .collect();
            writeln!(out, " *{ascii}*")?;
        }
        Ok(())
    }
}
