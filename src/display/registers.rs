/*
 *  display/registers.rs
 *
 *  lcdmsg - ST7565 message panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Register transport - raw 32-bit access to a window of device registers
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::{Arc, Mutex, MutexGuard};

use log::info;
use memmap2::{MmapMut, MmapOptions};
use thiserror::Error;

/// Failures while acquiring the register window. Both are fatal at startup.
#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot map {span:#x} bytes at physical {base:#x}: {source}")]
    Map {
        base: u64,
        span: usize,
        #[source]
        source: io::Error,
    },
}

/// Offset-addressed 32-bit access to a fixed window of device registers.
///
/// Accesses are never cached, merged or reordered. An offset outside the
/// window, or not 4-byte aligned, is a programming error and panics.
pub trait RegisterWindow {
    /// Size of the window in bytes
    fn span(&self) -> usize;

    fn read(&self, offset: usize) -> u32;

    fn write(&self, offset: usize, value: u32);

    fn set_bits(&self, offset: usize, mask: u32) {
        let value = self.read(offset);
        self.write(offset, value | mask);
    }

    fn clear_bits(&self, offset: usize, mask: u32) {
        let value = self.read(offset);
        self.write(offset, value & !mask);
    }
}

impl<W: RegisterWindow + ?Sized> RegisterWindow for Arc<W> {
    fn span(&self) -> usize { (**self).span() }
    fn read(&self, offset: usize) -> u32 { (**self).read(offset) }
    fn write(&self, offset: usize, value: u32) { (**self).write(offset, value) }
    fn set_bits(&self, offset: usize, mask: u32) { (**self).set_bits(offset, mask) }
    fn clear_bits(&self, offset: usize, mask: u32) { (**self).clear_bits(offset, mask) }
}

#[inline]
#[track_caller]
fn check_offset(offset: usize, span: usize) {
    assert!(
        offset % 4 == 0 && offset.checked_add(4).is_some_and(|end| end <= span),
        "register offset {offset:#x} outside window of {span:#x} bytes"
    );
}

/// Physical registers mapped through a memory device (normally `/dev/mem`).
pub struct MmapRegisterWindow {
    _mmap: MmapMut,    // keep mapping alive
    base: *mut u8,
    span: usize,
    phys_base: u64,
}

// The mapping lives as long as the window and every access is a single
// volatile load or store.
unsafe impl Send for MmapRegisterWindow {}
unsafe impl Sync for MmapRegisterWindow {}

impl MmapRegisterWindow {
    /// Open `device` synchronously and map `span` bytes starting at the
    /// physical address `phys_base`.
    pub fn open(device: &Path, phys_base: u64, span: usize) -> Result<Self, RegisterError> {
        info!("Opening {}...", device.display());
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(device)
            .map_err(|source| RegisterError::Open { path: device.to_path_buf(), source })?;

        info!("Memory mapping {:#x} bytes at {:#x}...", span, phys_base);
        let mut mmap = unsafe { MmapOptions::new().offset(phys_base).len(span).map_mut(&file) }
            .map_err(|source| RegisterError::Map { base: phys_base, span, source })?;
        let base = mmap.as_mut_ptr();
        info!("  virtual_base = {:p}", base);

        Ok(Self { _mmap: mmap, base, span, phys_base })
    }

    pub fn phys_base(&self) -> u64 {
        self.phys_base
    }
}

impl RegisterWindow for MmapRegisterWindow {
    fn span(&self) -> usize {
        self.span
    }

    #[track_caller]
    fn read(&self, offset: usize) -> u32 {
        check_offset(offset, self.span);
        // Safety: offset is aligned and inside the live mapping.
        unsafe { ptr::read_volatile(self.base.add(offset) as *const u32) }
    }

    #[track_caller]
    fn write(&self, offset: usize, value: u32) {
        check_offset(offset, self.span);
        // Safety: as for read.
        unsafe { ptr::write_volatile(self.base.add(offset) as *mut u32, value) }
    }
}

/// Register file kept in memory, for hosts without the panel hardware.
///
/// Clones share state, so a test can keep a handle for inspection after
/// the window has been moved into the bus.
#[derive(Debug, Clone)]
pub struct SimRegisterWindow {
    state: Arc<Mutex<SimState>>,
}

#[derive(Debug, Default)]
pub struct SimState {
    span: usize,
    regs: HashMap<usize, u32>,

    /// Registers whose reads return a fixed value regardless of writes
    pub pinned: HashMap<usize, u32>,

    /// Number of writes seen per offset
    pub write_counts: HashMap<usize, usize>,

    /// Data register, select register and select mask used for capture
    capture: Option<(usize, usize, u32)>,

    /// Captured (is_data, byte) pairs written to the data register
    pub transfers: Vec<(bool, u8)>,
}

impl SimRegisterWindow {
    pub fn new(span: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState { span, ..Default::default() })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // a poisoned lock only means a test panicked mid-access
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Direct access to the shared state
    pub fn state(&self) -> MutexGuard<'_, SimState> {
        self.lock()
    }

    /// Make every read of `offset` return `value`.
    pub fn pin(&self, offset: usize, value: u32) {
        check_offset(offset, self.span());
        self.lock().pinned.insert(offset, value);
    }

    pub fn unpin(&self, offset: usize) {
        self.lock().pinned.remove(&offset);
    }

    /// Record each write to `data` together with the level of `select_mask`
    /// in `select` at the time of the write.
    pub fn capture_writes(&self, data: usize, select: usize, select_mask: u32) {
        self.lock().capture = Some((data, select, select_mask));
    }

    /// Drain the captured transfers
    pub fn take_transfers(&self) -> Vec<(bool, u8)> {
        std::mem::take(&mut self.lock().transfers)
    }

    pub fn write_count(&self, offset: usize) -> usize {
        self.lock().write_counts.get(&offset).copied().unwrap_or(0)
    }

    /// Set a register as if the hardware had changed it
    pub fn poke(&self, offset: usize, value: u32) {
        check_offset(offset, self.span());
        self.lock().regs.insert(offset, value);
    }

    /// Read a register without going through a pin
    pub fn peek(&self, offset: usize) -> u32 {
        self.lock().regs.get(&offset).copied().unwrap_or(0)
    }
}

impl RegisterWindow for SimRegisterWindow {
    fn span(&self) -> usize {
        self.lock().span
    }

    #[track_caller]
    fn read(&self, offset: usize) -> u32 {
        let state = self.lock();
        check_offset(offset, state.span);
        if let Some(&value) = state.pinned.get(&offset) {
            return value;
        }
        state.regs.get(&offset).copied().unwrap_or(0)
    }

    #[track_caller]
    fn write(&self, offset: usize, value: u32) {
        let mut state = self.lock();
        check_offset(offset, state.span);
        *state.write_counts.entry(offset).or_insert(0) += 1;
        if let Some((data, select, mask)) = state.capture {
            if offset == data {
                let is_data = state.regs.get(&select).copied().unwrap_or(0) & mask != 0;
                state.transfers.push((is_data, value as u8));
            }
        }
        state.regs.insert(offset, value);
    }
}
