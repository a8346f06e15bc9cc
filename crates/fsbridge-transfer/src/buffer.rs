//! Upload chunk sizing bounded by available memory.

use sysinfo::System;

const KB: usize = 1024;
const MB: usize = 1024 * KB;

/// Never read more than this in one go, however large the file.
const MAX_CHUNK: usize = 16 * MB;

#[derive(Debug, Clone)]
pub struct ChunkSizer {
    min_chunk: usize,
    memory_divisor: u64,
    /// Pinned value instead of asking the OS.
    fixed_available_memory: Option<u64>,
}

impl ChunkSizer {
    pub fn new(min_chunk: usize, memory_divisor: u64) -> Self {
        Self {
            min_chunk: min_chunk.max(1),
            memory_divisor: memory_divisor.max(1),
            fixed_available_memory: None,
        }
    }

    pub fn with_available_memory(mut self, bytes: u64) -> Self {
        self.fixed_available_memory = Some(bytes);
        self
    }

    fn available_memory(&self) -> u64 {
        if let Some(bytes) = self.fixed_available_memory {
            return bytes;
        }
        let mut sys = System::new();
        sys.refresh_memory();
        let available = sys.available_memory();
        if available == 0 {
            // Some sandboxes report nothing; assume a small device.
            512 * MB as u64
        } else {
            available
        }
    }

    /// A hundredth of the file (at least `min_chunk`), capped at a share of
    /// currently available memory.
    pub fn chunk_size_for(&self, file_size: u64) -> usize {
        let proportional = file_size.div_ceil(100).max(self.min_chunk as u64);
        let memory_cap = (self.available_memory() / self.memory_divisor).max(1);
        proportional.min(memory_cap).min(MAX_CHUNK as u64) as usize
    }
}
