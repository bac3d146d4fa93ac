// Copyright @yucwang 2026

use bumpalo::Bump;

const DEFAULT_BLOCK_SIZE: usize = 16 * 1024;

/// Per-thread bump arena for data that lives for a single camera sample.
///
/// Allocations borrow the arena, so the borrow checker rejects any reference
/// kept across `free_all`. Nothing allocated here is dropped: only store plain
/// data (no `Vec`, `Box` or other owners of heap memory).
pub struct ScratchArena {
    bump: Bump,
}

impl Default for ScratchArena {
    fn default() -> Self {
        Self::new()
    }
}

impl ScratchArena {
    pub fn new() -> Self {
        Self::with_block_size(DEFAULT_BLOCK_SIZE)
    }

    pub fn with_block_size(block_size: usize) -> Self {
        Self { bump: Bump::with_capacity(block_size) }
    }

    pub fn alloc<T: Copy>(&self, value: T) -> &mut T {
        self.bump.alloc(value)
    }

    pub fn alloc_slice<T: Copy>(&self, len: usize, value: T) -> &mut [T] {
        self.bump.alloc_slice_fill_copy(len, value)
    }

    pub fn alloc_slice_with<T: Copy, F: FnMut(usize) -> T>(&self, len: usize, f: F) -> &mut [T] {
        self.bump.alloc_slice_fill_with(len, f)
    }

    /// Rewinds the bump pointer. The largest block is kept for the next sample.
    pub fn free_all(&mut self) {
        self.bump.reset();
    }

    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }
}
