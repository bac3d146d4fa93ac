// Copyright @yucwang 2026

use crate::core::barrier::PassBarrier;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

pub const DEFAULT_TILE_SIZE: usize = 32;

/// Pixel rectangle `[min_x, max_x) x [min_y, max_y)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Tile {
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
}

impl Tile {
    pub fn width(&self) -> usize {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> usize {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> usize {
        self.width() * self.height()
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.min_x && x < self.max_x && y >= self.min_y && y < self.max_y
    }
}

/// Proof that the holder owns `tile` for pass `pass`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TileClaim {
    pub tile: Tile,
    pub index: usize,
    pub pass: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Populated,
    Draining,
    Drained,
}

/// Splits the image into row-major tiles of at most `tile_size` square.
pub fn partition(width: usize, height: usize, tile_size: usize) -> Vec<Tile> {
    let tile_size = tile_size.max(1);
    let mut tiles = Vec::with_capacity(((width + tile_size - 1) / tile_size) * ((height + tile_size - 1) / tile_size));
    for min_y in (0..height).step_by(tile_size) {
        for min_x in (0..width).step_by(tile_size) {
            tiles.push(Tile {
                min_x,
                min_y,
                max_x: (min_x + tile_size).min(width),
                max_y: (min_y + tile_size).min(height),
            });
        }
    }
    tiles
}

/// Hands out the tiles of one pass, owns the abort flag and the two barriers
/// bracketing each pass.
pub struct TileScheduler {
    tile_size: usize,
    tiles: RwLock<Vec<Tile>>,
    cursor: AtomicUsize,
    pass: AtomicU32,
    abort: AtomicBool,
    pre_render: PassBarrier,
    post_render: PassBarrier,
}

impl TileScheduler {
    pub fn new(tile_size: usize, threads: usize) -> Self {
        Self {
            tile_size: tile_size.max(1),
            tiles: RwLock::new(Vec::new()),
            cursor: AtomicUsize::new(0),
            pass: AtomicU32::new(0),
            abort: AtomicBool::new(false),
            pre_render: PassBarrier::new(threads),
            post_render: PassBarrier::new(threads),
        }
    }

    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    /// Rebuilds the partition. Must not race with a pass in flight.
    pub fn init(&self, width: usize, height: usize) {
        *self.tiles.write() = partition(width, height, self.tile_size);
        self.cursor.store(0, Ordering::Release);
        self.pass.store(0, Ordering::Release);
        log::debug!("Tile scheduler: {}x{} split into {} tiles.", width, height, self.tile_count());
    }

    /// Prepares the barriers for a new render run with `threads` workers.
    pub fn begin_run(&self, threads: usize) {
        self.pre_render.reset(threads);
        self.post_render.reset(threads);
        self.cursor.store(0, Ordering::Release);
        self.pass.store(0, Ordering::Release);
    }

    pub fn tiles(&self) -> Vec<Tile> {
        self.tiles.read().clone()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.read().len()
    }

    pub fn next_task(&self) -> Option<TileClaim> {
        let tiles = self.tiles.read();
        let index = self.cursor.fetch_add(1, Ordering::AcqRel);
        tiles.get(index).map(|tile| TileClaim {
            tile: *tile,
            index,
            pass: self.pass.load(Ordering::Acquire),
        })
    }

    /// Repopulates the queue for the next pass. Called by exactly one thread
    /// while all others are held at the post-render barrier.
    pub fn reset_tasks(&self) {
        self.pass.fetch_add(1, Ordering::AcqRel);
        self.cursor.store(0, Ordering::Release);
    }

    pub fn pass(&self) -> u32 {
        self.pass.load(Ordering::Acquire)
    }

    pub fn state(&self) -> SchedulerState {
        let len = self.tile_count();
        let cursor = self.cursor.load(Ordering::Acquire);
        if len == 0 {
            SchedulerState::Idle
        } else if cursor == 0 {
            SchedulerState::Populated
        } else if cursor < len {
            SchedulerState::Draining
        } else {
            SchedulerState::Drained
        }
    }

    pub fn set_abort(&self, abort: bool) {
        self.abort.store(abort, Ordering::Release);
        if abort {
            self.pre_render.wake_all();
            self.post_render.wake_all();
        }
    }

    pub fn aborted(&self) -> bool {
        self.abort.load(Ordering::Acquire)
    }

    pub fn sync_threads_pre_render(&self, thread_id: usize) -> bool {
        let released = self.pre_render.wait(&self.abort, || {
            log::trace!("Pass {} released by thread {}.", self.pass(), thread_id);
        });
        released && !self.aborted()
    }

    /// `serial` runs exactly once per pass, after every thread finished its
    /// tiles and before any thread is released into the next pass.
    pub fn sync_threads_post_render<F: FnOnce()>(&self, _thread_id: usize, serial: F) -> bool {
        self.post_render.wait(&self.abort, serial)
    }
}
