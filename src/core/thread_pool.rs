// Copyright @yucwang 2026

use crate::core::error::{RenderError, RenderResult};

use crossbeam_channel::{unbounded, Sender};
use parking_lot::{Condvar, Mutex};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct Outstanding {
    count: Mutex<usize>,
    idle: Condvar,
}

/// Fixed set of long-lived worker threads fed from one task queue.
pub struct ThreadPool {
    sender: Option<Sender<Task>>,
    workers: Vec<JoinHandle<()>>,
    outstanding: Arc<Outstanding>,
}

impl ThreadPool {
    pub fn new(thread_count: usize) -> RenderResult<Self> {
        if thread_count == 0 {
            return Err(RenderError::InvalidJob(String::from("thread pool needs at least one thread")));
        }

        let (sender, receiver) = unbounded::<Task>();
        let outstanding = Arc::new(Outstanding::default());
        let mut workers = Vec::with_capacity(thread_count);
        for index in 0..thread_count {
            let receiver = receiver.clone();
            let outstanding = Arc::clone(&outstanding);
            let handle = thread::Builder::new()
                .name(format!("render-worker-{}", index))
                .spawn(move || {
                    for task in receiver.iter() {
                        // The task and everything it captured is gone before
                        // the outstanding count drops.
                        if catch_unwind(AssertUnwindSafe(task)).is_err() {
                            log::error!("Render worker {} task panicked.", index);
                        }
                        let mut count = outstanding.count.lock();
                        *count -= 1;
                        if *count == 0 {
                            outstanding.idle.notify_all();
                        }
                    }
                })?;
            workers.push(handle);
        }
        log::info!("Thread pool started with {} workers.", thread_count);

        Ok(Self { sender: Some(sender), workers, outstanding })
    }

    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }

    pub fn execute<F: FnOnce() + Send + 'static>(&self, task: F) {
        *self.outstanding.count.lock() += 1;
        if let Some(sender) = &self.sender {
            if sender.send(Box::new(task)).is_err() {
                *self.outstanding.count.lock() -= 1;
            }
        }
    }

    pub fn outstanding(&self) -> usize {
        *self.outstanding.count.lock()
    }

    /// Blocks until every queued task has finished.
    pub fn join_all(&self) {
        let mut count = self.outstanding.count.lock();
        while *count > 0 {
            self.outstanding.idle.wait(&mut count);
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.sender.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}
