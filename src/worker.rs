//! Single-worker execution for all device I/O.
//!
//! Control transfers to one camera must never overlap, so every operation is
//! funnelled through one [`Executor`] that owns the device state and runs jobs
//! strictly in submission order.

use std::sync::Mutex;
use std::thread::JoinHandle;

use crossbeam_channel::Sender;

use crate::error::{PtzError, Result};

/// A unit of work run against the worker-owned state.
pub type Job<S> = Box<dyn FnOnce(&mut S) + Send>;

/// FIFO executor owning a state value of type `S`.
pub trait Executor<S> {
    /// Queue `job`.  Jobs run one at a time in submission order.
    fn submit(&self, job: Job<S>) -> Result<()>;
}

/// Dedicated named thread fed by an unbounded channel.
///
/// Dropping the worker closes the queue, lets queued jobs finish, and joins
/// the thread.
pub struct WorkerThread<S> {
    sender: Option<Sender<Job<S>>>,
    thread: Option<JoinHandle<()>>,
}

impl<S: Send + 'static> WorkerThread<S> {
    pub fn spawn(name: &str, state: S) -> Result<Self> {
        let (sender, receiver) = crossbeam_channel::unbounded::<Job<S>>();
        let thread = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut state = state;
                for job in receiver {
                    job(&mut state);
                }
                log::trace!("worker queue closed");
            })
            .map_err(PtzError::WorkerSpawn)?;

        Ok(Self {
            sender: Some(sender),
            thread: Some(thread),
        })
    }
}

impl<S> Executor<S> for WorkerThread<S> {
    fn submit(&self, job: Job<S>) -> Result<()> {
        self.sender
            .as_ref()
            .ok_or(PtzError::WorkerGone)?
            .send(job)
            .map_err(|_| PtzError::WorkerGone)
    }
}

impl<S> Drop for WorkerThread<S> {
    fn drop(&mut self) {
        drop(self.sender.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("PTZ worker panicked");
            }
        }
    }
}

/// Runs each job immediately on the submitting thread.
///
/// A job must not submit to the same executor, it would deadlock.
pub struct InlineExecutor<S> {
    state: Mutex<S>,
}

impl<S> InlineExecutor<S> {
    pub fn new(state: S) -> Self {
        Self { state: Mutex::new(state) }
    }

    /// Inspect the state between jobs.
    pub fn with_state<T>(&self, f: impl FnOnce(&mut S) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }
}

impl<S> Executor<S> for InlineExecutor<S> {
    fn submit(&self, job: Job<S>) -> Result<()> {
        self.with_state(job);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_runs_jobs_in_order() {
        let (tx, rx) = crossbeam_channel::unbounded();
        {
            let worker = WorkerThread::spawn("test-worker", Vec::<u32>::new()).unwrap();
            for i in 0..50 {
                worker.submit(Box::new(move |log: &mut Vec<u32>| log.push(i))).unwrap();
            }
            worker
                .submit(Box::new(move |log: &mut Vec<u32>| tx.send(log.clone()).unwrap()))
                .unwrap();
        }
        assert_eq!(rx.recv().unwrap(), (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn worker_gone_after_panic() {
        let worker = WorkerThread::spawn("test-panic", 0u8).unwrap();
        worker.submit(Box::new(|_: &mut u8| panic!("boom"))).unwrap();
        // The receiver is dropped once the thread unwinds.
        let mut gone = false;
        for _ in 0..200 {
            if worker.submit(Box::new(|_: &mut u8| {})).is_err() {
                gone = true;
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert!(gone);
    }

    #[test]
    fn inline_runs_synchronously() {
        let exec = InlineExecutor::new(0u32);
        exec.submit(Box::new(|n: &mut u32| *n += 2)).unwrap();
        exec.submit(Box::new(|n: &mut u32| *n *= 10)).unwrap();
        assert_eq!(exec.with_state(|n| *n), 20);
    }
}
