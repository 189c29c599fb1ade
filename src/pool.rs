//! A growable pool of [`Worker`]s sharing one server script.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::worker::{Request, Response, Worker, checksum};
use crate::Result;

#[derive(Debug)]
struct State {
    code: String,
    version: String,
    idle: VecDeque<Worker>,
}

impl State {
    /// Pop idle workers until one runs the current code. Workers skipped on
    /// the way are returned so they can be closed outside the pool lock.
    fn checkout(&mut self) -> (Option<Worker>, Vec<Worker>) {
        let mut retired = Vec::new();
        while let Some(worker) = self.idle.pop_front() {
            if worker.version() == self.version && !worker.is_closed() {
                return (Some(worker), retired);
            }
            retired.push(worker);
        }
        (None, retired)
    }
}

/// Hands out workers running the current code, creating them on demand.
///
/// Updating the code retires idle workers lazily: a worker checked out
/// under the old code finishes its request and is discarded on its next
/// checkout.
#[derive(Debug)]
pub struct Pool {
    state: Mutex<State>,
}

impl Pool {
    /// Create a pool and load `code` into its first worker.
    pub fn new(code: &str) -> Result<Self> {
        let worker = Worker::new(code)?;
        Ok(Self {
            state: Mutex::new(State {
                code: code.to_string(),
                version: worker.version().to_string(),
                idle: VecDeque::from([worker]),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Switch to `code`. If it fails to load, the current code stays active.
    pub fn update_code(&self, code: &str) -> Result<()> {
        let worker = Worker::new(code)?;
        let retired = {
            let mut state = self.lock();
            state.code = code.to_string();
            state.version = checksum(code);
            std::mem::replace(&mut state.idle, VecDeque::from([worker]))
        };
        tracing::debug!(retired = retired.len(), "pool code updated");
        for worker in retired {
            worker.close();
        }
        Ok(())
    }

    /// Check out an idle worker on the current code, or create one.
    pub fn get(&self) -> Result<Worker> {
        // `Err` carries the code to build a fresh worker from.
        let (found, retired) = {
            let mut state = self.lock();
            let (found, retired) = state.checkout();
            (found.ok_or_else(|| state.code.clone()), retired)
        };
        for worker in retired {
            worker.close();
        }
        match found {
            Ok(worker) => Ok(worker),
            Err(code) => Worker::new(&code),
        }
    }

    /// Return a worker for reuse.
    pub fn put(&self, worker: Worker) {
        self.lock().idle.push_back(worker);
    }

    /// Render on a pooled worker. A worker whose render failed is closed
    /// instead of returned.
    pub fn render(&self, request: &Request) -> Result<Response> {
        let worker = self.get()?;
        match worker.render(request) {
            Ok(response) => {
                self.put(worker);
                Ok(response)
            }
            Err(err) => {
                worker.close();
                Err(err)
            }
        }
    }

    /// Number of idle workers.
    pub fn idle(&self) -> usize {
        self.lock().idle.len()
    }
}
