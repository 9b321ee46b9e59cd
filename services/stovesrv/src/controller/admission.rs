//! Operation admission
//!
//! One named operation may be active at a time. Callers asking for the active
//! name join it; callers asking for a different name wait until every holder
//! has released its permit.

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, info};

/// Full state refresh
pub const OP_STATE_REFRESH: &str = "state-refresh";
/// Chrono table read
pub const OP_CHRONO_READ: &str = "chrono-read";
/// Chrono table write
pub const OP_CHRONO_WRITE: &str = "chrono-write";

#[derive(Debug)]
struct ActiveOperation {
    name: &'static str,
    holders: usize,
}

/// Named admission token
#[derive(Debug, Default)]
pub struct OperationGate {
    current: Mutex<Option<ActiveOperation>>,
    released: Notify,
}

impl OperationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `name` may run
    pub async fn acquire(&self, name: &'static str) -> OperationPermit<'_> {
        let mut announced = false;
        loop {
            let notified = self.released.notified();
            tokio::pin!(notified);
            // Register before checking so a release in between is not missed
            notified.as_mut().enable();

            {
                let mut current = self.current.lock();
                match current.as_mut() {
                    None => {
                        *current = Some(ActiveOperation { name, holders: 1 });
                        debug!(operation = name, "Operation admitted");
                        return OperationPermit { gate: self, name };
                    },
                    Some(active) if active.name == name => {
                        active.holders += 1;
                        return OperationPermit { gate: self, name };
                    },
                    Some(active) => {
                        if !announced {
                            info!(
                                operation = name,
                                active = active.name,
                                "Waiting for running operation to finish"
                            );
                            announced = true;
                        }
                    },
                }
            }

            notified.await;
        }
    }

    /// Name of the running operation, if any
    pub fn active(&self) -> Option<&'static str> {
        self.current.lock().as_ref().map(|op| op.name)
    }

    pub fn holders(&self) -> usize {
        self.current.lock().as_ref().map_or(0, |op| op.holders)
    }

    fn release(&self) {
        let now_idle = {
            let mut current = self.current.lock();
            match current.as_mut() {
                Some(active) if active.holders > 1 => {
                    active.holders -= 1;
                    false
                },
                Some(_) => {
                    *current = None;
                    true
                },
                None => false,
            }
        };
        if now_idle {
            self.released.notify_waiters();
        }
    }
}

/// Held while an admitted operation runs
#[derive(Debug)]
pub struct OperationPermit<'a> {
    gate: &'a OperationGate,
    name: &'static str,
}

impl OperationPermit<'_> {
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Drop for OperationPermit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}
