use parking_lot::Mutex;

pub type QueuedOp = Box<dyn FnOnce() + Send>;

/// Holds operations requested before the engine has a catalog. Once the
/// first catalog (cached or fetched) lands, the gate opens and the
/// backlog drains exactly once; later operations run straight away.
pub struct ReadyGate {
    state: Mutex<GateState>,
}

struct GateState {
    open: bool,
    queue: Vec<QueuedOp>,
}

impl Default for ReadyGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadyGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState { open: false, queue: Vec::new() }),
        }
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    /// Runs `op` now when open, queues it otherwise. The op is executed
    /// outside the gate lock.
    pub fn run_or_queue(&self, op: QueuedOp) {
        {
            let mut state = self.state.lock();
            if !state.open {
                state.queue.push(op);
                return;
            }
        }
        op();
    }

    /// Opens the gate and hands back the backlog. A second call returns
    /// nothing; the backlog drains exactly once.
    #[must_use = "queued operations must be executed by the caller"]
    pub fn open(&self) -> Vec<QueuedOp> {
        let mut state = self.state.lock();
        state.open = true;
        std::mem::take(&mut state.queue)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    fn counter_op(counter: &Arc<AtomicUsize>) -> QueuedOp {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn closed_gate_queues_until_open() {
        let gate = ReadyGate::new();
        let ran = Arc::new(AtomicUsize::new(0));

        gate.run_or_queue(counter_op(&ran));
        gate.run_or_queue(counter_op(&ran));
        assert_eq!(ran.load(Ordering::SeqCst), 0);

        for op in gate.open() {
            op();
        }
        assert_eq!(ran.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn open_gate_runs_immediately() {
        let gate = ReadyGate::new();
        let ran = Arc::new(AtomicUsize::new(0));

        assert!(gate.open().is_empty());
        gate.run_or_queue(counter_op(&ran));
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backlog_drains_exactly_once() {
        let gate = ReadyGate::new();
        let ran = Arc::new(AtomicUsize::new(0));

        gate.run_or_queue(counter_op(&ran));
        assert_eq!(gate.open().len(), 1);
        assert!(gate.open().is_empty());
    }
}
