use std::{fmt, sync::Arc};

use tokio::sync::watch;

/// Per-phase count of units of work that have not reached a terminal outcome.
#[derive(Clone)]
pub struct Outstanding {
    count: Arc<watch::Sender<usize>>,
}

/// One unit of outstanding work. Dropping it marks the unit terminal.
///
/// Not `Clone`: a unit is released exactly once no matter how many times it
/// is dispatched.
pub struct WorkToken {
    count: Arc<watch::Sender<usize>>,
}

impl Outstanding {
    pub fn new() -> Self {
        let (count, _) = watch::channel(0);
        Outstanding { count: Arc::new(count) }
    }

    pub fn begin(&self) -> WorkToken {
        self.count.send_modify(|n| *n += 1);
        WorkToken { count: self.count.clone() }
    }

    pub fn count(&self) -> usize {
        *self.count.borrow()
    }

    /// Resolves once every token handed out so far has been dropped.
    pub async fn drained(&self) {
        let mut rx = self.count.subscribe();
        // the sender lives in self, so this cannot observe a closed channel
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

impl Drop for WorkToken {
    fn drop(&mut self) {
        self.count.send_modify(|n| *n -= 1);
    }
}

impl fmt::Debug for WorkToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WorkToken")
    }
}
