use tokio::task::JoinHandle;

/// Owner of at most one background task. Arming a new task aborts the old one,
/// and so does dropping the slot.
#[derive(Debug, Default)]
pub struct TaskSlot {
    handle: Option<JoinHandle<()>>,
}

impl TaskSlot {
    pub fn replace(&mut self, handle: JoinHandle<()>) {
        self.cancel();
        self.handle = Some(handle);
    }

    /// Abort the held task, if any. Returns whether a live task was stopped.
    /// Safe to call any number of times.
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(h) => {
                let live = !h.is_finished();
                h.abort();
                live
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
