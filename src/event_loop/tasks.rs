use std::collections::VecDeque;
use std::sync::Mutex;

/// A posted action.
pub(crate) type Task = Box<dyn FnOnce() + Send + 'static>;

/// Cross-thread FIFO of posted tasks.
///
/// This is the only piece of loop state shared with other threads;
/// everything else is confined to the loop thread. Posting pairs a
/// push here with a poller wake-up, so a blocked poll returns and
/// drains the queue on its next turn.
pub(crate) struct TaskQueue {
    tasks: Mutex<VecDeque<Task>>,
}

impl TaskQueue {
    pub(crate) fn new() -> Self {
        Self {
            tasks: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) fn push(&self, task: Task) {
        self.tasks.lock().unwrap().push_back(task);
    }

    /// Takes a snapshot of the pending tasks.
    ///
    /// The drain operates on the snapshot only: tasks posted while it
    /// executes land in the queue for the next turn, so a task that
    /// keeps reposting itself cannot starve the loop.
    pub(crate) fn drain(&self) -> VecDeque<Task> {
        std::mem::take(&mut *self.tasks.lock().unwrap())
    }
}
