use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

/// Work that must run on the presentation loop with access to its state `C`.
pub type UiTask<C> = Box<dyn FnOnce(&mut C) + Send + 'static>;

/// Queue of [`UiTask`]s posted from background threads.
///
/// The presentation loop owns the dispatcher and calls [`UiDispatcher::drain`]
/// on its poll tick; background threads only ever hold a [`UiScheduler`].
pub struct UiDispatcher<C> {
    tx: Sender<UiTask<C>>,
    rx: Receiver<UiTask<C>>,
}

impl<C> UiDispatcher<C> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub fn scheduler(&self) -> UiScheduler<C> {
        UiScheduler {
            tx: self.tx.clone(),
        }
    }

    /// Take all pending tasks in posting order.
    pub fn drain(&self) -> Vec<UiTask<C>> {
        let mut tasks = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(task) => tasks.push(task),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        tasks
    }

    /// Drain and run every pending task against `context`.
    pub fn run_pending(&self, context: &mut C) -> usize {
        let tasks = self.drain();
        let count = tasks.len();
        for task in tasks {
            task(context);
        }
        count
    }
}

impl<C> Default for UiDispatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle used by background threads to post work onto the presentation loop.
pub struct UiScheduler<C> {
    tx: Sender<UiTask<C>>,
}

impl<C> UiScheduler<C> {
    /// Queue `task`; returns `false` when the presentation loop has shut down.
    pub fn schedule<F>(&self, task: F) -> bool
    where
        F: FnOnce(&mut C) + Send + 'static,
    {
        self.tx.send(Box::new(task)).is_ok()
    }
}

impl<C> Clone for UiScheduler<C> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<C> fmt::Debug for UiScheduler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiScheduler").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn tasks_run_on_the_draining_thread_in_order() {
        let dispatcher = UiDispatcher::<Vec<u32>>::new();
        let scheduler = dispatcher.scheduler();
        thread::spawn(move || {
            for value in 0..5 {
                assert!(scheduler.schedule(move |log: &mut Vec<u32>| log.push(value)));
            }
        })
        .join()
        .unwrap();

        let mut log = Vec::new();
        assert_eq!(dispatcher.run_pending(&mut log), 5);
        assert_eq!(log, vec![0, 1, 2, 3, 4]);
        assert_eq!(dispatcher.run_pending(&mut log), 0);
    }

    #[test]
    fn scheduling_after_shutdown_reports_false() {
        let dispatcher = UiDispatcher::<()>::new();
        let scheduler = dispatcher.scheduler();
        drop(dispatcher);
        assert!(!scheduler.schedule(|_| {}));
    }
}
