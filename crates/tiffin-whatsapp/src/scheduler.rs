// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cancellable single-shot timers.
//!
//! A [`ScheduledTask`] owns a sleeping task that runs its callback once the
//! delay elapses. Cancelling or dropping the handle aborts the sleep, so a
//! callback never fires after its owner moved on. Callbacks also carry the
//! task id so the receiver can discard a firing that raced a cancellation.

use std::time::Duration;

use tokio::task::JoinHandle;

pub struct ScheduledTask {
    id: u64,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Runs `fire` with `id` after `delay`.
    pub fn schedule<F>(id: u64, delay: Duration, fire: F) -> Self
    where
        F: FnOnce(u64) + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fire(id);
        });
        Self { id, handle }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl std::fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTask").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let fired = Arc::new(AtomicU64::new(0));
        let seen = fired.clone();
        let task = ScheduledTask::schedule(7, Duration::from_secs(10), move |id| {
            seen.store(id, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 7);
        assert_eq!(task.id(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn replacing_a_task_cancels_the_old_one() {
        let fired = Arc::new(AtomicU64::new(0));
        let first = fired.clone();
        let second = fired.clone();
        let mut slot = Some(ScheduledTask::schedule(1, Duration::from_secs(5), move |id| {
            first.fetch_add(id, Ordering::SeqCst);
        }));
        tokio::time::sleep(Duration::from_secs(3)).await;
        slot = Some(ScheduledTask::schedule(10, Duration::from_secs(5), move |id| {
            second.fetch_add(id, Ordering::SeqCst);
        }));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 10);
        drop(slot);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels() {
        let fired = Arc::new(AtomicU64::new(0));
        let seen = fired.clone();
        {
            let _task = ScheduledTask::schedule(3, Duration::from_secs(5), move |id| {
                seen.store(id, Ordering::SeqCst);
            });
        }
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
