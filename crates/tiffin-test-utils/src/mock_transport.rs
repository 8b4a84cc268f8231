// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted transport for deterministic lifecycle tests.
//!
//! `MockConnector` implements `TransportConnector`. Each `connect` call
//! consumes the next scripted [`ConnectOutcome`] (succeeding once the script
//! runs dry), records the request, and keeps the event sender so tests can
//! inject lifecycle events with [`MockConnector::emit`].

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify, mpsc};

use tiffin_core::{ConnectRequest, TiffinError, TransportConnector, TransportEvent, TransportHandle};

/// What the next `connect` call does.
#[derive(Debug, Clone)]
pub enum ConnectOutcome {
    Succeed,
    Fail(String),
    /// Never returns; only the controller's init timeout ends it.
    Hang,
}

#[derive(Default)]
struct Shared {
    script: Mutex<VecDeque<ConnectOutcome>>,
    requests: Mutex<Vec<ConnectRequest>>,
    events: Mutex<Option<mpsc::Sender<TransportEvent>>>,
    sent: Mutex<Vec<(String, String)>>,
    shutdowns: AtomicUsize,
    fail_sends: AtomicBool,
    connected: Notify,
}

/// A mock transport connector. Clones share state.
#[derive(Clone, Default)]
pub struct MockConnector {
    shared: Arc<Shared>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an outcome for a future `connect` call.
    pub async fn script(&self, outcome: ConnectOutcome) {
        self.shared.script.lock().await.push_back(outcome);
    }

    /// Scripts the next `n` connects to fail.
    pub async fn fail_next(&self, n: usize, message: &str) {
        let mut script = self.shared.script.lock().await;
        for _ in 0..n {
            script.push_back(ConnectOutcome::Fail(message.to_string()));
        }
    }

    pub async fn connect_count(&self) -> usize {
        self.shared.requests.lock().await.len()
    }

    pub async fn requests(&self) -> Vec<ConnectRequest> {
        self.shared.requests.lock().await.clone()
    }

    /// Waits until at least `n` connects have been attempted.
    pub async fn wait_for_connects(&self, n: usize) {
        loop {
            let notified = self.shared.connected.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.connect_count().await >= n {
                return;
            }
            notified.await;
        }
    }

    /// Delivers `event` on the most recent attempt's channel.
    pub async fn emit(&self, event: TransportEvent) -> bool {
        let sender = self.shared.events.lock().await.clone();
        match sender {
            Some(sender) => sender.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Messages passed to any handle's `send_text`, as `(to, body)`.
    pub async fn sent_messages(&self) -> Vec<(String, String)> {
        self.shared.sent.lock().await.clone()
    }

    pub fn shutdown_count(&self) -> usize {
        self.shared.shutdowns.load(Ordering::SeqCst)
    }

    /// Makes every handle's `send_text` fail.
    pub fn set_send_failure(&self, fail: bool) {
        self.shared.fail_sends.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TransportConnector for MockConnector {
    async fn connect(
        &self,
        request: ConnectRequest,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn TransportHandle>, TiffinError> {
        let outcome = self
            .shared
            .script
            .lock()
            .await
            .pop_front()
            .unwrap_or(ConnectOutcome::Succeed);
        self.shared.requests.lock().await.push(request);
        *self.shared.events.lock().await = Some(events);
        self.shared.connected.notify_waiters();

        match outcome {
            ConnectOutcome::Succeed => Ok(Box::new(MockHandle {
                shared: self.shared.clone(),
            })),
            ConnectOutcome::Fail(message) => Err(TiffinError::transport(message)),
            ConnectOutcome::Hang => std::future::pending().await,
        }
    }
}

struct MockHandle {
    shared: Arc<Shared>,
}

#[async_trait]
impl TransportHandle for MockHandle {
    async fn send_text(&self, to: &str, body: &str) -> Result<(), TiffinError> {
        if self.shared.fail_sends.load(Ordering::SeqCst) {
            return Err(TiffinError::transport("mock send failure"));
        }
        self.shared
            .sent
            .lock()
            .await
            .push((to.to_string(), body.to_string()));
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), TiffinError> {
        self.shared.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn request() -> ConnectRequest {
        ConnectRequest {
            client_id: "admin".into(),
            session_dir: PathBuf::from("/tmp/session"),
        }
    }

    #[tokio::test]
    async fn follows_script_then_succeeds() {
        let connector = MockConnector::new();
        connector.fail_next(1, "boom").await;

        let (tx, _rx) = mpsc::channel(4);
        assert!(connector.connect(request(), tx.clone()).await.is_err());
        let handle = connector.connect(request(), tx).await.unwrap();
        handle.send_text("91@c.us", "hi").await.unwrap();
        handle.shutdown().await.unwrap();

        assert_eq!(connector.connect_count().await, 2);
        assert_eq!(
            connector.sent_messages().await,
            vec![("91@c.us".to_string(), "hi".to_string())]
        );
        assert_eq!(connector.shutdown_count(), 1);
    }

    #[tokio::test]
    async fn emit_uses_latest_channel() {
        let connector = MockConnector::new();
        assert!(!connector.emit(TransportEvent::Ready).await);

        let (tx, mut rx) = mpsc::channel(4);
        let _handle = connector.connect(request(), tx).await.unwrap();
        assert!(connector.emit(TransportEvent::Ready).await);
        assert_eq!(rx.recv().await, Some(TransportEvent::Ready));
    }
}
