// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording sender and scripted router.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use tiffin_core::{InboundMessage, MessageRouter, MessageSender, RouterReply, TiffinError};

/// `MessageSender` that records successful sends.
#[derive(Default)]
pub struct MockSender {
    ready: AtomicBool,
    sent: Mutex<Vec<(String, String)>>,
    failing: Mutex<HashSet<String>>,
    attempts: AtomicUsize,
}

impl MockSender {
    /// A sender that reports ready.
    pub fn ready() -> Self {
        let sender = Self::default();
        sender.set_ready(true);
        sender
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Makes every send to `to` fail.
    pub async fn fail_for(&self, to: &str) {
        self.failing.lock().await.insert(to.to_string());
    }

    /// Successful sends as `(to, body)`.
    pub async fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }

    /// Every `send_text` call, including failed ones.
    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageSender for MockSender {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn send_text(&self, to: &str, body: &str) -> Result<(), TiffinError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.is_ready() {
            return Err(TiffinError::NotReady);
        }
        if self.failing.lock().await.contains(to) {
            return Err(TiffinError::transport(format!("mock send to {to} failed")));
        }
        self.sent
            .lock()
            .await
            .push((to.to_string(), body.to_string()));
        Ok(())
    }
}

/// How a [`MockRouter`] answers.
#[derive(Debug, Clone)]
pub enum RouterBehavior {
    Reply(RouterReply),
    Fail(String),
    /// Never answers.
    Hang,
}

/// `MessageRouter` with a fixed behavior, recording routed bodies.
pub struct MockRouter {
    behavior: RouterBehavior,
    routed: Mutex<Vec<String>>,
}

impl MockRouter {
    pub fn new(behavior: RouterBehavior) -> Self {
        Self {
            behavior,
            routed: Mutex::new(Vec::new()),
        }
    }

    /// Shorthand for a router that always replies with `text`.
    pub fn replying(text: &str) -> Self {
        Self::new(RouterBehavior::Reply(RouterReply::text(text)))
    }

    pub async fn routed(&self) -> Vec<String> {
        self.routed.lock().await.clone()
    }
}

#[async_trait]
impl MessageRouter for MockRouter {
    async fn route(&self, message: &InboundMessage) -> Result<RouterReply, TiffinError> {
        self.routed.lock().await.push(message.body.clone());
        match &self.behavior {
            RouterBehavior::Reply(reply) => Ok(reply.clone()),
            RouterBehavior::Fail(message) => Err(TiffinError::Router {
                message: message.clone(),
            }),
            RouterBehavior::Hang => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sender_respects_readiness_and_failures() {
        let sender = MockSender::default();
        assert!(matches!(
            sender.send_text("a@c.us", "x").await,
            Err(TiffinError::NotReady)
        ));

        sender.set_ready(true);
        sender.fail_for("b@c.us").await;
        sender.send_text("a@c.us", "x").await.unwrap();
        assert!(sender.send_text("b@c.us", "y").await.is_err());

        assert_eq!(sender.attempt_count(), 3);
        assert_eq!(
            sender.sent_messages().await,
            vec![("a@c.us".to_string(), "x".to_string())]
        );
    }
}
