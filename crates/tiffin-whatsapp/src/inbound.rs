// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound message handling.
//!
//! Every decoded chat message is recorded against its customer, routed, and
//! answered. A failure anywhere in that chain turns into a generic apology
//! so the customer is never left without a reply.

use std::sync::Arc;
use std::time::Duration;

use tiffin_bus::EventBus;
use tiffin_core::{
    CustomerStore, InboundMessage, MessageRouter, MessageSender, RouterAction, TiffinError,
};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Sent when routing or replying fails.
pub const APOLOGY: &str = "Oops! Something went wrong while processing your request. Please try again or type \"Help\" for options.";

pub struct InboundDispatcher {
    router: Arc<dyn MessageRouter>,
    customers: Arc<dyn CustomerStore>,
    bus: EventBus,
    timeout: Duration,
}

impl InboundDispatcher {
    /// `timeout` bounds a single routing call.
    pub fn new(
        router: Arc<dyn MessageRouter>,
        customers: Arc<dyn CustomerStore>,
        bus: EventBus,
        timeout: Duration,
    ) -> Self {
        Self {
            router,
            customers,
            bus,
            timeout,
        }
    }

    /// Processes `message` on its own task.
    pub fn dispatch(
        self: &Arc<Self>,
        message: InboundMessage,
        sender: Arc<dyn MessageSender>,
    ) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.process(message, sender.as_ref()).await })
    }

    pub async fn process(&self, message: InboundMessage, sender: &dyn MessageSender) {
        let phone = message.phone();
        if phone.is_empty() {
            self.bus.log(format!(
                "Skipping message with invalid sender id: {}",
                message.sender_id
            ));
            return;
        }

        if let Err(e) = self.handle(&phone, &message, sender).await {
            warn!(phone = %phone, error = %e, "inbound message processing failed");
            self.bus
                .log(format!("Error processing message from {phone}: {e}"));
            if let Err(send_err) = sender.send_text(&message.sender_id, APOLOGY).await {
                warn!(phone = %phone, error = %send_err, "failed to send apology");
            }
        }
    }

    async fn handle(
        &self,
        phone: &str,
        message: &InboundMessage,
        sender: &dyn MessageSender,
    ) -> Result<(), TiffinError> {
        self.customers
            .record_contact(phone, message.notify_name.as_deref())
            .await?;

        let reply = tokio::time::timeout(self.timeout, self.router.route(message))
            .await
            .map_err(|_| TiffinError::Timeout {
                duration: self.timeout,
            })??;

        for action in &reply.actions {
            match action {
                RouterAction::UpdateCustomerLocation(location) => {
                    self.customers.update_location(phone, location).await?;
                    self.bus.log(format!("Updated location for {phone}."));
                }
            }
        }

        match reply.text {
            Some(text) => {
                sender.send_text(&message.sender_id, &text).await?;
                self.bus.log(format!("Sent reply to {}.", message.sender_id));
            }
            None => debug!(phone, "router produced no reply"),
        }
        Ok(())
    }
}
