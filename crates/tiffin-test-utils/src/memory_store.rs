// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory store fakes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use tiffin_core::{ConnectionRecord, Customer, CustomerStore, Location, SessionStore, TiffinError};

/// `SessionStore` that keeps every saved record.
#[derive(Default)]
pub struct InMemorySessionStore {
    current: Mutex<Option<ConnectionRecord>>,
    history: Mutex<Vec<ConnectionRecord>>,
    fail_saves: AtomicBool,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with a persisted record, as after a process restart.
    pub fn with_record(record: ConnectionRecord) -> Self {
        Self {
            current: Mutex::new(Some(record)),
            ..Self::default()
        }
    }

    pub async fn current(&self) -> Option<ConnectionRecord> {
        self.current.lock().await.clone()
    }

    /// Every record passed to `save`, in order.
    pub async fn history(&self) -> Vec<ConnectionRecord> {
        self.history.lock().await.clone()
    }

    /// Makes `save` fail from now on.
    pub fn set_save_failure(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self) -> Result<Option<ConnectionRecord>, TiffinError> {
        Ok(self.current.lock().await.clone())
    }

    async fn save(&self, record: &ConnectionRecord) -> Result<(), TiffinError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(TiffinError::Storage {
                source: "mock save failure".into(),
            });
        }
        *self.current.lock().await = Some(record.clone());
        self.history.lock().await.push(record.clone());
        Ok(())
    }
}

/// `CustomerStore` backed by a map, counting every write.
#[derive(Default)]
pub struct InMemoryCustomerStore {
    customers: Mutex<HashMap<String, Customer>>,
    writes: AtomicUsize,
}

impl InMemoryCustomerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a customer without counting a write.
    pub async fn insert(&self, customer: Customer) {
        self.customers
            .lock()
            .await
            .insert(customer.phone.clone(), customer);
    }

    pub async fn customer(&self, phone: &str) -> Option<Customer> {
        self.customers.lock().await.get(phone).cloned()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn count_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CustomerStore for InMemoryCustomerStore {
    async fn record_contact(
        &self,
        phone: &str,
        name: Option<&str>,
    ) -> Result<Customer, TiffinError> {
        self.count_write();
        let mut customers = self.customers.lock().await;
        let customer = customers
            .entry(phone.to_string())
            .or_insert_with(|| Customer::new(phone));
        if let Some(name) = name {
            customer.name = Some(name.to_string());
        }
        Ok(customer.clone())
    }

    async fn update_location(&self, phone: &str, location: &Location) -> Result<(), TiffinError> {
        self.count_write();
        self.customers
            .lock()
            .await
            .entry(phone.to_string())
            .or_insert_with(|| Customer::new(phone))
            .last_known_location = Some(location.clone());
        Ok(())
    }

    async fn record_order(&self, phone: &str, at: DateTime<Utc>) -> Result<(), TiffinError> {
        self.count_write();
        let mut customers = self.customers.lock().await;
        let customer = customers
            .entry(phone.to_string())
            .or_insert_with(|| Customer::new(phone));
        customer.total_orders += 1;
        customer.last_order_at = Some(at);
        Ok(())
    }

    async fn get(&self, phone: &str) -> Result<Option<Customer>, TiffinError> {
        Ok(self.customer(phone).await)
    }

    async fn due_for_reorder(
        &self,
        now: DateTime<Utc>,
        notify_gap: chrono::Duration,
        order_gap: chrono::Duration,
    ) -> Result<Vec<Customer>, TiffinError> {
        let mut due: Vec<Customer> = self
            .customers
            .lock()
            .await
            .values()
            .filter(|c| c.is_due_for_reorder(now, notify_gap, order_gap))
            .cloned()
            .collect();
        due.sort_by(|a, b| a.phone.cmp(&b.phone));
        Ok(due)
    }

    async fn mark_notified(&self, phone: &str, at: DateTime<Utc>) -> Result<(), TiffinError> {
        self.count_write();
        match self.customers.lock().await.get_mut(phone) {
            Some(customer) => {
                customer.last_notified_at = Some(at);
                Ok(())
            }
            None => Err(TiffinError::Internal(format!("unknown customer {phone}"))),
        }
    }
}
