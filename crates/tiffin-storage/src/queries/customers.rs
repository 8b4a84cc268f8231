// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Customer CRUD operations.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use tiffin_core::{Customer, Location, TiffinError};

use crate::database::{Database, decode_ts, encode_ts, map_tr_err};

const CUSTOMER_COLUMNS: &str = "phone, name, total_orders, last_order_at, last_notified_at,
     location_latitude, location_longitude, location_address";

fn customer_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Customer> {
    let latitude: Option<f64> = row.get(5)?;
    let longitude: Option<f64> = row.get(6)?;
    let address: Option<String> = row.get(7)?;
    let last_known_location = match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(Location {
            latitude,
            longitude,
            address,
        }),
        _ => None,
    };
    Ok(Customer {
        phone: row.get(0)?,
        name: row.get(1)?,
        total_orders: row.get(2)?,
        last_order_at: decode_ts(row, 3)?,
        last_notified_at: decode_ts(row, 4)?,
        last_known_location,
    })
}

fn select_one(conn: &rusqlite::Connection, phone: &str) -> rusqlite::Result<Option<Customer>> {
    conn.query_row(
        &format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE phone = ?1"),
        params![phone],
        customer_from_row,
    )
    .optional()
}

/// Creates the customer if unknown. A given name replaces the stored one.
pub async fn record_contact(
    db: &Database,
    phone: &str,
    name: Option<&str>,
) -> Result<Customer, TiffinError> {
    let phone = phone.to_string();
    let name = name.map(str::to_string);
    let now = encode_ts(Utc::now());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO customers (phone, name, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT(phone) DO UPDATE SET
                     name = COALESCE(excluded.name, customers.name),
                     updated_at = excluded.updated_at",
                params![phone, name, now],
            )?;
            select_one(conn, &phone)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
        })
        .await
        .map_err(map_tr_err)
}

/// Stores the last known location, creating the customer if needed.
pub async fn update_location(
    db: &Database,
    phone: &str,
    location: &Location,
) -> Result<(), TiffinError> {
    let phone = phone.to_string();
    let location = location.clone();
    let now = encode_ts(Utc::now());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO customers (phone, location_latitude, location_longitude,
                                        location_address, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(phone) DO UPDATE SET
                     location_latitude = excluded.location_latitude,
                     location_longitude = excluded.location_longitude,
                     location_address = excluded.location_address,
                     updated_at = excluded.updated_at",
                params![
                    phone,
                    location.latitude,
                    location.longitude,
                    location.address,
                    now
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Bumps the order count and sets the last order time.
pub async fn record_order(db: &Database, phone: &str, at: DateTime<Utc>) -> Result<(), TiffinError> {
    let phone = phone.to_string();
    let at = encode_ts(at);
    let now = encode_ts(Utc::now());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO customers (phone, total_orders, last_order_at, created_at, updated_at)
                 VALUES (?1, 1, ?2, ?3, ?3)
                 ON CONFLICT(phone) DO UPDATE SET
                     total_orders = customers.total_orders + 1,
                     last_order_at = excluded.last_order_at,
                     updated_at = excluded.updated_at",
                params![phone, at, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get(db: &Database, phone: &str) -> Result<Option<Customer>, TiffinError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| select_one(conn, &phone))
        .await
        .map_err(map_tr_err)
}

/// Customers that have ordered at least once. Callers apply the time rules.
pub async fn list_ordering(db: &Database) -> Result<Vec<Customer>, TiffinError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CUSTOMER_COLUMNS} FROM customers
                 WHERE total_orders > 0 AND last_order_at IS NOT NULL
                 ORDER BY last_order_at ASC"
            ))?;
            let rows = stmt.query_map([], customer_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn mark_notified(db: &Database, phone: &str, at: DateTime<Utc>) -> Result<(), TiffinError> {
    let phone = phone.to_string();
    let at = encode_ts(at);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE customers SET last_notified_at = ?2, updated_at = ?2 WHERE phone = ?1",
                params![phone, at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn record_contact_creates_then_refreshes_name() {
        let db = Database::open_in_memory().await.unwrap();

        let created = record_contact(&db, "919000000001", Some("Asha")).await.unwrap();
        assert_eq!(created.name.as_deref(), Some("Asha"));
        assert_eq!(created.total_orders, 0);

        let renamed = record_contact(&db, "919000000001", Some("Asha K")).await.unwrap();
        assert_eq!(renamed.name.as_deref(), Some("Asha K"));

        let kept = record_contact(&db, "919000000001", None).await.unwrap();
        assert_eq!(kept.name.as_deref(), Some("Asha K"));
    }

    #[tokio::test]
    async fn record_order_increments_count() {
        let db = Database::open_in_memory().await.unwrap();
        let first = Utc::now() - chrono::Duration::days(5);
        let second = Utc::now() - chrono::Duration::days(3);

        record_order(&db, "919000000002", first).await.unwrap();
        record_order(&db, "919000000002", second).await.unwrap();

        let customer = get(&db, "919000000002").await.unwrap().unwrap();
        assert_eq!(customer.total_orders, 2);
        assert_eq!(
            customer.last_order_at.map(|t| t.timestamp_millis()),
            Some(second.timestamp_millis())
        );
    }

    #[tokio::test]
    async fn location_is_stored_and_replaced() {
        let db = Database::open_in_memory().await.unwrap();
        record_contact(&db, "919000000003", None).await.unwrap();

        let loc = Location {
            latitude: 17.44,
            longitude: 78.49,
            address: Some("Location shared via WhatsApp".into()),
        };
        update_location(&db, "919000000003", &loc).await.unwrap();

        let customer = get(&db, "919000000003").await.unwrap().unwrap();
        assert_eq!(customer.last_known_location, Some(loc));
    }

    #[tokio::test]
    async fn list_ordering_skips_customers_without_orders() {
        let db = Database::open_in_memory().await.unwrap();
        record_contact(&db, "919000000004", Some("Browser")).await.unwrap();
        record_order(&db, "919000000005", Utc::now()).await.unwrap();

        let ordering = list_ordering(&db).await.unwrap();
        assert_eq!(ordering.len(), 1);
        assert_eq!(ordering[0].phone, "919000000005");
    }

    #[tokio::test]
    async fn mark_notified_sets_timestamp() {
        let db = Database::open_in_memory().await.unwrap();
        record_order(&db, "919000000006", Utc::now()).await.unwrap();
        let at = Utc::now();
        mark_notified(&db, "919000000006", at).await.unwrap();
        let customer = get(&db, "919000000006").await.unwrap().unwrap();
        assert_eq!(
            customer.last_notified_at.map(|t| t.timestamp_millis()),
            Some(at.timestamp_millis())
        );
    }

    #[tokio::test]
    async fn get_unknown_is_none() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(get(&db, "nobody").await.unwrap().is_none());
    }
}
