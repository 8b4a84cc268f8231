// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The single-row connection status record.

use std::str::FromStr;

use rusqlite::params;
use tiffin_core::{ConnectionRecord, ConnectionState, TiffinError};

use crate::database::{Database, decode_ts, encode_ts, map_tr_err};

/// Loads the record, or `None` before the first save.
pub async fn load(db: &Database) -> Result<Option<ConnectionRecord>, TiffinError> {
    db.connection()
        .call(|conn| {
            let result = conn.query_row(
                "SELECT status, last_authenticated_at, halted, updated_at
                 FROM connection_status WHERE id = 1",
                [],
                |row| {
                    let raw: String = row.get(0)?;
                    let status = ConnectionState::from_str(&raw).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            0,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?;
                    Ok(ConnectionRecord {
                        status,
                        last_authenticated_at: decode_ts(row, 1)?,
                        halted: row.get(2)?,
                        updated_at: decode_ts(row, 3)?.unwrap_or_default(),
                    })
                },
            );
            match result {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Upserts the record.
pub async fn save(db: &Database, record: &ConnectionRecord) -> Result<(), TiffinError> {
    let status = record.status.as_str();
    let last_auth = record.last_authenticated_at.map(encode_ts);
    let halted = record.halted;
    let updated_at = encode_ts(record.updated_at);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO connection_status (id, status, last_authenticated_at, halted, updated_at)
                 VALUES (1, ?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                     status = excluded.status,
                     last_authenticated_at = excluded.last_authenticated_at,
                     halted = excluded.halted,
                     updated_at = excluded.updated_at",
                params![status, last_auth, halted, updated_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
