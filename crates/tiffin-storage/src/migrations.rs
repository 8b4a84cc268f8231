// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded database migrations using refinery.
//!
//! SQL files under `migrations/` are compiled into the binary and applied on
//! every [`Database::open`](crate::Database::open).

use tiffin_core::TiffinError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Runs all pending migrations. Applied versions are tracked in
/// `refinery_schema_history`.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), TiffinError> {
    embedded::migrations::runner()
        .run(conn)
        .map_err(|e| TiffinError::Storage {
            source: Box::new(e),
        })?;
    Ok(())
}
