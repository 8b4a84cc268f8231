// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each function takes `&Database` and runs on the
//! connection's background thread.

pub mod connection_status;
pub mod customers;
