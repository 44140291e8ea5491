// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! UMKM Admin Server - Program Application Backend
//!
//! Drives UMKM program applications through a two-stage approval workflow
//! and resolves encrypted PII fields through Vault transit, recording every
//! decrypt attempt.
//!
//! ## Modules
//!
//! - `lifecycle` - Application status machine with history records
//! - `pii` - Encrypted-field gateway with mandatory decrypt audit
//! - `providers` - Vault transit HTTP client
//! - `storage` - redb application store and JSONL decrypt log
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Bearer JWT authentication and role checks

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod pii;
pub mod providers;
pub mod state;
pub mod storage;
