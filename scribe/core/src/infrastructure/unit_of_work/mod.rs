// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Unit of Work Implementations
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Storage sessions and the document repositories bound to them
//! - **Pattern:** Unit of Work, Repository (DDD)
//!
//! ## Available Implementations
//!
//! - **PostgresUnitOfWork** - one `sqlx` transaction per scope step
//! - **InMemoryUnitOfWork** - shared HashMap store for development and tests
//!
//! The matching factories are selected at startup: PostgreSQL when
//! `spec.database.url` (or `DATABASE_URL`) is set, in-memory otherwise.

pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryDocumentStore, InMemoryUnitOfWork, InMemoryUnitOfWorkFactory};
pub use postgres::{PostgresUnitOfWork, PostgresUnitOfWorkFactory};
