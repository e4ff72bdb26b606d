// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Scribe core
//!
//! Tenant-scoped document store with a transactional command bus and
//! streamed AI summaries.
//!
//! # Architecture
//!
//! - **Domain:** documents, commands, events, provider interfaces, config
//! - **Application:** unit of work, message bus, handlers, views, summary streams
//! - **Infrastructure:** PostgreSQL and in-memory storage, secrets, LLM backends
//! - **Presentation:** Axum HTTP API

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
