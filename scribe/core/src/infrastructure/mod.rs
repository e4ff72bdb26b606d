// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Infrastructure Layer
//!
//! Adapters behind the domain and application interfaces: PostgreSQL and
//! in-memory units of work, the committed-event broadcast bus, tenant secrets
//! and the LLM backends.

pub mod db;
pub mod event_bus;
pub mod llm;
pub mod secrets_manager;
pub mod unit_of_work;

pub use event_bus::EventBus;
