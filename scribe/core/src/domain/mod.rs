// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain layer: documents, the facts they produce, and the contracts the
//! outer layers implement.

pub mod commands;
pub mod config;
pub mod document;
pub mod events;
pub mod llm;
pub mod message;
pub mod repository;
pub mod tenant;
