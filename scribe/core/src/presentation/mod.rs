// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`scribe-core`)
//!
//! HTTP surface that translates external requests into bus commands, view
//! queries and summary stream sessions. No business logic lives here.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`api`] | Axum router: document and summary CRUD, SSE summary streaming |
//! | [`middleware`] | Request ids, tenant resolution, error rendering |
//! | [`errors`] | Application and bus errors mapped to HTTP statuses |

pub mod api;
pub mod errors;
pub mod middleware;
