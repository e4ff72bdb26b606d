// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod errors;
pub mod handlers;
pub mod message_bus;
pub mod service_factory;
pub mod summary_stream;
pub mod unit_of_work;
pub mod views;

// Re-export the main entry points for convenience
pub use message_bus::{BusError, CommandOutput, HandlerRegistry, MessageBus};
pub use service_factory::ScribeServices;
pub use summary_stream::{Frame, SummaryStreamService};
pub use unit_of_work::{UnitOfWork, UnitOfWorkError, UnitOfWorkFactory};
