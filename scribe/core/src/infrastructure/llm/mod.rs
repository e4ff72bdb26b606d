// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// LLM Provider Infrastructure - Anti-Corruption Layer Implementations
//
// Each backend adapter translates between the domain `GenerationBackend`
// interface and one external streaming API. `ResilientProvider` adds
// credentials, retries and fence stripping on top of whichever backend the
// registry selects.

pub mod credentials;
pub mod fences;
pub mod gemini;
pub mod mock;
pub mod openai;
pub mod registry;
pub mod resilient;
pub mod sse;

pub use registry::ProviderRegistry;
pub use resilient::ResilientProvider;
