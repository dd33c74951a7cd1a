//! Shared test utilities for gridiron integration harnesses.
//!
//! Import everything you need via `mod common; use common::*;` at the top of
//! each harness file. In-process fakes (`ScriptedFeed`, `FlakyStore`,
//! `FailingLedgerStorage`) keep job and scheduler tests off the network;
//! `FakeProvider` is for exercising the real HTTP client.

pub mod assertions;
pub mod builders;
pub mod fake_provider;
pub mod fakes;
pub mod fixtures;

pub use assertions::*;
pub use builders::*;
pub use fakes::*;
pub use fixtures::*;
