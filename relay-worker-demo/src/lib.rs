//! Library half of the demo crate: exposes the concrete `WorkerContext`,
//! `Transport`, config loader, and remote-invocation signature the binary
//! wires together, so integration tests (`tests/`) can exercise the real
//! serializer/transport pairing this workspace ships instead of only the
//! core's mock-backed unit tests.

pub mod config;
pub mod signature;
pub mod transport;
pub mod worker;
