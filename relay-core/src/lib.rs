//! A delegate-based messaging library: a polymorphic callable handle
//! ([`delegate::Delegate`]), unicast/multicast/signal containers, async and
//! blocking-async invocation through a worker context, and remote
//! invocation with serialization, transport, a reliability monitor, and a
//! retry decorator.

pub mod async_delegate;
pub mod config;
pub mod containers;
pub mod delegate;
pub mod error;
pub mod header;
pub mod lock;
pub mod monitor;
pub mod prelude;
pub mod remote;
pub mod retry;
pub mod worker;
