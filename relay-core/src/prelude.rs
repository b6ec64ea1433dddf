pub use crate::async_delegate::{AsyncDelegate, BlockingAsyncDelegate, BlockingOutcome, Deadline};
pub use crate::config::{AsyncDelegateConfig, MonitorConfig, RetryConfig};
pub use crate::containers::{Multicast, MulticastSync, Signal, Subscription, Unicast, UnicastSync};
pub use crate::delegate::Delegate;
pub use crate::error::{DelegateError, ErrorKind, Result};
pub use crate::header::Header;
pub use crate::monitor::{SendStatus, SendStatusKind, TransportMonitor};
pub use crate::remote::{Dispatcher, ErrorSink, RemoteDelegate, RemoteId, Serializer, Transport, TransportDispatcher};
pub use crate::retry::RetryTransport;
pub use crate::worker::{Invoker, Priority, WorkerContext};
pub use serde_derive::{Deserialize, Serialize};
