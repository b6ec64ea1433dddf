//! Delegate containers: unicast holder, multicast fan-out, and the signal
//! that issues RAII subscription handles (spec §3 "Container state", §4.2).

mod multicast;
mod signal;
mod unicast;

pub use multicast::{Multicast, MulticastSync};
pub use signal::{ScopedSubscription, Signal, Subscription};
pub use unicast::{Unicast, UnicastSync};
