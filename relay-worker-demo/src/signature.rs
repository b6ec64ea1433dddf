//! The argument shape for the remote-invocation demo (spec §8 scenario S5).

use relay_core_macros::remote_signature;
use serde_derive::{Deserialize, Serialize};

#[remote_signature]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetPosition {
    pub x: f64,
    pub y: f64,
}
