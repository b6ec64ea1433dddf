//! Proves `#[remote_signature]` actually generates a working
//! `relay_core::remote::Serializer` over `bincode` (spec §4.5, §8 property 9)
//! rather than just expanding without error.

use relay_core::remote::Serializer;
use relay_core_macros::remote_signature;
use serde_derive::{Deserialize, Serialize};

#[remote_signature]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Position {
    x: f64,
    y: f64,
}

#[test]
fn generated_codec_round_trips_the_argument_struct() {
    let codec = Position::serializer();
    let original = Position { x: 1.5, y: -2.25 };

    let mut sink = Vec::new();
    codec.write(&mut sink, &original).expect("write should succeed");

    let mut slots = Position::default();
    codec.read(&mut &sink[..], &mut slots).expect("read should succeed");

    assert_eq!(slots, original);
}

#[test]
fn generated_codec_reports_truncated_input_as_an_error() {
    let codec = Position::serializer();
    let mut slots = Position::default();

    // A single byte can never hold two f64 fields.
    let truncated = [0u8; 1];
    assert!(codec.read(&mut &truncated[..], &mut slots).is_err());
}
