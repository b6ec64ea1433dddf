//! Wire framing for remote invocation: a fixed-size header plus a
//! process-wide monotonic sequence number.
//!
//! Four fields cover what the remote-invocation protocol needs: a marker
//! byte identifying the frame as a delegate-invocation header (as opposed to
//! any other protocol this `Transport` might multiplex), the remote
//! delegate id being invoked, the sequence number the monitor/retry layer
//! track, and the payload length that follows the header on the wire.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicU16, Ordering};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use lazy_static::lazy_static;

/// Identifies this frame as a delegate-invocation header to a `Transport`
/// that might be carrying other traffic.
pub const MARKER: u16 = 0xDE1A;

pub const HEADER_SIZE: usize = 8;

/// Fixed-size framing record prepended to every remote-invocation payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub marker: u16,
    pub id: u16,
    pub seq: u16,
    pub length: u16,
}

impl Header {
    pub fn new(id: u16, seq: u16, length: u16) -> Self {
        Header { marker: MARKER, id, seq, length }
    }

    pub fn write<W: Write>(&self, mut out: W) -> io::Result<()> {
        out.write_u16::<BigEndian>(self.marker)?;
        out.write_u16::<BigEndian>(self.id)?;
        out.write_u16::<BigEndian>(self.seq)?;
        out.write_u16::<BigEndian>(self.length)
    }

    pub fn read<R: Read>(mut input: R) -> io::Result<Self> {
        let marker = input.read_u16::<BigEndian>()?;
        if marker != MARKER {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "bad delegate frame marker"));
        }
        Ok(Header {
            marker,
            id: input.read_u16::<BigEndian>()?,
            seq: input.read_u16::<BigEndian>()?,
            length: input.read_u16::<BigEndian>()?,
        })
    }
}

lazy_static! {
    static ref SEQUENCE: AtomicU16 = AtomicU16::new(0);
}

/// Draw the next process-wide sequence number. Wraps at `u16::MAX`; the
/// monitor/retry layer treat sequence reuse as a receiver-side concern
/// rather than guaranteeing global uniqueness forever.
pub fn next_sequence() -> u16 {
    SEQUENCE.fetch_add(1, Ordering::Relaxed)
}
