//! Error taxonomy for the invocation pipeline.
//!
//! Mirrors the hand-rolled `Error`/`Result` pairs under `net::error` and
//! `net::result` rather than reaching for an error-derive crate: the set of
//! variants is small, closed, and every conversion is written out.

use std::fmt;
use std::io;

/// Everything that can go wrong dispatching a delegate, synchronously,
/// asynchronously or remotely.
#[derive(Debug)]
pub enum DelegateError {
    /// The serialization sink/source is not in a usable state.
    StreamNotGood,
    /// A remote delegate has no serializer bound.
    NoSerializer,
    /// A remote delegate has no dispatcher bound.
    NoDispatcher,
    /// `Serializer::write` failed.
    Serialize(io::Error),
    /// `Serializer::read` failed after the source reported good state.
    Deserialize,
    /// `Serializer::read` raised during decoding.
    DeserializeException(io::Error),
    /// The dispatcher's transport returned a non-zero status.
    Dispatch(i32),
    /// Cloning the delegate or allocating the async message failed.
    AllocationFailed,
    /// No worker is bound to an async delegate.
    NoWorker,
    /// A blocking async call's deadline elapsed before completion.
    SendTimeout { id: u16, seq: u16 },
}

impl fmt::Display for DelegateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelegateError::StreamNotGood => write!(f, "serialization stream is not in a good state"),
            DelegateError::NoSerializer => write!(f, "remote delegate has no serializer bound"),
            DelegateError::NoDispatcher => write!(f, "remote delegate has no dispatcher bound"),
            DelegateError::Serialize(e) => write!(f, "serialize failed: {}", e),
            DelegateError::Deserialize => write!(f, "deserialize left the source in a bad state"),
            DelegateError::DeserializeException(e) => write!(f, "deserialize raised: {}", e),
            DelegateError::Dispatch(code) => write!(f, "transport dispatch failed with code {}", code),
            DelegateError::AllocationFailed => write!(f, "failed to clone delegate or allocate async message"),
            DelegateError::NoWorker => write!(f, "no worker context bound to async delegate"),
            DelegateError::SendTimeout { id, seq } => {
                write!(f, "send timed out for id {} seq {}", id, seq)
            }
        }
    }
}

impl std::error::Error for DelegateError {}

impl From<io::Error> for DelegateError {
    fn from(e: io::Error) -> Self {
        DelegateError::Serialize(e)
    }
}

/// The auxiliary payload delivered to an error sink: `(id, kind, aux_code)`.
///
/// `kind` is a stable numeric tag rather than the `DelegateError` itself so
/// that error-sink delegates (plain `Delegate<(u16, ErrorKind, i32)>`
/// callbacks) stay `Clone`-able without requiring `io::Error: Clone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    StreamNotGood,
    NoSerializer,
    NoDispatcher,
    Serialize,
    Deserialize,
    DeserializeException,
    Dispatch,
    AllocationFailed,
    NoWorker,
    SendTimeout,
}

impl From<&DelegateError> for ErrorKind {
    fn from(e: &DelegateError) -> Self {
        match e {
            DelegateError::StreamNotGood => ErrorKind::StreamNotGood,
            DelegateError::NoSerializer => ErrorKind::NoSerializer,
            DelegateError::NoDispatcher => ErrorKind::NoDispatcher,
            DelegateError::Serialize(_) => ErrorKind::Serialize,
            DelegateError::Deserialize => ErrorKind::Deserialize,
            DelegateError::DeserializeException(_) => ErrorKind::DeserializeException,
            DelegateError::Dispatch(_) => ErrorKind::Dispatch,
            DelegateError::AllocationFailed => ErrorKind::AllocationFailed,
            DelegateError::NoWorker => ErrorKind::NoWorker,
            DelegateError::SendTimeout { .. } => ErrorKind::SendTimeout,
        }
    }
}

pub type Result<T> = std::result::Result<T, DelegateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts_to_serialize() {
        let io_err = io::Error::new(io::ErrorKind::Other, "boom");
        let err: DelegateError = io_err.into();
        assert!(matches!(err, DelegateError::Serialize(_)));
    }

    #[test]
    fn error_kind_tags_match() {
        let err = DelegateError::Dispatch(7);
        assert_eq!(ErrorKind::from(&err), ErrorKind::Dispatch);
    }
}
