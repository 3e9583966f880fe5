//! Centralized error type for the midiwire umbrella crate.
//!
//! Wraps both subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Protocol: {0}")]
    Proto(#[from] midiwire_proto::Error),

    #[error("Port: {0}")]
    Io(#[from] midiwire_io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
