//! [`Error`], [`ErrorKind`] and [`Result`].

mod gateway_error;
mod http_error;

pub use http_error::{Error, ErrorKind, Result};
