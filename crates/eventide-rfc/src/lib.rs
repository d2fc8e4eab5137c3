//! RFC 5545 recurrence handling for eventide.
//!
//! Rule text is always evaluated on naive local wall-clock values; the
//! [`rfc::time`] helpers move instants in and out of that representation.

pub mod error;
pub mod rfc;
