//! Types shared between the backend and its HTTP clients.

pub mod responses;
