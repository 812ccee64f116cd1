//! Library side of the `offerte` command: configuration, logging and the
//! line-driven editor session.

pub mod config;
pub mod logging;
pub mod session;
