//! Runtime helpers for the command-line driver.
//!
//! The core never touches the filesystem; corpus loading lives here.

pub mod corpus;
