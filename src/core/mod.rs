//! Shared constants

pub mod paths;
