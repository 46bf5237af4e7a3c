//! # depthcast-observer: Depth Observer Client
//!
//! Connects to `depthcast-provider`, waits for its stream descriptions,
//! asks for frames (and optionally the intrinsics table) and keeps the
//! latest of each. Frame summaries are logged; the table can be
//! exported as tab-separated text.

pub mod config;
pub mod connection;
pub mod export;
pub mod summary;
