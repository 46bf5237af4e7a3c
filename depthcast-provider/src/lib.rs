//! # depthcast-provider: Depth Capture Provider
//!
//! Listens for observers over TCP, advertises the device's streams and
//! streams compressed depth frames (plus a one-shot intrinsics table on
//! request) to whichever observer last asked for frames.
//!
//! The bundled [`synthetic::SyntheticDevice`] stands in for sensor
//! hardware.

pub mod config;
pub mod service;
pub mod synthetic;
