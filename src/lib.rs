//! Ripcord - concurrent CD ripping pipeline
//!
//! Rips the tracks of an audio CD with cdparanoia, encodes them with a
//! configurable encoder, tags them and copies them into a music library,
//! running user hooks at each step.

pub mod album;
pub mod cli;
pub mod config;
pub mod dependency;
pub mod error;
pub mod process;
pub mod rip;
pub mod template;
pub mod workflow;
