//! inkframe - photo frame server for a 7.3" ACeP e-paper panel
//!
//! Uploads are quantized to the panel palette, packed into the controller's
//! frame format and sent to the panel one refresh at a time.
//! This library exposes modules for integration testing.

pub mod api;
pub mod error;
pub mod models;
pub mod panel;
pub mod rendering;
pub mod server;
pub mod services;
