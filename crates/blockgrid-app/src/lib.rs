//! Blockgrid Application
//!
//! The page builder shell: a command line for inspecting page configs on native
//! platforms, and the browser bindings on WebAssembly.

pub mod config;

#[cfg(all(feature = "native", not(target_arch = "wasm32")))]
pub mod cli;

pub use config::{AppConfig, OutputFormat};

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::{DomGeometry, WebPage};
