//! Sticky notes engine: pad persistence, toolbar autohide and settings

#![forbid(unsafe_code)]

pub mod cli;
pub mod color;
pub mod constants;
pub mod fio;
pub mod markup;
pub mod pad;
pub mod settings;
pub mod surface;
pub mod types;
