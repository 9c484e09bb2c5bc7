//! Report building
//!
//! - [`classify`] - Image categories and the snapshot tag
//! - [`join`] - Cross-resource joins producing denormalized rows
//! - [`render`] - Titled text tables, printed and optionally written to a file

pub mod classify;
pub mod join;
pub mod render;

pub use render::Report;
