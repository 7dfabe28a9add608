//! Domain types for DivScreen

pub mod bar;

pub use bar::{first_unordered, Bar};

/// Symbol type alias
pub type Symbol = String;
