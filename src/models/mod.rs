//! Asset Studio Models
//!
//! Data structures for images, settings and catalogs.

pub mod image;
pub mod preset;
pub mod settings;

pub use self::image::*;
pub use preset::*;
pub use settings::*;
