//! Image processing building blocks for report extraction

pub mod ops;
pub mod templates;

pub use ops::BoundingBox;
pub use templates::TemplateStore;
