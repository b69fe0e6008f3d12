//! Icon Grid Common Library
//!
//! 検出エンジンとCLIで共有される型とユーティリティ

pub mod types;
pub mod hash;
pub mod error;

pub use types::{BBox, DetectResponse, DetectedIcon, GridSpec, ManifestItem, ReferenceEntry};
pub use hash::{ImageHash, HASH_BITS};
pub use error::{Error, Result};
