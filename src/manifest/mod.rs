//! Document model: parsing, navigation, and serialization of Kubernetes
//! manifest documents.

pub mod document;
pub mod path;

pub use document::ManifestDocument;
pub use path::{FieldPath, Segment};
