//! Request extractors that reject with the standard error envelope.

pub mod trim;
pub mod uuid_path;
pub mod validated_json;

pub use uuid_path::UuidPath;
pub use validated_json::ValidatedJson;
