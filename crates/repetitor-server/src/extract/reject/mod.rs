//! Request body extractors with client-safe rejection messages.

mod enhanced_json;

pub use self::enhanced_json::Json;
