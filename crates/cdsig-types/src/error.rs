//! Error types for descriptor encoding and decoding

use thiserror::Error;

/// Errors that can occur when reading or writing descriptor wire data.
#[derive(Error, Debug)]
pub enum Error {
    /// JSON encoding or decoding failure
    #[error("descriptor serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Schema version not supported by this implementation
    #[error("unsupported schema version {0:?}")]
    UnsupportedSchemaVersion(String),
}

/// Result type for wire operations.
pub type Result<T> = std::result::Result<T, Error>;

use crate::descriptor::ComponentDescriptor;
use crate::descriptor::SCHEMA_VERSION_V2;

impl ComponentDescriptor {
    /// Decode a descriptor from its JSON wire form.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let cd: ComponentDescriptor = serde_json::from_slice(data)?;
        if cd.meta.schema_version != SCHEMA_VERSION_V2 {
            return Err(Error::UnsupportedSchemaVersion(cd.meta.schema_version));
        }
        Ok(cd)
    }

    /// Encode a descriptor to its JSON wire form.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_schema_version() {
        let data = br#"{"meta":{"schemaVersion":"v9"},"component":{"name":"c","version":"v1"}}"#;
        assert!(matches!(
            ComponentDescriptor::from_json(data),
            Err(Error::UnsupportedSchemaVersion(v)) if v == "v9"
        ));
    }
}
