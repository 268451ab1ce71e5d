//! Terraform state decoding
//!
//! Terraform's kubernetes backend stores the state file gzip-compressed
//! under a single key of the state secret. Only the serial and the outputs
//! are of interest to the operator; everything else in the file is ignored.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use kubetf_types::{Secret, STATE_SECRET_KEY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("Expected key {0} not found in state secret")]
    MissingKey(String),

    #[error("Failed to decompress state: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("Failed to compress state: {0}")]
    Compress(#[source] std::io::Error),

    #[error("Failed to parse state: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    pub serial: i64,
    #[serde(default)]
    pub outputs: BTreeMap<String, StateOutput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateOutput {
    pub value: serde_json::Value,
    #[serde(default)]
    pub sensitive: bool,
}

impl State {
    /// Decode the state held by a state secret
    pub fn from_secret(secret: &Secret) -> Result<Self, StateError> {
        let data = secret
            .data
            .get(STATE_SECRET_KEY)
            .ok_or_else(|| StateError::MissingKey(STATE_SECRET_KEY.to_string()))?;
        Self::from_blob(data)
    }

    /// Decode a gzip-compressed JSON state file
    pub fn from_blob(data: &[u8]) -> Result<Self, StateError> {
        let mut json = Vec::new();
        GzDecoder::new(data)
            .read_to_end(&mut json)
            .map_err(StateError::Decompress)?;
        Ok(serde_json::from_slice(&json)?)
    }

    /// Encode as the kubernetes backend would
    pub fn to_blob(&self) -> Result<Vec<u8>, StateError> {
        let json = serde_json::to_vec(self)?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json).map_err(StateError::Compress)?;
        encoder.finish().map_err(StateError::Compress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubetf_types::ObjectMeta;
    use serde_json::json;

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    fn secret_with(data: Option<Vec<u8>>) -> Secret {
        let mut secret = Secret {
            metadata: ObjectMeta::new("default", "tfstate-default-ws"),
            ..Default::default()
        };
        if let Some(data) = data {
            secret.data.insert(STATE_SECRET_KEY.to_string(), data);
        }
        secret
    }

    #[test]
    fn test_decodes_real_state_file() {
        let file = json!({
            "version": 4,
            "terraform_version": "1.5.7",
            "serial": 12,
            "lineage": "3f1b",
            "outputs": {
                "vpc_id": {"value": "vpc-123", "type": "string"},
                "db_password": {"value": "hunter2", "type": "string", "sensitive": true}
            },
            "resources": []
        });
        let secret = secret_with(Some(gzip(file.to_string().as_bytes())));

        let state = State::from_secret(&secret).expect("Failed to decode state");
        assert_eq!(state.serial, 12);
        assert_eq!(state.outputs["vpc_id"].value, json!("vpc-123"));
        assert!(!state.outputs["vpc_id"].sensitive);
        assert!(state.outputs["db_password"].sensitive);
    }

    #[test]
    fn test_missing_key_is_an_error() {
        let err = State::from_secret(&secret_with(None)).unwrap_err();
        assert!(matches!(err, StateError::MissingKey(ref key) if key == "tfstate"));
    }

    #[test]
    fn test_uncompressed_data_fails_to_decompress() {
        let err = State::from_blob(br#"{"serial": 1}"#).unwrap_err();
        assert!(matches!(err, StateError::Decompress(_)));
    }

    #[test]
    fn test_corrupt_json_fails_to_parse() {
        let err = State::from_blob(&gzip(b"{not json")).unwrap_err();
        assert!(matches!(err, StateError::Parse(_)));
    }

    #[test]
    fn test_blob_encoding_round_trips() {
        let state = State {
            serial: 3,
            outputs: BTreeMap::new(),
        };
        let decoded = State::from_blob(&state.to_blob().unwrap()).unwrap();
        assert_eq!(decoded, state);
    }
}
