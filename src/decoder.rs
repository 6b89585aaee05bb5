use kube::api::TypeMeta;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::api::openstack::{ProviderObject, API_VERSION};

pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Malformed document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid object: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Object has no apiVersion or kind")]
    MissingTypeMeta,

    #[error("Unexpected object type {found}, expected {expected}")]
    UnexpectedType { expected: String, found: String },
}

/// Decoder for OpenStack provider objects embedded as raw extensions.
///
/// Accepts JSON or YAML documents and only yields an object if its
/// `apiVersion` and `kind` identify the requested type.
#[derive(Clone, Debug, Default)]
pub struct Decoder;

impl Decoder {
    pub fn decode<T>(&self, raw: &[u8]) -> DecodeResult<T>
    where
        T: ProviderObject + DeserializeOwned,
    {
        self.decode_value(&serde_yaml::from_slice(raw)?)
    }

    pub fn decode_value<T>(&self, raw: &Value) -> DecodeResult<T>
    where
        T: ProviderObject + DeserializeOwned,
    {
        let api_version = raw.get("apiVersion").and_then(Value::as_str);
        let kind = raw.get("kind").and_then(Value::as_str);
        match (api_version, kind) {
            (Some(api_version), Some(kind)) if api_version == API_VERSION && kind == T::KIND => {}
            (Some(api_version), Some(kind)) => {
                return Err(DecodeError::UnexpectedType {
                    expected: format!("{API_VERSION}, Kind={}", T::KIND),
                    found: format!("{api_version}, Kind={kind}"),
                })
            }
            _ => return Err(DecodeError::MissingTypeMeta),
        }

        Ok(serde_json::from_value(raw.clone())?)
    }

    /// Serializes a provider object as JSON with its type metadata set.
    pub fn encode<T>(&self, obj: &T) -> DecodeResult<Vec<u8>>
    where
        T: ProviderObject + Serialize + Clone,
    {
        let mut obj = obj.clone();
        *obj.types_mut() = Some(TypeMeta {
            api_version: API_VERSION.to_string(),
            kind: T::KIND.to_string(),
        });

        Ok(serde_json::to_vec(&obj)?)
    }
}
