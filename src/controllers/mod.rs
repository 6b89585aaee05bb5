use thiserror::Error;

use crate::api::openstack::LookupError;
use crate::client::ClientError;
use crate::decoder::DecodeError;
use crate::openstack::CredentialsError;
use crate::utils::VersionError;

pub type ClusterDecodeResult<T> = std::result::Result<T, ClusterDecodeError>;

#[derive(Error, Debug)]
pub enum ClusterDecodeError {
    #[error("could not decode {field} of cluster: {source}")]
    Field {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not decode cloudProfileConfig of cloud profile '{name}': {source}")]
    CloudProfileConfig {
        name: String,
        #[source]
        source: DecodeError,
    },
}

pub type ValuesResult<T> = std::result::Result<T, ValuesError>;

#[derive(Error, Debug)]
pub enum ValuesError {
    #[error("could not decode providerConfig of controlplane '{object}': {source}")]
    ProviderConfig {
        object: String,
        #[source]
        source: DecodeError,
    },

    #[error("could not decode infrastructureProviderStatus of controlplane '{object}': {source}")]
    InfrastructureStatus {
        object: String,
        #[source]
        source: DecodeError,
    },

    #[error("controlplane '{0}' has no infrastructureProviderStatus")]
    MissingInfrastructureStatus(String),

    #[error("{0}")]
    CloudProfileConfig(#[from] ClusterDecodeError),

    #[error("cloud profile config is missing - cannot determine keystone URL and other parameters")]
    MissingCloudProfileConfig,

    #[error("could not get service account from secret '{namespace}/{name}': {source}")]
    Credentials {
        namespace: String,
        name: String,
        #[source]
        source: CredentialsError,
    },

    #[error("could not determine subnet from infrastructureProviderStatus of controlplane '{object}': {source}")]
    Subnet {
        object: String,
        #[source]
        source: LookupError,
    },

    #[error("{0}")]
    KeyStoneUrl(#[from] LookupError),

    #[error("could not get secret '{name}': {source}")]
    SecretFetch {
        name: String,
        #[source]
        source: ClientError,
    },

    #[error("could not compute checksum of secret '{name}': {source}")]
    Checksum {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Version error: {0}")]
    Version(#[from] VersionError),

    #[error("could not delete legacy config map '{name}': {source}")]
    LegacyConfigMap {
        name: String,
        #[source]
        source: ClientError,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub mod cluster;
pub mod controlplane;
