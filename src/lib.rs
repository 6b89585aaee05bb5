use thiserror::Error;

use client::ClientError;
use controllers::{ClusterDecodeError, ValuesError};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kube Error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Cluster fetch error: {0}")]
    ClusterFetch(#[from] ClientError),

    #[error("Cluster decode error: {0}")]
    ClusterDecode(#[from] ClusterDecodeError),

    #[error("Values error: {0}")]
    Values(#[from] ValuesError),

    #[error("Metrics registration error: {0}")]
    MetricsError(#[from] prometheus::Error),

    #[error("IllegalControlPlane")]
    IllegalControlPlane,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Variant name, values errors labelled by their own variant.
    pub fn metric_label(&self) -> String {
        let debug = match self {
            Error::Values(e) => format!("{e:?}"),
            e => format!("{e:?}"),
        };
        debug
            .split(['(', ' ', '{'])
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }
}

/// Expose all controller components used by main
pub mod controller;
pub use crate::controller::*;
pub mod api;
pub mod client;
pub mod controllers;
pub mod decoder;
pub mod openstack;
pub mod utils;

/// Log and trace integrations
pub mod telemetry;

/// Metrics
mod metrics;
pub use metrics::{Diagnostics, Metrics};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_label_uses_variant_names() {
        assert_eq!("illegalcontrolplane", Error::IllegalControlPlane.metric_label());
        assert_eq!(
            "missingcloudprofileconfig",
            Error::Values(ValuesError::MissingCloudProfileConfig).metric_label()
        );
        assert_eq!(
            "clusterfetch",
            Error::ClusterFetch(ClientError::NotFound {
                kind: "Cluster",
                namespace: String::new(),
                name: "shoot--foo--bar".into(),
            })
            .metric_label()
        );
    }
}
