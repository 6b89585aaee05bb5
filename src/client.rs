use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::{api::DeleteParams, Api, Client};
use thiserror::Error;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::api::extensions::Cluster;

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: &'static str,
        namespace: String,
        name: String,
    },

    #[error("Kube Error: {0}")]
    Kube(#[from] kube::Error),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Kubernetes operations needed while deriving chart values.
///
/// Allows substituting the API server in tests.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KubeClient: Send + Sync {
    async fn get_secret(&self, namespace: &str, name: &str) -> ClientResult<Secret>;

    async fn delete_config_map(&self, namespace: &str, name: &str) -> ClientResult<()>;

    /// Fetches the extension `Cluster` resource, named after the seed namespace.
    async fn get_cluster(&self, name: &str) -> ClientResult<Cluster>;
}

/// [`KubeClient`] backed by the API server.
#[derive(Clone)]
pub struct KubeClientImpl {
    client: Client,
}

impl KubeClientImpl {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KubeClient for KubeClientImpl {
    async fn get_secret(&self, namespace: &str, name: &str) -> ClientResult<Secret> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name).await?.ok_or_else(|| ClientError::NotFound {
            kind: "Secret",
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }

    async fn delete_config_map(&self, namespace: &str, name: &str) -> ClientResult<()> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => {
                debug!(namespace, name, "Deleted config map");
                Ok(())
            }
            Err(kube::Error::Api(e)) if e.code == 404 => Err(ClientError::NotFound {
                kind: "ConfigMap",
                namespace: namespace.to_string(),
                name: name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_cluster(&self, name: &str) -> ClientResult<Cluster> {
        let api: Api<Cluster> = Api::all(self.client.clone());
        api.get_opt(name).await?.ok_or_else(|| ClientError::NotFound {
            kind: "Cluster",
            namespace: String::new(),
            name: name.to_string(),
        })
    }
}
