use std::collections::BTreeMap;

use kube::api::TypeMeta;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API group and version of all OpenStack provider objects.
pub static API_VERSION: &str = "openstack.provider.extensions.gardener.cloud/v1alpha1";

/// Subnet purpose used by worker nodes.
pub static PURPOSE_NODES: &str = "nodes";

/// Name of the load balancer class used as primary class.
pub static DEFAULT_LOAD_BALANCER_CLASS: &str = "default";

/// Name of the load balancer class used for cluster internal load balancers.
pub static PRIVATE_LOAD_BALANCER_CLASS: &str = "private";

/// Provider objects carried as raw extensions and identified by their kind.
pub trait ProviderObject {
    const KIND: &'static str;

    fn types_mut(&mut self) -> &mut Option<TypeMeta>;
}

macro_rules! provider_object {
    ($ty:ty, $kind:literal) => {
        impl ProviderObject for $ty {
            const KIND: &'static str = $kind;

            fn types_mut(&mut self) -> &mut Option<TypeMeta> {
                &mut self.types
            }
        }
    };
}

provider_object!(ControlPlaneConfig, "ControlPlaneConfig");
provider_object!(InfrastructureStatus, "InfrastructureStatus");
provider_object!(CloudProfileConfig, "CloudProfileConfig");

/// Provider specific configuration of a control plane
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneConfig {
    #[serde(flatten, default)]
    pub types: Option<TypeMeta>,

    /// Load balancer provider passed to the cloud controller manager.
    #[serde(default)]
    pub load_balancer_provider: String,

    /// Explicit load balancer classes. When absent, the classes of the matching
    /// floating pool in the cloud profile are used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancer_classes: Option<Vec<LoadBalancerClass>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_controller_manager: Option<CloudControllerManagerConfig>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudControllerManagerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_gates: Option<BTreeMap<String, bool>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerClass {
    pub name: String,

    #[serde(rename = "floatingSubnetID", default, skip_serializing_if = "Option::is_none")]
    pub floating_subnet_id: Option<String>,

    #[serde(rename = "floatingNetworkID", default, skip_serializing_if = "Option::is_none")]
    pub floating_network_id: Option<String>,

    #[serde(rename = "subnetID", default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
}

/// Status reported by the infrastructure controller
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureStatus {
    #[serde(flatten, default)]
    pub types: Option<TypeMeta>,

    #[serde(default)]
    pub networks: NetworkStatus,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub floating_pool: FloatingPoolStatus,

    #[serde(default)]
    pub subnets: Vec<Subnet>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct FloatingPoolStatus {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Subnet {
    pub purpose: String,
    pub id: String,
}

/// Provider specific configuration of a cloud profile
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudProfileConfig {
    #[serde(flatten, default)]
    pub types: Option<TypeMeta>,

    #[serde(rename = "keystoneURL", default, skip_serializing_if = "Option::is_none")]
    pub keystone_url: Option<String>,

    #[serde(rename = "keystoneURLs", default, skip_serializing_if = "Vec::is_empty")]
    pub keystone_urls: Vec<KeyStoneUrl>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhcp_domain: Option<String>,

    #[serde(rename = "internalLB", default, skip_serializing_if = "Option::is_none")]
    pub internal_lb: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_octavia: Option<bool>,

    #[serde(rename = "useYAWOL", default, skip_serializing_if = "Option::is_none")]
    pub use_yawol: Option<bool>,

    #[serde(rename = "yawolFlavorID", default, skip_serializing_if = "Option::is_none")]
    pub yawol_flavor_id: Option<String>,

    #[serde(rename = "yawolImageID", default, skip_serializing_if = "Option::is_none")]
    pub yawol_image_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rescan_block_storage_on_resize: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_volume_attach_limit: Option<i32>,

    #[serde(default)]
    pub constraints: Constraints,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_classes: Option<Vec<StorageClassDefinition>>,
}

impl CloudProfileConfig {
    pub fn use_octavia(&self) -> bool {
        self.use_octavia.unwrap_or(false)
    }

    pub fn use_yawol(&self) -> bool {
        self.use_yawol.unwrap_or(false)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct KeyStoneUrl {
    pub region: String,
    pub url: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    #[serde(default)]
    pub floating_pools: Vec<FloatingPool>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FloatingPool {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancer_classes: Option<Vec<LoadBalancerClass>>,
}

/// Storage class offered to shoots of a cloud profile
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageClassDefinition {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioner: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reclaim_policy: Option<String>,
}

pub type LookupResult<T> = std::result::Result<T, LookupError>;

#[derive(Error, Debug, PartialEq)]
pub enum LookupError {
    #[error("cannot find subnet with purpose {0:?}")]
    SubnetNotFound(String),

    #[error("cannot find keystone URL for region {0:?}")]
    KeyStoneUrlNotFound(String),
}

/// Returns the first subnet with the given purpose.
pub fn find_subnet_by_purpose<'a>(
    subnets: &'a [Subnet],
    purpose: &str,
) -> LookupResult<&'a Subnet> {
    subnets
        .iter()
        .find(|s| s.purpose == purpose)
        .ok_or_else(|| LookupError::SubnetNotFound(purpose.to_string()))
}

/// Resolves the keystone URL for a region, falling back to the region agnostic URL.
pub fn find_keystone_url(
    keystone_urls: &[KeyStoneUrl],
    keystone_url: Option<&str>,
    region: &str,
) -> LookupResult<String> {
    if let Some(url) = keystone_urls.iter().find(|u| u.region == region) {
        return Ok(url.url.clone());
    }

    match keystone_url {
        Some(url) if !url.is_empty() => Ok(url.to_string()),
        _ => Err(LookupError::KeyStoneUrlNotFound(region.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subnets() -> Vec<Subnet> {
        vec![
            Subnet {
                purpose: "public".into(),
                id: "subnet-public".into(),
            },
            Subnet {
                purpose: PURPOSE_NODES.into(),
                id: "subnet-nodes".into(),
            },
        ]
    }

    #[test]
    fn finds_node_subnet() {
        let subnets = subnets();
        assert_eq!(
            "subnet-nodes",
            find_subnet_by_purpose(&subnets, PURPOSE_NODES).unwrap().id
        );
        assert_eq!(
            Err(LookupError::SubnetNotFound("internal".into())),
            find_subnet_by_purpose(&subnets, "internal").map(|s| s.id.clone())
        );
    }

    #[test]
    fn keystone_url_prefers_region() {
        let urls = vec![
            KeyStoneUrl {
                region: "eu-1".into(),
                url: "https://eu-1.keystone".into(),
            },
            KeyStoneUrl {
                region: "eu-2".into(),
                url: "https://eu-2.keystone".into(),
            },
        ];

        assert_eq!(
            Ok("https://eu-2.keystone".to_string()),
            find_keystone_url(&urls, Some("https://keystone"), "eu-2")
        );
        assert_eq!(
            Ok("https://keystone".to_string()),
            find_keystone_url(&urls, Some("https://keystone"), "us-1")
        );
        assert_eq!(
            Err(LookupError::KeyStoneUrlNotFound("us-1".into())),
            find_keystone_url(&urls, Some(""), "us-1")
        );
        assert_eq!(
            Err(LookupError::KeyStoneUrlNotFound("us-1".into())),
            find_keystone_url(&[], None, "us-1")
        );
    }

    #[test]
    fn cloud_profile_flags_default_to_false() {
        let config = CloudProfileConfig::default();
        assert!(!config.use_octavia());
        assert!(!config.use_yawol());

        let config = CloudProfileConfig {
            use_octavia: Some(true),
            use_yawol: Some(false),
            ..Default::default()
        };
        assert!(config.use_octavia());
        assert!(!config.use_yawol());
    }
}
