use kube::ResourceExt;
use serde_json::Value;

use crate::api::{
    core::{CloudProfile, Seed, Shoot},
    extensions::Cluster,
    openstack::CloudProfileConfig,
};
use crate::decoder::Decoder;

use super::{ClusterDecodeError, ClusterDecodeResult};

/// Decoded view of the extension `Cluster` resource.
#[derive(Clone, Debug, Default)]
pub struct ClusterContext {
    pub name: String,
    pub cloud_profile: CloudProfile,
    pub seed: Seed,
    pub shoot: Shoot,
}

impl TryFrom<&Cluster> for ClusterContext {
    type Error = ClusterDecodeError;

    fn try_from(cluster: &Cluster) -> ClusterDecodeResult<Self> {
        fn decode<T: serde::de::DeserializeOwned>(
            raw: &Value,
            field: &'static str,
        ) -> ClusterDecodeResult<T> {
            serde_json::from_value(raw.clone())
                .map_err(|source| ClusterDecodeError::Field { field, source })
        }

        Ok(Self {
            name: cluster.name_any(),
            cloud_profile: decode(&cluster.spec.cloud_profile, "cloudProfile")?,
            seed: decode(&cluster.spec.seed, "seed")?,
            shoot: decode(&cluster.spec.shoot, "shoot")?,
        })
    }
}

impl ClusterContext {
    pub fn kubernetes_version(&self) -> &str {
        &self.shoot.spec.kubernetes.version
    }

    pub fn is_hibernated(&self) -> bool {
        self.shoot
            .spec
            .hibernation
            .as_ref()
            .and_then(|h| h.enabled)
            .unwrap_or(false)
    }

    /// Replicas for control plane components: zero once a hibernated shoot
    /// has been scaled down, `wanted` otherwise.
    pub fn control_plane_replicas(&self, scaled_down: bool, wanted: i32) -> i32 {
        match self.is_hibernated() && scaled_down {
            true => 0,
            false => wanted,
        }
    }

    pub fn pod_network(&self) -> &str {
        self.shoot.spec.networking.pods.as_deref().unwrap_or_default()
    }

    pub fn wants_vertical_pod_autoscaler(&self) -> bool {
        self.shoot
            .spec
            .kubernetes
            .vertical_pod_autoscaler
            .as_ref()
            .is_some_and(|vpa| vpa.enabled)
    }

    pub fn http_proxy(&self) -> Option<&str> {
        self.shoot
            .spec
            .networking
            .proxy_config
            .as_ref()?
            .http_proxy
            .as_deref()
    }

    pub fn no_proxy(&self) -> Option<&str> {
        self.shoot
            .spec
            .networking
            .proxy_config
            .as_ref()?
            .no_proxy
            .as_deref()
    }

    pub fn ingress_domain(&self) -> &str {
        self.seed.spec.dns.ingress_domain.as_deref().unwrap_or_default()
    }

    /// Decodes the provider config of the cloud profile, `None` if the profile
    /// carries none.
    pub fn cloud_profile_config(
        &self,
        decoder: &Decoder,
    ) -> ClusterDecodeResult<Option<CloudProfileConfig>> {
        self.cloud_profile
            .spec
            .provider_config
            .as_ref()
            .map(|raw| decoder.decode_value(raw))
            .transpose()
            .map_err(|source| ClusterDecodeError::CloudProfileConfig {
                name: self.cloud_profile.metadata.name.clone().unwrap_or_default(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use kube::api::ObjectMeta;
    use serde_json::json;

    use super::*;
    use crate::api::extensions::ClusterSpec;

    fn cluster(shoot: Value) -> Cluster {
        Cluster {
            metadata: ObjectMeta {
                name: Some("shoot--foo--bar".into()),
                ..Default::default()
            },
            spec: ClusterSpec {
                cloud_profile: json!({
                    "metadata": {"name": "openstack"},
                    "spec": {"providerConfig": {
                        "apiVersion": "openstack.provider.extensions.gardener.cloud/v1alpha1",
                        "kind": "CloudProfileConfig",
                        "keystoneURL": "https://keystone",
                        "useOctavia": true,
                    }},
                }),
                seed: json!({"spec": {"dns": {"ingressDomain": "i.seed.example.com"}}}),
                shoot,
            },
        }
    }

    #[test]
    fn decodes_cluster_resource() {
        let cluster = cluster(json!({
            "spec": {
                "kubernetes": {"version": "1.18.2"},
                "networking": {
                    "pods": "100.96.0.0/11",
                    "proxyConfig": {"httpProxy": "http://proxy:3128"},
                },
                "provider": {
                    "type": "openstack",
                    "componentResources": {
                        "csi-driver-node": {"requests": {"cpu": "10m"}},
                    },
                },
            }
        }));

        let ctx = ClusterContext::try_from(&cluster).unwrap();
        assert_eq!("shoot--foo--bar", ctx.name);
        assert_eq!("1.18.2", ctx.kubernetes_version());
        assert_eq!("100.96.0.0/11", ctx.pod_network());
        assert_eq!(Some("http://proxy:3128"), ctx.http_proxy());
        assert_eq!(None, ctx.no_proxy());
        assert_eq!("i.seed.example.com", ctx.ingress_domain());
        assert!(!ctx.wants_vertical_pod_autoscaler());
        assert!(ctx
            .shoot
            .spec
            .provider
            .component_resources
            .contains_key("csi-driver-node"));

        let config = ctx.cloud_profile_config(&Decoder).unwrap().unwrap();
        assert_eq!(Some("https://keystone".to_string()), config.keystone_url);
        assert!(config.use_octavia());
    }

    #[test]
    fn rejects_malformed_shoot() {
        let cluster = cluster(json!({"spec": {"kubernetes": {"version": 119}}}));
        assert!(matches!(
            ClusterContext::try_from(&cluster),
            Err(ClusterDecodeError::Field { field: "shoot", .. })
        ));
    }

    #[test]
    fn replicas_follow_hibernation() {
        let awake = ClusterContext::try_from(&cluster(json!({}))).unwrap();
        assert_eq!(1, awake.control_plane_replicas(true, 1));
        assert_eq!(1, awake.control_plane_replicas(false, 1));

        let hibernated =
            ClusterContext::try_from(&cluster(json!({"spec": {"hibernation": {"enabled": true}}})))
                .unwrap();
        assert!(hibernated.is_hibernated());
        assert_eq!(0, hibernated.control_plane_replicas(true, 1));
        assert_eq!(1, hibernated.control_plane_replicas(false, 1));
    }

    #[test]
    fn vertical_pod_autoscaler_must_be_enabled() {
        assert!(!ClusterContext::default().wants_vertical_pod_autoscaler());

        for (vpa, wanted) in [
            (json!({"enabled": false}), false),
            (json!({}), false),
            (json!({"enabled": true}), true),
        ] {
            let ctx = ClusterContext::try_from(&cluster(json!({
                "spec": {"kubernetes": {"version": "1.18", "verticalPodAutoscaler": vpa}}
            })))
            .unwrap();
            assert_eq!(wanted, ctx.wants_vertical_pod_autoscaler());
        }
    }

    #[test]
    fn missing_cloud_profile_config() {
        let mut cluster = cluster(json!({}));
        cluster.spec.cloud_profile = json!({"metadata": {"name": "openstack"}});
        let ctx = ClusterContext::try_from(&cluster).unwrap();
        assert!(ctx.cloud_profile_config(&Decoder).unwrap().is_none());
    }
}
