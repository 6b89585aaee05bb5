use std::{collections::BTreeMap, sync::Arc};

use k8s_openapi::api::core::v1::{ResourceRequirements, Secret};
use kube::ResourceExt;
use serde_json::{json, Map, Value};
use tracing::{debug, instrument};

use crate::api::extensions::ControlPlane;
use crate::api::openstack::{
    find_keystone_url, find_subnet_by_purpose, CloudProfileConfig, ControlPlaneConfig,
    InfrastructureStatus, LoadBalancerClass, DEFAULT_LOAD_BALANCER_CLASS,
    PRIVATE_LOAD_BALANCER_CLASS, PURPOSE_NODES,
};
use crate::client::KubeClient;
use crate::controllers::cluster::ClusterContext;
use crate::controllers::{ValuesError, ValuesResult};
use crate::decoder::Decoder;
use crate::openstack::{self as os, get_credentials, Credentials};
use crate::utils::{compare_versions, compute_checksum, is_empty_string, set_string_value};

/// Chart values handed to the chart renderer.
pub type Values = Map<String, Value>;

/// Checksums of secrets and config by name, used as pod annotations.
pub type Checksums = BTreeMap<String, String>;

/// Provides the OpenStack specific values for the charts applied for a control plane.
#[derive(Clone)]
pub struct ValuesProvider {
    client: Arc<dyn KubeClient>,
    decoder: Decoder,
}

impl ValuesProvider {
    pub fn new(client: Arc<dyn KubeClient>) -> Self {
        Self {
            client,
            decoder: Decoder,
        }
    }

    /// Values for the `cloud-provider-config` chart.
    #[instrument(skip_all, fields(controlplane = %object_name(cp)), err)]
    pub async fn get_config_chart_values(
        &self,
        cp: &ControlPlane,
        cluster: &ClusterContext,
    ) -> ValuesResult<Values> {
        let cp_config = self.decode_control_plane_config(cp)?;
        let infra_status = self.decode_infrastructure_status(cp)?;
        let cloud_profile_config = cluster.cloud_profile_config(&self.decoder)?;

        let secret_ref = &cp.spec.secret_ref;
        let credentials = get_credentials(self.client.as_ref(), secret_ref)
            .await
            .map_err(|source| ValuesError::Credentials {
                namespace: secret_ref.namespace.clone(),
                name: secret_ref.name.clone(),
                source,
            })?;

        config_chart_values(
            cp_config,
            &infra_status,
            cloud_profile_config.as_ref(),
            cp,
            &credentials,
            cluster,
        )
    }

    /// Values for the `seed-controlplane` chart.
    #[instrument(skip_all, fields(controlplane = %object_name(cp)), err)]
    pub async fn get_control_plane_chart_values(
        &self,
        cp: &ControlPlane,
        cluster: &ClusterContext,
        checksums: &mut Checksums,
        scaled_down: bool,
    ) -> ValuesResult<Values> {
        let cp_config = self.decode_control_plane_config(cp)?;
        let infra_status = self.decode_infrastructure_status(cp)?;
        let cloud_profile_config = cluster
            .cloud_profile_config(&self.decoder)?
            .unwrap_or_default();

        let namespace = cp.namespace().unwrap_or_default();
        self.fetch_secret_with_checksum(&namespace, os::CLOUD_PROVIDER_CONFIG_NAME, checksums)
            .await?;

        if !compare_versions(cluster.kubernetes_version(), "<", "1.19")? {
            self.fetch_secret_with_checksum(
                &namespace,
                os::CLOUD_PROVIDER_CSI_DISK_CONFIG_NAME,
                checksums,
            )
            .await?;
        }

        // TODO: drop once no seed namespace carries the legacy config maps anymore.
        self.delete_legacy_cloud_provider_config_maps(&namespace)
            .await?;

        control_plane_chart_values(
            &cp_config,
            cp,
            cluster,
            &cloud_profile_config,
            &infra_status,
            checksums,
            scaled_down,
        )
    }

    /// Values for the `shoot-system-components` chart.
    #[instrument(skip_all, fields(controlplane = %object_name(cp)), err)]
    pub async fn get_control_plane_shoot_chart_values(
        &self,
        cp: &ControlPlane,
        cluster: &ClusterContext,
        checksums: &mut Checksums,
    ) -> ValuesResult<Values> {
        let csi_disabled = compare_versions(cluster.kubernetes_version(), "<", "1.17")?;

        let mut cloud_provider_disk_config = None;
        if !csi_disabled {
            let namespace = cp.namespace().unwrap_or_default();
            let secret = self
                .fetch_secret_with_checksum(
                    &namespace,
                    os::CLOUD_PROVIDER_CSI_DISK_CONFIG_NAME,
                    checksums,
                )
                .await?;

            cloud_provider_disk_config = secret
                .data
                .as_ref()
                .and_then(|data| data.get(os::CLOUD_PROVIDER_CONFIG_DATA_KEY))
                .map(|config| String::from_utf8_lossy(&config.0).into_owned());
        }

        control_plane_shoot_chart_values(
            cluster,
            checksums,
            csi_disabled,
            cloud_provider_disk_config,
        )
    }

    /// Values for the `shoot-storageclasses` chart.
    #[instrument(skip_all, fields(controlplane = %object_name(cp)), err)]
    pub async fn get_storage_classes_chart_values(
        &self,
        cp: &ControlPlane,
        cluster: &ClusterContext,
    ) -> ValuesResult<Values> {
        let version = cluster.kubernetes_version();
        let legacy_provisioner = compare_versions(version, "<", "1.17")?;
        let wait_for_first_consumer = compare_versions(version, "<", "1.12")?;

        let config = cluster
            .cloud_profile_config(&self.decoder)?
            .unwrap_or_default();

        Ok(storage_classes_chart_values(
            &config,
            legacy_provisioner,
            wait_for_first_consumer,
        ))
    }

    fn decode_control_plane_config(&self, cp: &ControlPlane) -> ValuesResult<ControlPlaneConfig> {
        match &cp.spec.provider_config {
            Some(raw) => {
                self.decoder
                    .decode_value(raw)
                    .map_err(|source| ValuesError::ProviderConfig {
                        object: object_name(cp),
                        source,
                    })
            }
            None => Ok(ControlPlaneConfig::default()),
        }
    }

    fn decode_infrastructure_status(
        &self,
        cp: &ControlPlane,
    ) -> ValuesResult<InfrastructureStatus> {
        let raw = cp
            .spec
            .infrastructure_provider_status
            .as_ref()
            .ok_or_else(|| ValuesError::MissingInfrastructureStatus(object_name(cp)))?;

        self.decoder
            .decode_value(raw)
            .map_err(|source| ValuesError::InfrastructureStatus {
                object: object_name(cp),
                source,
            })
    }

    async fn fetch_secret_with_checksum(
        &self,
        namespace: &str,
        name: &str,
        checksums: &mut Checksums,
    ) -> ValuesResult<Secret> {
        let secret = self
            .client
            .get_secret(namespace, name)
            .await
            .map_err(|source| ValuesError::SecretFetch {
                name: format!("{namespace}/{name}"),
                source,
            })?;

        let checksum = compute_checksum(&secret.data.clone().unwrap_or_default()).map_err(
            |source| ValuesError::Checksum {
                name: name.to_string(),
                source,
            },
        )?;
        debug!(secret = name, checksum = %checksum, "Computed secret checksum");
        checksums.insert(name.to_string(), checksum);

        Ok(secret)
    }

    async fn delete_legacy_cloud_provider_config_maps(&self, namespace: &str) -> ValuesResult<()> {
        for name in os::LEGACY_CLOUD_PROVIDER_CONFIG_MAPS {
            match self.client.delete_config_map(namespace, name).await {
                Err(e) if !e.is_not_found() => {
                    return Err(ValuesError::LegacyConfigMap {
                        name: format!("{namespace}/{name}"),
                        source: e,
                    })
                }
                _ => {}
            }
        }

        Ok(())
    }
}

fn object_name(cp: &ControlPlane) -> String {
    match cp.namespace() {
        Some(ns) => format!("{ns}/{}", cp.name_any()),
        None => cp.name_any(),
    }
}

fn into_values(value: Value) -> Values {
    match value {
        Value::Object(values) => values,
        _ => Values::new(),
    }
}

fn checksum_annotations(checksums: &Checksums, names: &[&str]) -> Value {
    Value::Object(
        names
            .iter()
            .map(|name| {
                (
                    format!("checksum/secret-{name}"),
                    checksums.get(*name).cloned().unwrap_or_default().into(),
                )
            })
            .collect(),
    )
}

fn proxy_values(cluster: &ClusterContext) -> Value {
    json!({
        "http_proxy": cluster.http_proxy(),
        "no_proxy": cluster.no_proxy(),
    })
}

fn maintenance_pod_labels() -> Value {
    let mut labels = Values::new();
    labels.insert(os::LABEL_POD_MAINTENANCE_RESTART.to_string(), "true".into());
    Value::Object(labels)
}

/// Load balancer classes of the floating pool matching the infrastructure's
/// floating pool. A pool pinned to the control plane's region wins over the
/// first region agnostic pool of the same name.
fn default_load_balancer_classes(
    cloud_profile_config: &CloudProfileConfig,
    region: &str,
    floating_pool_name: &str,
) -> Option<Vec<LoadBalancerClass>> {
    let mut fallback = None;
    let mut classes = None;

    for pool in &cloud_profile_config.constraints.floating_pools {
        if pool.name != floating_pool_name {
            continue;
        }

        match pool.region.as_deref() {
            None if fallback.is_none() => fallback = Some(pool),
            Some(r) if r == region => {
                classes = pool.load_balancer_classes.clone();
                break;
            }
            _ => {}
        }
    }

    classes.or_else(|| fallback.and_then(|pool| pool.load_balancer_classes.clone()))
}

fn config_chart_values(
    mut cp_config: ControlPlaneConfig,
    infra_status: &InfrastructureStatus,
    cloud_profile_config: Option<&CloudProfileConfig>,
    cp: &ControlPlane,
    credentials: &Credentials,
    cluster: &ClusterContext,
) -> ValuesResult<Values> {
    let networks = &infra_status.networks;
    let subnet = find_subnet_by_purpose(&networks.subnets, PURPOSE_NODES).map_err(|source| {
        ValuesError::Subnet {
            object: object_name(cp),
            source,
        }
    })?;

    let cloud_profile_config = cloud_profile_config.ok_or(ValuesError::MissingCloudProfileConfig)?;

    let keystone_url = find_keystone_url(
        &cloud_profile_config.keystone_urls,
        cloud_profile_config.keystone_url.as_deref(),
        &cp.spec.region,
    )?;

    let mut values = into_values(json!({
        "kubernetesVersion": cluster.kubernetes_version(),
        "domainName": credentials.domain_name,
        "tenantName": credentials.tenant_name,
        "username": credentials.username,
        "password": credentials.password,
        "region": cp.spec.region,
        "lbProvider": cp_config.load_balancer_provider,
        "floatingNetworkID": networks.floating_pool.id,
        "subnetID": subnet.id,
        "authUrl": keystone_url,
        "dhcpDomain": cloud_profile_config.dhcp_domain,
        "internalLB": cloud_profile_config.internal_lb,
        "requestTimeout": cloud_profile_config.request_timeout,
        "useOctavia": cloud_profile_config.use_octavia(),
        "rescanBlockStorageOnResize": cloud_profile_config.rescan_block_storage_on_resize.unwrap_or(false),
        "nodeVolumeAttachLimit": cloud_profile_config.node_volume_attach_limit,
    }));

    if cp_config.load_balancer_classes.is_none() {
        cp_config.load_balancer_classes = default_load_balancer_classes(
            cloud_profile_config,
            &cp.spec.region,
            &networks.floating_pool.name,
        );
    }
    let classes = cp_config.load_balancer_classes.unwrap_or_default();

    for (i, class) in classes.iter().enumerate() {
        if i == 0 || class.name == DEFAULT_LOAD_BALANCER_CLASS {
            set_string_value(&mut values, "floatingSubnetID", class.floating_subnet_id.as_deref());
            set_string_value(&mut values, "subnetID", class.subnet_id.as_deref());
        }
    }

    if let Some(class) = classes.iter().find(|c| c.name == PRIVATE_LOAD_BALANCER_CLASS) {
        set_string_value(&mut values, "subnetID", class.subnet_id.as_deref());
    }

    let floating_classes: Vec<Value> = classes
        .iter()
        .map(|class| {
            let mut floating_class = into_values(json!({ "name": class.name }));

            if !is_empty_string(class.floating_subnet_id.as_deref())
                && is_empty_string(class.floating_network_id.as_deref())
            {
                floating_class.insert(
                    "floatingNetworkID".to_string(),
                    networks.floating_pool.id.clone().into(),
                );
            } else {
                set_string_value(
                    &mut floating_class,
                    "floatingNetworkID",
                    class.floating_network_id.as_deref(),
                );
            }

            set_string_value(
                &mut floating_class,
                "floatingSubnetID",
                class.floating_subnet_id.as_deref(),
            );
            set_string_value(&mut floating_class, "subnetID", class.subnet_id.as_deref());

            Value::Object(floating_class)
        })
        .collect();

    if !floating_classes.is_empty() {
        values.insert("floatingClasses".to_string(), floating_classes.into());
    }

    Ok(values)
}

fn control_plane_chart_values(
    cp_config: &ControlPlaneConfig,
    cp: &ControlPlane,
    cluster: &ClusterContext,
    cloud_profile_config: &CloudProfileConfig,
    infra_status: &InfrastructureStatus,
    checksums: &Checksums,
    scaled_down: bool,
) -> ValuesResult<Values> {
    let ccm = ccm_chart_values(
        cp_config,
        cp,
        cluster,
        cloud_profile_config,
        checksums,
        scaled_down,
    );
    let csi = csi_controller_chart_values(cluster, checksums, scaled_down)?;
    let yawol = yawol_chart_values(cp, cluster, cloud_profile_config, infra_status, scaled_down);

    let mut values = Values::new();
    values.insert(os::CLOUD_CONTROLLER_MANAGER_NAME.to_string(), Value::Object(ccm));
    values.insert(os::CSI_CONTROLLER_NAME.to_string(), Value::Object(csi));
    values.insert(os::YAWOL_CONTROLLER_NAME.to_string(), Value::Object(yawol));

    Ok(values)
}

fn ccm_chart_values(
    cp_config: &ControlPlaneConfig,
    cp: &ControlPlane,
    cluster: &ClusterContext,
    cloud_profile_config: &CloudProfileConfig,
    checksums: &Checksums,
    scaled_down: bool,
) -> Values {
    let ccm_server = format!("{}-server", os::CLOUD_CONTROLLER_MANAGER_NAME);
    let mut values = into_values(json!({
        "enabled": true,
        "replicas": cluster.control_plane_replicas(scaled_down, 1),
        "clusterName": cp.namespace().unwrap_or_default(),
        "kubernetesVersion": cluster.kubernetes_version(),
        "podNetwork": cluster.pod_network(),
        "podAnnotations": checksum_annotations(checksums, &[
            os::CLOUD_CONTROLLER_MANAGER_NAME,
            &ccm_server,
            os::SECRET_NAME_CLOUD_PROVIDER,
            os::CLOUD_PROVIDER_CONFIG_NAME,
        ]),
        "podLabels": maintenance_pod_labels(),
        "proxy": proxy_values(cluster),
    }));

    // yawol replaces the service controller unless octavia is in use
    if cloud_profile_config.use_yawol() && !cloud_profile_config.use_octavia() {
        values.insert("controllers".to_string(), "*,-service".into());
    }

    if let Some(ccm) = &cp_config.cloud_controller_manager {
        values.insert("featureGates".to_string(), json!(ccm.feature_gates));
    }

    values
}

fn csi_controller_chart_values(
    cluster: &ClusterContext,
    checksums: &Checksums,
    scaled_down: bool,
) -> ValuesResult<Values> {
    if compare_versions(cluster.kubernetes_version(), "<", "1.17")? {
        return Ok(into_values(json!({ "enabled": false })));
    }

    let replicas = cluster.control_plane_replicas(scaled_down, 1);
    Ok(into_values(json!({
        "enabled": true,
        "replicas": replicas,
        "podAnnotations": checksum_annotations(checksums, &[
            os::CSI_PROVISIONER_NAME,
            os::CSI_ATTACHER_NAME,
            os::CSI_SNAPSHOTTER_NAME,
            os::CSI_RESIZER_NAME,
            os::CLOUD_PROVIDER_CSI_DISK_CONFIG_NAME,
        ]),
        "csiSnapshotController": {
            "replicas": replicas,
            "podAnnotations": checksum_annotations(checksums, &[os::CSI_SNAPSHOT_CONTROLLER_NAME]),
        },
        "proxy": proxy_values(cluster),
    })))
}

fn yawol_chart_values(
    cp: &ControlPlane,
    cluster: &ClusterContext,
    cloud_profile_config: &CloudProfileConfig,
    infra_status: &InfrastructureStatus,
    scaled_down: bool,
) -> Values {
    if cloud_profile_config.use_octavia() || !cloud_profile_config.use_yawol() {
        return into_values(json!({ "enabled": false }));
    }

    let ingress_domain = cluster.ingress_domain();
    let api_host = format!(
        "https://api.{}",
        ingress_domain.strip_prefix("i.").unwrap_or(ingress_domain)
    );

    into_values(json!({
        "enabled": true,
        "replicas": cluster.control_plane_replicas(scaled_down, 1),
        "yawolNamespace": cp.namespace().unwrap_or_default(),
        "yawolOSSecretName": os::CLOUD_PROVIDER_CONFIG_NAME,
        "yawolFloatingID": infra_status.networks.floating_pool.id,
        "yawolNetworkID": infra_status.networks.id,
        "yawolFlavorID": cloud_profile_config.yawol_flavor_id,
        "yawolImageID": cloud_profile_config.yawol_image_id,
        "yawolAPIHost": api_host,
        "podLabels": maintenance_pod_labels(),
    }))
}

fn control_plane_shoot_chart_values(
    cluster: &ClusterContext,
    checksums: &Checksums,
    csi_disabled: bool,
    cloud_provider_disk_config: Option<String>,
) -> ValuesResult<Values> {
    let resources: BTreeMap<&str, &ResourceRequirements> = cluster
        .shoot
        .spec
        .provider
        .component_resources
        .get(os::CSI_NODE_NAME)
        .map(|driver| ("driver", driver))
        .into_iter()
        .collect();

    let csi_node = json!({
        "enabled": !csi_disabled,
        "vpaEnabled": cluster.wants_vertical_pod_autoscaler(),
        "podAnnotations": checksum_annotations(checksums, &[os::CLOUD_PROVIDER_CSI_DISK_CONFIG_NAME]),
        "cloudProviderConfig": cloud_provider_disk_config,
        "proxy": proxy_values(cluster),
        "resources": serde_json::to_value(resources)?,
    });

    let mut values = Values::new();
    values.insert(
        os::CLOUD_CONTROLLER_MANAGER_NAME.to_string(),
        json!({ "enabled": true }),
    );
    values.insert(os::CSI_NODE_NAME.to_string(), csi_node);

    Ok(values)
}

fn storage_classes_chart_values(
    config: &CloudProfileConfig,
    legacy_provisioner: bool,
    wait_for_first_consumer: bool,
) -> Values {
    let storage_classes: Vec<Value> = match config.storage_classes.as_deref() {
        Some(classes) if !classes.is_empty() => classes
            .iter()
            .map(|sc| {
                let mut values = into_values(json!({ "name": sc.name }));
                if sc.default == Some(true) {
                    values.insert("default".to_string(), true.into());
                }
                for (key, map) in [
                    ("annotations", &sc.annotations),
                    ("labels", &sc.labels),
                    ("parameters", &sc.parameters),
                ] {
                    if let Some(map) = map.as_ref().filter(|m| !m.is_empty()) {
                        values.insert(key.to_string(), json!(map));
                    }
                }
                let provisioner = sc
                    .provisioner
                    .as_deref()
                    .filter(|p| !p.is_empty())
                    .unwrap_or(os::CSI_PROVISIONER);
                values.insert("provisioner".to_string(), provisioner.into());
                set_string_value(&mut values, "reclaimPolicy", sc.reclaim_policy.as_deref());

                Value::Object(values)
            })
            .collect(),
        _ => {
            let provisioner = match legacy_provisioner {
                true => os::LEGACY_PROVISIONER,
                false => os::CSI_PROVISIONER,
            };
            let binding_mode = match wait_for_first_consumer {
                true => "WaitForFirstConsumer",
                false => "Immediate",
            };

            vec![
                json!({
                    "name": "default",
                    "default": true,
                    "provisioner": provisioner,
                    "volumeBindingMode": binding_mode,
                }),
                json!({
                    "name": "default-class",
                    "provisioner": provisioner,
                    "volumeBindingMode": binding_mode,
                }),
            ]
        }
    };

    into_values(json!({ "storageclasses": storage_classes }))
}
