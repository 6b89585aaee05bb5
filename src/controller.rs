use std::{collections::BTreeMap, sync::Arc};

use chrono::Utc;
use futures::StreamExt;
use kube::{
    api::{Api, ListParams, ResourceExt},
    client::Client,
    runtime::{
        controller::{Action, Controller},
        events::{Event, EventType},
        watcher::Config,
    },
    Resource,
};
use tokio::{sync::RwLock, time::Duration};
use tracing::*;

use crate::{
    api::extensions::ControlPlane,
    client::{KubeClient, KubeClientImpl},
    controllers::{
        cluster::ClusterContext,
        controlplane::{charts, Checksums, Values, ValuesProvider},
    },
    metrics::Diagnostics,
    telemetry, Error, Metrics, Result,
};

/// Provider type of the control planes handled here.
pub static PROVIDER_TYPE: &str = "openstack";

static REDACTED: &str = "<redacted>";

// Context for the reconciler
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client
    pub client: Client,
    /// Client used while deriving values
    pub kube_client: Arc<dyn KubeClient>,
    pub provider: ValuesProvider,
    /// Diagnostoics read by the web server
    pub diagnostics: Arc<RwLock<Diagnostics>>,
    /// Prom metrics
    pub metrics: Metrics,
    /// Delay before values are derived again
    pub requeue: Duration,
}

/// Values of all charts of a control plane, keyed by chart name.
///
/// The password of the config chart is redacted, the result is meant for
/// inspection only.
pub async fn compute_chart_values(
    provider: &ValuesProvider,
    cp: &ControlPlane,
    cluster: &ClusterContext,
) -> Result<BTreeMap<String, Values>> {
    let mut checksums = Checksums::new();
    let scaled_down = cluster.is_hibernated();

    let mut config = provider.get_config_chart_values(cp, cluster).await?;
    if let Some(password) = config.get_mut("password") {
        *password = REDACTED.into();
    }
    let control_plane = provider
        .get_control_plane_chart_values(cp, cluster, &mut checksums, scaled_down)
        .await?;
    let shoot = provider
        .get_control_plane_shoot_chart_values(cp, cluster, &mut checksums)
        .await?;
    let storage_classes = provider.get_storage_classes_chart_values(cp, cluster).await?;

    Ok(BTreeMap::from([
        (charts::CONFIG_CHART_NAME.to_string(), config),
        (charts::CONTROL_PLANE_CHART_NAME.to_string(), control_plane),
        (charts::CONTROL_PLANE_SHOOT_CHART_NAME.to_string(), shoot),
        (charts::STORAGE_CLASSES_CHART_NAME.to_string(), storage_classes),
    ]))
}

#[instrument(skip_all, fields(trace_id = display(telemetry::get_trace_id()), name = cp.name_any(), namespace = cp.namespace()), err)]
async fn reconcile(cp: Arc<ControlPlane>, ctx: Arc<Context>) -> Result<Action> {
    let _timer = ctx.metrics.count_and_measure();
    ctx.diagnostics.write().await.last_event = Utc::now();

    if cp.spec.type_ != PROVIDER_TYPE {
        debug!(provider = %cp.spec.type_, "Skipping foreign control plane");
        return Ok(Action::await_change());
    }

    let namespace = cp.namespace().ok_or(Error::IllegalControlPlane)?;
    let cluster = ctx.kube_client.get_cluster(&namespace).await?;
    let cluster = ClusterContext::try_from(&cluster)?;
    debug!(version = cluster.kubernetes_version(), "Reconciling");

    let values = compute_chart_values(&ctx.provider, &cp, &cluster).await?;

    let key = format!("{namespace}/{}", cp.name_any());
    let changed = ctx.diagnostics.read().await.values.get(&key) != Some(&values);
    if changed {
        info!("Chart values changed");
        ctx.diagnostics
            .read()
            .await
            .recorder(ctx.client.clone())
            .publish(
                &Event {
                    type_: EventType::Normal,
                    reason: "ValuesUpdated".into(),
                    note: Some(format!(
                        "Derived values for {} charts of `{}`",
                        values.len(),
                        key
                    )),
                    action: "Reconciling".into(),
                    secondary: None,
                },
                &cp.object_ref(&()),
            )
            .await?;
        ctx.diagnostics.write().await.values.insert(key, values);
    }

    Ok(Action::requeue(ctx.requeue))
}

fn error_policy(cp: Arc<ControlPlane>, error: &Error, ctx: Arc<Context>) -> Action {
    warn!("reconcile failed: {:?}", error);
    ctx.metrics.reconcile_failure(&cp, error);
    Action::requeue(ctx.requeue)
}

/// State shared between the controller and the web server
#[derive(Clone, Default)]
pub struct State {
    /// Diagnostics populated by the reconciler
    diagnostics: Arc<RwLock<Diagnostics>>,
    /// Metrics registry
    registry: prometheus::Registry,
}

/// State wrapper around the controller outputs for the web server
impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metrics getter
    pub fn metrics(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }

    /// State getter
    pub async fn diagnostics(&self) -> Diagnostics {
        self.diagnostics.read().await.clone()
    }

    // Create a Controller Context that can update State
    pub fn to_context(&self, client: Client, requeue: Duration) -> Result<Arc<Context>> {
        let kube_client: Arc<dyn KubeClient> = Arc::new(KubeClientImpl::new(client.clone()));
        Ok(Arc::new(Context {
            client,
            provider: ValuesProvider::new(kube_client.clone()),
            kube_client,
            metrics: Metrics::default().register(&self.registry)?,
            diagnostics: self.diagnostics.clone(),
            requeue,
        }))
    }
}

/// Initialize the controller and shared state (given the crd is installed)
pub async fn run(state: State, requeue: Duration) -> Result<()> {
    let client = Client::try_default().await?;
    let control_planes = Api::<ControlPlane>::all(client.clone());
    if let Err(e) = control_planes.list(&ListParams::default().limit(1)).await {
        error!("ControlPlanes are not queryable; {e:?}. Is the CRD installed?");
        info!("Installation: cargo run -- --crd | kubectl apply -f -");
        return Err(e.into());
    }

    Controller::new(control_planes, Config::default().any_semantic())
        .shutdown_on_signal()
        .run(reconcile, error_policy, state.to_context(client, requeue)?)
        .filter_map(|x| async move { std::result::Result::ok(x) })
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use k8s_openapi::{api::core::v1::Secret, ByteString};
    use serde_json::{json, Value};

    use super::*;
    use crate::{
        api::extensions::{Cluster, ClusterSpec, ControlPlaneSpec, SecretReference},
        client::{ClientError, MockKubeClient},
    };

    fn control_plane() -> ControlPlane {
        let mut cp = ControlPlane::new(
            "control-plane",
            ControlPlaneSpec {
                type_: PROVIDER_TYPE.into(),
                region: "eu-1".into(),
                secret_ref: SecretReference {
                    name: "cloudprovider".into(),
                    namespace: "shoot--foo--bar".into(),
                },
                provider_config: None,
                infrastructure_provider_status: Some(json!({
                    "apiVersion": "openstack.provider.extensions.gardener.cloud/v1alpha1",
                    "kind": "InfrastructureStatus",
                    "networks": {
                        "id": "network-id",
                        "floatingPool": {"id": "fip-id", "name": "fip"},
                        "subnets": [{"purpose": "nodes", "id": "subnet-nodes"}],
                    },
                })),
            },
        );
        cp.metadata.namespace = Some("shoot--foo--bar".into());
        cp
    }

    fn cluster(hibernated: bool) -> ClusterContext {
        let cluster = Cluster::new(
            "shoot--foo--bar",
            ClusterSpec {
                cloud_profile: json!({
                    "metadata": {"name": "openstack"},
                    "spec": {"providerConfig": {
                        "apiVersion": "openstack.provider.extensions.gardener.cloud/v1alpha1",
                        "kind": "CloudProfileConfig",
                        "keystoneURL": "https://keystone",
                    }},
                }),
                seed: json!({}),
                shoot: json!({"spec": {
                    "kubernetes": {"version": "1.20.1"},
                    "hibernation": {"enabled": hibernated},
                }}),
            },
        );
        ClusterContext::try_from(&cluster).unwrap()
    }

    fn client() -> MockKubeClient {
        let mut client = MockKubeClient::new();
        client.expect_get_secret().returning(|_, name| {
            let data = match name {
                "cloudprovider" => vec![
                    ("domainName", "domain"),
                    ("tenantName", "tenant"),
                    ("username", "user"),
                    ("password", "hunter2"),
                ],
                _ => vec![("cloudprovider.conf", "[Global]")],
            };
            Ok(Secret {
                data: Some(
                    data.into_iter()
                        .map(|(k, v)| (k.to_string(), ByteString(v.into())))
                        .collect(),
                ),
                ..Default::default()
            })
        });
        client.expect_delete_config_map().returning(|ns, name| {
            Err(ClientError::NotFound {
                kind: "ConfigMap",
                namespace: ns.to_string(),
                name: name.to_string(),
            })
        });
        client
    }

    #[tokio::test]
    async fn computes_values_for_all_charts() {
        let provider = ValuesProvider::new(Arc::new(client()));

        let values = compute_chart_values(&provider, &control_plane(), &cluster(false))
            .await
            .unwrap();

        assert_eq!(
            vec![
                "cloud-provider-config",
                "seed-controlplane",
                "shoot-storageclasses",
                "shoot-system-components",
            ],
            values.keys().collect::<Vec<_>>()
        );
        assert_eq!(
            json!(REDACTED),
            values["cloud-provider-config"]["password"]
        );
        assert_eq!(
            json!(1),
            values["seed-controlplane"]["cloud-controller-manager"]["replicas"]
        );
        assert_eq!(
            Value::String("[Global]".into()),
            values["shoot-system-components"]["csi-driver-node"]["cloudProviderConfig"]
        );
    }

    #[tokio::test]
    async fn hibernated_shoots_are_scaled_down() {
        let provider = ValuesProvider::new(Arc::new(client()));

        let values = compute_chart_values(&provider, &control_plane(), &cluster(true))
            .await
            .unwrap();

        let control_plane = &values["seed-controlplane"];
        assert_eq!(json!(0), control_plane["cloud-controller-manager"]["replicas"]);
        assert_eq!(json!(0), control_plane["csi-driver-controller"]["replicas"]);
    }

    #[tokio::test]
    async fn values_errors_surface_as_crate_errors() {
        let provider = ValuesProvider::new(Arc::new(client()));
        let mut cp = control_plane();
        cp.spec.infrastructure_provider_status = None;

        let err = compute_chart_values(&provider, &cp, &cluster(false))
            .await
            .unwrap_err();
        assert_eq!("missinginfrastructurestatus", err.metric_label());
    }
}
