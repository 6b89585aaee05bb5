//! Charts rendered for an OpenStack control plane.
//!
//! The descriptors name the images a chart needs and the objects it manages,
//! values from [`super::ValuesProvider`] are published under the chart name.

use serde::Serialize;

use crate::openstack::{self as os, INTERNAL_CHARTS_PATH};

pub static CONFIG_CHART_NAME: &str = "cloud-provider-config";
pub static CONTROL_PLANE_CHART_NAME: &str = "seed-controlplane";
pub static CONTROL_PLANE_SHOOT_CHART_NAME: &str = "shoot-system-components";
pub static STORAGE_CLASSES_CHART_NAME: &str = "shoot-storageclasses";

/// Object managed by a chart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Object {
    pub kind: &'static str,
    pub name: String,
}

#[derive(Clone, Debug, Default)]
pub struct Chart {
    pub name: &'static str,
    pub path: Option<String>,
    pub images: Vec<&'static str>,
    pub objects: Vec<Object>,
    pub sub_charts: Vec<Chart>,
}

impl Chart {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            path: Some(format!("{INTERNAL_CHARTS_PATH}/{name}")),
            ..Default::default()
        }
    }

    fn sub_chart(name: &'static str) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    fn images(mut self, images: &[&'static str]) -> Self {
        self.images = images.to_vec();
        self
    }

    fn objects(mut self, objects: impl IntoIterator<Item = Object>) -> Self {
        self.objects = objects.into_iter().collect();
        self
    }

    /// Images of this chart and all of its sub-charts, without duplicates.
    pub fn all_images(&self) -> Vec<&'static str> {
        let mut images = self.images.clone();
        for sub_chart in &self.sub_charts {
            for image in sub_chart.all_images() {
                if !images.contains(&image) {
                    images.push(image);
                }
            }
        }
        images
    }

    /// Objects of this chart and all of its sub-charts.
    pub fn all_objects(&self) -> Vec<&Object> {
        self.objects
            .iter()
            .chain(self.sub_charts.iter().flat_map(|c| c.all_objects()))
            .collect()
    }

    pub fn summary(&self) -> ChartSummary {
        ChartSummary {
            path: self.path.clone(),
            images: self.all_images(),
            objects: self.all_objects().into_iter().cloned().collect(),
        }
    }
}

/// Flattened view of a chart, served next to its values.
#[derive(Clone, Debug, Serialize)]
pub struct ChartSummary {
    pub path: Option<String>,
    pub images: Vec<&'static str>,
    pub objects: Vec<Object>,
}

fn object(kind: &'static str, name: impl Into<String>) -> Object {
    Object {
        kind,
        name: name.into(),
    }
}

/// Role and binding pairs granted to a component, cluster wide and namespaced.
fn rbac(name: &str) -> [Object; 4] {
    let name = format!("{}{name}", os::USERNAME_PREFIX);
    [
        object("ClusterRole", &name),
        object("ClusterRoleBinding", &name),
        object("Role", &name),
        object("RoleBinding", &name),
    ]
}

/// Components running in the seed next to the controller of a yawol pair.
fn yawol_objects(name: &str) -> [Object; 5] {
    let role = format!("extensions.gardener.cloud:{name}");
    [
        object("Deployment", name),
        object("ServiceAccount", name),
        object("VerticalPodAutoscaler", format!("{name}-vpa")),
        object("Role", &role),
        object("RoleBinding", &role),
    ]
}

pub fn config_chart() -> Chart {
    Chart::new(CONFIG_CHART_NAME).objects([
        object("Secret", os::CLOUD_PROVIDER_CONFIG_NAME),
        object("Secret", os::CLOUD_PROVIDER_DISK_CONFIG_NAME),
    ])
}

pub fn control_plane_chart() -> Chart {
    let ccm = os::CLOUD_CONTROLLER_MANAGER_NAME;

    Chart {
        sub_charts: vec![
            Chart::sub_chart(ccm)
                .images(&[os::CLOUD_CONTROLLER_MANAGER_IMAGE_NAME])
                .objects([
                    object("Service", ccm),
                    object("Deployment", ccm),
                    object("ConfigMap", format!("{ccm}-monitoring-config")),
                    object("VerticalPodAutoscaler", format!("{ccm}-vpa")),
                ]),
            Chart::sub_chart(os::YAWOL_CONTROLLER_NAME)
                .images(&[
                    os::YAWOL_CONTROLLER_IMAGE_NAME,
                    os::YAWOL_CLOUD_CONTROLLER_IMAGE_NAME,
                ])
                .objects(
                    yawol_objects(os::YAWOL_CONTROLLER_NAME)
                        .into_iter()
                        .chain(yawol_objects(os::YAWOL_CLOUD_CONTROLLER_NAME)),
                ),
            Chart::sub_chart(os::CSI_CONTROLLER_NAME)
                .images(&[
                    os::CSI_DRIVER_CINDER_IMAGE_NAME,
                    os::CSI_PROVISIONER_IMAGE_NAME,
                    os::CSI_ATTACHER_IMAGE_NAME,
                    os::CSI_SNAPSHOTTER_IMAGE_NAME,
                    os::CSI_RESIZER_IMAGE_NAME,
                    os::CSI_LIVENESS_PROBE_IMAGE_NAME,
                    os::CSI_SNAPSHOT_CONTROLLER_IMAGE_NAME,
                ])
                .objects([
                    object("Deployment", os::CSI_CONTROLLER_NAME),
                    object(
                        "VerticalPodAutoscaler",
                        format!("{}-vpa", os::CSI_CONTROLLER_NAME),
                    ),
                    object("Deployment", os::CSI_SNAPSHOT_CONTROLLER_NAME),
                    object(
                        "VerticalPodAutoscaler",
                        format!("{}-vpa", os::CSI_SNAPSHOT_CONTROLLER_NAME),
                    ),
                ]),
        ],
        ..Chart::new(CONTROL_PLANE_CHART_NAME)
    }
}

pub fn control_plane_shoot_chart() -> Chart {
    let csi_driver = format!("{}{}", os::USERNAME_PREFIX, os::CSI_DRIVER_NAME);
    let node_controller = "system:controller:cloud-node-controller";

    let csi_node_objects = [
        object("DaemonSet", os::CSI_NODE_NAME),
        object("CSIDriver", os::CSI_PROVISIONER),
        object("ServiceAccount", os::CSI_DRIVER_NAME),
        object("Secret", os::CLOUD_PROVIDER_CONFIG_NAME),
        object("ClusterRole", &csi_driver),
        object("ClusterRoleBinding", &csi_driver),
        object("PodSecurityPolicy", csi_driver.replace(':', ".")),
        object("VerticalPodAutoscaler", os::CSI_NODE_NAME),
        object(
            "CustomResourceDefinition",
            "volumesnapshotclasses.snapshot.storage.k8s.io",
        ),
        object(
            "CustomResourceDefinition",
            "volumesnapshotcontents.snapshot.storage.k8s.io",
        ),
        object(
            "CustomResourceDefinition",
            "volumesnapshots.snapshot.storage.k8s.io",
        ),
    ]
    .into_iter()
    .chain(
        [
            os::CSI_PROVISIONER_NAME,
            os::CSI_ATTACHER_NAME,
            os::CSI_SNAPSHOT_CONTROLLER_NAME,
            os::CSI_SNAPSHOTTER_NAME,
            os::CSI_RESIZER_NAME,
        ]
        .into_iter()
        .flat_map(rbac),
    );

    Chart {
        sub_charts: vec![
            Chart::new(os::CLOUD_CONTROLLER_MANAGER_NAME).objects([
                object("ClusterRole", node_controller),
                object("ClusterRoleBinding", node_controller),
            ]),
            Chart::sub_chart(os::CSI_NODE_NAME)
                .images(&[
                    os::CSI_DRIVER_CINDER_IMAGE_NAME,
                    os::CSI_NODE_DRIVER_REGISTRAR_IMAGE_NAME,
                    os::CSI_LIVENESS_PROBE_IMAGE_NAME,
                ])
                .objects(csi_node_objects),
        ],
        ..Chart::new(CONTROL_PLANE_SHOOT_CHART_NAME)
    }
}

pub fn storage_classes_chart() -> Chart {
    Chart::new(STORAGE_CLASSES_CHART_NAME)
}

/// All charts of a control plane, in rendering order.
pub fn all() -> [Chart; 4] {
    [
        config_chart(),
        control_plane_chart(),
        control_plane_shoot_chart(),
        storage_classes_chart(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charts_live_in_internal_charts() {
        for chart in all() {
            assert_eq!(
                Some(format!("charts/internal/{}", chart.name)),
                chart.path
            );
        }
    }

    #[test]
    fn control_plane_chart_collects_sub_chart_images() {
        let images = control_plane_chart().all_images();
        assert_eq!(10, images.len());
        assert!(images.contains(&"cloud-controller-manager"));
        assert!(images.contains(&"yawol-cloud-controller"));
        assert!(images.contains(&"csi-snapshot-controller"));
    }

    #[test]
    fn shoot_chart_deduplicates_images() {
        let chart = control_plane_shoot_chart();
        assert_eq!(
            vec![
                "csi-driver-cinder",
                "csi-node-driver-registrar",
                "csi-liveness-probe"
            ],
            chart.all_images()
        );
    }

    #[test]
    fn shoot_chart_grants_csi_sidecars() {
        let chart = control_plane_shoot_chart();
        let objects = chart.all_objects();
        assert_eq!(2 + 11 + 5 * 4, objects.len());
        assert!(objects.contains(&&object(
            "RoleBinding",
            "extensions.gardener.cloud:provider-openstack:csi-resizer"
        )));
        assert!(objects.contains(&&object(
            "PodSecurityPolicy",
            "extensions.gardener.cloud.provider-openstack.csi-driver"
        )));
    }

    #[test]
    fn summary_flattens_sub_charts() {
        let chart = control_plane_shoot_chart();
        let summary = chart.summary();
        assert_eq!(
            Some("charts/internal/shoot-system-components"),
            summary.path.as_deref()
        );
        assert_eq!(chart.all_images(), summary.images);
        assert_eq!(chart.all_objects().len(), summary.objects.len());
        assert_eq!(
            object("ClusterRole", "system:controller:cloud-node-controller"),
            summary.objects[0]
        );
    }

    #[test]
    fn yawol_sub_chart_manages_both_controllers() {
        let chart = control_plane_chart();
        let yawol = chart
            .sub_charts
            .iter()
            .find(|c| c.name == "yawol-controller")
            .unwrap();
        assert_eq!(10, yawol.objects.len());
        assert_eq!(
            object("Role", "extensions.gardener.cloud:yawol-cloud-controller"),
            yawol.objects[8]
        );
    }
}
