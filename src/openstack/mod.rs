//! Names shared between the charts and the values derived for them.

pub mod credentials;

pub use credentials::{get_credentials, Credentials, CredentialsError};

/// Directory holding the charts shipped with the extension.
pub static INTERNAL_CHARTS_PATH: &str = "charts/internal";

pub static CLOUD_CONTROLLER_MANAGER_NAME: &str = "cloud-controller-manager";
pub static CLOUD_CONTROLLER_MANAGER_IMAGE_NAME: &str = "cloud-controller-manager";

pub static CSI_CONTROLLER_NAME: &str = "csi-driver-controller";
pub static CSI_NODE_NAME: &str = "csi-driver-node";
pub static CSI_DRIVER_NAME: &str = "csi-driver";
pub static CSI_PROVISIONER_NAME: &str = "csi-provisioner";
pub static CSI_ATTACHER_NAME: &str = "csi-attacher";
pub static CSI_SNAPSHOTTER_NAME: &str = "csi-snapshotter";
pub static CSI_RESIZER_NAME: &str = "csi-resizer";
pub static CSI_SNAPSHOT_CONTROLLER_NAME: &str = "csi-snapshot-controller";

pub static CSI_DRIVER_CINDER_IMAGE_NAME: &str = "csi-driver-cinder";
pub static CSI_PROVISIONER_IMAGE_NAME: &str = "csi-provisioner";
pub static CSI_ATTACHER_IMAGE_NAME: &str = "csi-attacher";
pub static CSI_SNAPSHOTTER_IMAGE_NAME: &str = "csi-snapshotter";
pub static CSI_RESIZER_IMAGE_NAME: &str = "csi-resizer";
pub static CSI_NODE_DRIVER_REGISTRAR_IMAGE_NAME: &str = "csi-node-driver-registrar";
pub static CSI_LIVENESS_PROBE_IMAGE_NAME: &str = "csi-liveness-probe";
pub static CSI_SNAPSHOT_CONTROLLER_IMAGE_NAME: &str = "csi-snapshot-controller";

pub static YAWOL_CONTROLLER_NAME: &str = "yawol-controller";
pub static YAWOL_CLOUD_CONTROLLER_NAME: &str = "yawol-cloud-controller";
pub static YAWOL_CONTROLLER_IMAGE_NAME: &str = "yawol-controller";
pub static YAWOL_CLOUD_CONTROLLER_IMAGE_NAME: &str = "yawol-cloud-controller";

/// Secret holding the cloud provider config of the cloud controller manager.
pub static CLOUD_PROVIDER_CONFIG_NAME: &str = "cloud-provider-config";
pub static CLOUD_PROVIDER_DISK_CONFIG_NAME: &str = "cloud-provider-disk-config";
/// Secret holding the cloud provider config of the CSI driver.
pub static CLOUD_PROVIDER_CSI_DISK_CONFIG_NAME: &str = "cloud-provider-disk-config-csi";
/// Data key of the rendered config inside the cloud provider config secrets.
pub static CLOUD_PROVIDER_CONFIG_DATA_KEY: &str = "cloudprovider.conf";

/// Secret holding the provider credentials in the seed namespace.
pub static SECRET_NAME_CLOUD_PROVIDER: &str = "cloudprovider";

pub static USERNAME_PREFIX: &str = "extensions.gardener.cloud:provider-openstack:";

/// Pods carrying this label are restarted during the maintenance window.
pub static LABEL_POD_MAINTENANCE_RESTART: &str = "maintenance.gardener.cloud/restart";

pub static CSI_PROVISIONER: &str = "cinder.csi.openstack.org";
pub static LEGACY_PROVISIONER: &str = "kubernetes.io/cinder";

/// Config maps replaced by the `cloud-provider-config` secret.
pub static LEGACY_CLOUD_PROVIDER_CONFIG_MAPS: [&str; 2] = [
    "cloud-provider-config-cloud-controller-manager",
    "cloud-provider-config-kube-controller-manager",
];
