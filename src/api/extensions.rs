use kube::CustomResource;
use schemars::{
    gen::SchemaGenerator,
    schema::{InstanceType, Schema, SchemaObject},
    JsonSchema,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema of embedded raw objects, an object with arbitrary fields.
fn raw_object(_gen: &mut SchemaGenerator) -> Schema {
    Schema::Object(SchemaObject {
        instance_type: Some(InstanceType::Object.into()),
        extensions: [(
            "x-kubernetes-preserve-unknown-fields".to_string(),
            Value::Bool(true),
        )]
        .into_iter()
        .collect(),
        ..Default::default()
    })
}

/// ControlPlane describes the provider specific control plane of a shoot.
#[derive(CustomResource, Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[kube(
    kind = "ControlPlane",
    group = "extensions.gardener.cloud",
    version = "v1alpha1",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneSpec {
    /// Provider type, only `openstack` control planes are handled.
    #[serde(rename = "type")]
    pub type_: String,

    /// Region of the shoot infrastructure.
    pub region: String,

    /// Reference to the secret holding the OpenStack credentials.
    pub secret_ref: SecretReference,

    /// Raw `ControlPlaneConfig`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "raw_object")]
    pub provider_config: Option<Value>,

    /// Raw `InfrastructureStatus` reported by the infrastructure controller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "raw_object")]
    pub infrastructure_provider_status: Option<Value>,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
pub struct SecretReference {
    pub name: String,
    pub namespace: String,
}

/// Cluster holds the Gardener resources a seed namespace belongs to.
#[derive(CustomResource, Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[kube(
    kind = "Cluster",
    group = "extensions.gardener.cloud",
    version = "v1alpha1"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Raw `CloudProfile`.
    #[schemars(schema_with = "raw_object")]
    pub cloud_profile: Value,

    /// Raw `Seed`.
    #[schemars(schema_with = "raw_object")]
    pub seed: Value,

    /// Raw `Shoot`.
    #[schemars(schema_with = "raw_object")]
    pub shoot: Value,
}
