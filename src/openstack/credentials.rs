use std::fmt;

use k8s_openapi::api::core::v1::Secret;
use thiserror::Error;

use crate::{
    api::extensions::SecretReference,
    client::{ClientError, KubeClient},
};

pub static DOMAIN_NAME: &str = "domainName";
pub static TENANT_NAME: &str = "tenantName";
pub static USERNAME: &str = "username";
pub static PASSWORD: &str = "password";

pub type CredentialsResult<T> = std::result::Result<T, CredentialsError>;

#[derive(Error, Debug)]
pub enum CredentialsError {
    #[error("Secret fetch error: {0}")]
    SecretFetch(#[from] ClientError),

    #[error("missing {0:?} field in secret")]
    MissingField(&'static str),

    #[error("field {0:?} in secret is not valid UTF-8")]
    InvalidField(&'static str),
}

/// OpenStack user credentials
#[derive(Clone, Default, PartialEq)]
pub struct Credentials {
    pub domain_name: String,
    pub tenant_name: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("domain_name", &self.domain_name)
            .field("tenant_name", &self.tenant_name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl TryFrom<&Secret> for Credentials {
    type Error = CredentialsError;

    fn try_from(secret: &Secret) -> CredentialsResult<Self> {
        let field = |key: &'static str| -> CredentialsResult<String> {
            let value = secret
                .data
                .as_ref()
                .and_then(|data| data.get(key))
                .ok_or(CredentialsError::MissingField(key))?;
            let value = String::from_utf8(value.0.clone())
                .map_err(|_| CredentialsError::InvalidField(key))?;
            match value.is_empty() {
                true => Err(CredentialsError::MissingField(key)),
                false => Ok(value),
            }
        };

        Ok(Self {
            domain_name: field(DOMAIN_NAME)?,
            tenant_name: field(TENANT_NAME)?,
            username: field(USERNAME)?,
            password: field(PASSWORD)?,
        })
    }
}

/// Reads the credentials from the secret referenced by a control plane.
pub async fn get_credentials(
    client: &dyn KubeClient,
    secret_ref: &SecretReference,
) -> CredentialsResult<Credentials> {
    let secret = client
        .get_secret(&secret_ref.namespace, &secret_ref.name)
        .await?;

    Credentials::try_from(&secret)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use k8s_openapi::ByteString;

    use super::*;
    use crate::client::MockKubeClient;

    fn secret(fields: &[(&str, &str)]) -> Secret {
        Secret {
            data: Some(
                fields
                    .iter()
                    .map(|(k, v)| (k.to_string(), ByteString(v.as_bytes().to_vec())))
                    .collect::<BTreeMap<_, _>>(),
            ),
            ..Default::default()
        }
    }

    fn secret_ref() -> SecretReference {
        SecretReference {
            name: "cloudprovider".into(),
            namespace: "shoot--foo--bar".into(),
        }
    }

    #[tokio::test]
    async fn reads_credentials() {
        let mut client = MockKubeClient::new();
        client
            .expect_get_secret()
            .withf(|ns, name| ns == "shoot--foo--bar" && name == "cloudprovider")
            .returning(|_, _| {
                Ok(secret(&[
                    ("domainName", "domain"),
                    ("tenantName", "tenant"),
                    ("username", "user"),
                    ("password", "secret"),
                ]))
            });

        let credentials = get_credentials(&client, &secret_ref()).await.unwrap();
        assert_eq!(
            Credentials {
                domain_name: "domain".into(),
                tenant_name: "tenant".into(),
                username: "user".into(),
                password: "secret".into(),
            },
            credentials
        );
        assert!(!format!("{credentials:?}").contains("secret\""));
    }

    #[tokio::test]
    async fn missing_field_is_reported() {
        let mut client = MockKubeClient::new();
        client.expect_get_secret().returning(|_, _| {
            Ok(secret(&[
                ("domainName", "domain"),
                ("tenantName", "tenant"),
                ("username", "user"),
                ("password", ""),
            ]))
        });

        let err = get_credentials(&client, &secret_ref()).await.unwrap_err();
        assert!(matches!(err, CredentialsError::MissingField("password")));
    }

    #[tokio::test]
    async fn missing_secret_is_reported() {
        let mut client = MockKubeClient::new();
        client.expect_get_secret().returning(|ns, name| {
            Err(ClientError::NotFound {
                kind: "Secret",
                namespace: ns.to_string(),
                name: name.to_string(),
            })
        });

        let err = get_credentials(&client, &secret_ref()).await.unwrap_err();
        assert!(matches!(err, CredentialsError::SecretFetch(e) if e.is_not_found()));
    }
}
