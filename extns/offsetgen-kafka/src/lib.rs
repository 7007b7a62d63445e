use rdkafka::config::ClientConfig;
use tracing::warn;

/// Env based configuration of the Kafka fetcher.
pub mod config;
pub use config::KafkaFetcherConfig;

/// [offsetgen_core::PartitionSnapshotFetcher] backed by Kafka metadata and watermark queries.
pub mod fetcher;
pub use fetcher::KafkaFetcher;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Connecting to Kafka {server} - {error}")]
    Connection { server: String, error: String },

    #[error("Kafka - {0}")]
    Kafka(String),

    #[error("Config - {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl From<Error> for offsetgen_core::Error {
    fn from(value: Error) -> Self {
        match value {
            Error::Config(e) => offsetgen_core::Error::Config(e),
            Error::Connection { server, error } => offsetgen_core::Error::BrokerUnavailable(
                format!("Failed to connect to Kafka server: {server} - {error}"),
            ),
            Error::Kafka(e) | Error::Other(e) => offsetgen_core::Error::BrokerUnavailable(e),
        }
    }
}

/// SASL credentials used to connect to Kafka.
#[derive(Debug, Clone, PartialEq)]
pub struct KafkaSaslAuth {
    /// PLAIN, SCRAM-SHA-256, SCRAM-SHA-512, ...
    pub mechanism: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TlsConfig {
    pub insecure_skip_verify: bool,
    pub ca_cert: Option<String>,
    pub client_auth: Option<TlsClientAuthCerts>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TlsClientAuthCerts {
    pub client_cert: String,
    pub client_cert_private_key: String,
}

/// Applies the security settings to the librdkafka client config.
pub(crate) fn update_auth_config(
    client_config: &mut ClientConfig,
    tls: Option<TlsConfig>,
    auth: Option<KafkaSaslAuth>,
) {
    let protocol = match (&auth, &tls) {
        (Some(_), Some(_)) => "SASL_SSL",
        (Some(_), None) => "SASL_PLAINTEXT",
        (None, Some(_)) => "SSL",
        (None, None) => return,
    };
    client_config.set("security.protocol", protocol);

    if let Some(auth) = auth {
        client_config
            .set("sasl.mechanisms", auth.mechanism)
            .set("sasl.username", auth.username)
            .set("sasl.password", auth.password);
    }

    if let Some(tls_config) = tls {
        if tls_config.insecure_skip_verify {
            warn!(
                "'insecureSkipVerify' is set to true, certificate validation will not be performed when connecting to Kafka server"
            );
            client_config
                .set("enable.ssl.certificate.verification", "false")
                .set("ssl.endpoint.identification.algorithm", "none");
        }
        if let Some(ca_cert) = tls_config.ca_cert {
            client_config.set("ssl.ca.location", ca_cert);
        }
        if let Some(client_auth) = tls_config.client_auth {
            client_config
                .set("ssl.certificate.location", client_auth.client_cert)
                .set("ssl.key.location", client_auth.client_cert_private_key);
        }
    }
}
