use std::collections::HashMap;
use std::time::Duration;

use crate::{Error, KafkaSaslAuth, Result, TlsClientAuthCerts, TlsConfig};

const DEFAULT_TIMEOUT_MILLIS: u64 = 5000;

const ENV_BROKERS: &str = "OFFSETGEN_KAFKA_BROKERS";
const ENV_TIMEOUT_MILLIS: &str = "OFFSETGEN_KAFKA_TIMEOUT_MS";
const ENV_SASL_MECHANISM: &str = "OFFSETGEN_KAFKA_SASL_MECHANISM";
const ENV_SASL_USERNAME: &str = "OFFSETGEN_KAFKA_SASL_USERNAME";
const ENV_SASL_PASSWORD: &str = "OFFSETGEN_KAFKA_SASL_PASSWORD";
const ENV_TLS_ENABLED: &str = "OFFSETGEN_KAFKA_TLS_ENABLED";
const ENV_TLS_INSECURE_SKIP_VERIFY: &str = "OFFSETGEN_KAFKA_TLS_INSECURE_SKIP_VERIFY";
const ENV_TLS_CA_CERT: &str = "OFFSETGEN_KAFKA_TLS_CA_CERT";
const ENV_TLS_CLIENT_CERT: &str = "OFFSETGEN_KAFKA_TLS_CLIENT_CERT";
const ENV_TLS_CLIENT_KEY: &str = "OFFSETGEN_KAFKA_TLS_CLIENT_KEY";
/// `OFFSETGEN_KAFKA_PROPERTY_CLIENT_ID=x` becomes the librdkafka property `client.id=x`.
const ENV_PROPERTY_PREFIX: &str = "OFFSETGEN_KAFKA_PROPERTY_";

#[derive(Debug, Clone, PartialEq)]
pub struct KafkaFetcherConfig {
    /// The list of Kafka brokers to connect to.
    pub brokers: Vec<String>,
    pub auth: Option<KafkaSaslAuth>,
    pub tls: Option<TlsConfig>,
    /// Any supported kafka client configuration options from
    /// https://docs.confluent.io/platform/current/clients/librdkafka/html/md_CONFIGURATION.html
    pub kafka_raw_config: HashMap<String, String>,
    /// Timeout of a single metadata or watermark query.
    pub timeout: Duration,
}

impl Default for KafkaFetcherConfig {
    fn default() -> Self {
        KafkaFetcherConfig {
            brokers: vec!["localhost:9092".to_string()],
            auth: None,
            tls: None,
            kafka_raw_config: HashMap::new(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MILLIS),
        }
    }
}

impl KafkaFetcherConfig {
    pub fn load(env_vars: &HashMap<String, String>) -> Result<Self> {
        let get_var = |var: &str| -> Result<String> {
            Ok(env_vars
                .get(var)
                .ok_or_else(|| Error::Config(format!("Environment variable {var} is not set")))?
                .to_string())
        };
        let get_flag = |var: &str| -> bool {
            env_vars
                .get(var)
                .is_some_and(|v| v.eq_ignore_ascii_case("true"))
        };

        let brokers: Vec<String> = get_var(ENV_BROKERS)?
            .split(',')
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(String::from)
            .collect();
        if brokers.is_empty() {
            return Err(Error::Config(format!("{ENV_BROKERS} has no brokers")));
        }

        let timeout = match env_vars.get(ENV_TIMEOUT_MILLIS) {
            Some(millis) => Duration::from_millis(millis.parse::<u64>().map_err(|e| {
                Error::Config(format!("{ENV_TIMEOUT_MILLIS} '{millis}' is invalid: {e}"))
            })?),
            None => Duration::from_millis(DEFAULT_TIMEOUT_MILLIS),
        };

        let auth = match env_vars.get(ENV_SASL_MECHANISM) {
            Some(mechanism) => Some(KafkaSaslAuth {
                mechanism: mechanism.to_string(),
                username: get_var(ENV_SASL_USERNAME)?,
                password: get_var(ENV_SASL_PASSWORD)?,
            }),
            None => None,
        };

        let tls = if get_flag(ENV_TLS_ENABLED) {
            let client_auth = match (
                env_vars.get(ENV_TLS_CLIENT_CERT),
                env_vars.get(ENV_TLS_CLIENT_KEY),
            ) {
                (Some(cert), Some(key)) => Some(TlsClientAuthCerts {
                    client_cert: cert.to_string(),
                    client_cert_private_key: key.to_string(),
                }),
                (None, None) => None,
                _ => {
                    return Err(Error::Config(format!(
                        "{ENV_TLS_CLIENT_CERT} and {ENV_TLS_CLIENT_KEY} must be set together"
                    )));
                }
            };
            Some(TlsConfig {
                insecure_skip_verify: get_flag(ENV_TLS_INSECURE_SKIP_VERIFY),
                ca_cert: env_vars.get(ENV_TLS_CA_CERT).cloned(),
                client_auth,
            })
        } else {
            None
        };

        let kafka_raw_config = env_vars
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(ENV_PROPERTY_PREFIX)
                    .map(|property| (property.to_lowercase().replace('_', "."), value.clone()))
            })
            .collect();

        Ok(KafkaFetcherConfig {
            brokers,
            auth,
            tls,
            kafka_raw_config,
            timeout,
        })
    }
}
