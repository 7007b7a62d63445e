use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use offsetgen_core::{OffsetMapping, PartitionId, PartitionSnapshotFetcher};
use rdkafka::config::{ClientConfig, RDKafkaLogLevel};
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::error::RDKafkaErrorCode;
use tracing::{error, info, warn};

use crate::config::KafkaFetcherConfig;
use crate::{Error, Result};

/// Low and high watermark of one partition.
type Watermarks = (PartitionId, i64, i64);

/// KafkaFetcher answers partition and offset queries from the Kafka cluster metadata. It never
/// joins a consumer group nor commits anything, the offsets it reports are the partitions' low
/// (earliest retained) and high (next to be written) watermarks.
#[derive(Clone)]
pub struct KafkaFetcher {
    consumer: Arc<BaseConsumer>,
    timeout: Duration,
}

impl KafkaFetcher {
    pub fn connect(config: KafkaFetcherConfig) -> Result<Self> {
        let mut client_config = ClientConfig::new();
        if !config.kafka_raw_config.is_empty() {
            info!(
                "Applying user-specified kafka config: {}",
                config
                    .kafka_raw_config
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<String>>()
                    .join(", ")
            );
            for (key, value) in config.kafka_raw_config {
                client_config.set(key, value);
            }
        }
        client_config
            .set("bootstrap.servers", config.brokers.join(","))
            .set("enable.auto.commit", "false")
            .set_log_level(RDKafkaLogLevel::Warning);

        crate::update_auth_config(&mut client_config, config.tls, config.auth);

        let consumer: BaseConsumer = client_config.create().map_err(|err| Error::Connection {
            server: config.brokers.join(","),
            error: err.to_string(),
        })?;

        Ok(Self {
            consumer: Arc::new(consumer),
            timeout: config.timeout,
        })
    }

    /// Partition ids of `topic`. An unknown topic has no partitions.
    async fn partitions(&self, topic: &str) -> Result<Vec<i32>> {
        let consumer = Arc::clone(&self.consumer);
        let topic = topic.to_string();
        let timeout = self.timeout;

        // fetch_metadata is a blocking call into librdkafka
        tokio::task::spawn_blocking(move || -> Result<Vec<i32>> {
            let metadata = consumer
                .fetch_metadata(Some(&topic), timeout)
                .map_err(|e| Error::Kafka(format!("Failed to fetch metadata: {e}")))?;
            let Some(topic_metadata) = metadata.topics().first() else {
                warn!(topic, "No topic metadata found");
                return Ok(Vec::new());
            };
            if let Some(err) = topic_metadata.error() {
                return topic_error(&topic, RDKafkaErrorCode::from(err));
            }
            Ok(topic_metadata.partitions().iter().map(|p| p.id()).collect())
        })
        .await
        .map_err(|e| Error::Other(format!("Tokio task join error: {e}")))?
    }

    /// Fetches the watermarks of all `partitions` concurrently. Returns only after every lookup
    /// finished, the first failure fails the whole call.
    async fn watermarks(&self, partitions: &BTreeSet<PartitionId>) -> Result<Vec<Watermarks>> {
        let mut handles = Vec::with_capacity(partitions.len());
        for partition in partitions {
            let consumer = Arc::clone(&self.consumer);
            let partition = partition.clone();
            let timeout = self.timeout;

            handles.push(tokio::task::spawn_blocking(move || -> Result<Watermarks> {
                let (low, high) = consumer
                    .fetch_watermarks(&partition.log_name, partition.partition, timeout)
                    .map_err(|e| {
                        Error::Kafka(format!("Failed to fetch watermarks of {partition}: {e}"))
                    })?;
                Ok((partition, low, high))
            }));
        }

        let mut watermarks = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(Ok(partition_watermarks)) => watermarks.push(partition_watermarks),
                Ok(Err(e)) => {
                    error!(?e, "Error fetching watermarks");
                    return Err(e);
                }
                Err(e) => {
                    error!(?e, "Tokio task join error fetching watermarks");
                    return Err(Error::Other(format!("Tokio task join error: {e}")));
                }
            }
        }
        Ok(watermarks)
    }
}

/// Maps a topic level metadata error. A topic the broker does not know has no partitions, any
/// other code (authorization, leader election, ...) fails the lookup and names the code.
fn topic_error(topic: &str, code: RDKafkaErrorCode) -> Result<Vec<i32>> {
    match code {
        RDKafkaErrorCode::UnknownTopicOrPartition | RDKafkaErrorCode::UnknownTopic => {
            warn!(topic, ?code, "Topic does not exist");
            Ok(Vec::new())
        }
        code => Err(Error::Kafka(format!(
            "Metadata error for topic {topic}: {code:?} ({code})"
        ))),
    }
}

impl PartitionSnapshotFetcher for KafkaFetcher {
    async fn list_partitions(
        &self,
        log_name: &str,
    ) -> offsetgen_core::Result<BTreeSet<PartitionId>> {
        let partitions = self.partitions(log_name).await?;
        Ok(partitions
            .into_iter()
            .map(|p| PartitionId::new(log_name, p))
            .collect())
    }

    async fn earliest_offsets(
        &self,
        partitions: &BTreeSet<PartitionId>,
    ) -> offsetgen_core::Result<OffsetMapping> {
        let watermarks = self.watermarks(partitions).await?;
        Ok(watermarks
            .into_iter()
            .map(|(partition, low, _)| (partition, low))
            .collect())
    }

    async fn end_offsets(
        &self,
        partitions: &BTreeSet<PartitionId>,
    ) -> offsetgen_core::Result<OffsetMapping> {
        let watermarks = self.watermarks(partitions).await?;
        Ok(watermarks
            .into_iter()
            .map(|(partition, _, high)| (partition, high))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_rejects_invalid_client_config() {
        let config = KafkaFetcherConfig {
            kafka_raw_config: [("no.such.property".to_string(), "1".to_string())].into(),
            ..Default::default()
        };
        let result = KafkaFetcher::connect(config);
        assert!(matches!(result, Err(Error::Connection { .. })));
    }

    #[test]
    fn test_unknown_topic_error_means_no_partitions() {
        assert_eq!(
            topic_error("orders", RDKafkaErrorCode::UnknownTopicOrPartition).unwrap(),
            Vec::<i32>::new()
        );
        assert!(
            topic_error("orders", RDKafkaErrorCode::UnknownTopic)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_topic_authorization_failure_is_reported() {
        let err = topic_error("orders", RDKafkaErrorCode::TopicAuthorizationFailed).unwrap_err();
        let Error::Kafka(message) = &err else {
            panic!("expected a Kafka error, got {err:?}");
        };
        assert!(message.contains("orders"));
        assert!(message.contains("TopicAuthorizationFailed"));

        let core_err: offsetgen_core::Error = err.into();
        assert!(core_err.to_string().contains("TopicAuthorizationFailed"));
    }

    #[cfg(feature = "kafka-tests")]
    mod kafka {
        use super::*;
        use offsetgen_core::{PlannerConfig, ResetStrategy};
        use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
        use rdkafka::producer::{FutureProducer, FutureRecord};

        const BROKERS: &str = "localhost:9092";

        async fn setup_test_topic(partitions: i32) -> (FutureProducer, String) {
            let producer: FutureProducer = ClientConfig::new()
                .set("bootstrap.servers", BROKERS)
                .create()
                .expect("Failed to create producer");

            let topic_name = format!(
                "offsetgen_test_topic_{}",
                uuid::Uuid::new_v4().to_string().replace('-', "")
            );

            let admin_client = ClientConfig::new()
                .set("bootstrap.servers", BROKERS)
                .create::<AdminClient<_>>()
                .expect("Failed to create admin client");
            let topic_config =
                NewTopic::new(topic_name.as_str(), partitions, TopicReplication::Fixed(1));
            admin_client
                .create_topics(&[topic_config], &AdminOptions::new())
                .await
                .expect("Failed to create topic");

            (producer, topic_name)
        }

        async fn produce(producer: &FutureProducer, topic: &str, partition: i32, count: usize) {
            for i in 0..count {
                let payload = format!("message {i}");
                let record = FutureRecord::<(), _>::to(topic)
                    .payload(&payload)
                    .partition(partition);
                producer
                    .send(record, Duration::from_secs(5))
                    .await
                    .expect("Failed to send message");
            }
        }

        fn fetcher() -> KafkaFetcher {
            KafkaFetcher::connect(KafkaFetcherConfig {
                brokers: vec![BROKERS.to_string()],
                ..Default::default()
            })
            .expect("Failed to connect to Kafka")
        }

        #[tokio::test]
        async fn test_kafka_snapshot() {
            let (producer, topic) = setup_test_topic(2).await;
            produce(&producer, &topic, 0, 30).await;
            produce(&producer, &topic, 1, 5).await;

            let fetcher = fetcher();
            let partitions = fetcher.list_partitions(&topic).await.unwrap();
            assert_eq!(
                partitions,
                BTreeSet::from([PartitionId::new(&topic, 0), PartitionId::new(&topic, 1)])
            );

            let earliest = fetcher.earliest_offsets(&partitions).await.unwrap();
            assert_eq!(earliest.get(&PartitionId::new(&topic, 0)), Some(0));
            assert_eq!(earliest.get(&PartitionId::new(&topic, 1)), Some(0));

            let end = fetcher.end_offsets(&partitions).await.unwrap();
            assert_eq!(end.get(&PartitionId::new(&topic, 0)), Some(30));
            assert_eq!(end.get(&PartitionId::new(&topic, 1)), Some(5));
        }

        #[tokio::test]
        async fn test_kafka_plan_cycles() {
            let (producer, topic) = setup_test_topic(2).await;
            produce(&producer, &topic, 0, 40).await;
            produce(&producer, &topic, 1, 10).await;

            let config = PlannerConfig {
                reset_strategy: ResetStrategy::Earliest,
                ..Default::default()
            };
            let planner = offsetgen_core::OffsetPlanner::new(&topic, config, fetcher());

            let plan = planner.next_offset_ranges(None, 30).await.unwrap();
            assert_eq!(plan.total_new_messages(), 30);
            assert_eq!(plan.checkpoint, format!("{topic},0:20,1:10"));

            let plan = planner
                .next_offset_ranges(Some(&plan.checkpoint), 30)
                .await
                .unwrap();
            assert_eq!(plan.total_new_messages(), 20);
            assert_eq!(plan.checkpoint, format!("{topic},0:40,1:10"));
        }

        #[tokio::test]
        async fn test_unknown_topic_has_no_partitions() {
            let fetcher = fetcher();
            let partitions = fetcher
                .list_partitions("offsetgen_topic_that_does_not_exist")
                .await
                .unwrap();
            assert!(partitions.is_empty());
        }
    }
}
