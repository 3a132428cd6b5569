//! Bag access: topic enumeration, per-topic message counts, and per-topic
//! record replay on top of the `rosbag` crate.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use rosbag::{ChunkRecord, MessageRecord, RosBag};

use crate::error::ConvertError;

/// One raw message as stored in the bag: the topic it was published on, the
/// bag-recorded arrival time in nanoseconds, and the serialized payload.
/// Borrows from the memory-mapped bag, so records only live for the duration
/// of one `stream` callback.
#[derive(Debug, Clone, Copy)]
pub struct RawRecord<'a> {
    pub topic: &'a str,
    pub time: u64,
    pub data: &'a [u8],
}

/// Per-topic metadata gathered while indexing the bag.
#[derive(Debug, Default, Clone)]
pub struct TopicInfo {
    pub message_type: String,
    pub count: u64,
    pub first_ns: u64,
    pub last_ns: u64,
}

/// What the conversion pipeline needs from a record store: topic probing,
/// the per-topic count (progress totals), and an in-order replay of one
/// topic's records. [`BagReader`] is the on-disk implementation; tests feed
/// the pipeline from memory.
pub trait RecordSource {
    fn has_topic(&self, topic: &str) -> bool;

    /// Total number of records stored for `topic`. Metadata query only; it
    /// does not affect any replay position.
    fn message_count(&self, topic: &str) -> u64;

    /// Replay every record of `topic` in stored log order, invoking `f` per
    /// record. The closure may fail; its error aborts the replay and is
    /// returned unchanged.
    fn stream(
        &self,
        topic: &str,
        f: &mut dyn FnMut(RawRecord<'_>) -> Result<()>,
    ) -> Result<()>;
}

/// An opened bag with its connection table and per-topic counts resolved.
///
/// Opening walks every chunk once to collect connection records (they may
/// appear anywhere in the file) and count messages per topic; `stream` then
/// replays the chunks again for one topic at a time, so each topic's replay
/// is independently restartable.
pub struct BagReader {
    bag: RosBag,
    connections: BTreeMap<u32, String>,
    topics: BTreeMap<String, TopicInfo>,
}

impl BagReader {
    pub fn open(path: &str) -> Result<Self> {
        let bag = RosBag::new(path).with_context(|| format!("failed to open bag: {path}"))?;

        let mut connections: BTreeMap<u32, String> = BTreeMap::new();
        let mut topics: BTreeMap<String, TopicInfo> = BTreeMap::new();

        // Connections can be stored after the messages that reference them,
        // so resolve the full table before counting.
        for record in bag.chunk_records() {
            let record = record?;
            if let ChunkRecord::Chunk(chunk) = record {
                for msg in chunk.messages() {
                    let msg = msg?;
                    if let MessageRecord::Connection(conn) = msg {
                        connections.insert(conn.id, conn.topic.to_string());
                        topics
                            .entry(conn.topic.to_string())
                            .or_default()
                            .message_type = conn.tp.to_string();
                    }
                }
            }
        }

        for record in bag.chunk_records() {
            let record = record?;
            if let ChunkRecord::Chunk(chunk) = record {
                for msg in chunk.messages() {
                    let msg = msg?;
                    if let MessageRecord::MessageData(msg_data) = msg
                        && let Some(topic) = connections.get(&msg_data.conn_id)
                        && let Some(info) = topics.get_mut(topic)
                    {
                        if info.count == 0 {
                            info.first_ns = msg_data.time;
                            info.last_ns = msg_data.time;
                        } else {
                            info.first_ns = info.first_ns.min(msg_data.time);
                            info.last_ns = info.last_ns.max(msg_data.time);
                        }
                        info.count += 1;
                    }
                }
            }
        }

        Ok(BagReader {
            bag,
            connections,
            topics,
        })
    }

    pub fn topics(&self) -> impl Iterator<Item = (&str, &TopicInfo)> {
        self.topics.iter().map(|(name, info)| (name.as_str(), info))
    }
}

impl RecordSource for BagReader {
    fn has_topic(&self, topic: &str) -> bool {
        self.topics.contains_key(topic)
    }

    fn message_count(&self, topic: &str) -> u64 {
        self.topics.get(topic).map(|info| info.count).unwrap_or(0)
    }

    fn stream(
        &self,
        topic: &str,
        f: &mut dyn FnMut(RawRecord<'_>) -> Result<()>,
    ) -> Result<()> {
        if !self.has_topic(topic) {
            return Err(ConvertError::UnknownTopic(topic.to_string()).into());
        }

        for record in self.bag.chunk_records() {
            let record = record?;
            if let ChunkRecord::Chunk(chunk) = record {
                for msg in chunk.messages() {
                    let msg = msg?;
                    if let MessageRecord::MessageData(msg_data) = msg
                        && self.connections.get(&msg_data.conn_id).map(String::as_str)
                            == Some(topic)
                    {
                        f(RawRecord {
                            topic,
                            time: msg_data.time,
                            data: msg_data.data,
                        })?;
                    }
                }
            }
        }

        Ok(())
    }
}

/// Print per-topic counts and time spans of a bag.
pub fn inspect_bag(path: &str) -> Result<()> {
    let reader = BagReader::open(path)?;

    let mut bag_start_ns = u64::MAX;
    let mut bag_end_ns = 0u64;
    let mut total: u64 = 0;
    for (_, info) in reader.topics() {
        if info.count > 0 {
            bag_start_ns = bag_start_ns.min(info.first_ns);
            bag_end_ns = bag_end_ns.max(info.last_ns);
        }
        total += info.count;
    }

    let to_rel_s = |ns: u64| -> f64 {
        if bag_start_ns == u64::MAX {
            0.0
        } else {
            (ns.saturating_sub(bag_start_ns)) as f64 / 1_000_000_000.0
        }
    };
    let duration = if total > 0 { to_rel_s(bag_end_ns) } else { 0.0 };

    println!("Bag: {}", path);
    println!("Duration (s): {:.6}, Total messages: {}\n", duration, total);

    println!(
        "{:<35} {:<35} {:>7} {:>10} {:>10}",
        "Topic", "Type", "Count", "Start(s)", "End(s)"
    );
    println!("{}", "-".repeat(97));
    for (topic, info) in reader.topics() {
        println!(
            "{:<35} {:<35} {:>7} {:>10.6} {:>10.6}",
            topic,
            info.message_type,
            info.count,
            to_rel_s(info.first_ns),
            to_rel_s(info.last_ns)
        );
    }

    Ok(())
}
