//! Per-campaign sequencing, deduplication, and the recent-event ring used
//! for late-join and gap recovery.

use crate::message::{Envelope, OutboundMessage};
use leadforge_types::ids::{CampaignId, EventId};
use sha2::{Digest, Sha256};
use std::collections::{HashSet, VecDeque};

/// Stable digest over `(campaign_id, type, content)` used to suppress
/// duplicate deliveries.
#[must_use]
pub fn dedup_hash(campaign_key: &str, message: &OutboundMessage) -> [u8; 32] {
    let content = serde_json::to_string(message).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(campaign_key.as_bytes());
    hasher.update(b":");
    hasher.update(message.type_tag().as_bytes());
    hasher.update(b":");
    hasher.update(content.as_bytes());
    hasher.finalize().into()
}

/// A recorded event: the envelope as delivered, plus its dedup hash so the
/// ring can evict the hash alongside the event.
#[derive(Debug, Clone)]
struct RecordedEvent {
    seq: u64,
    hash: [u8; 32],
    envelope: Envelope,
}

/// Per-campaign sequence counter, recent-event ring, and dedup set.
///
/// Sequence numbers increase monotonically within a campaign; there is no ordering guarantee across campaigns, so each
/// campaign gets its own independent [`CampaignChannel`].
pub struct CampaignChannel {
    next_seq: u64,
    capacity: usize,
    ring: VecDeque<RecordedEvent>,
    seen: HashSet<[u8; 32]>,
}

impl CampaignChannel {
    /// Create a channel with the given ring capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { next_seq: 1, capacity, ring: VecDeque::with_capacity(capacity), seen: HashSet::new() }
    }

    /// Allocate the next sequence number and record `message` as an event
    /// scoped to `campaign_id`, unless its dedup hash has already been
    /// seen — in which case `None` is returned and the caller must drop the
    /// candidate without delivering it.
    pub fn record(&mut self, campaign_id: CampaignId, message: OutboundMessage) -> Option<Envelope> {
        let campaign_key = campaign_id.to_string();
        let hash = dedup_hash(&campaign_key, &message);
        if self.seen.contains(&hash) {
            return None;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        let envelope = Envelope {
            id: EventId::new(),
            timestamp: chrono::Utc::now(),
            seq,
            campaign_id: Some(campaign_id),
            message,
        };
        self.seen.insert(hash);
        self.ring.push_back(RecordedEvent { seq, hash, envelope: envelope.clone() });
        while self.ring.len() > self.capacity {
            if let Some(evicted) = self.ring.pop_front() {
                self.seen.remove(&evicted.hash);
            }
        }
        Some(envelope)
    }

    /// Every ring-retained event with `seq > last_seq`, oldest first. Events
    /// older than the ring's retention are unrecoverable (the caller should
    /// fall back to a full state resync in that case).
    #[must_use]
    pub fn events_since(&self, last_seq: u64) -> Vec<Envelope> {
        self.ring.iter().filter(|e| e.seq > last_seq).map(|e| e.envelope.clone()).collect()
    }

    /// The most recently assigned sequence number, or `0` if none yet.
    #[must_use]
    pub fn current_seq(&self) -> u64 {
        self.next_seq.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(text: &str) -> OutboundMessage {
        OutboundMessage::SystemNotification {
            level: crate::message::NotificationLevel::Info,
            message: text.to_string(),
            category: "test".to_string(),
            actionable: false,
        }
    }

    #[test]
    fn sequence_numbers_increase_monotonically() {
        let mut channel = CampaignChannel::new(10);
        let id = CampaignId::new();
        let e1 = channel.record(id, notice("a")).unwrap();
        let e2 = channel.record(id, notice("b")).unwrap();
        assert_eq!(e1.seq, 1);
        assert_eq!(e2.seq, 2);
    }

    #[test]
    fn duplicate_candidate_is_dropped() {
        let mut channel = CampaignChannel::new(10);
        let id = CampaignId::new();
        let first = channel.record(id, notice("a"));
        let second = channel.record(id, notice("a"));
        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[test]
    fn ring_evicts_oldest_beyond_capacity_and_forgets_its_hash() {
        let mut channel = CampaignChannel::new(2);
        let id = CampaignId::new();
        channel.record(id, notice("a"));
        channel.record(id, notice("b"));
        channel.record(id, notice("c"));
        // "a" evicted; its dedup hash must no longer be tracked, so
        // resubmitting it is accepted as a new event.
        let resubmit = channel.record(id, notice("a"));
        assert!(resubmit.is_some());
    }

    #[test]
    fn events_since_returns_only_newer_entries() {
        let mut channel = CampaignChannel::new(10);
        let id = CampaignId::new();
        channel.record(id, notice("a"));
        channel.record(id, notice("b"));
        channel.record(id, notice("c"));
        let recovered = channel.events_since(1);
        assert_eq!(recovered.len(), 2);
        assert_eq!(recovered[0].seq, 2);
        assert_eq!(recovered[1].seq, 3);
    }
}
