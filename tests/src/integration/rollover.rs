//! Rollover under load, archive integrity, and recovery of failed writes.

#[cfg(test)]
mod tests {
    use crate::harness::{epoch, sample_match, Swarm, FIRST_EPOCH, SECOND_EPOCH};
    use ml_02_ledger_store::{body_checksum, compute_head_hash, Durability, FlushReport, IngestStatus};
    use ml_04_beheading::{BeheadingApi, MorgueCodec, MorgueReader};
    use shared_types::Hash;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_no_match_lost_across_forced_rollover() {
        let swarm = Swarm::start(1, Swarm::test_config()).await;
        let peer = swarm.peer(0);
        let host = peer.id;

        let mut ingest = Vec::new();
        let mut finalizer = None;
        for i in 0..200 {
            let node = Arc::clone(&peer.node);
            ingest.push(tokio::spawn(async move {
                node.record_match(sample_match(&format!("m-{i:03}"), host), Durability::Local)
                    .await
            }));
            if i == 100 {
                let node = Arc::clone(&peer.node);
                finalizer = Some(tokio::spawn(async move {
                    node.container().beheading.finalize(epoch(SECOND_EPOCH)).await
                }));
            }
        }

        let mut deferred = Vec::new();
        for handle in ingest {
            let receipt = handle.await.unwrap().unwrap();
            if receipt.status == IngestStatus::Deferred {
                deferred.push(receipt.match_id);
            }
        }
        let result = finalizer.unwrap().await.unwrap().unwrap();
        assert_eq!(result.epoch_id, epoch(FIRST_EPOCH));

        let archived = peer
            .node
            .archived_matches(&epoch(FIRST_EPOCH))
            .await
            .unwrap()
            .unwrap();
        let live = peer.node.container().store().body().matches;
        assert_eq!(archived.len() as u64, result.match_count);
        assert_eq!(archived.len() + live.len(), 200);

        let ids: HashSet<&str> = archived
            .iter()
            .chain(live.iter())
            .map(|m| m.match_id.as_str())
            .collect();
        assert_eq!(ids.len(), 200);

        let live_ids: HashSet<&str> = live.iter().map(|m| m.match_id.as_str()).collect();
        for id in &deferred {
            assert!(live_ids.contains(id.as_str()));
        }

        let stats = peer.node.current_stats().unwrap();
        assert_eq!(stats.epoch_id, epoch(SECOND_EPOCH));
        assert_eq!(stats.match_count as usize, live.len());
        assert!(!stats.finalization_in_progress);

        swarm.shutdown().await;
    }

    #[tokio::test]
    async fn test_archive_recomputes_to_finalized_hashes() {
        let config = Swarm::test_config();
        let codec = MorgueCodec::new(config.morgue.compression_level);
        let swarm = Swarm::start(1, config).await;
        let peer = swarm.peer(0);

        for i in 0..5 {
            peer.node
                .record_match(sample_match(&format!("m-{i}"), peer.id), Durability::Persisted)
                .await
                .unwrap();
        }
        swarm.advance_past_midnight();
        let result = peer.node.tick().await.finalized.unwrap();

        let stored = MorgueReader::archive_by_epoch(peer.sink.as_ref(), &result.epoch_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.morgue_id, result.morgue_id);
        assert!(stored.authentication.is_none());

        let record = stored.record;
        let matches = codec.decode(&record.compressed_body).unwrap();
        assert_eq!(matches.len(), 5);
        assert_eq!(body_checksum(&matches).unwrap(), result.body_checksum);
        assert_eq!(record.body_checksum, result.body_checksum);

        let hashes: Vec<Hash> = matches.iter().map(|m| m.match_hash).collect();
        let head_hash = compute_head_hash(
            &record.epoch_id,
            record.previous_head_hash.as_ref(),
            record.match_count,
            &hashes,
            record.total_players,
            record.total_time_played,
        );
        assert_eq!(head_hash, result.head_hash);
        assert_eq!(record.head_hash, result.head_hash);
        assert_eq!(record.total_players, 10);
        assert_eq!(record.total_time_played, 5 * 90_000);

        swarm.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_writes_flushed_on_tick() {
        let swarm = Swarm::start(1, Swarm::test_config()).await;
        let peer = swarm.peer(0);
        peer.sink.set_fail_writes(true);

        for i in 0..3 {
            let receipt = peer
                .node
                .record_match(sample_match(&format!("m-{i}"), peer.id), Durability::Persisted)
                .await
                .unwrap();
            assert_eq!(receipt.status, IngestStatus::IngestedLocally);
        }
        assert_eq!(peer.sink.inner().live_match_count().unwrap(), 0);
        assert_eq!(peer.node.current_stats().unwrap().match_count, 3);

        let report = peer.node.tick().await;
        assert_eq!(
            report.flushed,
            FlushReport {
                persisted: 0,
                remaining: 3
            }
        );

        peer.sink.set_fail_writes(false);
        let report = peer.node.tick().await;
        assert_eq!(
            report.flushed,
            FlushReport {
                persisted: 3,
                remaining: 0
            }
        );
        assert_eq!(peer.sink.inner().live_match_count().unwrap(), 3);
        assert!(peer.sink.inner().live_match("m-2").unwrap().is_some());

        swarm.shutdown().await;
    }
}
