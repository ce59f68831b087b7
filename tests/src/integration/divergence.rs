//! Heads that disagree are logged, never merged.

#[cfg(test)]
mod tests {
    use crate::harness::{epoch, sample_match, Swarm, FIRST_EPOCH, SECOND_EPOCH};
    use ml_02_ledger_store::Durability;
    use ml_03_peer_propagation::{HeadComparison, PropagationApi};
    use shared_bus::{EventFilter, EventTopic, LedgerEvent};

    #[tokio::test]
    async fn test_peer_ahead_is_logged_without_touching_local_head() {
        let swarm = Swarm::start(2, Swarm::test_config()).await;
        let (behind, ahead) = (swarm.peer(0), swarm.peer(1));
        let mut events = behind
            .node
            .subscribe(EventFilter::topics(vec![EventTopic::Propagation]));

        for i in 0..14 {
            let record = sample_match(&format!("m-{i:02}"), ahead.id);
            if i < 10 {
                behind
                    .node
                    .record_match(record.clone(), Durability::Persisted)
                    .await
                    .unwrap();
            }
            ahead
                .node
                .record_match(record, Durability::Persisted)
                .await
                .unwrap();
        }

        let comparison = behind
            .node
            .container()
            .propagation
            .request_sync(ahead.id)
            .await
            .unwrap();
        assert_eq!(
            comparison,
            HeadComparison::PeerAhead {
                local_count: 10,
                peer_count: 14
            }
        );

        assert!(behind
            .node
            .divergences()
            .iter()
            .any(|d| d.peer == ahead.id && d.local_count == 10 && d.peer_count > 10));
        assert!(events.drain().iter().any(|event| matches!(
            event,
            LedgerEvent::DivergenceObserved { local_count: 10, peer_count: 14, .. }
        )));

        let stats = behind.node.current_stats().unwrap();
        assert_eq!(stats.match_count, 10);
        assert!(!behind.node.container().store().contains("m-13"));

        let reverse = ahead
            .node
            .container()
            .propagation
            .request_sync(behind.id)
            .await
            .unwrap();
        assert_eq!(
            reverse,
            HeadComparison::PeerBehind {
                local_count: 14,
                peer_count: 10
            }
        );

        swarm.shutdown().await;
    }

    #[tokio::test]
    async fn test_divergent_peers_converge_after_finalization() {
        let swarm = Swarm::start(2, Swarm::test_config()).await;
        let (behind, ahead) = (swarm.peer(0), swarm.peer(1));

        let records: Vec<_> = (0..14)
            .map(|i| sample_match(&format!("m-{i:02}"), ahead.id))
            .collect();
        for record in &records {
            ahead
                .node
                .record_match(record.clone(), Durability::Persisted)
                .await
                .unwrap();
        }
        for record in &records[..10] {
            behind
                .node
                .record_match(record.clone(), Durability::Persisted)
                .await
                .unwrap();
        }
        assert!(matches!(
            behind.node.container().propagation.request_sync(ahead.id).await,
            Ok(HeadComparison::PeerAhead { local_count: 10, peer_count: 14 })
        ));

        // The late deliveries reach the lagging peer before midnight.
        for record in &records[10..] {
            behind
                .node
                .record_match(record.clone(), Durability::Persisted)
                .await
                .unwrap();
        }
        assert_eq!(
            behind.node.current_stats().unwrap().head_hash,
            ahead.node.current_stats().unwrap().head_hash
        );

        swarm.advance_past_midnight();
        let reports = swarm.tick(&[1, 0]).await;
        let ahead_result = reports[0].finalized.clone().unwrap();
        let behind_result = reports[1].finalized.clone().unwrap();

        assert_eq!(ahead_result.epoch_id, epoch(FIRST_EPOCH));
        assert_eq!(behind_result.head_hash, ahead_result.head_hash);
        assert_eq!(behind_result.body_checksum, ahead_result.body_checksum);
        assert_eq!(behind_result.match_count, 14);

        let archived_behind = behind.node.morgue_history(1).await.unwrap();
        let archived_ahead = ahead.node.morgue_history(1).await.unwrap();
        assert_eq!(archived_behind[0].head_hash, archived_ahead[0].head_hash);
        assert_eq!(archived_behind[0].body_checksum, archived_ahead[0].body_checksum);

        let (next_behind, next_ahead) = (
            behind.node.current_stats().unwrap(),
            ahead.node.current_stats().unwrap(),
        );
        assert_eq!(next_behind.epoch_id, epoch(SECOND_EPOCH));
        assert_eq!(next_behind.head_hash, next_ahead.head_hash);
        assert_eq!(next_behind.previous_head_hash, Some(ahead_result.head_hash));

        swarm.shutdown().await;
    }

    #[tokio::test]
    async fn test_sync_with_offline_peer_fails() {
        let swarm = Swarm::start(2, Swarm::test_config()).await;
        swarm.network.set_online(&swarm.peer(1).id, false);

        let result = swarm
            .peer(0)
            .node
            .container()
            .propagation
            .request_sync(swarm.peer(1).id)
            .await;
        assert!(result.is_err());
        assert!(swarm.peer(0).node.divergences().is_empty());

        swarm.shutdown().await;
    }
}
