//! Fresh peers agree on genesis and on an empty rollover.

#[cfg(test)]
mod tests {
    use crate::harness::{epoch, Swarm, FIRST_EPOCH, SECOND_EPOCH};
    use ml_02_ledger_store::{body_checksum, genesis_hash};
    use ml_05_peer_council::QuorumStatus;

    #[tokio::test]
    async fn test_fresh_peers_share_genesis_head() {
        let swarm = Swarm::start(3, Swarm::test_config()).await;
        let first = epoch(FIRST_EPOCH);

        for peer in &swarm.peers {
            let stats = peer.node.current_stats().unwrap();
            assert_eq!(stats.epoch_id, first);
            assert_eq!(stats.match_count, 0);
            assert_eq!(stats.head_hash, genesis_hash(&first));
            assert_eq!(stats.previous_head_hash, None);
            assert!(peer.node.divergences().is_empty());
        }

        swarm.shutdown().await;
    }

    #[tokio::test]
    async fn test_empty_epoch_rollover_reaches_hard_final() {
        let swarm = Swarm::start(3, Swarm::test_config()).await;
        swarm.advance_past_midnight();

        let reports = swarm.tick(&[0, 1, 2]).await;
        let results: Vec<_> = reports
            .into_iter()
            .map(|report| report.finalized.unwrap())
            .collect();

        let empty_checksum = body_checksum(&[]).unwrap();
        for result in &results {
            assert_eq!(result.epoch_id, epoch(FIRST_EPOCH));
            assert_eq!(result.match_count, 0);
            assert_eq!(result.head_hash, results[0].head_hash);
            assert_eq!(result.body_checksum, empty_checksum);
        }

        for peer in &swarm.peers {
            let quorum = peer.node.quorum_status(&epoch(FIRST_EPOCH)).unwrap();
            assert_eq!(quorum.status, QuorumStatus::HardFinal);
            assert_eq!(quorum.council.len(), 3);
            assert_eq!(quorum.signers.len(), 3);

            let stats = peer.node.current_stats().unwrap();
            assert_eq!(stats.epoch_id, epoch(SECOND_EPOCH));
            assert_eq!(stats.previous_head_hash, Some(results[0].head_hash));
        }

        swarm.shutdown().await;
    }
}
