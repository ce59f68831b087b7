//! A peer that starts late compares heads with everyone it can reach.

#[cfg(test)]
mod tests {
    use crate::harness::{sample_match, Swarm};
    use ml_02_ledger_store::Durability;
    use ml_03_peer_propagation::HeadComparison;

    #[tokio::test]
    async fn test_late_peer_logs_divergence_and_survives_offline_peer() {
        let mut swarm = Swarm::start(2, Swarm::test_config()).await;
        let (busy, offline) = (swarm.peer(0).id, swarm.peer(1).id);
        for i in 0..5 {
            swarm
                .peer(0)
                .node
                .record_match(sample_match(&format!("m-{i}"), busy), Durability::Persisted)
                .await
                .unwrap();
        }
        swarm.network.set_online(&offline, false);

        // Start-up sync runs inside `join`; the unreachable peer must not abort it.
        let index = swarm.join(Swarm::test_config()).await.unwrap();
        let late = swarm.peer(index);

        let seen = late.node.divergences();
        assert!(seen.iter().any(|d| d.peer == busy
            && d.local_count == 0
            && d.peer_count == 5
            && matches!(d.comparison, HeadComparison::PeerAhead { .. })));
        assert!(seen.iter().all(|d| d.peer != offline));

        let stats = late.node.current_stats().unwrap();
        assert_eq!(stats.match_count, 0);
        assert_ne!(stats.head_hash, swarm.peer(0).node.current_stats().unwrap().head_hash);

        let results = late
            .node
            .container()
            .propagation
            .sync_with_known_peers()
            .await;
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .any(|(peer, result)| *peer == offline && result.is_err()));
        assert!(results.iter().any(|(peer, result)| *peer == busy
            && matches!(
                result,
                Ok(HeadComparison::PeerAhead { local_count: 0, peer_count: 5 })
            )));

        // Still a working peer.
        late.node
            .record_match(sample_match("m-late", late.id), Durability::Persisted)
            .await
            .unwrap();
        assert_eq!(late.node.current_stats().unwrap().match_count, 1);

        swarm.shutdown().await;
    }
}
