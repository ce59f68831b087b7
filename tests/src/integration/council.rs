//! Three-of-five authentication with one offline member and one member
//! whose archive was tampered with.

#[cfg(test)]
mod tests {
    use crate::harness::{epoch, sample_match, Swarm, FIRST_EPOCH};
    use ml_02_ledger_store::Durability;
    use ml_05_peer_council::QuorumStatus;
    use shared_bus::{EventFilter, EventTopic, LedgerEvent};

    const OFFLINE: usize = 3;
    const TAMPERED: usize = 4;

    #[tokio::test]
    async fn test_three_of_five_with_dispute() {
        let swarm = Swarm::start(5, Swarm::test_config()).await;
        let first = epoch(FIRST_EPOCH);
        let tampered_id = swarm.peer(TAMPERED).id;

        for index in [0, 1, 2, TAMPERED] {
            let peer = swarm.peer(index);
            for i in 0..3 {
                peer.node
                    .record_match(sample_match(&format!("m-{i}"), swarm.peer(0).id), Durability::Persisted)
                    .await
                    .unwrap();
            }
        }

        let mut events: Vec<_> = swarm
            .peers
            .iter()
            .map(|peer| {
                peer.node
                    .subscribe(EventFilter::topics(vec![EventTopic::Council]).for_epoch(first))
            })
            .collect();

        swarm.network.set_online(&swarm.peer(OFFLINE).id, false);
        swarm.peer(TAMPERED).sink.set_tamper_archives(true);
        swarm.advance_past_midnight();

        // The tampered member goes first so its dispute is buffered by the
        // others before they finalize.
        let reports = swarm.tick(&[TAMPERED, 0, 1, 2]).await;
        let checksum = reports[0].finalized.as_ref().unwrap().body_checksum;
        for report in &reports {
            assert_eq!(report.finalized.as_ref().unwrap().body_checksum, checksum);
        }

        for index in [0, 1, 2] {
            let peer = swarm.peer(index);
            let quorum = peer.node.quorum_status(&first).unwrap();
            assert_eq!(quorum.status, QuorumStatus::HardFinal);
            assert_eq!(quorum.council.len(), 5);
            assert_eq!(quorum.threshold, 3);
            assert!(quorum.signers.len() >= 3);
            assert!(!quorum.signers.contains(&tampered_id));
            assert!(!quorum.signers.contains(&swarm.peer(OFFLINE).id));
            assert_eq!(quorum.disputes.len(), 1);
            assert_eq!(quorum.disputes[0].member, tampered_id);
            assert_eq!(quorum.disputes[0].claimed_checksum, checksum);
            assert_ne!(quorum.disputes[0].observed_checksum, checksum);

            let seen = events[index].drain();
            assert!(seen.iter().any(|event| matches!(
                event,
                LedgerEvent::QuorumDisputed { disputed_by, .. } if *disputed_by == tampered_id
            )));
            assert!(seen.iter().any(|event| matches!(
                event,
                LedgerEvent::QuorumAuthenticated { authenticated_by, .. } if authenticated_by.len() >= 3
            )));

            let history = peer.node.morgue_history(10).await.unwrap();
            assert_eq!(history.len(), 1);
            assert!(history[0].hard_final);
        }

        let tampered = swarm.peer(TAMPERED);
        let quorum = tampered.node.quorum_status(&first).unwrap();
        assert_eq!(quorum.status, QuorumStatus::Disputed);
        assert_eq!(quorum.disputes.len(), 1);
        assert_eq!(quorum.disputes[0].member, tampered_id);
        assert!(events[TAMPERED].drain().iter().all(|event| !matches!(
            event,
            LedgerEvent::QuorumAuthenticated { .. }
        )));
        assert!(!tampered.node.morgue_history(10).await.unwrap()[0].hard_final);

        assert!(swarm.peer(OFFLINE).node.quorum_status(&first).is_none());

        swarm.shutdown().await;
    }

    #[tokio::test]
    async fn test_two_peers_stay_provisional() {
        let swarm = Swarm::start(2, Swarm::test_config()).await;
        swarm.advance_past_midnight();
        swarm.tick(&[0, 1]).await;

        for peer in &swarm.peers {
            let quorum = peer.node.quorum_status(&epoch(FIRST_EPOCH)).unwrap();
            assert_eq!(quorum.status, QuorumStatus::Vouching);
            assert_eq!(quorum.signers.len(), 2);
            assert!(!peer.node.morgue_history(1).await.unwrap()[0].hard_final);
        }

        swarm.shutdown().await;
    }
}
