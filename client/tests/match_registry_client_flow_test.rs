mod common;

use common::*;
use sha2::{Digest, Sha256};

use chess_match_client::{
    initial_state_hash, ChessMove, ClientConfig, ClientError, Color, ErrorKind,
    LocalRulesEngine, MatchRegistryClient, MatchStatus, NetworkConfig, OperationKey, Outcome,
    Position, RegistryError, Session, TransportError, TxStatus,
};

const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
const AFTER_E4_FEN: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";

fn sha(text: &str) -> [u8; 32] {
    Sha256::digest(text.as_bytes()).into()
}

#[tokio::test(start_paused = true)]
async fn pvc_match_is_created_with_the_standard_commitment() {
    let chain = FakeChain::new();
    let client = client(&chain);
    let alice = session(&chain, alice());

    chain.script(
        chain.upcoming_hash(),
        vec![TxStatus::Pending, success(vec![vec![0x01]])],
    );
    let op = client
        .create_pvc_match(&alice, Color::White, 518)
        .await
        .unwrap();
    assert_eq!(op.key, OperationKey::Create);
    assert!(client.status("devnet", OperationKey::Create).await.confirming);

    let match_id = client.await_created_match(&op).await.unwrap();
    assert_eq!(match_id, 1);
    assert!(client.status("devnet", OperationKey::Create).await.succeeded);

    let sent = chain.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].data(),
        format!("createMatch@01@@@@{}", hex::encode(sha(START_FEN)))
    );
    assert_eq!(initial_state_hash(518).unwrap(), sha(START_FEN));
}

#[tokio::test(start_paused = true)]
async fn e2e4_commits_to_the_new_board() {
    let chain = FakeChain::new();
    let client = client(&chain);
    let alice = session(&chain, alice());
    let position = Position::standard();

    chain.script(chain.upcoming_hash(), vec![success(Vec::new())]);
    let (op, next) = client
        .play_move(&alice, 1, &position, ChessMove::from_uci("e2e4").unwrap())
        .await
        .unwrap();
    assert_eq!(next.fen(), AFTER_E4_FEN);
    assert_eq!(
        chain.sent()[0].data(),
        format!("submitMove@01@{}@000c001c0000", hex::encode(sha(AFTER_E4_FEN)))
    );

    assert_eq!(client.await_outcome(&op).await, Outcome::Succeeded);
    let status = client.status("devnet", OperationKey::Match(1)).await;
    assert!(status.succeeded);
    assert_eq!(status.transaction_hash, Some(op.hash));
    assert_eq!(
        devnet().tx_url(&op.hash),
        format!(
            "https://devnet-explorer.multiversx.com/transactions/{}",
            op.hash
        )
    );
}

#[tokio::test(start_paused = true)]
async fn one_unconfirmed_move_per_match() {
    let chain = FakeChain::new();
    let client = client(&chain);
    let alice = session(&chain, alice());
    let e4 = ChessMove::from_uci("e2e4").unwrap();

    let first_hash = chain.upcoming_hash();
    let first = client
        .submit_move(&alice, 1, e4, [1u8; 32], None)
        .await
        .unwrap();
    assert_eq!(first.hash, first_hash);

    let err = client
        .submit_move(&alice, 1, e4, [1u8; 32], None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::OperationInFlight {
            key: OperationKey::Match(1)
        }
    ));
    assert_eq!(err.kind(), ErrorKind::Busy);

    // Other matches are independent.
    client
        .submit_move(&alice, 2, e4, [1u8; 32], None)
        .await
        .unwrap();

    chain.script(first_hash, vec![success(Vec::new())]);
    client.confirm(&first).await.unwrap();
    client
        .submit_move(&alice, 1, e4, [2u8; 32], None)
        .await
        .unwrap();
    assert_eq!(chain.sent().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn registry_refusals_are_not_retried() {
    let chain = FakeChain::new();
    let client = client(&chain);
    let bob = session(&chain, bob());

    chain.script(
        chain.upcoming_hash(),
        vec![failed("execution failed: ERR_NOT_YOUR_TURN")],
    );
    let op = client
        .submit_move(&bob, 1, ChessMove::from_uci("e7e5").unwrap(), [3u8; 32], None)
        .await
        .unwrap();
    let err = client.confirm(&op).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Registry(RegistryError::NotYourTurn)
    ));

    let status = client.status("devnet", OperationKey::Match(1)).await;
    assert!(!status.pending && !status.confirming && !status.succeeded);
    let error = status.error.unwrap();
    assert_eq!(error.kind, ErrorKind::Validation);
    assert!(error.reason.contains("not the caller's turn"));
    assert_eq!(chain.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn join_on_running_match_reports_not_joinable() {
    let chain = FakeChain::new();
    let client = client(&chain);
    let bob = session(&chain, bob());

    chain.script(chain.upcoming_hash(), vec![failed("ERR_MATCH_NOT_JOINABLE")]);
    let op = client.join_match(&bob, 1, None).await.unwrap();
    match client.await_outcome(&op).await {
        Outcome::Failed { kind, reason } => {
            assert_eq!(kind, ErrorKind::Validation);
            assert!(reason.contains("cannot be joined"));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn unconfirmed_transactions_time_out() {
    let chain = FakeChain::new();
    let client = client(&chain);
    let alice = session(&chain, alice());

    let op = client.start_match(&alice, 4).await.unwrap();
    let err = client.confirm(&op).await.unwrap_err();
    match err {
        ClientError::Transport(TransportError::ConfirmationTimeout { waited_secs, .. }) => {
            assert_eq!(waited_secs, 60)
        }
        other => panic!("unexpected error {other:?}"),
    }
    // The guard is released so the user may try again.
    client.start_match(&alice, 4).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn signer_failures_release_the_operation() {
    let chain = FakeChain::new();
    let client = client(&chain);
    let alice = session(&chain, alice());

    chain.refuse_signing(true);
    let err = client.cancel_match(&alice, 3).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    let status = client.status("devnet", OperationKey::Match(3)).await;
    assert_eq!(status.error.map(|e| e.kind), Some(ErrorKind::Transport));

    chain.refuse_signing(false);
    client.cancel_match(&alice, 3).await.unwrap();
    assert_eq!(chain.sent()[0].function, "cancelMatch");
}

#[tokio::test(start_paused = true)]
async fn local_rules_stop_illegal_moves_before_signing() {
    let chain = FakeChain::new();
    let client = client(&chain).with_validator(LocalRulesEngine);
    let alice = session(&chain, alice());
    let position = Position::standard();

    let err = client
        .submit_move(
            &alice,
            1,
            ChessMove::from_uci("e2e5").unwrap(),
            [0u8; 32],
            Some(&position),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Rejected);
    assert!(chain.sent().is_empty());

    // The rejection does not block the next attempt.
    client
        .play_move(&alice, 1, &position, ChessMove::from_uci("e2e4").unwrap())
        .await
        .unwrap();
    assert_eq!(chain.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn sessions_must_use_a_configured_network() {
    let chain = FakeChain::new();
    let client = client(&chain);
    let stray = Session::new(
        alice(),
        NetworkConfig::mainnet(registry().to_bech32()),
        chain.clone(),
    );

    let err = client.start_match(&stray, 1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert!(chain.sent().is_empty());

    let mut config = ClientConfig::single(devnet());
    config.networks.push(NetworkConfig::mainnet(registry().to_bech32()));
    assert!(MatchRegistryClient::new(chain.clone(), config).is_ok());
}

#[tokio::test(start_paused = true)]
async fn get_match_decodes_the_registry_view() {
    let chain = FakeChain::new();
    let client = client(&chain);
    let fen_hash = sha(AFTER_E4_FEN);
    chain.answer("getMatch", vec![encoded_match(1, 2, fen_hash, 1)]);
    chain.answer("getMatchCount", vec![vec![0x01]]);

    let view = client.get_match(&devnet(), 1).await.unwrap();
    assert!(view.status.is(MatchStatus::InProgress));
    assert_eq!(view.move_count, 1);
    assert_eq!(view.fen_hash, fen_hash);
    assert_eq!(view.side_to_move(), Color::Black);
    assert!(view.is_turn_of(&bob()));
    assert_eq!(view.white.account, Some(alice()));
    assert_eq!(client.match_count(&devnet()).await.unwrap(), 1);

    // Identical queries without writes in between give identical views.
    assert_eq!(client.get_match(&devnet(), 1).await.unwrap(), view);

    let err = client.side_to_move(&devnet(), 9).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Registry(RegistryError::MatchNotFound)
    ));
}

#[tokio::test(start_paused = true)]
async fn confirmation_polls_the_network_the_operation_was_sent_on() {
    let chain = FakeChain::new();
    let mut staging = devnet();
    staging.id = "devnet-staging".into();
    let mut config = ClientConfig::single(devnet());
    config.networks.push(staging.clone());
    let client = MatchRegistryClient::new(chain.clone(), config).unwrap();

    let on_staging = Session::new(alice(), staging, chain.clone());
    chain.script(chain.upcoming_hash(), vec![success(Vec::new())]);
    let op = client.start_match(&on_staging, 5).await.unwrap();
    assert_eq!(op.network, "devnet-staging");

    client.confirm(&op).await.unwrap();

    assert!(chain.polled().iter().all(|id| id == "devnet-staging"));
    assert!(
        client
            .status("devnet-staging", OperationKey::Match(5))
            .await
            .succeeded
    );
    assert!(!client.status("devnet", OperationKey::Match(5)).await.confirming);
}

#[tokio::test(start_paused = true)]
async fn out_of_range_start_positions_are_not_signed() {
    let chain = FakeChain::new();
    let client = client(&chain);
    let alice = session(&chain, alice());

    let err = client
        .create_pvc_match(&alice, Color::White, 960)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::InvalidStartPosition { index: 960 }
    ));
    assert!(chain.sent().is_empty());
    assert!(!client.status("devnet", OperationKey::Create).await.pending);
}
