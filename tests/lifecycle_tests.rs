//! Finalization scenarios: liveness outcomes, log attachment, integrity
//! faults, and idempotence of the Ongoing scan.


use std::sync::Arc;

use boardtasks::board::BoardClient;
use boardtasks::process::ProcessState;
use boardtasks::scheduler::BoardPoller;

use test_harness::{init_tracing, test_board_config, test_card, FakeProbe, FakeSpawner, MemoryBoard};

struct Fixture {
    board: Arc<MemoryBoard>,
    #[allow(dead_code)]
    spawner: Arc<FakeSpawner>,
    probe: Arc<FakeProbe>,
    poller: BoardPoller,
}

fn fixture(resources: &[(&str, u32)]) -> Fixture {
    init_tracing();
    let board = Arc::new(MemoryBoard::with_standard_lists());
    let spawner = Arc::new(FakeSpawner::new());
    let probe = Arc::new(FakeProbe::new());
    let poller = BoardPoller::new(test_board_config(resources), board.clone())
        .with_spawner(spawner.clone())
        .with_probe(probe.clone());
    Fixture {
        board,
        spawner,
        probe,
        poller,
    }
}

#[tokio::test]
async fn active_process_leaves_card_ongoing() {
    let f = fixture(&[]);
    f.board.add_card("Queue", test_card("a", "long job", &[]));

    let mut controller = f.poller.setup().await.unwrap();
    f.poller.run_cycle(&mut controller).await;
    assert_eq!(f.board.cards_in("Ongoing"), vec!["a".to_string()]);

    // FakeProbe reports Active for unknown pids; several polls later the
    // card is still Ongoing with only its three launch comments.
    f.poller.run_cycle(&mut controller).await;
    f.poller.run_cycle(&mut controller).await;
    assert_eq!(f.board.cards_in("Ongoing"), vec!["a".to_string()]);
    assert_eq!(f.board.comments_for("a").len(), 3);
}

#[tokio::test]
async fn terminated_process_finalizes_without_warning() {
    let f = fixture(&[]);
    f.board.add_card("Queue", test_card("a", "job", &[]));

    let mut controller = f.poller.setup().await.unwrap();
    f.poller.run_cycle(&mut controller).await;

    let pid = f.board.pid_for("a").unwrap();
    f.probe.set_state(pid, ProcessState::Terminated);
    f.poller.run_cycle(&mut controller).await;

    assert_eq!(f.board.cards_in("Done"), vec!["a".to_string()]);
    let comments = f.board.comments_for("a");
    assert!(comments.iter().any(|c| c.contains("Finished:")));
    assert!(!comments.iter().any(|c| c.contains("Could not find")));
}

#[tokio::test]
async fn vanished_process_finalizes_with_warning_and_log_attachment() {
    let f = fixture(&[]);
    f.board.add_card("Queue", test_card("a", "job", &[]));

    let log_dir = tempfile::tempdir().unwrap();
    let poller = f.poller.with_log_dir(log_dir.path());

    let mut controller = poller.setup().await.unwrap();
    poller.run_cycle(&mut controller).await;

    // The job wrote its log before disappearing.
    let uid = f.board.uid_for("a").unwrap();
    std::fs::write(log_dir.path().join(format!("{uid}.log")), b"training done\n").unwrap();

    let pid = f.board.pid_for("a").unwrap();
    f.probe.set_state(pid, ProcessState::NotFound);
    poller.run_cycle(&mut controller).await;

    assert_eq!(f.board.cards_in("Done"), vec!["a".to_string()]);
    let comments = f.board.comments_for("a");
    assert!(comments.iter().any(|c| c.contains("Could not find the process")));
    assert!(comments.iter().any(|c| c.contains("Finished:")));

    let attachments = f.board.attachments_for("a");
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].0, format!("{uid}.log"));
    assert_eq!(attachments[0].1, b"training done\n");
}

#[tokio::test]
async fn missing_log_file_is_not_an_error() {
    let f = fixture(&[]);
    f.board.add_card("Queue", test_card("a", "job", &[]));

    let log_dir = tempfile::tempdir().unwrap();
    let poller = f.poller.with_log_dir(log_dir.path());

    let mut controller = poller.setup().await.unwrap();
    poller.run_cycle(&mut controller).await;

    let pid = f.board.pid_for("a").unwrap();
    f.probe.set_state(pid, ProcessState::Terminated);
    poller.run_cycle(&mut controller).await;

    // Finalized normally, just without an attachment.
    assert_eq!(f.board.cards_in("Done"), vec!["a".to_string()]);
    assert!(f.board.attachments_for("a").is_empty());
}

#[tokio::test]
async fn card_without_uid_comment_is_left_ongoing() {
    let f = fixture(&[]);

    // A malformed card that was moved to Ongoing by hand: it has a pid
    // comment but no uid comment.
    let broken = test_card("broken", "malformed", &[]);
    f.board.add_card("Ongoing", broken.clone());
    f.board.append_comment(&broken, "💻 PID: 4242").await.unwrap();

    // A healthy sibling behind it in the same list.
    f.board.add_card("Queue", test_card("ok", "job", &[]));

    let mut controller = f.poller.setup().await.unwrap();
    f.poller.run_cycle(&mut controller).await;

    let pid = f.board.pid_for("ok").unwrap();
    f.probe.set_state(pid, ProcessState::Terminated);
    f.probe.set_state(4242, ProcessState::Terminated);
    f.poller.run_cycle(&mut controller).await;

    // The broken card is stuck in Ongoing, untouched beyond its original
    // comment, while the sibling was still processed to Done.
    assert_eq!(f.board.cards_in("Ongoing"), vec!["broken".to_string()]);
    assert_eq!(f.board.comments_for("broken").len(), 1);
    assert_eq!(f.board.cards_in("Done"), vec!["ok".to_string()]);
}

#[tokio::test]
async fn repeated_checks_do_not_duplicate_finalization() {
    let f = fixture(&[("gpu", 1)]);
    f.board.add_card("Queue", test_card("a", "job", &["gpu"]));

    let mut controller = f.poller.setup().await.unwrap();
    f.poller.run_cycle(&mut controller).await;

    let pid = f.board.pid_for("a").unwrap();
    f.probe.set_state(pid, ProcessState::Terminated);
    f.poller.run_cycle(&mut controller).await;
    f.poller.run_cycle(&mut controller).await;

    // Exactly one finished comment despite the extra poll.
    let finished = f
        .board
        .comments_for("a")
        .iter()
        .filter(|c| c.contains("Finished:"))
        .count();
    assert_eq!(finished, 1);

    // And no double release: the freed gpu slot admits exactly one of the
    // two waiting cards.
    f.board.add_card("Queue", test_card("b", "next", &["gpu"]));
    f.board.add_card("Queue", test_card("c", "later", &["gpu"]));
    f.poller.run_cycle(&mut controller).await;
    assert_eq!(f.board.cards_in("Ongoing"), vec!["b".to_string()]);
    assert_eq!(f.board.cards_in("Queue"), vec!["c".to_string()]);
}
