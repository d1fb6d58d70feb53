mod support;

use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::{QuizLaunch, QuizSnapshot, QuizStatus, SessionKey};
use quiz_core::time::fixed_clock;
use services::{QuizCommand, QuizError, QuizEvent, QuizRunner, QuizServices};
use storage::repository::SnapshotRepository;
use support::{FakeBackend, JournalingRepository, journal, questions};
use tokio::sync::mpsc;

const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

fn services(backend: &Arc<FakeBackend>, repo: &Arc<JournalingRepository>) -> QuizServices {
    QuizServices::from_parts(
        backend.clone(),
        repo.clone(),
        fixed_clock(),
        None,
        SUBMIT_TIMEOUT,
    )
}

async fn next_matching(
    events: &mut mpsc::UnboundedReceiver<QuizEvent>,
    wanted: impl Fn(&QuizEvent) -> bool,
) -> QuizEvent {
    loop {
        let event = events.recv().await.expect("runner dropped the event channel");
        if wanted(&event) {
            return event;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn countdown_expiry_submits_without_input() {
    let journal = journal();
    let backend = Arc::new(FakeBackend::new(questions(2), journal.clone()));
    let repo = Arc::new(JournalingRepository::new(journal));
    let runner = services(&backend, &repo)
        .open(QuizLaunch::practice().with_duration_secs(3))
        .await
        .unwrap();

    let (_commands, command_rx) = mpsc::channel(8);
    let (event_tx, mut events) = mpsc::unbounded_channel();
    let result = runner.run(command_rx, event_tx).await.unwrap();

    assert_eq!(result.time_taken, Some(3));
    assert_eq!(backend.submit_calls(), 1);
    assert_eq!(repo.deletions(), 1);

    let mut last_time_left = u32::MAX;
    let mut saw_submitted = false;
    while let Ok(event) = events.try_recv() {
        match event {
            QuizEvent::Progress(view) if view.progress.status == QuizStatus::Active => {
                assert!(view.progress.time_left <= last_time_left);
                last_time_left = view.progress.time_left;
            }
            QuizEvent::Submitted(_) => saw_submitted = true,
            _ => {}
        }
    }
    assert!(saw_submitted);
}

#[tokio::test(start_paused = true)]
async fn closing_commands_abandons_and_keeps_snapshot() {
    let journal = journal();
    let backend = Arc::new(FakeBackend::new(questions(2), journal.clone()));
    let repo = Arc::new(JournalingRepository::new(journal));
    let runner = services(&backend, &repo)
        .open(QuizLaunch::practice())
        .await
        .unwrap();

    let (commands, command_rx) = mpsc::channel(8);
    let (event_tx, _events) = mpsc::unbounded_channel();
    commands.send(QuizCommand::Answer("A".into())).await.unwrap();
    drop(commands);

    let err = runner.run(command_rx, event_tx).await.unwrap_err();
    assert!(matches!(err, QuizError::Abandoned));
    assert_eq!(backend.submit_calls(), 0);

    let snapshot = repo
        .load_snapshot(&SessionKey::Default)
        .await
        .unwrap()
        .expect("snapshot survives for resume");
    assert!(snapshot.answers[0].is_some());
}

#[tokio::test(start_paused = true)]
async fn repeated_triggers_while_submitting_call_backend_once() {
    let journal = journal();
    let backend = Arc::new(
        FakeBackend::new(questions(1), journal.clone()).with_submit_delay(Duration::from_secs(5)),
    );
    let repo = Arc::new(JournalingRepository::new(journal));
    let runner = services(&backend, &repo)
        .open(QuizLaunch::practice().with_duration_secs(2))
        .await
        .unwrap();

    let (commands, command_rx) = mpsc::channel(8);
    let (event_tx, _events) = mpsc::unbounded_channel();
    let handle = tokio::spawn(runner.run(command_rx, event_tx));

    commands.send(QuizCommand::Advance).await.unwrap();
    commands.send(QuizCommand::Submit).await.unwrap();
    commands.send(QuizCommand::Advance).await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;
    commands.send(QuizCommand::Submit).await.unwrap();

    let result = handle.await.unwrap().unwrap();
    assert_eq!(result.total_questions, Some(1));
    assert_eq!(backend.submit_calls(), 1);
    assert_eq!(backend.submitted()[0].time_taken, 0);
}

#[tokio::test(start_paused = true)]
async fn failed_submission_reactivates_with_frozen_clock() {
    let journal = journal();
    let backend = Arc::new(
        FakeBackend::new(questions(2), journal.clone())
            .failing_first(1)
            .with_submit_delay(Duration::from_secs(10)),
    );
    let repo = Arc::new(JournalingRepository::new(journal));
    let runner = services(&backend, &repo)
        .open(QuizLaunch::practice().with_duration_secs(60))
        .await
        .unwrap();

    let (commands, command_rx) = mpsc::channel(8);
    let (event_tx, mut events) = mpsc::unbounded_channel();
    let handle = tokio::spawn(runner.run(command_rx, event_tx));

    commands.send(QuizCommand::Submit).await.unwrap();
    next_matching(&mut events, |e| matches!(e, QuizEvent::SubmissionFailed(_))).await;
    let progress = next_matching(&mut events, |e| matches!(e, QuizEvent::Progress(_))).await;
    match progress {
        QuizEvent::Progress(view) => {
            assert_eq!(view.progress.status, QuizStatus::Active);
            assert_eq!(view.progress.time_left, 60);
            assert!(view.selected.is_none());
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(repo.deletions(), 0);

    commands.send(QuizCommand::Submit).await.unwrap();
    let result = handle.await.unwrap().unwrap();
    assert!(result.is_published);
    assert_eq!(backend.submit_calls(), 2);
    assert_eq!(repo.deletions(), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_backend_times_out_and_rolls_back() {
    let journal = journal();
    let backend = Arc::new(
        FakeBackend::new(questions(2), journal.clone())
            .with_submit_delay(Duration::from_secs(3600)),
    );
    let repo = Arc::new(JournalingRepository::new(journal));
    let runner = services(&backend, &repo)
        .open(QuizLaunch::practice().with_duration_secs(600))
        .await
        .unwrap();

    let (commands, command_rx) = mpsc::channel(8);
    let (event_tx, mut events) = mpsc::unbounded_channel();
    let handle = tokio::spawn(runner.run(command_rx, event_tx));

    commands.send(QuizCommand::Submit).await.unwrap();
    let failed = next_matching(&mut events, |e| matches!(e, QuizEvent::SubmissionFailed(_))).await;
    assert!(matches!(failed, QuizEvent::SubmissionFailed(message) if message.contains("timed out")));

    let progress = next_matching(&mut events, |e| matches!(e, QuizEvent::Progress(_))).await;
    assert!(matches!(progress, QuizEvent::Progress(view) if view.progress.status == QuizStatus::Active));
    assert_eq!(backend.submit_calls(), 1);
    assert_eq!(repo.deletions(), 0);
    assert!(
        repo.load_snapshot(&SessionKey::Default)
            .await
            .unwrap()
            .is_some()
    );

    drop(commands);
    assert!(matches!(handle.await.unwrap(), Err(QuizError::Abandoned)));
}

#[tokio::test(start_paused = true)]
async fn countdown_resumes_once_after_failed_submission() {
    let journal = journal();
    let backend = Arc::new(
        FakeBackend::new(questions(2), journal.clone())
            .failing_first(1)
            .with_submit_delay(Duration::from_millis(2500)),
    );
    let repo = Arc::new(JournalingRepository::new(journal));
    let runner = services(&backend, &repo)
        .open(QuizLaunch::practice().with_duration_secs(60))
        .await
        .unwrap();

    let (commands, command_rx) = mpsc::channel(8);
    let (event_tx, mut events) = mpsc::unbounded_channel();
    let handle = tokio::spawn(runner.run(command_rx, event_tx));

    // Ticks land on whole seconds; stay clear of them.
    tokio::time::sleep(Duration::from_millis(3500)).await;
    commands.send(QuizCommand::Submit).await.unwrap();
    next_matching(&mut events, |e| matches!(e, QuizEvent::SubmissionFailed(_))).await;

    tokio::time::sleep(Duration::from_millis(5500)).await;
    let snapshot = repo
        .load_snapshot(&SessionKey::Default)
        .await
        .unwrap()
        .expect("failed submission keeps the snapshot");
    assert_eq!(snapshot.time_left, 52);

    let mut latest = None;
    while let Ok(event) = events.try_recv() {
        if let QuizEvent::Progress(view) = event {
            latest = Some(view);
        }
    }
    let view = latest.expect("ticks after the rollback are reported");
    assert_eq!(view.progress.status, QuizStatus::Active);
    assert_eq!(view.progress.time_left, 52);

    drop(commands);
    assert!(matches!(handle.await.unwrap(), Err(QuizError::Abandoned)));
    assert_eq!(backend.submit_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn resumed_session_out_of_time_submits_immediately() {
    let journal = journal();
    let backend = Arc::new(FakeBackend::new(questions(2), journal.clone()));
    let repo = Arc::new(JournalingRepository::new(journal));
    let snapshot = QuizSnapshot {
        questions: questions(2),
        current_index: 1,
        answers: Vec::new(),
        time_left: 0,
    };
    repo.save_snapshot(&SessionKey::Default, &snapshot)
        .await
        .unwrap();

    let runner: QuizRunner = services(&backend, &repo)
        .open(QuizLaunch::practice().with_duration_secs(120))
        .await
        .unwrap();
    let (_commands, command_rx) = mpsc::channel(8);
    let (event_tx, _events) = mpsc::unbounded_channel();
    let result = runner.run(command_rx, event_tx).await.unwrap();

    assert_eq!(backend.fetch_calls(), 0);
    assert_eq!(result.time_taken, Some(120));
    let sent = backend.submitted();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].answers.iter().all(|a| a.selected_answer.is_none()));
}

#[tokio::test(start_paused = true)]
async fn rejected_input_is_reported_as_notice() {
    let journal = journal();
    let backend = Arc::new(FakeBackend::new(questions(1), journal.clone()));
    let repo = Arc::new(JournalingRepository::new(journal));
    let runner = services(&backend, &repo)
        .open(QuizLaunch::practice())
        .await
        .unwrap();

    let (commands, command_rx) = mpsc::channel(8);
    let (event_tx, mut events) = mpsc::unbounded_channel();
    let handle = tokio::spawn(runner.run(command_rx, event_tx));

    commands.send(QuizCommand::AnswerChoice(9)).await.unwrap();
    let notice = next_matching(&mut events, |e| matches!(e, QuizEvent::Notice(_))).await;
    assert!(matches!(notice, QuizEvent::Notice(message) if message.contains('9')));

    drop(commands);
    assert!(matches!(handle.await.unwrap(), Err(QuizError::Abandoned)));
}
