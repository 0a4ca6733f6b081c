//! End-to-end scenarios of the sync engine, against an in-memory backend

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use taskboard_sync::classifier::InboxPlaceholder;
use taskboard_sync::config::{CompletionConfig, SyncConfig};
use taskboard_sync::mock::{BackendCall, MockBackend, RecordingPresenter};
use taskboard_sync::mock_behaviour::MockBehaviour;
use taskboard_sync::mutator::DeleteOutcome;
use taskboard_sync::orchestrator::WorkflowOutcome;
use taskboard_sync::store::RefreshOutcome;
use taskboard_sync::traits::AffordanceState;
use taskboard_sync::{PlanDay, SyncError, SyncOrchestrator, Task, TaskId, TaskStore};

type TestOrchestrator = SyncOrchestrator<MockBackend, RecordingPresenter>;

struct Board {
    orchestrator: TestOrchestrator,
    backend: Arc<MockBackend>,
    presenter: Arc<RecordingPresenter>,
}

impl Board {
    fn new(tasks: Vec<Task>) -> Self {
        Self::new_with_config(tasks, SyncConfig::default())
    }

    fn new_with_config(tasks: Vec<Task>, config: SyncConfig) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let backend = Arc::new(MockBackend::with_tasks(tasks));
        let presenter = Arc::new(RecordingPresenter::new());
        let store = Arc::new(TaskStore::new(backend.clone(), presenter.clone()));
        let orchestrator = SyncOrchestrator::new(store, config);
        orchestrator.start();
        Self { orchestrator, backend, presenter }
    }

    fn ids(tasks: &[Task]) -> Vec<String> {
        tasks.iter().map(|t| t.id().to_string()).collect()
    }
}

fn task(id: &str, plan_day: PlanDay, due: Option<(u32, u32)>) -> Task {
    Task::new_with_parameters(
        TaskId::from(id), format!("Task {}", id),
        due.map(|(day, hour)| Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()), None,
        plan_day, Vec::new(), false)
}


#[tokio::test]
async fn empty_board_prompts_to_sync() {
    let board = Board::new(Vec::new());
    assert_eq!(board.orchestrator.store().refresh().await, RefreshOutcome::Refreshed);

    let flags = board.presenter.last_flags().unwrap();
    assert_eq!(flags.show_clarify_section, false);
    assert_eq!(flags.has_synced, false);
    assert_eq!(flags.inbox_placeholder, Some(InboxPlaceholder::PromptToSync));
    assert!(board.presenter.last_buckets().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn clarification_needs_a_real_email() {
    let t1 = Task::new_with_parameters(
        TaskId::from("t1"), "Send the report".to_string(), None, None,
        PlanDay::Unscheduled, vec!["What's your email?".to_string()], false);
    let board = Board::new(vec![t1]);
    board.orchestrator.store().refresh().await;

    let buckets = board.presenter.last_buckets().unwrap();
    assert!(board.presenter.last_flags().unwrap().show_clarify_section);
    assert_eq!(Board::ids(&buckets.clarify), vec!["t1"]);
    assert!(buckets.inbox.is_empty());

    let calls_before = board.backend.calls();
    let tasks_before = board.orchestrator.store().tasks();
    let renders_before = board.presenter.render_count();

    let result = board.orchestrator.answer_clarification(&TaskId::from("t1"), "What's your email?", "not-an-email").await;
    assert!(matches!(result, Err(SyncError::InvalidEmail{..})));
    assert_eq!(board.backend.calls(), calls_before);
    assert_eq!(board.orchestrator.store().tasks(), tasks_before);
    assert_eq!(board.presenter.render_count(), renders_before);
}

#[tokio::test]
async fn unplanned_tasks_land_in_inbox_earliest_first() {
    let board = Board::new(vec![
        task("later", PlanDay::Unscheduled, Some((2, 9))),
        task("earlier", PlanDay::Unscheduled, Some((1, 9))),
    ]);
    board.orchestrator.store().refresh().await;

    let buckets = board.presenter.last_buckets().unwrap();
    assert_eq!(Board::ids(&buckets.inbox), vec!["earlier", "later"]);
    assert!(buckets.today.is_empty());
    assert!(buckets.tomorrow.is_empty());
    assert!(buckets.clarify.is_empty());
}

#[tokio::test]
async fn deleting_an_external_task_is_local_only() {
    let t2 = Task::new_with_parameters(TaskId::from("t2"), "Lecture".to_string(), None, None, PlanDay::Today, Vec::new(), true);
    let board = Board::new(vec![t2, task("t3", PlanDay::Today, None)]);
    board.orchestrator.store().refresh().await;
    let calls_before = board.backend.calls().len();

    let outcome = board.orchestrator.delete_task(&TaskId::from("t2"), true).await;
    assert_eq!(outcome, DeleteOutcome::LocalOnly);
    assert_eq!(board.backend.calls().len(), calls_before);
    assert_eq!(Board::ids(&board.presenter.last_buckets().unwrap().today), vec!["t3"]);
}

#[tokio::test]
async fn failed_delete_restores_backend_state() {
    let board = Board::new(vec![task("t1", PlanDay::Today, None), task("t2", PlanDay::Tomorrow, None)]);
    board.orchestrator.store().refresh().await;
    board.backend.set_behaviour(MockBehaviour{ delete_task_behaviour: (0, 1), ..MockBehaviour::default() });

    let outcome = board.orchestrator.delete_task(&TaskId::from("t1"), false).await;
    assert_eq!(outcome, DeleteOutcome::Reconciled(RefreshOutcome::Refreshed));
    assert_eq!(board.backend.delete_count(), 1);
    assert_eq!(board.orchestrator.store().tasks(), board.backend.server_tasks());
    assert_eq!(Board::ids(&board.presenter.last_buckets().unwrap().today), vec!["t1"]);

    // Nothing is shown to the user: the board fixed itself
    assert!(board.presenter.alerts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn full_day_with_the_agent() {
    let board = Board::new(Vec::new());
    board.backend.set_calendar_tasks(vec![
        Task::new_with_parameters(TaskId::from("cal-1"), "Algorithms lecture".to_string(),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()), Some(90),
            PlanDay::Today, Vec::new(), true),
    ]);

    // Nothing can be added yet
    assert!(matches!(board.orchestrator.submit_text("buy milk").await, Err(SyncError::NotSynced)));
    assert_eq!(board.backend.mutation_count(), 0);

    let outcome = board.orchestrator.run_full_sync("https://canvas.example.com/feed.ics").await.unwrap();
    assert_eq!(outcome, WorkflowOutcome::Completed(RefreshOutcome::Refreshed));
    assert_eq!(board.backend.calls()[0], BackendCall::SyncAll("https://canvas.example.com/feed.ics".to_string()));
    assert!(board.presenter.last_flags().unwrap().has_synced);

    let outcome = board.orchestrator.submit_text("buy milk").await.unwrap();
    assert_eq!(outcome, WorkflowOutcome::Completed(RefreshOutcome::Refreshed));

    let buckets = board.presenter.last_buckets().unwrap();
    assert_eq!(Board::ids(&buckets.today), vec!["cal-1"]);
    assert_eq!(buckets.inbox.len(), 1);
    assert_eq!(buckets.inbox[0].title(), "buy milk");
    assert_eq!(board.presenter.current_affordances(), AffordanceState::idle());
}

#[tokio::test(start_paused = true)]
async fn workflows_of_different_kinds_overlap() {
    let board = Board::new(vec![task("t1", PlanDay::Today, None)]);
    board.backend.set_latency(Duration::from_millis(100));
    board.orchestrator.run_full_sync("https://canvas.example.com/feed.ics").await.unwrap();

    let (sync, text) = tokio::join!(
        board.orchestrator.run_full_sync("https://canvas.example.com/feed.ics"),
        board.orchestrator.submit_text("call mom"),
    );
    assert!(sync.is_ok());
    assert!(text.is_ok());

    // The input stayed disabled until the last workflow was done
    // (start, then the first sync acquiring and releasing)
    let history = board.presenter.affordance_history();
    let overlapping = &history[3..];
    assert_eq!(overlapping.len(), 4);
    assert!(overlapping[..3].iter().all(|a| a.input_enabled == false));
    assert_eq!(overlapping[3], AffordanceState::idle());
}

#[tokio::test(start_paused = true)]
async fn polling_completion_refreshes_as_soon_as_backend_changed() {
    let config = SyncConfig {
        completion: CompletionConfig::BackoffPolling{ initial_delay_ms: 50, max_delay_ms: 200, max_attempts: 10 },
        ..SyncConfig::default()
    };
    let board = Board::new_with_config(Vec::new(), config);
    board.backend.set_calendar_tasks(vec![task("cal-1", PlanDay::Tomorrow, None)]);

    let start = tokio::time::Instant::now();
    let outcome = board.orchestrator.run_full_sync("https://canvas.example.com/feed.ics").await.unwrap();
    assert_eq!(outcome, WorkflowOutcome::Completed(RefreshOutcome::Refreshed));
    // Way before the 8 seconds a fixed delay would take
    assert!(start.elapsed() < Duration::from_secs(1));
    // The state before the sync, one poll, one refresh
    assert_eq!(board.backend.fetch_count(), 3);
    assert_eq!(Board::ids(&board.presenter.last_buckets().unwrap().tomorrow), vec!["cal-1"]);
}

#[tokio::test(start_paused = true)]
async fn polling_compares_with_the_backend_not_the_local_board() {
    let config = SyncConfig {
        completion: CompletionConfig::BackoffPolling{ initial_delay_ms: 50, max_delay_ms: 200, max_attempts: 4 },
        ..SyncConfig::default()
    };
    let lecture = Task::new_with_parameters(TaskId::from("t2"), "Lecture".to_string(), None, None, PlanDay::Today, Vec::new(), true);
    let board = Board::new_with_config(vec![task("t1", PlanDay::Today, None), lecture], config);
    board.orchestrator.store().refresh().await;

    // Only gone from the local board: the backend still has it
    board.orchestrator.delete_task(&TaskId::from("t2"), true).await;
    assert_ne!(board.orchestrator.store().tasks(), board.backend.server_tasks());
    let fetches_before = board.backend.fetch_count();

    // Nothing to ingest, so this sync does not change anything on the backend
    let start = tokio::time::Instant::now();
    board.orchestrator.run_full_sync("https://canvas.example.com/feed.ics").await.unwrap();

    // The state before the sync, every poll, then the refresh
    assert_eq!(board.backend.fetch_count() - fetches_before, 1 + 4 + 1);
    // 50 + 100 + 200 + 200
    assert!(start.elapsed() >= Duration::from_millis(550));
}
