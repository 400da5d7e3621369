use shotclock::model::{TimerState, NEUTRAL};
use shotclock::store::Database;
use tempfile::TempDir;

fn open_store(dir: &TempDir) -> Database {
    Database::new(dir.path().join("shotclock.sqlite3")).unwrap()
}

#[tokio::test]
async fn missing_keys_default_to_neutral_zero_state() {
    let dir = TempDir::new().unwrap();
    let db = open_store(&dir);

    let state = db.load_timer_state().await.unwrap();
    assert_eq!(state, TimerState::default());
    assert_eq!(state.selected_project, NEUTRAL);

    let selected = db.load_selected_project().await.unwrap();
    assert_eq!(selected, NEUTRAL);

    let accumulator = db.load_accumulator("Projekt A").await.unwrap();
    assert_eq!(accumulator.elapsed_tenths, 0);
    assert_eq!(accumulator.accumulated_total, 0.0);
}

#[tokio::test]
async fn remaining_above_total_is_clamped_on_load() {
    let dir = TempDir::new().unwrap();
    let db = open_store(&dir);

    // a partial write from another instance can leave this pair inconsistent
    db.save_times(500, 300).await.unwrap();

    let state = db.load_timer_state().await.unwrap();
    assert_eq!(state.remaining_tenths, 300);
    assert_eq!(state.total_tenths, 300);
}

#[tokio::test]
async fn times_and_running_flag_round_trip() {
    let dir = TempDir::new().unwrap();
    let db = open_store(&dir);

    db.save_times(450, 600).await.unwrap();
    db.save_running(true).await.unwrap();
    db.save_selected_project("Projekt B").await.unwrap();

    let state = db.load_timer_state().await.unwrap();
    assert_eq!(state.remaining_tenths, 450);
    assert_eq!(state.total_tenths, 600);
    assert!(state.is_running);
    assert_eq!(state.selected_project, "Projekt B");
}

#[tokio::test]
async fn accumulated_total_keeps_one_decimal_place() {
    let dir = TempDir::new().unwrap();
    let db = open_store(&dir);

    // three tick-sized increments would drift without rounding at the store
    db.save_accumulated("Projekt A", 0.1).await.unwrap();
    db.save_accumulated("Projekt A", 0.2 + 0.1).await.unwrap();

    let accumulator = db.load_accumulator("Projekt A").await.unwrap();
    assert_eq!(accumulator.accumulated_total, 0.3);
}

#[tokio::test]
async fn elapsed_counter_can_be_deleted() {
    let dir = TempDir::new().unwrap();
    let db = open_store(&dir);

    db.save_elapsed("Projekt A", 42).await.unwrap();
    assert_eq!(
        db.load_accumulator("Projekt A").await.unwrap().elapsed_tenths,
        42
    );

    db.delete_elapsed("Projekt A").await.unwrap();
    assert_eq!(
        db.load_accumulator("Projekt A").await.unwrap().elapsed_tenths,
        0
    );
}

#[tokio::test]
async fn second_handle_sees_writes_from_the_first() {
    let dir = TempDir::new().unwrap();
    let writer = open_store(&dir);
    let reader = open_store(&dir);

    writer.save_times(120, 600).await.unwrap();
    writer.save_selected_project("Projekt A").await.unwrap();

    let state = reader.load_timer_state().await.unwrap();
    assert_eq!(state.remaining_tenths, 120);
    assert_eq!(state.total_tenths, 600);
    assert_eq!(state.selected_project, "Projekt A");
}
