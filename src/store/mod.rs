//! Persistent timer state store.
//!
//! A flat key/value namespace over SQLite, owned by a dedicated worker thread
//! so the async side never touches the connection directly. Every page
//! instance (admin or display, same process or not) opens the same database
//! file; WAL mode plus single-statement reads and writes give per-key
//! atomicity, which is all the consistency model asks for. Multi-key
//! consistency is explicitly not provided: a reader may observe `remaining`
//! and `total` from different writes, and copes by clamping on load.

use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::oneshot;

mod migrations;

use crate::model::{keys, ProjectAccumulator, TimerState, NEUTRAL};
use migrations::run_migrations;

/// Decimal places kept when persisting a project's accumulated seconds.
const ACCUMULATED_DECIMALS: usize = 1;

type StoreTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum StoreCommand {
    Execute(StoreTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<StoreCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(StoreCommand::Shutdown) {
                error!("Failed to send shutdown to store thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join store thread: {join_err:?}");
            }
        }
    }
}

#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create store directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<StoreCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("shotclock-store".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite store")));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }
                // Other page instances share this file; wait out their writes
                // instead of surfacing SQLITE_BUSY.
                if let Err(err) = conn.busy_timeout(Duration::from_millis(250)) {
                    error!("Failed to set busy timeout: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run store migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("Store initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        StoreCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        StoreCommand::Shutdown => break,
                    }
                }

                info!("Store thread shutting down");
            })
            .with_context(|| "failed to spawn store worker thread")?;

        ready_rx
            .recv()
            .context("store worker exited before signaling readiness")??;

        info!("Store initialized at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = StoreCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("Store caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to store thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("store thread terminated unexpectedly"))?
    }

    /// Reload the full timer state. Absent keys fall back to zero / false /
    /// "Neutral"; a remaining value above total is clamped down.
    pub async fn load_timer_state(&self) -> Result<TimerState> {
        self.execute(|conn| {
            let mut state = TimerState {
                remaining_tenths: get_i64(conn, keys::REMAINING_TIME)?,
                total_tenths: get_i64(conn, keys::TOTAL_TIME)?,
                is_running: get_value(conn, keys::IS_RUNNING)?
                    .map(|value| value == "true")
                    .unwrap_or(false),
                selected_project: get_value(conn, keys::SELECTED_CONFIG_NAME)?
                    .unwrap_or_else(|| NEUTRAL.to_string()),
            };
            state.clamp_remaining();
            Ok(state)
        })
        .await
    }

    /// Persist the remaining/total pair. No clamping here: the store writes
    /// what it is told, the invariant is enforced when loading.
    pub async fn save_times(&self, remaining_tenths: i64, total_tenths: i64) -> Result<()> {
        self.execute(move |conn| {
            put_value(conn, keys::REMAINING_TIME, &remaining_tenths.to_string())?;
            put_value(conn, keys::TOTAL_TIME, &total_tenths.to_string())?;
            Ok(())
        })
        .await
    }

    pub async fn save_running(&self, is_running: bool) -> Result<()> {
        self.execute(move |conn| {
            put_value(conn, keys::IS_RUNNING, if is_running { "true" } else { "false" })
        })
        .await
    }

    pub async fn load_selected_project(&self) -> Result<String> {
        self.execute(|conn| {
            Ok(get_value(conn, keys::SELECTED_CONFIG_NAME)?
                .unwrap_or_else(|| NEUTRAL.to_string()))
        })
        .await
    }

    pub async fn save_selected_project(&self, project: &str) -> Result<()> {
        let project = project.to_string();
        self.execute(move |conn| put_value(conn, keys::SELECTED_CONFIG_NAME, &project))
            .await
    }

    pub async fn load_accumulator(&self, project: &str) -> Result<ProjectAccumulator> {
        let elapsed_key = keys::elapsed(project);
        let accumulated_key = keys::accumulated(project);
        self.execute(move |conn| {
            Ok(ProjectAccumulator {
                elapsed_tenths: get_i64(conn, &elapsed_key)?,
                accumulated_total: get_f64(conn, &accumulated_key)?,
            })
        })
        .await
    }

    pub async fn save_elapsed(&self, project: &str, elapsed_tenths: i64) -> Result<()> {
        let key = keys::elapsed(project);
        self.execute(move |conn| put_value(conn, &key, &elapsed_tenths.to_string()))
            .await
    }

    /// The accumulated total is stored rounded to one decimal place, so the
    /// repeated 0.1 increments never drift into long float tails.
    pub async fn save_accumulated(&self, project: &str, accumulated_total: f64) -> Result<()> {
        let key = keys::accumulated(project);
        self.execute(move |conn| {
            put_value(
                conn,
                &key,
                &format!("{accumulated_total:.prec$}", prec = ACCUMULATED_DECIMALS),
            )
        })
        .await
    }

    pub async fn delete_elapsed(&self, project: &str) -> Result<()> {
        let key = keys::elapsed(project);
        self.execute(move |conn| {
            conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
                .with_context(|| "failed to delete elapsed counter")?;
            Ok(())
        })
        .await
    }
}

fn get_value(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM kv WHERE key = ?1",
        params![key],
        |row| row.get::<_, String>(0),
    )
    .optional()
    .with_context(|| format!("failed to read key '{key}'"))
}

fn get_i64(conn: &Connection, key: &str) -> Result<i64> {
    Ok(get_value(conn, key)?
        .and_then(|value| value.parse::<i64>().ok())
        .unwrap_or(0))
}

fn get_f64(conn: &Connection, key: &str) -> Result<f64> {
    Ok(get_value(conn, key)?
        .and_then(|value| value.parse::<f64>().ok())
        .unwrap_or(0.0))
}

fn put_value(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO kv (key, value, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, Utc::now().to_rfc3339()],
    )
    .with_context(|| format!("failed to write key '{key}'"))?;
    Ok(())
}
