//! SQLite-backed persistence served by a dedicated worker thread.
//!
//! The connection never leaves the worker; callers submit closures through
//! [`Database::execute`] and await the reply, so every statement runs in
//! submission order.

use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use rusqlite::Connection;
use tokio::sync::oneshot;

mod migrations;
pub mod models;
pub mod repositories;
pub mod store;

use migrations::run_migrations;

pub use models::{average_speed_kmh, NewRide, Ride};
pub use store::{KeyValueStore, MemoryStore};

/// The SQLite database serves as the on-disk [`KeyValueStore`].
pub type SqliteStore = Database;

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

/// Where the worker opens its connection.
#[derive(Debug, Clone)]
enum Target {
    File(PathBuf),
    Memory,
}

impl Target {
    fn open(&self) -> Result<Connection> {
        let conn = match self {
            Target::File(path) => Connection::open(path)
                .with_context(|| format!("failed to open SQLite database {}", path.display()))?,
            Target::Memory => {
                Connection::open_in_memory().context("failed to open in-memory SQLite")?
            }
        };

        if let Target::File(_) = self {
            if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                error!("Failed to enable WAL mode: {err}");
            }
        }
        Ok(conn)
    }

    fn describe(&self) -> String {
        match self {
            Target::File(path) => path.display().to_string(),
            Target::Memory => ":memory:".into(),
        }
    }
}

/// Owns the worker thread; shuts it down when the last handle goes away.
struct WorkerGuard {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        let handle = match self.worker.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(handle) = handle else {
            return;
        };

        if let Err(err) = self.sender.send(DbCommand::Shutdown) {
            error!("Failed to send shutdown to DB thread: {err}");
        }
        if let Err(join_err) = handle.join() {
            error!("Failed to join DB thread: {join_err:?}");
        }
    }
}

fn worker_main(
    target: Target,
    ready_tx: mpsc::Sender<Result<()>>,
    command_rx: mpsc::Receiver<DbCommand>,
) {
    let mut conn = match target.open() {
        Ok(conn) => conn,
        Err(err) => {
            let _ = ready_tx.send(Err(err));
            return;
        }
    };

    let init_result = run_migrations(&mut conn).context("failed to run database migrations");
    let init_failed = init_result.is_err();
    if ready_tx.send(init_result).is_err() || init_failed {
        return;
    }

    while let Ok(command) = command_rx.recv() {
        match command {
            DbCommand::Execute(task) => task(&mut conn),
            DbCommand::Shutdown => break,
        }
    }

    info!("Database thread shutting down");
}

#[derive(Clone)]
pub struct Database {
    guard: Arc<WorkerGuard>,
    db_path: Option<Arc<PathBuf>>,
}

impl Database {
    /// Opens (creating if needed) the database file and its parent directory.
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }
        Self::spawn(Target::File(db_path))
    }

    /// A private database that disappears with the last handle.
    pub fn in_memory() -> Result<Self> {
        Self::spawn(Target::Memory)
    }

    fn spawn(target: Target) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let db_path = match &target {
            Target::File(path) => Some(Arc::new(path.clone())),
            Target::Memory => None,
        };
        let description = target.describe();

        let worker = thread::Builder::new()
            .name("ridebattle-db".into())
            .spawn(move || worker_main(target, ready_tx, command_rx))
            .context("failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Database initialized at {description}");

        Ok(Self {
            guard: Arc::new(WorkerGuard {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path,
        })
    }

    /// File backing this database, `None` for in-memory ones.
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref().map(PathBuf::as_path)
    }

    /// Runs `task` on the worker's connection and returns its result.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            if reply_tx.send(task(conn)).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        self.guard
            .sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }
}
