use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    thread,
};

use rusqlite::{Connection, OpenFlags};
use tokio::sync::oneshot;

use crate::{
    core::{
        query::{Params, QueryDefinition},
        record::Record,
        types::DbRow,
    },
    error::{AppError, AppResult},
};

/// One worker thread per database file. Each worker owns its connection.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    inner: Arc<Mutex<HashMap<PathBuf, WorkerHandle>>>,
    busy_timeout_ms: u64,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            busy_timeout_ms: 2_000,
        }
    }

    pub fn ensure_worker(&self, db_path: &Path) -> AppResult<WorkerHandle> {
        let db_path = canonicalize_lossy(db_path)?;
        let mut guard = self.inner.lock().map_err(|_| AppError::Internal("poisoned lock".into()))?;
        if let Some(h) = guard.get(&db_path) {
            return Ok(h.clone());
        }

        let h = WorkerHandle::spawn(db_path.clone(), self.busy_timeout_ms);
        guard.insert(db_path, h.clone());
        Ok(h)
    }
}

#[derive(Debug, Clone)]
pub struct WorkerHandle {
    tx: std::sync::mpsc::Sender<DbTask>,
    pub db_path: PathBuf,
}

impl WorkerHandle {
    fn spawn(db_path: PathBuf, busy_timeout_ms: u64) -> Self {
        let (tx, rx) = std::sync::mpsc::channel::<DbTask>();
        let path_for_thread = db_path.clone();
        thread::spawn(move || db_worker_main(path_for_thread, busy_timeout_ms, rx));
        Self { tx, db_path }
    }

    /// Runs the query on the worker and returns raw rows.
    pub async fn rows(&self, query: Arc<QueryDefinition>, params: Params) -> AppResult<Vec<DbRow>> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(DbTask::Rows {
                query,
                params,
                respond_to: tx,
            })
            .map_err(|_| AppError::Internal("db worker unavailable".into()))?;
        rx.await.map_err(|_| AppError::Internal("db worker dropped response".into()))?
    }

    /// Runs the query on the worker and returns typed records.
    pub async fn records(&self, query: Arc<QueryDefinition>, params: Params) -> AppResult<Vec<Record>> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(DbTask::Records {
                query,
                params,
                respond_to: tx,
            })
            .map_err(|_| AppError::Internal("db worker unavailable".into()))?;
        rx.await.map_err(|_| AppError::Internal("db worker dropped response".into()))?
    }
}

enum DbTask {
    Rows {
        query: Arc<QueryDefinition>,
        params: Params,
        respond_to: oneshot::Sender<AppResult<Vec<DbRow>>>,
    },
    Records {
        query: Arc<QueryDefinition>,
        params: Params,
        respond_to: oneshot::Sender<AppResult<Vec<Record>>>,
    },
}

fn db_worker_main(db_path: PathBuf, busy_timeout_ms: u64, rx: std::sync::mpsc::Receiver<DbTask>) {
    let conn = match open_conn(&db_path, busy_timeout_ms) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error=%e, path=%db_path.display(), "failed to open db in worker; dropping tasks");
            let msg = e.to_string();
            while let Ok(task) = rx.recv() {
                respond_err(task, AppError::Internal(msg.clone()));
            }
            return;
        }
    };

    while let Ok(task) = rx.recv() {
        match task {
            DbTask::Rows {
                query,
                params,
                respond_to,
            } => {
                let res = query.with(&conn, &params);
                let _ = respond_to.send(res);
            }
            DbTask::Records {
                query,
                params,
                respond_to,
            } => {
                let res = query.with_records(&conn, &params);
                let _ = respond_to.send(res);
            }
        }
    }
}

fn respond_err(task: DbTask, err: AppError) {
    match task {
        DbTask::Rows { respond_to, .. } => {
            let _ = respond_to.send(Err(err));
        }
        DbTask::Records { respond_to, .. } => {
            let _ = respond_to.send(Err(err));
        }
    }
}

fn open_conn(path: &Path, busy_timeout_ms: u64) -> AppResult<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
    let conn = Connection::open_with_flags(path, flags).map_err(|source| AppError::DbOpenFailed {
        path: path.to_path_buf(),
        source,
    })?;
    conn.busy_timeout(std::time::Duration::from_millis(busy_timeout_ms))
        .map_err(|source| AppError::DbOpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(conn)
}

fn canonicalize_lossy(path: &Path) -> AppResult<PathBuf> {
    // canonicalize requires the file to exist; SQLite creates it on open.
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let cwd = std::env::current_dir()?;
        Ok(cwd.join(path))
    }
}
