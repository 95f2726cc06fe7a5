use std::fs;
use std::io::ErrorKind;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{Local, NaiveDateTime};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::MissedTickBehavior;

use siteblock_core::JsonFileStore;
use siteblock_hosts::{HostsFile, SystemPlatform};

use crate::controller::Controller;
use crate::error::{io_err, ControllerError, DaemonError};
use crate::logging::init_tracing;
use crate::paths::{siteblock_root, socket_path, state_path};
use crate::protocol::{DaemonInfo, DaemonRequest, DaemonResponse};
use crate::settings::Settings;

/// Source of "now" for scheduler ticks.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

pub fn local_clock() -> Clock {
    Arc::new(|| Local::now().naive_local())
}

enum Op {
    Request(DaemonRequest),
    Tick(NaiveDateTime),
}

struct Job {
    op: Op,
    respond_to: oneshot::Sender<Result<Value, ControllerError>>,
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(home: &Path, settings: Settings) -> Result<(), DaemonError> {
    init_tracing("info");
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf(), settings))
}

/// Run the daemon against the real hosts file and the snapshot under `home`.
pub async fn run(home: PathBuf, settings: Settings) -> Result<(), DaemonError> {
    ensure_runtime_dirs(&home)?;

    let platform = Arc::new(SystemPlatform::new(&settings.hosts_path));
    let hosts = HostsFile::new(&settings.hosts_path);
    let controller = Controller::new(
        Box::new(JsonFileStore::new(state_path(&home))),
        hosts,
        platform,
        settings,
    );
    if !controller.elevated() {
        tracing::warn!(
            hosts = %controller.settings().hosts_path.display(),
            "not running as administrator/root; hosts file writes will likely fail",
        );
    }

    let (shutdown_tx, _) = broadcast::channel::<()>(16);
    serve(home, controller, local_clock(), shutdown_tx).await
}

/// Drive `controller` from scheduler ticks and socket clients until a
/// shutdown is broadcast on `shutdown_tx`.
pub async fn serve(
    home: PathBuf,
    controller: Controller,
    clock: Clock,
    shutdown_tx: broadcast::Sender<()>,
) -> Result<(), DaemonError> {
    let tick_period = controller.settings().tick_period;
    let info = DaemonInfo {
        pid: std::process::id(),
        started_at_unix: unix_seconds_now(),
        socket: socket_path(&home),
        tick_secs: tick_period.as_secs(),
    };
    tracing::info!(
        socket = %info.socket.display(),
        tick_secs = info.tick_secs,
        hosts = %controller.settings().hosts_path.display(),
        "daemon starting",
    );

    let (job_tx, job_rx) = mpsc::channel::<Job>(64);

    let controller_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            let result = controller_task(controller, job_rx, shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let scheduler_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown.subscribe();
        let job_tx = job_tx.clone();
        tokio::spawn(async move {
            let result = scheduler_task(job_tx, tick_period, clock, shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let socket_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown.subscribe();
        let job_tx = job_tx.clone();
        tokio::spawn(async move {
            let result = socket_server_task(job_tx, info, shutdown.clone(), shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };
    drop(job_tx);

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        let mut shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down daemon");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Protocol(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    let (controller_result, scheduler_result, socket_result, signal_result) = tokio::join!(
        controller_handle,
        scheduler_handle,
        socket_handle,
        signal_handle
    );

    handle_join("controller", controller_result)?;
    handle_join("scheduler", scheduler_result)?;
    handle_join("socket_server", socket_result)?;
    handle_join("signal_handler", signal_result)?;
    tracing::info!("daemon stopped");
    Ok(())
}

/// Sole owner of the controller. Each job runs to completion on the
/// blocking pool before the next is taken, and a shutdown waits for the
/// job in flight.
async fn controller_task(
    mut controller: Controller,
    mut jobs: mpsc::Receiver<Job>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            maybe_job = jobs.recv() => {
                let Some(Job { op, respond_to }) = maybe_job else { break };
                let (returned, outcome) = tokio::task::spawn_blocking(move || {
                    let outcome = execute(&mut controller, op);
                    (controller, outcome)
                })
                .await
                .map_err(|err| DaemonError::Protocol(format!("controller job join error: {err}")))?;
                controller = returned;
                let _ = respond_to.send(outcome);
            }
        }
    }

    let result = tokio::task::spawn_blocking(move || controller.shutdown())
        .await
        .map_err(|err| DaemonError::Protocol(format!("controller shutdown join error: {err}")))?;
    if let Err(err) = result {
        tracing::error!(error = %err, kind = err.kind(), "controller shutdown incomplete");
    }
    Ok(())
}

fn execute(controller: &mut Controller, op: Op) -> Result<Value, ControllerError> {
    match op {
        Op::Request(request) => controller.handle(&request),
        Op::Tick(now) => controller
            .tick(now)
            .map(|transition| json!({ "transition": transition })),
    }
}

/// Tick immediately, then every `period`. A failed tick is logged and the
/// next one retries.
async fn scheduler_task(
    jobs: mpsc::Sender<Job>,
    period: Duration,
    clock: Clock,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {
                match enqueue(&jobs, Op::Tick(clock())).await {
                    Ok(_) => {}
                    Err(DaemonError::ChannelClosed(_)) => break,
                    Err(err) => {
                        tracing::warn!(error = %err, "scheduler tick failed; retrying next tick");
                    }
                }
            }
        }
    }
    Ok(())
}

async fn socket_server_task(
    jobs: mpsc::Sender<Job>,
    info: DaemonInfo,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let socket = info.socket.clone();
    if let Some(dir) = socket.parent() {
        fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }
    prepare_socket_for_bind(&socket)?;

    let listener = UnixListener::bind(&socket).map_err(|e| io_err(&socket, e))?;
    set_socket_permissions(&socket)?;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (stream, _) = accepted.map_err(|e| io_err(&socket, e))?;
                let jobs = jobs.clone();
                let info = info.clone();
                let shutdown_tx = shutdown_tx.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_socket_client(stream, jobs, info, shutdown_tx).await {
                        tracing::error!(error = %err, "socket client error");
                    }
                });
            }
        }
    }

    if socket.exists() {
        let _ = fs::remove_file(&socket);
    }
    Ok(())
}

async fn handle_socket_client(
    stream: UnixStream,
    jobs: mpsc::Sender<Job>,
    info: DaemonInfo,
    shutdown_tx: broadcast::Sender<()>,
) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| io_err("daemon socket read", e))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let request = match serde_json::from_str::<DaemonRequest>(&line) {
            Ok(request) => request,
            Err(err) => {
                write_response(
                    &mut writer,
                    &DaemonResponse::error(format!("invalid request: {err}")),
                )
                .await?;
                continue;
            }
        };
        tracing::debug!(cmd = request.name(), "socket request");

        if request == DaemonRequest::Stop {
            let _ = shutdown_tx.send(());
            write_response(&mut writer, &DaemonResponse::ok(json!({ "stopping": true }))).await?;
            break;
        }

        let is_status = request == DaemonRequest::Status;
        let response = match enqueue(&jobs, Op::Request(request)).await {
            Ok(mut data) => {
                if let (true, Value::Object(map)) = (is_status, &mut data) {
                    map.insert("daemon".to_string(), json!(info));
                }
                DaemonResponse::ok(data)
            }
            Err(DaemonError::Controller(err)) => DaemonResponse::failure(&err),
            Err(err) => DaemonResponse::error(err.to_string()),
        };
        write_response(&mut writer, &response).await?;
    }

    Ok(())
}

async fn enqueue(jobs: &mpsc::Sender<Job>, op: Op) -> Result<Value, DaemonError> {
    let (tx, rx) = oneshot::channel();
    jobs.send(Job { op, respond_to: tx })
        .await
        .map_err(|_| DaemonError::ChannelClosed("controller queue"))?;

    let outcome = rx
        .await
        .map_err(|_| DaemonError::ChannelClosed("controller response"))?;
    Ok(outcome?)
}

fn prepare_socket_for_bind(socket: &Path) -> Result<(), DaemonError> {
    if !socket.exists() {
        return Ok(());
    }

    match StdUnixStream::connect(socket) {
        Ok(_) => {
            return Err(DaemonError::Protocol(format!(
                "daemon socket already in use: {}",
                socket.display()
            )));
        }
        Err(err) => {
            tracing::warn!(
                socket = %socket.display(),
                error = %err,
                "removing stale daemon socket before bind",
            );
        }
    }

    match fs::remove_file(socket) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(socket, err)),
    }
}

fn ensure_runtime_dirs(home: &Path) -> Result<(), DaemonError> {
    let root = siteblock_root(home);
    if !root.exists() {
        fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
    }
    Ok(())
}

async fn write_response(
    writer: &mut OwnedWriteHalf,
    response: &DaemonResponse,
) -> Result<(), DaemonError> {
    let payload = serde_json::to_string(response)?;
    writer
        .write_all(payload.as_bytes())
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .flush()
        .await
        .map_err(|e| io_err("daemon socket flush", e))?;
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Protocol(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

fn unix_seconds_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn set_socket_permissions(path: &Path) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}
