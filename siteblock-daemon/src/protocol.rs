use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ControllerError, DaemonError};
use crate::paths::socket_path;

/// JSON newline-delimited request, tagged by `cmd`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum DaemonRequest {
    Add { site: String },
    Remove { site: String },
    List,
    Clear,
    ScheduleAdd {
        start: String,
        end: String,
        days: Vec<String>,
    },
    ScheduleList,
    ScheduleRemove { index: usize },
    On,
    Off,
    Toggle,
    Status,
    Diff,
    Backup,
    Restore,
    Export { path: PathBuf },
    Import { path: PathBuf },
    Stop,
}

impl DaemonRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Remove { .. } => "remove",
            Self::List => "list",
            Self::Clear => "clear",
            Self::ScheduleAdd { .. } => "schedule_add",
            Self::ScheduleList => "schedule_list",
            Self::ScheduleRemove { .. } => "schedule_remove",
            Self::On => "on",
            Self::Off => "off",
            Self::Toggle => "toggle",
            Self::Status => "status",
            Self::Diff => "diff",
            Self::Backup => "backup",
            Self::Restore => "restore",
            Self::Export { .. } => "export",
            Self::Import { .. } => "import",
            Self::Stop => "stop",
        }
    }
}

/// JSON newline-delimited response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl DaemonResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
            kind: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
            kind: None,
        }
    }

    pub fn failure(err: &ControllerError) -> Self {
        Self {
            kind: Some(err.kind().to_string()),
            ..Self::error(err.to_string())
        }
    }

    /// Unwrap the payload, turning a failure back into an error.
    pub fn into_data(self) -> Result<Value, DaemonError> {
        if self.ok {
            return Ok(self.data.unwrap_or(Value::Null));
        }
        let message = self
            .error
            .unwrap_or_else(|| "unknown daemon error".to_string());
        match self.kind {
            Some(kind) => Err(DaemonError::Remote { message, kind }),
            None => Err(DaemonError::Protocol(message)),
        }
    }
}

/// Runtime facts a running daemon adds to its status payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonInfo {
    pub pid: u32,
    pub started_at_unix: u64,
    pub socket: PathBuf,
    pub tick_secs: u64,
}

/// Send one JSON request to the daemon socket and return one response.
pub fn send_request(home: &Path, request: &DaemonRequest) -> Result<DaemonResponse, DaemonError> {
    let socket = socket_path(home);
    if !socket.exists() {
        return Err(DaemonError::DaemonNotRunning { socket });
    }

    exchange(&socket, request)
}

#[cfg(unix)]
fn exchange(socket: &Path, request: &DaemonRequest) -> Result<DaemonResponse, DaemonError> {
    use std::io::{BufRead, BufReader, Write};
    use std::os::unix::net::UnixStream;

    use crate::error::io_err;

    let mut stream = UnixStream::connect(socket).map_err(|err| {
        if matches!(
            err.kind(),
            std::io::ErrorKind::NotFound
                | std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::ConnectionReset
        ) {
            DaemonError::DaemonNotRunning {
                socket: socket.to_path_buf(),
            }
        } else {
            io_err(socket, err)
        }
    })?;

    let payload = serde_json::to_string(request)?;
    stream
        .write_all(payload.as_bytes())
        .map_err(|e| io_err(socket, e))?;
    stream.write_all(b"\n").map_err(|e| io_err(socket, e))?;
    stream.flush().map_err(|e| io_err(socket, e))?;

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .map_err(|e| io_err(socket, e))?;
    if read == 0 {
        return Err(DaemonError::Protocol(
            "daemon closed connection before responding".to_string(),
        ));
    }

    let response: DaemonResponse = serde_json::from_str(line.trim_end())?;
    Ok(response)
}

#[cfg(not(unix))]
fn exchange(socket: &Path, _request: &DaemonRequest) -> Result<DaemonResponse, DaemonError> {
    Err(DaemonError::DaemonNotRunning {
        socket: socket.to_path_buf(),
    })
}

/// Send `request` and return its payload.
pub fn request(home: &Path, request: &DaemonRequest) -> Result<Value, DaemonError> {
    send_request(home, request)?.into_data()
}

/// Query a daemon that may still be binding its socket.
pub fn request_status(home: &Path) -> Result<Value, DaemonError> {
    let mut last_not_running: Option<DaemonError> = None;
    for attempt in 0..5 {
        match request(home, &DaemonRequest::Status) {
            Ok(data) => return Ok(data),
            Err(err @ DaemonError::DaemonNotRunning { .. }) => {
                last_not_running = Some(err);
                if attempt < 4 {
                    sleep(Duration::from_millis(100));
                    continue;
                }
            }
            Err(err) => return Err(err),
        }
    }

    Err(last_not_running.unwrap_or_else(|| {
        DaemonError::Protocol("daemon status retry loop exited unexpectedly".to_string())
    }))
}

pub fn request_stop(home: &Path) -> Result<(), DaemonError> {
    request(home, &DaemonRequest::Stop).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requests_are_tagged_by_cmd() {
        let encoded = serde_json::to_value(DaemonRequest::ScheduleAdd {
            start: "09:00".into(),
            end: "17:00".into(),
            days: vec!["Monday".into()],
        })
        .unwrap();
        assert_eq!(
            encoded,
            json!({"cmd": "schedule_add", "start": "09:00", "end": "17:00", "days": ["Monday"]})
        );

        let decoded: DaemonRequest = serde_json::from_str(r#"{"cmd":"status"}"#).unwrap();
        assert_eq!(decoded, DaemonRequest::Status);
        assert_eq!(decoded.name(), "status");
    }

    #[test]
    fn unknown_command_does_not_decode() {
        assert!(serde_json::from_str::<DaemonRequest>(r#"{"cmd":"reboot"}"#).is_err());
    }

    #[test]
    fn failure_carries_kind() {
        let response = DaemonResponse::failure(&ControllerError::EmptyBlockList);
        let encoded = serde_json::to_value(&response).unwrap();
        assert_eq!(encoded["ok"], json!(false));
        assert_eq!(encoded["kind"], json!("empty_block_list"));
        assert!(encoded.get("data").is_none());

        let err = response.into_data().unwrap_err();
        assert_eq!(err.kind(), Some("empty_block_list"));
    }

    #[test]
    fn ok_response_without_data_is_null() {
        let response: DaemonResponse = serde_json::from_str(r#"{"ok":true}"#).unwrap();
        assert_eq!(response.into_data().unwrap(), Value::Null);
    }

    #[test]
    fn missing_socket_is_not_running() {
        let home = tempfile::TempDir::new().unwrap();
        let err = send_request(home.path(), &DaemonRequest::Status).unwrap_err();
        assert!(matches!(err, DaemonError::DaemonNotRunning { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn stale_socket_path_is_not_running() {
        let home = tempfile::TempDir::new().unwrap();
        let socket = socket_path(home.path());
        std::fs::create_dir_all(socket.parent().unwrap()).unwrap();
        let listener = std::os::unix::net::UnixListener::bind(&socket).unwrap();
        drop(listener);

        let err = request(home.path(), &DaemonRequest::Status).unwrap_err();
        assert!(matches!(err, DaemonError::DaemonNotRunning { .. }), "{err}");
    }
}
