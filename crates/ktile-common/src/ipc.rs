use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One request per line on the control socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IpcRequest {
    #[serde(rename = "set")]
    Set { path: String, value: Value },
    #[serde(rename = "get")]
    Get { path: String },
    #[serde(rename = "dump_views")]
    DumpViews {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },
    #[serde(rename = "exec")]
    Exec { args: Vec<String> },
}

/// Every request gets exactly one response, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IpcResponse {
    #[serde(rename = "ok")]
    Ok {
        #[serde(default)]
        value: Value,
    },
    #[serde(rename = "error")]
    Error { message: String },
}

impl IpcResponse {
    pub fn ok(value: Value) -> Self {
        IpcResponse::Ok { value }
    }

    pub fn error(message: impl Into<String>) -> Self {
        IpcResponse::Error {
            message: message.into(),
        }
    }
}

/// Broadcast to every connected client as state changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IpcEvent {
    #[serde(rename = "focus")]
    FocusChanged {
        view: Option<u64>,
        title: Option<String>,
    },
    #[serde(rename = "workspace")]
    WorkspaceChanged { output: String, workspace: usize },
    #[serde(rename = "chord")]
    ChordProgress { pending: String },
}

pub fn ipc_socket_path() -> std::path::PathBuf {
    match std::env::var("XDG_RUNTIME_DIR") {
        Ok(runtime_dir) if !runtime_dir.is_empty() => {
            std::path::PathBuf::from(runtime_dir).join("ktile.sock")
        }
        _ => std::path::PathBuf::from("/tmp").join(format!("ktile-{}.sock", unsafe { libc::getuid() })),
    }
}
