use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;

use clap::{Parser, Subcommand};
use ktile_common::{ipc_socket_path, AppLogger, IpcEvent, IpcRequest, IpcResponse};
use log::LevelFilter;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "ktilemsg", about = "Query and control a running ktile")]
struct Cli {
    /// Control socket to connect to
    #[arg(short, long)]
    socket: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sets a property. The value is read as JSON, falling back to a string.
    Set { path: String, value: String },
    /// Prints a property.
    Get { path: String },
    /// Lists views, optionally only those on one output.
    DumpViews { output: Option<String> },
    /// Runs an action, e.g. `ktilemsg exec workspace 2`.
    Exec {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Prints focus, workspace and chord events as they happen.
    Watch,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = AppLogger::init("ktilemsg", LevelFilter::Info) {
        // Running outside a session is normal for a CLI.
        eprintln!("ktilemsg: logging disabled: {}", e);
    }

    let socket = cli.socket.unwrap_or_else(ipc_socket_path);
    let result = match build_request(cli.command) {
        Some(request) => send(&socket, &request).and_then(|response| match response {
            IpcResponse::Ok { value } => {
                print_value(&value);
                Ok(())
            }
            IpcResponse::Error { message } => Err(message),
        }),
        None => watch(&socket),
    };

    if let Err(e) = result {
        log::warn!("{}", e);
        eprintln!("ktilemsg: {}", e);
        std::process::exit(1);
    }
}

/// `None` for `watch`, which only listens.
fn build_request(command: Command) -> Option<IpcRequest> {
    let request = match command {
        Command::Set { path, value } => IpcRequest::Set {
            path,
            value: parse_value(&value),
        },
        Command::Get { path } => IpcRequest::Get { path },
        Command::DumpViews { output } => IpcRequest::DumpViews { output },
        Command::Exec { args } => IpcRequest::Exec { args },
        Command::Watch => return None,
    };
    Some(request)
}

/// `4`, `true` and `"x"` parse as JSON; anything else is taken as a bare
/// string so `set tiling.mode traditional` works without quoting.
fn parse_value(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn connect(socket: &Path) -> Result<UnixStream, String> {
    UnixStream::connect(socket)
        .map_err(|e| format!("cannot connect to {}: {}", socket.display(), e))
}

fn send(socket: &Path, request: &IpcRequest) -> Result<IpcResponse, String> {
    let mut stream = connect(socket)?;
    let line = serde_json::to_string(request).map_err(|e| e.to_string())?;
    log::debug!("Sending {}", line);
    stream
        .write_all(format!("{}\n", line).as_bytes())
        .map_err(|e| format!("write failed: {}", e))?;

    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let line = line.map_err(|e| format!("read failed: {}", e))?;
        // Events are broadcast on the same stream; skip to the response.
        if let Some(response) = parse_response(&line) {
            return Ok(response);
        }
    }
    Err("connection closed before a response arrived".to_string())
}

fn parse_response(line: &str) -> Option<IpcResponse> {
    serde_json::from_str(line.trim()).ok()
}

fn watch(socket: &Path) -> Result<(), String> {
    let stream = connect(socket)?;
    for line in BufReader::new(stream).lines() {
        let line = line.map_err(|e| format!("read failed: {}", e))?;
        match serde_json::from_str::<IpcEvent>(line.trim()) {
            Ok(event) => println!("{}", describe(&event)),
            Err(e) => log::debug!("Ignoring line {:?}: {}", line, e),
        }
    }
    Ok(())
}

fn describe(event: &IpcEvent) -> String {
    match event {
        IpcEvent::FocusChanged { view, title } => match view {
            Some(view) => format!("focus {} {}", view, title.as_deref().unwrap_or("")),
            None => "focus none".to_string(),
        },
        IpcEvent::WorkspaceChanged { output, workspace } => {
            format!("workspace {} {}", output, workspace)
        }
        IpcEvent::ChordProgress { pending } => format!("chord {}", pending),
    }
}

fn print_value(value: &Value) {
    match value {
        Value::Null => {}
        Value::String(s) => println!("{}", s),
        other => match serde_json::to_string_pretty(other) {
            Ok(text) => println!("{}", text),
            Err(_) => println!("{}", other),
        },
    }
}
