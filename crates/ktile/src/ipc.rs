use ktile_common::{ipc_socket_path, IpcEvent, IpcRequest, IpcResponse};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

pub type ClientId = u64;

pub struct IpcServer {
    listener: UnixListener,
    socket_path: PathBuf,
    clients: HashMap<ClientId, IpcClient>,
    next_client_id: ClientId,
}

struct IpcClient {
    stream: UnixStream,
    reader: BufReader<UnixStream>,
    /// Bytes of a request line that has not seen its newline yet.
    pending: Vec<u8>,
}

impl IpcServer {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        Self::bind(&ipc_socket_path())
    }

    fn bind(socket_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if socket_path.exists() {
            std::fs::remove_file(socket_path)?;
        }

        let listener = UnixListener::bind(socket_path)?;
        listener.set_nonblocking(true)?;

        log::info!("IPC server listening on {}", socket_path.display());

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
            clients: HashMap::new(),
            next_client_id: 0,
        })
    }

    pub fn fd(&self) -> BorrowedFd<'_> {
        self.listener.as_fd()
    }

    pub fn accept_connections(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, _addr)) => {
                    if let Err(e) = stream.set_nonblocking(true) {
                        log::warn!("Failed to set IPC client non-blocking: {}", e);
                        continue;
                    }

                    let id = self.next_client_id;
                    self.next_client_id += 1;

                    let reader = BufReader::new(match stream.try_clone() {
                        Ok(s) => s,
                        Err(e) => {
                            log::warn!("Failed to clone stream: {}", e);
                            continue;
                        }
                    });

                    self.clients.insert(
                        id,
                        IpcClient {
                            stream,
                            reader,
                            pending: Vec::new(),
                        },
                    );
                    log::info!("IPC client {} connected", id);
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    log::warn!("IPC accept error: {}", e);
                    break;
                }
            }
        }
    }

    /// Drains every complete line from every client. A line cut short by
    /// the socket stays buffered until its newline arrives. Lines that fail
    /// to parse are answered with an error right away so each request still
    /// gets exactly one response.
    pub fn poll_requests(&mut self) -> Vec<(ClientId, IpcRequest)> {
        let mut requests = Vec::new();
        let mut rejected = Vec::new();
        let mut disconnected = Vec::new();

        for (&id, client) in &mut self.clients {
            loop {
                match client.reader.read_until(b'\n', &mut client.pending) {
                    Ok(0) => {
                        disconnected.push(id);
                        break;
                    }
                    Ok(_) => {
                        if client.pending.last() != Some(&b'\n') {
                            continue;
                        }
                        let line = std::mem::take(&mut client.pending);
                        let line = String::from_utf8_lossy(&line);
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<IpcRequest>(line) {
                            Ok(req) => requests.push((id, req)),
                            Err(e) => {
                                log::warn!("[ipc] Invalid request from {}: {}", id, e);
                                rejected.push((id, format!("invalid request: {}", e)));
                            }
                        }
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                    Err(e) => {
                        log::warn!("IPC read error from {}: {}", id, e);
                        disconnected.push(id);
                        break;
                    }
                }
            }
        }

        for (id, message) in rejected {
            self.reply(id, &IpcResponse::error(message));
        }

        for id in disconnected {
            self.clients.remove(&id);
            log::info!("IPC client {} disconnected", id);
        }

        requests
    }

    pub fn reply(&mut self, id: ClientId, response: &IpcResponse) {
        let Some(msg) = encode_line(response) else {
            return;
        };
        let failed = match self.clients.get_mut(&id) {
            Some(client) => client.stream.write_all(msg.as_bytes()).is_err(),
            None => false,
        };
        if failed {
            log::warn!("Failed to send to IPC client {}", id);
            self.clients.remove(&id);
        }
    }

    pub fn broadcast(&mut self, event: &IpcEvent) {
        let Some(msg) = encode_line(event) else {
            return;
        };
        log::debug!("[ipc] Broadcasting {:?} to {} client(s)", event, self.clients.len());

        let mut disconnected = Vec::new();
        for (&id, client) in &mut self.clients {
            if let Err(e) = client.stream.write_all(msg.as_bytes()) {
                log::warn!("Failed to send to IPC client {}: {}", id, e);
                disconnected.push(id);
            }
        }

        for id in disconnected {
            self.clients.remove(&id);
        }
    }
}

fn encode_line<T: Serialize>(message: &T) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(json) => Some(format!("{}\n", json)),
        Err(e) => {
            log::warn!("Failed to serialize IPC message: {}", e);
            None
        }
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}
