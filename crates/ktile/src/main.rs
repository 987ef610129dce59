mod input;
mod ipc;
mod protocols;
mod session;
mod shell;
mod state;

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use calloop::generic::Generic;
use calloop::signals::{Signal, Signals};
use calloop::timer::{TimeoutAction, Timer};
use calloop::{EventLoop, Interest, Mode, PostAction};
use clap::Parser;
use ktile::Config;
use ktile_common::FileLogger;
use log::LevelFilter;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use wayland_server::{Display, ListeningSocket};
use xkbcommon::xkb;

use input::InputHandler;
use ipc::IpcServer;
use session::Session;
use state::State;

const FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Parser)]
#[command(name = "ktile", about = "A keyboard-driven tiling Wayland compositor")]
struct Cli {
    /// Config file to load instead of the default search path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides `debug.log_level` from the config
    #[arg(long)]
    log_level: Option<String>,
}

struct LoopData {
    display: Display<State>,
    state: State,
    input: Option<InputHandler>,
    ipc: Option<IpcServer>,
}

impl LoopData {
    fn handle_ipc(&mut self) {
        let Some(ipc) = self.ipc.as_mut() else {
            return;
        };
        ipc.accept_connections();
        let dh = self.display.handle();
        for (client, request) in ipc.poll_requests() {
            let response = self.state.handle_request(&dh, request);
            ipc.reply(client, &response);
        }
    }

    fn flush(&mut self) {
        let events: Vec<_> = self.state.backend.events.drain(..).collect();
        if let Some(ipc) = self.ipc.as_mut() {
            for event in &events {
                ipc.broadcast(event);
            }
        }
        if let Err(e) = self.display.flush_clients() {
            log::warn!("Failed to flush clients: {}", e);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref());

    let level = cli
        .log_level
        .as_deref()
        .map(|l| LevelFilter::from_str(l).unwrap_or(LevelFilter::Info))
        .unwrap_or_else(|| config.debug.level_filter());
    if let Err(e) = FileLogger::init(level) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    if let Err(e) = run(config) {
        log::error!("Fatal: {}", e);
        session::terminate_children();
        std::process::exit(1);
    }
}

fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut display = Display::<State>::new()?;
    let dh = display.handle();
    protocols::create_globals(&dh);

    let socket = ListeningSocket::bind_auto("wayland", 1..33)?;
    let socket_name = socket
        .socket_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or("listening socket has no name")?;
    std::env::set_var("WAYLAND_DISPLAY", &socket_name);
    log::info!("Listening on: {}", socket_name);

    let xkb_context = xkb::Context::new(xkb::CONTEXT_NO_FLAGS);
    let keymap = input::compile_keymap(&xkb_context, &config.keyboard);
    if keymap.is_none() {
        log::error!(
            "Failed to compile keymap for layout '{}', keyboard input disabled",
            config.keyboard.layout
        );
    }

    let session = match Session::new() {
        Ok(session) => {
            log::info!("Holding VT{}", session.vt_num());
            Some(session)
        }
        Err(e) => {
            log::warn!("No VT session, VT switching disabled: {}", e);
            None
        }
    };

    let mut state = State::new(config, keymap.as_ref(), session);
    state.attach_configured_outputs(&dh);

    let input = keymap.as_ref().and_then(|keymap| match InputHandler::new(keymap) {
        Ok(handler) => {
            log::info!("Input handler initialized");
            Some(handler)
        }
        Err(e) => {
            log::error!("Failed to initialize input handler: {}", e);
            None
        }
    });

    let ipc = match IpcServer::new() {
        Ok(ipc) => Some(ipc),
        Err(e) => {
            log::error!("Failed to start IPC server: {}", e);
            None
        }
    };

    let mut event_loop = EventLoop::<LoopData>::try_new()?;
    let handle = event_loop.handle();

    handle
        .insert_source(
            Generic::new(socket, Interest::READ, Mode::Level),
            |_, socket, data| {
                while let Some(stream) = socket.accept()? {
                    match data.display.handle().insert_client(stream, Arc::new(())) {
                        Ok(client) => log::info!("Client connected: {:?}", client),
                        Err(e) => log::error!("Failed to insert client: {}", e),
                    }
                }
                Ok(PostAction::Continue)
            },
        )
        .map_err(|e| e.error)?;

    let poll_fd = display.backend().poll_fd().try_clone_to_owned()?;
    handle
        .insert_source(
            Generic::new(poll_fd, Interest::READ, Mode::Level),
            |_, _, data| {
                if let Err(e) = data.display.dispatch_clients(&mut data.state) {
                    log::warn!("Failed to dispatch clients: {}", e);
                }
                Ok(PostAction::Continue)
            },
        )
        .map_err(|e| e.error)?;

    if let Some(handler) = &input {
        let input_fd = handler.as_fd().try_clone_to_owned()?;
        handle
            .insert_source(
                Generic::new(input_fd, Interest::READ, Mode::Level),
                |_, _, data| {
                    if let Some(input) = data.input.as_mut() {
                        input.dispatch()?;
                        let state = &mut data.state;
                        input.process_events(|event| state.handle_input(event));
                    }
                    Ok(PostAction::Continue)
                },
            )
            .map_err(|e| e.error)?;
    }

    if let Some(server) = &ipc {
        let ipc_fd = server.fd().try_clone_to_owned()?;
        handle
            .insert_source(
                Generic::new(ipc_fd, Interest::READ, Mode::Level),
                |_, _, data| {
                    data.handle_ipc();
                    Ok(PostAction::Continue)
                },
            )
            .map_err(|e| e.error)?;
    }

    let signals = Signals::new(&[Signal::SIGCHLD, Signal::SIGINT, Signal::SIGTERM])?;
    handle
        .insert_source(signals, |event, _, data| match event.signal() {
            Signal::SIGCHLD => reap_children(),
            signal => {
                log::info!("Received {:?}, shutting down", signal);
                data.state.backend.running = false;
            }
        })
        .map_err(|e| e.error)?;

    // IPC client streams are not registered with the loop; their requests
    // are picked up on every tick.
    handle
        .insert_source(Timer::from_duration(FRAME_INTERVAL), |_, _, data| {
            data.handle_ipc();
            data.state.send_frame_callbacks();
            TimeoutAction::ToDuration(FRAME_INTERVAL)
        })
        .map_err(|e| e.error)?;

    let mut data = LoopData {
        display,
        state,
        input,
        ipc,
    };

    log::info!("ktile running");
    while data.state.backend.running {
        event_loop.dispatch(Some(FRAME_INTERVAL), &mut data)?;
        data.flush();
    }

    log::info!("Shutting down");
    session::terminate_children();
    Ok(())
}

fn reap_children() {
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) | Err(_) => break,
            Ok(status) => {
                if let Some(pid) = status.pid() {
                    log::debug!("Reaped child {}", pid);
                    session::forget_child(pid.as_raw());
                }
            }
        }
    }
}
