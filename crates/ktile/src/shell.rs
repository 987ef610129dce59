//! The Wayland side of the window model: every `Backend` call lands here
//! and becomes protocol traffic to the owning client.

use ktile::{Backend, Observer, ViewId};
use ktile_common::IpcEvent;
use std::ffi::CString;
use std::os::fd::OwnedFd;
use wayland_protocols::xdg::shell::server::{
    xdg_surface::XdgSurface,
    xdg_toplevel::{State as ToplevelState, XdgToplevel},
};
use wayland_server::protocol::{
    wl_buffer::WlBuffer, wl_keyboard, wl_keyboard::WlKeyboard, wl_pointer::WlPointer,
    wl_surface::WlSurface,
};
use wayland_server::Resource;

use crate::input::ModifierState;
use crate::session::{self, Session};

pub struct Toplevel {
    pub view: ViewId,
    pub xdg_surface: XdgSurface,
    pub xdg_toplevel: XdgToplevel,
    pub wl_surface: WlSurface,
    /// Last size sent in a configure. Zero lets the client choose.
    pub size: (i32, i32),
    pub position: (i32, i32),
    pub min_size: (i32, i32),
    pub max_size: (i32, i32),
    /// Size from `set_window_geometry`, preferred over the buffer size.
    pub window_geometry: Option<(i32, i32)>,
    pub activated: bool,
    pub visible: bool,
    pub mapped: bool,
    pub pending_buffer: Option<WlBuffer>,
    pub pending_buffer_set: bool,
    pub has_buffer: bool,
}

impl Toplevel {
    pub fn new(
        view: ViewId,
        xdg_surface: XdgSurface,
        xdg_toplevel: XdgToplevel,
        wl_surface: WlSurface,
    ) -> Self {
        Self {
            view,
            xdg_surface,
            xdg_toplevel,
            wl_surface,
            size: (0, 0),
            position: (0, 0),
            min_size: (0, 0),
            max_size: (0, 0),
            window_geometry: None,
            activated: false,
            visible: false,
            mapped: false,
            pending_buffer: None,
            pending_buffer_set: false,
            has_buffer: false,
        }
    }

    fn states(&self) -> Vec<u8> {
        let mut states = Vec::new();
        if self.activated {
            states.extend_from_slice(&(ToplevelState::Activated as u32).to_ne_bytes());
        }
        states
    }
}

pub struct KeymapFile {
    pub fd: OwnedFd,
    pub size: u32,
}

pub struct WaylandBackend {
    /// Stacking order, topmost last.
    pub toplevels: Vec<Toplevel>,
    pub keyboards: Vec<WlKeyboard>,
    pub pointers: Vec<WlPointer>,
    pub keyboard_focus: Option<ViewId>,
    /// A layer surface that asked for the keyboard. Takes precedence over
    /// the focused view until it goes away.
    pub layer_focus: Option<WlSurface>,
    pub modifiers: ModifierState,
    pub session: Option<Session>,
    /// Observer notifications waiting to be broadcast over IPC.
    pub events: Vec<IpcEvent>,
    pub running: bool,
    pub needs_frame: bool,
    serial: u32,
}

impl WaylandBackend {
    pub fn new(session: Option<Session>) -> Self {
        Self {
            toplevels: Vec::new(),
            keyboards: Vec::new(),
            pointers: Vec::new(),
            keyboard_focus: None,
            layer_focus: None,
            modifiers: ModifierState::default(),
            session,
            events: Vec::new(),
            running: true,
            needs_frame: true,
            serial: 0,
        }
    }

    pub fn next_serial(&mut self) -> u32 {
        self.serial = self.serial.wrapping_add(1);
        self.serial
    }

    pub fn toplevel(&self, view: ViewId) -> Option<&Toplevel> {
        self.toplevels.iter().find(|t| t.view == view)
    }

    pub fn toplevel_mut(&mut self, view: ViewId) -> Option<&mut Toplevel> {
        self.toplevels.iter_mut().find(|t| t.view == view)
    }

    pub fn view_for_surface(&self, surface: &WlSurface) -> Option<ViewId> {
        let id = surface.id();
        self.toplevels
            .iter()
            .find(|t| t.wl_surface.id() == id)
            .map(|t| t.view)
    }

    pub fn view_for_xdg_surface(&self, xdg_surface: &XdgSurface) -> Option<ViewId> {
        let id = xdg_surface.id();
        self.toplevels
            .iter()
            .find(|t| t.xdg_surface.id() == id)
            .map(|t| t.view)
    }

    pub fn view_for_toplevel(&self, xdg_toplevel: &XdgToplevel) -> Option<ViewId> {
        let id = xdg_toplevel.id();
        self.toplevels
            .iter()
            .find(|t| t.xdg_toplevel.id() == id)
            .map(|t| t.view)
    }

    pub fn remove_toplevel(&mut self, view: ViewId) {
        self.toplevels.retain(|t| t.view != view);
        if self.keyboard_focus == Some(view) {
            self.keyboard_focus = None;
        }
    }

    fn configure(&mut self, view: ViewId) -> u32 {
        let serial = self.next_serial();
        if let Some(t) = self.toplevel(view) {
            t.xdg_toplevel.configure(t.size.0, t.size.1, t.states());
            t.xdg_surface.configure(serial);
        }
        serial
    }

    /// The first configure, sent as soon as the role is assigned.
    pub fn configure_initial(&mut self, view: ViewId) {
        self.configure(view);
    }

    fn focused_surface(&self) -> Option<WlSurface> {
        if let Some(surface) = &self.layer_focus {
            return Some(surface.clone());
        }
        self.keyboard_focus
            .and_then(|v| self.toplevel(v))
            .map(|t| t.wl_surface.clone())
    }

    fn keyboard_leave(&mut self) {
        let Some(old) = self.focused_surface() else {
            return;
        };
        let serial = self.next_serial();
        for keyboard in &self.keyboards {
            if keyboard.client() == old.client() {
                keyboard.leave(serial, &old);
            }
        }
    }

    fn keyboard_enter(&mut self) {
        let Some(new) = self.focused_surface() else {
            return;
        };
        let serial = self.next_serial();
        for keyboard in &self.keyboards {
            if keyboard.client() == new.client() {
                keyboard.enter(serial, &new, Vec::new());
            }
        }
        self.send_modifiers();
    }

    pub fn focus_layer(&mut self, surface: &WlSurface) {
        if self.layer_focus.as_ref().is_some_and(|s| s.id() == surface.id()) {
            return;
        }
        self.keyboard_leave();
        self.layer_focus = Some(surface.clone());
        self.keyboard_enter();
    }

    /// Hands the keyboard back to the focused view if `surface` held it.
    pub fn unfocus_layer(&mut self, surface: &WlSurface) {
        if !self.layer_focus.as_ref().is_some_and(|s| s.id() == surface.id()) {
            return;
        }
        if surface.is_alive() {
            self.keyboard_leave();
        }
        self.layer_focus = None;
        self.keyboard_enter();
    }

    pub fn send_key(&mut self, time: u32, key: u32, pressed: bool) {
        let Some(surface) = self.focused_surface() else {
            return;
        };
        let state = if pressed {
            wl_keyboard::KeyState::Pressed
        } else {
            wl_keyboard::KeyState::Released
        };
        let serial = self.next_serial();
        for keyboard in &self.keyboards {
            if keyboard.client() == surface.client() {
                keyboard.key(serial, time, key, state);
            }
        }
    }

    pub fn send_modifiers(&mut self) {
        let Some(surface) = self.focused_surface() else {
            return;
        };
        let m = self.modifiers;
        let serial = self.next_serial();
        for keyboard in &self.keyboards {
            if keyboard.client() == surface.client() {
                keyboard.modifiers(serial, m.depressed, m.latched, m.locked, m.group);
            }
        }
    }

    /// Sends enter to a keyboard bound after its client already had focus.
    pub fn enter_new_keyboard(&mut self, keyboard: &WlKeyboard) {
        let Some(surface) = self.focused_surface() else {
            return;
        };
        if keyboard.client() != surface.client() {
            return;
        }
        let serial = self.next_serial();
        keyboard.enter(serial, &surface, Vec::new());
        let m = self.modifiers;
        let serial = self.next_serial();
        keyboard.modifiers(serial, m.depressed, m.latched, m.locked, m.group);
    }
}

impl Observer for WaylandBackend {
    fn on_redraw_needed(&mut self) {
        self.needs_frame = true;
    }

    fn on_focus_changed(&mut self, view: Option<ViewId>, title: Option<&str>) {
        self.events.push(IpcEvent::FocusChanged {
            view,
            title: title.map(str::to_string),
        });
    }

    fn on_workspace_changed(&mut self, output: &str, workspace: usize) {
        self.events.push(IpcEvent::WorkspaceChanged {
            output: output.to_string(),
            workspace,
        });
    }

    fn on_chord_changed(&mut self, pending: &str) {
        self.events.push(IpcEvent::ChordProgress {
            pending: pending.to_string(),
        });
    }
}

impl Backend for WaylandBackend {
    fn request_resize(&mut self, view: ViewId, width: i32, height: i32) -> u32 {
        let Some(t) = self.toplevel_mut(view) else {
            log::warn!("[shell] Resize of view {} without a toplevel", view);
            return 0;
        };
        t.size = (width.max(0), height.max(0));
        log::debug!("[shell] Configure view {} to {}x{}", view, width, height);
        self.configure(view)
    }

    fn set_position(&mut self, view: ViewId, x: i32, y: i32) {
        if let Some(t) = self.toplevel_mut(view) {
            t.position = (x, y);
        }
    }

    fn set_visible(&mut self, view: ViewId, visible: bool) {
        if let Some(t) = self.toplevel_mut(view) {
            t.visible = visible;
        }
    }

    fn set_activated(&mut self, view: ViewId, activated: bool) {
        let changed = match self.toplevel_mut(view) {
            Some(t) if t.activated != activated => {
                t.activated = activated;
                true
            }
            _ => false,
        };
        if changed {
            self.configure(view);
        }
    }

    fn set_keyboard_focus(&mut self, view: Option<ViewId>) {
        if self.keyboard_focus == view {
            return;
        }
        if self.layer_focus.is_some() {
            self.keyboard_focus = view;
            return;
        }

        self.keyboard_leave();
        self.keyboard_focus = view;
        self.keyboard_enter();
    }

    fn raise(&mut self, view: ViewId) {
        if let Some(pos) = self.toplevels.iter().position(|t| t.view == view) {
            let t = self.toplevels.remove(pos);
            self.toplevels.push(t);
        }
    }

    fn close(&mut self, view: ViewId) {
        if let Some(t) = self.toplevel(view) {
            t.xdg_toplevel.close();
        }
    }

    fn spawn(&mut self, argv: &[String]) -> ktile::Result<()> {
        spawn_detached(argv).map_err(|e| ktile::Error::Spawn(e.to_string()))
    }

    fn can_switch_vt(&self) -> bool {
        self.session.is_some()
    }

    fn switch_vt(&mut self, vt: i32) -> bool {
        self.session.as_ref().is_some_and(|s| s.activate(vt))
    }

    fn quit(&mut self) {
        log::info!("[shell] Quit requested");
        self.running = false;
    }
}

/// Forks, starts a new session and execs `argv`. The child is reaped by the
/// SIGCHLD handler in the event loop.
fn spawn_detached(argv: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    use nix::sys::signal::{sigprocmask, SigSet, SigmaskHow};
    use nix::unistd::{execvp, fork, setsid, ForkResult};

    let args = argv
        .iter()
        .map(|a| CString::new(a.as_str()))
        .collect::<Result<Vec<_>, _>>()?;
    let program = args.first().ok_or("empty command")?;

    let forked = unsafe { fork() }?;
    match forked {
        ForkResult::Parent { child } => {
            log::info!("[shell] Spawned {:?} as pid {}", argv, child);
            session::register_child(child.as_raw());
            Ok(())
        }
        ForkResult::Child => {
            // The event loop blocks signals it handles; the child must not
            // inherit that mask.
            let _ = sigprocmask(SigmaskHow::SIG_SETMASK, Some(&SigSet::empty()), None);
            let _ = setsid();
            let _ = execvp(program, &args);
            unsafe { libc::_exit(127) }
        }
    }
}
