use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::os::fd::{FromRawFd, OwnedFd};

use ktile::{Config, GrabMode, MonitorId, Rectangle, Server, ViewId};
use ktile_common::{IpcRequest, IpcResponse};
use serde_json::Value;
use wayland_protocols_wlr::layer_shell::v1::server::zwlr_layer_surface_v1::{
    Anchor, KeyboardInteractivity, ZwlrLayerSurfaceV1,
};
use wayland_server::backend::{GlobalId, ObjectId};
use wayland_server::protocol::{
    wl_buffer::WlBuffer, wl_callback::WlCallback, wl_output::WlOutput, wl_pointer,
    wl_surface::WlSurface,
};
use wayland_server::{DisplayHandle, Resource};
use xkbcommon::xkb;

use crate::input::InputEvent;
use crate::session::Session;
use crate::shell::{KeymapFile, WaylandBackend};

pub type LayerSurfaceId = u64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Layer {
    Background = 0,
    Bottom = 1,
    #[default]
    Top = 2,
    Overlay = 3,
}

pub struct LayerSurface {
    pub id: LayerSurfaceId,
    pub wl_surface: WlSurface,
    pub layer_surface: ZwlrLayerSurfaceV1,
    pub monitor: Option<MonitorId>,
    pub layer: Layer,
    pub namespace: String,
    pub anchor: Anchor,
    pub exclusive_zone: i32,
    /// top, right, bottom, left
    pub margin: (i32, i32, i32, i32),
    pub keyboard_interactivity: KeyboardInteractivity,
    pub geometry: Rectangle,
    pub desired_width: u32,
    pub desired_height: u32,
    pub configured: bool,
    /// Set by requests that change the layout, answered on the next commit.
    pub needs_configure: bool,
    pub mapped: bool,
    pub pending_buffer: Option<WlBuffer>,
    pub pending_buffer_set: bool,
}

pub struct State {
    pub server: Server,
    pub backend: WaylandBackend,
    pub config: Config,
    pub keymap: Option<KeymapFile>,

    pub pending_xdg_surfaces: HashMap<ObjectId, WlSurface>,
    pub layer_surfaces: Vec<LayerSurface>,
    pub next_layer_surface_id: LayerSurfaceId,
    pub frame_callbacks: Vec<WlCallback>,
    pub output_globals: HashMap<MonitorId, GlobalId>,

    pub pointer_focus: Option<ViewId>,
    /// Keys whose press reached a client, so their release does too.
    pub forwarded_keys: HashSet<u32>,
}

impl State {
    pub fn new(config: Config, keymap: Option<&xkb::Keymap>, session: Option<Session>) -> Self {
        let mut server = Server::new();
        let bound = config.apply(&mut server);
        log::info!("[state] {} key binding(s) registered", bound);

        Self {
            server,
            backend: WaylandBackend::new(session),
            keymap: keymap.and_then(create_keymap_file),
            config,
            pending_xdg_surfaces: HashMap::new(),
            layer_surfaces: Vec::new(),
            next_layer_surface_id: 1,
            frame_callbacks: Vec::new(),
            output_globals: HashMap::new(),
            pointer_focus: None,
            forwarded_keys: HashSet::new(),
        }
    }

    pub fn attach_configured_outputs(&mut self, dh: &DisplayHandle) {
        for output in self.config.outputs.clone() {
            if self.server.monitor_by_name(&output.name).is_some() {
                log::warn!("[state] Duplicate output '{}' in config, skipping", output.name);
                continue;
            }
            self.server
                .monitor_attach(&mut self.backend, &output.name, output.geometry());
        }
        self.sync_outputs(dh);
        if let Some(area) = self.output_bounds() {
            self.server.pointer_motion(
                &mut self.backend,
                (area.x + area.width / 2) as f64,
                (area.y + area.height / 2) as f64,
            );
        }
    }

    /// Brings the `wl_output` globals in line with the model's monitors and
    /// recomputes every usable area.
    pub fn sync_outputs(&mut self, dh: &DisplayHandle) {
        let live: Vec<MonitorId> = self.server.monitors().iter().map(|m| m.id).collect();

        let gone: Vec<MonitorId> = self
            .output_globals
            .keys()
            .filter(|id| !live.contains(id))
            .copied()
            .collect();
        for id in gone {
            if let Some(global) = self.output_globals.remove(&id) {
                dh.remove_global::<State>(global);
                log::debug!("[output] Removed wl_output global for output {}", id);
            }
            for ls in self.layer_surfaces.iter_mut().filter(|ls| ls.monitor == Some(id)) {
                ls.layer_surface.closed();
                ls.monitor = None;
            }
        }

        for &id in &live {
            if !self.output_globals.contains_key(&id) {
                let global = dh.create_global::<State, WlOutput, MonitorId>(4, id);
                self.output_globals.insert(id, global);
                log::debug!("[output] Created wl_output global for output {}", id);
            }
            self.update_window_area(id);
        }
    }

    pub fn output_bounds(&self) -> Option<Rectangle> {
        let mut monitors = self.server.monitors().iter().filter(|m| m.enabled);
        let first = monitors.next()?.geometry;
        let (mut x1, mut y1) = (first.x, first.y);
        let (mut x2, mut y2) = (first.x + first.width, first.y + first.height);
        for m in monitors {
            let g = m.geometry;
            x1 = x1.min(g.x);
            y1 = y1.min(g.y);
            x2 = x2.max(g.x + g.width);
            y2 = y2.max(g.y + g.height);
        }
        Some(Rectangle::new(x1, y1, x2 - x1, y2 - y1))
    }

    pub fn layer_surface_mut(&mut self, surface: &WlSurface) -> Option<&mut LayerSurface> {
        let id = surface.id();
        self.layer_surfaces.iter_mut().find(|ls| ls.wl_surface.id() == id)
    }

    /// Output geometry minus the exclusive zones of panels anchored to it.
    pub fn update_window_area(&mut self, m: MonitorId) {
        let Some(geometry) = self.server.monitor(m).map(|mon| mon.geometry) else {
            return;
        };
        let mut area = geometry;
        for ls in self
            .layer_surfaces
            .iter()
            .filter(|ls| ls.monitor == Some(m) && ls.configured && ls.exclusive_zone > 0)
        {
            area = reserve_exclusive_zone(area, ls.anchor, ls.exclusive_zone, ls.margin);
        }
        self.server.monitor_set_window_area(&mut self.backend, m, area);
    }

    pub fn handle_input(&mut self, event: InputEvent) {
        match event {
            InputEvent::Key {
                key,
                pressed,
                keysym,
                modifiers,
                state,
            } => {
                if self.backend.modifiers != state {
                    self.backend.modifiers = state;
                    self.backend.send_modifiers();
                }
                if pressed {
                    if self.server.handle_key(&mut self.backend, keysym, modifiers) {
                        return;
                    }
                    self.forwarded_keys.insert(key);
                    self.backend.send_key(now_ms(), key, true);
                } else if self.forwarded_keys.remove(&key) {
                    self.backend.send_key(now_ms(), key, false);
                }
            }
            InputEvent::PointerMotion { dx, dy } => {
                let (x, y) = self.server.pointer_position();
                self.move_pointer(x + dx, y + dy);
            }
            InputEvent::PointerMotionAbsolute { x, y } => {
                if let Some(b) = self.output_bounds() {
                    self.move_pointer(
                        b.x as f64 + x * b.width as f64,
                        b.y as f64 + y * b.height as f64,
                    );
                }
            }
            InputEvent::PointerButton { button, pressed } => {
                if self.server.pointer_button(&mut self.backend, pressed) {
                    if !self.server.grab().is_active() {
                        let (x, y) = self.server.pointer_position();
                        self.update_pointer_focus(x, y);
                    }
                    return;
                }
                self.send_pointer_button(button, pressed);
            }
            InputEvent::PointerAxis {
                horizontal,
                vertical,
            } => self.send_pointer_axis(horizontal, vertical),
        }
    }

    fn move_pointer(&mut self, x: f64, y: f64) {
        let (x, y) = match self.output_bounds() {
            Some(b) => (
                x.clamp(b.x as f64, (b.x + b.width - 1) as f64),
                y.clamp(b.y as f64, (b.y + b.height - 1) as f64),
            ),
            None => (x, y),
        };
        if self.server.pointer_motion(&mut self.backend, x, y) {
            return;
        }
        self.update_pointer_focus(x, y);
    }

    fn surface_local(&self, view: ViewId, x: f64, y: f64) -> Option<(WlSurface, f64, f64)> {
        let g = self.server.view(view)?.geometry;
        let t = self.backend.toplevel(view)?;
        Some((t.wl_surface.clone(), x - g.x as f64, y - g.y as f64))
    }

    fn update_pointer_focus(&mut self, x: f64, y: f64) {
        let target = self.server.view_at(x, y);

        if target != self.pointer_focus {
            let serial = self.backend.next_serial();

            if let Some(old) = self.pointer_focus {
                self.send_pointer_leave(serial, old);
            }

            if let Some((new, sx, sy)) = target.and_then(|v| self.surface_local(v, x, y)) {
                for pointer in &self.backend.pointers {
                    if pointer.client() == new.client() {
                        pointer.enter(serial, &new, sx, sy);
                        if pointer.version() >= 5 {
                            pointer.frame();
                        }
                    }
                }
            }

            self.pointer_focus = target;
        } else if let Some((surface, sx, sy)) = target.and_then(|v| self.surface_local(v, x, y)) {
            let time = now_ms();
            for pointer in &self.backend.pointers {
                if pointer.client() == surface.client() {
                    pointer.motion(time, sx, sy);
                    if pointer.version() >= 5 {
                        pointer.frame();
                    }
                }
            }
        }
    }

    fn send_pointer_leave(&self, serial: u32, view: ViewId) {
        let Some(t) = self.backend.toplevel(view) else {
            return;
        };
        for pointer in &self.backend.pointers {
            if pointer.client() == t.wl_surface.client() {
                pointer.leave(serial, &t.wl_surface);
                if pointer.version() >= 5 {
                    pointer.frame();
                }
            }
        }
    }

    fn pointer_focus_surface(&self) -> Option<WlSurface> {
        let view = self.pointer_focus?;
        self.backend.toplevel(view).map(|t| t.wl_surface.clone())
    }

    fn send_pointer_button(&mut self, button: u32, pressed: bool) {
        let Some(surface) = self.pointer_focus_surface() else {
            return;
        };
        let state = if pressed {
            wl_pointer::ButtonState::Pressed
        } else {
            wl_pointer::ButtonState::Released
        };
        let serial = self.backend.next_serial();
        let time = now_ms();
        for pointer in &self.backend.pointers {
            if pointer.client() == surface.client() {
                pointer.button(serial, time, button, state);
                if pointer.version() >= 5 {
                    pointer.frame();
                }
            }
        }
    }

    fn send_pointer_axis(&mut self, horizontal: f64, vertical: f64) {
        let Some(surface) = self.pointer_focus_surface() else {
            return;
        };
        let time = now_ms();
        for pointer in &self.backend.pointers {
            if pointer.client() == surface.client() {
                if vertical.abs() > 0.0 {
                    pointer.axis(time, wl_pointer::Axis::VerticalScroll, vertical);
                }
                if horizontal.abs() > 0.0 {
                    pointer.axis(time, wl_pointer::Axis::HorizontalScroll, horizontal);
                }
                if pointer.version() >= 5 {
                    pointer.frame();
                }
            }
        }
    }

    /// Interactive move/resize asked for by the client itself. The client
    /// loses pointer focus while the grab runs, so the release that ends it
    /// is not owed to the client.
    pub fn begin_client_grab(&mut self, view: ViewId, mode: GrabMode) {
        self.server.begin_interactive(&mut self.backend, view, mode);
        if !self.server.grab().is_active() {
            return;
        }
        if let Some(focus) = self.pointer_focus.take() {
            let serial = self.backend.next_serial();
            self.send_pointer_leave(serial, focus);
        }
    }

    pub fn handle_request(&mut self, dh: &DisplayHandle, request: IpcRequest) -> IpcResponse {
        log::debug!("[ipc] Request: {:?}", request);
        let response = match request {
            IpcRequest::Set { path, value } => self
                .server
                .set_property(&mut self.backend, &path, &value)
                .map(|()| Value::Null),
            IpcRequest::Get { path } => self.server.get_property(&path),
            IpcRequest::DumpViews { output } => {
                self.server.views_info(output.as_deref()).and_then(|views| {
                    serde_json::to_value(views).map_err(|e| ktile::Error::Encode {
                        path: "views".to_string(),
                        reason: e.to_string(),
                    })
                })
            }
            IpcRequest::Exec { args } => self
                .server
                .execute_action(&mut self.backend, args.as_slice())
                .map(|()| Value::Null),
        };

        // Properties and actions can attach or detach outputs.
        self.sync_outputs(dh);

        match response {
            Ok(value) => IpcResponse::ok(value),
            Err(e) => {
                log::warn!("[ipc] Request failed: {}", e);
                IpcResponse::error(e.to_string())
            }
        }
    }

    pub fn send_frame_callbacks(&mut self) {
        if self.frame_callbacks.is_empty() {
            return;
        }
        let time = now_ms();
        for callback in self.frame_callbacks.drain(..) {
            callback.done(time);
        }
        self.backend.needs_frame = false;
    }

    pub fn destroy_view(&mut self, view: ViewId) {
        self.server.view_destroy(&mut self.backend, view);
        self.backend.remove_toplevel(view);
        if self.pointer_focus == Some(view) {
            self.pointer_focus = None;
        }
        log::info!("[state] View {} destroyed", view);
    }
}

/// Shrinks `area` on the edge the surface is anchored to. Surfaces anchored
/// to both opposite edges of an axis reserve nothing on that axis.
pub fn reserve_exclusive_zone(
    area: Rectangle,
    anchor: Anchor,
    zone: i32,
    margin: (i32, i32, i32, i32),
) -> Rectangle {
    let top = anchor.contains(Anchor::Top);
    let bottom = anchor.contains(Anchor::Bottom);
    let left = anchor.contains(Anchor::Left);
    let right = anchor.contains(Anchor::Right);

    let mut area = area;
    if top && !bottom {
        let amount = zone + margin.0;
        area.y += amount;
        area.height -= amount;
    } else if bottom && !top {
        area.height -= zone + margin.2;
    } else if left && !right {
        let amount = zone + margin.3;
        area.x += amount;
        area.width -= amount;
    } else if right && !left {
        area.width -= zone + margin.1;
    }
    area.width = area.width.max(0);
    area.height = area.height.max(0);
    area
}

fn create_keymap_file(keymap: &xkb::Keymap) -> Option<KeymapFile> {
    let keymap_string = keymap.get_as_string(xkb::KEYMAP_FORMAT_TEXT_V1);
    let keymap_bytes = keymap_string.as_bytes();
    let size = keymap_bytes.len() + 1;

    let name = std::ffi::CString::new("ktile-keymap").ok()?;
    let fd = unsafe { libc::memfd_create(name.as_ptr(), libc::MFD_CLOEXEC) };
    if fd < 0 {
        log::error!("Failed to create memfd for keymap");
        return None;
    }

    let mut file = unsafe { std::fs::File::from_raw_fd(fd) };
    if file.write_all(keymap_bytes).is_err() || file.write_all(&[0]).is_err() {
        log::error!("Failed to write keymap to memfd");
        return None;
    }

    log::debug!("Created keymap (size={})", size);

    Some(KeymapFile {
        fd: OwnedFd::from(file),
        size: size as u32,
    })
}

pub fn now_ms() -> u32 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u32)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headless_state() -> (State, ViewId) {
        let mut state = State::new(Config::default(), None, None);
        state
            .server
            .monitor_attach(&mut state.backend, "HEADLESS-1", Rectangle::new(0, 0, 1000, 800));
        let v = state.server.view_create("foot", "foot", 300, 200);
        state.server.view_map(&mut state.backend, v, false);
        (state, v)
    }

    #[test]
    fn client_grab_holds_pointer_focus_until_release() {
        let (mut state, v) = headless_state();
        state.handle_input(InputEvent::PointerMotionAbsolute { x: 0.5, y: 0.5 });
        assert_eq!(state.pointer_focus, Some(v));

        state.begin_client_grab(v, GrabMode::Move);
        assert!(state.server.grab().is_active());
        assert_eq!(state.pointer_focus, None);

        state.handle_input(InputEvent::PointerButton {
            button: 0x110,
            pressed: false,
        });
        assert!(!state.server.grab().is_active());
        assert_eq!(state.pointer_focus, Some(v));
    }

    #[test]
    fn top_panel_reserves_its_zone() {
        let area = Rectangle::new(0, 0, 1920, 1080);
        let anchor = Anchor::Top | Anchor::Left | Anchor::Right;
        assert_eq!(
            reserve_exclusive_zone(area, anchor, 30, (4, 0, 0, 0)),
            Rectangle::new(0, 34, 1920, 1046)
        );
    }

    #[test]
    fn side_panels_reserve_horizontally() {
        let area = Rectangle::new(100, 0, 800, 600);
        let left = Anchor::Left | Anchor::Top | Anchor::Bottom;
        assert_eq!(
            reserve_exclusive_zone(area, left, 50, (0, 0, 0, 0)),
            Rectangle::new(150, 0, 750, 600)
        );
        let right = Anchor::Right;
        assert_eq!(
            reserve_exclusive_zone(area, right, 50, (0, 10, 0, 0)),
            Rectangle::new(100, 0, 740, 600)
        );
    }

    #[test]
    fn centered_or_stretched_surfaces_reserve_nothing() {
        let area = Rectangle::new(0, 0, 800, 600);
        assert_eq!(reserve_exclusive_zone(area, Anchor::empty(), 40, (0, 0, 0, 0)), area);
        let all = Anchor::Top | Anchor::Bottom | Anchor::Left | Anchor::Right;
        assert_eq!(reserve_exclusive_zone(area, all, 40, (0, 0, 0, 0)), area);
    }

    #[test]
    fn zone_never_goes_negative() {
        let area = Rectangle::new(0, 0, 100, 100);
        let r = reserve_exclusive_zone(area, Anchor::Bottom, 500, (0, 0, 0, 0));
        assert_eq!(r.height, 0);
    }
}
