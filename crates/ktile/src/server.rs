use std::collections::HashMap;

use serde::Serialize;

use crate::backend::Backend;
use crate::chord::{ChordBinding, ChordMatcher};
use crate::error::{Error, Result};
use crate::interaction::Grab;
use crate::layout::{self, Rectangle, TilingMode, TilingParams};

pub type ViewId = u64;
pub type WorkspaceId = u64;
pub type MonitorId = u64;

/// Client-advertised size limits. Zero means unconstrained on that edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SizeHints {
    pub min_width: i32,
    pub min_height: i32,
    pub max_width: i32,
    pub max_height: i32,
}

impl SizeHints {
    /// Max is applied first so a conflicting min wins.
    pub fn clamp(&self, width: i32, height: i32) -> (i32, i32) {
        let mut w = width;
        let mut h = height;
        if self.max_width > 0 {
            w = w.min(self.max_width);
        }
        if self.max_height > 0 {
            h = h.min(self.max_height);
        }
        if self.min_width > 0 {
            w = w.max(self.min_width);
        }
        if self.min_height > 0 {
            h = h.max(self.min_height);
        }
        (w, h)
    }
}

#[derive(Debug, Clone)]
pub struct View {
    pub id: ViewId,
    pub app_id: String,
    pub title: String,
    pub natural_width: i32,
    pub natural_height: i32,
    pub hints: SizeHints,
    pub geometry: Rectangle,
    pub mapped: bool,
    pub floating: bool,
    pub visible: bool,
    pub focused: bool,
    pub monitor: Option<MonitorId>,
    pub workspace: Option<WorkspaceId>,
    pub pending_resize: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct Workspace {
    pub id: WorkspaceId,
    /// Layout order, head is the first master.
    pub tiling: Vec<ViewId>,
    /// Most recently focused first. Always holds the same views as `tiling`.
    pub focus: Vec<ViewId>,
    pub params: TilingParams,
}

impl Workspace {
    fn new(id: WorkspaceId, params: TilingParams) -> Self {
        Self {
            id,
            tiling: Vec::new(),
            focus: Vec::new(),
            params,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tiling.is_empty()
    }

    fn remove(&mut self, view: ViewId) {
        self.tiling.retain(|v| *v != view);
        self.focus.retain(|v| *v != view);
    }
}

#[derive(Debug, Clone)]
pub struct Monitor {
    pub id: MonitorId,
    pub name: String,
    pub enabled: bool,
    pub geometry: Rectangle,
    /// Geometry minus exclusive zones claimed by panels.
    pub window_area: Rectangle,
    pub workspaces: Vec<Workspace>,
    pub current: WorkspaceId,
    pub views: Vec<ViewId>,
}

impl Monitor {
    fn new(id: MonitorId, name: &str, geometry: Rectangle, spare: Workspace) -> Self {
        Self {
            id,
            name: name.to_string(),
            enabled: true,
            geometry,
            window_area: geometry,
            current: spare.id,
            workspaces: vec![spare],
            views: Vec::new(),
        }
    }

    pub fn workspace(&self, id: WorkspaceId) -> Option<&Workspace> {
        self.workspaces.iter().find(|ws| ws.id == id)
    }

    fn workspace_mut(&mut self, id: WorkspaceId) -> Option<&mut Workspace> {
        self.workspaces.iter_mut().find(|ws| ws.id == id)
    }

    pub fn workspace_index(&self, id: WorkspaceId) -> Option<usize> {
        self.workspaces.iter().position(|ws| ws.id == id)
    }

    pub fn current_index(&self) -> usize {
        self.workspace_index(self.current).unwrap_or(0)
    }

    pub fn current_workspace(&self) -> Option<&Workspace> {
        self.workspace(self.current)
    }

    pub fn is_spare(&self, id: WorkspaceId) -> bool {
        self.workspaces.last().map(|ws| ws.id) == Some(id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewInfo {
    pub id: ViewId,
    pub app_id: String,
    pub title: String,
    pub output: Option<String>,
    pub workspace: Option<usize>,
    pub geometry: Rectangle,
    pub focused: bool,
    pub floating: bool,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkspaceInfo {
    pub output: String,
    pub index: usize,
    pub views: usize,
    pub current: bool,
    pub spare: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorInfo {
    pub name: String,
    pub enabled: bool,
    pub active: bool,
    pub geometry: Rectangle,
    pub window_area: Rectangle,
    pub workspace: usize,
    pub workspaces: usize,
}

/// The window-management model: monitors own workspaces, workspaces order
/// views, and every entity is addressed by handle.
pub struct Server {
    pub(crate) monitors: Vec<Monitor>,
    pub(crate) views: HashMap<ViewId, View>,
    pub(crate) mru: Vec<ViewId>,
    pub(crate) active_monitor: Option<MonitorId>,
    pub(crate) focused: Option<ViewId>,
    pub(crate) bindings: Vec<ChordBinding>,
    pub(crate) chord: ChordMatcher,
    pub(crate) grab: Grab,
    pub(crate) pointer: (f64, f64),
    pub(crate) tiling_mode: TilingMode,
    pub(crate) gaps: i32,
    pub(crate) defaults: TilingParams,
    pub(crate) new_on_top: bool,
    next_id: u64,
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    pub fn new() -> Self {
        Self {
            monitors: Vec::new(),
            views: HashMap::new(),
            mru: Vec::new(),
            active_monitor: None,
            focused: None,
            bindings: Vec::new(),
            chord: ChordMatcher::new(),
            grab: Grab::Passthrough,
            pointer: (0.0, 0.0),
            tiling_mode: TilingMode::Traditional,
            gaps: 0,
            defaults: TilingParams::default(),
            new_on_top: false,
            next_id: 1,
        }
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn monitors(&self) -> &[Monitor] {
        &self.monitors
    }

    pub fn monitor(&self, id: MonitorId) -> Option<&Monitor> {
        self.monitors.iter().find(|m| m.id == id)
    }

    fn monitor_mut(&mut self, id: MonitorId) -> Option<&mut Monitor> {
        self.monitors.iter_mut().find(|m| m.id == id)
    }

    pub fn monitor_by_name(&self, name: &str) -> Option<&Monitor> {
        self.monitors.iter().find(|m| m.name == name)
    }

    pub fn view(&self, id: ViewId) -> Option<&View> {
        self.views.get(&id)
    }

    pub fn views(&self) -> impl Iterator<Item = &View> {
        self.views.values()
    }

    pub fn active_monitor(&self) -> Option<MonitorId> {
        self.active_monitor
    }

    pub fn focused_view(&self) -> Option<ViewId> {
        self.focused
    }

    pub fn mru(&self) -> &[ViewId] {
        &self.mru
    }

    pub fn tiling_mode(&self) -> TilingMode {
        self.tiling_mode
    }

    pub fn gaps(&self) -> i32 {
        self.gaps
    }

    pub fn new_on_top(&self) -> bool {
        self.new_on_top
    }

    pub fn set_new_on_top(&mut self, new_on_top: bool) {
        self.new_on_top = new_on_top;
    }

    /// Parameters handed to every workspace created from now on.
    pub fn set_default_params(&mut self, params: TilingParams) {
        self.defaults = params;
    }

    pub(crate) fn active_workspace(&self) -> Option<(MonitorId, WorkspaceId)> {
        let m = self.active_monitor?;
        Some((m, self.monitor(m)?.current))
    }

    pub(crate) fn workspace_mut(&mut self, m: MonitorId, ws: WorkspaceId) -> Option<&mut Workspace> {
        self.monitor_mut(m)?.workspace_mut(ws)
    }

    pub fn monitor_attach(
        &mut self,
        backend: &mut dyn Backend,
        name: &str,
        geometry: Rectangle,
    ) -> MonitorId {
        let id = self.alloc_id();
        let spare = Workspace::new(self.alloc_id(), self.defaults);
        self.monitors.push(Monitor::new(id, name, geometry, spare));
        log::info!(
            "[server] Attached output {} ({}x{}+{}+{})",
            name,
            geometry.width,
            geometry.height,
            geometry.x,
            geometry.y
        );

        if self.active_monitor.is_none() {
            self.active_monitor = Some(id);
        }

        self.adopt_orphans(backend, id);
        self.arrange(backend, id);
        self.notify_workspace(backend, id);
        id
    }

    fn adopt_orphans(&mut self, backend: &mut dyn Backend, m: MonitorId) {
        let mut orphans: Vec<ViewId> = self
            .views
            .values()
            .filter(|v| v.mapped && v.monitor.is_none())
            .map(|v| v.id)
            .collect();
        if orphans.is_empty() {
            return;
        }
        orphans.sort_unstable();

        let Some(ws) = self.monitor(m).map(|mon| mon.current) else {
            return;
        };
        log::info!("[server] Adopting {} orphaned view(s)", orphans.len());
        for v in orphans {
            self.attach_view(backend, v, m, ws, false, false);
        }

        if self.focused.is_none() && self.active_monitor == Some(m) {
            let head = self
                .monitor(m)
                .and_then(|mon| mon.workspace(ws))
                .and_then(|w| w.focus.first().copied());
            if let Some(head) = head {
                self.focus(backend, head);
            }
        }
    }

    pub fn monitor_detach(&mut self, backend: &mut dyn Backend, m: MonitorId) {
        let Some(index) = self.monitors.iter().position(|mon| mon.id == m) else {
            log::warn!("[server] Detach of unknown output {}", m);
            return;
        };

        let was_active = self.active_monitor == Some(m);
        let replacement = if was_active {
            self.monitors
                .iter()
                .find(|other| other.id != m && other.enabled)
                .map(|other| other.id)
        } else {
            self.active_monitor
        };

        // Dropping the monitor drops its workspaces, spare included.
        let monitor = self.monitors.remove(index);
        let moved: Vec<ViewId> = monitor
            .workspaces
            .iter()
            .flat_map(|ws| ws.tiling.iter().copied())
            .collect();
        for v in &moved {
            if let Some(view) = self.views.get_mut(v) {
                view.monitor = None;
                view.workspace = None;
            }
        }
        log::info!(
            "[server] Detached output {} with {} view(s)",
            monitor.name,
            moved.len()
        );

        match replacement {
            Some(r) => {
                let Some(ws) = self.monitor(r).map(|mon| mon.current) else {
                    return;
                };
                for v in moved {
                    self.attach_view(backend, v, r, ws, false, false);
                }
                self.active_monitor = Some(r);
                self.arrange(backend, r);

                let focus_lost = self
                    .focused
                    .and_then(|f| self.views.get(&f))
                    .map_or(true, |view| view.workspace != Some(ws));
                if focus_lost {
                    let head = self
                        .monitor(r)
                        .and_then(|mon| mon.workspace(ws))
                        .and_then(|w| w.focus.first().copied());
                    match head {
                        Some(head) => self.focus(backend, head),
                        None => self.clear_focus(backend),
                    }
                }
                if was_active {
                    self.notify_workspace(backend, r);
                }
            }
            None => {
                for v in &moved {
                    self.set_view_visible(backend, *v, false);
                }
                if self.grab.view().is_some_and(|g| moved.contains(&g)) {
                    self.grab = Grab::Passthrough;
                }
                if self.focused.is_some_and(|f| moved.contains(&f)) {
                    self.clear_focus(backend);
                }
                if was_active {
                    self.active_monitor = None;
                }
            }
        }
        backend.on_redraw_needed();
    }

    pub fn monitor_set_geometry(&mut self, backend: &mut dyn Backend, m: MonitorId, rect: Rectangle) {
        let Some(monitor) = self.monitor_mut(m) else {
            log::warn!("[server] Resize of unknown output {}", m);
            return;
        };
        if monitor.geometry == rect {
            return;
        }
        monitor.geometry = rect;
        monitor.window_area = rect;
        log::debug!(
            "[server] Output {} is now {}x{}+{}+{}",
            monitor.name,
            rect.width,
            rect.height,
            rect.x,
            rect.y
        );
        self.arrange(backend, m);
    }

    pub fn monitor_set_window_area(
        &mut self,
        backend: &mut dyn Backend,
        m: MonitorId,
        rect: Rectangle,
    ) {
        let Some(monitor) = self.monitor_mut(m) else {
            log::warn!("[server] Window area for unknown output {}", m);
            return;
        };
        if monitor.window_area == rect {
            return;
        }
        monitor.window_area = rect;
        self.arrange(backend, m);
    }

    /// A disabled output keeps its workspaces but hides them, and stops
    /// being a target for focus moves or migrated views. The last enabled
    /// output cannot be disabled.
    pub fn monitor_set_enabled(&mut self, backend: &mut dyn Backend, m: MonitorId, enabled: bool) {
        let replacement = self
            .monitors
            .iter()
            .find(|other| other.id != m && other.enabled)
            .map(|other| other.id);
        let Some(monitor) = self.monitor_mut(m) else {
            log::warn!("[server] Enable of unknown output {}", m);
            return;
        };
        if monitor.enabled == enabled {
            return;
        }
        if !enabled && replacement.is_none() {
            log::warn!("[server] Refusing to disable {}, the last enabled output", monitor.name);
            return;
        }
        monitor.enabled = enabled;
        log::info!(
            "[server] Output {} {}",
            monitor.name,
            if enabled { "enabled" } else { "disabled" }
        );
        let views = monitor
            .current_workspace()
            .map(|w| w.tiling.clone())
            .unwrap_or_default();

        for v in views {
            self.set_view_visible(backend, v, enabled);
        }
        if enabled {
            self.arrange(backend, m);
            if self.active_monitor.is_none() {
                self.active_monitor = Some(m);
                self.notify_workspace(backend, m);
            }
        } else if let Some(r) = replacement.filter(|_| self.active_monitor == Some(m)) {
            self.active_monitor = Some(r);
            let head = self
                .monitor(r)
                .and_then(|mon| mon.current_workspace())
                .and_then(|w| w.focus.first().copied());
            match head {
                Some(head) => self.focus(backend, head),
                None => self.clear_focus(backend),
            }
            self.notify_workspace(backend, r);
        }
        backend.on_redraw_needed();
    }

    pub fn view_create(&mut self, app_id: &str, title: &str, width: i32, height: i32) -> ViewId {
        let id = self.alloc_id();
        self.views.insert(
            id,
            View {
                id,
                app_id: app_id.to_string(),
                title: title.to_string(),
                natural_width: width,
                natural_height: height,
                hints: SizeHints::default(),
                geometry: Rectangle::new(0, 0, width, height),
                mapped: false,
                floating: false,
                visible: false,
                focused: false,
                monitor: None,
                workspace: None,
                pending_resize: None,
            },
        );
        log::debug!("[view] Created view {} ({})", id, app_id);
        id
    }

    pub fn view_map(&mut self, backend: &mut dyn Backend, v: ViewId, to_front: bool) {
        let Some(view) = self.views.get_mut(&v) else {
            log::warn!("[view] Map of unknown view {}", v);
            return;
        };
        if view.mapped {
            return;
        }
        view.mapped = true;
        let natural = (view.natural_width, view.natural_height);

        let Some((m, ws)) = self.active_workspace() else {
            log::debug!("[view] No active output, view {} waits for one", v);
            return;
        };

        if self.tiling_mode == TilingMode::None {
            if let Some(area) = self.monitor(m).map(|mon| mon.window_area) {
                self.apply_geometry(backend, v, area.centered(natural.0, natural.1));
            }
        }

        self.attach_view(backend, v, m, ws, to_front, true);
        log::debug!("[view] Mapped view {}", v);
        self.arrange(backend, m);
        self.focus(backend, v);
        backend.on_redraw_needed();
    }

    pub fn view_unmap(&mut self, backend: &mut dyn Backend, v: ViewId) {
        let Some(view) = self.views.get_mut(&v) else {
            log::warn!("[view] Unmap of unknown view {}", v);
            return;
        };
        if !view.mapped {
            return;
        }
        view.mapped = false;
        view.visible = false;
        view.focused = false;

        if self.grab.view() == Some(v) {
            log::debug!("[view] View {} unmapped mid-grab", v);
            self.grab = Grab::Passthrough;
        }

        backend.set_visible(v, false);
        self.mru.retain(|other| *other != v);

        let was_focused = self.focused == Some(v);
        let location = self.detach_view(v);

        if was_focused {
            self.focused = None;
            let next = location.and_then(|(m, ws)| {
                let monitor = self.monitor(m)?;
                if monitor.current != ws {
                    return None;
                }
                monitor.workspace(ws)?.focus.first().copied()
            });
            match next {
                Some(next) => self.focus(backend, next),
                None => self.clear_focus(backend),
            }
        }

        if let Some((m, _)) = location {
            self.arrange(backend, m);
        }
        self.gc(backend);
        log::debug!("[view] Unmapped view {}", v);
        backend.on_redraw_needed();
    }

    pub fn view_destroy(&mut self, backend: &mut dyn Backend, v: ViewId) {
        self.view_unmap(backend, v);
        if self.views.remove(&v).is_some() {
            log::debug!("[view] Destroyed view {}", v);
        }
    }

    pub fn view_set_title(&mut self, backend: &mut dyn Backend, v: ViewId, title: &str) {
        let Some(view) = self.views.get_mut(&v) else {
            return;
        };
        view.title = title.to_string();
        if self.focused == Some(v) {
            backend.on_focus_changed(Some(v), Some(title));
        }
    }

    pub fn view_set_app_id(&mut self, v: ViewId, app_id: &str) {
        if let Some(view) = self.views.get_mut(&v) {
            view.app_id = app_id.to_string();
        }
    }

    pub fn view_set_size_hints(
        &mut self,
        backend: &mut dyn Backend,
        v: ViewId,
        min: (i32, i32),
        max: (i32, i32),
    ) {
        let Some(view) = self.views.get_mut(&v) else {
            return;
        };
        let hints = SizeHints {
            min_width: min.0.max(0),
            min_height: min.1.max(0),
            max_width: max.0.max(0),
            max_height: max.1.max(0),
        };
        if view.hints == hints {
            return;
        }
        view.hints = hints;
        if let (true, Some(m)) = (view.mapped, view.monitor) {
            self.arrange(backend, m);
        }
    }

    /// Clears the in-flight resize once the client acknowledges `token` or
    /// anything newer.
    pub fn view_ack_configure(&mut self, v: ViewId, token: u32) {
        let Some(view) = self.views.get_mut(&v) else {
            return;
        };
        if let Some(pending) = view.pending_resize {
            if token.wrapping_sub(pending) < u32::MAX / 2 {
                view.pending_resize = None;
            }
        }
    }

    /// Recorded by clients that resize themselves, e.g. a floating view
    /// committing a new buffer size.
    pub fn view_set_size(&mut self, v: ViewId, width: i32, height: i32) {
        if let Some(view) = self.views.get_mut(&v) {
            view.geometry.width = width;
            view.geometry.height = height;
        }
    }

    /// The size the client asked for on its own. Used when the view is
    /// placed without tiling.
    pub fn view_set_natural_size(&mut self, v: ViewId, width: i32, height: i32) {
        if let Some(view) = self.views.get_mut(&v) {
            view.natural_width = width.max(0);
            view.natural_height = height.max(0);
        }
    }

    pub fn focus(&mut self, backend: &mut dyn Backend, v: ViewId) {
        if self.focused == Some(v) {
            return;
        }
        let Some(view) = self.views.get(&v) else {
            log::warn!("[focus] Focus of unknown view {}", v);
            return;
        };
        let (true, Some(m), Some(ws)) = (view.mapped, view.monitor, view.workspace) else {
            log::debug!("[focus] View {} is not placed, ignoring focus", v);
            return;
        };
        let title = view.title.clone();

        if let Some(previous) = self.focused.take() {
            if let Some(prev) = self.views.get_mut(&previous) {
                prev.focused = false;
            }
            backend.set_activated(previous, false);
        }

        self.mru.retain(|other| *other != v);
        self.mru.insert(0, v);
        if let Some(workspace) = self.workspace_mut(m, ws) {
            move_to_front(&mut workspace.focus, v);
        }

        backend.raise(v);
        if let Some(view) = self.views.get_mut(&v) {
            view.focused = true;
        }
        self.focused = Some(v);
        backend.set_activated(v, true);
        backend.set_keyboard_focus(Some(v));

        if self.monitor(m).map(|mon| mon.current) != Some(ws) {
            self.switch_workspace(backend, m, ws);
        }
        if self.active_monitor != Some(m) {
            self.active_monitor = Some(m);
            self.notify_workspace(backend, m);
        }

        log::debug!("[focus] Focused view {}", v);
        backend.on_focus_changed(Some(v), Some(&title));
    }

    pub(crate) fn clear_focus(&mut self, backend: &mut dyn Backend) {
        if let Some(previous) = self.focused.take() {
            if let Some(prev) = self.views.get_mut(&previous) {
                prev.focused = false;
            }
            backend.set_activated(previous, false);
        }
        backend.set_keyboard_focus(None);
        backend.on_focus_changed(None, None);
    }

    pub fn switch_workspace(&mut self, backend: &mut dyn Backend, m: MonitorId, ws: WorkspaceId) {
        let Some(monitor) = self.monitor(m) else {
            log::warn!("[workspace] Switch on unknown output {}", m);
            return;
        };
        if monitor.current == ws {
            if self.active_monitor != Some(m) {
                self.active_monitor = Some(m);
                self.notify_workspace(backend, m);
            }
            return;
        }
        let Some(target) = monitor.workspace(ws) else {
            log::warn!("[workspace] Output {} has no workspace {}", monitor.name, ws);
            return;
        };
        let show = target.tiling.clone();
        let head = target.focus.first().copied();
        let hide = monitor
            .current_workspace()
            .map(|w| w.tiling.clone())
            .unwrap_or_default();

        for v in hide {
            self.set_view_visible(backend, v, false);
        }
        for v in show {
            self.set_view_visible(backend, v, true);
        }

        if let Some(monitor) = self.monitor_mut(m) {
            monitor.current = ws;
        }
        self.active_monitor = Some(m);
        self.gc(backend);
        self.arrange(backend, m);

        match head {
            Some(head) => self.focus(backend, head),
            None => self.clear_focus(backend),
        }

        if let Some(monitor) = self.monitor(m) {
            log::info!(
                "[workspace] Switched {} to workspace {}",
                monitor.name,
                monitor.current_index() + 1
            );
        }
        self.notify_workspace(backend, m);
        backend.on_redraw_needed();
    }

    pub fn view_move_to_workspace(
        &mut self,
        backend: &mut dyn Backend,
        v: ViewId,
        m: MonitorId,
        ws: WorkspaceId,
    ) {
        let Some(view) = self.views.get(&v) else {
            log::warn!("[workspace] Move of unknown view {}", v);
            return;
        };
        if !view.mapped || (view.monitor, view.workspace) == (Some(m), Some(ws)) {
            return;
        }
        let Some(target_current) = self
            .monitor(m)
            .filter(|mon| mon.workspace(ws).is_some())
            .map(|mon| mon.current == ws)
        else {
            log::warn!("[workspace] No workspace {} on output {}", ws, m);
            return;
        };

        let was_focused = self.focused == Some(v);
        let from = self.detach_view(v);
        self.attach_view(backend, v, m, ws, false, true);

        if was_focused {
            if target_current {
                if self.active_monitor != Some(m) {
                    self.active_monitor = Some(m);
                    self.notify_workspace(backend, m);
                }
            } else {
                let next = from.and_then(|(sm, sws)| {
                    self.monitor(sm)?.workspace(sws)?.focus.first().copied()
                });
                match next {
                    Some(next) => self.focus(backend, next),
                    None => self.clear_focus(backend),
                }
            }
        }

        if let Some((sm, _)) = from {
            self.arrange(backend, sm);
        }
        if from.map(|(sm, _)| sm) != Some(m) {
            self.arrange(backend, m);
        }
        self.gc(backend);
        log::debug!("[workspace] Moved view {} to workspace {}", v, ws);
        backend.on_redraw_needed();
    }

    /// Places `v` in `ws` of `m`, promoting the spare if it was used.
    fn attach_view(
        &mut self,
        backend: &mut dyn Backend,
        v: ViewId,
        m: MonitorId,
        ws: WorkspaceId,
        tiling_front: bool,
        focus_front: bool,
    ) {
        let Some(promote) = self.monitor(m).map(|mon| mon.is_spare(ws)) else {
            return;
        };
        let spare = promote.then(|| Workspace::new(self.alloc_id(), self.defaults));
        let Some(monitor) = self.monitor_mut(m) else {
            return;
        };
        let visible = monitor.current == ws;
        let Some(workspace) = monitor.workspace_mut(ws) else {
            return;
        };

        if tiling_front {
            workspace.tiling.insert(0, v);
        } else {
            workspace.tiling.push(v);
        }
        if focus_front {
            workspace.focus.insert(0, v);
        } else {
            workspace.focus.push(v);
        }
        monitor.views.push(v);
        if let Some(spare) = spare {
            monitor.workspaces.push(spare);
        }

        if let Some(view) = self.views.get_mut(&v) {
            view.monitor = Some(m);
            view.workspace = Some(ws);
        }
        self.set_view_visible(backend, v, visible);
    }

    /// Removes `v` from its workspace and monitor, returning where it was.
    fn detach_view(&mut self, v: ViewId) -> Option<(MonitorId, WorkspaceId)> {
        let view = self.views.get_mut(&v)?;
        let m = view.monitor.take()?;
        let ws = view.workspace.take()?;
        if let Some(monitor) = self.monitor_mut(m) {
            monitor.views.retain(|other| *other != v);
            if let Some(workspace) = monitor.workspace_mut(ws) {
                workspace.remove(v);
            }
        }
        Some((m, ws))
    }

    pub(crate) fn set_view_visible(&mut self, backend: &mut dyn Backend, v: ViewId, visible: bool) {
        if let Some(view) = self.views.get_mut(&v) {
            view.visible = visible;
            backend.set_visible(v, visible);
        }
    }

    /// Drops empty workspaces that are neither current nor the spare. An
    /// emptied current workspace hands over to the spare first, so each
    /// monitor ends up with a single empty workspace at the tail.
    pub(crate) fn gc(&mut self, backend: &mut dyn Backend) {
        let mut changed = Vec::new();
        for monitor in &mut self.monitors {
            let current_empty = monitor
                .current_workspace()
                .is_some_and(|ws| ws.is_empty());
            if current_empty && !monitor.is_spare(monitor.current) {
                if let Some(spare) = monitor.workspaces.last() {
                    monitor.current = spare.id;
                    changed.push(monitor.id);
                }
            }

            let before = monitor.workspaces.len();
            let last = before.saturating_sub(1);
            let current = monitor.current;
            let mut index = 0;
            monitor.workspaces.retain(|ws| {
                let keep = index == last || ws.id == current || !ws.is_empty();
                index += 1;
                keep
            });
            if monitor.workspaces.len() != before {
                log::debug!(
                    "[workspace] Collected {} empty workspace(s) on {}",
                    before - monitor.workspaces.len(),
                    monitor.name
                );
                if !changed.contains(&monitor.id) {
                    changed.push(monitor.id);
                }
            }
        }
        for m in changed {
            self.notify_workspace(backend, m);
        }
    }

    /// Re-tiles the current workspace of `m`.
    pub fn arrange(&mut self, backend: &mut dyn Backend, m: MonitorId) {
        if self.tiling_mode == TilingMode::None {
            return;
        }
        let Some(monitor) = self.monitor(m) else {
            return;
        };
        let Some(workspace) = monitor.current_workspace() else {
            return;
        };
        let order: Vec<ViewId> = workspace
            .tiling
            .iter()
            .copied()
            .filter(|v| {
                self.views
                    .get(v)
                    .is_some_and(|view| view.mapped && !view.floating)
            })
            .collect();
        let boxes = layout::tile(&order, &workspace.params, monitor.window_area, self.gaps);

        for (v, rect) in boxes {
            self.apply_geometry(backend, v, rect);
        }
        backend.on_redraw_needed();
    }

    pub fn arrange_all(&mut self, backend: &mut dyn Backend) {
        let ids: Vec<MonitorId> = self.monitors.iter().map(|m| m.id).collect();
        for m in ids {
            self.arrange(backend, m);
        }
    }

    /// Clamps to the view's hints and hands the result to the backend. A
    /// resize is only requested when the size actually changes.
    pub(crate) fn apply_geometry(&mut self, backend: &mut dyn Backend, v: ViewId, rect: Rectangle) {
        let Some(view) = self.views.get_mut(&v) else {
            return;
        };
        let (width, height) = view.hints.clamp(rect.width, rect.height);
        let resized = width != view.geometry.width || height != view.geometry.height;
        view.geometry = Rectangle::new(rect.x, rect.y, width, height);

        backend.set_position(v, rect.x, rect.y);
        if resized {
            view.pending_resize = Some(backend.request_resize(v, width, height));
        }
    }

    /// Topmost visible view under the point. Recently focused views stack
    /// above the rest.
    pub fn view_at(&self, x: f64, y: f64) -> Option<ViewId> {
        let hit = |v: &ViewId| {
            self.views
                .get(v)
                .is_some_and(|view| view.visible && view.geometry.contains(x, y))
        };
        if let Some(v) = self.mru.iter().find(|v| hit(*v)) {
            return Some(*v);
        }
        let mut rest: Vec<ViewId> = self
            .views
            .keys()
            .copied()
            .filter(|v| !self.mru.contains(v) && hit(v))
            .collect();
        rest.sort_unstable();
        rest.last().copied()
    }

    pub(crate) fn notify_workspace(&self, backend: &mut dyn Backend, m: MonitorId) {
        if let Some(monitor) = self.monitor(m) {
            backend.on_workspace_changed(&monitor.name, monitor.current_index() + 1);
        }
    }

    pub fn workspaces_info(&self) -> Vec<WorkspaceInfo> {
        self.monitors
            .iter()
            .flat_map(|monitor| {
                let last = monitor.workspaces.len().saturating_sub(1);
                monitor
                    .workspaces
                    .iter()
                    .enumerate()
                    .map(move |(i, ws)| WorkspaceInfo {
                        output: monitor.name.clone(),
                        index: i + 1,
                        views: ws.tiling.len(),
                        current: ws.id == monitor.current,
                        spare: i == last,
                    })
            })
            .collect()
    }

    pub fn monitor_info(&self, monitor: &Monitor) -> MonitorInfo {
        MonitorInfo {
            name: monitor.name.clone(),
            enabled: monitor.enabled,
            active: self.active_monitor == Some(monitor.id),
            geometry: monitor.geometry,
            window_area: monitor.window_area,
            workspace: monitor.current_index() + 1,
            workspaces: monitor.workspaces.len(),
        }
    }

    /// Every view, optionally restricted to one output, in creation order.
    pub fn views_info(&self, output: Option<&str>) -> Result<Vec<ViewInfo>> {
        let only = match output {
            Some(name) => Some(
                self.monitor_by_name(name)
                    .ok_or_else(|| Error::UnknownOutput(name.to_string()))?
                    .id,
            ),
            None => None,
        };

        let mut views: Vec<&View> = self
            .views
            .values()
            .filter(|v| only.is_none() || v.monitor == only)
            .collect();
        views.sort_unstable_by_key(|v| v.id);

        Ok(views
            .into_iter()
            .map(|view| {
                let monitor = view.monitor.and_then(|m| self.monitor(m));
                ViewInfo {
                    id: view.id,
                    app_id: view.app_id.clone(),
                    title: view.title.clone(),
                    output: monitor.map(|mon| mon.name.clone()),
                    workspace: monitor
                        .zip(view.workspace)
                        .and_then(|(mon, ws)| mon.workspace_index(ws))
                        .map(|i| i + 1),
                    geometry: view.geometry,
                    focused: view.focused,
                    floating: view.floating,
                    visible: view.visible,
                }
            })
            .collect())
    }
}

fn move_to_front(list: &mut Vec<ViewId>, v: ViewId) {
    list.retain(|other| *other != v);
    list.insert(0, v);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::{Call, RecordingBackend};

    fn setup() -> (Server, RecordingBackend, MonitorId) {
        let mut server = Server::new();
        let mut backend = RecordingBackend::new();
        let m = server.monitor_attach(&mut backend, "A", Rectangle::new(0, 0, 1000, 800));
        (server, backend, m)
    }

    fn map_new(server: &mut Server, backend: &mut RecordingBackend, app: &str) -> ViewId {
        let v = server.view_create(app, app, 300, 200);
        server.view_map(backend, v, false);
        v
    }

    fn current(server: &Server, m: MonitorId) -> &Workspace {
        server.monitor(m).unwrap().current_workspace().unwrap()
    }

    fn assert_single_trailing_spare(server: &Server) {
        for monitor in server.monitors() {
            let empty: Vec<usize> = monitor
                .workspaces
                .iter()
                .enumerate()
                .filter(|(_, ws)| ws.is_empty())
                .map(|(i, _)| i)
                .collect();
            assert_eq!(empty, vec![monitor.workspaces.len() - 1], "{}", monitor.name);
            for ws in &monitor.workspaces {
                let mut tiling = ws.tiling.clone();
                let mut focus = ws.focus.clone();
                tiling.sort_unstable();
                focus.sort_unstable();
                assert_eq!(tiling, focus);
            }
        }
    }

    #[test]
    fn attach_creates_active_monitor_with_spare() {
        let (server, _, m) = setup();
        assert_eq!(server.active_monitor(), Some(m));
        let monitor = server.monitor(m).unwrap();
        assert_eq!(monitor.workspaces.len(), 1);
        assert!(monitor.is_spare(monitor.current));
    }

    #[test]
    fn second_monitor_does_not_steal_active() {
        let (mut server, mut backend, m) = setup();
        server.monitor_attach(&mut backend, "B", Rectangle::new(1000, 0, 800, 600));
        assert_eq!(server.active_monitor(), Some(m));
    }

    #[test]
    fn mapping_promotes_spare_and_focuses() {
        let (mut server, mut backend, m) = setup();
        let v = map_new(&mut server, &mut backend, "foot");

        let monitor = server.monitor(m).unwrap();
        assert_eq!(monitor.workspaces.len(), 2);
        assert_eq!(monitor.workspaces[0].tiling, vec![v]);
        assert_eq!(server.focused_view(), Some(v));
        assert_eq!(server.mru(), &[v]);
        assert_eq!(backend.last_keyboard_focus(), Some(Some(v)));
        assert_eq!(backend.last_resize(v), Some((1000, 800)));
        assert_single_trailing_spare(&server);
    }

    #[test]
    fn map_to_front_or_back() {
        let (mut server, mut backend, m) = setup();
        let a = map_new(&mut server, &mut backend, "a");
        let b = server.view_create("b", "b", 10, 10);
        server.view_map(&mut backend, b, true);
        let c = map_new(&mut server, &mut backend, "c");

        assert_eq!(current(&server, m).tiling, vec![b, a, c]);
        assert_eq!(current(&server, m).focus, vec![c, b, a]);
    }

    #[test]
    fn map_without_monitor_waits_for_one() {
        let mut server = Server::new();
        let mut backend = RecordingBackend::new();
        let v = server.view_create("foot", "foot", 300, 200);
        server.view_map(&mut backend, v, false);
        assert!(server.view(v).unwrap().monitor.is_none());
        assert_eq!(server.focused_view(), None);

        let m = server.monitor_attach(&mut backend, "A", Rectangle::new(0, 0, 640, 480));
        assert_eq!(server.view(v).unwrap().monitor, Some(m));
        assert_eq!(server.focused_view(), Some(v));
    }

    #[test]
    fn none_mode_centers_at_natural_size() {
        let (mut server, mut backend, _) = setup();
        server.tiling_mode = TilingMode::None;
        let v = map_new(&mut server, &mut backend, "foot");
        assert_eq!(
            server.view(v).unwrap().geometry,
            Rectangle::new(350, 300, 300, 200)
        );
    }

    #[test]
    fn unmap_refocuses_next_and_retiles() {
        let (mut server, mut backend, m) = setup();
        let a = map_new(&mut server, &mut backend, "a");
        let b = map_new(&mut server, &mut backend, "b");
        assert_eq!(server.focused_view(), Some(b));

        server.view_unmap(&mut backend, b);
        assert_eq!(server.focused_view(), Some(a));
        assert_eq!(current(&server, m).tiling, vec![a]);
        assert_eq!(backend.last_resize(a), Some((1000, 800)));
        assert_eq!(backend.last_visible(b), Some(false));
    }

    #[test]
    fn unmapping_last_view_collapses_to_spare() {
        let (mut server, mut backend, m) = setup();
        let v = map_new(&mut server, &mut backend, "a");
        server.view_unmap(&mut backend, v);

        assert_eq!(server.focused_view(), None);
        assert_eq!(backend.last_keyboard_focus(), Some(None));
        assert_eq!(server.monitor(m).unwrap().workspaces.len(), 1);
        assert_single_trailing_spare(&server);
    }

    #[test]
    fn unmap_clears_grab() {
        let (mut server, mut backend, _) = setup();
        let v = map_new(&mut server, &mut backend, "a");
        server.grab = Grab::Move {
            view: v,
            offset: (0.0, 0.0),
        };
        server.view_unmap(&mut backend, v);
        assert_eq!(server.grab, Grab::Passthrough);
    }

    #[test]
    fn remap_after_unmap() {
        let (mut server, mut backend, m) = setup();
        let v = map_new(&mut server, &mut backend, "a");
        server.view_unmap(&mut backend, v);
        server.view_map(&mut backend, v, false);
        assert_eq!(current(&server, m).tiling, vec![v]);
        assert_eq!(server.focused_view(), Some(v));
    }

    #[test]
    fn destroy_removes_view() {
        let (mut server, mut backend, _) = setup();
        let v = map_new(&mut server, &mut backend, "a");
        server.view_destroy(&mut backend, v);
        assert!(server.view(v).is_none());
        assert!(server.mru().is_empty());
    }

    #[test]
    fn focus_moves_mru_and_signals_previous() {
        let (mut server, mut backend, m) = setup();
        let a = map_new(&mut server, &mut backend, "a");
        let b = map_new(&mut server, &mut backend, "b");
        backend.clear();

        server.focus(&mut backend, a);
        assert_eq!(server.mru(), &[a, b]);
        assert_eq!(current(&server, m).focus, vec![a, b]);
        assert_eq!(
            backend.calls,
            vec![
                Call::Activated(b, false),
                Call::Raise(a),
                Call::Activated(a, true),
                Call::KeyboardFocus(Some(a)),
            ]
        );
        assert_eq!(backend.focus_events, vec![Some(a)]);

        backend.clear();
        server.focus(&mut backend, a);
        assert!(backend.calls.is_empty());
    }

    #[test]
    fn leaving_and_returning_keeps_tiling_order() {
        let (mut server, mut backend, m) = setup();
        let a = map_new(&mut server, &mut backend, "a");
        let b = map_new(&mut server, &mut backend, "b");
        let first = server.monitor(m).unwrap().current;
        let before = current(&server, m).tiling.clone();

        let spare = server.monitor(m).unwrap().workspaces[1].id;
        server.switch_workspace(&mut backend, m, spare);
        assert_eq!(server.focused_view(), None);
        assert_eq!(backend.last_visible(a), Some(false));
        assert_eq!(backend.last_visible(b), Some(false));

        server.switch_workspace(&mut backend, m, first);
        assert_eq!(current(&server, m).tiling, before);
        assert_eq!(server.focused_view(), Some(b));
        assert_eq!(backend.last_visible(a), Some(true));
        assert_single_trailing_spare(&server);
    }

    #[test]
    fn focusing_hidden_view_switches_workspace() {
        let (mut server, mut backend, m) = setup();
        let a = map_new(&mut server, &mut backend, "a");
        let first = server.monitor(m).unwrap().current;
        let spare = server.monitor(m).unwrap().workspaces[1].id;
        server.switch_workspace(&mut backend, m, spare);
        let b = map_new(&mut server, &mut backend, "b");
        assert_ne!(server.view(b).unwrap().workspace, Some(first));

        server.focus(&mut backend, a);
        assert_eq!(server.monitor(m).unwrap().current, first);
        assert!(server.view(a).unwrap().visible);
        assert!(!server.view(b).unwrap().visible);
    }

    #[test]
    fn moving_views_keeps_single_spare() {
        let (mut server, mut backend, m) = setup();
        let a = map_new(&mut server, &mut backend, "a");
        let b = map_new(&mut server, &mut backend, "b");
        let spare = server.monitor(m).unwrap().workspaces[1].id;

        server.view_move_to_workspace(&mut backend, b, m, spare);
        assert_eq!(server.monitor(m).unwrap().workspaces.len(), 3);
        assert!(!server.view(b).unwrap().visible);
        assert_eq!(server.focused_view(), Some(a));
        assert_single_trailing_spare(&server);

        server.view_move_to_workspace(&mut backend, a, m, spare);
        // The emptied current workspace gives way to the spare.
        assert_single_trailing_spare(&server);
        assert_eq!(server.monitor(m).unwrap().workspaces.len(), 2);

        server.view_unmap(&mut backend, a);
        server.view_unmap(&mut backend, b);
        assert_eq!(server.monitor(m).unwrap().workspaces.len(), 1);
        assert_single_trailing_spare(&server);
    }

    #[test]
    fn detach_migrates_views_in_order() {
        let (mut server, mut backend, a) = setup();
        let b = server.monitor_attach(&mut backend, "B", Rectangle::new(1000, 0, 800, 600));
        let v1 = map_new(&mut server, &mut backend, "v1");
        let v2 = map_new(&mut server, &mut backend, "v2");
        let v3 = map_new(&mut server, &mut backend, "v3");
        assert_eq!(current(&server, a).tiling, vec![v1, v2, v3]);

        server.monitor_detach(&mut backend, a);

        assert!(server.monitor(a).is_none());
        assert_eq!(server.active_monitor(), Some(b));
        let ws = current(&server, b);
        assert_eq!(ws.tiling, vec![v1, v2, v3]);
        assert_eq!(ws.focus, vec![v1, v2, v3]);
        for v in [v1, v2, v3] {
            assert_eq!(server.view(v).unwrap().monitor, Some(b));
            assert!(server.view(v).unwrap().visible);
        }
        assert_eq!(server.focused_view(), Some(v3));
        assert_eq!(backend.last_resize(v1).map(|(w, _)| w), Some(440));
        assert_single_trailing_spare(&server);
    }

    #[test]
    fn detach_appends_after_existing_views() {
        let (mut server, mut backend, a) = setup();
        let b = server.monitor_attach(&mut backend, "B", Rectangle::new(1000, 0, 800, 600));
        let v1 = map_new(&mut server, &mut backend, "v1");
        let v2 = map_new(&mut server, &mut backend, "v2");
        let target = server.monitor(b).unwrap().current;
        server.view_move_to_workspace(&mut backend, v1, b, target);

        server.monitor_detach(&mut backend, a);
        assert_eq!(current(&server, b).tiling, vec![v1, v2]);
        assert_single_trailing_spare(&server);
    }

    #[test]
    fn detach_without_replacement_orphans_views() {
        let (mut server, mut backend, a) = setup();
        let v = map_new(&mut server, &mut backend, "v");

        server.monitor_detach(&mut backend, a);
        let view = server.view(v).unwrap();
        assert!(view.monitor.is_none() && view.workspace.is_none());
        assert!(!view.visible);
        assert_eq!(server.active_monitor(), None);
        assert_eq!(server.focused_view(), None);

        let c = server.monitor_attach(&mut backend, "C", Rectangle::new(0, 0, 640, 480));
        assert_eq!(server.view(v).unwrap().monitor, Some(c));
        assert_eq!(server.focused_view(), Some(v));
    }

    #[test]
    fn detaching_inactive_monitor_keeps_active() {
        let (mut server, mut backend, a) = setup();
        let b = server.monitor_attach(&mut backend, "B", Rectangle::new(1000, 0, 800, 600));
        server.monitor_detach(&mut backend, b);
        assert_eq!(server.active_monitor(), Some(a));
    }

    #[test]
    fn size_hints_clamp_tiled_geometry() {
        let (mut server, mut backend, _) = setup();
        let v = server.view_create("a", "a", 100, 100);
        server.view_set_size_hints(&mut backend, v, (0, 0), (500, 400));
        server.view_map(&mut backend, v, false);
        assert_eq!(backend.last_resize(v), Some((500, 400)));

        server.view_set_size_hints(&mut backend, v, (1200, 0), (0, 0));
        assert_eq!(backend.last_resize(v), Some((1200, 800)));
    }

    #[test]
    fn ack_clears_pending_resize() {
        let (mut server, mut backend, _) = setup();
        let v = map_new(&mut server, &mut backend, "a");
        let token = server.view(v).unwrap().pending_resize.unwrap();

        server.view_ack_configure(v, token.wrapping_sub(1));
        assert!(server.view(v).unwrap().pending_resize.is_some());
        server.view_ack_configure(v, token);
        assert!(server.view(v).unwrap().pending_resize.is_none());
    }

    #[test]
    fn window_area_change_retiles() {
        let (mut server, mut backend, m) = setup();
        let v = map_new(&mut server, &mut backend, "a");
        server.monitor_set_window_area(&mut backend, m, Rectangle::new(0, 30, 1000, 770));
        assert_eq!(server.view(v).unwrap().geometry, Rectangle::new(0, 30, 1000, 770));
    }

    #[test]
    fn view_at_prefers_recently_focused() {
        let (mut server, mut backend, _) = setup();
        server.tiling_mode = TilingMode::None;
        let a = map_new(&mut server, &mut backend, "a");
        let b = map_new(&mut server, &mut backend, "b");
        assert_eq!(server.view_at(500.0, 400.0), Some(b));
        server.focus(&mut backend, a);
        assert_eq!(server.view_at(500.0, 400.0), Some(a));
        assert_eq!(server.view_at(5.0, 5.0), None);
    }

    #[test]
    fn views_info_filters_by_output() {
        let (mut server, mut backend, _) = setup();
        map_new(&mut server, &mut backend, "a");
        assert_eq!(server.views_info(Some("A")).unwrap().len(), 1);
        assert_eq!(
            server.views_info(Some("nope")),
            Err(Error::UnknownOutput("nope".into()))
        );
        let info = &server.views_info(None).unwrap()[0];
        assert_eq!(info.output.as_deref(), Some("A"));
        assert_eq!(info.workspace, Some(1));
        assert!(info.focused);
    }

    #[test]
    fn stale_handles_are_ignored() {
        let (mut server, mut backend, _) = setup();
        server.view_map(&mut backend, 999, false);
        server.view_unmap(&mut backend, 999);
        server.focus(&mut backend, 999);
        server.monitor_detach(&mut backend, 999);
        assert_eq!(server.focused_view(), None);
    }

    #[test]
    fn untiled_map_centers_natural_size() {
        let (mut server, mut backend, _) = setup();
        server.tiling_mode = TilingMode::None;
        let v = server.view_create("a", "a", 0, 0);
        server.view_set_natural_size(v, 400, 300);
        server.view_map(&mut backend, v, false);
        assert_eq!(server.view(v).unwrap().geometry, Rectangle::new(300, 250, 400, 300));
        assert_eq!(backend.last_resize(v), Some((400, 300)));
    }

    #[test]
    fn untiled_mode_keeps_existing_geometry() {
        let (mut server, mut backend, _) = setup();
        let a = map_new(&mut server, &mut backend, "a");
        let b = map_new(&mut server, &mut backend, "b");
        let tiled_a = server.view(a).unwrap().geometry;
        let tiled_b = server.view(b).unwrap().geometry;
        assert_ne!(tiled_a, tiled_b);

        server.set_tiling_mode(&mut backend, TilingMode::None);
        assert_eq!(server.view(a).unwrap().geometry, tiled_a);
        assert_eq!(server.view(b).unwrap().geometry, tiled_b);

        let c = map_new(&mut server, &mut backend, "c");
        let placed_c = server.view(c).unwrap().geometry;
        assert_eq!(server.view(a).unwrap().geometry, tiled_a);
        assert_eq!(server.view(b).unwrap().geometry, tiled_b);

        server.view_unmap(&mut backend, b);
        server.set_gaps(&mut backend, 10);
        server.view_map(&mut backend, b, false);
        assert_eq!(server.view(a).unwrap().geometry, tiled_a);
        assert_eq!(server.view(c).unwrap().geometry, placed_c);
    }

    #[test]
    fn disabled_output_hands_over_and_hides() {
        let (mut server, mut backend, a) = setup();
        let b = server.monitor_attach(&mut backend, "B", Rectangle::new(1000, 0, 800, 600));
        let v = map_new(&mut server, &mut backend, "a");
        assert_eq!(server.active_monitor(), Some(a));

        server.monitor_set_enabled(&mut backend, a, false);
        assert!(!server.monitor(a).unwrap().enabled);
        assert_eq!(server.active_monitor(), Some(b));
        assert_eq!(server.focused_view(), None);
        assert!(!server.view(v).unwrap().visible);
        assert_eq!(server.view(v).unwrap().monitor, Some(a));

        // The last enabled output stays on.
        server.monitor_set_enabled(&mut backend, b, false);
        assert!(server.monitor(b).unwrap().enabled);

        let w = map_new(&mut server, &mut backend, "b");
        assert_eq!(server.view(w).unwrap().monitor, Some(b));

        server.monitor_detach(&mut backend, b);
        assert_eq!(server.active_monitor(), None);
        server.monitor_set_enabled(&mut backend, a, true);
        assert_eq!(server.active_monitor(), Some(a));

        let (mut server, mut backend, a) = setup();
        let b = server.monitor_attach(&mut backend, "B", Rectangle::new(1000, 0, 800, 600));
        let v = map_new(&mut server, &mut backend, "a");
        server.monitor_set_enabled(&mut backend, a, false);
        server.monitor_set_enabled(&mut backend, a, true);
        assert!(server.view(v).unwrap().visible);
        assert_eq!(server.active_monitor(), Some(b));
    }
}
