//! Bindable commands. An action is a registry name plus a payload, and
//! converts losslessly to and from its argument vector.

use std::fmt;

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::interaction::GrabMode;
use crate::layout::{clamp_gaps, TilingMode};
use crate::server::{Server, ViewId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadMode {
    None,
    Int,
    String,
    Argv,
}

impl PayloadMode {
    fn expected(self) -> &'static str {
        match self {
            PayloadMode::None => "0",
            PayloadMode::Int | PayloadMode::String => "1",
            PayloadMode::Argv => "1 or more",
        }
    }

    fn accepts(self, extra: usize) -> bool {
        match self {
            PayloadMode::None => extra == 0,
            PayloadMode::Int | PayloadMode::String => extra == 1,
            PayloadMode::Argv => extra >= 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Quit,
    Spawn,
    Shell,
    Close,
    IncMaster,
    DecMaster,
    SetMaster,
    IncMfact,
    SetMfact,
    ToggleRmaster,
    SetGaps,
    IncGaps,
    SetTiling,
    FocusNext,
    FocusPrev,
    CycleViews,
    CycleApp,
    Zoom,
    ToggleFloating,
    Workspace,
    WorkspaceNext,
    WorkspacePrev,
    SendToWorkspace,
    SendNext,
    SendPrev,
    FocusMonitorNext,
    SendToMonitorNext,
    MoveGrab,
    ResizeGrab,
    Vt,
}

const REGISTRY: &[(&str, Command, PayloadMode)] = &[
    ("quit", Command::Quit, PayloadMode::None),
    ("spawn", Command::Spawn, PayloadMode::Argv),
    ("shell", Command::Shell, PayloadMode::String),
    ("close", Command::Close, PayloadMode::None),
    ("inc_master", Command::IncMaster, PayloadMode::None),
    ("dec_master", Command::DecMaster, PayloadMode::None),
    ("set_master", Command::SetMaster, PayloadMode::Int),
    ("inc_mfact", Command::IncMfact, PayloadMode::Int),
    ("set_mfact", Command::SetMfact, PayloadMode::Int),
    ("toggle_rmaster", Command::ToggleRmaster, PayloadMode::None),
    ("set_gaps", Command::SetGaps, PayloadMode::Int),
    ("inc_gaps", Command::IncGaps, PayloadMode::Int),
    ("set_tiling", Command::SetTiling, PayloadMode::String),
    ("focus_next", Command::FocusNext, PayloadMode::None),
    ("focus_prev", Command::FocusPrev, PayloadMode::None),
    ("cycle_views", Command::CycleViews, PayloadMode::None),
    ("cycle_app", Command::CycleApp, PayloadMode::None),
    ("zoom", Command::Zoom, PayloadMode::None),
    ("toggle_floating", Command::ToggleFloating, PayloadMode::None),
    ("workspace", Command::Workspace, PayloadMode::Int),
    ("workspace_next", Command::WorkspaceNext, PayloadMode::None),
    ("workspace_prev", Command::WorkspacePrev, PayloadMode::None),
    ("send_to_workspace", Command::SendToWorkspace, PayloadMode::Int),
    ("send_next", Command::SendNext, PayloadMode::None),
    ("send_prev", Command::SendPrev, PayloadMode::None),
    ("focus_monitor_next", Command::FocusMonitorNext, PayloadMode::None),
    ("send_to_monitor_next", Command::SendToMonitorNext, PayloadMode::None),
    ("move_grab", Command::MoveGrab, PayloadMode::None),
    ("resize_grab", Command::ResizeGrab, PayloadMode::None),
    ("vt", Command::Vt, PayloadMode::Int),
];

impl Command {
    pub fn from_name(name: &str) -> Option<Command> {
        REGISTRY
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(_, command, _)| *command)
    }

    fn entry(self) -> &'static (&'static str, Command, PayloadMode) {
        // Every variant has exactly one row.
        REGISTRY
            .iter()
            .find(|(_, command, _)| *command == self)
            .unwrap_or(&REGISTRY[0])
    }

    pub fn name(self) -> &'static str {
        self.entry().0
    }

    pub fn payload_mode(self) -> PayloadMode {
        self.entry().2
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        REGISTRY.iter().map(|(name, _, _)| *name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    None,
    Int(i32),
    String(String),
    Argv(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    command: Command,
    payload: Payload,
}

impl Action {
    pub fn create<S: AsRef<str>>(args: &[S]) -> Result<Action> {
        let (name, rest) = args.split_first().ok_or(Error::EmptyAction)?;
        let name = name.as_ref();
        let command =
            Command::from_name(name).ok_or_else(|| Error::UnknownAction(name.to_string()))?;
        let mode = command.payload_mode();

        if !mode.accepts(rest.len()) {
            return Err(Error::ArgumentCount {
                name: command.name(),
                expected: mode.expected(),
                got: rest.len(),
            });
        }

        let payload = match mode {
            PayloadMode::None => Payload::None,
            PayloadMode::Int => Payload::Int(rest[0].as_ref().trim().parse().unwrap_or(0)),
            PayloadMode::String => Payload::String(rest[0].as_ref().to_string()),
            PayloadMode::Argv => {
                let argv = rest
                    .iter()
                    .map(|arg| {
                        let arg = arg.as_ref();
                        if arg.contains('\0') {
                            Err(Error::NulInArgument(arg.to_string()))
                        } else {
                            Ok(arg.to_string())
                        }
                    })
                    .collect::<Result<Vec<_>>>()?;
                Payload::Argv(argv)
            }
        };

        Ok(Action { command, payload })
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn args(&self) -> Vec<String> {
        let mut args = vec![self.command.name().to_string()];
        match &self.payload {
            Payload::None => {}
            Payload::Int(n) => args.push(n.to_string()),
            Payload::String(s) => args.push(s.clone()),
            Payload::Argv(argv) => args.extend(argv.iter().cloned()),
        }
        args
    }

    fn int(&self) -> i32 {
        match self.payload {
            Payload::Int(n) => n,
            _ => 0,
        }
    }

    fn text(&self) -> &str {
        match &self.payload {
            Payload::String(s) => s,
            _ => "",
        }
    }

    pub fn execute(&self, server: &mut Server, backend: &mut dyn Backend) {
        log::debug!("[action] {}", self);
        match self.command {
            Command::Quit => {
                log::info!("[action] Quit requested");
                backend.quit();
            }
            Command::Spawn => {
                if let Payload::Argv(argv) = &self.payload {
                    if let Err(e) = backend.spawn(argv) {
                        log::warn!("[action] {}", e);
                    }
                }
            }
            Command::Shell => {
                let argv = vec!["sh".to_string(), "-c".to_string(), self.text().to_string()];
                if let Err(e) = backend.spawn(&argv) {
                    log::warn!("[action] {}", e);
                }
            }
            Command::Close => {
                if let Some(v) = server.focused_view() {
                    backend.close(v);
                }
            }
            Command::IncMaster => server.update_params(backend, |p| {
                p.set_master_count(p.master_count as i64 + 1)
            }),
            Command::DecMaster => server.update_params(backend, |p| {
                p.set_master_count(p.master_count as i64 - 1)
            }),
            Command::SetMaster => {
                let n = self.int();
                server.update_params(backend, |p| p.set_master_count(n as i64))
            }
            Command::IncMfact => {
                let delta = self.int() as f64 / 100.0;
                server.update_params(backend, |p| p.set_master_factor(p.master_factor + delta))
            }
            Command::SetMfact => {
                let factor = self.int() as f64 / 100.0;
                server.update_params(backend, |p| p.set_master_factor(factor))
            }
            Command::ToggleRmaster => {
                server.update_params(backend, |p| p.right_master = !p.right_master)
            }
            Command::SetGaps => server.set_gaps(backend, self.int() as i64),
            Command::IncGaps => {
                let gaps = server.gaps() as i64 + self.int() as i64;
                server.set_gaps(backend, gaps)
            }
            Command::SetTiling => match self.text().parse::<TilingMode>() {
                Ok(mode) => server.set_tiling_mode(backend, mode),
                Err(e) => log::warn!("[action] {}", e),
            },
            Command::FocusNext => server.focus_step(backend, 1),
            Command::FocusPrev => server.focus_step(backend, -1),
            Command::CycleViews => server.cycle_views(backend),
            Command::CycleApp => server.cycle_app(backend),
            Command::Zoom => server.zoom(backend),
            Command::ToggleFloating => server.toggle_floating(backend),
            Command::Workspace => server.switch_to_index(backend, self.int()),
            Command::WorkspaceNext => server.switch_relative(backend, 1),
            Command::WorkspacePrev => server.switch_relative(backend, -1),
            Command::SendToWorkspace => server.send_to_index(backend, self.int()),
            Command::SendNext => server.send_relative(backend, 1),
            Command::SendPrev => server.send_relative(backend, -1),
            Command::FocusMonitorNext => server.focus_monitor_next(backend),
            Command::SendToMonitorNext => server.send_to_monitor_next(backend),
            Command::MoveGrab => {
                if let Some(v) = server.focused_view() {
                    server.begin_interactive(backend, v, GrabMode::Move);
                }
            }
            Command::ResizeGrab => {
                if let Some(v) = server.focused_view() {
                    server.begin_interactive(backend, v, GrabMode::Resize);
                }
            }
            Command::Vt => {
                if backend.can_switch_vt() {
                    backend.switch_vt(self.int());
                } else {
                    log::debug!("[action] Session cannot switch VTs");
                }
            }
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args().join(" "))
    }
}

/// Workspace-level helpers behind the bindable commands.
impl Server {
    pub fn execute_action<S: AsRef<str>>(
        &mut self,
        backend: &mut dyn Backend,
        args: &[S],
    ) -> Result<()> {
        let action = Action::create(args)?;
        action.execute(self, backend);
        Ok(())
    }

    pub fn update_params<F>(&mut self, backend: &mut dyn Backend, update: F)
    where
        F: FnOnce(&mut crate::layout::TilingParams),
    {
        let Some((m, ws)) = self.active_workspace() else {
            return;
        };
        let Some(workspace) = self.workspace_mut(m, ws) else {
            return;
        };
        update(&mut workspace.params);
        self.arrange(backend, m);
    }

    pub fn set_gaps(&mut self, backend: &mut dyn Backend, gaps: i64) {
        let gaps = clamp_gaps(gaps);
        if gaps == self.gaps {
            return;
        }
        self.gaps = gaps;
        self.arrange_all(backend);
    }

    pub fn set_tiling_mode(&mut self, backend: &mut dyn Backend, mode: TilingMode) {
        if mode == self.tiling_mode {
            return;
        }
        log::info!("[action] Tiling mode is now {}", mode);
        self.tiling_mode = mode;
        self.arrange_all(backend);
    }

    fn focused_location(&self) -> Option<(ViewId, u64, u64)> {
        let v = self.focused?;
        let view = self.views.get(&v)?;
        Some((v, view.monitor?, view.workspace?))
    }

    pub fn focus_step(&mut self, backend: &mut dyn Backend, delta: isize) {
        let Some((m, ws)) = self.active_workspace() else {
            return;
        };
        let Some(order) = self
            .monitor(m)
            .and_then(|mon| mon.workspace(ws))
            .map(|w| w.tiling.clone())
        else {
            return;
        };
        if order.is_empty() {
            return;
        }
        let len = order.len() as isize;
        let next = match self.focused.and_then(|f| order.iter().position(|v| *v == f)) {
            Some(i) => order[(i as isize + delta).rem_euclid(len) as usize],
            None => order[0],
        };
        self.focus(backend, next);
    }

    /// Alt-Tab: the least recently focused view of the workspace comes to
    /// the front, so repeated presses walk every view.
    pub fn cycle_views(&mut self, backend: &mut dyn Backend) {
        let Some((m, ws)) = self.active_workspace() else {
            return;
        };
        let last = self
            .monitor(m)
            .and_then(|mon| mon.workspace(ws))
            .and_then(|w| w.focus.last().copied());
        if let Some(v) = last {
            self.focus(backend, v);
        }
    }

    /// Like `cycle_views`, but across every output and restricted to views
    /// sharing the focused view's app id.
    pub fn cycle_app(&mut self, backend: &mut dyn Backend) {
        let Some((focused, _, _)) = self.focused_location() else {
            return;
        };
        let Some(app_id) = self.views.get(&focused).map(|v| v.app_id.clone()) else {
            return;
        };
        let target = self.mru.iter().rev().copied().find(|v| {
            *v != focused
                && self
                    .views
                    .get(v)
                    .is_some_and(|view| view.mapped && view.monitor.is_some() && view.app_id == app_id)
        });
        if let Some(v) = target {
            self.focus(backend, v);
        }
    }

    /// Moves the focused view to the head of the tiling order. Zooming the
    /// head promotes the next view instead.
    pub fn zoom(&mut self, backend: &mut dyn Backend) {
        let Some((v, m, ws)) = self.focused_location() else {
            return;
        };
        let Some(workspace) = self.workspace_mut(m, ws) else {
            return;
        };
        let Some(pos) = workspace.tiling.iter().position(|other| *other == v) else {
            return;
        };
        let target = if pos == 0 { 1 } else { pos };
        if target >= workspace.tiling.len() {
            return;
        }
        let promoted = workspace.tiling.remove(target);
        workspace.tiling.insert(0, promoted);
        self.arrange(backend, m);
    }

    pub fn toggle_floating(&mut self, backend: &mut dyn Backend) {
        let Some((v, m, _)) = self.focused_location() else {
            return;
        };
        if let Some(view) = self.views.get_mut(&v) {
            view.floating = !view.floating;
            log::debug!("[action] View {} floating={}", v, view.floating);
        }
        self.arrange(backend, m);
    }

    /// Switches the active output to workspace `n`, 1-based and clamped.
    pub fn switch_to_index(&mut self, backend: &mut dyn Backend, n: i32) {
        let Some(m) = self.active_monitor else {
            return;
        };
        let Some(ws) = self.workspace_at(m, n as isize - 1) else {
            return;
        };
        self.switch_workspace(backend, m, ws);
    }

    pub fn switch_relative(&mut self, backend: &mut dyn Backend, delta: isize) {
        let Some(m) = self.active_monitor else {
            return;
        };
        let Some(ws) = self.workspace_wrapped(m, delta) else {
            return;
        };
        self.switch_workspace(backend, m, ws);
    }

    pub fn send_to_index(&mut self, backend: &mut dyn Backend, n: i32) {
        let Some((v, m, _)) = self.focused_location() else {
            return;
        };
        if let Some(ws) = self.workspace_at(m, n as isize - 1) {
            self.view_move_to_workspace(backend, v, m, ws);
        }
    }

    pub fn send_relative(&mut self, backend: &mut dyn Backend, delta: isize) {
        let Some((v, m, _)) = self.focused_location() else {
            return;
        };
        if let Some(ws) = self.workspace_wrapped(m, delta) {
            self.view_move_to_workspace(backend, v, m, ws);
        }
    }

    pub fn focus_monitor_next(&mut self, backend: &mut dyn Backend) {
        let Some(next) = self.next_monitor() else {
            return;
        };
        let Some(ws) = self.monitor(next).map(|mon| mon.current) else {
            return;
        };
        self.switch_workspace(backend, next, ws);
        let head = self
            .monitor(next)
            .and_then(|mon| mon.workspace(ws))
            .and_then(|w| w.focus.first().copied());
        match head {
            Some(v) => self.focus(backend, v),
            None => self.clear_focus(backend),
        }
    }

    pub fn send_to_monitor_next(&mut self, backend: &mut dyn Backend) {
        let Some((v, _, _)) = self.focused_location() else {
            return;
        };
        let Some(next) = self.next_monitor() else {
            return;
        };
        if let Some(ws) = self.monitor(next).map(|mon| mon.current) {
            self.view_move_to_workspace(backend, v, next, ws);
        }
    }

    fn next_monitor(&self) -> Option<u64> {
        let enabled: Vec<u64> = self
            .monitors
            .iter()
            .filter(|mon| mon.enabled)
            .map(|mon| mon.id)
            .collect();
        if enabled.len() < 2 {
            return None;
        }
        let pos = self
            .active_monitor
            .and_then(|a| enabled.iter().position(|id| *id == a))
            .unwrap_or(0);
        Some(enabled[(pos + 1) % enabled.len()])
    }

    fn workspace_at(&self, m: u64, index: isize) -> Option<u64> {
        let monitor = self.monitor(m)?;
        let last = monitor.workspaces.len() as isize - 1;
        monitor
            .workspaces
            .get(index.clamp(0, last.max(0)) as usize)
            .map(|ws| ws.id)
    }

    fn workspace_wrapped(&self, m: u64, delta: isize) -> Option<u64> {
        let monitor = self.monitor(m)?;
        let len = monitor.workspaces.len() as isize;
        let index = (monitor.current_index() as isize + delta).rem_euclid(len.max(1));
        monitor.workspaces.get(index as usize).map(|ws| ws.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::{Call, RecordingBackend};
    use crate::layout::Rectangle;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn setup(count: usize) -> (Server, RecordingBackend, Vec<ViewId>) {
        let mut server = Server::new();
        let mut backend = RecordingBackend::new();
        server.monitor_attach(&mut backend, "A", Rectangle::new(0, 0, 1000, 800));
        let views = (0..count)
            .map(|i| {
                let app = if i % 2 == 0 { "foot" } else { "firefox" };
                let v = server.view_create(app, app, 300, 200);
                server.view_map(&mut backend, v, false);
                v
            })
            .collect();
        (server, backend, views)
    }

    fn run(server: &mut Server, backend: &mut RecordingBackend, list: &[&str]) {
        server.execute_action(backend, list).unwrap();
    }

    fn params(server: &Server) -> crate::layout::TilingParams {
        let (m, ws) = server.active_workspace().unwrap();
        server.monitor(m).unwrap().workspace(ws).unwrap().params
    }

    #[test]
    fn args_round_trip() {
        for case in [
            args(&["spawn", "foot"]),
            args(&["shell", "ls -la"]),
            args(&["inc_master"]),
            args(&["toggle_rmaster"]),
            args(&["spawn", "foot", "-e", "htop"]),
            args(&["workspace", "3"]),
            args(&["inc_mfact", "-5"]),
        ] {
            assert_eq!(Action::create(&case).unwrap().args(), case);
        }
    }

    #[test]
    fn create_errors() {
        assert_eq!(Action::create::<&str>(&[]), Err(Error::EmptyAction));
        assert_eq!(
            Action::create(&["explode"]),
            Err(Error::UnknownAction("explode".into()))
        );
        assert_eq!(
            Action::create(&["zoom", "now"]),
            Err(Error::ArgumentCount {
                name: "zoom",
                expected: "0",
                got: 1
            })
        );
        assert!(matches!(
            Action::create(&["spawn"]),
            Err(Error::ArgumentCount { got: 0, .. })
        ));
        assert!(matches!(
            Action::create(&["workspace", "1", "2"]),
            Err(Error::ArgumentCount { got: 2, .. })
        ));
        assert_eq!(
            Action::create(&["spawn", "a\0b"]),
            Err(Error::NulInArgument("a\0b".into()))
        );
    }

    #[test]
    fn unparsable_int_falls_back_to_zero() {
        let action = Action::create(&["workspace", "three"]).unwrap();
        assert_eq!(action.payload(), &Payload::Int(0));
    }

    #[test]
    fn every_command_has_a_registry_row() {
        for name in Command::names() {
            let command = Command::from_name(name).unwrap();
            assert_eq!(command.name(), name);
        }
    }

    #[test]
    fn spawn_and_shell_reach_backend() {
        let (mut server, mut backend, _) = setup(0);
        run(&mut server, &mut backend, &["spawn", "foot", "-e", "htop"]);
        run(&mut server, &mut backend, &["shell", "echo hi > /tmp/x"]);
        assert_eq!(
            backend.spawned(),
            vec![
                args(&["foot", "-e", "htop"]),
                args(&["sh", "-c", "echo hi > /tmp/x"])
            ]
        );
    }

    #[test]
    fn close_and_quit() {
        let (mut server, mut backend, views) = setup(1);
        run(&mut server, &mut backend, &["close"]);
        run(&mut server, &mut backend, &["quit"]);
        assert!(backend.calls.contains(&Call::Close(views[0])));
        assert_eq!(backend.calls.last(), Some(&Call::Quit));
    }

    #[test]
    fn view_actions_without_focus_are_noops() {
        let (mut server, mut backend, _) = setup(0);
        for name in ["close", "zoom", "toggle_floating", "send_next", "move_grab", "cycle_app"] {
            run(&mut server, &mut backend, &[name]);
        }
        assert!(backend.calls.iter().all(|c| !matches!(c, Call::Close(_))));
    }

    #[test]
    fn master_parameters_clamp() {
        let (mut server, mut backend, _) = setup(3);
        run(&mut server, &mut backend, &["inc_master"]);
        assert_eq!(params(&server).master_count, 2);
        run(&mut server, &mut backend, &["set_master", "500"]);
        assert_eq!(params(&server).master_count, 100);
        run(&mut server, &mut backend, &["set_master", "0"]);
        run(&mut server, &mut backend, &["dec_master"]);
        assert_eq!(params(&server).master_count, 0);

        run(&mut server, &mut backend, &["set_mfact", "50"]);
        run(&mut server, &mut backend, &["inc_mfact", "-10"]);
        assert!((params(&server).master_factor - 0.4).abs() < 1e-9);
        run(&mut server, &mut backend, &["set_mfact", "200"]);
        assert_eq!(params(&server).master_factor, 0.95);

        run(&mut server, &mut backend, &["toggle_rmaster"]);
        assert!(params(&server).right_master);
    }

    #[test]
    fn gaps_and_tiling_mode() {
        let (mut server, mut backend, views) = setup(1);
        run(&mut server, &mut backend, &["set_gaps", "10"]);
        assert_eq!(server.gaps(), 10);
        assert_eq!(backend.last_resize(views[0]), Some((980, 780)));
        run(&mut server, &mut backend, &["inc_gaps", "500"]);
        assert_eq!(server.gaps(), 200);

        run(&mut server, &mut backend, &["set_tiling", "none"]);
        assert_eq!(server.tiling_mode(), TilingMode::None);
        run(&mut server, &mut backend, &["set_tiling", "spiral"]);
        assert_eq!(server.tiling_mode(), TilingMode::None);
    }

    #[test]
    fn focus_next_and_prev_wrap() {
        let (mut server, mut backend, views) = setup(3);
        assert_eq!(server.focused_view(), Some(views[2]));
        run(&mut server, &mut backend, &["focus_next"]);
        assert_eq!(server.focused_view(), Some(views[0]));
        run(&mut server, &mut backend, &["focus_prev"]);
        assert_eq!(server.focused_view(), Some(views[2]));
    }

    #[test]
    fn cycle_views_walks_least_recent() {
        let (mut server, mut backend, views) = setup(3);
        run(&mut server, &mut backend, &["cycle_views"]);
        assert_eq!(server.focused_view(), Some(views[0]));
        run(&mut server, &mut backend, &["cycle_views"]);
        assert_eq!(server.focused_view(), Some(views[1]));
        run(&mut server, &mut backend, &["cycle_views"]);
        assert_eq!(server.focused_view(), Some(views[2]));
    }

    #[test]
    fn cycle_app_stays_within_app_id() {
        let (mut server, mut backend, views) = setup(4);
        // foot: views[0], views[2]; firefox: views[1], views[3].
        server.focus(&mut backend, views[2]);
        run(&mut server, &mut backend, &["cycle_app"]);
        assert_eq!(server.focused_view(), Some(views[0]));
        run(&mut server, &mut backend, &["cycle_app"]);
        assert_eq!(server.focused_view(), Some(views[2]));
    }

    #[test]
    fn zoom_promotes_to_master() {
        let (mut server, mut backend, views) = setup(3);
        run(&mut server, &mut backend, &["zoom"]);
        let (m, ws) = server.active_workspace().unwrap();
        let order = server.monitor(m).unwrap().workspace(ws).unwrap().tiling.clone();
        assert_eq!(order, vec![views[2], views[0], views[1]]);

        run(&mut server, &mut backend, &["zoom"]);
        let order = server.monitor(m).unwrap().workspace(ws).unwrap().tiling.clone();
        assert_eq!(order, vec![views[0], views[2], views[1]]);
    }

    #[test]
    fn toggle_floating_leaves_tiling() {
        let (mut server, mut backend, views) = setup(2);
        run(&mut server, &mut backend, &["toggle_floating"]);
        assert!(server.view(views[1]).unwrap().floating);
        assert_eq!(backend.last_resize(views[0]), Some((1000, 800)));
    }

    #[test]
    fn workspace_switching_clamps_and_wraps() {
        let (mut server, mut backend, views) = setup(1);
        run(&mut server, &mut backend, &["workspace", "9"]);
        let m = server.active_monitor().unwrap();
        assert_eq!(server.monitor(m).unwrap().current_index(), 1);
        assert_eq!(server.focused_view(), None);

        run(&mut server, &mut backend, &["workspace_next"]);
        assert_eq!(server.monitor(m).unwrap().current_index(), 0);
        assert_eq!(server.focused_view(), Some(views[0]));

        run(&mut server, &mut backend, &["workspace_prev"]);
        assert_eq!(server.monitor(m).unwrap().current_index(), 1);
    }

    #[test]
    fn send_to_workspace_moves_focused() {
        let (mut server, mut backend, views) = setup(2);
        run(&mut server, &mut backend, &["send_to_workspace", "2"]);
        let m = server.active_monitor().unwrap();
        let monitor = server.monitor(m).unwrap();
        assert_eq!(monitor.workspaces.len(), 3);
        assert_eq!(monitor.workspaces[1].tiling, vec![views[1]]);
        assert_eq!(server.focused_view(), Some(views[0]));

        run(&mut server, &mut backend, &["send_next"]);
        let monitor = server.monitor(m).unwrap();
        assert_eq!(monitor.workspaces.len(), 2);
        assert_eq!(monitor.workspaces[0].tiling, vec![views[1], views[0]]);
    }

    #[test]
    fn monitor_actions() {
        let (mut server, mut backend, views) = setup(1);
        let a = server.active_monitor().unwrap();
        let b = server.monitor_attach(&mut backend, "B", Rectangle::new(1000, 0, 800, 600));

        run(&mut server, &mut backend, &["focus_monitor_next"]);
        assert_eq!(server.active_monitor(), Some(b));
        assert_eq!(server.focused_view(), None);

        run(&mut server, &mut backend, &["focus_monitor_next"]);
        assert_eq!(server.active_monitor(), Some(a));
        assert_eq!(server.focused_view(), Some(views[0]));

        run(&mut server, &mut backend, &["send_to_monitor_next"]);
        assert_eq!(server.view(views[0]).unwrap().monitor, Some(b));
        assert_eq!(server.active_monitor(), Some(b));
    }

    #[test]
    fn grabs_start_on_focused_view() {
        let (mut server, mut backend, views) = setup(1);
        run(&mut server, &mut backend, &["resize_grab"]);
        assert_eq!(server.grab().view(), Some(views[0]));
    }

    #[test]
    fn vt_needs_capable_session() {
        let (mut server, mut backend, _) = setup(0);
        run(&mut server, &mut backend, &["vt", "2"]);
        assert!(!backend.calls.contains(&Call::SwitchVt(2)));
        backend.vt_capable = true;
        run(&mut server, &mut backend, &["vt", "2"]);
        assert!(backend.calls.contains(&Call::SwitchVt(2)));
    }
}
