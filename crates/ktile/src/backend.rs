//! The seam between window-management policy and whatever actually owns the
//! surfaces. The server only ever talks to clients through these traits.

use crate::error::Result;
use crate::server::ViewId;

/// Notifications for UI-side consumers (bars, IPC subscribers). Every
/// method defaults to doing nothing.
pub trait Observer {
    fn on_redraw_needed(&mut self) {}

    fn on_focus_changed(&mut self, _view: Option<ViewId>, _title: Option<&str>) {}

    fn on_workspace_changed(&mut self, _output: &str, _workspace: usize) {}

    fn on_chord_changed(&mut self, _pending: &str) {}
}

pub trait Backend: Observer {
    /// Asks the client to resize. Returns a token the client echoes back
    /// once it has committed the new size.
    fn request_resize(&mut self, view: ViewId, width: i32, height: i32) -> u32;

    fn set_position(&mut self, view: ViewId, x: i32, y: i32);

    fn set_visible(&mut self, view: ViewId, visible: bool);

    fn set_activated(&mut self, view: ViewId, activated: bool);

    fn set_keyboard_focus(&mut self, view: Option<ViewId>);

    fn raise(&mut self, view: ViewId);

    fn close(&mut self, view: ViewId);

    fn spawn(&mut self, argv: &[String]) -> Result<()>;

    fn can_switch_vt(&self) -> bool {
        false
    }

    fn switch_vt(&mut self, _vt: i32) -> bool {
        false
    }

    fn quit(&mut self);
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Resize(ViewId, i32, i32),
        Position(ViewId, i32, i32),
        Visible(ViewId, bool),
        Activated(ViewId, bool),
        KeyboardFocus(Option<ViewId>),
        Raise(ViewId),
        Close(ViewId),
        Spawn(Vec<String>),
        SwitchVt(i32),
        Quit,
    }

    /// Records every backend call so tests can assert on side effects.
    #[derive(Default)]
    pub struct RecordingBackend {
        pub calls: Vec<Call>,
        pub next_token: u32,
        pub vt_capable: bool,
        pub redraws: usize,
        pub focus_events: Vec<Option<ViewId>>,
        pub workspace_events: Vec<(String, usize)>,
        pub chord_events: Vec<String>,
    }

    impl RecordingBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn clear(&mut self) {
            self.calls.clear();
            self.focus_events.clear();
            self.workspace_events.clear();
            self.chord_events.clear();
        }

        pub fn spawned(&self) -> Vec<Vec<String>> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Spawn(argv) => Some(argv.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn last_resize(&self, view: ViewId) -> Option<(i32, i32)> {
            self.calls.iter().rev().find_map(|c| match c {
                Call::Resize(v, w, h) if *v == view => Some((*w, *h)),
                _ => None,
            })
        }

        pub fn last_visible(&self, view: ViewId) -> Option<bool> {
            self.calls.iter().rev().find_map(|c| match c {
                Call::Visible(v, visible) if *v == view => Some(*visible),
                _ => None,
            })
        }

        pub fn last_keyboard_focus(&self) -> Option<Option<ViewId>> {
            self.calls.iter().rev().find_map(|c| match c {
                Call::KeyboardFocus(v) => Some(*v),
                _ => None,
            })
        }
    }

    impl Observer for RecordingBackend {
        fn on_redraw_needed(&mut self) {
            self.redraws += 1;
        }

        fn on_focus_changed(&mut self, view: Option<ViewId>, _title: Option<&str>) {
            self.focus_events.push(view);
        }

        fn on_workspace_changed(&mut self, output: &str, workspace: usize) {
            self.workspace_events.push((output.to_string(), workspace));
        }

        fn on_chord_changed(&mut self, pending: &str) {
            self.chord_events.push(pending.to_string());
        }
    }

    impl Backend for RecordingBackend {
        fn request_resize(&mut self, view: ViewId, width: i32, height: i32) -> u32 {
            self.calls.push(Call::Resize(view, width, height));
            self.next_token += 1;
            self.next_token
        }

        fn set_position(&mut self, view: ViewId, x: i32, y: i32) {
            self.calls.push(Call::Position(view, x, y));
        }

        fn set_visible(&mut self, view: ViewId, visible: bool) {
            self.calls.push(Call::Visible(view, visible));
        }

        fn set_activated(&mut self, view: ViewId, activated: bool) {
            self.calls.push(Call::Activated(view, activated));
        }

        fn set_keyboard_focus(&mut self, view: Option<ViewId>) {
            self.calls.push(Call::KeyboardFocus(view));
        }

        fn raise(&mut self, view: ViewId) {
            self.calls.push(Call::Raise(view));
        }

        fn close(&mut self, view: ViewId) {
            self.calls.push(Call::Close(view));
        }

        fn spawn(&mut self, argv: &[String]) -> Result<()> {
            self.calls.push(Call::Spawn(argv.to_vec()));
            Ok(())
        }

        fn can_switch_vt(&self) -> bool {
            self.vt_capable
        }

        fn switch_vt(&mut self, vt: i32) -> bool {
            self.calls.push(Call::SwitchVt(vt));
            self.vt_capable
        }

        fn quit(&mut self) {
            self.calls.push(Call::Quit);
        }
    }
}
