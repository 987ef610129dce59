//! Pointer grabs for interactive move and resize.

use crate::backend::Backend;
use crate::layout::Rectangle;
use crate::server::{Server, ViewId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabMode {
    Move,
    Resize,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Grab {
    #[default]
    Passthrough,
    /// `offset` is the pointer position relative to the view origin.
    Move { view: ViewId, offset: (f64, f64) },
    /// `offset` is the pointer position relative to the bottom-right corner.
    Resize { view: ViewId, offset: (f64, f64) },
}

impl Grab {
    pub fn view(&self) -> Option<ViewId> {
        match self {
            Grab::Passthrough => None,
            Grab::Move { view, .. } | Grab::Resize { view, .. } => Some(*view),
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, Grab::Passthrough)
    }
}

impl Server {
    pub fn grab(&self) -> Grab {
        self.grab
    }

    pub fn pointer_position(&self) -> (f64, f64) {
        self.pointer
    }

    /// Starts a grab on `v` at the current pointer position. The view is
    /// pulled out of the tiling so later re-tiles leave it alone.
    pub fn begin_interactive(&mut self, backend: &mut dyn Backend, v: ViewId, mode: GrabMode) {
        let Some(view) = self.views.get_mut(&v) else {
            log::warn!("[grab] Grab of unknown view {}", v);
            return;
        };
        if !view.mapped || view.monitor.is_none() {
            return;
        }

        let was_floating = view.floating;
        view.floating = true;
        let g = view.geometry;
        let monitor = view.monitor;
        let (px, py) = self.pointer;

        self.grab = match mode {
            GrabMode::Move => Grab::Move {
                view: v,
                offset: (px - g.x as f64, py - g.y as f64),
            },
            GrabMode::Resize => Grab::Resize {
                view: v,
                offset: (
                    px - (g.x + g.width) as f64,
                    py - (g.y + g.height) as f64,
                ),
            },
        };
        log::debug!("[grab] {:?} grab on view {}", mode, v);

        self.focus(backend, v);
        if !was_floating {
            if let Some(m) = monitor {
                self.arrange(backend, m);
            }
        }
    }

    /// Returns true when the motion was consumed by a grab.
    pub fn pointer_motion(&mut self, backend: &mut dyn Backend, x: f64, y: f64) -> bool {
        self.pointer = (x, y);

        match self.grab {
            Grab::Passthrough => false,
            Grab::Move { view, offset } => {
                let x = (x - offset.0) as i32;
                let y = (y - offset.1) as i32;
                if let Some(v) = self.views.get_mut(&view) {
                    v.geometry.x = x;
                    v.geometry.y = y;
                    backend.set_position(view, x, y);
                    backend.on_redraw_needed();
                }
                true
            }
            Grab::Resize { view, offset } => {
                let Some(origin) = self.views.get(&view).map(|v| v.geometry) else {
                    return true;
                };
                let width = ((x - offset.0) as i32 - origin.x).max(1);
                let height = ((y - offset.1) as i32 - origin.y).max(1);
                self.apply_geometry(
                    backend,
                    view,
                    Rectangle::new(origin.x, origin.y, width, height),
                );
                backend.on_redraw_needed();
                true
            }
        }
    }

    /// Any release ends a grab. Presses outside a grab focus the view under
    /// the pointer. Returns true when the event must not reach clients.
    pub fn pointer_button(&mut self, backend: &mut dyn Backend, pressed: bool) -> bool {
        if !pressed {
            if self.grab.is_active() {
                log::debug!("[grab] Grab ended");
                self.grab = Grab::Passthrough;
                return true;
            }
            return false;
        }

        if self.grab.is_active() {
            return true;
        }
        let (x, y) = self.pointer;
        if let Some(v) = self.view_at(x, y) {
            self.focus(backend, v);
        }
        false
    }
}
