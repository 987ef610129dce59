mod compositor;
mod layer_shell;
mod output;
mod seat;
mod shm;
mod xdg_shell;

use wayland_protocols::xdg::shell::server::xdg_wm_base::XdgWmBase;
use wayland_protocols_wlr::layer_shell::v1::server::zwlr_layer_shell_v1::ZwlrLayerShellV1;
use wayland_server::protocol::{wl_compositor::WlCompositor, wl_seat::WlSeat, wl_shm::WlShm};
use wayland_server::DisplayHandle;

use crate::state::State;

/// Output globals are not created here; they follow the model's monitors.
pub fn create_globals(dh: &DisplayHandle) {
    dh.create_global::<State, WlCompositor, ()>(6, ());
    dh.create_global::<State, WlShm, ()>(1, ());
    dh.create_global::<State, WlSeat, ()>(7, ());
    dh.create_global::<State, XdgWmBase, ()>(5, ());
    dh.create_global::<State, ZwlrLayerShellV1, ()>(4, ());
    log::debug!("[protocols] Globals created");
}
