use ktile::GrabMode;
use wayland_protocols::xdg::shell::server::{
    xdg_popup::{self, XdgPopup},
    xdg_positioner::{self, XdgPositioner},
    xdg_surface::{self, XdgSurface},
    xdg_toplevel::{self, XdgToplevel},
    xdg_wm_base::{self, XdgWmBase},
};
use wayland_server::{Dispatch, GlobalDispatch, Resource};

use crate::shell::Toplevel;
use crate::state::State;

impl GlobalDispatch<XdgWmBase, ()> for State {
    fn bind(
        _state: &mut Self,
        _handle: &wayland_server::DisplayHandle,
        _client: &wayland_server::Client,
        resource: wayland_server::New<XdgWmBase>,
        _global_data: &(),
        data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
        data_init.init(resource, ());
    }
}

impl Dispatch<XdgWmBase, ()> for State {
    fn request(
        state: &mut Self,
        _client: &wayland_server::Client,
        _resource: &XdgWmBase,
        request: xdg_wm_base::Request,
        _data: &(),
        _dhandle: &wayland_server::DisplayHandle,
        data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
        match request {
            xdg_wm_base::Request::CreatePositioner { id } => {
                data_init.init(id, ());
            }
            xdg_wm_base::Request::GetXdgSurface { id, surface } => {
                let xdg_surface = data_init.init(id, ());
                state.pending_xdg_surfaces.insert(xdg_surface.id(), surface);
            }
            _ => {}
        }
    }
}

impl Dispatch<XdgPositioner, ()> for State {
    fn request(
        _state: &mut Self,
        _client: &wayland_server::Client,
        _resource: &XdgPositioner,
        _request: xdg_positioner::Request,
        _data: &(),
        _dhandle: &wayland_server::DisplayHandle,
        _data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
    }
}

impl Dispatch<XdgSurface, ()> for State {
    fn request(
        state: &mut Self,
        _client: &wayland_server::Client,
        resource: &XdgSurface,
        request: xdg_surface::Request,
        _data: &(),
        _dhandle: &wayland_server::DisplayHandle,
        data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
        match request {
            xdg_surface::Request::GetToplevel { id } => {
                let toplevel = data_init.init(id, ());
                let Some(wl_surface) = state.pending_xdg_surfaces.remove(&resource.id()) else {
                    log::warn!("[xdg] get_toplevel on an xdg_surface that already has a role");
                    return;
                };

                let view = state.server.view_create("", "", 0, 0);
                state
                    .backend
                    .toplevels
                    .push(Toplevel::new(view, resource.clone(), toplevel, wl_surface));
                state.backend.configure_initial(view);
                log::info!("[xdg] View {} created", view);
            }
            xdg_surface::Request::GetPopup { id, .. } => {
                // Popups are accepted but never shown.
                data_init.init(id, ());
            }
            xdg_surface::Request::SetWindowGeometry { width, height, .. } => {
                if let Some(view) = state.backend.view_for_xdg_surface(resource) {
                    if let Some(t) = state.backend.toplevel_mut(view) {
                        t.window_geometry = Some((width, height));
                    }
                }
            }
            xdg_surface::Request::AckConfigure { serial } => {
                if let Some(view) = state.backend.view_for_xdg_surface(resource) {
                    state.server.view_ack_configure(view, serial);
                }
            }
            xdg_surface::Request::Destroy => {
                state.pending_xdg_surfaces.remove(&resource.id());
            }
            _ => {}
        }
    }
}

impl Dispatch<XdgToplevel, ()> for State {
    fn request(
        state: &mut Self,
        _client: &wayland_server::Client,
        resource: &XdgToplevel,
        request: xdg_toplevel::Request,
        _data: &(),
        _dhandle: &wayland_server::DisplayHandle,
        _data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
        let Some(view) = state.backend.view_for_toplevel(resource) else {
            return;
        };

        match request {
            xdg_toplevel::Request::SetTitle { title } => {
                state.server.view_set_title(&mut state.backend, view, &title);
            }
            xdg_toplevel::Request::SetAppId { app_id } => {
                state.server.view_set_app_id(view, &app_id);
            }
            xdg_toplevel::Request::SetMinSize { width, height } => {
                update_size_hints(state, view, |t| t.min_size = (width, height));
            }
            xdg_toplevel::Request::SetMaxSize { width, height } => {
                update_size_hints(state, view, |t| t.max_size = (width, height));
            }
            xdg_toplevel::Request::Move { .. } => {
                state.begin_client_grab(view, GrabMode::Move);
            }
            xdg_toplevel::Request::Resize { .. } => {
                state.begin_client_grab(view, GrabMode::Resize);
            }
            xdg_toplevel::Request::Destroy => {
                state.destroy_view(view);
            }
            _ => {}
        }
    }

    fn destroyed(
        state: &mut Self,
        _client: wayland_server::backend::ClientId,
        resource: &XdgToplevel,
        _data: &(),
    ) {
        if let Some(view) = state.backend.view_for_toplevel(resource) {
            state.destroy_view(view);
        }
    }
}

fn update_size_hints<F>(state: &mut State, view: ktile::ViewId, update: F)
where
    F: FnOnce(&mut Toplevel),
{
    let Some(t) = state.backend.toplevel_mut(view) else {
        return;
    };
    update(t);
    let (min, max) = (t.min_size, t.max_size);
    state
        .server
        .view_set_size_hints(&mut state.backend, view, min, max);
}

impl Dispatch<XdgPopup, ()> for State {
    fn request(
        _state: &mut Self,
        _client: &wayland_server::Client,
        _resource: &XdgPopup,
        _request: xdg_popup::Request,
        _data: &(),
        _dhandle: &wayland_server::DisplayHandle,
        _data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
    }
}
