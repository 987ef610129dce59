use wayland_server::protocol::{
    wl_buffer::WlBuffer,
    wl_callback::WlCallback,
    wl_compositor::{self, WlCompositor},
    wl_region::{self, WlRegion},
    wl_surface::{self, WlSurface},
};
use wayland_server::{Dispatch, GlobalDispatch, Resource};

use super::shm::BufferInfo;
use crate::state::State;

impl GlobalDispatch<WlCompositor, ()> for State {
    fn bind(
        _state: &mut Self,
        _handle: &wayland_server::DisplayHandle,
        _client: &wayland_server::Client,
        resource: wayland_server::New<WlCompositor>,
        _global_data: &(),
        data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
        data_init.init(resource, ());
    }
}

impl Dispatch<WlCompositor, ()> for State {
    fn request(
        _state: &mut Self,
        _client: &wayland_server::Client,
        _resource: &WlCompositor,
        request: wl_compositor::Request,
        _data: &(),
        _dhandle: &wayland_server::DisplayHandle,
        data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
        match request {
            wl_compositor::Request::CreateSurface { id } => {
                data_init.init(id, ());
            }
            wl_compositor::Request::CreateRegion { id } => {
                data_init.init(id, ());
            }
            _ => {}
        }
    }
}

impl Dispatch<WlSurface, ()> for State {
    fn request(
        state: &mut Self,
        _client: &wayland_server::Client,
        resource: &WlSurface,
        request: wl_surface::Request,
        _data: &(),
        _dhandle: &wayland_server::DisplayHandle,
        data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
        match request {
            wl_surface::Request::Attach { buffer, .. } => {
                if let Some(view) = state.backend.view_for_surface(resource) {
                    if let Some(t) = state.backend.toplevel_mut(view) {
                        t.pending_buffer = buffer;
                        t.pending_buffer_set = true;
                    }
                } else if let Some(ls) = state.layer_surface_mut(resource) {
                    ls.pending_buffer = buffer;
                    ls.pending_buffer_set = true;
                }
            }
            wl_surface::Request::Commit => {
                if let Some(view) = state.backend.view_for_surface(resource) {
                    commit_toplevel(state, view);
                } else {
                    super::layer_shell::commit_layer_surface(state, resource);
                }
            }
            wl_surface::Request::Frame { callback } => {
                let cb = data_init.init(callback, ());
                state.frame_callbacks.push(cb);
            }
            wl_surface::Request::Destroy => {
                surface_gone(state, resource);
            }
            _ => {}
        }
    }

    fn destroyed(
        state: &mut Self,
        _client: wayland_server::backend::ClientId,
        resource: &WlSurface,
        _data: &(),
    ) {
        surface_gone(state, resource);
    }
}

fn surface_gone(state: &mut State, surface: &WlSurface) {
    if let Some(view) = state.backend.view_for_surface(surface) {
        log::debug!("[surface] Surface of view {} destroyed", view);
        state.destroy_view(view);
    } else {
        super::layer_shell::remove_layer_surface(state, surface);
    }
}

/// Applies a pending attach. The first buffer maps the view, a null buffer
/// unmaps it again.
fn commit_toplevel(state: &mut State, view: ktile::ViewId) {
    let Some(t) = state.backend.toplevel_mut(view) else {
        return;
    };
    if !t.pending_buffer_set {
        return;
    }
    t.pending_buffer_set = false;
    let buffer = t.pending_buffer.take();
    t.has_buffer = buffer.is_some();

    match buffer {
        Some(buffer) => {
            let size = t.window_geometry.or_else(|| buffer_size(&buffer));
            let newly_mapped = !t.mapped;
            t.mapped = true;
            // Nothing is composited, so the buffer can go straight back.
            buffer.release();

            if newly_mapped {
                if let Some((w, h)) = size {
                    state.server.view_set_natural_size(view, w, h);
                }
                let to_front = state.server.new_on_top();
                state.server.view_map(&mut state.backend, view, to_front);
                log::info!("[surface] View {} mapped", view);
            } else if let (Some((w, h)), true) = (size, is_floating(state, view)) {
                state.server.view_set_size(view, w, h);
            }
        }
        None => {
            if t.mapped {
                t.mapped = false;
                state.server.view_unmap(&mut state.backend, view);
                log::info!("[surface] View {} unmapped", view);
            }
        }
    }
}

fn is_floating(state: &State, view: ktile::ViewId) -> bool {
    state.server.view(view).is_some_and(|v| v.floating)
}

fn buffer_size(buffer: &WlBuffer) -> Option<(i32, i32)> {
    buffer.data::<BufferInfo>().map(|info| (info.width, info.height))
}

impl Dispatch<WlCallback, ()> for State {
    fn request(
        _state: &mut Self,
        _client: &wayland_server::Client,
        _resource: &WlCallback,
        _request: wayland_server::protocol::wl_callback::Request,
        _data: &(),
        _dhandle: &wayland_server::DisplayHandle,
        _data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
    }
}

impl Dispatch<WlRegion, ()> for State {
    fn request(
        _state: &mut Self,
        _client: &wayland_server::Client,
        _resource: &WlRegion,
        _request: wl_region::Request,
        _data: &(),
        _dhandle: &wayland_server::DisplayHandle,
        _data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
    }
}
