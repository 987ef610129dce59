use ktile::{MonitorId, Rectangle};
use wayland_protocols_wlr::layer_shell::v1::server::{
    zwlr_layer_shell_v1::{self, Layer as WlrLayer, ZwlrLayerShellV1},
    zwlr_layer_surface_v1::{self, Anchor, KeyboardInteractivity, ZwlrLayerSurfaceV1},
};
use wayland_server::protocol::wl_surface::WlSurface;
use wayland_server::{Dispatch, GlobalDispatch, Resource, WEnum};

use crate::state::{Layer, LayerSurface, State};

fn convert_layer(layer: WEnum<WlrLayer>) -> Layer {
    match layer {
        WEnum::Value(WlrLayer::Background) => Layer::Background,
        WEnum::Value(WlrLayer::Bottom) => Layer::Bottom,
        WEnum::Value(WlrLayer::Top) => Layer::Top,
        WEnum::Value(WlrLayer::Overlay) => Layer::Overlay,
        _ => Layer::Top,
    }
}

fn convert_anchor(anchor: WEnum<Anchor>) -> Anchor {
    match anchor {
        WEnum::Value(a) => a,
        _ => Anchor::empty(),
    }
}

fn convert_keyboard_interactivity(ki: WEnum<KeyboardInteractivity>) -> KeyboardInteractivity {
    match ki {
        WEnum::Value(k) => k,
        _ => KeyboardInteractivity::None,
    }
}

impl GlobalDispatch<ZwlrLayerShellV1, ()> for State {
    fn bind(
        _state: &mut Self,
        _handle: &wayland_server::DisplayHandle,
        _client: &wayland_server::Client,
        resource: wayland_server::New<ZwlrLayerShellV1>,
        _global_data: &(),
        data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
        data_init.init(resource, ());
    }
}

impl Dispatch<ZwlrLayerShellV1, ()> for State {
    fn request(
        state: &mut Self,
        _client: &wayland_server::Client,
        _resource: &ZwlrLayerShellV1,
        request: zwlr_layer_shell_v1::Request,
        _data: &(),
        _dhandle: &wayland_server::DisplayHandle,
        data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
        if let zwlr_layer_shell_v1::Request::GetLayerSurface {
            id,
            surface,
            output,
            layer,
            namespace,
        } = request
        {
            let monitor = output
                .and_then(|o| o.data::<MonitorId>().copied())
                .or_else(|| state.server.active_monitor());

            let layer_surface = data_init.init(
                id,
                LayerSurfaceData {
                    surface: surface.clone(),
                },
            );

            let id = state.next_layer_surface_id;
            state.next_layer_surface_id += 1;

            state.layer_surfaces.push(LayerSurface {
                id,
                wl_surface: surface,
                layer_surface,
                monitor,
                layer: convert_layer(layer),
                namespace,
                anchor: Anchor::empty(),
                exclusive_zone: 0,
                margin: (0, 0, 0, 0),
                keyboard_interactivity: KeyboardInteractivity::None,
                geometry: Rectangle::default(),
                desired_width: 0,
                desired_height: 0,
                configured: false,
                needs_configure: true,
                mapped: false,
                pending_buffer: None,
                pending_buffer_set: false,
            });

            log::debug!("[layer_shell] Created layer surface {} on output {:?}", id, monitor);
        }
    }
}

pub struct LayerSurfaceData {
    pub surface: WlSurface,
}

impl Dispatch<ZwlrLayerSurfaceV1, LayerSurfaceData> for State {
    fn request(
        state: &mut Self,
        _client: &wayland_server::Client,
        _resource: &ZwlrLayerSurfaceV1,
        request: zwlr_layer_surface_v1::Request,
        data: &LayerSurfaceData,
        _dhandle: &wayland_server::DisplayHandle,
        _data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
        if let zwlr_layer_surface_v1::Request::Destroy = request {
            remove_layer_surface(state, &data.surface);
            return;
        }

        let Some(ls) = state.layer_surface_mut(&data.surface) else {
            return;
        };

        match request {
            zwlr_layer_surface_v1::Request::SetSize { width, height } => {
                ls.desired_width = width;
                ls.desired_height = height;
                ls.needs_configure = true;
            }
            zwlr_layer_surface_v1::Request::SetAnchor { anchor } => {
                ls.anchor = convert_anchor(anchor);
                ls.needs_configure = true;
            }
            zwlr_layer_surface_v1::Request::SetExclusiveZone { zone } => {
                ls.exclusive_zone = zone;
                ls.needs_configure = true;
            }
            zwlr_layer_surface_v1::Request::SetMargin {
                top,
                right,
                bottom,
                left,
            } => {
                ls.margin = (top, right, bottom, left);
                ls.needs_configure = true;
            }
            zwlr_layer_surface_v1::Request::SetKeyboardInteractivity {
                keyboard_interactivity,
            } => {
                ls.keyboard_interactivity = convert_keyboard_interactivity(keyboard_interactivity);
            }
            zwlr_layer_surface_v1::Request::SetLayer { layer } => {
                ls.layer = convert_layer(layer);
            }
            _ => {}
        }
    }

    fn destroyed(
        state: &mut Self,
        _client: wayland_server::backend::ClientId,
        _resource: &ZwlrLayerSurfaceV1,
        data: &LayerSurfaceData,
    ) {
        remove_layer_surface(state, &data.surface);
    }
}

/// Answers pending layout changes with a configure and applies any attached
/// buffer. The output's usable area follows the surface's exclusive zone.
pub fn commit_layer_surface(state: &mut State, surface: &WlSurface) {
    let Some(ls) = state.layer_surface_mut(surface) else {
        return;
    };

    if ls.pending_buffer_set {
        ls.pending_buffer_set = false;
        let buffer = ls.pending_buffer.take();
        let was_mapped = ls.mapped;
        ls.mapped = buffer.is_some();
        if let Some(buffer) = buffer {
            buffer.release();
        }

        let wants_keyboard = ls.keyboard_interactivity != KeyboardInteractivity::None;
        match (was_mapped, ls.mapped) {
            (false, true) if wants_keyboard => state.backend.focus_layer(surface),
            (true, false) => state.backend.unfocus_layer(surface),
            _ => {}
        }
    }

    let Some(ls) = state.layer_surface_mut(surface) else {
        return;
    };

    if !ls.needs_configure {
        return;
    }
    let Some(m) = ls.monitor else {
        return;
    };
    let surface_id = ls.wl_surface.id();
    let Some(output) = state.server.monitor(m).map(|mon| mon.geometry) else {
        return;
    };

    let serial = state.backend.next_serial();
    let Some(ls) = state
        .layer_surfaces
        .iter_mut()
        .find(|ls| ls.wl_surface.id() == surface_id)
    else {
        return;
    };
    ls.geometry = layer_geometry(
        output,
        ls.anchor,
        ls.margin,
        (ls.desired_width as i32, ls.desired_height as i32),
    );
    ls.configured = true;
    ls.needs_configure = false;
    ls.layer_surface.configure(
        serial,
        ls.geometry.width.max(0) as u32,
        ls.geometry.height.max(0) as u32,
    );
    log::debug!(
        "[layer_shell] Configured '{}' at {:?}",
        ls.namespace,
        ls.geometry
    );

    state.update_window_area(m);
}

pub fn remove_layer_surface(state: &mut State, surface: &WlSurface) {
    let surface_id = surface.id();
    let Some(pos) = state
        .layer_surfaces
        .iter()
        .position(|ls| ls.wl_surface.id() == surface_id)
    else {
        return;
    };
    let ls = state.layer_surfaces.swap_remove(pos);
    state.backend.unfocus_layer(surface);
    log::debug!(
        "[layer_shell] Removing layer surface {} (namespace: {})",
        ls.id,
        ls.namespace
    );
    if let Some(m) = ls.monitor {
        state.update_window_area(m);
    }
}

/// Places a layer surface on `output`. A zero dimension stretches across the
/// output between the margins; otherwise the surface sits against its
/// anchored edge, or centered when anchored to neither or both.
pub fn layer_geometry(
    output: Rectangle,
    anchor: Anchor,
    margin: (i32, i32, i32, i32),
    desired: (i32, i32),
) -> Rectangle {
    let (top, right, bottom, left) = margin;

    let (x, width) = place(
        desired.0,
        output.width,
        anchor.contains(Anchor::Left),
        anchor.contains(Anchor::Right),
        left,
        right,
    );
    let (y, height) = place(
        desired.1,
        output.height,
        anchor.contains(Anchor::Top),
        anchor.contains(Anchor::Bottom),
        top,
        bottom,
    );

    Rectangle::new(output.x + x, output.y + y, width, height)
}

fn place(size: i32, total: i32, start: bool, end: bool, m_start: i32, m_end: i32) -> (i32, i32) {
    if size == 0 {
        return (m_start, (total - m_start - m_end).max(0));
    }
    let offset = match (start, end) {
        (true, false) => m_start,
        (false, true) => total - size - m_end,
        _ => (total - size) / 2,
    };
    (offset, size)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: Rectangle = Rectangle {
        x: 1920,
        y: 0,
        width: 1920,
        height: 1080,
    };

    #[test]
    fn top_bar_stretches_across() {
        let anchor = Anchor::Top | Anchor::Left | Anchor::Right;
        let g = layer_geometry(OUTPUT, anchor, (0, 0, 0, 0), (0, 30));
        assert_eq!(g, Rectangle::new(1920, 0, 1920, 30));
    }

    #[test]
    fn bottom_anchor_keeps_margin() {
        let g = layer_geometry(OUTPUT, Anchor::Bottom, (0, 0, 8, 0), (400, 40));
        assert_eq!(g, Rectangle::new(1920 + 760, 1032, 400, 40));
    }

    #[test]
    fn unanchored_surface_is_centered() {
        let g = layer_geometry(OUTPUT, Anchor::empty(), (0, 0, 0, 0), (600, 400));
        assert_eq!(g, Rectangle::new(1920 + 660, 340, 600, 400));
    }

    #[test]
    fn zero_size_fills_between_margins() {
        let g = layer_geometry(OUTPUT, Anchor::Left, (10, 0, 10, 5), (50, 0));
        assert_eq!(g, Rectangle::new(1925, 10, 50, 1060));
    }
}
