use ktile::MonitorId;
use wayland_server::protocol::wl_output::{self, WlOutput};
use wayland_server::{Dispatch, GlobalDispatch, Resource};

use crate::state::State;

const REFRESH_MHZ: i32 = 60_000;

/// One global per model monitor. The global and every bound resource carry
/// the monitor's handle so layer surfaces can find their output.
impl GlobalDispatch<WlOutput, MonitorId> for State {
    fn bind(
        state: &mut Self,
        _handle: &wayland_server::DisplayHandle,
        _client: &wayland_server::Client,
        resource: wayland_server::New<WlOutput>,
        global_data: &MonitorId,
        data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
        let output = data_init.init(resource, *global_data);
        let Some(monitor) = state.server.monitor(*global_data) else {
            return;
        };
        let g = monitor.geometry;

        output.geometry(
            g.x,
            g.y,
            0,
            0,
            wl_output::Subpixel::Unknown,
            "ktile".into(),
            monitor.name.clone(),
            wl_output::Transform::Normal,
        );
        output.mode(
            wl_output::Mode::Current | wl_output::Mode::Preferred,
            g.width,
            g.height,
            REFRESH_MHZ,
        );
        if output.version() >= 2 {
            output.scale(1);
        }
        if output.version() >= 4 {
            output.name(monitor.name.clone());
        }
        if output.version() >= 2 {
            output.done();
        }
    }
}

impl Dispatch<WlOutput, MonitorId> for State {
    fn request(
        _state: &mut Self,
        _client: &wayland_server::Client,
        _resource: &WlOutput,
        _request: wl_output::Request,
        _data: &MonitorId,
        _dhandle: &wayland_server::DisplayHandle,
        _data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
    }
}
