use std::os::fd::AsFd;

use wayland_server::protocol::{
    wl_keyboard::{self, KeymapFormat, WlKeyboard},
    wl_pointer::{self, WlPointer},
    wl_seat::{self, WlSeat},
    wl_touch::{self, WlTouch},
};
use wayland_server::{Dispatch, GlobalDispatch, Resource};

use crate::state::State;

impl GlobalDispatch<WlSeat, ()> for State {
    fn bind(
        _state: &mut Self,
        _handle: &wayland_server::DisplayHandle,
        _client: &wayland_server::Client,
        resource: wayland_server::New<WlSeat>,
        _global_data: &(),
        data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
        let seat = data_init.init(resource, ());
        seat.capabilities(wl_seat::Capability::Pointer | wl_seat::Capability::Keyboard);
        if seat.version() >= 2 {
            seat.name("seat0".into());
        }
    }
}

impl Dispatch<WlSeat, ()> for State {
    fn request(
        state: &mut Self,
        _client: &wayland_server::Client,
        _resource: &WlSeat,
        request: wl_seat::Request,
        _data: &(),
        _dhandle: &wayland_server::DisplayHandle,
        data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
        match request {
            wl_seat::Request::GetPointer { id } => {
                let pointer = data_init.init(id, ());
                state.backend.pointers.push(pointer);
                log::debug!("[seat] Pointer created, total pointers: {}", state.backend.pointers.len());
            }
            wl_seat::Request::GetKeyboard { id } => {
                let keyboard = data_init.init(id, ());

                if let Some(keymap) = &state.keymap {
                    keyboard.keymap(KeymapFormat::XkbV1, keymap.fd.as_fd(), keymap.size);
                } else {
                    log::warn!("[seat] No keymap available to send to keyboard");
                }

                if keyboard.version() >= 4 {
                    let kb = &state.config.keyboard;
                    keyboard.repeat_info(kb.repeat_rate, kb.repeat_delay);
                }

                state.backend.enter_new_keyboard(&keyboard);
                state.backend.keyboards.push(keyboard);
                log::debug!("[seat] Keyboard created, total keyboards: {}", state.backend.keyboards.len());
            }
            wl_seat::Request::GetTouch { id } => {
                data_init.init(id, ());
            }
            _ => {}
        }
    }
}

impl Dispatch<WlPointer, ()> for State {
    fn request(
        _state: &mut Self,
        _client: &wayland_server::Client,
        _resource: &WlPointer,
        _request: wl_pointer::Request,
        _data: &(),
        _dhandle: &wayland_server::DisplayHandle,
        _data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
    }

    fn destroyed(
        state: &mut Self,
        _client: wayland_server::backend::ClientId,
        resource: &WlPointer,
        _data: &(),
    ) {
        state.backend.pointers.retain(|p| p.id() != resource.id());
    }
}

impl Dispatch<WlKeyboard, ()> for State {
    fn request(
        _state: &mut Self,
        _client: &wayland_server::Client,
        _resource: &WlKeyboard,
        _request: wl_keyboard::Request,
        _data: &(),
        _dhandle: &wayland_server::DisplayHandle,
        _data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
    }

    fn destroyed(
        state: &mut Self,
        _client: wayland_server::backend::ClientId,
        resource: &WlKeyboard,
        _data: &(),
    ) {
        state.backend.keyboards.retain(|k| k.id() != resource.id());
    }
}

impl Dispatch<WlTouch, ()> for State {
    fn request(
        _state: &mut Self,
        _client: &wayland_server::Client,
        _resource: &WlTouch,
        _request: wl_touch::Request,
        _data: &(),
        _dhandle: &wayland_server::DisplayHandle,
        _data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
    }
}
