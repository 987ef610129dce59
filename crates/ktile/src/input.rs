use input::event::keyboard::{KeyState, KeyboardEvent, KeyboardEventTrait};
use input::event::pointer::{Axis, ButtonState, PointerEvent, PointerScrollEvent};
use input::event::{DeviceEvent, Event, EventTrait};
use input::{Libinput, LibinputInterface};
use ktile::config::KeyboardConfig;
use ktile::Modifiers;
use std::fs::{File, OpenOptions};
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use xkbcommon::xkb;

struct Interface;

impl LibinputInterface for Interface {
    fn open_restricted(&mut self, path: &Path, flags: i32) -> Result<OwnedFd, i32> {
        OpenOptions::new()
            .custom_flags(flags)
            .read((flags & libc::O_RDWR != 0) || (flags & libc::O_ACCMODE == libc::O_RDONLY))
            .write(flags & libc::O_RDWR != 0)
            .open(path)
            .map(|file| file.into())
            .map_err(|err| err.raw_os_error().unwrap_or(-1))
    }

    fn close_restricted(&mut self, fd: OwnedFd) {
        drop(File::from(fd));
    }
}

pub fn compile_keymap(context: &xkb::Context, config: &KeyboardConfig) -> Option<xkb::Keymap> {
    xkb::Keymap::new_from_names(
        context,
        "",
        config.model.as_str(),
        config.layout.as_str(),
        "",
        if config.options.is_empty() {
            None
        } else {
            Some(config.options.clone())
        },
        xkb::KEYMAP_COMPILE_NO_FLAGS,
    )
}

/// Raw xkb modifier state, forwarded verbatim to clients.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModifierState {
    pub depressed: u32,
    pub latched: u32,
    pub locked: u32,
    pub group: u32,
}

pub enum InputEvent {
    Key {
        /// evdev code, as sent to clients.
        key: u32,
        pressed: bool,
        keysym: u32,
        /// Held modifiers only. Locks such as Caps and Num are left out so
        /// they never break a binding.
        modifiers: Modifiers,
        state: ModifierState,
    },
    PointerMotion {
        dx: f64,
        dy: f64,
    },
    /// Position as a fraction of the device range.
    PointerMotionAbsolute {
        x: f64,
        y: f64,
    },
    PointerButton {
        button: u32,
        pressed: bool,
    },
    PointerAxis {
        horizontal: f64,
        vertical: f64,
    },
}

pub struct InputHandler {
    libinput: Libinput,
    xkb_state: xkb::State,
}

impl InputHandler {
    pub fn new(keymap: &xkb::Keymap) -> Result<Self, Box<dyn std::error::Error>> {
        let mut libinput = Libinput::new_with_udev(Interface);
        libinput
            .udev_assign_seat("seat0")
            .map_err(|_| "Failed to assign udev seat")?;

        Ok(InputHandler {
            libinput,
            xkb_state: xkb::State::new(keymap),
        })
    }

    pub fn dispatch(&mut self) -> std::io::Result<()> {
        self.libinput.dispatch()
    }

    pub fn process_events<F>(&mut self, mut callback: F)
    where
        F: FnMut(InputEvent),
    {
        let events: Vec<Event> = (&mut self.libinput).collect();
        for event in events {
            match event {
                Event::Keyboard(KeyboardEvent::Key(key_event)) => {
                    let pressed = key_event.key_state() == KeyState::Pressed;
                    callback(self.translate_key(key_event.key(), pressed));
                }
                Event::Pointer(pointer_event) => {
                    if let Some(ev) = translate_pointer(pointer_event) {
                        callback(ev);
                    }
                }
                Event::Device(DeviceEvent::Added(added)) => {
                    log::info!("[input] Device added: {}", added.device().name());
                }
                Event::Device(DeviceEvent::Removed(removed)) => {
                    log::info!("[input] Device removed: {}", removed.device().name());
                }
                _ => {}
            }
        }
    }

    fn translate_key(&mut self, key: u32, pressed: bool) -> InputEvent {
        let keycode = xkb::Keycode::from(key + 8);

        // The keysym is read before the update so a modifier key reports
        // the state it was pressed in.
        let keysym = self.xkb_state.key_get_one_sym(keycode).raw();
        let held = self.xkb_state.serialize_mods(xkb::STATE_MODS_DEPRESSED)
            | self.xkb_state.serialize_mods(xkb::STATE_MODS_LATCHED);
        self.xkb_state.update_key(
            keycode,
            if pressed {
                xkb::KeyDirection::Down
            } else {
                xkb::KeyDirection::Up
            },
        );

        let state = ModifierState {
            depressed: self.xkb_state.serialize_mods(xkb::STATE_MODS_DEPRESSED),
            latched: self.xkb_state.serialize_mods(xkb::STATE_MODS_LATCHED),
            locked: self.xkb_state.serialize_mods(xkb::STATE_MODS_LOCKED),
            group: self.xkb_state.serialize_layout(xkb::STATE_LAYOUT_EFFECTIVE),
        };
        let modifiers = binding_modifiers(held, state.depressed | state.latched);

        InputEvent::Key {
            key,
            pressed,
            keysym,
            modifiers,
            state,
        }
    }

    pub fn as_fd(&self) -> BorrowedFd<'_> {
        self.libinput.as_fd()
    }
}

/// A latched modifier is cleared by the press it applies to, so bindings
/// see the union of the state before and after the key.
fn binding_modifiers(before: u32, after: u32) -> Modifiers {
    Modifiers::from_bits(before | after)
}

fn translate_pointer(event: PointerEvent) -> Option<InputEvent> {
    match event {
        PointerEvent::Motion(ev) => Some(InputEvent::PointerMotion {
            dx: ev.dx(),
            dy: ev.dy(),
        }),
        PointerEvent::MotionAbsolute(ev) => Some(InputEvent::PointerMotionAbsolute {
            x: ev.absolute_x_transformed(1),
            y: ev.absolute_y_transformed(1),
        }),
        PointerEvent::Button(ev) => Some(InputEvent::PointerButton {
            button: ev.button(),
            pressed: ev.button_state() == ButtonState::Pressed,
        }),
        PointerEvent::ScrollWheel(ev) => Some(scroll(&ev)),
        PointerEvent::ScrollFinger(ev) => Some(scroll(&ev)),
        PointerEvent::ScrollContinuous(ev) => Some(scroll(&ev)),
        _ => None,
    }
}

fn scroll<E: PointerScrollEvent>(ev: &E) -> InputEvent {
    let value = |axis: Axis| {
        if ev.has_axis(axis) {
            ev.scroll_value(axis)
        } else {
            0.0
        }
    };
    InputEvent::PointerAxis {
        horizontal: value(Axis::Horizontal),
        vertical: value(Axis::Vertical),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latched_modifier_applies_to_next_key() {
        // Sticky Super latched, then a plain key clears the latch.
        let mods = binding_modifiers(Modifiers::SUPER.bits(), 0);
        assert_eq!(mods, Modifiers::SUPER);
    }

    #[test]
    fn pressed_modifier_counts_on_its_own_press() {
        let mods = binding_modifiers(0, Modifiers::CTRL.bits());
        assert_eq!(mods, Modifiers::CTRL);
        let mods = binding_modifiers(Modifiers::SHIFT.bits(), Modifiers::SHIFT.bits());
        assert_eq!(mods, Modifiers::SHIFT);
    }
}
