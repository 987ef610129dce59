//! Window-management policy for the ktile compositor: the window model,
//! master-stack tiling, chord keybindings, actions and pointer grabs.
//!
//! Everything here is protocol-agnostic. The `ktile` binary drives a
//! [`Server`] from Wayland, libinput and the control socket through the
//! [`Backend`] trait.

pub mod action;
pub mod backend;
pub mod chord;
pub mod config;
pub mod error;
pub mod interaction;
pub mod keys;
pub mod layout;
pub mod properties;
pub mod server;

pub use action::{Action, Command, Payload, PayloadMode};
pub use backend::{Backend, Observer};
pub use chord::{ChordBinding, ChordMatcher, ChordOutcome};
pub use config::Config;
pub use error::{Error, Result};
pub use interaction::{Grab, GrabMode};
pub use keys::{KeyStep, Modifiers};
pub use layout::{Rectangle, TilingMode, TilingParams};
pub use server::{Monitor, MonitorId, Server, SizeHints, View, ViewId, Workspace, WorkspaceId};
