pub mod ipc;
pub mod logging;
pub mod paths;

pub use ipc::{ipc_socket_path, IpcEvent, IpcRequest, IpcResponse};
pub use logging::{AppLogger, FileLogger};
pub use paths::{
    config_dir, data_dir, ktile_config_dir, ktile_config_file, ktile_data_dir, ktile_log_dir,
};
