//! Dot-path property namespace behind the IPC `get`/`set` requests.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::layout::{Rectangle, TilingMode, TilingParams};
use crate::server::Server;

const READ_ONLY: &[&str] = &["keybinds", "chord", "workspaces", "outputs"];

fn invalid(path: &str, reason: impl Into<String>) -> Error {
    Error::InvalidValue {
        path: path.to_string(),
        reason: reason.into(),
    }
}

fn encode<T: Serialize>(path: &str, value: T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::Encode {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

/// Parses `WxH` or `WxH+X+Y`.
pub fn parse_output_geometry(text: &str) -> Option<Rectangle> {
    let mut parts = text.trim().split('+');
    let (w, h) = parts.next()?.split_once('x')?;
    let width: i32 = w.parse().ok()?;
    let height: i32 = h.parse().ok()?;
    if width <= 0 || height <= 0 {
        return None;
    }
    let (x, y) = match (parts.next(), parts.next(), parts.next()) {
        (None, None, None) => (0, 0),
        (Some(x), Some(y), None) => (x.parse().ok()?, y.parse().ok()?),
        _ => return None,
    };
    Some(Rectangle::new(x, y, width, height))
}

impl Server {
    fn active_params(&self) -> TilingParams {
        self.active_workspace()
            .and_then(|(m, ws)| self.monitor(m)?.workspace(ws))
            .map(|w| w.params)
            .unwrap_or(self.defaults)
    }

    /// Applies to the active workspace, or to the defaults for future
    /// workspaces when no output is attached.
    fn update_active_params<F>(&mut self, backend: &mut dyn Backend, update: F)
    where
        F: FnOnce(&mut TilingParams),
    {
        if self.active_workspace().is_some() {
            self.update_params(backend, update);
        } else {
            update(&mut self.defaults);
        }
    }

    pub fn get_property(&self, path: &str) -> Result<Value> {
        match path {
            "tiling.mode" => Ok(json!(self.tiling_mode.to_string())),
            "tiling.gaps" => Ok(json!(self.gaps)),
            "tiling.master_count" => Ok(json!(self.active_params().master_count)),
            "tiling.master_factor" => Ok(json!(self.active_params().master_factor)),
            "tiling.right_master" => Ok(json!(self.active_params().right_master)),
            "keybinds" => {
                let map: Map<String, Value> = self
                    .bindings()
                    .map(|b| (b.pattern(), json!(b.action.args())))
                    .collect();
                Ok(Value::Object(map))
            }
            "chord" => Ok(json!(self.chord_progress())),
            "workspaces" => encode(path, self.workspaces_info()),
            "outputs" => {
                let outputs: Vec<_> = self.monitors.iter().map(|m| self.monitor_info(m)).collect();
                encode(path, outputs)
            }
            _ => {
                if let Some(pattern) = path.strip_prefix("keybinds.") {
                    let action = self.binding(pattern)?;
                    Ok(action.map_or(Value::Null, |a| json!(a.args())))
                } else if let Some(name) = path.strip_prefix("outputs.") {
                    let monitor = self
                        .monitor_by_name(name)
                        .ok_or_else(|| Error::UnknownOutput(name.to_string()))?;
                    encode(path, self.monitor_info(monitor))
                } else {
                    Err(Error::UnknownProperty(path.to_string()))
                }
            }
        }
    }

    pub fn set_property(&mut self, backend: &mut dyn Backend, path: &str, value: &Value) -> Result<()> {
        log::debug!("[property] set {} = {}", path, value);
        match path {
            "tiling.mode" => {
                let text = value
                    .as_str()
                    .ok_or_else(|| invalid(path, "expected a string"))?;
                let mode = text.parse::<TilingMode>().map_err(|e| invalid(path, e))?;
                self.set_tiling_mode(backend, mode);
            }
            "tiling.gaps" => {
                let gaps = value
                    .as_i64()
                    .ok_or_else(|| invalid(path, "expected an integer"))?;
                self.set_gaps(backend, gaps);
            }
            "tiling.master_count" => {
                let count = value
                    .as_i64()
                    .ok_or_else(|| invalid(path, "expected an integer"))?;
                self.update_active_params(backend, |p| p.set_master_count(count));
            }
            "tiling.master_factor" => {
                let factor = value
                    .as_f64()
                    .ok_or_else(|| invalid(path, "expected a number"))?;
                self.update_active_params(backend, |p| p.set_master_factor(factor));
            }
            "tiling.right_master" => {
                let right = value
                    .as_bool()
                    .ok_or_else(|| invalid(path, "expected a boolean"))?;
                self.update_active_params(backend, |p| p.right_master = right);
            }
            _ if READ_ONLY.contains(&path) => {
                return Err(Error::ReadOnlyProperty(path.to_string()));
            }
            _ => {
                if let Some(pattern) = path.strip_prefix("keybinds.") {
                    self.set_keybind(path, pattern, value)?;
                } else if let Some(name) = path.strip_prefix("outputs.") {
                    self.set_output(backend, path, name, value)?;
                } else {
                    return Err(Error::UnknownProperty(path.to_string()));
                }
            }
        }
        Ok(())
    }

    fn set_keybind(&mut self, path: &str, pattern: &str, value: &Value) -> Result<()> {
        match value {
            Value::Null => {
                self.unbind(pattern)?;
                Ok(())
            }
            Value::String(text) => {
                let args: Vec<&str> = text.split_whitespace().collect();
                self.bind(pattern, &args)
            }
            Value::Array(items) => {
                let args = items
                    .iter()
                    .map(|item| {
                        item.as_str()
                            .ok_or_else(|| invalid(path, "action arguments must be strings"))
                    })
                    .collect::<Result<Vec<_>>>()?;
                self.bind(pattern, &args)
            }
            _ => Err(invalid(path, "expected an argument array, a string or null")),
        }
    }

    fn set_output(
        &mut self,
        backend: &mut dyn Backend,
        path: &str,
        name: &str,
        value: &Value,
    ) -> Result<()> {
        let existing = self.monitor_by_name(name).map(|m| m.id);
        match value {
            Value::Null => {
                let m = existing.ok_or_else(|| Error::UnknownOutput(name.to_string()))?;
                self.monitor_detach(backend, m);
            }
            Value::String(text) => {
                let rect = parse_output_geometry(text)
                    .ok_or_else(|| invalid(path, "expected WxH or WxH+X+Y"))?;
                match existing {
                    Some(m) => self.monitor_set_geometry(backend, m, rect),
                    None => {
                        self.monitor_attach(backend, name, rect);
                    }
                }
            }
            Value::Bool(enabled) => {
                let m = existing.ok_or_else(|| Error::UnknownOutput(name.to_string()))?;
                let others = self.monitors.iter().any(|mon| mon.id != m && mon.enabled);
                if !enabled && !others {
                    return Err(invalid(path, "cannot disable the last enabled output"));
                }
                self.monitor_set_enabled(backend, m, *enabled);
            }
            _ => return Err(invalid(path, "expected a geometry string, a boolean or null")),
        }
        Ok(())
    }
}
