use crate::config;
use crate::ipc::error::ok;
use crate::ipc::helpers::engine_err;
use crate::ipc::types::{AppState, Request};

fn handle_config_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, state.config.describe())
}

fn handle_config_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    match config::apply_update(&mut state.config, &req.params) {
        Ok(()) => ok(&req.id, state.config.describe()),
        Err(e) => engine_err(req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "config.get" => Some(handle_config_get(state, req)),
        "config.update" => Some(handle_config_update(state, req)),
        _ => None,
    }
}
