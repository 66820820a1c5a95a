//! `eidetic-stop-hook`: editor `Stop`-event hook (spec.md §6). Reads a JSON
//! hook payload on stdin, turns the session's shadow git index into a
//! commit, and dispatches a detached targeted reindex for whatever files
//! that commit touched. Always emits `{}` on stdout, regardless of which
//! branch ran — the hook's job is side effects, not a response body.

use eidetic_shadow_index::hook::{process_stop_event, spawn_detached_targeted_reindex, HookInput};
use std::io::Read;
use std::path::PathBuf;

const TARGETED_REINDEX_BIN: &str = "eidetic-targeted-reindex";

fn targeted_reindex_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(TARGETED_REINDEX_BIN)))
        .unwrap_or_else(|| PathBuf::from(TARGETED_REINDEX_BIN))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let mut raw = String::new();
    if let Err(err) = std::io::stdin().read_to_string(&mut raw) {
        log::warn!("failed to read stop-hook stdin: {err}");
        println!("{{}}");
        return;
    }

    let input: HookInput = match serde_json::from_str(&raw) {
        Ok(input) => input,
        Err(err) => {
            log::warn!("malformed stop-hook payload: {err}");
            println!("{{}}");
            return;
        }
    };

    if input.hook_event_name != "Stop" {
        log::debug!("ignoring non-Stop hook event {:?}", input.hook_event_name);
        println!("{{}}");
        return;
    }

    let manifest_dir = std::env::temp_dir();
    let reindexer = targeted_reindex_path();

    match process_stop_event(&input, &manifest_dir, |manifest_path| {
        spawn_detached_targeted_reindex(&reindexer, manifest_path);
    }) {
        Ok(outcome) => log::debug!("stop-hook outcome for session {}: {outcome:?}", input.session_id),
        Err(err) => log::warn!("stop-hook failed for session {}: {err}", input.session_id),
    }

    println!("{{}}");
}
