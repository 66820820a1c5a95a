//! Eidetic code-search MCP server.
//!
//! Speaks line-delimited JSON-RPC on stdin/stdout (spec.md §6): each line in
//! is `{"id", "method", "params"}`, each line out is `{"id", "result"}`.
//! Console logs go to stderr; stdout is reserved for protocol messages.
//!
//! ## Tools
//!
//! - `index_codebase` - scan, diff, split, embed, upsert a tree
//! - `search_code` - hybrid dense + lexical search with category boost and overlap dedup
//! - `clear_index` - drop a tree's collection and snapshot
//! - `get_indexing_status` - report a tree's run state
//! - `list_indexed` - list registered projects and their indexed state
//! - `read_file` - bounded line-range file read
//! - `browse_structure` - token-budgeted symbol overview of an indexed tree
//! - `list_symbols` - filtered symbol listing
//!
//! ## Usage
//!
//! Add to your MCP client configuration:
//! ```json
//! {
//!   "mcpServers": {
//!     "eidetic": {
//!       "command": "eidetic-mcp-server"
//!     }
//!   }
//! }
//! ```

use std::env;

mod app;
mod config;
mod error;
mod resolve;
mod rpc;
mod tools;

use app::AppState;
use config::AppConfig;

fn print_help() {
    println!("Eidetic code-search MCP server");
    println!();
    println!("Usage: eidetic-mcp-server [--version|--help]");
    println!();
    println!("Flags:");
    println!("  --version  Print version and exit");
    println!("  --help     Print this help and exit");
}

fn handle_cli_args() -> Option<i32> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        return None;
    }
    if args.len() == 1 {
        match args[0].as_str() {
            "--version" | "-V" => {
                println!("eidetic-mcp-server {}", env!("CARGO_PKG_VERSION"));
                return Some(0);
            }
            "--help" | "-h" => {
                print_help();
                return Some(0);
            }
            _ => {}
        }
    }
    eprintln!("Unknown arguments: {}", args.join(" "));
    print_help();
    Some(2)
}

#[tokio::main]
async fn main() {
    if let Some(exit_code) = handle_cli_args() {
        std::process::exit(exit_code);
    }

    // stdout is reserved for protocol messages (spec.md §6).
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("fatal startup error: {err}");
            std::process::exit(1);
        }
    };

    let state = match AppState::build(config).await {
        Ok(state) => state,
        Err(err) => {
            eprintln!("fatal startup error: {err}");
            std::process::exit(1);
        }
    };

    log::info!("eidetic-mcp-server ready, data root {}", state.data_root.display());

    let shutdown = wait_for_shutdown_signal();
    tokio::select! {
        result = rpc::serve(&state) => {
            if let Err(err) = result {
                eprintln!("fatal I/O error: {err}");
                std::process::exit(1);
            }
        }
        () = shutdown => {
            log::info!("shutting down on signal");
        }
    }

    log::info!("eidetic-mcp-server stopped");
    std::process::exit(0);
}

/// Orderly shutdown on SIGINT/SIGTERM exits 0 (spec.md §6 "Exit codes").
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("install SIGINT handler");
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
