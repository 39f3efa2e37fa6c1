//! Rhai engine setup for jam scripts.
//!
//! Every bridge owns its own engine. The engine is sandboxed (no `eval`,
//! bounded work per call), routes `print()`/`debug()` to the bridge's
//! diagnostics console, and resolves `import` statements through an ordered
//! list of search directories.

use crate::config::BridgeConfig;
use crate::io;
use crate::outlets::HostOutlets;
use rhai::module_resolvers::{FileModuleResolver, ModuleResolversCollection};
use rhai::Engine;
use std::path::PathBuf;
use std::sync::Arc;

/// File extension of scripts and helper modules.
pub const SCRIPT_EXTENSION: &str = "rhai";

/// Create a sandboxed engine with the `io` API registered.
pub fn create_engine(config: &BridgeConfig, outlets: Arc<dyn HostOutlets>) -> Engine {
    let mut engine = Engine::new();

    // Bound the work a single handler call can do so a runaway script
    // fails with an error instead of stalling the host.
    engine.set_max_operations(config.max_operations);
    engine.set_max_call_levels(config.max_call_levels);
    engine.set_max_expr_depths(config.max_expr_depth, config.max_expr_depth);

    // Scripts only see what `io` gives them.
    engine.disable_symbol("eval");

    // print() and debug() never reach the message outlets, only the console.
    let name = config.name.clone();
    let print_outlets = outlets.clone();
    engine.on_print(move |text| {
        print_outlets.post(&format!("{}: {}", name, text));
    });

    let name = config.name.clone();
    engine.on_debug(move |text, source, pos| {
        let loc = match (source, pos) {
            (Some(src), pos) if !pos.is_none() => format!(" ({}:{})", src, pos),
            (Some(src), _) => format!(" ({})", src),
            (None, pos) if !pos.is_none() => format!(" ({})", pos),
            _ => String::new(),
        };
        outlets.post(&format!("{}:{} {}", name, loc, text));
    });

    io::register(&mut engine);

    engine
}

/// Build a module resolver that searches `search_path` in order.
pub fn module_resolver(search_path: &[PathBuf]) -> ModuleResolversCollection {
    let mut collection = ModuleResolversCollection::new();
    for dir in search_path {
        let mut resolver = FileModuleResolver::new_with_path(dir);
        resolver.set_extension(SCRIPT_EXTENSION);
        collection.push(resolver);
    }
    collection
}

/// Move `<dir>` and `<dir>/lib` to the front of `search_path`.
///
/// Entries already present are moved rather than duplicated, so repeated
/// reloads of the same script keep the list bounded.
pub fn prepend_script_dir(search_path: &mut Vec<PathBuf>, dir: &std::path::Path) {
    let front = [dir.to_path_buf(), dir.join("lib")];
    search_path.retain(|entry| !front.contains(entry));
    search_path.splice(0..0, front);
}
