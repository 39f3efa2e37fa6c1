//! The script host: one interpreter, one active script.
//!
//! A jam script is a Rhai file that evaluates to an object map. Function
//! pointer properties of that map are the script's handlers:
//!
//! ```rhai
//! fn tick(io) {
//!     if io.on(0.5, 0.0) {
//!         this.step += 1;
//!         io.noteout(60 + this.step % 12, 100, 0.25);
//!     }
//! }
//!
//! #{
//!     step: 0,
//!     init: |io| { io.ch = 2; },
//!     tick: Fn("tick"),
//!     notein: |io, note, velocity| { io.noteout(note + 12, velocity); },
//! }
//! ```
//!
//! Handlers are called with `this` bound to the map and `io` as their first
//! argument, followed by any event arguments. Every call into the interpreter
//! goes through [`ScriptHost::call`], the only place interpreter errors are
//! turned into [`ScriptError`]s; tick and event failures are reported and
//! swallowed there, load failures are reported and returned.

use crate::config::BridgeConfig;
use crate::engine::{create_engine, module_resolver, prepend_script_dir};
use crate::error::{Result, ScriptError};
use crate::io::{write, Io};
use crate::marshal::atom_to_dynamic;
use crate::message::{Atom, InfoEvent};
use crate::outlets::HostOutlets;
use crate::router::handler_candidates;
use crate::timing::Transport;
use rhai::{CallFnOptions, Dynamic, Engine, FnPtr, Map, Scope, AST};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// A successfully executed script.
struct LoadedScript {
    path: PathBuf,
    ast: AST,
    scope: Scope<'static>,
    /// The map the script evaluated to, bound as `this` in handlers.
    jam: Dynamic,
}

/// Owns the interpreter of one bridge and the script loaded into it.
pub struct ScriptHost {
    name: String,
    engine: Engine,
    search_path: Vec<PathBuf>,
    transport: Arc<RwLock<Transport>>,
    outlets: Arc<dyn HostOutlets>,
    io: Io,
    script: Option<LoadedScript>,
}

impl ScriptHost {
    /// Create a host with an empty interpreter.
    pub fn new(
        config: &BridgeConfig,
        transport: Arc<RwLock<Transport>>,
        outlets: Arc<dyn HostOutlets>,
    ) -> Self {
        let mut engine = create_engine(config, outlets.clone());
        let search_path = config.search_path.clone();
        engine.set_module_resolver(module_resolver(&search_path));
        let io = Io::new(transport.clone(), outlets.clone());

        Self {
            name: config.name.clone(),
            engine,
            search_path,
            transport,
            outlets,
            io,
            script: None,
        }
    }

    /// Whether a script is currently active.
    pub fn is_loaded(&self) -> bool {
        self.script.is_some()
    }

    /// Path of the active script.
    pub fn script_path(&self) -> Option<&Path> {
        self.script.as_ref().map(|s| s.path.as_path())
    }

    /// The map the active script evaluated to.
    pub fn record(&self) -> Option<&Dynamic> {
        self.script.as_ref().map(|s| &s.jam)
    }

    /// Current module search path, most specific first.
    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// The capability object handed to the active script.
    pub fn io(&self) -> &Io {
        &self.io
    }

    /// Load a script, replacing the active one, and run its `init` handler.
    ///
    /// If the file fails to execute or does not evaluate to a map, the
    /// previous script stays active. If `init` fails, the new script stays
    /// installed so a corrected reload can follow.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        log::debug!("loading script {}", path.display());

        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            prepend_script_dir(&mut self.search_path, dir);
            // A fresh resolver also drops cached helper modules.
            self.engine.set_module_resolver(module_resolver(&self.search_path));
        }

        let result = self.execute(path).and_then(|()| self.init());
        match &result {
            Ok(()) => {
                self.outlets.info(InfoEvent::Loaded);
                self.outlets.post(&format!("{}: loaded {}", self.name, path.display()));
                log::info!("loaded {}", path.display());
            }
            Err(err) => {
                let (context, message) = match err {
                    ScriptError::LoadExecFailed { message, .. } => {
                        (format!("load({})", path.display()), message.clone())
                    }
                    ScriptError::NotATable { found, .. } => (
                        format!("load({})", path.display()),
                        format!("script did not return a map (got {})", found),
                    ),
                    ScriptError::InitFailed(message) => ("init()".to_string(), message.clone()),
                    other => ("load".to_string(), other.to_string()),
                };
                self.report(&context, &message, err, false);
            }
        }
        result
    }

    /// Compile and run the script file, then install its map and a fresh `io`.
    fn execute(&mut self, path: &Path) -> Result<()> {
        let exec_failed = |message: String| ScriptError::LoadExecFailed {
            path: path.to_path_buf(),
            message,
        };

        let ast = self
            .engine
            .compile_file(path.to_path_buf())
            .map_err(|e| exec_failed(e.to_string()))?;

        let mut scope = Scope::new();
        let value = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, &ast)
            .map_err(|e| exec_failed(e.to_string()))?;

        if !value.is_map() {
            return Err(ScriptError::NotATable {
                path: path.to_path_buf(),
                found: value.type_name().to_string(),
            });
        }

        self.script = Some(LoadedScript {
            path: path.to_path_buf(),
            ast,
            scope,
            jam: value,
        });
        self.io = Io::new(self.transport.clone(), self.outlets.clone());
        Ok(())
    }

    fn init(&mut self) -> Result<()> {
        match self.handler("init") {
            Some(init) => self.call(&init, Vec::new()).map_err(ScriptError::InitFailed),
            None => Ok(()),
        }
    }

    /// Run the `tick` handler, then advance the tick counter by one.
    ///
    /// Without a script or a `tick` handler this is a no-op and the counter
    /// stays where it is, so event-only scripts see a still clock.
    pub fn dispatch_tick(&mut self) {
        self.io.refresh_tick();

        let Some(tick) = self.handler("tick") else {
            return;
        };
        if let Err(message) = self.call(&tick, Vec::new()) {
            let err = ScriptError::TickFailed(message.clone());
            self.report("tick()", &message, &err, true);
        }

        write(&self.transport).advance();
    }

    /// Run the handler for `command`: `<command>in` if the script has one,
    /// `msgin` otherwise. Events nobody handles are ignored.
    pub fn dispatch_event(&mut self, command: &str, args: &[Atom]) {
        self.io.refresh_tick();
        if self.script.is_none() {
            return;
        }

        let resolved = handler_candidates(command)
            .into_iter()
            .find_map(|name| self.handler(&name).map(|fn_ptr| (name, fn_ptr)));
        let Some((handler, fn_ptr)) = resolved else {
            log::debug!("no handler for '{}'", command);
            return;
        };

        let args = args.iter().filter_map(atom_to_dynamic).collect();
        if let Err(message) = self.call(&fn_ptr, args) {
            let err = ScriptError::EventFailed {
                handler: handler.clone(),
                message: message.clone(),
            };
            self.report(&format!("{}()", handler), &message, &err, true);
        }
    }

    /// Look up a callable property of the active script's map.
    fn handler(&self, name: &str) -> Option<FnPtr> {
        let script = self.script.as_ref()?;
        let map = script.jam.read_lock::<Map>()?;
        let value = map.get(name)?.clone();
        value.try_cast::<FnPtr>()
    }

    /// Call a handler with `this` bound to the script map.
    ///
    /// The argument list is `io` followed by `args`, padded with `()` or
    /// truncated to the number of parameters the handler declares.
    fn call(&mut self, fn_ptr: &FnPtr, args: Vec<Dynamic>) -> std::result::Result<(), String> {
        let Some(script) = self.script.as_mut() else {
            return Ok(());
        };

        let mut call_args: Vec<Dynamic> = fn_ptr.curry().to_vec();
        call_args.push(Dynamic::from(self.io.clone()));
        call_args.extend(args);
        if let Some(arity) = declared_arity(&script.ast, fn_ptr.fn_name(), call_args.len()) {
            call_args.resize(arity, Dynamic::UNIT);
        }

        let options = CallFnOptions::new()
            .eval_ast(false)
            .rewind_scope(true)
            .bind_this_ptr(&mut script.jam);

        self.engine
            .call_fn_with_options::<Dynamic>(
                options,
                &mut script.scope,
                &script.ast,
                fn_ptr.fn_name(),
                call_args,
            )
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    /// Report a contained failure on the console and, for dispatch
    /// failures, as an `error` event on the info outlet.
    fn report(&self, context: &str, message: &str, err: &ScriptError, dispatch: bool) {
        log::warn!("{}", err);
        self.outlets
            .post(&format!("{}: error in {}: {}", self.name, context, message));
        if dispatch {
            self.outlets.info(InfoEvent::Error(message.to_string()));
        }
    }
}

/// Number of parameters the script function `name` declares.
///
/// Prefers an overload matching `supplied` exactly. Returns `None` when the
/// function is not defined in `ast` (e.g. it lives in an imported module).
fn declared_arity(ast: &AST, name: &str, supplied: usize) -> Option<usize> {
    let arities: Vec<usize> = ast
        .iter_functions()
        .filter(|f| f.name == name)
        .map(|f| f.params.len())
        .collect();
    if arities.contains(&supplied) {
        Some(supplied)
    } else {
        arities.first().copied()
    }
}
