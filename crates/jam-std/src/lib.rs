//! jam Standard Library.
//!
//! Helper modules for jam scripts: euclidean rhythms, scales and arpeggios.
//! They are imported from inside handlers like any co-located helper:
//!
//! ```rhai
//! #{
//!     tick: |io| {
//!         import "scales" as scales;
//!         if io.on(0.5) {
//!             this.step += 1;
//!             io.noteout(scales::note(48, "minor", this.step), 100, 0.25);
//!         }
//!     },
//!     step: 0,
//! }
//! ```
//!
//! The embedded files are extracted once per version to
//! `<data dir>/jam/stdlib/`; [`module_dir`] is the directory to put on a
//! bridge's search path.

use include_dir::{include_dir, Dir};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Embedded stdlib directory (compiled into the binary)
static STDLIB_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/stdlib");

/// Cached stdlib path
static STDLIB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Names of the bundled helper modules.
pub const MODULES: &[&str] = &["arp", "euclid", "scales"];

/// Get the path to the extracted stdlib.
///
/// On first call, the embedded files are extracted to the user's data
/// directory unless the same version is already there.
pub fn stdlib_path() -> &'static Path {
    STDLIB_PATH.get_or_init(|| {
        let path = install_path();
        ensure_extracted(&path);
        path
    })
}

/// Directory holding the importable helper modules.
pub fn module_dir() -> PathBuf {
    stdlib_path().join("lib")
}

/// Source of a bundled module, without touching the filesystem.
pub fn module_source(name: &str) -> Option<&'static str> {
    STDLIB_DIR
        .get_file(format!("lib/{}.rhai", name))
        .and_then(|file| file.contents_utf8())
}

fn install_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".local/share"))
                .unwrap_or_else(|| PathBuf::from("."))
        })
        .join("jam")
        .join("stdlib")
}

fn ensure_extracted(target_path: &Path) {
    let current_version = env!("CARGO_PKG_VERSION");
    if target_path.join("lib").is_dir() {
        let installed = std::fs::read_to_string(target_path.join(".version")).unwrap_or_default();
        if installed.trim() == current_version {
            return;
        }
        log::info!(
            "Updating stdlib to version {} in {}",
            current_version,
            target_path.display()
        );
    } else {
        log::info!("Extracting stdlib to {}", target_path.display());
    }

    if let Err(e) = extract(target_path) {
        log::warn!("Failed to extract stdlib: {}", e);
        log::warn!("Helper modules can still be added with -I");
    }
}

fn extract(target_path: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(target_path)?;
    extract_dir(&STDLIB_DIR, target_path)?;
    std::fs::write(target_path.join(".version"), env!("CARGO_PKG_VERSION"))?;
    Ok(())
}

fn extract_dir(dir: &Dir, target_path: &Path) -> std::io::Result<()> {
    for file in dir.files() {
        let file_path = target_path.join(file.path());
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&file_path, file.contents())?;
    }

    for subdir in dir.dirs() {
        extract_dir(subdir, target_path)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhai::{Array, Engine};

    /// Evaluate `expr` in a script that defines the functions of `module`.
    fn eval<T: Clone + Send + Sync + 'static>(module: &str, expr: &str) -> T {
        let source = module_source(module).unwrap();
        Engine::new()
            .eval::<T>(&format!("{}\n{}", source, expr))
            .unwrap()
    }

    #[test]
    fn test_every_module_is_embedded() {
        for name in MODULES {
            assert!(module_source(name).is_some(), "missing {}", name);
        }
        assert!(module_source("nope").is_none());
    }

    #[test]
    fn test_extract_writes_modules_and_version() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("stdlib");
        extract(&target).unwrap();
        assert!(target.join("lib/euclid.rhai").is_file());
        assert_eq!(
            std::fs::read_to_string(target.join(".version")).unwrap(),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn test_euclid_tresillo() {
        let hits: Array = eval("euclid", "pattern(3, 8)");
        let hits: Vec<bool> = hits.into_iter().map(|v| v.as_bool().unwrap()).collect();
        assert_eq!(hits, vec![true, false, false, true, false, false, true, false]);
        assert!(eval::<bool>("euclid", "hit(3, 8, 11)"));
        assert!(eval::<bool>("euclid", "hit(3, 8, -2)"));
        assert!(!eval::<bool>("euclid", "hit(0, 8, 0)"));
    }

    #[test]
    fn test_scale_degrees_wrap() {
        assert_eq!(eval::<i64>("scales", "note(60, \"major\", 0)"), 60);
        assert_eq!(eval::<i64>("scales", "note(60, \"major\", 7)"), 72);
        assert_eq!(eval::<i64>("scales", "note(60, \"major\", -1)"), 59);
        assert_eq!(eval::<i64>("scales", "note(48, \"minor\", 2)"), 51);
    }

    #[test]
    fn test_arp_directions() {
        let ups: Array = eval("arp", "[0, 1, 2, 3].map(|s| up([60, 64, 67], s))");
        let downs: Array = eval("arp", "[0, 1, 2, 3].map(|s| down([60, 64, 67], s))");
        let both: Array = eval("arp", "[0, 1, 2, 3, 4].map(|s| updown([60, 64, 67], s))");
        let ints = |a: Array| a.into_iter().map(|v| v.as_int().unwrap()).collect::<Vec<_>>();
        assert_eq!(ints(ups), vec![60, 64, 67, 60]);
        assert_eq!(ints(downs), vec![67, 64, 60, 67]);
        assert_eq!(ints(both), vec![60, 64, 67, 64, 60]);
        assert!(eval::<rhai::Dynamic>("arp", "up([], 3)").is_unit());
    }
}
