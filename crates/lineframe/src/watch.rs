//! File watching for the shader sources.
//!
//! Parent directories are watched rather than the files themselves. Editors
//! that save by renaming a temporary file over the target replace the watched
//! inode.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crossbeam_channel::{Receiver, Sender};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use crate::error::WatchError;
use crate::program::ShaderPaths;

#[derive(Debug, Clone, PartialEq, Eq)]
struct WatchTarget {
    resolved: PathBuf,
    configured: PathBuf,
}

/// Keeps a notify watcher alive; dropping it disconnects the notifications.
pub struct ShaderWatcher {
    _watcher: RecommendedWatcher,
    directories: Vec<PathBuf>,
}

impl std::fmt::Debug for ShaderWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderWatcher")
            .field("directories", &self.directories)
            .finish_non_exhaustive()
    }
}

impl ShaderWatcher {
    /// Calls `on_change` with the configured path of every shader file that
    /// changes. The callback runs on notify's thread.
    pub fn with_callback<F>(paths: &ShaderPaths, mut on_change: F) -> Result<Self, WatchError>
    where
        F: FnMut(&Path) + Send + 'static,
    {
        let targets = vec![
            resolve_target(&paths.vertex),
            resolve_target(&paths.fragment),
        ];
        let directories: BTreeSet<PathBuf> = targets
            .iter()
            .filter_map(|target| target.resolved.parent().map(Path::to_path_buf))
            .collect();

        let handler_targets = targets.clone();
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) => {
                    if !is_content_change(&event.kind) {
                        return;
                    }
                    for path in changed_targets(&event.paths, &handler_targets) {
                        debug!(path = %path.display(), "shader source changed");
                        on_change(path);
                    }
                }
                Err(err) => warn!(error = %err, "file watcher error"),
            }
        })
        .map_err(WatchError::Create)?;

        for directory in &directories {
            watcher
                .watch(directory, RecursiveMode::NonRecursive)
                .map_err(|source| WatchError::Watch {
                    path: directory.display().to_string(),
                    source,
                })?;
            debug!(directory = %directory.display(), "watching shader directory");
        }

        Ok(Self {
            _watcher: watcher,
            directories: directories.into_iter().collect(),
        })
    }

    /// Forwards changed paths into a channel for polling from another thread.
    pub fn with_channel(paths: &ShaderPaths) -> Result<(Self, Receiver<PathBuf>), WatchError> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let watcher = Self::with_callback(paths, forward_to(sender))?;
        Ok((watcher, receiver))
    }

    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }
}

fn forward_to(sender: Sender<PathBuf>) -> impl FnMut(&Path) + Send + 'static {
    move |path| {
        if sender.send(path.to_path_buf()).is_err() {
            debug!("shader change receiver dropped");
        }
    }
}

fn is_content_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any
    )
}

/// Absolute form of `path` used for comparison with event paths. Falls back to
/// the path as given when the directory cannot be resolved yet.
fn resolve_target(path: &Path) -> WatchTarget {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let resolved_parent = parent.canonicalize().unwrap_or(parent);
    let resolved = match path.file_name() {
        Some(name) => resolved_parent.join(name),
        None => resolved_parent,
    };
    WatchTarget {
        resolved,
        configured: path.to_path_buf(),
    }
}

/// Configured paths of the targets touched by an event, each at most once.
fn changed_targets<'a>(event_paths: &[PathBuf], targets: &'a [WatchTarget]) -> Vec<&'a Path> {
    targets
        .iter()
        .filter(|target| event_paths.iter().any(|path| *path == target.resolved))
        .map(|target| target.configured.as_path())
        .collect()
}
