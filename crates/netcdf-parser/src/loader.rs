//! Cube loading with callbacks and constraints.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::constraint::Constraint;
use crate::cube::Cube;
use crate::error::{NetCdfError, NetCdfResult};

/// Source of cubes for a file path.
///
/// The production implementation is [`crate::NetCdfLoader`]; tests drive the
/// retrieval pipeline with a [`MemoryLoader`].
pub trait CubeLoader {
    /// Read every data variable in the file as a cube.
    fn load_file(&self, path: &Path) -> NetCdfResult<Vec<Cube>>;
}

impl<L: CubeLoader + ?Sized> CubeLoader for &L {
    fn load_file(&self, path: &Path) -> NetCdfResult<Vec<Cube>> {
        (**self).load_file(path)
    }
}

/// Load a file, run `callback` on each cube, then apply `constraint`.
///
/// The callback runs before the constraint so constraints can refer to
/// coordinates the callback adds (e.g. `year`).
pub fn load<L, F>(
    loader: &L,
    path: &Path,
    constraint: Option<&Constraint>,
    mut callback: F,
) -> NetCdfResult<Vec<Cube>>
where
    L: CubeLoader + ?Sized,
    F: FnMut(&mut Cube, &Path) -> NetCdfResult<()>,
{
    let raw = loader.load_file(path)?;
    let total = raw.len();
    let mut cubes = Vec::with_capacity(total);

    for mut cube in raw {
        callback(&mut cube, path)?;
        let cube = match constraint {
            Some(c) => c.extract(cube)?,
            None => Some(cube),
        };
        cubes.extend(cube);
    }

    debug!(
        path = %path.display(),
        loaded = total,
        matched = cubes.len(),
        "Loaded cubes from file"
    );
    Ok(cubes)
}

/// In-memory loader keyed by file path.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, Vec<Cube>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the cubes a path yields.
    pub fn insert<P: Into<PathBuf>>(&mut self, path: P, cubes: Vec<Cube>) {
        self.files.insert(path.into(), cubes);
    }

    pub fn with<P: Into<PathBuf>>(mut self, path: P, cubes: Vec<Cube>) -> Self {
        self.insert(path, cubes);
        self
    }
}

impl CubeLoader for MemoryLoader {
    fn load_file(&self, path: &Path) -> NetCdfResult<Vec<Cube>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| NetCdfError::MissingData(format!("no cubes for {}", path.display())))
    }
}
