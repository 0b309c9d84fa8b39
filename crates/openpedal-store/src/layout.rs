//! On-disk layout of the data directory.

use std::path::{Path, PathBuf};

use openpedal_calibration::Pedal;

const DATA_DIR_NAME: &str = ".openpedal";

/// Default data directory: `~/.openpedal`, or `./.openpedal` without a home directory.
pub fn default_data_dir() -> PathBuf {
    let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"));
    match home {
        Some(home) => PathBuf::from(home).join(DATA_DIR_NAME),
        None => PathBuf::from(DATA_DIR_NAME),
    }
}

/// Paths of every file the store manages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn calibration_file(&self) -> PathBuf {
        self.root.join("calibration.json")
    }

    pub fn axis_ranges_file(&self) -> PathBuf {
        self.root.join("axis_ranges.json")
    }

    pub fn axis_mappings_file(&self) -> PathBuf {
        self.root.join("axis_mappings.json")
    }

    pub fn curve_cache_file(&self) -> PathBuf {
        self.root.join("curve_cache.json")
    }

    pub fn curves_dir(&self) -> PathBuf {
        self.root.join("curves")
    }

    pub fn pedal_curves_dir(&self, pedal: Pedal) -> PathBuf {
        self.curves_dir().join(pedal.as_str())
    }

    /// Caller validates `name` first.
    pub fn curve_file(&self, pedal: Pedal, name: &str) -> PathBuf {
        self.pedal_curves_dir(pedal).join(format!("{name}.json"))
    }
}

impl Default for DataLayout {
    fn default() -> Self {
        Self::new(default_data_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let layout = DataLayout::new("/data");
        assert_eq!(layout.calibration_file(), PathBuf::from("/data/calibration.json"));
        assert_eq!(
            layout.curve_file(Pedal::Brake, "Trail Braking"),
            PathBuf::from("/data/curves/brake/Trail Braking.json")
        );
    }
}
