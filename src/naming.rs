//! Output file naming based on the input file basename
//!
//! Every result file is prefixed with the input basename and placed next to
//! the input file, so several analyses can share one directory.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use conezen::naming::FileNaming;
//!
//! let naming = FileNaming::new(Path::new("runs/butadiene_ci1.inp"));
//! assert_eq!(naming.basename(), "butadiene_ci1");
//! assert_eq!(naming.parameters_txt(), Path::new("runs/butadiene_ci1_ci_parameters.txt"));
//! assert_eq!(naming.debug_log(), "conezen_debug_butadiene_ci1.log");
//! ```

use std::path::{Path, PathBuf};

/// Generates result file names for one input file
#[derive(Debug, Clone)]
pub struct FileNaming {
    basename: String,
    output_dir: PathBuf,
}

impl FileNaming {
    /// Creates the naming scheme for `input_path`
    ///
    /// The basename is the file stem; outputs go to the input's directory.
    pub fn new(input_path: &Path) -> Self {
        let basename = input_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("conezen")
            .to_string();
        let output_dir = input_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Self {
            basename,
            output_dir,
        }
    }

    /// Replaces the output directory
    pub fn with_output_dir(mut self, dir: &Path) -> Self {
        self.output_dir = dir.to_path_buf();
        self
    }

    /// Returns the basename used for file naming
    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Returns the directory results are written to
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn output(&self, suffix: &str) -> PathBuf {
        self.output_dir.join(format!("{}_{}", self.basename, suffix))
    }

    /// `{basename}_ci_parameters.txt`
    pub fn parameters_txt(&self) -> PathBuf {
        self.output("ci_parameters.txt")
    }

    /// `{basename}_ci_parameters.json`
    pub fn parameters_json(&self) -> PathBuf {
        self.output("ci_parameters.json")
    }

    /// `{basename}_x_vectors.out`
    pub fn x_vectors(&self) -> PathBuf {
        self.output("x_vectors.out")
    }

    /// `{basename}_y_vectors.out`
    pub fn y_vectors(&self) -> PathBuf {
        self.output("y_vectors.out")
    }

    /// `{basename}_surface.png`
    pub fn surface_png(&self) -> PathBuf {
        self.output("surface.png")
    }

    /// `{basename}_rotation.gif`
    pub fn rotation_gif(&self) -> PathBuf {
        self.output("rotation.gif")
    }

    /// Debug log file name, created in the working directory
    ///
    /// Format: `conezen_debug_{basename}.log`
    pub fn debug_log(&self) -> String {
        format!("conezen_debug_{}.log", self.basename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basename_extraction() {
        let naming = FileNaming::new(Path::new("/data/ci/s1s0.input"));
        assert_eq!(naming.basename(), "s1s0");
        assert_eq!(naming.output_dir(), Path::new("/data/ci"));
    }

    #[test]
    fn test_output_names() {
        let naming = FileNaming::new(Path::new("ci.inp"));
        assert_eq!(naming.x_vectors(), PathBuf::from("ci_x_vectors.out"));
        assert_eq!(naming.y_vectors(), PathBuf::from("ci_y_vectors.out"));
        assert_eq!(naming.surface_png(), PathBuf::from("ci_surface.png"));
        assert_eq!(naming.rotation_gif(), PathBuf::from("ci_rotation.gif"));
        assert_eq!(naming.parameters_json(), PathBuf::from("ci_ci_parameters.json"));
    }

    #[test]
    fn test_output_dir_override() {
        let naming = FileNaming::new(Path::new("in/ci.inp")).with_output_dir(Path::new("out"));
        assert_eq!(naming.parameters_txt(), PathBuf::from("out/ci_ci_parameters.txt"));
    }
}
