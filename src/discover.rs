use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::MutationError;

pub const SOURCE_EXTENSION: &str = "sol";

/// Directories never scanned or copied.
const SKIP_NAMES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "out",
    "cache",
    "broadcast",
    "target",
    "mutation_reports",
];

const SKIP_SUFFIXES: &[&str] = &[".mutator.bak"];

/// Foundry test and script files. Mutating them says nothing about the tests.
const SKIP_SOURCE_SUFFIXES: &[&str] = &[".t.sol", ".s.sol"];

fn should_skip(name: &str) -> bool {
    SKIP_NAMES.iter().any(|s| *s == name) || SKIP_SUFFIXES.iter().any(|s| name.ends_with(s))
}

pub fn is_source_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    path.extension().and_then(|e| e.to_str()) == Some(SOURCE_EXTENSION)
        && !name.starts_with('.')
        && !SKIP_SOURCE_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Every source file under `root`, sorted.
pub fn discover_sources(root: &Path) -> Result<Vec<PathBuf>, MutationError> {
    let mut files = Vec::new();
    walk(root, &mut files)?;
    files.sort();
    debug!(root = %root.display(), found = files.len(), "discovered sources");
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), MutationError> {
    let discovery = |source| MutationError::Discovery {
        path: dir.to_path_buf(),
        source,
    };
    for entry in fs::read_dir(dir).map_err(discovery)? {
        let entry = entry.map_err(discovery)?;
        let name = entry.file_name();
        if should_skip(&name.to_string_lossy()) {
            continue;
        }
        let path = entry.path();
        let ft = entry.file_type().map_err(discovery)?;
        if ft.is_dir() {
            walk(&path, files)?;
        } else if ft.is_file() && is_source_file(&path) {
            files.push(path);
        }
    }
    Ok(())
}

/// Report name for `path`: relative to `root`, `/`-separated.
pub fn display_name(root: &Path, path: &Path) -> String {
    let Ok(rel) = path.strip_prefix(root) else {
        return path.to_string_lossy().into_owned();
    };
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn copy_dir_filtered(src: &Path, dst: &Path, extra_skip: Option<&Path>) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let name = entry.file_name();
        if should_skip(&name.to_string_lossy()) {
            continue;
        }
        let src_path = entry.path();
        if extra_skip == Some(src_path.as_path()) {
            continue;
        }
        let dst_path = dst.join(&name);
        let ft = entry.file_type()?;
        if ft.is_dir() {
            copy_dir_filtered(&src_path, &dst_path, extra_skip)?;
        } else if ft.is_file() {
            fs::copy(&src_path, &dst_path)?;
        }
        // Skip symlinks and other special files
    }
    Ok(())
}

/// Copy `project_root` into `dest_root` and map `source_file` into the copy.
///
/// `report_dir` is left out when it lives inside the project.
pub fn copy_project(
    project_root: &Path,
    source_file: &Path,
    dest_root: &Path,
    report_dir: Option<&Path>,
) -> Result<PathBuf, MutationError> {
    let copy_err = |source| MutationError::Copy {
        path: dest_root.to_path_buf(),
        source,
    };
    copy_dir_filtered(project_root, dest_root, report_dir).map_err(copy_err)?;
    let rel_source = source_file
        .strip_prefix(project_root)
        .map_err(|e| copy_err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;
    Ok(dest_root.join(rel_source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_skip_filters_correctly() {
        assert!(should_skip(".git"));
        assert!(should_skip("out"));
        assert!(should_skip("cache"));
        assert!(should_skip(".Token.sol.mutator.bak"));
        assert!(!should_skip("Token.sol"));
        assert!(!should_skip("src"));
        assert!(!should_skip("lib"));
    }

    #[test]
    fn display_name_is_relative() {
        assert_eq!(
            display_name(Path::new("/p/src"), Path::new("/p/src/tokens/ERC20.sol")),
            "tokens/ERC20.sol"
        );
        assert_eq!(display_name(Path::new("/other"), Path::new("/p/A.sol")), "/p/A.sol");
    }
}
