//! Test fixtures shared across modules.

use std::fs::File;
use std::path::Path;

use tempfile::TempDir;

/// Build a temporary media tree from `(relative folder, file names)`
/// pairs. An empty folder name is the root itself. Files are created
/// empty; only names matter to the engine.
///
/// Keep the returned `TempDir` alive for the duration of the test.
pub fn media_tree(folders: &[(&str, &[&str])]) -> TempDir {
    let dir = tempfile::tempdir().expect("failed to create temp directory");
    for (folder, files) in folders {
        let folder_path = if folder.is_empty() {
            dir.path().to_path_buf()
        } else {
            dir.path().join(folder)
        };
        std::fs::create_dir_all(&folder_path).expect("failed to create folder");
        for file in *files {
            touch(&folder_path.join(file));
        }
    }
    dir
}

fn touch(path: &Path) {
    File::create(path).expect("failed to create file");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_tree_layout() {
        let dir = media_tree(&[("", &["root.jpg"]), ("sub/deep", &["a.jpg", "b.mp4"])]);
        assert!(dir.path().join("root.jpg").is_file());
        assert!(dir.path().join("sub/deep/a.jpg").is_file());
        assert!(dir.path().join("sub/deep/b.mp4").is_file());
    }
}
