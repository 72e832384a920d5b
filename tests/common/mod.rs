#![allow(dead_code)]

pub mod fixtures {
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Root of the checked-in fixture tree.
    pub fn fixture_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
    }

    /// Copies `tests/fixtures/<name>` into a fresh temp dir so builds never touch the checkout.
    pub fn copy_fixture(name: &str) -> TempDir {
        let tmp = TempDir::new().unwrap();
        copy_dir(&fixture_root().join(name), &tmp.path().join(name));
        tmp
    }

    fn copy_dir(src: &Path, dest: &Path) {
        fs::create_dir_all(dest).unwrap();
        for entry in fs::read_dir(src).unwrap() {
            let entry = entry.unwrap();
            let target = dest.join(entry.file_name());
            if entry.file_type().unwrap().is_dir() {
                copy_dir(&entry.path(), &target);
            } else {
                fs::copy(entry.path(), &target).unwrap();
            }
        }
    }

    /// `<root>/modules/<module_type>/<Name>.<ext>`
    pub fn module_file(root: &Path, module_type: &str, file: &str) -> PathBuf {
        root.join("modules").join(module_type).join(file)
    }
}
