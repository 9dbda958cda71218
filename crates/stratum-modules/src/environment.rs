//! Module search directories.

use std::path::PathBuf;

use stratum_core::{Dictionary, Value};

/// Dictionary key whose list entries extend the module search path.
pub const SEARCH_PATH_KEY: &str = "LD_LIBRARY_PATH";

/// Ordered list of directories searched for module files.
///
/// Directories added later take precedence: [`add_directory`]
/// (ModuleEnvironment::add_directory) prepends, and adding a directory
/// that is already present is a no-op, keeping its original priority.
#[derive(Clone, Debug, Default)]
pub struct ModuleEnvironment {
    directories: Vec<PathBuf>,
}

impl ModuleEnvironment {
    /// An empty search path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend `directory` to the search path unless already present.
    pub fn add_directory(&mut self, directory: impl Into<PathBuf>) {
        let directory = directory.into();
        if self.directories.contains(&directory) {
            return;
        }
        log::debug!("module search path += {}", directory.display());
        self.directories.insert(0, directory);
    }

    /// Add every string entry of the dictionary's search-path list.
    pub fn load_directories_from(&mut self, dict: &Dictionary) {
        let Some(entries) = dict.get_list(SEARCH_PATH_KEY) else {
            return;
        };
        for entry in entries {
            if let Some(path) = Value::as_str(entry) {
                self.add_directory(path);
            }
        }
    }

    /// The search path, highest priority first.
    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_directory_prepends_and_dedups() {
        let mut env = ModuleEnvironment::new();
        env.add_directory("/usr/lib/stratum");
        env.add_directory("/home/user/modules");
        env.add_directory("/usr/lib/stratum");
        assert_eq!(
            env.directories(),
            [
                PathBuf::from("/home/user/modules"),
                PathBuf::from("/usr/lib/stratum")
            ]
        );
    }

    #[test]
    fn load_directories_from_dictionary_list() {
        let dict = Dictionary::from_json_str(
            r#"{"LD_LIBRARY_PATH": ["/opt/toolboxes", "/opt/plugins"]}"#,
        )
        .unwrap();
        let mut env = ModuleEnvironment::new();
        env.load_directories_from(&dict);
        // later entries end up first
        assert_eq!(
            env.directories(),
            [
                PathBuf::from("/opt/plugins"),
                PathBuf::from("/opt/toolboxes")
            ]
        );
    }
}
