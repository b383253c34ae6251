use anyhow::{Result, Context, anyhow};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use log::debug;

// @module: File and directory utilities

// @const: Extensions treated as localization files
pub const LOCALIZATION_EXTENSIONS: [&str; 2] = ["yml", "yaml"];

// @const: Places a bare file name is looked up in when it does not exist as given
const FALLBACK_DIRS: [&str; 4] = [
    "/storage/emulated/0",
    "/sdcard",
    "/storage/emulated/0/Download",
    "/sdcard/Download",
];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    /// Resolve an input path, trying common download locations and the
    /// working directory when it does not exist as given
    pub fn locate_input<P: AsRef<Path>>(path: P) -> Option<PathBuf> {
        let path = path.as_ref();
        if path.exists() {
            return Some(path.to_path_buf());
        }
        if path.is_absolute() {
            return None;
        }

        let mut candidates: Vec<PathBuf> = FALLBACK_DIRS.iter().map(|d| Path::new(d).join(path)).collect();
        if let Ok(cwd) = std::env::current_dir() {
            candidates.push(cwd.join(path));
        }

        let found = candidates.into_iter().find(|c| c.exists());
        if let Some(found) = &found {
            debug!("Resolved {:?} to {:?}", path, found);
        }
        found
    }

    // @generates: Output path for a translated file, `<stem>_<lang><suffix>`
    // @params: input_file, output_dir (defaults to the input's directory), target_language
    pub fn generate_output_path<P: AsRef<Path>>(
        input_file: P,
        output_dir: Option<&Path>,
        target_language: &str,
    ) -> PathBuf {
        let input_file = input_file.as_ref();
        let stem = input_file.file_stem().unwrap_or_default().to_string_lossy();
        let suffix = input_file
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_else(|| ".yml".to_string());

        let file_name = format!("{}_{}{}", stem, target_language, suffix);
        match output_dir {
            Some(dir) => dir.join(file_name),
            None => input_file.with_file_name(file_name),
        }
    }

    /// Sibling manifest path for an output file
    pub fn manifest_path<P: AsRef<Path>>(output: P) -> PathBuf {
        let output = output.as_ref();
        let mut name = output.file_name().unwrap_or_default().to_os_string();
        name.push(".manifest.txt");
        output.with_file_name(name)
    }

    /// Backup path for a file, `<file>.bak`
    pub fn backup_path<P: AsRef<Path>>(path: P) -> PathBuf {
        let path = path.as_ref();
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(".bak");
        path.with_file_name(name)
    }

    /// Copy `path` to its backup location and return that location
    pub fn backup_file<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
        let path = path.as_ref();
        let backup = Self::backup_path(path);
        Self::copy_file(path, &backup)
            .with_context(|| format!("Failed to create backup of {:?}", path))?;
        Ok(backup)
    }

    /// Whether the path has a localization file extension
    pub fn is_localization_file<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .map(|ext| {
                let ext = ext.to_string_lossy();
                LOCALIZATION_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e))
            })
            .unwrap_or(false)
    }

    /// Find localization files under a directory, sorted by path.
    ///
    /// Files this tool produced itself (backups, manifests and outputs for
    /// `target_language`) are skipped.
    pub fn find_localization_files<P: AsRef<Path>>(dir: P, target_language: &str) -> Result<Vec<PathBuf>> {
        let output_marker = format!("_{}", target_language);
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();
            if !path.is_file() || !Self::is_localization_file(path) {
                continue;
            }
            let is_own_output = path
                .file_stem()
                .map(|s| s.to_string_lossy().ends_with(&output_marker))
                .unwrap_or(false);
            if !is_own_output {
                result.push(path.to_path_buf());
            }
        }

        result.sort();
        Ok(result)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Copy a file from one location to another, ensuring the target directory exists
    pub fn copy_file<P1: AsRef<Path>, P2: AsRef<Path>>(from: P1, to: P2) -> Result<()> {
        let from = from.as_ref();
        let to = to.as_ref();

        if !from.exists() {
            return Err(anyhow!("Source file does not exist: {:?}", from));
        }
        if let Some(parent) = to.parent() {
            Self::ensure_dir(parent)?;
        }

        fs::copy(from, to)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generateOutputPath_withoutDir_shouldUseSiblingName() {
        let out = FileManager::generate_output_path("/plugins/Shop/messages.yml", None, "it");
        assert_eq!(out, PathBuf::from("/plugins/Shop/messages_it.yml"));
    }

    #[test]
    fn test_generateOutputPath_withoutExtension_shouldDefaultToYml() {
        let out = FileManager::generate_output_path("lang", Some(Path::new("out")), "de");
        assert_eq!(out, PathBuf::from("out/lang_de.yml"));
    }

    #[test]
    fn test_manifestAndBackupPaths_shouldAppendSuffix() {
        assert_eq!(
            FileManager::manifest_path("/a/messages_it.yml"),
            PathBuf::from("/a/messages_it.yml.manifest.txt")
        );
        assert_eq!(FileManager::backup_path("/a/messages.yml"), PathBuf::from("/a/messages.yml.bak"));
    }

    #[test]
    fn test_isLocalizationFile_shouldAcceptYamlExtensions() {
        assert!(FileManager::is_localization_file("a/b.yml"));
        assert!(FileManager::is_localization_file("a/b.YAML"));
        assert!(!FileManager::is_localization_file("a/b.json"));
    }
}
