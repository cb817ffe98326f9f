use std::{fs::File, io::Write, path::PathBuf};

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

/// A file removed when dropped, unless somebody else removed it first.
pub struct AutoDropFile(PathBuf);

impl AutoDropFile {
    /// Publishes `contents` at `path` in one step: the file is written under a temporary name
    /// and renamed, so a reader never sees it partially written.
    pub fn create_with(path: PathBuf, contents: &[u8]) -> std::io::Result<Self> {
        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);
        let mut file = File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        drop(file);
        if let Err(e) = std::fs::rename(&tmp_path, &path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e);
        }
        Ok(Self(path))
    }

    /// Takes ownership of an existing file, a bound UNIX socket for instance.
    pub fn adopt(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn exists(&self) -> Result<bool, std::io::Error> {
        std::fs::exists(&self.0)
    }
}

impl Drop for AutoDropFile {
    fn drop(&mut self) {
        // The target process may have claimed it already
        let _ = std::fs::remove_file(&self.0);
    }
}

/// Working directory of process `pid`, where attach files are dropped.
pub fn process_cwd(pid: u32) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        false,
        ProcessRefreshKind::nothing().with_cwd(UpdateKind::Always),
    );
    let process = system
        .process(pid)
        .ok_or_else(|| format!("Process {pid} not found"))?;
    let cwd = process
        .cwd()
        .ok_or_else(|| format!("Working directory of process {pid} is not accessible"))?;
    Ok(cwd.to_path_buf())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_auto_drop_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attach");

        let file = AutoDropFile::create_with(path.clone(), b"hello").unwrap();
        assert!(file.exists().unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
        assert!(!dir.path().join("attach.tmp").exists());
        drop(file);
        assert!(!path.exists());

        // Removed behind its back
        let file = AutoDropFile::create_with(path.clone(), b"").unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(!file.exists().unwrap());
        drop(file);
    }

    #[test]
    fn test_own_cwd() {
        let cwd = process_cwd(std::process::id()).unwrap();
        assert_eq!(
            cwd.canonicalize().unwrap(),
            std::env::current_dir().unwrap().canonicalize().unwrap()
        );
    }
}
