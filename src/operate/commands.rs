//! Built-in commands.

use std::fmt::Write;

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

use crate::dispatcher::SUPPORTED_VERSION;

/// `getversion`: the most recent attach protocol version served.
pub fn get_version(_args: &[String], out: &mut String) -> i32 {
    let _ = write!(out, "{}", SUPPORTED_VERSION.as_u32());
    0
}

/// `echo`: the arguments separated by a space, used to check the communication between client
/// and target.
pub fn echo(args: &[String], out: &mut String) -> i32 {
    out.push_str(&args.join(" "));
    0
}

/// `properties`: a `key=value` line per property of the current process.
pub fn properties(_args: &[String], out: &mut String) -> i32 {
    let pid = Pid::from_u32(std::process::id());
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        false,
        ProcessRefreshKind::nothing()
            .with_memory()
            .with_exe(UpdateKind::OnlyIfNotSet)
            .with_cwd(UpdateKind::OnlyIfNotSet),
    );
    let Some(process) = system.process(pid) else {
        let _ = write!(out, "Process {pid} not found");
        return 1;
    };

    let _ = writeln!(out, "os.name={}", std::env::consts::OS);
    let _ = writeln!(out, "os.arch={}", std::env::consts::ARCH);
    let _ = writeln!(out, "process.pid={pid}");
    let _ = writeln!(out, "process.name={}", process.name().to_string_lossy());
    if let Some(exe) = process.exe() {
        let _ = writeln!(out, "process.exe={}", exe.display());
    }
    if let Some(cwd) = process.cwd() {
        let _ = writeln!(out, "process.cwd={}", cwd.display());
    }
    let _ = writeln!(out, "process.memory={}", process.memory());
    let _ = writeln!(out, "process.start_time={}", process.start_time());
    0
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_get_version() {
        let mut out = String::new();
        assert_eq!(get_version(&[], &mut out), 0);
        assert_eq!(out, "2");
    }

    #[test]
    fn test_echo() {
        let mut out = String::new();
        assert_eq!(echo(&["a".to_owned(), "".to_owned(), "b".to_owned()], &mut out), 0);
        assert_eq!(out, "a  b");
    }

    #[test]
    fn test_properties() {
        let mut out = String::new();
        assert_eq!(properties(&[], &mut out), 0);
        assert!(out.contains(&format!("process.pid={}\n", std::process::id())));
        assert!(out.contains(&format!("os.name={}\n", std::env::consts::OS)));
        assert!(out.lines().all(|line| line.contains('=')));
    }
}
