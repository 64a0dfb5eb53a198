//! Detection of a running mail client.
//!
//! Clients such as Thunderbird keep their MBOX files open and locked; the
//! deduplicator must only run while they are closed.

use sysinfo::{ProcessRefreshKind, RefreshKind, System};
use tracing::debug;

/// Whether any running process has one of `names` (case-insensitive).
pub fn is_mail_client_running(names: &[String]) -> bool {
    if names.is_empty() {
        return false;
    }
    let sys = System::new_with_specifics(
        RefreshKind::new().with_processes(ProcessRefreshKind::new()),
    );
    let running = sys
        .processes()
        .values()
        .find(|p| matches_client_name(p.name(), names));

    if let Some(process) = running {
        debug!(name = process.name(), pid = %process.pid(), "Mail client is running");
        true
    } else {
        false
    }
}

fn matches_client_name(process_name: &str, names: &[String]) -> bool {
    names.iter().any(|n| process_name.eq_ignore_ascii_case(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_client_name() {
        let names = vec!["thunderbird".to_string(), "thunderbird.exe".to_string()];
        assert!(matches_client_name("Thunderbird.EXE", &names));
        assert!(matches_client_name("thunderbird", &names));
        assert!(!matches_client_name("thunderbird-bin", &names));
        assert!(!matches_client_name("firefox", &names));
    }

    #[test]
    fn test_no_names_never_running() {
        assert!(!is_mail_client_running(&[]));
    }

    #[test]
    fn test_unlikely_name_not_running() {
        let names = vec!["no-such-mail-client-9f3a".to_string()];
        assert!(!is_mail_client_running(&names));
    }
}
