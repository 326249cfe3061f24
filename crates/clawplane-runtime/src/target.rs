//! Decides whether OpenClaw commands run natively or through WSL.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Windows,
    Linux,
    MacOs,
    Other,
}

impl HostOs {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "windows" => Self::Windows,
            "linux" => Self::Linux,
            "macos" => Self::MacOs,
            _ => Self::Other,
        }
    }
}

/// Where the OpenClaw CLI actually executes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionTarget {
    pub uses_indirection: bool,
    /// Named WSL distro; `None` means the WSL default. Always `None` when
    /// `uses_indirection` is false.
    pub distro: Option<String>,
}

impl ExecutionTarget {
    pub fn native() -> Self {
        Self::default()
    }

    pub fn wsl(distro: Option<&str>) -> Self {
        Self {
            uses_indirection: true,
            distro: distro
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
        }
    }

    /// An explicit override (`"true"`/`"1"` enables, anything else disables)
    /// wins over host detection; without one, only Windows hosts route
    /// through WSL.
    pub fn resolve(override_flag: Option<&str>, distro: Option<&str>, host: HostOs) -> Self {
        let uses_indirection = match override_flag {
            Some(value) => matches!(value.trim(), "true" | "1"),
            None => host == HostOs::Windows,
        };

        if uses_indirection {
            Self::wsl(distro)
        } else {
            Self::native()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_defaults_to_wsl() {
        let target = ExecutionTarget::resolve(None, None, HostOs::Windows);
        assert!(target.uses_indirection);
        assert_eq!(target.distro, None);
    }

    #[test]
    fn linux_defaults_to_native() {
        let target = ExecutionTarget::resolve(None, Some("Ubuntu"), HostOs::Linux);
        assert_eq!(target, ExecutionTarget::native());
    }

    #[test]
    fn override_wins_over_detection() {
        assert!(ExecutionTarget::resolve(Some("true"), None, HostOs::Linux).uses_indirection);
        assert!(ExecutionTarget::resolve(Some("1"), None, HostOs::MacOs).uses_indirection);
        assert!(!ExecutionTarget::resolve(Some("false"), None, HostOs::Windows).uses_indirection);
        assert!(!ExecutionTarget::resolve(Some("yes"), None, HostOs::Windows).uses_indirection);
    }

    #[test]
    fn distro_kept_only_with_indirection() {
        let wsl = ExecutionTarget::resolve(Some("true"), Some("Debian"), HostOs::Linux);
        assert_eq!(wsl.distro.as_deref(), Some("Debian"));

        let native = ExecutionTarget::resolve(Some("0"), Some("Debian"), HostOs::Windows);
        assert_eq!(native.distro, None);
    }

    #[test]
    fn empty_distro_means_default() {
        let target = ExecutionTarget::resolve(Some("true"), Some("  "), HostOs::Linux);
        assert_eq!(target.distro, None);
    }
}
