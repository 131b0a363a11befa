use std::env::consts;

/// Host platform and CPU architecture, named the way the checkpoint service
/// expects them (`linux`/`darwin`/`win32`, `x64`/`arm64`/`ia32`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub arch: String,
    pub os: String,
}

impl HostInfo {
    pub fn detect() -> Self {
        Self {
            arch: arch_name(consts::ARCH).to_string(),
            os: platform_name(consts::OS).to_string(),
        }
    }
}

impl Default for HostInfo {
    fn default() -> Self {
        Self::detect()
    }
}

pub fn arch_name(arch: &str) -> &str {
    match arch {
        "x86_64" => "x64",
        "x86" => "ia32",
        "aarch64" => "arm64",
        "loongarch64" => "loong64",
        "powerpc" => "ppc",
        "powerpc64" => "ppc64",
        other => other,
    }
}

pub fn platform_name(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        "windows" => "win32",
        "solaris" | "illumos" => "sunos",
        other => other,
    }
}
