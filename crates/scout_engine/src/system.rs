use serde::Serialize;
use sysinfo::System;

/// Host description shown in the shell's about panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemInfo {
    pub platform: String,
    pub version: String,
    pub kernel: String,
    pub machine: String,
    pub processor: String,
    pub host_name: String,
    pub app_version: String,
}

pub fn system_info() -> SystemInfo {
    let mut sys = System::new();
    sys.refresh_cpu();
    let processor = sys
        .cpus()
        .first()
        .map(|cpu| cpu.brand().trim().to_string())
        .unwrap_or_default();

    SystemInfo {
        platform: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
        version: System::long_os_version()
            .or_else(System::os_version)
            .unwrap_or_default(),
        kernel: System::kernel_version().unwrap_or_default(),
        machine: std::env::consts::ARCH.to_string(),
        processor,
        host_name: System::host_name().unwrap_or_default(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
    }
}
