//! Operating system utilities.
//!
//! Detection of the current OS and architecture for Minecraft rule evaluation and
//! native library selection.

/// Get the current operating system name for Minecraft rules.
pub fn get_minecraft_os_name() -> &'static str {
    match std::env::consts::OS {
        "windows" => "windows",
        "macos" => "osx",
        "linux" => "linux",
        _ => "linux",
    }
}

/// Get the current architecture for Minecraft rules.
pub fn get_minecraft_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "x86_64",
        "aarch64" => "arm64",
        "x86" => "x86",
        _ => "x86_64",
    }
}

/// Pointer width as used in `${arch}` classifier templates.
pub fn get_arch_bits() -> &'static str {
    if cfg!(target_pointer_width = "64") {
        "64"
    } else {
        "32"
    }
}

/// Get all possible native classifiers for the current platform, most specific first.
pub fn get_all_native_classifiers() -> Vec<String> {
    let classifiers: &[&str] = match (std::env::consts::OS, std::env::consts::ARCH) {
        ("windows", "x86") => &["natives-windows-x86", "natives-windows"],
        ("windows", "aarch64") => &["natives-windows-arm64", "natives-windows"],
        ("windows", _) => &["natives-windows"],
        ("macos", "aarch64") => &["natives-osx-arm64", "natives-macos-arm64", "natives-osx"],
        ("macos", _) => &["natives-osx", "natives-macos"],
        ("linux", "aarch64") => &["natives-linux-arm64", "natives-linux"],
        ("linux", "x86") => &["natives-linux-x86", "natives-linux"],
        _ => &["natives-linux"],
    };
    classifiers.iter().map(|c| c.to_string()).collect()
}
