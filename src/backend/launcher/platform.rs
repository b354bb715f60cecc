//! Platform information for the launcher.

use super::models::{Artifact, Library};
use crate::backend::utils::system::os::{
    get_all_native_classifiers, get_arch_bits, get_minecraft_arch, get_minecraft_os_name,
};

/// Platform information cached for downloads.
#[derive(Debug, Clone)]
pub struct PlatformInfo {
    pub os_name: &'static str,
    pub os_arch: &'static str,
    pub arch_bits: &'static str,
    pub native_classifiers: Vec<String>,
}

impl PlatformInfo {
    pub fn new() -> Self {
        Self {
            os_name: get_minecraft_os_name(),
            os_arch: get_minecraft_arch(),
            arch_bits: get_arch_bits(),
            native_classifiers: get_all_native_classifiers(),
        }
    }

    /// Evaluates a library's rules. No rules means allowed; otherwise the last
    /// matching rule decides and nothing matching means disallowed.
    pub fn is_compatible(&self, library: &Library) -> bool {
        let Some(rules) = &library.rules else {
            return true;
        };

        let mut allowed = false;
        for rule in rules {
            if rule.applies_to(self.os_name, self.os_arch) {
                match rule.action.as_str() {
                    "allow" => allowed = true,
                    "disallow" => allowed = false,
                    _ => {}
                }
            }
        }
        allowed
    }

    /// The native classifier artifact this platform needs from `library`, if any.
    pub fn native_artifact<'a>(&self, library: &'a Library) -> Option<&'a Artifact> {
        let classifiers = library.downloads.as_ref()?.classifiers.as_ref()?;

        match &library.natives {
            Some(natives) => {
                let key = natives
                    .get(self.os_name)?
                    .replace("${arch}", self.arch_bits);
                classifiers.get(&key)
            }
            None => self
                .native_classifiers
                .iter()
                .find_map(|key| classifiers.get(key)),
        }
    }
}

impl Default for PlatformInfo {
    fn default() -> Self {
        Self::new()
    }
}
