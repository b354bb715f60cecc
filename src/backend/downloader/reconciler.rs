//! Compares manifest-declared files with the working directory.

use super::events::EventSink;
use super::models::DownloadDescriptor;
use super::validator::{LocalValidator, Validity};
use crate::backend::utils::launcher::paths::stays_inside;
use futures_util::{StreamExt, stream};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Files hashed at the same time while validating.
const VALIDATION_CONCURRENCY: usize = 16;

/// One library as the reconciler sees it.
#[derive(Debug, Clone)]
pub struct LibrarySource {
    pub name: String,
    /// Whether the library applies to the current platform.
    pub applicable: bool,
    pub artifact: Option<DownloadDescriptor>,
    pub classifier: Option<DownloadDescriptor>,
}

/// Everything a version asks for, already turned into descriptors.
#[derive(Debug, Clone, Default)]
pub struct ManifestSources {
    pub assets: Vec<DownloadDescriptor>,
    pub client: Option<DownloadDescriptor>,
    pub libraries: Vec<LibrarySource>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationResult {
    pub bytes_total: u64,
    pub bytes_validated: u64,
    /// Unique by destination, in the order sources declared them.
    pub to_fetch: Vec<DownloadDescriptor>,
}

impl ReconciliationResult {
    pub fn bytes_pending(&self) -> u64 {
        self.bytes_total.saturating_sub(self.bytes_validated)
    }
}

pub struct Reconciler<'a> {
    working_dir: &'a Path,
    sink: &'a dyn EventSink,
}

impl<'a> Reconciler<'a> {
    pub fn new(working_dir: &'a Path, sink: &'a dyn EventSink) -> Self {
        Self { working_dir, sink }
    }

    /// Walks assets, the client jar, then each applicable library's artifact and
    /// classifier. Missing or invalid files never fail the pass.
    pub async fn reconcile(&self, sources: ManifestSources) -> ReconciliationResult {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for asset in sources.assets {
            self.admit(asset, "Asset", &mut seen, &mut candidates);
        }

        match sources.client {
            Some(client) => self.admit(client, "Client", &mut seen, &mut candidates),
            None => self
                .sink
                .info("Version has no compatible client downloadable."),
        }

        for library in sources.libraries {
            if !library.applicable {
                continue;
            }
            if let Some(artifact) = library.artifact {
                self.admit(artifact, &library.name, &mut seen, &mut candidates);
            }
            if let Some(classifier) = library.classifier {
                self.admit(classifier, &library.name, &mut seen, &mut candidates);
            }
        }

        let checked: Vec<(DownloadDescriptor, Validity)> = stream::iter(candidates)
            .map(|(descriptor, path)| async move {
                let validity = LocalValidator::validate(&descriptor, &path).await;
                (descriptor, validity)
            })
            .buffered(VALIDATION_CONCURRENCY)
            .collect()
            .await;

        let mut result = ReconciliationResult::default();
        for (descriptor, validity) in checked {
            let size = descriptor.size_or_zero();
            result.bytes_total = result.bytes_total.saturating_add(size);
            if validity.needs_download() {
                result.to_fetch.push(descriptor);
            } else {
                result.bytes_validated = result.bytes_validated.saturating_add(size);
            }
        }
        result
    }

    /// Dedups by resolved path (first wins) and drops sources with nothing to fetch
    /// or a destination outside the working directory.
    fn admit(
        &self,
        descriptor: DownloadDescriptor,
        origin: &str,
        seen: &mut HashSet<PathBuf>,
        candidates: &mut Vec<(DownloadDescriptor, PathBuf)>,
    ) {
        if descriptor.url.is_none() {
            self.sink.info(&format!(
                "{origin} declares no downloadable file for {}",
                descriptor.destination.display()
            ));
            return;
        }
        if !stays_inside(&descriptor.destination) {
            self.sink.error(&format!(
                "{origin} wants a file outside the working directory: {}",
                descriptor.destination.display()
            ));
            return;
        }

        let path = descriptor.resolve(self.working_dir);
        if seen.insert(path.clone()) {
            candidates.push((descriptor, path));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        info: Mutex<Vec<String>>,
        errors: Mutex<Vec<String>>,
    }

    impl EventSink for Recorder {
        fn info(&self, message: &str) {
            self.info.lock().unwrap().push(message.to_string());
        }

        fn error(&self, message: &str) {
            self.errors.lock().unwrap().push(message.to_string());
        }
    }

    fn lib(name: &str, applicable: bool, artifact: Option<DownloadDescriptor>) -> LibrarySource {
        LibrarySource {
            name: name.to_string(),
            applicable,
            artifact,
            classifier: None,
        }
    }

    #[tokio::test]
    async fn shared_destination_counts_once() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Recorder::default();
        let shared = DownloadDescriptor::new("https://x/shared.jar", "libraries/shared.jar")
            .with_size(50);

        let sources = ManifestSources {
            assets: vec![],
            client: None,
            libraries: vec![
                lib("a", true, Some(shared.clone())),
                lib("b", true, Some(shared.clone().with_display_name("dup"))),
            ],
        };

        let result = Reconciler::new(dir.path(), &sink).reconcile(sources).await;
        assert_eq!(result.bytes_total, 50);
        assert_eq!(result.to_fetch, vec![shared]);
    }

    #[tokio::test]
    async fn duplicate_assets_by_hash_are_merged() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Recorder::default();
        let a = DownloadDescriptor::new("https://x/ab/abcd", "assets/objects/ab/abcd")
            .with_size(10)
            .with_display_name("one.ogg");
        let b = a.clone().with_display_name("two.ogg");

        let sources = ManifestSources {
            assets: vec![a, b],
            ..Default::default()
        };
        let result = Reconciler::new(dir.path(), &sink).reconcile(sources).await;
        assert_eq!(result.bytes_total, 10);
        assert_eq!(result.to_fetch.len(), 1);
        assert_eq!(result.to_fetch[0].label(), "one.ogg");
    }

    #[tokio::test]
    async fn inapplicable_and_urlless_sources_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Recorder::default();

        let sources = ManifestSources {
            assets: vec![],
            client: Some(DownloadDescriptor::unavailable("versions/x/x.jar")),
            libraries: vec![lib(
                "osx-only",
                false,
                Some(DownloadDescriptor::new("https://x/o.jar", "libraries/o.jar").with_size(9)),
            )],
        };

        let result = Reconciler::new(dir.path(), &sink).reconcile(sources).await;
        assert_eq!(result, ReconciliationResult::default());
        assert_eq!(sink.info.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn valid_files_count_as_validated() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Recorder::default();
        tokio::fs::create_dir_all(dir.path().join("libraries")).await.unwrap();
        tokio::fs::write(dir.path().join("libraries/ok.jar"), b"hello")
            .await
            .unwrap();

        let ok = DownloadDescriptor::new("https://x/ok.jar", "libraries/ok.jar")
            .with_size(5)
            .with_sha1("aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");
        let missing = DownloadDescriptor::new("https://x/no.jar", "libraries/no.jar").with_size(7);
        let mut native = lib("native", true, Some(ok));
        native.classifier = Some(missing.clone());

        let result = Reconciler::new(dir.path(), &sink)
            .reconcile(ManifestSources {
                libraries: vec![native],
                ..Default::default()
            })
            .await;

        assert_eq!(result.bytes_total, 12);
        assert_eq!(result.bytes_validated, 5);
        assert_eq!(result.bytes_pending(), 7);
        assert_eq!(result.to_fetch, vec![missing]);
    }

    #[tokio::test]
    async fn destinations_outside_the_working_dir_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Recorder::default();
        let inside = DownloadDescriptor::new("https://x/ok.jar", "libraries/ok.jar").with_size(3);

        let sources = ManifestSources {
            assets: vec![
                DownloadDescriptor::new("https://x/a", "/tmp/evil").with_size(1),
                DownloadDescriptor::new("https://x/b", "assets/../../evil").with_size(2),
            ],
            client: None,
            libraries: vec![lib("ok", true, Some(inside.clone()))],
        };

        let result = Reconciler::new(dir.path(), &sink).reconcile(sources).await;
        assert_eq!(result.bytes_total, 3);
        assert_eq!(result.to_fetch, vec![inside]);
        assert_eq!(sink.errors.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn huge_declared_sizes_saturate() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Recorder::default();
        let big = |name: &str| {
            DownloadDescriptor::new(format!("https://x/{name}"), format!("libraries/{name}"))
                .with_size(u64::MAX)
        };

        let sources = ManifestSources {
            libraries: vec![lib("a", true, Some(big("a.jar"))), lib("b", true, Some(big("b.jar")))],
            ..Default::default()
        };
        let result = Reconciler::new(dir.path(), &sink).reconcile(sources).await;
        assert_eq!(result.bytes_total, u64::MAX);
        assert_eq!(result.to_fetch.len(), 2);
    }
}
