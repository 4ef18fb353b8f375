//! Pipeline orchestration: planning which recordings need processing and
//! running them through upload, transcription, and insight generation.
//!
//! Failure isolation is per item and per stage: an upload failure downgrades
//! to local-only processing, a transcription failure abandons only that item,
//! and an insight failure still leaves the transcript persisted.

use crate::config::{Prompts, Settings};
use crate::drive::{DriveStore, ObjectStore};
use crate::error::{PensumError, Result};
use crate::insights::{InsightProcessor, OpenAiGenerator, TextGenerator};
use crate::metadata::{LectureMetadata, MetadataLoader};
use crate::reconcile::{self, LectureIdentifier};
use crate::schedule::{self, ClassSchedule};
use crate::store::LectureStore;
use crate::transcription::{SpeechEngine, TranscriptionProcessor, WhisperEngine};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Where a stage is in its lifecycle for one work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Shared per-item status and progress messages, keyed by lecture
/// identifier. Cloned handles observe the same state.
#[derive(Clone, Default)]
pub struct StatusTracker {
    statuses: Arc<Mutex<HashMap<String, StageStatus>>>,
    progress: Arc<Mutex<HashMap<String, String>>>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: &str, status: StageStatus) {
        if let Ok(mut map) = self.statuses.lock() {
            map.insert(key.to_string(), status);
        }
    }

    pub fn get(&self, key: &str) -> StageStatus {
        self.statuses
            .lock()
            .ok()
            .and_then(|map| map.get(key).copied())
            .unwrap_or(StageStatus::Pending)
    }

    pub fn progress(&self, key: &str, message: &str) {
        debug!("[{}] {}", key, message);
        if let Ok(mut map) = self.progress.lock() {
            map.insert(key.to_string(), message.to_string());
        }
    }

    pub fn last_progress(&self, key: &str) -> Option<String> {
        self.progress.lock().ok().and_then(|map| map.get(key).cloned())
    }
}

/// Where a recording's bytes live.
#[derive(Debug, Clone)]
pub enum WorkSource {
    /// A file in the local recordings directory.
    Local(PathBuf),
    /// A file that only exists in the remote folder.
    Remote { id: String, name: String },
}

/// One recording that needs processing.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub identifier: LectureIdentifier,
    pub source: WorkSource,
    pub metadata: LectureMetadata,
    /// Human-readable name used when archiving to remote storage.
    pub derived_filename: String,
    /// Whether the recording already exists in the remote folder. Items that
    /// are remote-backed are never uploaded again.
    pub remote_backed: bool,
}

/// The output of planning: what to process and what was set aside.
#[derive(Debug)]
pub struct Plan {
    pub items: Vec<WorkItem>,
    /// Filenames skipped because they could not be resolved to a class,
    /// with the reason.
    pub unrecognized: Vec<(String, String)>,
    /// Candidates already present in the store.
    pub already_persisted: usize,
}

/// How one work item ended up.
#[derive(Debug)]
pub enum ItemOutcome {
    /// Transcript persisted; insight generation may have used placeholders.
    Completed {
        lecture_id: Uuid,
        insights_failed: bool,
    },
    Failed(String),
}

/// End-of-run accounting.
#[derive(Debug, Default)]
pub struct RunReport {
    pub completed: usize,
    pub failed: usize,
    pub outcomes: Vec<(LectureIdentifier, ItemOutcome)>,
}

/// The pipeline itself: owns the stage processors and the stores.
pub struct Orchestrator {
    settings: Settings,
    schedule: ClassSchedule,
    store: Arc<LectureStore>,
    transcription: TranscriptionProcessor,
    insights: InsightProcessor,
    remote: Option<Arc<dyn ObjectStore>>,
}

impl Orchestrator {
    /// Build the production pipeline from settings. Fails only on problems
    /// nothing downstream can recover from: an unopenable database or a
    /// missing OpenAI key. A misconfigured remote folder downgrades to
    /// local-only with a warning.
    pub fn new(settings: &Settings) -> Result<Self> {
        if !crate::openai::is_api_key_configured() {
            return Err(PensumError::Config(
                "OPENAI_API_KEY is not set; transcription and insights require it".to_string(),
            ));
        }

        let store = Arc::new(LectureStore::new(&settings.sqlite_path())?);
        let engine: Arc<dyn SpeechEngine> =
            Arc::new(WhisperEngine::with_model(&settings.transcription.model));
        let generator: Arc<dyn TextGenerator> =
            Arc::new(OpenAiGenerator::with_model(&settings.insights.model));

        let remote: Option<Arc<dyn ObjectStore>> = match &settings.drive.folder_id {
            Some(folder_id) => {
                let token_file = settings
                    .drive
                    .token_file
                    .as_ref()
                    .map(|p| Settings::expand_path(p));
                match DriveStore::new(folder_id, token_file.as_deref()) {
                    Ok(store) => Some(Arc::new(store)),
                    Err(e) => {
                        warn!("Remote storage unavailable, continuing local-only: {}", e);
                        None
                    }
                }
            }
            None => None,
        };

        Ok(Self::with_components(
            settings.clone(),
            ClassSchedule::default(),
            store,
            engine,
            generator,
            remote,
        ))
    }

    /// Assemble a pipeline from explicit parts. Production goes through
    /// [`Orchestrator::new`]; tests inject mocks here.
    pub fn with_components(
        settings: Settings,
        schedule: ClassSchedule,
        store: Arc<LectureStore>,
        engine: Arc<dyn SpeechEngine>,
        generator: Arc<dyn TextGenerator>,
        remote: Option<Arc<dyn ObjectStore>>,
    ) -> Self {
        let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())
            .unwrap_or_default();
        let transcription = TranscriptionProcessor::new(
            engine,
            store.clone(),
            &settings.transcription.language,
        );
        let insights =
            InsightProcessor::new(generator, store.clone(), prompts, &settings.insights);

        Self {
            settings,
            schedule,
            store,
            transcription,
            insights,
            remote,
        }
    }

    pub fn store(&self) -> &Arc<LectureStore> {
        &self.store
    }

    pub fn transcription_status(&self) -> &StatusTracker {
        self.transcription.status()
    }

    pub fn insight_status(&self) -> &StatusTracker {
        self.insights.status()
    }

    /// Reconcile the three inventories (local recordings, remote folder,
    /// persisted lectures) into a work list.
    ///
    /// Unresolvable filenames are reported, never guessed at. When the same
    /// lecture exists both locally and remotely, the local copy wins.
    pub async fn plan(&self) -> Result<Plan> {
        let mut candidates: Vec<LectureIdentifier> = Vec::new();
        let mut sources: HashMap<LectureIdentifier, (WorkSource, String, String)> = HashMap::new();
        let mut remote_present: HashSet<LectureIdentifier> = HashSet::new();
        let mut unrecognized: Vec<(String, String)> = Vec::new();

        for path in self.local_recordings()? {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            match self.resolve_candidate(&name) {
                Ok((identifier, class_name, date)) => {
                    if !sources.contains_key(&identifier) {
                        candidates.push(identifier.clone());
                        sources.insert(identifier, (WorkSource::Local(path), class_name, date));
                    }
                }
                Err(reason) => unrecognized.push((name, reason)),
            }
        }

        if let Some(remote) = &self.remote {
            // A listing failure costs only the remote inventory; local
            // recordings can still make progress without it.
            match remote.list().await {
                Ok(files) => {
                    for file in files {
                        match self.resolve_candidate(&file.name) {
                            Ok((identifier, class_name, date)) => {
                                remote_present.insert(identifier.clone());
                                if !sources.contains_key(&identifier) {
                                    candidates.push(identifier.clone());
                                    sources.insert(
                                        identifier,
                                        (
                                            WorkSource::Remote {
                                                id: file.id,
                                                name: file.name,
                                            },
                                            class_name,
                                            date,
                                        ),
                                    );
                                }
                            }
                            Err(reason) => unrecognized.push((file.name, reason)),
                        }
                    }
                }
                Err(e) => {
                    warn!("Remote listing failed, planning from local inventory only: {}", e);
                }
            }
        }

        let persisted: HashSet<LectureIdentifier> =
            self.store.list_identifiers()?.into_iter().collect();
        let to_process = reconcile::reconcile(&candidates, &persisted);
        let already_persisted = candidates.len() - to_process.len();

        let loader = MetadataLoader::new(self.settings.metadata_dir());
        let items = to_process
            .into_iter()
            .filter_map(|identifier| {
                let (source, class_name, date) = sources.remove(&identifier)?;
                let metadata = loader.load(&class_name, &date);
                let derived_filename = metadata.derived_filename();
                let remote_backed = remote_present.contains(&identifier);
                Some(WorkItem {
                    identifier,
                    source,
                    metadata,
                    derived_filename,
                    remote_backed,
                })
            })
            .collect::<Vec<_>>();

        for (name, reason) in &unrecognized {
            warn!("Skipping '{}': {}", name, reason);
        }
        info!(
            "Planned {} item(s) ({} already persisted, {} unrecognized)",
            items.len(),
            already_persisted,
            unrecognized.len()
        );

        Ok(Plan {
            items,
            unrecognized,
            already_persisted,
        })
    }

    /// Process work items sequentially. Each item runs upload (best-effort),
    /// transcription (fatal for the item), and insights (best-effort).
    pub async fn run(&self, items: Vec<WorkItem>, skip_upload: bool) -> Result<RunReport> {
        let mut report = RunReport::default();
        let temp_dir = self.settings.temp_dir();
        if !temp_dir.exists() {
            std::fs::create_dir_all(&temp_dir)?;
        }

        for item in items {
            let key = item.identifier.as_str().to_string();
            info!("Processing {}", key);

            let (audio_path, temp_download) = match &item.source {
                WorkSource::Local(path) => {
                    if !skip_upload && !item.remote_backed {
                        self.archive_to_remote(path, &item.derived_filename).await;
                    }
                    (path.clone(), None)
                }
                WorkSource::Remote { id, name } => {
                    let dest = temp_dir.join(name);
                    match self.download_remote(id, &dest).await {
                        Ok(()) => (dest.clone(), Some(dest)),
                        Err(e) => {
                            warn!("Failed to download {}: {}", key, e);
                            report.failed += 1;
                            report
                                .outcomes
                                .push((item.identifier, ItemOutcome::Failed(e.to_string())));
                            continue;
                        }
                    }
                }
            };

            let outcome = self
                .transcription
                .process(&audio_path, &item.metadata, &key)
                .await;

            if let Some(temp) = temp_download {
                if let Err(e) = std::fs::remove_file(&temp) {
                    debug!("Could not remove temp file {}: {}", temp.display(), e);
                }
            }

            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Failed to transcribe {}: {}", key, e);
                    report.failed += 1;
                    report
                        .outcomes
                        .push((item.identifier, ItemOutcome::Failed(e.to_string())));
                    continue;
                }
            };

            let insights_failed = match self
                .insights
                .process(
                    &outcome.lecture_id,
                    &item.metadata,
                    &outcome.transcript.full_text,
                    &key,
                )
                .await
            {
                Ok(_) => false,
                Err(e) => {
                    warn!("Insights failed for {} (transcript kept): {}", key, e);
                    true
                }
            };

            report.completed += 1;
            report.outcomes.push((
                item.identifier,
                ItemOutcome::Completed {
                    lecture_id: outcome.lecture_id,
                    insights_failed,
                },
            ));
        }

        info!(
            "Run finished: {} completed, {} failed",
            report.completed, report.failed
        );
        Ok(report)
    }

    /// Resolve one filename to a lecture identifier, or explain why not.
    fn resolve_candidate(
        &self,
        filename: &str,
    ) -> std::result::Result<(LectureIdentifier, String, String), String> {
        let identity = schedule::resolve(filename).map_err(|e| e.to_string())?;
        let class_name = self
            .schedule
            .class_for(&identity.class_key)
            .ok_or_else(|| format!("no class scheduled at '{}'", identity.class_key))?
            .to_string();
        let identifier = reconcile::identify(&identity, &self.schedule)
            .ok_or_else(|| format!("no class scheduled at '{}'", identity.class_key))?;
        Ok((identifier, class_name, identity.date))
    }

    fn local_recordings(&self) -> Result<Vec<PathBuf>> {
        let audio_dir = self.settings.audio_dir();
        if !audio_dir.exists() {
            debug!("Audio directory {} does not exist", audio_dir.display());
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&audio_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| matches!(e.to_lowercase().as_str(), "wav" | "mp3" | "m4a"))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();
        Ok(paths)
    }

    /// Archive a local recording to the remote folder. Upload failures are
    /// warnings; the recording still gets processed locally.
    async fn archive_to_remote(&self, path: &std::path::Path, name: &str) {
        let Some(remote) = &self.remote else {
            return;
        };
        match remote.upload(path, name).await {
            Ok(id) => info!("Archived {} as {} ({})", path.display(), name, id),
            Err(e) => warn!("Upload of {} failed, continuing: {}", path.display(), e),
        }
    }

    async fn download_remote(&self, id: &str, dest: &std::path::Path) -> Result<()> {
        let remote = self
            .remote
            .as_ref()
            .ok_or_else(|| PensumError::Drive("No remote storage configured".to_string()))?;
        remote.download(id, dest).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::RemoteFile;
    use crate::transcription::EngineSegment;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubEngine {
        fail_matching: Option<&'static str>,
    }

    #[async_trait]
    impl SpeechEngine for StubEngine {
        async fn transcribe(&self, path: &Path, _language: &str) -> Result<Vec<EngineSegment>> {
            if let Some(marker) = self.fail_matching {
                if path.to_string_lossy().contains(marker) {
                    return Err(PensumError::OpenAI("engine down".to_string()));
                }
            }
            Ok(vec![EngineSegment {
                start: 0.0,
                end: 60.0,
                text: "Lecture content discussed here. More detail followed.".to_string(),
            }])
        }
    }

    struct StubGenerator;

    #[async_trait]
    impl crate::insights::TextGenerator for StubGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            if prompt.contains("comma-separated") {
                return Ok("Alpha, Beta, Gamma, Delta, Epsilon, Zeta, Eta, Theta".to_string());
            }
            Ok("1. Point one stated\n2. Point two stated\n3. Point three stated\n4. Point four stated\n5. Point five stated\n6. Point six stated\n7. Point seven stated\n8. Point eight stated".to_string())
        }
    }

    struct StubRemote {
        files: Vec<RemoteFile>,
        uploads: AtomicUsize,
        list_fails: bool,
    }

    #[async_trait]
    impl ObjectStore for StubRemote {
        async fn upload(&self, _path: &Path, _name: &str) -> Result<String> {
            self.uploads.fetch_add(1, Ordering::SeqCst);
            Ok("remote-id".to_string())
        }

        async fn list(&self) -> Result<Vec<RemoteFile>> {
            if self.list_fails {
                return Err(PensumError::Drive("listing unavailable".to_string()));
            }
            Ok(self.files.clone())
        }

        async fn download(&self, _id: &str, dest: &Path) -> Result<()> {
            std::fs::write(dest, b"audio")?;
            Ok(())
        }
    }

    struct TestFixture {
        orchestrator: Orchestrator,
        store: Arc<LectureStore>,
        _audio_dir: tempfile::TempDir,
        _temp_dir: tempfile::TempDir,
    }

    fn fixture(
        local_files: &[&str],
        remote: Option<Arc<dyn ObjectStore>>,
        fail_matching: Option<&'static str>,
    ) -> TestFixture {
        let audio_dir = tempfile::tempdir().unwrap();
        let temp_dir = tempfile::tempdir().unwrap();
        for name in local_files {
            std::fs::write(audio_dir.path().join(name), b"audio").unwrap();
        }

        let mut settings = Settings::default();
        settings.recorder.audio_dir = audio_dir.path().to_string_lossy().to_string();
        settings.general.temp_dir = temp_dir.path().to_string_lossy().to_string();
        settings.insights.max_retries = 0;
        settings.insights.retry_delay_secs = 0;

        let store = Arc::new(LectureStore::in_memory().unwrap());
        let orchestrator = Orchestrator::with_components(
            settings,
            ClassSchedule::default(),
            store.clone(),
            Arc::new(StubEngine { fail_matching }),
            Arc::new(StubGenerator),
            remote,
        );

        TestFixture {
            orchestrator,
            store,
            _audio_dir: audio_dir,
            _temp_dir: temp_dir,
        }
    }

    // 2024-03-04 was a Monday. Ending at 09:35 truncates to the 9:30 slot
    // (MBA 530); ending at 08:14 truncates to the 8:00 slot (MBA 505).
    const MONDAY_0930: &str = "20240304093500.wav";
    const MONDAY_0800: &str = "20240304081400.wav";

    #[tokio::test]
    async fn test_plan_separates_work_from_noise() {
        let fx = fixture(&[MONDAY_0930, "notes.txt", "20240309120000.wav"], None, None);
        // 2024-03-09 was a Saturday; no slot matches.
        let plan = fx.orchestrator.plan().await.unwrap();

        assert_eq!(plan.items.len(), 1);
        assert_eq!(
            plan.items[0].identifier.as_str(),
            "2024-03-04: MBA 530 Operations Management"
        );
        assert_eq!(plan.unrecognized.len(), 1);
        assert_eq!(plan.already_persisted, 0);
    }

    #[tokio::test]
    async fn test_plan_excludes_persisted_lectures() {
        let fx = fixture(&[MONDAY_0930], None, None);
        let plan = fx.orchestrator.plan().await.unwrap();
        let report = fx.orchestrator.run(plan.items, true).await.unwrap();
        assert_eq!(report.completed, 1);

        let second = fx.orchestrator.plan().await.unwrap();
        assert!(second.items.is_empty());
        assert_eq!(second.already_persisted, 1);
    }

    #[tokio::test]
    async fn test_run_persists_transcript_and_insights() {
        let fx = fixture(&[MONDAY_0930], None, None);
        let plan = fx.orchestrator.plan().await.unwrap();
        let report = fx.orchestrator.run(plan.items, true).await.unwrap();

        assert_eq!(report.completed, 1);
        assert_eq!(report.failed, 0);
        let (_, outcome) = &report.outcomes[0];
        let ItemOutcome::Completed {
            lecture_id,
            insights_failed,
        } = outcome
        else {
            panic!("expected completion");
        };
        assert!(!insights_failed);

        let lecture = fx.store.fetch_lecture(lecture_id).unwrap().unwrap();
        assert_eq!(lecture.lecture.class_number, "MBA 530 Operations Management");
        assert_eq!(lecture.lecture.date, "2024-03-04");
        assert!(fx.store.has_insights(lecture_id).unwrap());
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_the_run() {
        let fx = fixture(&[MONDAY_0800, MONDAY_0930], None, Some("20240304081400"));
        let plan = fx.orchestrator.plan().await.unwrap();
        assert_eq!(plan.items.len(), 2);

        let report = fx.orchestrator.run(plan.items, true).await.unwrap();
        assert_eq!(report.completed, 1);
        assert_eq!(report.failed, 1);

        // The failed item left nothing behind, so it shows up again.
        let replan = fx.orchestrator.plan().await.unwrap();
        assert_eq!(replan.items.len(), 1);
        assert_eq!(
            replan.items[0].identifier.as_str(),
            "2024-03-04: MBA 505 Leadership"
        );
    }

    #[tokio::test]
    async fn test_remote_only_file_is_downloaded_and_processed() {
        // 2024-03-05 was a Tuesday; ending at 09:40 truncates to the 9:30
        // slot (MBA 520).
        let remote = Arc::new(StubRemote {
            files: vec![RemoteFile {
                id: "r1".to_string(),
                name: "20240305094000.wav".to_string(),
            }],
            uploads: AtomicUsize::new(0),
            list_fails: false,
        });

        let fx = fixture(&[], Some(remote), None);
        let plan = fx.orchestrator.plan().await.unwrap();
        assert_eq!(plan.items.len(), 1);
        assert!(matches!(plan.items[0].source, WorkSource::Remote { .. }));

        let report = fx.orchestrator.run(plan.items, false).await.unwrap();
        assert_eq!(report.completed, 1);
    }

    #[tokio::test]
    async fn test_local_copy_wins_over_remote_duplicate_without_reupload() {
        let remote = Arc::new(StubRemote {
            files: vec![RemoteFile {
                id: "r1".to_string(),
                name: MONDAY_0930.to_string(),
            }],
            uploads: AtomicUsize::new(0),
            list_fails: false,
        });
        let fx = fixture(&[MONDAY_0930], Some(remote.clone()), None);

        let plan = fx.orchestrator.plan().await.unwrap();
        assert_eq!(plan.items.len(), 1);
        assert!(matches!(plan.items[0].source, WorkSource::Local(_)));
        assert!(plan.items[0].remote_backed);

        // The remote listing already has this recording, so processing it
        // again must not push a second copy.
        let report = fx.orchestrator.run(plan.items, false).await.unwrap();
        assert_eq!(report.completed, 1);
        assert_eq!(remote.uploads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_local_only_recording_is_archived_once() {
        let remote = Arc::new(StubRemote {
            files: Vec::new(),
            uploads: AtomicUsize::new(0),
            list_fails: false,
        });
        let fx = fixture(&[MONDAY_0930], Some(remote.clone()), None);

        let plan = fx.orchestrator.plan().await.unwrap();
        assert_eq!(plan.items.len(), 1);
        assert!(!plan.items[0].remote_backed);

        let report = fx.orchestrator.run(plan.items, false).await.unwrap();
        assert_eq!(report.completed, 1);
        assert_eq!(remote.uploads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_listing_failure_falls_back_to_local_inventory() {
        let remote = Arc::new(StubRemote {
            files: Vec::new(),
            uploads: AtomicUsize::new(0),
            list_fails: true,
        });
        let fx = fixture(&[MONDAY_0930], Some(remote), None);

        let plan = fx.orchestrator.plan().await.unwrap();
        assert_eq!(plan.items.len(), 1);
        assert!(matches!(plan.items[0].source, WorkSource::Local(_)));

        let report = fx.orchestrator.run(plan.items, true).await.unwrap();
        assert_eq!(report.completed, 1);
    }

    #[test]
    fn test_status_tracker_defaults_to_pending() {
        let tracker = StatusTracker::new();
        assert_eq!(tracker.get("anything"), StageStatus::Pending);
        tracker.set("a", StageStatus::Processing);
        assert_eq!(tracker.get("a"), StageStatus::Processing);
        tracker.progress("a", "working");
        assert_eq!(tracker.last_progress("a").as_deref(), Some("working"));
    }
}
