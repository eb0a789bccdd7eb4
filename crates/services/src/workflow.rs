use std::path::PathBuf;

use crescent_domain::{BeatHistory, GenerateRequest, HistoryItem};
use crescent_transcriber::{TranscriptionJob, TranscriptionPipeline};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::artifacts::ArtifactStore;
use crate::client::{GeneratedAudio, MusicGenerator};
use crate::error::ServiceError;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BeatResponse {
    pub id: String,
    pub audio_url: String,
    /// Absent when the drum track could not be produced.
    pub midi_url: Option<String>,
    pub params: GenerateRequest,
}

pub fn audio_url(id: &str) -> String {
    format!("/api/export/audio/{id}")
}

pub fn midi_url(id: &str) -> String {
    format!("/api/export/midi/{id}")
}

/// Generates a beat, stores its audio, derives a drum track and records it in
/// the caller's history.
pub struct BeatWorkflow<G> {
    generator: G,
    store: ArtifactStore,
    pipeline: TranscriptionPipeline,
    history_path: Option<PathBuf>,
    normalize_audio: bool,
}

impl<G: MusicGenerator> BeatWorkflow<G> {
    pub fn new(generator: G, store: ArtifactStore) -> Self {
        Self {
            generator,
            store,
            pipeline: TranscriptionPipeline::default(),
            history_path: None,
            normalize_audio: false,
        }
    }

    pub fn with_pipeline(mut self, pipeline: TranscriptionPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Persist the history here after every generated beat.
    pub fn with_history_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.history_path = Some(path.into());
        self
    }

    pub fn with_normalize_audio(mut self, normalize: bool) -> Self {
        self.normalize_audio = normalize;
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Only validation, generation and the audio write can fail the call; the
    /// drum track and history file are best-effort.
    #[instrument(skip_all, fields(genre = %request.genre, bpm = request.bpm))]
    pub async fn generate(
        &self,
        request: &GenerateRequest,
        history: &mut BeatHistory,
    ) -> Result<BeatResponse, ServiceError> {
        request.validate()?;
        let prompt = request.build_prompt();
        let audio = self.generator.generate(&prompt, request.length_ms()).await?;
        self.store_beat(request, audio, history).await
    }

    /// Renders a composition plan with the request's seed. The request also
    /// sets the drum track tempo and is what gets recorded in history.
    #[instrument(skip_all, fields(genre = %request.genre, bpm = request.bpm, seed = ?request.seed))]
    pub async fn generate_from_plan(
        &self,
        plan: &serde_json::Value,
        request: &GenerateRequest,
        history: &mut BeatHistory,
    ) -> Result<BeatResponse, ServiceError> {
        request.validate()?;
        let audio = self.generator.generate_from_plan(plan, request.seed).await?;
        self.store_beat(request, audio, history).await
    }

    async fn store_beat(
        &self,
        request: &GenerateRequest,
        audio: GeneratedAudio,
        history: &mut BeatHistory,
    ) -> Result<BeatResponse, ServiceError> {
        let id = ArtifactStore::new_id();
        let audio_path = self.store.write_audio(&id, audio.extension, &audio.bytes)?;
        info!(%id, path = %audio_path.display(), "stored generated audio");

        let midi_path = self.store.midi_path(&id)?;
        let job = TranscriptionJob::new(audio_path, midi_path)
            .with_target_bpm(request.bpm)
            .with_normalize(self.normalize_audio);
        let midi_url = self.convert(job).await.then(|| midi_url(&id));

        history.record(HistoryItem {
            id: id.clone(),
            params: request.clone(),
            created_at: OffsetDateTime::now_utc(),
        });
        if let Some(path) = &self.history_path {
            if let Err(err) = history.save(path) {
                warn!(error = %err, path = %path.display(), "could not save history");
            }
        }

        Ok(BeatResponse {
            audio_url: audio_url(&id),
            midi_url,
            id,
            params: request.clone(),
        })
    }

    /// Runs the drum conversion on the blocking pool. Returns whether a MIDI
    /// file was written.
    async fn convert(&self, job: TranscriptionJob) -> bool {
        let pipeline = self.pipeline.clone();
        match tokio::task::spawn_blocking(move || pipeline.transcribe(&job)).await {
            Ok(Ok(report)) => {
                info!(
                    events = report.event_count,
                    detected_bpm = report.estimate.bpm(),
                    normalization = ?report.normalization,
                    "wrote drum track"
                );
                true
            }
            Ok(Err(err)) => {
                warn!(stage = %err.stage(), error = %err, "skipping drum track");
                false
            }
            Err(err) => {
                warn!(error = %err, "drum conversion task failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use crescent_audio::io::{pcm16_spec, write_wav, AudioReader};
    use crescent_audio::signal::click_track;
    use crescent_domain::{Genre, Instrument, Mood};

    struct FixedAudio(GeneratedAudio);

    #[async_trait]
    impl MusicGenerator for FixedAudio {
        async fn generate(&self, _prompt: &str, _length_ms: u64) -> Result<GeneratedAudio, ServiceError> {
            Ok(self.0.clone())
        }

        async fn generate_from_plan(
            &self,
            _plan: &serde_json::Value,
            _seed: Option<u32>,
        ) -> Result<GeneratedAudio, ServiceError> {
            Ok(self.0.clone())
        }
    }

    /// Remembers the plan and seed it was asked to render.
    struct PlanRecorder {
        audio: GeneratedAudio,
        seen: Mutex<Option<(serde_json::Value, Option<u32>)>>,
    }

    #[async_trait]
    impl MusicGenerator for PlanRecorder {
        async fn generate(&self, _prompt: &str, _length_ms: u64) -> Result<GeneratedAudio, ServiceError> {
            panic!("prompt generation not expected");
        }

        async fn generate_from_plan(
            &self,
            plan: &serde_json::Value,
            seed: Option<u32>,
        ) -> Result<GeneratedAudio, ServiceError> {
            *self.seen.lock().unwrap() = Some((plan.clone(), seed));
            Ok(self.audio.clone())
        }
    }

    struct Unavailable;

    fn busy() -> ServiceError {
        ServiceError::Api {
            status: 503,
            body: "busy".to_string(),
        }
    }

    #[async_trait]
    impl MusicGenerator for Unavailable {
        async fn generate(&self, _prompt: &str, _length_ms: u64) -> Result<GeneratedAudio, ServiceError> {
            Err(busy())
        }

        async fn generate_from_plan(
            &self,
            _plan: &serde_json::Value,
            _seed: Option<u32>,
        ) -> Result<GeneratedAudio, ServiceError> {
            Err(busy())
        }
    }

    fn click_wav() -> Vec<u8> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clicks.wav");
        let audio = AudioReader {
            sample_rate: 22_050,
            channels: 1,
            samples: click_track(22_050, 21 * 512, 22_050 * 4),
        };
        write_wav(&path, &audio, pcm16_spec(22_050, 1)).unwrap();
        std::fs::read(&path).unwrap()
    }

    fn request() -> GenerateRequest {
        let mut request = GenerateRequest::new(Genre::Trap, Mood::Dark, vec![Instrument::Drums]);
        request.bpm = 140;
        request
    }

    #[tokio::test]
    async fn generated_beat_gets_audio_midi_and_history() {
        let dir = tempfile::tempdir().unwrap();
        let generator = FixedAudio(GeneratedAudio {
            bytes: click_wav(),
            extension: "wav",
        });
        let workflow = BeatWorkflow::new(generator, ArtifactStore::new(dir.path()))
            .with_history_path(dir.path().join("history.json"));
        let mut history = BeatHistory::new();

        let response = workflow.generate(&request(), &mut history).await.unwrap();
        assert_eq!(response.audio_url, format!("/api/export/audio/{}", response.id));
        assert_eq!(response.midi_url, Some(midi_url(&response.id)));
        assert_eq!(response.params.bpm, 140);

        let store = workflow.store();
        assert!(store.find_audio(&response.id).is_ok());
        assert!(store.find_midi(&response.id).is_ok());
        assert_eq!(history.recent()[0].id, response.id);
        let saved = BeatHistory::load(&dir.path().join("history.json")).unwrap();
        assert_eq!(saved, history);
    }

    #[tokio::test]
    async fn mp3_audio_is_normalized_before_detection() {
        let dir = tempfile::tempdir().unwrap();
        let generator = FixedAudio(GeneratedAudio {
            bytes: click_wav(),
            extension: "mp3",
        });
        let workflow = BeatWorkflow::new(generator, ArtifactStore::new(dir.path()))
            .with_normalize_audio(true);
        let mut history = BeatHistory::new();

        let response = workflow.generate(&request(), &mut history).await.unwrap();
        assert!(response.midi_url.is_some());
        let audio = workflow.store().find_audio(&response.id).unwrap();
        assert_eq!(audio.extension().unwrap(), "mp3");
        assert_eq!(std::fs::read(audio).unwrap(), click_wav());
    }

    #[tokio::test]
    async fn undecodable_audio_omits_midi_only() {
        let dir = tempfile::tempdir().unwrap();
        let generator = FixedAudio(GeneratedAudio {
            bytes: b"not audio at all".to_vec(),
            extension: "mp3",
        });
        let workflow = BeatWorkflow::new(generator, ArtifactStore::new(dir.path()));
        let mut history = BeatHistory::new();

        let response = workflow.generate(&request(), &mut history).await.unwrap();
        assert_eq!(response.midi_url, None);
        assert!(workflow.store().find_audio(&response.id).is_ok());
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn plan_renders_with_request_seed() {
        let dir = tempfile::tempdir().unwrap();
        let generator = PlanRecorder {
            audio: GeneratedAudio {
                bytes: click_wav(),
                extension: "wav",
            },
            seen: Mutex::new(None),
        };
        let workflow = BeatWorkflow::new(generator, ArtifactStore::new(dir.path()));
        let plan = serde_json::json!({"positive_global_styles": ["afrobeats"], "sections": []});
        let mut seeded = request();
        seeded.seed = Some(99);
        let mut history = BeatHistory::new();

        let response = workflow
            .generate_from_plan(&plan, &seeded, &mut history)
            .await
            .unwrap();
        assert_eq!(response.midi_url, Some(midi_url(&response.id)));
        assert_eq!(response.params.seed, Some(99));
        assert_eq!(history.get(&response.id).unwrap().params, seeded);
        let seen = workflow.generator.seen.lock().unwrap().clone();
        assert_eq!(seen, Some((plan, Some(99))));
    }

    #[tokio::test]
    async fn plan_failure_records_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let workflow = BeatWorkflow::new(Unavailable, ArtifactStore::new(dir.path()));
        let mut history = BeatHistory::new();
        let err = workflow
            .generate_from_plan(&serde_json::json!({}), &request(), &mut history)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Api { status: 503, .. }));
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn generation_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let workflow = BeatWorkflow::new(Unavailable, ArtifactStore::new(dir.path()));
        let mut history = BeatHistory::new();

        let err = workflow.generate(&request(), &mut history).await.unwrap_err();
        assert!(matches!(err, ServiceError::Api { status: 503, .. }));
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn invalid_request_never_reaches_generator() {
        let dir = tempfile::tempdir().unwrap();
        let workflow = BeatWorkflow::new(Unavailable, ArtifactStore::new(dir.path()));
        let mut bad = request();
        bad.instruments.clear();

        let err = workflow.generate(&bad, &mut BeatHistory::new()).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRequest(_)));
    }
}
