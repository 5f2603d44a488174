//! Quality-tier fallback controller.
//!
//! One request runs the whole pipeline (ingest, overlay, music, encode,
//! thumbnail) at the best tier first and restarts from the original inputs
//! at the next cheaper tier whenever ingest or encode fails. Overlay, music
//! and thumbnail failures are absorbed inside the attempt. Tiers run
//! strictly one after another, never concurrently.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use reel_media::{
    load_font, AudioSelector, Compose, EncodeJob, Encoder, FfmpegEncoder, FrameSet, ImageIngestor,
    ImageThumbnailer, Ingest, MediaError, MediaResult, MusicSource, OverlayCompositor,
    OverlayContent, OverlayStyle, Thumbnailer,
};
use reel_models::{
    default_tiers, GenerationRequest, GenerationResult, Mood, MusicCatalog, QualityTier, SessionId,
};
use tokio::sync::watch;
use tracing::{info, warn, Instrument};

use crate::config::WorkerConfig;
use crate::error::{GenerationError, GenerationOutcome};
use crate::fallback::{FallbackMachine, Step};
use crate::logging::SessionLogger;
use crate::metrics;
use crate::retry::BackoffConfig;
use crate::session::{prune_stale_sessions, AttemptDirs, WorkSession};

/// The five stage implementations a generator drives.
#[derive(Clone)]
pub struct Stages {
    pub ingest: Arc<dyn Ingest>,
    pub compose: Arc<dyn Compose>,
    pub music: Arc<dyn MusicSource>,
    pub encoder: Arc<dyn Encoder>,
    pub thumbnailer: Arc<dyn Thumbnailer>,
}

impl Stages {
    /// Production stages configured from `config`. The encoder kills a
    /// running ffmpeg once `cancel_rx` turns true.
    ///
    /// A missing font is not an error here; overlays then fall back to the
    /// canonical frames one by one.
    pub fn from_config(
        config: &WorkerConfig,
        cancel_rx: watch::Receiver<bool>,
    ) -> MediaResult<Self> {
        let font = match load_font(&config.font_candidates()) {
            Ok(font) => Some(font),
            Err(e) => {
                warn!(error = %e, "No overlay font available, frames will not be overlaid");
                None
            }
        };
        let mut style = OverlayStyle::default().with_currency_symbol(config.currency_symbol.clone());
        if let Some(watermark) = &config.watermark_text {
            style = style.with_watermark(watermark.clone());
        }

        let catalog = MusicCatalog::from_base_url(&config.music_base_url).map_err(|e| {
            MediaError::internal(format!(
                "Invalid music base URL {}: {}",
                config.music_base_url, e
            ))
        })?;

        Ok(Self {
            ingest: Arc::new(ImageIngestor::new()),
            compose: Arc::new(OverlayCompositor::new(font, style)),
            music: Arc::new(AudioSelector::new(catalog, config.music_timeout)?),
            encoder: Arc::new(
                FfmpegEncoder::new()
                    .with_timeout(config.encode_timeout.as_secs())
                    .with_cancel(cancel_rx),
            ),
            thumbnailer: Arc::new(ImageThumbnailer::default()),
        })
    }
}

/// Why one tier attempt failed.
#[derive(Debug)]
struct StageFailure {
    stage: &'static str,
    error: MediaError,
}

impl StageFailure {
    fn at(stage: &'static str) -> impl FnOnce(MediaError) -> Self {
        move |error| Self { stage, error }
    }
}

/// Artifacts of a successful attempt.
#[derive(Debug)]
struct AttemptOutput {
    video: PathBuf,
    thumbnail: PathBuf,
    has_overlays: bool,
    has_music: bool,
    templates: Vec<usize>,
}

/// Renders reels with quality-tier fallback.
pub struct VideoGenerator {
    stages: Stages,
    tiers: Vec<QualityTier>,
    backoff: BackoffConfig,
    work_dir: PathBuf,
    retention: Option<Duration>,
    shutdown: watch::Sender<bool>,
}

impl VideoGenerator {
    /// Generator over `stages` with the default tier ladder and backoff.
    pub fn new(stages: Stages, work_dir: impl Into<PathBuf>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            stages,
            tiers: default_tiers(),
            backoff: BackoffConfig::default(),
            work_dir: work_dir.into(),
            retention: None,
            shutdown,
        }
    }

    /// Production generator; [`cancel`](Self::cancel) also stops its encoder.
    pub fn from_config(config: &WorkerConfig) -> MediaResult<Self> {
        let (shutdown, cancel_rx) = watch::channel(false);
        let stages = Stages::from_config(config, cancel_rx)?;
        let mut generator = Self::new(stages, config.work_dir.clone())
            .with_backoff(BackoffConfig::new(config.tier_backoff, config.tier_backoff_max))
            .with_retention(config.session_retention);
        generator.shutdown = shutdown;
        Ok(generator)
    }

    /// Replace the tier ladder; order is attempt order.
    pub fn with_tiers(mut self, tiers: Vec<QualityTier>) -> Self {
        self.tiers = tiers;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Prune sessions older than `retention` before each new session.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = Some(retention);
        self
    }

    pub fn tiers(&self) -> &[QualityTier] {
        &self.tiers
    }

    /// Receiver that turns true on [`cancel`](Self::cancel), for stages
    /// built outside [`from_config`](Self::from_config).
    pub fn cancel_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Stop all current and future generations. No further tier is
    /// attempted and results report [`GenerationError::Cancelled`].
    pub fn cancel(&self) {
        if !self.shutdown.send_replace(true) {
            info!("Generator cancelled");
        }
    }

    fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Render one request. Never panics on bad input; every failure is
    /// reported in the returned result.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        session_id: &SessionId,
    ) -> GenerationResult {
        let started = Instant::now();
        let logger = SessionLogger::new(session_id, "generate");
        let span = logger.create_span();

        let result = match self.run(request, session_id, &logger).instrument(span).await {
            Ok(result) => {
                logger.log_completion(&format!(
                    "tier={} duration={:.1}s overlays={} music={}",
                    result.tier.as_deref().unwrap_or("none"),
                    result.duration,
                    result.has_overlays,
                    result.has_music
                ));
                result
            }
            Err(e) => {
                logger.log_error(&e.to_string());
                e.into_result(request.images.len())
            }
        };

        metrics::record_generation(
            result.success,
            result.tier.as_deref(),
            started.elapsed().as_secs_f64(),
        );

        result
    }

    async fn run(
        &self,
        request: &GenerationRequest,
        session_id: &SessionId,
        logger: &SessionLogger,
    ) -> GenerationOutcome<GenerationResult> {
        request.validate()?;

        if let Some(retention) = self.retention {
            match prune_stale_sessions(&self.work_dir, retention).await {
                Ok(removed) => metrics::record_sessions_pruned(removed),
                Err(e) => warn!(error = %e, "Session pruning failed"),
            }
        }

        let session = WorkSession::create(&self.work_dir, session_id).await?;
        logger.log_start(&format!(
            "{} images, {:.1}s each, music={}",
            request.images.len(),
            request.duration_per_image,
            request.enable_music
        ));

        let content = match &request.product {
            Some(product) => OverlayContent::Product(product.clone()),
            None => OverlayContent::Title(request.title.clone()),
        };
        let mood = request.mood();

        let mut machine = FallbackMachine::new(self.tiers.clone());
        let mut produced: Option<AttemptOutput> = None;
        let mut step = machine.start();

        loop {
            step = match step {
                Step::Attempt { attempt, tier } => {
                    if self.is_cancelled() {
                        return Err(GenerationError::Cancelled);
                    }
                    let delay = self.backoff.delay_for_attempt(attempt);
                    if !delay.is_zero() {
                        let mut cancel_rx = self.shutdown.subscribe();
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = cancel_rx.changed() => {}
                        }
                        if self.is_cancelled() {
                            return Err(GenerationError::Cancelled);
                        }
                    }

                    metrics::record_tier_attempt(&tier.name);
                    logger.log_progress(&tier.name, &format!("attempt {} at {}", attempt, tier));

                    match self
                        .attempt(&session, attempt, &tier, request, &content, mood, logger)
                        .await
                    {
                        Ok(output) => {
                            produced = Some(output);
                            machine.on_success()
                        }
                        Err(StageFailure { stage, error }) => {
                            metrics::record_tier_failure(&tier.name, stage);
                            if matches!(error, MediaError::Cancelled) || self.is_cancelled() {
                                return Err(GenerationError::Cancelled);
                            }
                            if error.is_input_error() {
                                return Err(GenerationError::input(error.to_string()));
                            }
                            let message = error.detailed_message();
                            logger.log_warning(
                                &tier.name,
                                &format!("{} failed, falling back: {}", stage, message),
                            );
                            machine.on_failure(message)
                        }
                    }
                }
                Step::Succeeded { tier } => {
                    let Some(output) = produced.take() else {
                        return Err(GenerationError::TierExhausted {
                            tier: tier.name,
                            message: "attempt finished without output".to_string(),
                        });
                    };
                    return Ok(GenerationResult {
                        success: true,
                        video_path: Some(output.video),
                        thumbnail_path: Some(output.thumbnail),
                        duration: request.total_duration(),
                        image_count: request.images.len(),
                        tier: Some(tier.name),
                        has_overlays: output.has_overlays,
                        has_music: output.has_music,
                        overlay_templates: output.templates,
                        error: None,
                        completed_at: Utc::now(),
                    });
                }
                Step::Exhausted { tier, message } => {
                    return Err(GenerationError::TierExhausted { tier, message });
                }
            };
        }
    }

    /// One full pipeline run at `tier`.
    #[allow(clippy::too_many_arguments)]
    async fn attempt(
        &self,
        session: &WorkSession,
        attempt: u32,
        tier: &QualityTier,
        request: &GenerationRequest,
        content: &OverlayContent,
        mood: Mood,
        logger: &SessionLogger,
    ) -> Result<AttemptOutput, StageFailure> {
        let dirs = session
            .attempt_dirs(attempt, tier)
            .await
            .map_err(|e| StageFailure::at("workspace")(e.into()))?;

        let canonical = self
            .stages
            .ingest
            .ingest(&request.images, tier.width, tier.height, &dirs.canonical)
            .await
            .map_err(StageFailure::at("ingest"))?;

        let (frames, has_overlays, templates) = self.overlay(&canonical, content, &dirs, tier, logger).await;

        let audio = if request.enable_music {
            self.fetch_music(mood, &dirs, tier, logger).await
        } else {
            None
        };

        let job = EncodeJob {
            frames: &frames,
            duration_per_frame: request.duration_per_image,
            tier,
            audio: audio.as_deref(),
            work_dir: &dirs.root,
        };
        let encode_started = Instant::now();
        let encoded = self.stages.encoder.encode(&job).await;
        metrics::record_encode_duration(
            &tier.name,
            encoded.is_ok(),
            encode_started.elapsed().as_secs_f64(),
        );
        let video = encoded.map_err(StageFailure::at("encode"))?;

        match tokio::fs::metadata(&video).await {
            Ok(meta) if meta.len() > 0 => {}
            _ => return Err(StageFailure::at("encode")(MediaError::OutputMissing(video))),
        }

        let first = frames
            .first()
            .cloned()
            .ok_or_else(|| StageFailure::at("ingest")(MediaError::internal("no frames")))?;
        let thumbnail = match self.stages.thumbnailer.thumbnail(&first, &dirs.thumbnail).await {
            Ok(path) => path,
            Err(e) => {
                logger.log_warning(&tier.name, &format!("thumbnail failed, using first frame: {}", e));
                metrics::record_absorbed_failure("thumbnail", 1);
                first
            }
        };

        Ok(AttemptOutput {
            video,
            thumbnail,
            has_overlays,
            has_music: audio.is_some(),
            templates,
        })
    }

    /// Composite overlays; any failure leaves the canonical frames in use.
    async fn overlay(
        &self,
        canonical: &FrameSet,
        content: &OverlayContent,
        dirs: &AttemptDirs,
        tier: &QualityTier,
        logger: &SessionLogger,
    ) -> (Vec<PathBuf>, bool, Vec<usize>) {
        match self.stages.compose.compose(canonical, content, &dirs.overlay).await {
            Ok(overlaid) if overlaid.frames.len() == canonical.len() => {
                if !overlaid.failed.is_empty() {
                    logger.log_warning(
                        &tier.name,
                        &format!("overlay failed on frames {:?}, passed through", overlaid.failed),
                    );
                    metrics::record_absorbed_failure("overlay", overlaid.failed.len() as u64);
                }
                let applied = overlaid.any_applied();
                let templates = overlaid.applied_templates();
                (overlaid.frames, applied, templates)
            }
            Ok(overlaid) => {
                logger.log_warning(
                    &tier.name,
                    &format!(
                        "compositor returned {} frames for {} inputs, using canonical frames",
                        overlaid.frames.len(),
                        canonical.len()
                    ),
                );
                metrics::record_absorbed_failure("overlay", canonical.len() as u64);
                (canonical.frames.clone(), false, Vec::new())
            }
            Err(e) => {
                logger.log_warning(&tier.name, &format!("overlay failed, using canonical frames: {}", e));
                metrics::record_absorbed_failure("overlay", canonical.len() as u64);
                (canonical.frames.clone(), false, Vec::new())
            }
        }
    }

    async fn fetch_music(
        &self,
        mood: Mood,
        dirs: &AttemptDirs,
        tier: &QualityTier,
        logger: &SessionLogger,
    ) -> Option<PathBuf> {
        match self.stages.music.fetch(mood, &dirs.music).await {
            Ok(path) => Some(path),
            Err(e) => {
                logger.log_warning(&tier.name, &format!("music unavailable, encoding silent: {}", e));
                metrics::record_absorbed_failure("music", 1);
                None
            }
        }
    }
}
