//! Controller integration tests.
//!
//! Real ingestion and thumbnailing run against tiny in-memory PNGs; the
//! encoder, music source and (where noted) compositor are fakes.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use fontdue::{Font, FontSettings};
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use reel_media::encode::write_manifest;
use reel_media::{
    Compose, EncodeJob, Encoder, FrameSet, ImageIngestor, ImageThumbnailer, Ingest, MediaError,
    MediaResult, MusicSource, OverlayCompositor, OverlayContent, OverlayFrames, OverlayStyle,
    OverlayTemplate, Thumbnailer,
};
use reel_models::encoding::frame_file_name;
use reel_models::{
    GenerationRequest, ImageSource, Mood, Price, ProductMetadata, QualityTier, SessionId,
};
use reel_worker::{BackoffConfig, Stages, VideoGenerator};
use tempfile::TempDir;

// ---- fixtures ----

fn png_data_uri(width: u32, height: u32, shade: u8) -> ImageSource {
    let img = RgbImage::from_pixel(width, height, Rgb([shade, 100, 200 - shade]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .unwrap();
    ImageSource::base64(format!("data:image/png;base64,{}", STANDARD.encode(bytes)))
}

fn images(n: usize) -> Vec<ImageSource> {
    (0..n)
        .map(|i| png_data_uri(40 + i as u32 * 10, 30, i as u8 * 20))
        .collect()
}

fn test_font() -> Font {
    let bytes: &[u8] = include_bytes!("../../reel-media/tests/fixtures/DejaVuSans-Bold.ttf");
    Font::from_bytes(bytes, FontSettings::default()).unwrap()
}

fn product() -> ProductMetadata {
    ProductMetadata {
        brand: "Acme".into(),
        product_name: "Widget".into(),
        price: Price::Amount(999.0),
        discount: Some("20% OFF".into()),
    }
}

/// Same names and order as the production ladder, at thumbnail sizes.
fn small_tiers() -> Vec<QualityTier> {
    vec![
        QualityTier::new("high", 72, 128, 23, "fast"),
        QualityTier::new("medium", 54, 96, 26, "faster"),
        QualityTier::new("low", 36, 64, 28, "veryfast"),
        QualityTier::new("minimal", 18, 32, 30, "ultrafast"),
    ]
}

// ---- fakes ----

#[derive(Default)]
struct CountingIngest {
    inner: ImageIngestor,
    calls: AtomicUsize,
}

#[async_trait]
impl Ingest for CountingIngest {
    async fn ingest(
        &self,
        images: &[ImageSource],
        width: u32,
        height: u32,
        out_dir: &Path,
    ) -> MediaResult<FrameSet> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.ingest(images, width, height, out_dir).await
    }
}

/// Copies frames and reports the template each one would get.
struct TemplateRecordingCompose;

#[async_trait]
impl Compose for TemplateRecordingCompose {
    async fn compose(
        &self,
        frames: &FrameSet,
        content: &OverlayContent,
        out_dir: &Path,
    ) -> MediaResult<OverlayFrames> {
        let mut out = Vec::new();
        let mut templates = Vec::new();
        for (i, frame) in frames.frames.iter().enumerate() {
            let dest = out_dir.join(frame_file_name(i));
            std::fs::copy(frame, &dest)?;
            out.push(dest);
            templates.push(match content {
                OverlayContent::Product(_) => Some(OverlayTemplate::for_frame(i).index()),
                OverlayContent::Title(_) => None,
            });
        }
        Ok(OverlayFrames {
            applied: templates.iter().map(Option::is_some).collect(),
            frames: out,
            templates,
            failed: Vec::new(),
        })
    }
}

struct FailingCompose;

#[async_trait]
impl Compose for FailingCompose {
    async fn compose(&self, _: &FrameSet, _: &OverlayContent, _: &Path) -> MediaResult<OverlayFrames> {
        Err(MediaError::internal("compositor crashed"))
    }
}

#[derive(Default)]
struct FakeMusic {
    fail: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl MusicSource for FakeMusic {
    async fn fetch(&self, _mood: Mood, dest: &Path) -> MediaResult<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(MediaError::download_failed("503 Service Unavailable"));
        }
        tokio::fs::write(dest, b"ID3 fake track").await?;
        Ok(dest.to_path_buf())
    }
}

/// Records (tier, had audio) per call; fails the listed tiers.
#[derive(Default)]
struct FakeEncoder {
    fail_tiers: Vec<&'static str>,
    calls: Mutex<Vec<(String, bool)>>,
}

impl FakeEncoder {
    fn failing(tiers: &[&'static str]) -> Self {
        Self {
            fail_tiers: tiers.to_vec(),
            ..Self::default()
        }
    }

    fn tiers_called(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }
}

#[async_trait]
impl Encoder for FakeEncoder {
    async fn encode(&self, job: &EncodeJob<'_>) -> MediaResult<PathBuf> {
        self.calls
            .lock()
            .unwrap()
            .push((job.tier.name.clone(), job.audio.is_some()));
        if self.fail_tiers.contains(&job.tier.name.as_str()) {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some(format!("Killed at {}", job.tier.name)),
                Some(137),
            ));
        }
        let output = job.work_dir.join("video.mp4");
        let body = format!("{} frames @ {}s", job.frames.len(), job.duration_per_frame);
        tokio::fs::write(&output, body).await?;
        Ok(output)
    }
}

/// Writes the real concat manifest and checks every entry resolves the
/// way the demuxer resolves it: relative to the manifest's directory.
#[derive(Default)]
struct ManifestCheckingEncoder {
    unresolved: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl Encoder for ManifestCheckingEncoder {
    async fn encode(&self, job: &EncodeJob<'_>) -> MediaResult<PathBuf> {
        let manifest_path = write_manifest(job).await?;
        let manifest = tokio::fs::read_to_string(&manifest_path).await?;
        let base = manifest_path.parent().unwrap_or(Path::new("")).to_path_buf();
        for entry in manifest.lines().filter_map(|l| l.strip_prefix("file '")) {
            let resolved = base.join(entry.trim_end_matches('\''));
            if !resolved.is_file() {
                self.unresolved.lock().unwrap().push(resolved);
            }
        }
        let output = job.work_dir.join("video.mp4");
        tokio::fs::write(&output, b"video").await?;
        Ok(output)
    }
}

/// Reports cancellation the way the ffmpeg encoder does.
struct CancelledEncoder {
    calls: AtomicUsize,
}

#[async_trait]
impl Encoder for CancelledEncoder {
    async fn encode(&self, _: &EncodeJob<'_>) -> MediaResult<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(MediaError::Cancelled)
    }
}

struct FailingThumbnailer;

#[async_trait]
impl Thumbnailer for FailingThumbnailer {
    async fn thumbnail(&self, _: &Path, _: &Path) -> MediaResult<PathBuf> {
        Err(MediaError::internal("no encoder for jpeg"))
    }
}

struct Harness {
    dir: TempDir,
    ingest: Arc<CountingIngest>,
    music: Arc<FakeMusic>,
    encoder: Arc<FakeEncoder>,
    generator: VideoGenerator,
}

impl Harness {
    fn new(encoder: FakeEncoder) -> Self {
        Self::with(
            encoder,
            FakeMusic::default(),
            Arc::new(TemplateRecordingCompose),
            Arc::new(ImageThumbnailer::default()),
        )
    }

    fn with(
        encoder: FakeEncoder,
        music: FakeMusic,
        compose: Arc<dyn Compose>,
        thumbnailer: Arc<dyn Thumbnailer>,
    ) -> Self {
        let dir = TempDir::new().unwrap();
        let ingest = Arc::new(CountingIngest::default());
        let music = Arc::new(music);
        let encoder = Arc::new(encoder);
        let stages = Stages {
            ingest: ingest.clone(),
            compose,
            music: music.clone(),
            encoder: encoder.clone(),
            thumbnailer,
        };
        let generator = VideoGenerator::new(stages, dir.path())
            .with_tiers(small_tiers())
            .with_backoff(BackoffConfig::none());

        Self {
            dir,
            ingest,
            music,
            encoder,
            generator,
        }
    }
}

// ---- tests ----

#[tokio::test]
async fn test_image_count_out_of_range_rejected_before_decoding() {
    for n in [0, 1, 7] {
        let h = Harness::new(FakeEncoder::default());
        let request = GenerationRequest::new(images(n), "Title");

        let result = h.generator.generate(&request, &SessionId::new()).await;

        assert!(!result.success);
        assert_eq!(result.image_count, n);
        assert!(result.error.unwrap().contains(&format!("got {}", n)));
        assert_eq!(h.ingest.calls.load(Ordering::SeqCst), 0);
        assert!(h.encoder.tiers_called().is_empty());
    }
}

#[tokio::test]
async fn test_top_tier_success_short_circuits() {
    let h = Harness::new(FakeEncoder::default());
    let request = GenerationRequest::new(images(2), "Summer drop").with_music(false);

    let result = h.generator.generate(&request, &SessionId::new()).await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.tier.as_deref(), Some("high"));
    assert_eq!(h.encoder.tiers_called(), vec!["high"]);
    assert_eq!(h.ingest.calls.load(Ordering::SeqCst), 1);
    assert!(result.video_path.unwrap().is_file());

    let thumb = image::open(result.thumbnail_path.unwrap()).unwrap();
    assert_eq!((thumb.width(), thumb.height()), (72, 128));
}

#[tokio::test]
async fn test_scenario_product_overlays_without_music() {
    let h = Harness::new(FakeEncoder::default());
    let request = GenerationRequest::new(images(3), "ignored")
        .with_duration(2.0)
        .with_product(product())
        .with_music(false);

    let result = h.generator.generate(&request, &SessionId::new()).await;

    assert!(result.success);
    assert_eq!(result.duration, 6.0);
    assert!(result.has_overlays);
    assert!(!result.has_music);
    assert_eq!(result.overlay_templates, vec![0, 1, 2]);
    assert_eq!(h.music.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_scenario_all_encodes_fail_names_last_tier() {
    let h = Harness::new(FakeEncoder::failing(&["high", "medium", "low", "minimal"]));
    let request = GenerationRequest::new(images(2), "Title").with_music(false);

    let result = h.generator.generate(&request, &SessionId::new()).await;

    assert!(!result.success);
    assert!(result.video_path.is_none());
    let error = result.error.unwrap();
    assert!(error.contains("minimal"), "{}", error);
    assert_eq!(
        h.encoder.tiers_called(),
        vec!["high", "medium", "low", "minimal"]
    );
    // Every tier restarts from the original inputs.
    assert_eq!(h.ingest.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_fallback_stops_at_first_working_tier() {
    let h = Harness::new(FakeEncoder::failing(&["high", "medium"]));
    let request = GenerationRequest::new(images(4), "Title").with_music(false);
    let session = SessionId::new();

    let result = h.generator.generate(&request, &session).await;

    assert!(result.success);
    assert_eq!(result.tier.as_deref(), Some("low"));
    assert_eq!(h.encoder.tiers_called(), vec!["high", "medium", "low"]);

    let session_dir = h.dir.path().join(session.as_str());
    assert!(session_dir.join("1_high").is_dir());
    assert!(session_dir.join("3_low/video.mp4").is_file());
    assert!(!session_dir.join("4_minimal").exists());

    let thumb = image::open(result.thumbnail_path.unwrap()).unwrap();
    assert_eq!((thumb.width(), thumb.height()), (36, 64));
}

#[tokio::test]
async fn test_scenario_overlay_output_is_deterministic() {
    let compositor = Arc::new(OverlayCompositor::new(
        Some(test_font()),
        OverlayStyle::default(),
    ));
    let h = Harness::with(
        FakeEncoder::default(),
        FakeMusic::default(),
        compositor,
        Arc::new(ImageThumbnailer::default()),
    );
    let request = GenerationRequest::new(images(2), "Same input")
        .with_product(product())
        .with_music(false);

    let (a, b) = (SessionId::new(), SessionId::new());
    let first_run = h.generator.generate(&request, &a).await;
    assert!(first_run.success);
    assert!(first_run.has_overlays);
    assert_eq!(first_run.overlay_templates, vec![0, 1]);
    assert!(h.generator.generate(&request, &b).await.success);

    let session_dir = h.dir.path().join(a.as_str()).join("1_high");
    let canonical = std::fs::read(session_dir.join("canonical").join(frame_file_name(0))).unwrap();
    let overlaid = std::fs::read(session_dir.join("overlay").join(frame_file_name(0))).unwrap();
    assert_ne!(canonical, overlaid);

    for i in 0..2 {
        let name = frame_file_name(i);
        let overlay = |id: &SessionId| h.dir.path().join(id.as_str()).join("1_high/overlay");
        let first = std::fs::read(overlay(&a).join(&name)).unwrap();
        let second = std::fs::read(overlay(&b).join(&name)).unwrap();
        assert_eq!(first, second, "frame {} differs between runs", i);
    }
}

#[tokio::test]
async fn test_music_failure_is_absorbed() {
    let h = Harness::with(
        FakeEncoder::default(),
        FakeMusic {
            fail: true,
            ..FakeMusic::default()
        },
        Arc::new(TemplateRecordingCompose),
        Arc::new(ImageThumbnailer::default()),
    );
    let request = GenerationRequest::new(images(2), "Title").with_mood("calm");

    let result = h.generator.generate(&request, &SessionId::new()).await;

    assert!(result.success);
    assert!(!result.has_music);
    assert_eq!(result.tier.as_deref(), Some("high"));
    assert_eq!(h.music.calls.load(Ordering::SeqCst), 1);
    assert_eq!(*h.encoder.calls.lock().unwrap(), vec![("high".to_string(), false)]);
}

#[tokio::test]
async fn test_music_is_muxed_when_available() {
    let h = Harness::new(FakeEncoder::default());
    let request = GenerationRequest::new(images(2), "Title");

    let result = h.generator.generate(&request, &SessionId::new()).await;

    assert!(result.success);
    assert!(result.has_music);
    assert_eq!(*h.encoder.calls.lock().unwrap(), vec![("high".to_string(), true)]);
}

#[tokio::test]
async fn test_duration_is_count_times_per_image() {
    for n in 2..=6 {
        let h = Harness::new(FakeEncoder::failing(&["high"]));
        let request = GenerationRequest::new(images(n), "Title")
            .with_duration(1.5)
            .with_music(false);

        let result = h.generator.generate(&request, &SessionId::new()).await;

        assert!(result.success);
        assert_eq!(result.image_count, n);
        assert_eq!(result.duration, n as f64 * 1.5);
    }
}

#[tokio::test]
async fn test_undecodable_image_fails_without_fallback() {
    let h = Harness::new(FakeEncoder::default());
    let mut sources = images(2);
    sources.push(ImageSource::base64(STANDARD.encode(b"definitely not an image")));
    let request = GenerationRequest::new(sources, "Title").with_music(false);

    let result = h.generator.generate(&request, &SessionId::new()).await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("Image 3"));
    assert_eq!(h.ingest.calls.load(Ordering::SeqCst), 1);
    assert!(h.encoder.tiers_called().is_empty());
}

#[tokio::test]
async fn test_thumbnail_failure_uses_first_frame() {
    let h = Harness::with(
        FakeEncoder::default(),
        FakeMusic::default(),
        Arc::new(TemplateRecordingCompose),
        Arc::new(FailingThumbnailer),
    );
    let request = GenerationRequest::new(images(2), "Title").with_music(false);
    let session = SessionId::new();

    let result = h.generator.generate(&request, &session).await;

    assert!(result.success);
    let expected = h
        .dir
        .path()
        .join(session.as_str())
        .join("1_high/overlay")
        .join(frame_file_name(0));
    assert_eq!(result.thumbnail_path, Some(expected));
}

#[tokio::test]
async fn test_compositor_failure_falls_back_to_canonical_frames() {
    let h = Harness::with(
        FakeEncoder::default(),
        FakeMusic::default(),
        Arc::new(FailingCompose),
        Arc::new(ImageThumbnailer::default()),
    );
    let request = GenerationRequest::new(images(3), "Title")
        .with_product(product())
        .with_music(false);

    let result = h.generator.generate(&request, &SessionId::new()).await;

    assert!(result.success);
    assert!(!result.has_overlays);
    assert!(result.overlay_templates.is_empty());
    assert_eq!(h.encoder.tiers_called(), vec!["high"]);
}

#[tokio::test]
async fn test_reused_session_id_is_rejected() {
    let h = Harness::new(FakeEncoder::default());
    let request = GenerationRequest::new(images(2), "Title").with_music(false);
    let session = SessionId::from_string("fixed-session");

    assert!(h.generator.generate(&request, &session).await.success);
    let second = h.generator.generate(&request, &session).await;

    assert!(!second.success);
    assert!(second.error.unwrap().contains("already exists"));
    assert_eq!(h.encoder.tiers_called(), vec!["high"]);
}

#[tokio::test]
async fn test_real_compositor_passes_failing_frame_through() {
    // The ingestor writes canonical frames, so corrupt one between stages.
    struct CorruptingCompose(OverlayCompositor);

    #[async_trait]
    impl Compose for CorruptingCompose {
        async fn compose(
            &self,
            frames: &FrameSet,
            content: &OverlayContent,
            out_dir: &Path,
        ) -> MediaResult<OverlayFrames> {
            tokio::fs::write(&frames.frames[1], b"truncated").await?;
            self.0.compose(frames, content, out_dir).await
        }
    }

    let compositor = OverlayCompositor::new(Some(test_font()), OverlayStyle::default());
    let h = Harness::with(
        FakeEncoder::default(),
        FakeMusic::default(),
        Arc::new(CorruptingCompose(compositor)),
        Arc::new(ImageThumbnailer::default()),
    );
    let request = GenerationRequest::new(images(3), "Title")
        .with_product(product())
        .with_music(false);
    let session = SessionId::new();

    let result = h.generator.generate(&request, &session).await;

    assert!(result.success);
    assert!(result.has_overlays);
    assert_eq!(result.overlay_templates, vec![0, 2]);

    let attempt = h.dir.path().join(session.as_str()).join("1_high");
    let read = |dir: &str, i: usize| {
        std::fs::read(attempt.join(dir).join(frame_file_name(i))).unwrap()
    };
    assert_eq!(read("canonical", 1), read("overlay", 1));
    assert_ne!(read("canonical", 0), read("overlay", 0));
    assert_ne!(read("canonical", 2), read("overlay", 2));
}

#[tokio::test]
async fn test_relative_work_dir_manifest_resolves() {
    let relative = PathBuf::from(format!("reel-rel-gen-{}", SessionId::new()));
    let encoder = Arc::new(ManifestCheckingEncoder::default());
    let stages = Stages {
        ingest: Arc::new(ImageIngestor::new()),
        compose: Arc::new(TemplateRecordingCompose),
        music: Arc::new(FakeMusic::default()),
        encoder: encoder.clone(),
        thumbnailer: Arc::new(ImageThumbnailer::default()),
    };
    let generator = VideoGenerator::new(stages, &relative)
        .with_tiers(small_tiers())
        .with_backoff(BackoffConfig::none());
    let request = GenerationRequest::new(images(2), "Title").with_music(false);

    let result = generator.generate(&request, &SessionId::new()).await;
    let _ = std::fs::remove_dir_all(&relative);

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.tier.as_deref(), Some("high"));
    assert!(result.video_path.unwrap().is_absolute());
    assert!(
        encoder.unresolved.lock().unwrap().is_empty(),
        "{:?}",
        encoder.unresolved.lock().unwrap()
    );
}

#[tokio::test]
async fn test_cancelled_generator_attempts_nothing() {
    let h = Harness::new(FakeEncoder::default());
    let request = GenerationRequest::new(images(2), "Title").with_music(false);
    let cancel_rx = h.generator.cancel_receiver();

    h.generator.cancel();
    let result = h.generator.generate(&request, &SessionId::new()).await;

    assert!(*cancel_rx.borrow());
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Generation cancelled"));
    assert_eq!(h.ingest.calls.load(Ordering::SeqCst), 0);
    assert!(h.encoder.tiers_called().is_empty());
}

#[tokio::test]
async fn test_cancelled_encode_does_not_fall_back() {
    let dir = TempDir::new().unwrap();
    let encoder = Arc::new(CancelledEncoder {
        calls: AtomicUsize::new(0),
    });
    let stages = Stages {
        ingest: Arc::new(ImageIngestor::new()),
        compose: Arc::new(TemplateRecordingCompose),
        music: Arc::new(FakeMusic::default()),
        encoder: encoder.clone(),
        thumbnailer: Arc::new(ImageThumbnailer::default()),
    };
    let generator = VideoGenerator::new(stages, dir.path())
        .with_tiers(small_tiers())
        .with_backoff(BackoffConfig::none());
    let request = GenerationRequest::new(images(2), "Title").with_music(false);

    let result = generator.generate(&request, &SessionId::new()).await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Generation cancelled"));
    assert_eq!(encoder.calls.load(Ordering::SeqCst), 1);
}
