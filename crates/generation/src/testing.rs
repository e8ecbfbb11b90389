//! Deterministic in-process gateway for downstream tests.

use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use {
    async_trait::async_trait,
    bytes::Bytes,
    vigil_common::{JobType, Language},
};

use crate::{
    error::{Error, Result},
    gateway::GenerationGateway,
    speech::{LineSynthesizer, SpeechStream, stream_speech},
    types::{
        AspectRatio, LongFormPost, MetadataRequest, PostMetadata, SocialPost, Topic,
        VisualPromptSource, VoiceAssignment,
    },
};

/// A stub operation, for failure injection and call counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StubOp {
    Research,
    LongScript,
    ShortScript,
    Metadata,
    Speech,
    Image,
    VisualPrompt,
    Video,
}

#[derive(Debug, Default)]
struct StubCalls {
    research: AtomicUsize,
    long_script: AtomicUsize,
    short_script: AtomicUsize,
    metadata: AtomicUsize,
    speech_lines: AtomicUsize,
    image: AtomicUsize,
    visual_prompt: AtomicUsize,
    video: AtomicUsize,
}

#[derive(Debug, Default)]
pub struct StubGateway {
    calls: StubCalls,
    /// Failure → language it applies to (`None` = every language).
    failures: Mutex<HashMap<StubOp, Option<Language>>>,
    silent_speech: AtomicBool,
}

impl StubGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `op` fail for every language.
    pub fn fail(&self, op: StubOp) {
        self.lock().insert(op, None);
    }

    /// Make `op` fail only for `language`.
    pub fn fail_for(&self, op: StubOp, language: Language) {
        self.lock().insert(op, Some(language));
    }

    /// Number of calls made to `op`. Speech counts individual lines.
    #[must_use]
    pub fn count(&self, op: StubOp) -> usize {
        let counter = match op {
            StubOp::Research => &self.calls.research,
            StubOp::LongScript => &self.calls.long_script,
            StubOp::ShortScript => &self.calls.short_script,
            StubOp::Metadata => &self.calls.metadata,
            StubOp::Speech => &self.calls.speech_lines,
            StubOp::Image => &self.calls.image,
            StubOp::VisualPrompt => &self.calls.visual_prompt,
            StubOp::Video => &self.calls.video,
        };
        counter.load(Ordering::SeqCst)
    }

    /// Return no audio for every line.
    pub fn silence_speech(&self) {
        self.silent_speech.store(true, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<StubOp, Option<Language>>> {
        self.failures.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn should_fail(&self, op: StubOp, language: Option<Language>) -> bool {
        match self.lock().get(&op) {
            Some(None) => true,
            Some(Some(target)) => language == Some(*target),
            None => false,
        }
    }
}

fn bump(counter: &AtomicUsize) -> usize {
    counter.fetch_add(1, Ordering::SeqCst) + 1
}

#[async_trait]
impl LineSynthesizer for StubGateway {
    async fn synthesize_line(&self, text: &str, _voice: Option<&str>) -> Result<Option<Bytes>> {
        bump(&self.calls.speech_lines);
        if self.should_fail(StubOp::Speech, None) {
            return Err(Error::speech("stub speech failure"));
        }
        if self.silent_speech.load(Ordering::SeqCst) {
            return Ok(None);
        }
        // Two bytes per character keeps every chunk a whole number of samples.
        Ok(Some(Bytes::from(vec![0u8; text.chars().count() * 2])))
    }
}

#[async_trait]
impl GenerationGateway for StubGateway {
    async fn research_topic(&self, language: Language, job_type: JobType) -> Result<Topic> {
        bump(&self.calls.research);
        if self.should_fail(StubOp::Research, Some(language)) {
            return Err(Error::research("stub research failure"));
        }
        let subthemes = match job_type {
            JobType::Long => vec!["trust".into(), "rest".into(), "renewal".into()],
            JobType::Short => Vec::new(),
        };
        Ok(Topic {
            theme: format!("hope-{language}"),
            subthemes,
        })
    }

    async fn generate_long_script(
        &self,
        theme: &str,
        language: Language,
        _duration_minutes: u32,
    ) -> Result<String> {
        bump(&self.calls.long_script);
        if self.should_fail(StubOp::LongScript, Some(language)) {
            return Err(Error::generation("stub long script failure"));
        }
        Ok(format!(
            "Roberta Erickson: Welcome to a prayer about {theme}.\nMilton Dilts: Breathe in slowly.\n\nRoberta Erickson: Amen."
        ))
    }

    async fn generate_short_script(&self, theme: &str, language: Language) -> Result<String> {
        bump(&self.calls.short_script);
        if self.should_fail(StubOp::ShortScript, Some(language)) {
            return Err(Error::generation("stub short script failure"));
        }
        Ok(format!("Lord, grant me {theme}.\nAmen."))
    }

    async fn generate_metadata(&self, request: MetadataRequest<'_>) -> Result<PostMetadata> {
        bump(&self.calls.metadata);
        if self.should_fail(StubOp::Metadata, Some(request.language)) {
            return Err(Error::generation("stub metadata failure"));
        }
        let title = format!("{} ({})", request.theme, request.language.label());
        Ok(match request.job_type {
            JobType::Short => PostMetadata::Social(SocialPost {
                title,
                description: "A short prayer.".into(),
                hashtags: vec!["faith".into()],
            }),
            JobType::Long => PostMetadata::LongForm(LongFormPost {
                title,
                description: "A guided prayer.".into(),
                hashtags: vec!["faith".into(), "prayer".into(), "hope".into()],
                timestamps: std::iter::once("Intro")
                    .chain(request.subthemes.iter().map(String::as_str))
                    .chain(std::iter::once("Outro"))
                    .collect::<Vec<_>>()
                    .join("\n"),
                tags: vec!["prayer".into()],
            }),
        })
    }

    fn synthesize_speech(&self, text: String, voices: Option<VoiceAssignment>) -> SpeechStream<'_> {
        stream_speech(self, text, voices)
    }

    async fn synthesize_image(&self, _prompt: &str, aspect_ratio: AspectRatio) -> Result<Bytes> {
        let n = bump(&self.calls.image);
        if self.should_fail(StubOp::Image, None) {
            return Err(Error::image("stub image failure"));
        }
        // Unique per call so tests can tell reused bytes from regenerated ones.
        Ok(Bytes::from(format!("png-{n}-{}", aspect_ratio.as_str())))
    }

    async fn build_visual_prompt(&self, source: VisualPromptSource<'_>) -> Result<String> {
        bump(&self.calls.visual_prompt);
        if self.should_fail(StubOp::VisualPrompt, None) {
            return Err(Error::generation("stub visual prompt failure"));
        }
        Ok(match source {
            VisualPromptSource::Prayer { .. } => "a candle in the dark".into(),
            VisualPromptSource::Post { title, .. } => format!("a sunrise titled {title}"),
        })
    }

    async fn generate_video(&self, _prompt: &str, _aspect_ratio: AspectRatio) -> Result<String> {
        let n = bump(&self.calls.video);
        if self.should_fail(StubOp::Video, None) {
            return Err(Error::video("stub video failure"));
        }
        Ok(format!("https://stub.invalid/video-{n}.mp4"))
    }
}
