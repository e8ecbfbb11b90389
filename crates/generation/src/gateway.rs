use {
    async_trait::async_trait,
    bytes::Bytes,
    vigil_common::{JobType, Language},
};

use crate::{
    error::Result,
    speech::SpeechStream,
    types::{AspectRatio, MetadataRequest, PostMetadata, Topic, VisualPromptSource, VoiceAssignment},
};

/// Remote generative calls used to assemble a kit.
///
/// Every operation is an independent fallible call with no caching.
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// Search-grounded topic research.
    async fn research_topic(&self, language: Language, job_type: JobType) -> Result<Topic>;

    /// Two-speaker dialogue script. A blank theme picks a built-in one.
    async fn generate_long_script(
        &self,
        theme: &str,
        language: Language,
        duration_minutes: u32,
    ) -> Result<String>;

    /// Short single-voice prayer.
    async fn generate_short_script(&self, theme: &str, language: Language) -> Result<String>;

    async fn generate_metadata(&self, request: MetadataRequest<'_>) -> Result<PostMetadata>;

    /// Lazy line-by-line synthesis of `text`.
    fn synthesize_speech(&self, text: String, voices: Option<VoiceAssignment>) -> SpeechStream<'_>;

    /// PNG bytes for `prompt`.
    async fn synthesize_image(&self, prompt: &str, aspect_ratio: AspectRatio) -> Result<Bytes>;

    async fn build_visual_prompt(&self, source: VisualPromptSource<'_>) -> Result<String>;

    /// Generate a video and return its download URI.
    async fn generate_video(&self, prompt: &str, aspect_ratio: AspectRatio) -> Result<String>;
}
