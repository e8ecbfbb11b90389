//! Remote generation calls: topic research, scripts, post metadata, speech,
//! images, and video.
//!
//! [`GenerationGateway`] is the seam the kit assembler and batch coordinator
//! depend on. [`GeminiGateway`] talks to the Generative Language API.

pub mod error;
pub mod gateway;
pub mod gemini;
pub mod prompts;
pub mod speech;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod types;
pub mod wav;

pub use {
    error::{Error, Result},
    gateway::GenerationGateway,
    gemini::GeminiGateway,
    speech::{LineSynthesizer, SpeechEvent, SpeechStream, collect_speech, stream_speech},
    types::{
        AspectRatio, LongFormPost, MetadataRequest, PostMetadata, SocialPost, Topic,
        VisualPromptSource, VoiceAssignment,
    },
    wav::{SPEECH_SAMPLE_RATE, encode_wav, speech_spec},
};
