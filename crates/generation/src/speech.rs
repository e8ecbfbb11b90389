//! Line-by-line speech synthesis as a pull-based event stream.

use std::pin::Pin;

use {
    async_trait::async_trait,
    bytes::{Bytes, BytesMut},
    futures::StreamExt,
    tokio_stream::Stream,
    tracing::{trace, warn},
};

use crate::{
    error::{Error, Result},
    types::VoiceAssignment,
};

/// Events produced while synthesizing a script.
///
/// A stream yields `Chunk`s and `Progress` in order and ends with exactly one
/// `Completed` or `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    /// Raw little-endian PCM16 for one line.
    Chunk(Bytes),
    /// Percentage of counted lines processed.
    Progress(u8),
    Completed,
    Failed(String),
}

pub type SpeechStream<'a> = Pin<Box<dyn Stream<Item = SpeechEvent> + Send + 'a>>;

/// Single-line text-to-speech call.
#[async_trait]
pub trait LineSynthesizer: Send + Sync {
    /// Synthesize one line. `Ok(None)` means the remote returned no audio.
    async fn synthesize_line(&self, text: &str, voice: Option<&str>) -> Result<Option<Bytes>>;
}

/// Split a line into the text to speak and the voice to speak it with.
fn resolve_line<'l>(line: &'l str, voices: Option<&'l VoiceAssignment>) -> (&'l str, Option<&'l str>) {
    let Some(voices) = voices.filter(|v| !v.speakers.is_empty()) else {
        return (line.trim(), None);
    };
    if let Some((label, rest)) = line.split_once(':')
        && let Some(voice) = voices.voice_for(label.trim())
    {
        return (rest.trim(), Some(voice));
    }
    (line.trim(), voices.fallback_voice())
}

fn percent(done: usize, total: usize) -> u8 {
    ((done as f64 / total as f64) * 100.0).round() as u8
}

/// Lazily synthesize `text` line by line through `synth`.
///
/// Blank lines are dropped before counting, so `N` counted lines yield exactly
/// `N` progress events ending at 100.
pub fn stream_speech<'a, S>(synth: &'a S, text: String, voices: Option<VoiceAssignment>) -> SpeechStream<'a>
where
    S: LineSynthesizer + ?Sized,
{
    Box::pin(async_stream::stream! {
        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        let total = lines.len();

        for (index, line) in lines.iter().enumerate() {
            let (speech, voice) = resolve_line(line, voices.as_ref());
            if !speech.is_empty() {
                match synth.synthesize_line(speech, voice).await {
                    Ok(Some(pcm)) if !pcm.is_empty() => yield SpeechEvent::Chunk(pcm),
                    Ok(_) => warn!(line = %speech, "no audio data received for line"),
                    Err(e) => {
                        yield SpeechEvent::Failed(e.to_string());
                        return;
                    },
                }
            }
            yield SpeechEvent::Progress(percent(index + 1, total));
        }

        yield SpeechEvent::Completed;
    })
}

/// Drain a speech stream into one contiguous PCM buffer.
pub async fn collect_speech(mut stream: SpeechStream<'_>) -> Result<Bytes> {
    let mut pcm = BytesMut::new();
    while let Some(event) = stream.next().await {
        match event {
            SpeechEvent::Chunk(chunk) => pcm.extend_from_slice(&chunk),
            SpeechEvent::Progress(p) => trace!(progress = p, "speech progress"),
            SpeechEvent::Completed => break,
            SpeechEvent::Failed(message) => return Err(Error::speech(message)),
        }
    }
    if pcm.is_empty() {
        return Err(Error::speech("no audio was produced"));
    }
    Ok(pcm.freeze())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        std::sync::Mutex,
        vigil_config::SpeakerVoice,
    };

    /// Records each call and answers with the line's bytes.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, Option<String>)>>,
        silent: bool,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl LineSynthesizer for Recorder {
        async fn synthesize_line(&self, text: &str, voice: Option<&str>) -> Result<Option<Bytes>> {
            self.calls
                .lock()
                .unwrap()
                .push((text.to_string(), voice.map(str::to_string)));
            if self.fail_on == Some(text) {
                return Err(Error::speech("quota exceeded"));
            }
            if self.silent {
                return Ok(None);
            }
            Ok(Some(Bytes::copy_from_slice(text.as_bytes())))
        }
    }

    fn cast() -> VoiceAssignment {
        VoiceAssignment::new(vec![
            SpeakerVoice {
                name: "Roberta Erickson".into(),
                voice: "Aoede".into(),
            },
            SpeakerVoice {
                name: "Milton Dilts".into(),
                voice: "Enceladus".into(),
            },
        ])
    }

    async fn events(stream: SpeechStream<'_>) -> Vec<SpeechEvent> {
        stream.collect().await
    }

    #[tokio::test]
    async fn progress_counts_non_blank_lines() {
        let synth = Recorder::default();
        let text = "one\n\n  \ntwo\nthree\n".to_string();
        let events = events(stream_speech(&synth, text, None)).await;

        let progress: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                SpeechEvent::Progress(p) => Some(*p),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![33, 67, 100]);
        assert_eq!(events.last(), Some(&SpeechEvent::Completed));
    }

    #[tokio::test]
    async fn empty_input_completes_immediately() {
        let synth = Recorder::default();
        let events = events(stream_speech(&synth, "\n  \n".into(), None)).await;
        assert_eq!(events, vec![SpeechEvent::Completed]);
        assert!(synth.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn speaker_prefix_selects_voice() {
        let synth = Recorder::default();
        let text = "Milton Dilts: Breathe in.\nRoberta Erickson: Time: now.\nAmen.".to_string();
        let _ = events(stream_speech(&synth, text, Some(cast()))).await;

        let calls = synth.calls.lock().unwrap().clone();
        assert_eq!(calls, vec![
            ("Breathe in.".into(), Some("Enceladus".into())),
            ("Time: now.".into(), Some("Aoede".into())),
            ("Amen.".into(), Some("Aoede".into())),
        ]);
    }

    #[tokio::test]
    async fn empty_speech_text_advances_without_call() {
        let synth = Recorder::default();
        let text = "Milton Dilts:\nRoberta Erickson: Peace.".to_string();
        let events = events(stream_speech(&synth, text, Some(cast()))).await;

        assert_eq!(synth.calls.lock().unwrap().len(), 1);
        assert_eq!(events, vec![
            SpeechEvent::Progress(50),
            SpeechEvent::Chunk(Bytes::from_static(b"Peace.")),
            SpeechEvent::Progress(100),
            SpeechEvent::Completed,
        ]);
    }

    #[tokio::test]
    async fn remote_error_fails_and_ends_stream() {
        let synth = Recorder {
            fail_on: Some("two"),
            ..Default::default()
        };
        let events = events(stream_speech(&synth, "one\ntwo\nthree".into(), None)).await;
        assert_eq!(events, vec![
            SpeechEvent::Chunk(Bytes::from_static(b"one")),
            SpeechEvent::Progress(33),
            SpeechEvent::Failed("speech synthesis failed: quota exceeded".into()),
        ]);
    }

    #[tokio::test]
    async fn collect_concatenates_in_order() {
        let synth = Recorder::default();
        let pcm = collect_speech(stream_speech(&synth, "ab\ncd".into(), None))
            .await
            .unwrap();
        assert_eq!(&pcm[..], b"abcd");
    }

    #[tokio::test]
    async fn collect_rejects_silence() {
        let synth = Recorder {
            silent: true,
            ..Default::default()
        };
        let err = collect_speech(stream_speech(&synth, "one\ntwo".into(), None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Speech { .. }));
        assert_eq!(synth.calls.lock().unwrap().len(), 2);
    }
}
