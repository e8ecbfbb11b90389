use std::io::Cursor;

use bytes::Bytes;

use crate::error::{Error, Result};

/// Sample rate of the speech model's PCM output.
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;

/// Mono 16-bit PCM at the speech model's rate.
#[must_use]
pub fn speech_spec() -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate: SPEECH_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

/// Wrap little-endian PCM16 bytes in a RIFF/WAVE container.
///
/// A trailing odd byte is not a whole sample and is dropped.
pub fn encode_wav(pcm: &[u8], spec: hound::WavSpec) -> Result<Bytes> {
    let mut cursor = Cursor::new(Vec::with_capacity(pcm.len() + 44));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| Error::speech(format!("WAV writer: {e}")))?;
        for sample in pcm.chunks_exact(2) {
            writer
                .write_sample(i16::from_le_bytes([sample[0], sample[1]]))
                .map_err(|e| Error::speech(format!("WAV write: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| Error::speech(format!("WAV finalize: {e}")))?;
    }
    Ok(Bytes::from(cursor.into_inner()))
}
