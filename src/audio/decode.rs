use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::SourceError;

/// A fully decoded, mono-downmixed audio buffer.
#[derive(Clone, Debug)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode an in-memory audio asset. The container is probed from the bytes;
/// `extension` is only a hint and may be absent or wrong.
pub fn decode_audio(bytes: Vec<u8>, extension: Option<&str>) -> Result<DecodedAudio, SourceError> {
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }
    let stream = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
    let mut format = symphonia::default::get_probe()
        .format(&hint, stream, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| SourceError::Decode(format!("unrecognised audio format: {}", e)))?
        .format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| SourceError::Decode("no audio tracks found".into()))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| SourceError::Decode("unknown sample rate".into()))?;
    let mut decoder = symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut mono = Vec::new();
    let mut scratch: Option<SampleBuffer<f32>> = None;
    while let Some(packet) = next_packet(format.as_mut())? {
        if packet.track_id() != track_id {
            continue;
        }
        let block = match decoder.decode(&packet) {
            Ok(block) => block,
            // A corrupt packet is skipped, not fatal.
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(e.into()),
        };

        let spec = *block.spec();
        let frames = block.capacity() as u64;
        let buf = match &mut scratch {
            Some(buf) if buf.capacity() as u64 >= frames * spec.channels.count() as u64 => buf,
            slot => slot.insert(SampleBuffer::new(frames, spec)),
        };
        buf.copy_interleaved_ref(block);
        downmix_into(buf.samples(), spec.channels.count(), &mut mono);
    }

    if mono.is_empty() {
        return Err(SourceError::Decode("asset contains no audio samples".into()));
    }
    let audio = DecodedAudio {
        samples: mono,
        sample_rate,
    };
    log::info!(
        "Decoded audio: {} samples, {}Hz, {:.1}s",
        audio.samples.len(),
        sample_rate,
        audio.duration()
    );
    Ok(audio)
}

/// Next packet of the container, or `None` at the end of the stream.
fn next_packet(format: &mut dyn FormatReader) -> Result<Option<Packet>, SourceError> {
    match format.next_packet() {
        Ok(packet) => Ok(Some(packet)),
        Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Average interleaved frames down to one channel, appending to `out`.
fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    let scale = 1.0 / channels as f32;
    out.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale),
    );
}
