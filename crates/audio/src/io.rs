use std::fs::{self, File};
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use serde::{Deserialize, Serialize};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::error::AudioError;

/// Decoded audio with interleaved samples in [-1.0, 1.0].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioReader {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl AudioReader {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// Averages interleaved channels into one.
    pub fn downmix(&self) -> Vec<f32> {
        let channels = self.channels.max(1) as usize;
        if channels == 1 {
            return self.samples.clone();
        }
        self.samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }
}

pub struct AudioDecoder;

impl AudioDecoder {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<AudioReader, AudioError> {
        let path_ref = path.as_ref();
        let file = File::open(path_ref).map_err(|err| AudioError::io(path_ref, err))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());
        let mut hint = Hint::new();
        if let Some(ext) = path_ref.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let mut format = probed.format;
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(AudioError::NoAudioTrack)?;
        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
        let mut channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(1);
        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())?;

        let mut samples = Vec::new();
        let mut buffer: Option<SampleBuffer<f32>> = None;
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(err) => return Err(err.into()),
            };
            if packet.track_id() != track_id {
                continue;
            }
            match decoder.decode(&packet) {
                Ok(decoded) => {
                    if buffer.is_none() {
                        let spec = *decoded.spec();
                        sample_rate = spec.rate;
                        channels = spec.channels.count() as u16;
                        buffer = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                    }
                    if let Some(buf) = buffer.as_mut() {
                        buf.copy_interleaved_ref(decoded);
                        samples.extend_from_slice(buf.samples());
                    }
                }
                Err(SymphoniaError::DecodeError(err)) => {
                    warn!(error = err, "skipping undecodable packet");
                }
                Err(err) => return Err(err.into()),
            }
        }

        if sample_rate == 0 {
            return Err(AudioError::InvalidSampleRate);
        }
        let audio = AudioReader {
            sample_rate,
            channels,
            samples,
        };
        debug!(
            path = %path_ref.display(),
            sample_rate,
            channels,
            frames = audio.frames(),
            "decoded audio"
        );
        Ok(audio)
    }
}

/// Reads a WAV file keeping its on-disk sample layout for a later rewrite.
pub fn read_wav(path: &Path) -> Result<(AudioReader, WavSpec), AudioError> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    let samples = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let scale = int_scale(spec.bits_per_sample);
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<_>, _>>()?
        }
    };
    Ok((
        AudioReader {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        },
        spec,
    ))
}

pub fn write_wav(path: &Path, audio: &AudioReader, spec: WavSpec) -> Result<(), AudioError> {
    let mut writer = WavWriter::create(path, spec)?;
    match spec.sample_format {
        SampleFormat::Float => {
            for &sample in &audio.samples {
                writer.write_sample(sample)?;
            }
        }
        SampleFormat::Int => {
            let max = int_scale(spec.bits_per_sample) - 1.0;
            for &sample in &audio.samples {
                let value = (sample.clamp(-1.0, 1.0) * max).round() as i32;
                writer.write_sample(value)?;
            }
        }
    }
    writer.finalize()?;
    Ok(())
}

/// Rewrites `path` through a sibling temporary file so readers never see a partial file.
pub fn replace_wav(path: &Path, audio: &AudioReader, spec: WavSpec) -> Result<(), AudioError> {
    let tmp = path.with_extension("wav.tmp");
    if let Err(err) = write_wav(&tmp, audio, spec) {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }
    fs::rename(&tmp, path).map_err(|err| AudioError::io(path, err))
}

/// 16-bit PCM spec used when writing freshly synthesized audio.
pub fn pcm16_spec(sample_rate: u32, channels: u16) -> WavSpec {
    WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

fn int_scale(bits: u16) -> f32 {
    (1u64 << (bits.clamp(1, 32) - 1)) as f32
}
