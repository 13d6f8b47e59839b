use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use log::{info, warn};
use std::sync::mpsc::{self, Receiver, Sender};

/// Active capture-capable devices, as (label, id) pairs. The id is only
/// meaningful for the current enumeration.
pub fn list_input_devices() -> Result<Vec<(String, usize)>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .context("failed to enumerate capture devices")?;

    Ok(devices
        .filter_map(|d| d.name().ok())
        .enumerate()
        .map(|(id, label)| (label, id))
        .collect())
}

/// Microphone capture for the lip sync pipeline.
///
/// The device callback downmixes to mono and forwards raw f32 chunks over a
/// channel; the node drains them on its own tick. Gain is not applied here,
/// it is a node parameter that can change while the stream is live.
///
/// Switching devices is drop-then-open: the old stream is fully released
/// before a new one is created.
pub struct AudioCapture {
    stream: Option<Stream>,
    receiver: Receiver<Vec<f32>>,
}

impl AudioCapture {
    /// Open a capture stream on the named device, or the default input
    /// device when `name` is `None`. Delivery begins after
    /// [AudioCapture::start].
    pub fn open(name: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();

        let device = match name {
            Some(name) => host
                .input_devices()
                .context("failed to enumerate capture devices")?
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .with_context(|| format!("capture device not found: {name}"))?,
            None => host
                .default_input_device()
                .context("no input device available")?,
        };

        let config = device
            .default_input_config()
            .context("failed to query input config")?;
        let channels = config.channels() as usize;
        let sample_format = config.sample_format();
        let stream_config: StreamConfig = config.config();

        info!(
            "capture device: {} ({} ch @ {} Hz, {:?})",
            device.name().unwrap_or_else(|_| "<unnamed>".into()),
            channels,
            stream_config.sample_rate.0,
            sample_format,
        );

        let (sender, receiver) = mpsc::channel();

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream_f32(&device, &stream_config, channels, sender)?,
            SampleFormat::I16 => Self::build_stream_i16(&device, &stream_config, channels, sender)?,
            other => anyhow::bail!("unsupported sample format: {other:?}"),
        };

        Ok(Self {
            stream: Some(stream),
            receiver,
        })
    }

    fn build_stream_f32(
        device: &cpal::Device,
        config: &StreamConfig,
        channels: usize,
        sender: Sender<Vec<f32>>,
    ) -> Result<Stream> {
        let err_fn = |err| warn!("audio stream error: {err}");

        let stream = device.build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let mono = downmix(data, channels);
                let _ = sender.send(mono);
            },
            err_fn,
            None,
        )?;

        Ok(stream)
    }

    fn build_stream_i16(
        device: &cpal::Device,
        config: &StreamConfig,
        channels: usize,
        sender: Sender<Vec<f32>>,
    ) -> Result<Stream> {
        let err_fn = |err| warn!("audio stream error: {err}");

        let stream = device.build_input_stream(
            config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let samples: Vec<f32> = data.iter().map(|&s| s as f32 / 32768.0).collect();
                let mono = downmix(&samples, channels);
                let _ = sender.send(mono);
            },
            err_fn,
            None,
        )?;

        Ok(stream)
    }

    /// Start delivering chunks. Safe to call repeatedly.
    pub fn start(&self) -> Result<()> {
        if let Some(stream) = &self.stream {
            stream.play().context("failed to start audio stream")?;
        }
        Ok(())
    }

    /// Release the stream. Idempotent; a stopped capture stays stopped until
    /// a new one is opened.
    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            info!("capture stopped");
        }
    }

    /// Grab the next pending chunk without blocking.
    pub fn try_read(&self) -> Option<Vec<f32>> {
        self.receiver.try_recv().ok()
    }
}

/// Sum interleaved channels into one, the reference downmix.
fn downmix(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }

    data.chunks_exact(channels)
        .map(|frame| frame.iter().sum())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_sums_channels() {
        let stereo = [0.1, 0.2, 0.3, 0.4];
        let mono = downmix(&stereo, 2);
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.3).abs() < 1e-6);
        assert!((mono[1] - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_downmix_passes_mono_through() {
        let data = [0.1, 0.2, 0.3];
        assert_eq!(downmix(&data, 1), data.to_vec());
    }

    #[test]
    fn test_device_enumeration_does_not_panic() {
        // may be empty on systems without audio hardware
        let result = list_input_devices();
        println!("capture devices: {:?}", result.is_ok());
    }
}
