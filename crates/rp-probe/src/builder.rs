//! Accumulator for the fields a container walk discovers.
//!
//! Each level of a walk returns its own [`MetadataBuilder`] and the parent
//! merges it in. A field that is already set is never overwritten, so "first
//! track wins" holds no matter how deep the track was found.

use std::path::Path;

use rp_core::{MediaMetadata, ParseError};

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Fields contributed by a single video track or stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoTrack {
    pub codec: String,
    pub width: u32,
    pub height: u32,
    pub framerate_hz: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataBuilder {
    video: Option<VideoTrack>,
    audio_codec: Option<String>,
    duration_seconds: Option<f64>,
}

impl MetadataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a video track. Accepted only if it names a codec and no video
    /// track was accepted before.
    pub fn offer_video(&mut self, track: VideoTrack) -> bool {
        if self.video.is_some() || track.codec.is_empty() {
            return false;
        }
        self.video = Some(track);
        true
    }

    /// Offer an audio codec name. Accepted only if non-empty and no audio
    /// codec was accepted before.
    pub fn offer_audio(&mut self, codec: impl Into<String>) -> bool {
        let codec = codec.into();
        if self.audio_codec.is_some() || codec.is_empty() {
            return false;
        }
        self.audio_codec = Some(codec);
        true
    }

    /// Offer a duration in seconds. Accepted only if positive and finite and
    /// no duration was accepted before.
    pub fn offer_duration(&mut self, seconds: f64) -> bool {
        if self.duration_seconds.is_some() || !(seconds.is_finite() && seconds > 0.0) {
            return false;
        }
        self.duration_seconds = Some(seconds);
        true
    }

    /// Merge a builder produced later in the walk. Fields already set here
    /// take precedence.
    pub fn merge(&mut self, later: MetadataBuilder) {
        if let Some(video) = later.video {
            self.offer_video(video);
        }
        if let Some(audio) = later.audio_codec {
            self.offer_audio(audio);
        }
        if let Some(duration) = later.duration_seconds {
            self.offer_duration(duration);
        }
    }

    /// Produce the final record.
    ///
    /// Without an accepted video track the walk failed; `missing` supplies
    /// the error to report.
    pub fn finish(
        self,
        path: &Path,
        file_size: u64,
        missing: impl FnOnce() -> ParseError,
    ) -> Result<MediaMetadata, ParseError> {
        let Some(video) = self.video else {
            return Err(missing());
        };

        let mut meta = MediaMetadata::new(path, file_size);
        meta.video_codec = video.codec;
        meta.width = video.width;
        meta.height = video.height;
        meta.framerate_hz = video.framerate_hz;
        meta.audio_codec = self.audio_codec.unwrap_or_default();
        meta.duration_seconds = self.duration_seconds.unwrap_or(0.0);
        Ok(meta)
    }
}
