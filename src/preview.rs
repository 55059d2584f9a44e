//! Preview handling for the selected clip.
//!
//! The preview handle is the one resource with explicit release
//! discipline: exactly one may be live, and every replacement revokes the
//! handle it supersedes by deleting the backing file.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chirp_core::AudioClip;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// A revocable on-disk reference to the selected clip, openable by any
/// audio player. Dropping the handle deletes the file.
#[derive(Debug)]
pub struct PreviewHandle {
    file: NamedTempFile,
}

impl PreviewHandle {
    /// Materialize the clip at a temporary path, keeping the original
    /// extension so players can sniff the container.
    pub fn new(clip: &AudioClip) -> Result<Self> {
        let suffix = Path::new(clip.name())
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let mut file = tempfile::Builder::new()
            .prefix("chirp-preview-")
            .suffix(&suffix)
            .tempfile()
            .context("Failed to create preview file")?;
        file.write_all(clip.data())
            .context("Failed to write preview file")?;
        file.flush().context("Failed to flush preview file")?;
        debug!(path = %file.path().display(), bytes = clip.len(), "Preview materialized");
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Plays the current preview through the default output device.
///
/// The device is opened lazily on first play so headless sessions never
/// touch it; playback failures are logged, never fatal.
pub struct PreviewPlayer {
    output: Option<(OutputStream, OutputStreamHandle)>,
    sink: Option<Sink>,
}

impl PreviewPlayer {
    pub fn new() -> Self {
        Self {
            output: None,
            sink: None,
        }
    }

    /// Start playback of the preview file, replacing any running playback.
    pub fn play(&mut self, preview: &PreviewHandle) {
        self.stop();

        if self.output.is_none() {
            match OutputStream::try_default() {
                Ok(output) => self.output = Some(output),
                Err(e) => {
                    warn!("No audio output available for preview: {e}");
                    return;
                }
            }
        }
        let Some((_, handle)) = self.output.as_ref() else {
            return;
        };

        let source = match File::open(preview.path()) {
            Ok(file) => match Decoder::new(BufReader::new(file)) {
                Ok(source) => source,
                Err(e) => {
                    warn!("Preview is not decodable: {e}");
                    return;
                }
            },
            Err(e) => {
                warn!("Failed to open preview file: {e}");
                return;
            }
        };

        match Sink::try_new(handle) {
            Ok(sink) => {
                sink.append(source);
                info!(path = %preview.path().display(), "Preview playing");
                self.sink = Some(sink);
            }
            Err(e) => warn!("Failed to start preview playback: {e}"),
        }
    }

    /// Stop playback. A detached sink would keep playing, so the sink is
    /// stopped before it is dropped.
    pub fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_materializes_clip() {
        let clip = AudioClip::new("clip.mp3", "audio/mpeg", vec![7; 32]);
        let handle = PreviewHandle::new(&clip).unwrap();

        assert!(handle.path().exists());
        assert_eq!(std::fs::read(handle.path()).unwrap(), vec![7; 32]);
        assert_eq!(
            handle.path().extension().and_then(|e| e.to_str()),
            Some("mp3")
        );
    }

    #[test]
    fn test_handle_revokes_on_drop() {
        let clip = AudioClip::from_wav(vec![0; 16]);
        let handle = PreviewHandle::new(&clip).unwrap();
        let path = handle.path().to_path_buf();

        assert!(path.exists());
        drop(handle);
        assert!(!path.exists());
    }
}
