//! Audio payload types.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Extensions the drop surface accepts, with the MIME type forwarded to
/// the classification service.
const AUDIO_TYPES: &[(&str, &str)] = &[
    ("aac", "audio/aac"),
    ("aif", "audio/aiff"),
    ("aiff", "audio/aiff"),
    ("flac", "audio/flac"),
    ("m4a", "audio/mp4"),
    ("mp3", "audio/mpeg"),
    ("oga", "audio/ogg"),
    ("ogg", "audio/ogg"),
    ("opus", "audio/opus"),
    ("wav", "audio/wav"),
    ("webm", "audio/webm"),
];

/// The currently selected audio payload, from either acquisition source.
///
/// A clip is replaced wholesale by a new acquisition; it carries everything
/// the submission pipeline needs to build the multipart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    name: String,
    mime: String,
    data: Vec<u8>,
}

impl AudioClip {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            data,
        }
    }

    /// Wrap a finished microphone capture.
    pub fn from_wav(data: Vec<u8>) -> Self {
        Self::new("recording.wav", "audio/wav", data)
    }

    /// Read a candidate file from the drop surface.
    ///
    /// Returns `Ok(None)` for files that are not audio by extension; those
    /// must cause no state change in the caller. No size or duration
    /// validation happens here; malformed files surface as submission
    /// failures.
    pub fn from_path(path: &Path) -> Result<Option<Self>> {
        let Some(mime) = path
            .extension()
            .and_then(|ext| mime_for_extension(&ext.to_string_lossy()))
        else {
            return Ok(None);
        };
        let data =
            fs::read(path).with_context(|| format!("Failed to read audio file at {path:?}"))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        Ok(Some(Self::new(name, mime, data)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// MIME type for an audio file extension, if recognized.
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    AUDIO_TYPES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map(|(_, mime)| *mime)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_mime_lookup() {
        assert_eq!(mime_for_extension("wav"), Some("audio/wav"));
        assert_eq!(mime_for_extension("MP3"), Some("audio/mpeg"));
        assert_eq!(mime_for_extension("txt"), None);
        assert_eq!(mime_for_extension(""), None);
    }

    #[test]
    fn test_from_path_rejects_non_audio() {
        let clip = AudioClip::from_path(Path::new("notes.txt")).unwrap();
        assert!(clip.is_none());

        let clip = AudioClip::from_path(Path::new("no_extension")).unwrap();
        assert!(clip.is_none());
    }

    #[test]
    fn test_from_path_reads_audio_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp3");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(b"not really mpeg").unwrap();

        let clip = AudioClip::from_path(&path).unwrap().unwrap();
        assert_eq!(clip.name(), "clip.mp3");
        assert_eq!(clip.mime(), "audio/mpeg");
        assert_eq!(clip.data(), b"not really mpeg");
    }

    #[test]
    fn test_from_path_missing_file_is_an_error() {
        assert!(AudioClip::from_path(Path::new("/nonexistent/clip.wav")).is_err());
    }

    #[test]
    fn test_recording_clip_shape() {
        let clip = AudioClip::from_wav(vec![1, 2, 3]);
        assert_eq!(clip.name(), "recording.wav");
        assert_eq!(clip.mime(), "audio/wav");
        assert_eq!(clip.len(), 3);

        let empty = AudioClip::from_wav(Vec::new());
        assert!(empty.is_empty());
    }
}
