//! Uploaded audio handling and the speech recognition seam.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    config::PlannerConfig,
    error::{PlannerError, Result},
};

pub const DEFAULT_LANGUAGE: &str = "zh-CN";
pub const DEFAULT_EXTENSION: &str = ".wav";

/// Converts recorded speech into text.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync + std::fmt::Debug {
    async fn recognize(&self, audio_path: &Path, language: &str) -> Result<String>;
}

/// Outcome of one transcription attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub success: bool,
    pub transcription: Option<String>,
    pub error: Option<String>,
}

impl TranscriptionResult {
    pub fn recognized(text: String) -> Self {
        Self {
            success: true,
            transcription: Some(text),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            transcription: None,
            error: Some(error.into()),
        }
    }
}

/// An uploaded audio file in the scratch directory, removed when dropped.
#[derive(Debug)]
pub struct TempAudioFile {
    path: PathBuf,
}

impl TempAudioFile {
    /// Write `bytes` to `<dir>/<uuid><ext>`, keeping the upload's extension.
    pub async fn create(dir: &Path, upload_name: &str, bytes: &[u8]) -> Result<Self> {
        tokio::fs::create_dir_all(dir).await?;

        let path = dir.join(format!("{}{}", Uuid::new_v4(), extension_of(upload_name)));
        // Constructed before writing so a partial write is still cleaned up.
        let file = Self { path };
        tokio::fs::write(&file.path, bytes).await?;

        debug!(target: "trip_planner::voice", path = %file.path.display(), "saved uploaded audio");
        Ok(file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempAudioFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(target: "trip_planner::voice", path = %self.path.display(), "removed temp audio")
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(
                target: "trip_planner::voice",
                path = %self.path.display(),
                error = %err,
                "failed to clean up temp audio"
            ),
        }
    }
}

fn extension_of(upload_name: &str) -> String {
    Path::new(upload_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// Save an upload, run recognition on it and delete it again.
///
/// Missing uploads are client errors. Recognition failures are reported in
/// the returned [`TranscriptionResult`] instead.
pub async fn transcribe_upload(
    recognizer: &dyn SpeechRecognizer,
    scratch_dir: &Path,
    upload_name: &str,
    bytes: &[u8],
    language: Option<&str>,
) -> Result<TranscriptionResult> {
    if upload_name.trim().is_empty() {
        return Err(PlannerError::InvalidRequest("No file selected".to_string()));
    }
    if bytes.is_empty() {
        return Err(PlannerError::InvalidRequest(
            "No audio file provided".to_string(),
        ));
    }

    let language = language
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .unwrap_or(DEFAULT_LANGUAGE);
    let audio = TempAudioFile::create(scratch_dir, upload_name, bytes).await?;

    let result = match recognizer.recognize(audio.path(), language).await {
        Ok(text) => {
            info!(
                target: "trip_planner::voice",
                chars = text.chars().count(),
                language,
                "speech recognized"
            );
            TranscriptionResult::recognized(text)
        }
        Err(err) => {
            warn!(target: "trip_planner::voice", error = %err, "speech recognition failed");
            TranscriptionResult::failed(err.to_string())
        }
    };

    drop(audio);
    Ok(result)
}

/// [`transcribe_upload`] using the scratch directory from `VOICE_TEMP_DIR`.
pub async fn transcribe_with_config(
    recognizer: &dyn SpeechRecognizer,
    config: &PlannerConfig,
    upload_name: &str,
    bytes: &[u8],
    language: Option<&str>,
) -> Result<TranscriptionResult> {
    transcribe_upload(recognizer, &config.voice_temp_dir, upload_name, bytes, language).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct RecordingRecognizer {
        seen: Mutex<Vec<(PathBuf, bool, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl SpeechRecognizer for RecordingRecognizer {
        async fn recognize(&self, audio_path: &Path, language: &str) -> Result<String> {
            self.seen.lock().unwrap().push((
                audio_path.to_path_buf(),
                audio_path.exists(),
                language.to_string(),
            ));
            if self.fail {
                Err(PlannerError::Provider("Could not recognize speech content".to_string()))
            } else {
                Ok("打车去西湖30".to_string())
            }
        }
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("memo.mp3"), ".mp3");
        assert_eq!(extension_of("recording"), DEFAULT_EXTENSION);
        assert_eq!(extension_of("dir/clip.webm"), ".webm");
    }

    #[tokio::test]
    async fn test_temp_file_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let file = TempAudioFile::create(dir.path(), "a.ogg", b"RIFF").await.unwrap();
        let path = file.path().to_path_buf();

        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), "ogg");
        drop(file);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_transcribe_cleans_up_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let recognizer = RecordingRecognizer::default();

        let result = transcribe_upload(&recognizer, dir.path(), "clip.wav", b"data", None)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.transcription.as_deref(), Some("打车去西湖30"));

        let seen = recognizer.seen.lock().unwrap();
        let (path, existed, language) = &seen[0];
        assert!(*existed);
        assert_eq!(language, DEFAULT_LANGUAGE);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_transcribe_cleans_up_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let recognizer = RecordingRecognizer {
            fail: true,
            ..Default::default()
        };

        let result = transcribe_upload(&recognizer, dir.path(), "clip", b"data", Some("en-US"))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Could not recognize"));

        let seen = recognizer.seen.lock().unwrap();
        assert_eq!(seen[0].2, "en-US");
        assert!(!seen[0].0.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_empty_upload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let recognizer = RecordingRecognizer::default();

        let err = transcribe_upload(&recognizer, dir.path(), "clip.wav", b"", None)
            .await
            .unwrap_err();
        assert!(err.is_client_error());

        let err = transcribe_upload(&recognizer, dir.path(), " ", b"data", None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(recognizer.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transcribe_uses_configured_scratch_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = PlannerConfig {
            voice_temp_dir: dir.path().join("voice"),
            ..Default::default()
        };
        let recognizer = RecordingRecognizer::default();

        let result = transcribe_with_config(&recognizer, &config, "memo.m4a", b"data", None)
            .await
            .unwrap();
        assert!(result.success);

        let seen = recognizer.seen.lock().unwrap();
        let (path, existed, _) = &seen[0];
        assert!(*existed);
        assert!(path.starts_with(&config.voice_temp_dir));
        assert_eq!(path.extension().unwrap(), "m4a");
        assert_eq!(std::fs::read_dir(&config.voice_temp_dir).unwrap().count(), 0);
    }
}
