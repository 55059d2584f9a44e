// Re-export from sub-crates
pub use chirp_audio::{CaptureHandle, Recorder, RecorderError, Recording, RecordingHandle};
pub use chirp_classify::{Classifier, ClassifyError, HttpClassifier};
pub use chirp_core::{
    API_URL_ENV, APP_NAME, APP_NAME_PRETTY, AudioClip, Config, ConfigManager, DEFAULT_API_URL,
    DEFAULT_LOG_LEVEL, SubmissionState,
};

// App-specific modules
pub mod config_ext;
pub mod event;
pub mod icon;
pub mod notify;
pub mod panel;
pub mod preview;
pub mod process;

// Version from this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
