//! Voice processing module
//!
//! Handles microphone capture, speaker playback and transcription.
//! Hardware access stays behind the [`Recorder`] and [`AudioSink`] traits.

mod capture;
mod listener;
mod playback;
mod stt;

pub use capture::{AudioCapture, MicrophoneRecorder, Recorder, samples_to_wav};
pub use listener::{
    CaptureOutcome, MicrophoneCapture, VoiceCapture, persist_recording, recording_timestamp,
};
pub use playback::{AudioPlayback, AudioSink, SpeakerSink, describe_output_devices};
pub use stt::{Transcriber, Transcript, WhisperTranscriber};
