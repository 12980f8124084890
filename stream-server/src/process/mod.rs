pub mod control;
pub mod handle;
pub mod transcoder;

pub use control::{platform_control, ControlSignal, ProcessControl, SignalOutcome};
pub use handle::ProcessHandle;
pub use transcoder::{FfmpegTranscoder, SpawnedProcess, Transcoder};
