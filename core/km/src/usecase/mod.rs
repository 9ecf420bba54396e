//! ユースケース（記録・追記・ローテート・デーモン起動）

pub mod launcher;
pub mod log_writer;
pub mod recorder;
pub mod rotator;

pub use launcher::DaemonLauncher;
pub use log_writer::LogWriter;
pub use recorder::{generate_person_id, Recorder, RecorderOptions};
pub use rotator::{LogRotator, RotateOutcome, RotatePolicy};
