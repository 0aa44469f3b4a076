pub mod buhlmann;
pub mod config;
pub mod coordinator;
pub mod dive_time;
pub mod divelog;
pub mod error;
pub mod input;
pub mod models;
pub mod navigation;
pub mod render;
pub mod screen;
pub mod sensors;
pub mod task;

uniffi::setup_scaffolding!();

pub use buhlmann::{
    compute_deco, max_operating_depth, DecoParameters, DecoResult, DecoTime, DecompressionModel,
    GradientFactors,
};
pub use config::DeviceConfig;
pub use coordinator::SessionCoordinator;
pub use dive_time::{format_dive_time, parse_dive_time};
pub use divelog::{DiveEndRecord, DiveLog, DiveLogRecord, LogEntry};
pub use error::{ConfigError, DecoError, DiveLogError, LifecycleError, SensorError};
pub use input::{Debouncer, InputBus, InputDispatchLoop};
pub use models::{
    CompassCalibration, DepthReading, DiveSession, GasMix, Heading, ProfilePoint, RawVector,
    SensorSample,
};
pub use navigation::{ScreenStateMachine, Transition};
pub use render::{RenderLoop, Renderer};
pub use screen::{Button, DrawField, FontClass, Outcome, Screen, ScreenKind};
pub use sensors::{SensorAcquisition, SensorBus, SnapshotCell};
pub use task::{Worker, WorkerState};
