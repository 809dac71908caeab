mod settings;

pub use settings::{
    ChatConfig, Config, PlaybackConfig, TracerConfig, TransportFailureMode, EXAMPLE_CONFIG,
};
