pub type MarionetteResult<T> = Result<T, MarionetteError>;

#[derive(thiserror::Error, Debug)]
pub enum MarionetteError {
    #[error("version {found} files are not supported")]
    UnsupportedVersion { found: String },

    #[error("unknown track \"{name}\", valid tracks: {}", .known.join(", "))]
    UnknownTrack { name: String, known: Vec<String> },

    #[error("unknown control \"{name}\", valid controls: {}", .known.join(", "))]
    UnknownControl { name: String, known: Vec<String> },

    #[error("value {value} for control \"{control}\" is out of range 0..={max}")]
    ControlOutOfRange {
        control: String,
        value: f32,
        max: f32,
    },

    #[error("could not initialise graphics device: {0}")]
    DeviceInit(String),

    #[error("triangulation error: {0}")]
    Triangulation(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MarionetteError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn triangulation(msg: impl Into<String>) -> Self {
        Self::Triangulation(msg.into())
    }

    pub fn device_init(msg: impl Into<String>) -> Self {
        Self::DeviceInit(msg.into())
    }
}
