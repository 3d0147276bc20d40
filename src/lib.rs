#![forbid(unsafe_code)]

//! Compiles declarative 2D puppet-animation documents into flat, GPU-friendly
//! buffers and drives them frame by frame at playback time.
//!
//! The pipeline has two halves: [`prepare`] flattens a [`PuppetDefinition`]
//! (shape tree, mutation generators, controls, keyframe tracks) into a
//! [`PreparedPuppet`] of indexed numeric buffers, and [`Playback`] owns the
//! runtime — track scheduling, conflict resolution, per-frame interpolation
//! and dispatch to a [`GraphicsDevice`].

pub mod bindings;
pub mod buffer;
pub mod compile;
pub mod core;
pub mod device;
pub mod error;
pub mod geometry;
pub mod hierarchy;
pub mod interp;
pub mod model;
pub mod player;
pub mod shaders;
pub mod time;
pub mod tracks;

pub use self::core::Vec2;
pub use bindings::{Binding, MixMode};
pub use buffer::{FloatBuffer, IntBuffer};
pub use compile::{ControlInfo, PreparedPuppet, ShapeRecord, prepare};
pub use device::{FrameInput, GraphicsDevice, NullDevice, ViewState};
pub use error::{MarionetteError, MarionetteResult};
pub use interp::{Blend, interpolate};
pub use model::{
    AnimationDefinition, ControlDefinition, Keyframe, Mutator, MutatorKind, PuppetDefinition,
    ShapeDefinition,
};
pub use player::{ListenerId, Playback, PlaybackOptions, StartOptions};
pub use shaders::{ShaderSet, shader_set};
pub use time::{Clock, ManualClock, SystemClock};
pub use tracks::CompiledAnimation;
