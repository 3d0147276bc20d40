//! Compiles animation definitions into per-control time tracks and event
//! lists the scheduler samples at playback time.

use std::collections::HashMap;

use tracing::warn;

use crate::model::{AnimationDefinition, ControlDefinition};

#[derive(Clone, Debug, PartialEq)]
pub struct CompiledAnimation {
    pub name: String,
    pub looping: bool,
    /// Time of the last keyframe in milliseconds; 0 for an empty track.
    pub duration: f32,
    pub tracks: Vec<ControlTrack>,
    pub events: Vec<TrackEvent>,
}

/// Piecewise `(time, value)` function for one control, flat layout.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlTrack {
    pub control: usize,
    pub track: Vec<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrackEvent {
    pub time: f32,
    pub name: String,
}

impl CompiledAnimation {
    pub fn governs(&self, control: usize) -> bool {
        self.tracks.iter().any(|t| t.control == control)
    }

    /// True when the two animations drive at least one common control.
    pub fn conflicts_with(&self, other: &Self) -> bool {
        self.tracks.iter().any(|t| other.governs(t.control))
    }
}

pub fn compile_animations(
    animations: &[AnimationDefinition],
    controls: &[ControlDefinition],
) -> Vec<CompiledAnimation> {
    let control_index: HashMap<&str, usize> = controls
        .iter()
        .enumerate()
        .map(|(i, c)| (c.name.as_str(), i))
        .collect();

    animations
        .iter()
        .map(|animation| compile_animation(animation, &control_index))
        .collect()
}

fn compile_animation(
    animation: &AnimationDefinition,
    control_index: &HashMap<&str, usize>,
) -> CompiledAnimation {
    // Union of referenced controls in first-seen order.
    let mut referenced: Vec<&str> = Vec::new();
    for keyframe in &animation.keyframes {
        for name in keyframe.control_values.keys() {
            if !referenced.iter().any(|n| *n == name) {
                referenced.push(name);
            }
        }
    }

    let mut tracks = Vec::new();
    for name in referenced {
        let Some(&control) = control_index.get(name) else {
            warn!(
                animation = %animation.name,
                control = name,
                "keyframe references an unknown control"
            );
            continue;
        };
        let mut track = Vec::new();
        for keyframe in &animation.keyframes {
            if let Some(&value) = keyframe.control_values.get(name) {
                track.extend([keyframe.time, value]);
            }
        }
        tracks.push(ControlTrack { control, track });
    }

    let events = animation
        .keyframes
        .iter()
        .filter_map(|keyframe| {
            keyframe.event.as_ref().map(|name| TrackEvent {
                time: keyframe.time,
                name: name.clone(),
            })
        })
        .collect();

    let duration = animation.keyframes.last().map_or(0.0, |k| k.time);

    CompiledAnimation {
        name: animation.name.clone(),
        looping: animation.looping,
        duration,
        tracks,
        events,
    }
}
