//! Playback scheduler: owns per-track play state, resolves control/track
//! conflicts, interpolates control values each frame and hands the results to
//! the graphics device.
//!
//! Single-threaded and cooperative: state only advances inside the host's
//! render call. Listeners run synchronously on that call stack, in
//! registration order; dispatch iterates a snapshot of the listener list, so
//! unsubscribing mid-dispatch never corrupts the iteration.

use std::rc::Rc;

use crate::{
    compile::PreparedPuppet,
    device::{FrameInput, GraphicsDevice, ViewState},
    error::{MarionetteError, MarionetteResult},
    interp::{Blend, interpolate},
    shaders::shader_set,
    time::{Clock, SystemClock},
};

/// Scheduling parameters for [`Playback::start_track`].
#[derive(Clone, Copy, Debug)]
pub struct StartOptions {
    /// Play-time offset in milliseconds at which the track starts.
    pub start_at: f32,
    /// Playback rate; must be finite and > 0.
    pub speed: f32,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self {
            start_at: 0.0,
            speed: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct PlaybackOptions {
    pub pan_x: f32,
    pub pan_y: f32,
    pub zoom: f32,
    pub z_index: f32,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            pan_x: 0.0,
            pan_y: 0.0,
            zoom: 1.0,
            z_index: 0.0,
        }
    }
}

/// Timing state of one playing track. Created on start, destroyed on stop.
#[derive(Clone, Copy, Debug)]
struct PlayStatus {
    track: usize,
    speed: f64,
    /// Clock instant play time 0 maps to (already offset by start_at/speed).
    started_at: f64,
    /// Like `started_at`, but rolled forward one duration per completed loop.
    iteration_started_at: f64,
    last_render: f64,
}

/// Handle returned by the subscription methods; passing it to
/// [`Playback::unsubscribe`] removes exactly that listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type TrackStoppedListener = Rc<dyn Fn(&str)>;
type EventListener = Rc<dyn Fn(&str, &str, f32)>;
type ControlChangeListener = Rc<dyn Fn(usize, f32)>;

/// A playing puppet instance bound to one graphics device.
pub struct Playback {
    prepared: PreparedPuppet,
    device: Box<dyn GraphicsDevice>,
    clock: Box<dyn Clock>,
    /// Baseline control values carried across track stops and loops.
    control_values: Vec<f32>,
    /// This frame's interpolated values, rebuilt every render call.
    render_values: Vec<f32>,
    playing: Vec<PlayStatus>,
    looping: Vec<bool>,
    view: ViewState,
    track_stopped: Vec<(ListenerId, TrackStoppedListener)>,
    event_listeners: Vec<(ListenerId, EventListener)>,
    control_changes: Vec<(ListenerId, ControlChangeListener)>,
    next_listener: u64,
    released: bool,
}

impl Playback {
    /// Hands the device the compiled buffers and parameterized shader source,
    /// then readies the scheduler. A device failure is fatal for the
    /// instance and not retried.
    pub fn new(
        prepared: PreparedPuppet,
        device: Box<dyn GraphicsDevice>,
        options: PlaybackOptions,
    ) -> MarionetteResult<Self> {
        Self::with_clock(prepared, device, options, Box::new(SystemClock::new()))
    }

    pub fn with_clock(
        prepared: PreparedPuppet,
        mut device: Box<dyn GraphicsDevice>,
        options: PlaybackOptions,
        clock: Box<dyn Clock>,
    ) -> MarionetteResult<Self> {
        let shaders = shader_set(&prepared);
        device.init(&prepared, &shaders)?;

        let control_values = prepared.default_control_values.clone();
        let render_values = control_values.clone();
        let looping = prepared.animations.iter().map(|a| a.looping).collect();
        Ok(Self {
            prepared,
            device,
            clock,
            control_values,
            render_values,
            playing: Vec::new(),
            looping,
            view: ViewState {
                pan: crate::core::Vec2::new(options.pan_x, options.pan_y),
                zoom: options.zoom,
                z_index: options.z_index,
            },
            track_stopped: Vec::new(),
            event_listeners: Vec::new(),
            control_changes: Vec::new(),
            next_listener: 0,
            released: false,
        })
    }

    /// Starts a track, stopping any playing track that governs a common
    /// control first (each fires its track-stopped listeners before the new
    /// play state exists).
    pub fn start_track(&mut self, name: &str, options: StartOptions) -> MarionetteResult<()> {
        let track = self.track_index(name)?;
        if !options.speed.is_finite() || options.speed <= 0.0 {
            return Err(MarionetteError::validation(format!(
                "speed must be finite and > 0, got {}",
                options.speed
            )));
        }

        let now = self.clock.now_ms();
        let conflicting: Vec<usize> = self
            .playing
            .iter()
            .enumerate()
            .filter(|(_, status)| {
                status.track == track
                    || self.prepared.animations[status.track]
                        .conflicts_with(&self.prepared.animations[track])
            })
            .map(|(i, _)| i)
            .collect();
        for (removed, index) in conflicting.into_iter().enumerate() {
            let status = self.playing.remove(index - removed);
            self.finish_stop(status, now);
        }

        let speed = f64::from(options.speed);
        let start = now - f64::from(options.start_at) / speed;
        self.playing.push(PlayStatus {
            track,
            speed,
            started_at: start,
            iteration_started_at: start,
            last_render: now,
        });
        Ok(())
    }

    /// Stops a playing track, baking its current play position into the
    /// persisted control values. Stopping a track that is not playing is a
    /// no-op.
    pub fn stop_track(&mut self, name: &str) -> MarionetteResult<()> {
        let track = self.track_index(name)?;
        let now = self.clock.now_ms();
        if let Some(index) = self.playing.iter().position(|s| s.track == track) {
            let status = self.playing.remove(index);
            self.finish_stop(status, now);
        }
        Ok(())
    }

    pub fn is_playing(&self, name: &str) -> MarionetteResult<bool> {
        let track = self.track_index(name)?;
        Ok(self.playing.iter().any(|s| s.track == track))
    }

    /// Flips the loop flag; only affects future loop-completion behavior.
    pub fn set_looping(&mut self, name: &str, looping: bool) -> MarionetteResult<()> {
        let track = self.track_index(name)?;
        self.looping[track] = looping;
        Ok(())
    }

    /// Writes a control value directly. The value is validated against
    /// `[0, steps - 1]` before any state changes; playing tracks governing
    /// the control are stopped first.
    pub fn set_control_value(&mut self, name: &str, value: f32) -> MarionetteResult<()> {
        let control = self.control_index(name)?;
        let max = (self.prepared.controls[control].steps - 1) as f32;
        if !value.is_finite() || value < 0.0 || value > max {
            return Err(MarionetteError::ControlOutOfRange {
                control: name.to_string(),
                value,
                max,
            });
        }

        let now = self.clock.now_ms();
        let conflicting: Vec<usize> = self
            .playing
            .iter()
            .enumerate()
            .filter(|(_, status)| self.prepared.animations[status.track].governs(control))
            .map(|(i, _)| i)
            .collect();
        for (removed, index) in conflicting.into_iter().enumerate() {
            let status = self.playing.remove(index - removed);
            self.finish_stop(status, now);
        }

        self.control_values[control] = value;
        let listeners: Vec<ControlChangeListener> = self
            .control_changes
            .iter()
            .map(|(_, f)| f.clone())
            .collect();
        for listener in listeners {
            listener(control, value);
        }
        Ok(())
    }

    pub fn control_value(&self, name: &str) -> MarionetteResult<f32> {
        let control = self.control_index(name)?;
        Ok(self.control_values[control])
    }

    pub fn set_panning(&mut self, pan_x: f32, pan_y: f32) {
        self.view.pan = crate::core::Vec2::new(pan_x, pan_y);
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.view.zoom = zoom;
    }

    pub fn set_z_index(&mut self, z_index: f32) {
        self.view.z_index = z_index;
    }

    pub fn on_track_stopped(&mut self, listener: impl Fn(&str) + 'static) -> ListenerId {
        let id = self.next_id();
        self.track_stopped.push((id, Rc::new(listener)));
        id
    }

    /// Listener arguments: event name, track name, keyframe time (ms).
    pub fn on_event(&mut self, listener: impl Fn(&str, &str, f32) + 'static) -> ListenerId {
        let id = self.next_id();
        self.event_listeners.push((id, Rc::new(listener)));
        id
    }

    pub fn on_control_change(&mut self, listener: impl Fn(usize, f32) + 'static) -> ListenerId {
        let id = self.next_id();
        self.control_changes.push((id, Rc::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) {
        self.track_stopped.retain(|(i, _)| *i != id);
        self.event_listeners.retain(|(i, _)| *i != id);
        self.control_changes.retain(|(i, _)| *i != id);
    }

    /// Advances every playing track to the current clock instant and hands
    /// the resulting frame to the device.
    pub fn render(&mut self) -> MarionetteResult<()> {
        let now = self.clock.now_ms();
        self.render_values.copy_from_slice(&self.control_values);

        let mut index = 0;
        while index < self.playing.len() {
            let status = self.playing[index];
            let duration = f64::from(self.prepared.animations[status.track].duration);
            let looping = self.looping[status.track];
            let elapsed = (now - status.started_at) * status.speed;

            if duration <= 0.0 || (!looping && elapsed > duration) {
                let status = self.playing.remove(index);
                self.finish_stop(status, now);
                continue;
            }

            // Positions for event detection stay relative to the iteration
            // the previous render belonged to.
            let prev_position = (status.last_render - status.iteration_started_at) * status.speed;
            let unrolled_position = (now - status.iteration_started_at) * status.speed;

            let mut position = unrolled_position;
            if looping {
                while position > duration {
                    // Rollover: the render value at the end of the iteration
                    // becomes the next iteration's persisted baseline.
                    for track in &self.prepared.animations[status.track].tracks {
                        let baseline = self.control_values[track.control];
                        self.control_values[track.control] = interpolate(
                            &track.track,
                            duration as f32,
                            baseline,
                            Blend::Linear,
                        );
                    }
                    self.playing[index].iteration_started_at += duration / status.speed;
                    position -= duration;
                }
            }

            for track in &self.prepared.animations[status.track].tracks {
                let baseline = self.control_values[track.control];
                self.render_values[track.control] =
                    interpolate(&track.track, position as f32, baseline, Blend::Linear);
            }

            self.dispatch_events(status.track, prev_position, unrolled_position, duration, looping);

            self.playing[index].last_render = now;
            index += 1;
        }

        let mutation_values = self.prepared.evaluate_mutations(&self.render_values);
        let frame = FrameInput {
            mutation_values: &mutation_values,
            control_values: &self.render_values,
            shapes: &self.prepared.shapes,
            view: self.view,
        };
        self.device.render(&frame)
    }

    /// Releases all device-side resources. Also runs on drop; the release
    /// happens exactly once.
    pub fn destroy(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.playing.clear();
            self.device.release();
        }
    }

    fn next_id(&mut self) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        id
    }

    fn track_index(&self, name: &str) -> MarionetteResult<usize> {
        self.prepared
            .animations
            .iter()
            .position(|a| a.name == name)
            .ok_or_else(|| MarionetteError::UnknownTrack {
                name: name.to_string(),
                known: self.prepared.track_names(),
            })
    }

    fn control_index(&self, name: &str) -> MarionetteResult<usize> {
        self.prepared
            .controls
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| MarionetteError::UnknownControl {
                name: name.to_string(),
                known: self.prepared.control_names(),
            })
    }

    /// Bakes the stopped track's play position into the persisted values and
    /// fires the track-stopped listeners.
    fn finish_stop(&mut self, status: PlayStatus, now: f64) {
        let animation = &self.prepared.animations[status.track];
        let mut play_time = ((now - status.started_at) * status.speed) as f32;
        if self.looping[status.track] && animation.duration > 0.0 {
            play_time = play_time.rem_euclid(animation.duration);
        }
        for track in &animation.tracks {
            let baseline = self.control_values[track.control];
            self.control_values[track.control] =
                interpolate(&track.track, play_time, baseline, Blend::Linear);
        }

        let name = animation.name.clone();
        let listeners: Vec<TrackStoppedListener> =
            self.track_stopped.iter().map(|(_, f)| f.clone()).collect();
        for listener in listeners {
            listener(&name);
        }
    }

    /// Fires event listeners for timestamps in `(prev, current]`, unrolled
    /// across loop boundaries.
    fn dispatch_events(
        &mut self,
        track: usize,
        prev_position: f64,
        current_position: f64,
        duration: f64,
        looping: bool,
    ) {
        let animation = &self.prepared.animations[track];
        if animation.events.is_empty() || current_position <= prev_position {
            return;
        }

        let mut due: Vec<(f32, String)> = Vec::new();
        if looping && duration > 0.0 {
            let first_lap = (prev_position / duration).floor().max(0.0) as i64;
            let last_lap = (current_position / duration).floor() as i64;
            for lap in first_lap..=last_lap {
                for event in &animation.events {
                    let at = f64::from(event.time) + lap as f64 * duration;
                    if prev_position < at && at <= current_position {
                        due.push((event.time, event.name.clone()));
                    }
                }
            }
        } else {
            for event in &animation.events {
                let at = f64::from(event.time);
                if prev_position < at && at <= current_position {
                    due.push((event.time, event.name.clone()));
                }
            }
        }
        if due.is_empty() {
            return;
        }

        let name = animation.name.clone();
        let listeners: Vec<EventListener> = self
            .event_listeners
            .iter()
            .map(|(_, f)| f.clone())
            .collect();
        for (time, event) in due {
            for listener in &listeners {
                listener(&event, &name, time);
            }
        }
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.release();
    }
}
