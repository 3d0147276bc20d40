//! Piecewise-linear interpolation over flat `(time, value)` tracks.

/// How two neighbouring track values are mixed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Blend {
    Linear,
    /// Values live on the unit circle (hues): mixing takes the short way
    /// around the 0/1 boundary and the result wraps back into [0, 1).
    Circular,
}

impl Blend {
    pub fn mix(self, a: f32, b: f32, t: f32) -> f32 {
        match self {
            Self::Linear => a * (1.0 - t) + b * t,
            Self::Circular => {
                let mut delta = b - a;
                if delta > 0.5 {
                    delta -= 1.0;
                }
                if delta < -0.5 {
                    delta += 1.0;
                }
                (a + delta * t).rem_euclid(1.0)
            }
        }
    }
}

/// Samples a flat `[t0, v0, t1, v1, ..]` track at `position`.
///
/// Before the first keyed time the value ramps from `(0, start_value)`; past
/// the last keyed time the last value holds. An empty track yields
/// `start_value`.
pub fn interpolate(track: &[f32], position: f32, start_value: f32, blend: Blend) -> f32 {
    let mut i = 0;
    while i + 1 < track.len() {
        if track[i] > position {
            let (prev_pos, prev_value) = if i > 1 {
                (track[i - 2], track[i - 1])
            } else {
                (0.0, start_value)
            };
            let t = (position - prev_pos) / (track[i] - prev_pos);
            return blend.mix(prev_value, track[i + 1], t);
        }
        i += 2;
    }
    track.last().copied().unwrap_or(start_value)
}
