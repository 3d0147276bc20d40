//! Compiles controls into per-mutator bindings and evaluates them at runtime.
//!
//! A mutator governed by exactly one control gets a direct binding (two
//! step-indexed tracks, no pool lookup). A mutator governed by several
//! controls gets an indexed binding into a shared value pool, the layout the
//! shader walks with a bounded loop.

use tracing::warn;

use crate::{
    core::Vec2,
    hierarchy::MutatorTable,
    interp::{Blend, interpolate},
    model::{ControlDefinition, MutatorKind},
};

/// How a control's contribution folds into the mutator's running value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MixMode {
    Add,
    Multiply,
    /// Hue channel (x) adds with wraparound on the unit circle; y adds
    /// plainly.
    Hue,
}

impl MixMode {
    pub fn for_kind(kind: MutatorKind) -> Self {
        match kind {
            MutatorKind::Stretch | MutatorKind::Opacity => Self::Multiply,
            MutatorKind::Colorize => Self::Hue,
            _ => Self::Add,
        }
    }

    fn step_blend(self) -> Blend {
        match self {
            Self::Hue => Blend::Circular,
            _ => Blend::Linear,
        }
    }

    fn fold(self, base: Vec2, value: Vec2) -> Vec2 {
        match self {
            Self::Multiply => base.mul(value),
            Self::Add => base.add(value),
            Self::Hue => Vec2::new((base.x + value.x).rem_euclid(1.0), base.y + value.y),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DirectBinding {
    pub control: usize,
    pub step_type: i32,
    pub mix: MixMode,
    /// Flat `(step index, value)` tracks, one per axis.
    pub track_x: Vec<f32>,
    pub track_y: Vec<f32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexedEntry {
    /// Element offset into the shared value pool.
    pub pool_offset: usize,
    pub control: usize,
    pub steps: usize,
    pub step_type: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IndexedBinding {
    pub mix: MixMode,
    pub entries: Vec<IndexedEntry>,
}

/// A mutator's control binding. Mutators with no governing control have no
/// binding record and evaluate to their default value.
#[derive(Clone, Debug, PartialEq)]
pub enum Binding {
    Direct(DirectBinding),
    Indexed(IndexedBinding),
}

#[derive(Clone, Debug, Default)]
pub struct CompiledBindings {
    /// One slot per mutator table entry.
    pub bindings: Vec<Option<Binding>>,
    /// Shared value pool for indexed bindings.
    pub pool: Vec<Vec2>,
    /// Largest governing-control count of any mutator; sizes the shader's
    /// evaluation loop.
    pub max_iteration: usize,
}

struct ControlData {
    control: usize,
    step_type: i32,
    values: Vec<Vec2>,
}

pub fn compile_bindings(
    controls: &[ControlDefinition],
    table: &MutatorTable,
) -> CompiledBindings {
    let mut governing: Vec<Vec<ControlData>> = (0..table.len()).map(|_| Vec::new()).collect();

    for (control_index, control) in controls.iter().enumerate() {
        for name in governed_names(control) {
            let Some(&mutator) = table.index_by_name.get(name) else {
                warn!(
                    control = %control.name,
                    mutator = name,
                    "control step names an unknown mutator"
                );
                continue;
            };
            let values = control
                .steps
                .iter()
                .map(|step| step.get(name).copied().unwrap_or(Vec2::ZERO))
                .collect();
            governing[mutator].push(ControlData {
                control: control_index,
                step_type: 0,
                values,
            });
        }
    }

    let mut compiled = CompiledBindings {
        bindings: Vec::with_capacity(table.len()),
        ..Default::default()
    };

    for (mutator, data) in governing.into_iter().enumerate() {
        let mix = MixMode::for_kind(table.kinds[mutator]);
        let binding = match data.len() {
            0 => None,
            1 => {
                let data = &data[0];
                let mut track_x = Vec::with_capacity(data.values.len() * 2);
                let mut track_y = Vec::with_capacity(data.values.len() * 2);
                for (step, value) in data.values.iter().enumerate() {
                    track_x.extend([step as f32, value.x]);
                    track_y.extend([step as f32, value.y]);
                }
                Some(Binding::Direct(DirectBinding {
                    control: data.control,
                    step_type: data.step_type,
                    mix,
                    track_x,
                    track_y,
                }))
            }
            _ => {
                compiled.max_iteration = compiled.max_iteration.max(data.len());
                let entries = data
                    .into_iter()
                    .map(|data| {
                        let pool_offset = compiled.pool.len();
                        compiled.pool.extend(&data.values);
                        IndexedEntry {
                            pool_offset,
                            control: data.control,
                            steps: data.values.len(),
                            step_type: data.step_type,
                        }
                    })
                    .collect();
                Some(Binding::Indexed(IndexedBinding { mix, entries }))
            }
        };
        compiled.bindings.push(binding);
    }

    compiled
}

/// Mutator names referenced across a control's steps, in first-seen order.
fn governed_names(control: &ControlDefinition) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for step in &control.steps {
        for name in step.keys() {
            if !names.iter().any(|n| *n == name) {
                names.push(name);
            }
        }
    }
    names
}

impl CompiledBindings {
    /// Flattens the indexed bindings into the triple table and the
    /// per-mutator `(offset, count)` rows the device consumes.
    pub fn index_buffers(&self) -> (Vec<[i32; 3]>, Vec<[i32; 2]>) {
        let mut triples = Vec::new();
        let mut per_mutator = Vec::with_capacity(self.bindings.len());
        for binding in &self.bindings {
            match binding {
                Some(Binding::Indexed(indexed)) => {
                    per_mutator.push([triples.len() as i32, indexed.entries.len() as i32]);
                    for entry in &indexed.entries {
                        triples.push([
                            entry.pool_offset as i32,
                            entry.control as i32,
                            entry.step_type,
                        ]);
                    }
                }
                _ => per_mutator.push([0, 0]),
            }
        }
        (triples, per_mutator)
    }

    /// Evaluates one mutator's binding against the frame's control values.
    pub fn evaluate(&self, mutator: usize, default: Vec2, control_values: &[f32]) -> Vec2 {
        match &self.bindings[mutator] {
            None => default,
            Some(Binding::Direct(direct)) => {
                let steps = direct.track_x.len() / 2;
                let position = clamp_step(control_values[direct.control], steps);
                let blend = direct.mix.step_blend();
                let value = Vec2::new(
                    interpolate(&direct.track_x, position, 0.0, blend),
                    interpolate(&direct.track_y, position, 0.0, Blend::Linear),
                );
                direct.mix.fold(default, value)
            }
            Some(Binding::Indexed(indexed)) => {
                let blend = indexed.mix.step_blend();
                let mut result = default;
                for entry in &indexed.entries {
                    let position = clamp_step(control_values[entry.control], entry.steps);
                    let low = entry.pool_offset + position.floor() as usize;
                    let high = entry.pool_offset + position.ceil() as usize;
                    let t = position - position.floor();
                    let a = self.pool[low];
                    let b = self.pool[high];
                    let value = Vec2::new(blend.mix(a.x, b.x, t), Blend::Linear.mix(a.y, b.y, t));
                    result = indexed.mix.fold(result, value);
                }
                result
            }
        }
    }
}

fn clamp_step(value: f32, steps: usize) -> f32 {
    let max = (steps.max(1) - 1) as f32;
    value.clamp(0.0, max)
}
