//! Turns a validated document into the flat buffer bundle the playback
//! runtime and the graphics device consume.

use crate::{
    bindings::{CompiledBindings, compile_bindings},
    buffer::{FloatBuffer, IntBuffer},
    core::Vec2,
    error::MarionetteResult,
    geometry::flatten_sprite,
    hierarchy::build_mutator_table,
    model::{PuppetDefinition, ShapeDefinition, walk_shapes},
    tracks::{CompiledAnimation, compile_animations},
};

#[derive(Clone, Debug, PartialEq)]
pub struct ControlInfo {
    pub name: String,
    pub steps: usize,
}

/// One draw record per sprite. `start`/`amount` are element offsets into the
/// fill-index buffer; byte math is the device's concern.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeRecord {
    pub name: String,
    pub start: usize,
    pub amount: usize,
    /// Index of the mutator driving this sprite, -1 if none is in scope.
    pub mutator: i32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// The compiled, GPU-friendly form of a document: flat numeric buffers (each
/// tagged with stride and element count), draw records, control metadata and
/// compiled animation tracks.
#[derive(Clone, Debug)]
pub struct PreparedPuppet {
    pub mutators: FloatBuffer,
    pub mutator_parents: IntBuffer,
    /// Default mutation value per mutator, from the document's default frame.
    pub mutation_values: FloatBuffer,
    /// Shared value pool for indexed bindings.
    pub control_mutation_values: FloatBuffer,
    /// `(pool offset, control index, step type)` triples.
    pub mutation_value_indices: IntBuffer,
    /// Per mutator: `(triple offset, triple count)`.
    pub control_mutation_indices: IntBuffer,
    pub max_iteration: usize,
    pub shape_vertices: FloatBuffer,
    pub shape_indices: Vec<u16>,
    pub shapes: Vec<ShapeRecord>,
    pub controls: Vec<ControlInfo>,
    pub default_control_values: Vec<f32>,
    pub animations: Vec<CompiledAnimation>,

    pub(crate) bindings: CompiledBindings,
    pub(crate) defaults: Vec<Vec2>,
}

/// Compiles a document into a [`PreparedPuppet`].
#[tracing::instrument(skip(def))]
pub fn prepare(def: &PuppetDefinition) -> MarionetteResult<PreparedPuppet> {
    def.validate()?;

    let mut sprites: Vec<&ShapeDefinition> = Vec::new();
    walk_shapes(&def.shapes, &mut |shape| {
        if matches!(shape, ShapeDefinition::Sprite { .. }) {
            sprites.push(shape);
        }
    });

    let mut vertices: Vec<[f32; 4]> = Vec::new();
    let mut indices: Vec<u16> = Vec::new();
    let mut shapes: Vec<ShapeRecord> = Vec::new();
    for sprite in sprites {
        let ShapeDefinition::Sprite {
            name,
            points,
            translate,
            ..
        } = sprite
        else {
            continue;
        };
        let geometry = flatten_sprite(name, points, vertices.len())?;
        shapes.push(ShapeRecord {
            name: name.clone(),
            start: indices.len(),
            amount: geometry.indices.len(),
            mutator: -1,
            x: translate.x,
            y: translate.y,
            z: -0.5 + shapes.len() as f32 * 0.0001,
        });
        vertices.extend(geometry.vertices);
        indices.extend(geometry.indices);
    }

    let table = build_mutator_table(&def.shapes);
    for shape in &mut shapes {
        shape.mutator = table.shape_drivers.get(&shape.name).copied().unwrap_or(-1);
    }
    shapes.sort_by(|a, b| b.z.total_cmp(&a.z));

    let defaults: Vec<Vec2> = table
        .names
        .iter()
        .map(|name| def.default_frame.get(name).copied().unwrap_or(Vec2::ZERO))
        .collect();

    let bindings = compile_bindings(&def.controls, &table);
    let (triples, per_mutator) = bindings.index_buffers();

    let controls: Vec<ControlInfo> = def
        .controls
        .iter()
        .map(|control| ControlInfo {
            name: control.name.clone(),
            steps: control.steps.len(),
        })
        .collect();
    let default_control_values: Vec<f32> = def
        .controls
        .iter()
        .map(|control| def.control_values.get(&control.name).copied().unwrap_or(0.0))
        .collect();

    let animations = compile_animations(&def.animations, &def.controls);

    Ok(PreparedPuppet {
        mutators: FloatBuffer::from_rows(&table.rows),
        mutator_parents: IntBuffer::from_scalars(&table.parents),
        mutation_values: FloatBuffer::from_vec2s(&defaults),
        control_mutation_values: FloatBuffer::from_vec2s(&bindings.pool),
        mutation_value_indices: IntBuffer::from_rows(&triples),
        control_mutation_indices: IntBuffer::from_rows(&per_mutator),
        max_iteration: bindings.max_iteration,
        shape_vertices: FloatBuffer::from_rows(&vertices),
        shape_indices: indices,
        shapes,
        controls,
        default_control_values,
        animations,
        bindings,
        defaults,
    })
}

impl PreparedPuppet {
    /// Effective 2-component value of every mutator for the given control
    /// values, binding-evaluated in table order.
    pub fn evaluate_mutations(&self, control_values: &[f32]) -> Vec<Vec2> {
        (0..self.defaults.len())
            .map(|i| self.bindings.evaluate(i, self.defaults[i], control_values))
            .collect()
    }

    pub fn track_names(&self) -> Vec<String> {
        self.animations.iter().map(|a| a.name.clone()).collect()
    }

    pub fn control_names(&self) -> Vec<String> {
        self.controls.iter().map(|c| c.name.clone()).collect()
    }
}
