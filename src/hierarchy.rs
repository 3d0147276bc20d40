//! Flattens the shape tree's mutation generators into an indexed table with
//! parent links, encoding the implicit composition forest.

use std::collections::HashMap;

use crate::model::{MutatorKind, ShapeDefinition};

/// One entry per mutation generator in document visitation order.
///
/// `parents[i]` always refers to an entry visited strictly before `i`
/// (or is -1), so the table encodes a forest.
#[derive(Clone, Debug, Default)]
pub struct MutatorTable {
    /// `[kind code, origin.x, origin.y, radius-or--1]` per mutator.
    pub rows: Vec<[f32; 4]>,
    pub parents: Vec<i32>,
    pub kinds: Vec<MutatorKind>,
    /// Mutator names in visitation order; indices match `rows`.
    pub names: Vec<String>,
    pub index_by_name: HashMap<String, usize>,
    /// Per shape name, the mutator that drives it (-1 if none is in scope).
    pub shape_drivers: HashMap<String, i32>,
}

impl MutatorTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Builds the flat mutator table in one traversal.
///
/// A mutator's parent is the most recent generator in scope: the previous
/// generator on the same node, else the last generator of the nearest
/// ancestor that has one. A shape's driver uses the same rule without the
/// self exclusion, so a sprite is driven by its own last generator when it
/// has any.
pub fn build_mutator_table(shapes: &[ShapeDefinition]) -> MutatorTable {
    let mut table = MutatorTable::default();
    visit(shapes, -1, &mut table);
    table
}

fn visit(shapes: &[ShapeDefinition], scope: i32, table: &mut MutatorTable) {
    for shape in shapes {
        let mut last = scope;
        for mutator in shape.mutators() {
            let index = table.rows.len();
            let radius = if mutator.kind.has_radius() {
                mutator.radius
            } else {
                -1.0
            };
            table.rows.push([
                mutator.kind.code(),
                mutator.origin.x,
                mutator.origin.y,
                radius,
            ]);
            table.parents.push(last);
            table.kinds.push(mutator.kind);
            table.names.push(mutator.name.clone());
            table.index_by_name.insert(mutator.name.clone(), index);
            last = index as i32;
        }
        table.shape_drivers.insert(shape.name().to_string(), last);
        if let ShapeDefinition::Folder { items, .. } = shape {
            visit(items, last, table);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Vec2;
    use crate::model::Mutator;

    fn mutator(name: &str, kind: MutatorKind, origin: Vec2, radius: f32) -> Mutator {
        Mutator {
            name: name.to_string(),
            kind,
            origin,
            radius,
        }
    }

    fn sprite(name: &str, mutators: Vec<Mutator>) -> ShapeDefinition {
        ShapeDefinition::Sprite {
            name: name.to_string(),
            points: vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(10.0, 10.0),
                Vec2::new(5.0, 0.0),
            ],
            translate: Vec2::new(20.0, 20.0),
            mutation_vectors: mutators,
        }
    }

    /// A folder with two generators and three sprite children, one generator
    /// chain each.
    fn demo_shapes() -> Vec<ShapeDefinition> {
        vec![ShapeDefinition::Folder {
            name: "Folder".to_string(),
            mutation_vectors: vec![
                mutator("translate", MutatorKind::Translate, Vec2::new(30.0, 30.0), -1.0),
                mutator("hide", MutatorKind::Opacity, Vec2::new(30.0, 30.0), -1.0),
            ],
            items: vec![
                sprite(
                    "Layer1",
                    vec![
                        mutator("mutate", MutatorKind::Deform, Vec2::new(15.0, 15.0), 30.0),
                        mutator("stretch", MutatorKind::Stretch, Vec2::new(18.0, 12.0), -1.0),
                    ],
                ),
                sprite(
                    "Layer2",
                    vec![mutator("limb", MutatorKind::Rotate, Vec2::new(40.0, 34.0), -1.0)],
                ),
                sprite(
                    "Layer3",
                    vec![mutator("move", MutatorKind::Translate, Vec2::new(40.0, 34.0), -1.0)],
                ),
            ],
        }]
    }

    #[test]
    fn rows_carry_kind_origin_and_radius() {
        let table = build_mutator_table(&demo_shapes());
        assert_eq!(table.len(), 6);
        assert_eq!(table.rows[0], [1.0, 30.0, 30.0, -1.0]);
        assert_eq!(table.rows[1], [5.0, 30.0, 30.0, -1.0]);
        assert_eq!(table.rows[2], [4.0, 15.0, 15.0, 30.0]);
        assert_eq!(table.rows[3], [2.0, 18.0, 12.0, -1.0]);
        assert_eq!(table.rows[4], [3.0, 40.0, 34.0, -1.0]);
    }

    #[test]
    fn first_mutator_in_scope_has_no_parent() {
        let table = build_mutator_table(&demo_shapes());
        assert_eq!(table.parents[0], -1);
    }

    #[test]
    fn later_mutators_on_a_node_chain_to_the_previous_one() {
        let table = build_mutator_table(&demo_shapes());
        assert_eq!(table.parents[1], 0);
        assert_eq!(table.parents[3], 2);
    }

    #[test]
    fn first_mutator_of_a_child_links_to_the_nearest_ancestor_generator() {
        let table = build_mutator_table(&demo_shapes());
        assert_eq!(table.parents[2], 1);
        assert_eq!(table.parents[4], 1);
        assert_eq!(table.parents[5], 1);
    }

    #[test]
    fn parents_always_point_backwards() {
        let table = build_mutator_table(&demo_shapes());
        for (i, &parent) in table.parents.iter().enumerate() {
            assert!(parent < i as i32);
        }
    }

    #[test]
    fn sprites_are_driven_by_their_own_last_generator_or_the_scope() {
        let table = build_mutator_table(&demo_shapes());
        assert_eq!(table.shape_drivers["Layer1"], 3);
        assert_eq!(table.shape_drivers["Layer2"], 4);
        assert_eq!(table.shape_drivers["Layer3"], 5);
        assert_eq!(table.shape_drivers["Folder"], 1);
    }

    #[test]
    fn sprite_without_generators_inherits_the_scope_driver() {
        let mut shapes = demo_shapes();
        if let ShapeDefinition::Folder { items, .. } = &mut shapes[0] {
            items.push(sprite("Bare", vec![]));
        }
        let table = build_mutator_table(&shapes);
        assert_eq!(table.shape_drivers["Bare"], 1);

        let lone = vec![sprite("Lone", vec![])];
        let table = build_mutator_table(&lone);
        assert_eq!(table.shape_drivers["Lone"], -1);
    }
}
