use std::collections::{BTreeMap, HashSet};

use crate::{
    core::Vec2,
    error::{MarionetteError, MarionetteResult},
};

/// The one document version this crate understands.
pub const SUPPORTED_VERSION: &str = "1.0";

/// A puppet animation document as stored on disk.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuppetDefinition {
    pub version: String,
    pub shapes: Vec<ShapeDefinition>,
    /// Base mutation value per mutator name. Names not listed here default
    /// to `(0, 0)`.
    pub default_frame: BTreeMap<String, Vec2>,
    pub controls: Vec<ControlDefinition>,
    /// Initial persisted value per control name, missing entries default to 0.
    #[serde(default)]
    pub control_values: BTreeMap<String, f32>,
    #[serde(default)]
    pub animations: Vec<AnimationDefinition>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ShapeDefinition {
    #[serde(rename = "folder", rename_all = "camelCase")]
    Folder {
        name: String,
        mutation_vectors: Vec<Mutator>,
        items: Vec<ShapeDefinition>,
    },
    #[serde(rename = "sprite", rename_all = "camelCase")]
    Sprite {
        name: String,
        points: Vec<Vec2>,
        translate: Vec2,
        mutation_vectors: Vec<Mutator>,
    },
}

impl ShapeDefinition {
    pub fn name(&self) -> &str {
        match self {
            Self::Folder { name, .. } | Self::Sprite { name, .. } => name,
        }
    }

    pub fn mutators(&self) -> &[Mutator] {
        match self {
            Self::Folder {
                mutation_vectors, ..
            }
            | Self::Sprite {
                mutation_vectors, ..
            } => mutation_vectors,
        }
    }
}

/// A named transform generator attached to a shape or folder.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Mutator {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MutatorKind,
    pub origin: Vec2,
    /// Influence radius for translate/deform; `-1` means unbounded/absent.
    #[serde(default = "no_radius")]
    pub radius: f32,
}

fn no_radius() -> f32 {
    -1.0
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutatorKind {
    Translate,
    Stretch,
    Rotate,
    Deform,
    Opacity,
    Lightness,
    Saturation,
    Colorize,
}

impl MutatorKind {
    /// Numeric code used in the flat mutator table and the shader.
    pub fn code(self) -> f32 {
        match self {
            Self::Translate => 1.0,
            Self::Stretch => 2.0,
            Self::Rotate => 3.0,
            Self::Deform => 4.0,
            Self::Opacity => 5.0,
            Self::Lightness => 6.0,
            Self::Saturation => 7.0,
            Self::Colorize => 8.0,
        }
    }

    pub fn has_radius(self) -> bool {
        matches!(self, Self::Translate | Self::Deform)
    }
}

/// One discrete step of a control: a partial map from mutator name to value.
pub type ControlStep = BTreeMap<String, Vec2>;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ControlDefinition {
    pub name: String,
    pub steps: Vec<ControlStep>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct AnimationDefinition {
    pub name: String,
    pub looping: bool,
    pub keyframes: Vec<Keyframe>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyframe {
    /// Milliseconds from track start.
    pub time: f32,
    #[serde(default)]
    pub control_values: BTreeMap<String, f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

/// Visits every shape in document order: the node itself, then (for folders)
/// each child subtree.
pub fn walk_shapes<'a>(shapes: &'a [ShapeDefinition], visit: &mut impl FnMut(&'a ShapeDefinition)) {
    for shape in shapes {
        visit(shape);
        if let ShapeDefinition::Folder { items, .. } = shape {
            walk_shapes(items, visit);
        }
    }
}

impl PuppetDefinition {
    pub fn validate(&self) -> MarionetteResult<()> {
        if self.version != SUPPORTED_VERSION {
            return Err(MarionetteError::UnsupportedVersion {
                found: self.version.clone(),
            });
        }

        let mut mutator_names = HashSet::new();
        let mut duplicate = None;
        walk_shapes(&self.shapes, &mut |shape| {
            for mutator in shape.mutators() {
                if !mutator_names.insert(mutator.name.as_str()) && duplicate.is_none() {
                    duplicate = Some(mutator.name.clone());
                }
            }
        });
        if let Some(name) = duplicate {
            return Err(MarionetteError::validation(format!(
                "duplicate mutator name '{name}'"
            )));
        }

        let mut control_names = HashSet::new();
        for control in &self.controls {
            if control.steps.len() < 2 {
                return Err(MarionetteError::validation(format!(
                    "control '{}' must have at least 2 steps",
                    control.name
                )));
            }
            if !control_names.insert(control.name.as_str()) {
                return Err(MarionetteError::validation(format!(
                    "duplicate control name '{}'",
                    control.name
                )));
            }
        }

        let mut animation_names = HashSet::new();
        for animation in &self.animations {
            if !animation_names.insert(animation.name.as_str()) {
                return Err(MarionetteError::validation(format!(
                    "duplicate animation name '{}'",
                    animation.name
                )));
            }
            if !animation
                .keyframes
                .windows(2)
                .all(|w| w[0].time < w[1].time)
            {
                return Err(MarionetteError::validation(format!(
                    "animation '{}' keyframe times must be strictly increasing",
                    animation.name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn mutator(name: &str, kind: MutatorKind) -> Mutator {
        Mutator {
            name: name.to_string(),
            kind,
            origin: Vec2::new(1.0, 2.0),
            radius: -1.0,
        }
    }

    fn basic_def() -> PuppetDefinition {
        PuppetDefinition {
            version: SUPPORTED_VERSION.to_string(),
            shapes: vec![ShapeDefinition::Folder {
                name: "Body".to_string(),
                mutation_vectors: vec![mutator("sway", MutatorKind::Translate)],
                items: vec![sprite("Head", vec![mutator("nod", MutatorKind::Rotate)])],
            }],
            default_frame: BTreeMap::from([("sway".to_string(), Vec2::ZERO)]),
            controls: vec![ControlDefinition {
                name: "Nod".to_string(),
                steps: vec![
                    BTreeMap::from([("nod".to_string(), Vec2::new(-10.0, 0.0))]),
                    BTreeMap::from([("nod".to_string(), Vec2::new(10.0, 0.0))]),
                ],
            }],
            control_values: BTreeMap::new(),
            animations: vec![AnimationDefinition {
                name: "Bounce".to_string(),
                looping: true,
                keyframes: vec![
                    Keyframe {
                        time: 0.0,
                        control_values: BTreeMap::from([("Nod".to_string(), 0.0)]),
                        event: None,
                    },
                    Keyframe {
                        time: 500.0,
                        control_values: BTreeMap::from([("Nod".to_string(), 1.0)]),
                        event: None,
                    },
                ],
            }],
        }
    }

    #[test]
    fn json_roundtrip_keeps_the_document_format() {
        let def = basic_def();
        let s = serde_json::to_string_pretty(&def).unwrap();
        assert!(s.contains("\"mutationVectors\""));
        assert!(s.contains("\"defaultFrame\""));
        assert!(s.contains("\"type\": \"folder\""));
        let de: PuppetDefinition = serde_json::from_str(&s).unwrap();
        assert_eq!(de.controls.len(), 1);
        assert_eq!(de.shapes[0].mutators()[0].kind, MutatorKind::Translate);
    }

    #[test]
    fn radius_defaults_to_sentinel() {
        let m: Mutator =
            serde_json::from_str(r#"{"name": "grow", "type": "stretch", "origin": [18, 12]}"#)
                .unwrap();
        assert_eq!(m.radius, -1.0);
        assert!(!m.kind.has_radius());
    }

    #[test]
    fn validate_rejects_unsupported_version() {
        let mut def = basic_def();
        def.version = "2.0".to_string();
        let err = def.validate().unwrap_err();
        assert_eq!(err.to_string(), "version 2.0 files are not supported");
    }

    #[test]
    fn validate_rejects_duplicate_mutator_names() {
        let mut def = basic_def();
        def.shapes
            .push(sprite("Tail", vec![mutator("sway", MutatorKind::Deform)]));
        assert!(def.validate().is_err());
    }

    #[test]
    fn validate_rejects_single_step_controls() {
        let mut def = basic_def();
        def.controls[0].steps.truncate(1);
        assert!(def.validate().is_err());
    }

    #[test]
    fn validate_rejects_unsorted_keyframes() {
        let mut def = basic_def();
        def.animations[0].keyframes.reverse();
        assert!(def.validate().is_err());
    }

    #[test]
    fn walk_visits_folders_before_their_children() {
        let def = basic_def();
        let mut names = Vec::new();
        walk_shapes(&def.shapes, &mut |s| names.push(s.name().to_string()));
        assert_eq!(names, vec!["Body", "Head"]);
    }
}
