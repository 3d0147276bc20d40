//! Per-sprite geometry flattening: local anchor, vertex records and fill
//! indices for the device's vertex/index buffers.

use kurbo::Rect;

use crate::{
    core::Vec2,
    error::{MarionetteError, MarionetteResult},
};

/// Vertex records (`[x - anchor.x, y - anchor.y, x, y]` — deformation pair
/// plus texture pair) and the fill indices for one sprite, already offset by
/// the running vertex count.
#[derive(Clone, Debug, PartialEq)]
pub struct SpriteGeometry {
    pub vertices: Vec<[f32; 4]>,
    pub indices: Vec<u16>,
}

/// Midpoint of the point list's bounding box.
pub fn anchor(points: &[Vec2]) -> Vec2 {
    let Some(first) = points.first() else {
        return Vec2::ZERO;
    };
    let mut bounds = Rect::from_points(to_kurbo(*first), to_kurbo(*first));
    for point in &points[1..] {
        bounds = bounds.union_pt(to_kurbo(*point));
    }
    let center = bounds.center();
    Vec2::new(center.x as f32, center.y as f32)
}

pub fn flatten_sprite(
    name: &str,
    points: &[Vec2],
    base_vertex: usize,
) -> MarionetteResult<SpriteGeometry> {
    let triangles = triangulate(name, points)?;

    let anchor = anchor(points);
    let vertices = points
        .iter()
        .map(|p| [p.x - anchor.x, p.y - anchor.y, p.x, p.y])
        .collect();
    let indices = triangles
        .into_iter()
        .map(|i| (i + base_vertex) as u16)
        .collect();

    Ok(SpriteGeometry { vertices, indices })
}

/// Fill index list for a polygon's point list. The triangulation itself is an
/// external concern; its failure on a degenerate point set propagates as-is.
fn triangulate(name: &str, points: &[Vec2]) -> MarionetteResult<Vec<usize>> {
    let sites: Vec<delaunator::Point> = points
        .iter()
        .map(|p| delaunator::Point {
            x: f64::from(p.x),
            y: f64::from(p.y),
        })
        .collect();
    let triangles = delaunator::triangulate(&sites).triangles;
    if triangles.is_empty() {
        return Err(MarionetteError::triangulation(format!(
            "sprite '{name}' has a degenerate point set ({} points)",
            points.len()
        )));
    }
    Ok(triangles)
}

fn to_kurbo(v: Vec2) -> kurbo::Point {
    kurbo::Point::new(f64::from(v.x), f64::from(v.y))
}
