// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Section cuts through triangle meshes.
//!
//! Every triangle is intersected with the cut plane, the resulting 3D
//! segments are projected into the plane's 2D frame, and the pieces are
//! chained into contours. Consecutive collinear pieces (a wall face split
//! along its diagonal, say) are merged back into one segment.

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use scan_lite_core::{
    BoundingBox2D, Error, Mesh, PlaneModel, Point2D, Result, SectionResult, SectionSegment,
    SectionStatus,
};
use scan_lite_geometry::{GeometryProvider, TriangleCut};
use serde::{Deserialize, Serialize};

/// Relative cross product below which two pieces count as collinear
const COLLINEAR_EPSILON: f64 = 1e-9;

/// Cut plane as it arrives in a request: a `type` tag plus optional
/// parameters, validated by [`CutPlane::from_spec`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutPlaneSpec {
    #[serde(rename = "type", default = "default_cut_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction_deg: Option<f64>,
}

fn default_cut_type() -> String {
    "horizontal".to_string()
}

impl Default for CutPlaneSpec {
    fn default() -> Self {
        Self {
            kind: default_cut_type(),
            height_m: None,
            position_m: None,
            direction_deg: None,
        }
    }
}

/// Validated cut plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CutPlane {
    /// Plane `z = height_m`, drawn in plan `(x, y)`
    Horizontal { height_m: f64 },
    /// Vertical plane along `direction_deg` (counter-clockwise from +X), offset
    /// `position_m` along its normal, drawn as an elevation `(u, z)`
    Vertical { position_m: f64, direction_deg: f64 },
}

impl Default for CutPlane {
    fn default() -> Self {
        CutPlane::Horizontal { height_m: 1.2 }
    }
}

impl CutPlane {
    pub fn horizontal(height_m: f64) -> Self {
        CutPlane::Horizontal { height_m }
    }

    pub fn vertical(position_m: f64, direction_deg: f64) -> Self {
        CutPlane::Vertical {
            position_m,
            direction_deg,
        }
    }

    /// Validate a request-level description
    pub fn from_spec(spec: &CutPlaneSpec) -> Result<Self> {
        let cut = match spec.kind.as_str() {
            "horizontal" => CutPlane::horizontal(spec.height_m.unwrap_or(1.2)),
            "vertical" => CutPlane::vertical(spec.position_m.unwrap_or(0.0), spec.direction_deg.unwrap_or(0.0)),
            other => return Err(Error::UnsupportedCutPlane(other.to_string())),
        };
        let finite = match cut {
            CutPlane::Horizontal { height_m } => height_m.is_finite(),
            CutPlane::Vertical {
                position_m,
                direction_deg,
            } => position_m.is_finite() && direction_deg.is_finite(),
        };
        if !finite {
            return Err(Error::InvalidConfig(format!("cut plane parameters must be finite: {:?}", cut)));
        }
        Ok(cut)
    }

    /// Unit normal and a point on the plane
    fn frame(&self) -> (Vector3<f64>, Point3<f64>) {
        match *self {
            CutPlane::Horizontal { height_m } => (Vector3::z(), Point3::new(0.0, 0.0, height_m)),
            CutPlane::Vertical {
                position_m,
                direction_deg,
            } => {
                let theta = direction_deg.to_radians();
                let normal = Vector3::new(-theta.sin(), theta.cos(), 0.0);
                (normal, Point3::from(normal * position_m))
            }
        }
    }

    pub fn plane(&self) -> Result<PlaneModel> {
        let (normal, origin) = self.frame();
        PlaneModel::from_point_normal(&origin, &normal)
            .ok_or_else(|| Error::InvalidConfig(format!("degenerate cut plane: {:?}", self)))
    }

    /// Project a point on the plane into the section's 2D frame
    pub fn project(&self, point: &Point3<f64>) -> Point2D {
        match *self {
            CutPlane::Horizontal { .. } => Point2D::new(point.x, point.y),
            CutPlane::Vertical { direction_deg, .. } => {
                let (_, origin) = self.frame();
                let theta = direction_deg.to_radians();
                let along = Vector3::new(theta.cos(), theta.sin(), 0.0);
                Point2D::new((point - origin).dot(&along), point.z)
            }
        }
    }
}

/// Section assembly parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionConfig {
    /// Distance under which vertices count as on the plane and endpoints
    /// as coincident
    pub tolerance: f64,
    pub merge_collinear: bool,
    /// Size given to a zero-extent bounding box axis
    pub min_extent: f64,
}

impl Default for SectionConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            merge_collinear: true,
            min_extent: 1.0,
        }
    }
}

impl SectionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "section tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if !(self.min_extent.is_finite() && self.min_extent > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "minimum extent must be positive, got {}",
                self.min_extent
            )));
        }
        Ok(())
    }
}

/// Cut `mesh` with `cut` and assemble the contour segments.
pub fn cut_section<P: GeometryProvider + ?Sized>(
    mesh: &Mesh,
    cut: &CutPlane,
    config: &SectionConfig,
    provider: &P,
) -> Result<SectionResult> {
    config.validate()?;
    let plane = cut.plane()?;
    mesh.validate()?;

    tracing::info!(triangles = mesh.triangle_count(), cut = ?cut, "Cutting section");

    let cuts: Vec<TriangleCut> = (0..mesh.triangle_count())
        .into_par_iter()
        .map(|i| match mesh.triangle(i) {
            Some(triangle) => provider.plane_triangle_intersection(&plane, &triangle, config.tolerance),
            None => TriangleCut::None,
        })
        .collect();

    let raw: Vec<(Point2D, Point2D)> = cuts
        .into_iter()
        .filter_map(|c| match c {
            TriangleCut::Segment(a, b) if (a - b).norm() > config.tolerance => {
                Some((cut.project(&a), cut.project(&b)))
            }
            _ => None,
        })
        .collect();

    let contours = assemble(&raw, config);
    let segments: Vec<SectionSegment> = contours.iter().flatten().copied().collect();

    if segments.is_empty() {
        tracing::info!("No intersections at the cut plane");
        return Ok(SectionResult::no_intersection());
    }

    tracing::info!(
        raw_segments = raw.len(),
        segments = segments.len(),
        contours = contours.len(),
        "Section assembled"
    );

    Ok(SectionResult {
        bounding_box: BoundingBox2D::from_segments(&segments, config.min_extent),
        contour_count: contours.len(),
        segments,
        status: SectionStatus::Ok,
        message: None,
    })
}

/// Endpoint table keyed by position snapped to the tolerance grid
struct VertexTable {
    cell: f64,
    ids: FxHashMap<(i64, i64), usize>,
    points: Vec<Point2D>,
}

impl VertexTable {
    fn new(tolerance: f64) -> Self {
        Self {
            cell: tolerance,
            ids: FxHashMap::default(),
            points: Vec::new(),
        }
    }

    fn id(&mut self, p: Point2D) -> usize {
        let key = ((p.x / self.cell).round() as i64, (p.y / self.cell).round() as i64);
        let next = self.points.len();
        let id = *self.ids.entry(key).or_insert(next);
        if id == next {
            self.points.push(p);
        }
        id
    }
}

/// Dedupe raw pieces, chain them into contours and emit each contour's
/// segments in walking order
fn assemble(raw: &[(Point2D, Point2D)], config: &SectionConfig) -> Vec<Vec<SectionSegment>> {
    let mut table = VertexTable::new(config.tolerance);
    let mut seen: FxHashSet<(usize, usize)> = FxHashSet::default();
    let mut edges: Vec<(usize, usize)> = Vec::with_capacity(raw.len());

    for &(a, b) in raw {
        let (ia, ib) = (table.id(a), table.id(b));
        if ia == ib {
            continue;
        }
        if seen.insert((ia.min(ib), ia.max(ib))) {
            edges.push((ia, ib));
        }
    }

    let mut incident: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
    for (e, &(a, b)) in edges.iter().enumerate() {
        incident.entry(a).or_default().push(e);
        incident.entry(b).or_default().push(e);
    }

    let mut used = vec![false; edges.len()];
    let mut contours = Vec::new();

    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let (a, b) = edges[start];

        let mut forward = vec![a, b];
        extend_chain(&mut forward, &edges, &incident, &mut used);
        let closed = forward.len() > 2 && forward.first() == forward.last();
        if !closed {
            let mut backward = vec![a];
            extend_chain(&mut backward, &edges, &incident, &mut used);
            backward.reverse();
            backward.pop();
            backward.extend(forward);
            forward = backward;
        }

        let polyline: Vec<Point2D> = forward.iter().map(|&id| table.points[id]).collect();
        let kept = if config.merge_collinear {
            simplify(&polyline, closed)
        } else {
            polyline
        };
        contours.push(
            kept.windows(2)
                .map(|w| SectionSegment::new(w[0], w[1]))
                .collect(),
        );
    }

    contours
}

/// Walk unused edges from the chain's last vertex until none is left or
/// the chain closes
fn extend_chain(
    chain: &mut Vec<usize>,
    edges: &[(usize, usize)],
    incident: &FxHashMap<usize, Vec<usize>>,
    used: &mut [bool],
) {
    while let Some(&tail) = chain.last() {
        let next = incident
            .get(&tail)
            .and_then(|list| list.iter().copied().find(|&e| !used[e]));
        let Some(e) = next else {
            break;
        };
        used[e] = true;
        let (a, b) = edges[e];
        let other = if a == tail { b } else { a };
        chain.push(other);
        if chain.first() == Some(&other) {
            break;
        }
    }
}

/// Drop interior vertices that continue straight on. Closed polylines repeat
/// their first vertex at the end and may also lose it.
fn simplify(polyline: &[Point2D], closed: bool) -> Vec<Point2D> {
    if closed {
        let ring = &polyline[..polyline.len() - 1];
        let n = ring.len();
        let keep: Vec<bool> = (0..n)
            .map(|i| !is_straight(&ring[(i + n - 1) % n], &ring[i], &ring[(i + 1) % n]))
            .collect();
        let Some(first) = keep.iter().position(|&k| k) else {
            return polyline.to_vec();
        };
        let mut out: Vec<Point2D> = (0..n)
            .map(|k| (first + k) % n)
            .filter(|&i| keep[i])
            .map(|i| ring[i])
            .collect();
        out.push(ring[first]);
        out
    } else {
        let n = polyline.len();
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let interior = i > 0 && i + 1 < n;
            if !interior || !is_straight(&polyline[i - 1], &polyline[i], &polyline[i + 1]) {
                out.push(polyline[i]);
            }
        }
        out
    }
}

fn is_straight(prev: &Point2D, at: &Point2D, next: &Point2D) -> bool {
    let (ax, ay) = (at.x - prev.x, at.y - prev.y);
    let (bx, by) = (next.x - at.x, next.y - at.y);
    let la = ax.hypot(ay);
    let lb = bx.hypot(by);
    if la == 0.0 || lb == 0.0 {
        return false;
    }
    let cross = ax * by - ay * bx;
    let dot = ax * bx + ay * by;
    dot > 0.0 && cross.abs() <= COLLINEAR_EPSILON * la * lb
}
