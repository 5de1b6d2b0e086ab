// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures

use crate::cloud::Bounds3;
use crate::error::{Error, Result};
use nalgebra::Point3;

/// Triangle definition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub v0: Point3<f64>,
    pub v1: Point3<f64>,
    pub v2: Point3<f64>,
}

impl Triangle {
    /// Create a new triangle
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    #[inline]
    pub fn vertices(&self) -> [Point3<f64>; 3] {
        [self.v0, self.v1, self.v2]
    }
}

/// Triangle mesh: a shared vertex array plus three indices per triangle
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Vertex positions (x, y, z)
    pub positions: Vec<f64>,
    /// Triangle indices (i0, i1, i2)
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh with capacity
    pub fn with_capacity(vertex_count: usize, triangle_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count * 3),
            indices: Vec::with_capacity(triangle_count * 3),
        }
    }

    /// Add a vertex, returning its index
    #[inline]
    pub fn add_vertex(&mut self, position: Point3<f64>) -> u32 {
        let index = self.vertex_count() as u32;
        self.positions.push(position.x);
        self.positions.push(position.y);
        self.positions.push(position.z);
        index
    }

    /// Add a triangle
    #[inline]
    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.indices.push(i0);
        self.indices.push(i1);
        self.indices.push(i2);
    }

    /// Merge another mesh into this one
    pub fn merge(&mut self, other: &Mesh) {
        if other.is_empty() {
            return;
        }

        let vertex_offset = self.vertex_count() as u32;

        self.positions.extend_from_slice(&other.positions);
        self.indices
            .extend(other.indices.iter().map(|&i| i + vertex_offset));
    }

    /// Get vertex count
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Get triangle count
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if mesh is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }

    /// Vertex position by index
    #[inline]
    pub fn vertex(&self, index: usize) -> Option<Point3<f64>> {
        let base = index * 3;
        let chunk = self.positions.get(base..base + 3)?;
        Some(Point3::new(chunk[0], chunk[1], chunk[2]))
    }

    /// Triangle by index, `None` if any of its vertex indices is out of range
    pub fn triangle(&self, index: usize) -> Option<Triangle> {
        let base = index * 3;
        let tri = self.indices.get(base..base + 3)?;
        Some(Triangle::new(
            self.vertex(tri[0] as usize)?,
            self.vertex(tri[1] as usize)?,
            self.vertex(tri[2] as usize)?,
        ))
    }

    /// Iterate over all well-formed triangles
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        (0..self.triangle_count()).filter_map(move |i| self.triangle(i))
    }

    /// Check buffer shapes and index ranges
    pub fn validate(&self) -> Result<()> {
        if self.positions.len() % 3 != 0 {
            return Err(Error::InvalidMesh(format!(
                "position buffer length {} is not a multiple of 3",
                self.positions.len()
            )));
        }
        if self.indices.len() % 3 != 0 {
            return Err(Error::InvalidMesh(format!(
                "index buffer length {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        let vertex_count = self.vertex_count();
        if let Some(&bad) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(Error::InvalidMesh(format!(
                "triangle index {} out of range for {} vertices",
                bad, vertex_count
            )));
        }
        if self.positions.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidMesh("non-finite vertex coordinate".into()));
        }
        Ok(())
    }

    /// Calculate bounds over all vertices
    pub fn bounds(&self) -> Option<Bounds3> {
        let points: Vec<Point3<f64>> = (0..self.vertex_count())
            .filter_map(|i| self.vertex(i))
            .collect();
        Bounds3::from_points(&points)
    }

    /// Closed box mesh from min/max corners: 8 vertices, 12 triangles,
    /// counter-clockwise winding seen from outside
    pub fn cuboid(min: Point3<f64>, max: Point3<f64>) -> Self {
        let mut mesh = Mesh::with_capacity(8, 12);

        let v0 = mesh.add_vertex(Point3::new(min.x, min.y, min.z));
        let v1 = mesh.add_vertex(Point3::new(max.x, min.y, min.z));
        let v2 = mesh.add_vertex(Point3::new(max.x, max.y, min.z));
        let v3 = mesh.add_vertex(Point3::new(min.x, max.y, min.z));
        let v4 = mesh.add_vertex(Point3::new(min.x, min.y, max.z));
        let v5 = mesh.add_vertex(Point3::new(max.x, min.y, max.z));
        let v6 = mesh.add_vertex(Point3::new(max.x, max.y, max.z));
        let v7 = mesh.add_vertex(Point3::new(min.x, max.y, max.z));

        // Bottom (-Z)
        mesh.add_triangle(v0, v2, v1);
        mesh.add_triangle(v0, v3, v2);
        // Top (+Z)
        mesh.add_triangle(v4, v5, v6);
        mesh.add_triangle(v4, v6, v7);
        // -X
        mesh.add_triangle(v0, v4, v7);
        mesh.add_triangle(v0, v7, v3);
        // +X
        mesh.add_triangle(v1, v2, v6);
        mesh.add_triangle(v1, v6, v5);
        // -Y
        mesh.add_triangle(v0, v1, v5);
        mesh.add_triangle(v0, v5, v4);
        // +Y
        mesh.add_triangle(v3, v7, v6);
        mesh.add_triangle(v3, v6, v2);

        mesh
    }
}
