// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stanford PLY reader and ASCII writer on top of `ply-rs`.
//!
//! All three encodings are read (`ascii`, `binary_little_endian`,
//! `binary_big_endian`). The `vertex` element supplies x/y/z, optional
//! nx/ny/nz and red/green/blue; the `face` element's index lists are
//! fan-triangulated. Other elements are ignored.

use crate::error::{IoError, Result};
use nalgebra::{Point3, Vector3};
use ply_rs::parser::Parser;
use ply_rs::ply::{
    Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType, ScalarType,
};
use ply_rs::writer::Writer;
use scan_lite_core::{Mesh, PointCloud};
use std::io::Write;

/// Decoded PLY content
#[derive(Debug, Clone, Default)]
pub struct PlyData {
    pub cloud: PointCloud,
    /// Present when the file has a non-empty `face` element
    pub mesh: Option<Mesh>,
}

/// Numeric value of a scalar property, and whether it is an integer type
fn scalar(property: &Property) -> Option<(f64, bool)> {
    Some(match *property {
        Property::Char(v) => (v as f64, true),
        Property::UChar(v) => (v as f64, true),
        Property::Short(v) => (v as f64, true),
        Property::UShort(v) => (v as f64, true),
        Property::Int(v) => (v as f64, true),
        Property::UInt(v) => (v as f64, true),
        Property::Float(v) => (v as f64, false),
        Property::Double(v) => (v, false),
        _ => return None,
    })
}

fn get(element: &DefaultElement, names: &[&str]) -> Option<(f64, bool)> {
    names.iter().find_map(|name| element.get(*name)).and_then(scalar)
}

/// Face index list; negative entries are rejected
fn index_list(property: &Property, face: usize) -> Result<Vec<u32>> {
    fn convert<T: Copy + TryInto<u32>>(values: &[T], face: usize) -> Result<Vec<u32>> {
        values
            .iter()
            .map(|&v| {
                v.try_into()
                    .map_err(|_| IoError::parse(0, format!("face {} has a negative vertex index", face)))
            })
            .collect()
    }
    match property {
        Property::ListChar(v) => convert(v, face),
        Property::ListUChar(v) => convert(v, face),
        Property::ListShort(v) => convert(v, face),
        Property::ListUShort(v) => convert(v, face),
        Property::ListInt(v) => convert(v, face),
        Property::ListUInt(v) => Ok(v.clone()),
        _ => Err(IoError::parse(0, format!("face {} has a non-integer index list", face))),
    }
}

/// Decode a PLY file into a point cloud and, when it has faces, a mesh
pub fn read_ply(bytes: &[u8]) -> Result<PlyData> {
    if !bytes.starts_with(b"ply") {
        return Err(IoError::parse(1, "missing 'ply' magic"));
    }
    let mut reader = bytes;
    let ply = Parser::<DefaultElement>::new()
        .read_ply(&mut reader)
        .map_err(|e| IoError::parse(0, format!("invalid PLY: {}", e)))?;

    let mut data = PlyData::default();
    let vertices = ply.payload.get("vertex").map(Vec::as_slice).unwrap_or_default();

    let mut normals = Vec::new();
    let mut colors = Vec::new();
    data.cloud.positions.reserve(vertices.len());
    for (i, vertex) in vertices.iter().enumerate() {
        let (Some((x, _)), Some((y, _)), Some((z, _))) =
            (get(vertex, &["x"]), get(vertex, &["y"]), get(vertex, &["z"]))
        else {
            return Err(IoError::parse(0, format!("vertex {} lacks x/y/z", i)));
        };
        data.cloud.positions.push(Point3::new(x, y, z));

        if let (Some((nx, _)), Some((ny, _)), Some((nz, _))) =
            (get(vertex, &["nx"]), get(vertex, &["ny"]), get(vertex, &["nz"]))
        {
            normals.push(Vector3::new(nx, ny, nz));
        }
        if let (Some((r, integer)), Some((g, _)), Some((b, _))) = (
            get(vertex, &["red", "r"]),
            get(vertex, &["green", "g"]),
            get(vertex, &["blue", "b"]),
        ) {
            let scale = if integer { 255.0 } else { 1.0 };
            colors.push([(r / scale) as f32, (g / scale) as f32, (b / scale) as f32]);
        }
    }

    // Attributes only count when every vertex carries them
    if !normals.is_empty() && normals.len() == vertices.len() {
        data.cloud.normals = Some(normals);
    }
    if !colors.is_empty() && colors.len() == vertices.len() {
        data.cloud.colors = Some(colors);
    }

    let faces = ply.payload.get("face").map(Vec::as_slice).unwrap_or_default();
    if !faces.is_empty() {
        let mut mesh = Mesh::with_capacity(data.cloud.len(), faces.len());
        for p in &data.cloud.positions {
            mesh.add_vertex(*p);
        }
        for (f, face) in faces.iter().enumerate() {
            let list = ["vertex_indices", "vertex_index"]
                .iter()
                .find_map(|name| face.get(*name))
                .ok_or_else(|| IoError::parse(0, "face element lacks vertex_indices"))?;
            let indices = index_list(list, f)?;
            for k in 1..indices.len().saturating_sub(1) {
                mesh.add_triangle(indices[0], indices[k], indices[k + 1]);
            }
        }
        data.mesh = Some(mesh);
    }

    Ok(data)
}

fn double(name: &str) -> PropertyDef {
    PropertyDef::new(name.to_string(), PropertyType::Scalar(ScalarType::Double))
}

fn uchar(name: &str) -> PropertyDef {
    PropertyDef::new(name.to_string(), PropertyType::Scalar(ScalarType::UChar))
}

/// Write an ASCII PLY point cloud
pub fn write_ply<W: Write>(cloud: &PointCloud, mut out: W) -> Result<()> {
    let mut ply = Ply::<DefaultElement>::new();
    ply.header.encoding = Encoding::Ascii;

    let mut vertex = ElementDef::new("vertex".to_string());
    for axis in ["x", "y", "z"] {
        vertex.properties.add(double(axis));
    }
    if cloud.has_normals() {
        for axis in ["nx", "ny", "nz"] {
            vertex.properties.add(double(axis));
        }
    }
    if cloud.has_colors() {
        for channel in ["red", "green", "blue"] {
            vertex.properties.add(uchar(channel));
        }
    }
    vertex.count = cloud.len();
    ply.header.elements.add(vertex);

    let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    let mut rows = Vec::with_capacity(cloud.len());
    for (i, p) in cloud.positions.iter().enumerate() {
        let mut row = DefaultElement::new();
        row.insert("x".to_string(), Property::Double(p.x));
        row.insert("y".to_string(), Property::Double(p.y));
        row.insert("z".to_string(), Property::Double(p.z));
        if let Some(n) = cloud.normal(i) {
            row.insert("nx".to_string(), Property::Double(n.x));
            row.insert("ny".to_string(), Property::Double(n.y));
            row.insert("nz".to_string(), Property::Double(n.z));
        }
        if let Some(c) = cloud.colors.as_ref().and_then(|c| c.get(i)) {
            row.insert("red".to_string(), Property::UChar(byte(c[0])));
            row.insert("green".to_string(), Property::UChar(byte(c[1])));
            row.insert("blue".to_string(), Property::UChar(byte(c[2])));
        }
        rows.push(row);
    }
    ply.payload.insert("vertex".to_string(), rows);

    Writer::new().write_ply(&mut out, &mut ply)?;
    Ok(())
}
