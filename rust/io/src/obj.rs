// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wavefront OBJ geometry reader
//!
//! Only `v` and `f` records matter for sectioning; texture coordinates,
//! normals, groups and materials are ignored.

use crate::error::{IoError, Result};
use crate::text::{is_skippable, lines, parse_numbers, tokens};
use nalgebra::Point3;
use scan_lite_core::Mesh;

/// Resolve one `f` corner (`7`, `7/1`, `7//3`, `-1`) to a zero-based index
fn corner_index(token: &[u8], vertex_count: usize, line: usize) -> Result<u32> {
    let head = token.split(|&b| b == b'/').next().unwrap_or(token);
    let raw = std::str::from_utf8(head)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| IoError::parse(line, "invalid face index"))?;

    let resolved = match raw {
        0 => None,
        r if r > 0 => Some(r - 1),
        r => Some(vertex_count as i64 + r),
    };
    match resolved {
        Some(i) if i >= 0 && (i as usize) < vertex_count => Ok(i as u32),
        _ => Err(IoError::parse(line, format!("face index {} out of range", raw))),
    }
}

/// Parse OBJ text into a single triangle mesh; polygons are fan-triangulated
pub fn read_obj(bytes: &[u8]) -> Result<Mesh> {
    let mut mesh = Mesh::new();
    let mut coords = Vec::with_capacity(4);
    let mut corners: Vec<u32> = Vec::with_capacity(4);

    for (number, line) in lines(bytes) {
        if is_skippable(line) {
            continue;
        }
        let mut words = tokens(line);
        match words.next() {
            Some(b"v") => {
                let rest = &line[line.iter().position(|&b| b == b'v').map_or(0, |i| i + 1)..];
                parse_numbers(rest, &mut coords).ok_or_else(|| IoError::parse(number, "invalid vertex"))?;
                if coords.len() < 3 {
                    return Err(IoError::parse(number, "vertex needs 3 coordinates"));
                }
                mesh.add_vertex(Point3::new(coords[0], coords[1], coords[2]));
            }
            Some(b"f") => {
                corners.clear();
                let vertex_count = mesh.vertex_count();
                for token in words {
                    corners.push(corner_index(token, vertex_count, number)?);
                }
                if corners.len() < 3 {
                    return Err(IoError::parse(number, "face needs 3 vertices"));
                }
                for k in 1..corners.len() - 1 {
                    mesh.add_triangle(corners[0], corners[k], corners[k + 1]);
                }
            }
            _ => {}
        }
    }

    Ok(mesh)
}
