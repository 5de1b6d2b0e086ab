// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STL reader (binary and ASCII). Facets are unwelded: every triangle gets
//! its own three vertices.

use crate::error::{IoError, Result};
use crate::text::{lines, tokens};
use nalgebra::Point3;
use scan_lite_core::Mesh;

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// Binary files are recognised by their size matching the facet count
fn is_binary(bytes: &[u8]) -> bool {
    if bytes.len() < HEADER_LEN + 4 {
        return false;
    }
    let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]) as usize;
    bytes.len() == HEADER_LEN + 4 + count * FACET_LEN
}

fn read_binary(bytes: &[u8]) -> Mesh {
    let count = (bytes.len() - HEADER_LEN - 4) / FACET_LEN;
    let mut mesh = Mesh::with_capacity(count * 3, count);
    let f32_at = |at: usize| f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]) as f64;

    for facet in 0..count {
        // Skip the 12-byte facet normal
        let base = HEADER_LEN + 4 + facet * FACET_LEN + 12;
        let mut corner = [0u32; 3];
        for (k, slot) in corner.iter_mut().enumerate() {
            let at = base + k * 12;
            *slot = mesh.add_vertex(Point3::new(f32_at(at), f32_at(at + 4), f32_at(at + 8)));
        }
        mesh.add_triangle(corner[0], corner[1], corner[2]);
    }
    mesh
}

fn read_ascii(bytes: &[u8]) -> Result<Mesh> {
    let mut mesh = Mesh::new();
    let mut pending = 0usize;

    for (number, line) in lines(bytes) {
        let mut words = tokens(line);
        match words.next() {
            Some(b"vertex") => {
                let mut coord = [0.0f64; 3];
                for slot in coord.iter_mut() {
                    *slot = words
                        .next()
                        .and_then(|w| fast_float::parse::<f64, _>(w).ok())
                        .ok_or_else(|| IoError::parse(number, "invalid vertex"))?;
                }
                mesh.add_vertex(Point3::new(coord[0], coord[1], coord[2]));
                pending += 1;
            }
            Some(b"endloop") => {
                if pending < 3 {
                    return Err(IoError::parse(number, "facet with fewer than 3 vertices"));
                }
                let first = (mesh.vertex_count() - pending) as u32;
                for k in 1..pending as u32 - 1 {
                    mesh.add_triangle(first, first + k, first + k + 1);
                }
                pending = 0;
            }
            _ => {}
        }
    }
    Ok(mesh)
}

/// Parse an STL file, detecting the encoding
pub fn read_stl(bytes: &[u8]) -> Result<Mesh> {
    if is_binary(bytes) {
        Ok(read_binary(bytes))
    } else {
        read_ascii(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_facet() {
        let text = "solid t\nfacet normal 0 0 1\nouter loop\nvertex 0 0 0\nvertex 1 0 0\nvertex 0 1 0\nendloop\nendfacet\nendsolid t\n";
        let mesh = read_stl(text.as_bytes()).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.vertex(1), Some(Point3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_binary_facet() {
        let mut bytes = vec![0u8; HEADER_LEN];
        bytes.extend_from_slice(&1u32.to_le_bytes());
        for v in [0.0f32, 0.0, 1.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 2.0, 0.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.extend_from_slice(&[0, 0]);
        let mesh = read_stl(&bytes).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.vertex(2), Some(Point3::new(0.0, 2.0, 0.0)));
    }
}
