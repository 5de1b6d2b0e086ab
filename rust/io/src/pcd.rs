// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Point Cloud Library `.pcd` reader (`DATA ascii` and `DATA binary`).
//!
//! Reads `x y z`, optional `normal_x normal_y normal_z` and a packed `rgb`
//! or `rgba` field. Points with a non-finite coordinate (the padding of
//! organized clouds) are dropped.

use crate::error::{IoError, Result};
use crate::text::{is_skippable, lines, parse_numbers, tokens};
use nalgebra::{Point3, Vector3};
use scan_lite_core::PointCloud;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar {
    I8,
    I16,
    I32,
    U8,
    U16,
    U32,
    F32,
    F64,
}

impl Scalar {
    fn resolve(kind: u8, size: usize) -> Option<Self> {
        Some(match (kind, size) {
            (b'I', 1) => Scalar::I8,
            (b'I', 2) => Scalar::I16,
            (b'I', 4) => Scalar::I32,
            (b'U', 1) => Scalar::U8,
            (b'U', 2) => Scalar::U16,
            (b'U', 4) => Scalar::U32,
            (b'F', 4) => Scalar::F32,
            (b'F', 8) => Scalar::F64,
            _ => return None,
        })
    }

    fn size(self) -> usize {
        match self {
            Scalar::I8 | Scalar::U8 => 1,
            Scalar::I16 | Scalar::U16 => 2,
            Scalar::I32 | Scalar::U32 | Scalar::F32 => 4,
            Scalar::F64 => 8,
        }
    }

    /// Little-endian value of `raw`, which holds exactly `size()` bytes
    fn decode(self, raw: &[u8]) -> f64 {
        let mut buf = [0u8; 8];
        buf[..raw.len()].copy_from_slice(raw);
        let [b0, b1, b2, b3, ..] = buf;
        match self {
            Scalar::I8 => b0 as i8 as f64,
            Scalar::I16 => i16::from_le_bytes([b0, b1]) as f64,
            Scalar::I32 => i32::from_le_bytes([b0, b1, b2, b3]) as f64,
            Scalar::U8 => b0 as f64,
            Scalar::U16 => u16::from_le_bytes([b0, b1]) as f64,
            Scalar::U32 => u32::from_le_bytes([b0, b1, b2, b3]) as f64,
            Scalar::F32 => f32::from_le_bytes([b0, b1, b2, b3]) as f64,
            Scalar::F64 => f64::from_le_bytes(buf),
        }
    }
}

#[derive(Debug, Clone)]
struct Field {
    name: String,
    scalar: Scalar,
    count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Data {
    Ascii,
    Binary,
}

#[derive(Debug)]
struct Header {
    fields: Vec<Field>,
    points: usize,
    data: Data,
    body_start: usize,
    body_line: usize,
}

impl Header {
    /// Column of a field's first value and its scalar type
    fn column(&self, name: &str) -> Option<(usize, Scalar)> {
        let mut offset = 0;
        for field in &self.fields {
            if field.name == name {
                return Some((offset, field.scalar));
            }
            offset += field.count;
        }
        None
    }

    fn width(&self) -> usize {
        self.fields.iter().map(|f| f.count).sum()
    }

    fn stride(&self) -> usize {
        self.fields.iter().map(|f| f.scalar.size() * f.count).sum()
    }
}

fn parse_usize(word: &[u8], line: usize, what: &str) -> Result<usize> {
    std::str::from_utf8(word)
        .ok()
        .and_then(|w| w.parse().ok())
        .ok_or_else(|| IoError::parse(line, format!("invalid {}", what)))
}

fn parse_header(bytes: &[u8]) -> Result<Header> {
    let mut names: Vec<String> = Vec::new();
    let mut sizes: Vec<usize> = Vec::new();
    let mut kinds: Vec<u8> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    let (mut width, mut height, mut points) = (None, 1usize, None);
    let mut offset = 0usize;

    for (number, line) in lines(bytes) {
        // Byte offset just past this line
        let consumed = memchr::memchr(b'\n', &bytes[offset..]).map_or(bytes.len(), |i| offset + i + 1);
        offset = consumed;
        if is_skippable(line) {
            continue;
        }
        let mut words = tokens(line);
        let Some(key) = words.next() else { continue };
        let rest: Vec<&[u8]> = words.collect();
        match key {
            b"FIELDS" => names = rest.iter().map(|w| String::from_utf8_lossy(w).into_owned()).collect(),
            b"SIZE" => {
                sizes = rest
                    .iter()
                    .map(|w| parse_usize(w, number, "SIZE"))
                    .collect::<Result<_>>()?
            }
            b"TYPE" => kinds = rest.iter().map(|w| w.first().copied().unwrap_or(b'?')).collect(),
            b"COUNT" => {
                counts = rest
                    .iter()
                    .map(|w| parse_usize(w, number, "COUNT"))
                    .collect::<Result<_>>()?
            }
            b"WIDTH" => width = Some(parse_usize(rest.first().copied().unwrap_or_default(), number, "WIDTH")?),
            b"HEIGHT" => height = parse_usize(rest.first().copied().unwrap_or_default(), number, "HEIGHT")?,
            b"POINTS" => points = Some(parse_usize(rest.first().copied().unwrap_or_default(), number, "POINTS")?),
            b"DATA" => {
                let data = match rest.first().copied() {
                    Some(b"ascii") => Data::Ascii,
                    Some(b"binary") => Data::Binary,
                    Some(other) => {
                        return Err(IoError::UnsupportedFormat(format!(
                            "PCD data {}",
                            String::from_utf8_lossy(other)
                        )))
                    }
                    None => return Err(IoError::parse(number, "DATA without encoding")),
                };
                if names.is_empty() {
                    return Err(IoError::parse(number, "missing FIELDS"));
                }
                let n = names.len();
                for (list, key) in [(sizes.len(), "SIZE"), (kinds.len(), "TYPE"), (counts.len(), "COUNT")] {
                    if list != 0 && list != n {
                        return Err(IoError::parse(number, format!("{} does not match FIELDS", key)));
                    }
                }
                let fields = names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| {
                        let size = sizes.get(i).copied().unwrap_or(4);
                        let kind = kinds.get(i).copied().unwrap_or(b'F');
                        let scalar = Scalar::resolve(kind, size).ok_or_else(|| {
                            IoError::UnsupportedFormat(format!("PCD field {} of type {}{}", name, kind as char, size))
                        })?;
                        Ok(Field {
                            name: name.clone(),
                            scalar,
                            count: counts.get(i).copied().unwrap_or(1),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                let points = points
                    .or_else(|| width.map(|w| w * height))
                    .ok_or_else(|| IoError::parse(number, "missing POINTS"))?;
                return Ok(Header {
                    fields,
                    points,
                    data,
                    body_start: consumed.min(bytes.len()),
                    body_line: number + 1,
                });
            }
            _ => {}
        }
    }
    Err(IoError::parse(0, "missing DATA line"))
}

/// RGB from a PCL packed color (`0x00RRGGBB` stored in a float or integer field)
fn unpack_rgb(value: f64, scalar: Scalar) -> [f32; 3] {
    let bits = match scalar {
        Scalar::F32 | Scalar::F64 => (value as f32).to_bits(),
        _ => value as u32,
    };
    let channel = |shift: u32| ((bits >> shift) & 0xff) as f32 / 255.0;
    [channel(16), channel(8), channel(0)]
}

/// Decode a `.pcd` file
pub fn read_pcd(bytes: &[u8]) -> Result<PointCloud> {
    let header = parse_header(bytes)?;
    let axes = [header.column("x"), header.column("y"), header.column("z")];
    let [Some((ix, _)), Some((iy, _)), Some((iz, _))] = axes else {
        return Err(IoError::parse(0, "PCD file lacks x/y/z fields"));
    };
    let normal = match [
        header.column("normal_x"),
        header.column("normal_y"),
        header.column("normal_z"),
    ] {
        [Some((nx, _)), Some((ny, _)), Some((nz, _))] => Some([nx, ny, nz]),
        _ => None,
    };
    let rgb = header.column("rgb").or_else(|| header.column("rgba"));

    let mut positions = Vec::with_capacity(header.points);
    let mut normals = Vec::new();
    let mut colors = Vec::new();
    let mut push = |row: &[f64]| {
        let p = Point3::new(row[ix], row[iy], row[iz]);
        if !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
            return;
        }
        positions.push(p);
        if let Some([nx, ny, nz]) = normal {
            normals.push(Vector3::new(row[nx], row[ny], row[nz]));
        }
        if let Some((c, scalar)) = rgb {
            colors.push(unpack_rgb(row[c], scalar));
        }
    };

    let width = header.width();
    let body = &bytes[header.body_start..];
    match header.data {
        Data::Ascii => {
            let offset = header.body_line - 1;
            let mut rows = lines(body).map(|(n, l)| (n + offset, l)).filter(|(_, l)| !is_skippable(l));
            let mut row = Vec::with_capacity(width);
            for _ in 0..header.points {
                let (number, line) = rows
                    .next()
                    .ok_or_else(|| IoError::parse(0, format!("expected {} points", header.points)))?;
                parse_numbers(line, &mut row).ok_or_else(|| IoError::parse(number, "invalid number"))?;
                if row.len() < width {
                    return Err(IoError::parse(
                        number,
                        format!("expected {} values, found {}", width, row.len()),
                    ));
                }
                push(&row);
            }
        }
        Data::Binary => {
            let stride = header.stride();
            if stride == 0 || body.len() < stride * header.points {
                return Err(IoError::parse(0, "binary body shorter than POINTS records"));
            }
            let mut row = Vec::with_capacity(width);
            for record in body.chunks_exact(stride).take(header.points) {
                row.clear();
                let mut at = 0;
                for field in &header.fields {
                    let size = field.scalar.size();
                    for _ in 0..field.count {
                        row.push(field.scalar.decode(&record[at..at + size]));
                        at += size;
                    }
                }
                push(&row);
            }
        }
    }

    let mut cloud = PointCloud::from_positions(positions);
    if normal.is_some() {
        cloud.normals = Some(normals);
    }
    if rgb.is_some() {
        cloud.colors = Some(colors);
    }
    Ok(cloud)
}
