// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! SVG rendering of section contours

use scan_lite_core::{BoundingBox2D, SectionResult};

const MARGIN: f64 = 20.0;
/// Longest drawing side in SVG user units
const TARGET_SIZE: f64 = 800.0;

/// Render a section as a black-on-white line drawing with Y pointing up.
///
/// Sections without segments render as an empty page.
pub fn render_svg(section: &SectionResult) -> String {
    let bbox = section.bounding_box.unwrap_or(BoundingBox2D {
        min_x: 0.0,
        min_y: 0.0,
        max_x: 1.0,
        max_y: 1.0,
    });
    let mut w = bbox.width();
    let mut h = bbox.height();
    if w < 1e-6 {
        w = 1.0;
    }
    if h < 1e-6 {
        h = 1.0;
    }
    let scale = TARGET_SIZE / w.max(h);
    let svg_w = w * scale + 2.0 * MARGIN;
    let svg_h = h * scale + 2.0 * MARGIN;

    let mut lines = Vec::with_capacity(section.segments.len() + 6);
    lines.push(r#"<?xml version="1.0" encoding="UTF-8"?>"#.to_string());
    lines.push(format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {svg_w:.2} {svg_h:.2}" width="{svg_w:.2}" height="{svg_h:.2}">"#
    ));
    lines.push(r#"  <rect width="100%" height="100%" fill="white"/>"#.to_string());
    lines.push(r#"  <g stroke="black" stroke-width="0.5" fill="none">"#.to_string());

    let x = |v: f64| (v - bbox.min_x) * scale + MARGIN;
    let y = |v: f64| svg_h - ((v - bbox.min_y) * scale + MARGIN);
    for segment in &section.segments {
        lines.push(format!(
            r#"    <line x1="{:.4}" y1="{:.4}" x2="{:.4}" y2="{:.4}"/>"#,
            x(segment.start.x),
            y(segment.start.y),
            x(segment.end.x),
            y(segment.end.y)
        ));
    }

    lines.push("  </g>".to_string());
    lines.push("</svg>".to_string());
    lines.join("\n")
}
