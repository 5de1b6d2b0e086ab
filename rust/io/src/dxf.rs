// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Minimal AutoCAD R12 ASCII DXF writer for section contours

use scan_lite_core::SectionSegment;

/// Layer holding the contour lines
pub const SECTION_LAYER: &str = "SECTION";
/// ACI color 7 (white/black depending on background)
const SECTION_COLOR: i32 = 7;

/// DXF text is a sequence of (group code, value) line pairs
struct DxfWriter {
    out: String,
}

impl DxfWriter {
    fn new() -> Self {
        Self { out: String::new() }
    }

    fn pair(&mut self, code: i32, value: impl std::fmt::Display) -> &mut Self {
        self.out.push_str(&format!("{:>3}\n{}\n", code, value));
        self
    }

    fn coord(&mut self, code: i32, value: f64) -> &mut Self {
        self.pair(code, format!("{:.6}", value))
    }
}

/// Render segments as `LINE` entities on the `SECTION` layer
pub fn render_dxf(segments: &[SectionSegment]) -> String {
    let mut w = DxfWriter::new();

    w.pair(0, "SECTION").pair(2, "HEADER");
    w.pair(9, "$ACADVER").pair(1, "AC1009");
    w.pair(0, "ENDSEC");

    w.pair(0, "SECTION").pair(2, "TABLES");
    w.pair(0, "TABLE").pair(2, "LAYER").pair(70, 1);
    w.pair(0, "LAYER")
        .pair(2, SECTION_LAYER)
        .pair(70, 0)
        .pair(62, SECTION_COLOR)
        .pair(6, "CONTINUOUS");
    w.pair(0, "ENDTAB");
    w.pair(0, "ENDSEC");

    w.pair(0, "SECTION").pair(2, "ENTITIES");
    for segment in segments {
        w.pair(0, "LINE").pair(8, SECTION_LAYER);
        w.coord(10, segment.start.x).coord(20, segment.start.y).coord(30, 0.0);
        w.coord(11, segment.end.x).coord(21, segment.end.y).coord(31, 0.0);
    }
    w.pair(0, "ENDSEC");
    w.pair(0, "EOF");

    w.out
}
