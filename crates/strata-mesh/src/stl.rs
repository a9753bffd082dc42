//! STL (Stereolithography) decoding.
//!
//! Both variants are pure vertex sources: they hand positions, three per
//! triangle in file order, to a sink and never build topology themselves.
//!
//! # Binary Format
//!
//! ```text
//! UINT8[80]    – Header (ignored)
//! UINT32       – Number of triangles (ignored, derived from length)
//! foreach triangle
//!     REAL32[3] – Normal vector (ignored)
//!     REAL32[3] – Vertex 1
//!     REAL32[3] – Vertex 2
//!     REAL32[3] – Vertex 3
//!     UINT16    – Attribute byte count (ignored)
//! end
//! ```
//!
//! # ASCII Format
//!
//! ```text
//! solid name
//!   facet normal ni nj nk
//!     outer loop
//!       vertex v1x v1y v1z
//!       vertex v2x v2y v2z
//!       vertex v3x v3y v3z
//!     endloop
//!   endfacet
//! endsolid name
//! ```

use strata_math::Point3;
use tracing::warn;

use crate::error::{MeshError, Result};

/// Binary STL header size in bytes (80-byte header + triangle count).
pub const BINARY_HEADER_SIZE: usize = 84;

/// Size of one binary triangle record (normal + 3 vertices + attribute).
pub const BINARY_RECORD_SIZE: usize = 50;

const ASCII_MARKERS: [&str; 3] = ["solid", "vertex", "facet normal"];

/// Supported surface encodings, tried in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StlFormat {
    /// Text STL.
    Ascii,
    /// Little-endian binary STL.
    Binary,
}

impl StlFormat {
    /// All formats in detection order.
    pub const ALL: [StlFormat; 2] = [StlFormat::Ascii, StlFormat::Binary];

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            StlFormat::Ascii => "ascii-stl",
            StlFormat::Binary => "binary-stl",
        }
    }

    /// First format that recognizes `content`.
    pub fn detect(content: &[u8]) -> Option<StlFormat> {
        Self::ALL.into_iter().find(|f| f.recognizes(content))
    }

    /// Capability test.
    ///
    /// Text matches when every ASCII marker occurs somewhere in the content.
    /// Binary matches whatever text does not, with no magic-byte check;
    /// content shorter than the header decodes to zero triangles.
    pub fn recognizes(self, content: &[u8]) -> bool {
        match self {
            StlFormat::Ascii => ASCII_MARKERS
                .iter()
                .all(|marker| contains(content, marker.as_bytes())),
            StlFormat::Binary => !StlFormat::Ascii.recognizes(content),
        }
    }

    /// Number of triangles the content declares.
    ///
    /// Text counts `facet normal` occurrences; binary derives it from the
    /// byte length, truncating a partial trailing record.
    pub fn triangle_count(self, content: &[u8]) -> usize {
        match self {
            StlFormat::Ascii => count_occurrences(content, b"facet normal"),
            StlFormat::Binary => {
                content.len().saturating_sub(BINARY_HEADER_SIZE) / BINARY_RECORD_SIZE
            }
        }
    }

    /// Decode `content`, handing each vertex position to `sink` in file order.
    pub fn decode<F>(self, content: &[u8], sink: F) -> Result<()>
    where
        F: FnMut(Point3) -> Result<()>,
    {
        match self {
            StlFormat::Ascii => decode_ascii(content, sink),
            StlFormat::Binary => decode_binary(content, sink),
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn count_occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

/// Every line holding a `vertex` token yields one point from its last
/// three whitespace-separated fields.
fn decode_ascii<F>(content: &[u8], mut sink: F) -> Result<()>
where
    F: FnMut(Point3) -> Result<()>,
{
    let text = String::from_utf8_lossy(content);
    for (line_no, line) in text.lines().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if !tokens.contains(&"vertex") {
            continue;
        }
        if tokens.len() < 4 {
            return Err(MeshError::Parse {
                line: line_no + 1,
                message: format!("expected three coordinates, found {:?}", line.trim()),
            });
        }

        let mut xyz = [0.0f64; 3];
        for (slot, token) in tokens[tokens.len() - 3..].iter().enumerate() {
            xyz[slot] = token.parse::<f64>().map_err(|e| MeshError::Parse {
                line: line_no + 1,
                message: format!("invalid coordinate {token:?}: {e}"),
            })?;
        }
        sink(Point3::new(xyz[0], xyz[1], xyz[2]))?;
    }
    Ok(())
}

fn decode_binary<F>(content: &[u8], mut sink: F) -> Result<()>
where
    F: FnMut(Point3) -> Result<()>,
{
    let count = StlFormat::Binary.triangle_count(content);
    if content.len() < BINARY_HEADER_SIZE {
        warn!(bytes = content.len(), "binary STL shorter than its header, no triangles");
        return Ok(());
    }
    let trailing = content
        .len()
        .saturating_sub(BINARY_HEADER_SIZE)
        % BINARY_RECORD_SIZE;
    if trailing != 0 {
        warn!(
            bytes = content.len(),
            trailing, "binary STL length is not 84 + 50*N, truncating"
        );
    }

    for record in content[BINARY_HEADER_SIZE..]
        .chunks_exact(BINARY_RECORD_SIZE)
        .take(count)
    {
        // Skip the 12-byte normal.
        for vertex in record[12..48].chunks_exact(12) {
            sink(read_vertex(vertex))?;
        }
    }
    Ok(())
}

/// Read a vertex from 12 bytes (3 little-endian f32s).
fn read_vertex(buf: &[u8]) -> Point3 {
    let x = f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let y = f32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
    let z = f32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
    Point3::new(f64::from(x), f64::from(y), f64::from(z))
}

/// Encode triangles as binary STL. Normals are computed from the winding.
pub fn encode_binary(triangles: &[[Point3; 3]]) -> Vec<u8> {
    let mut data = Vec::with_capacity(BINARY_HEADER_SIZE + triangles.len() * BINARY_RECORD_SIZE);

    let mut header = [b' '; 80];
    header[..16].copy_from_slice(b"strata STL write");
    data.extend_from_slice(&header);
    data.extend_from_slice(&(triangles.len() as u32).to_le_bytes());

    for [v0, v1, v2] in triangles {
        let n = (v1 - v0).cross(&(v2 - v0));
        let len = n.norm();
        let n = if len > 1e-12 { n / len } else { n };
        for c in [n.x, n.y, n.z] {
            data.extend_from_slice(&(c as f32).to_le_bytes());
        }
        for v in [v0, v1, v2] {
            for c in [v.x, v.y, v.z] {
                data.extend_from_slice(&(c as f32).to_le_bytes());
            }
        }
        data.extend_from_slice(&0u16.to_le_bytes());
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_FACET: &str = "solid tri
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1.5 0 0
      vertex 0 2.5 -1e-1
    endloop
  endfacet
endsolid tri
";

    fn collect(format: StlFormat, content: &[u8]) -> Result<Vec<Point3>> {
        let mut out = Vec::new();
        format.decode(content, |p| {
            out.push(p);
            Ok(())
        })?;
        Ok(out)
    }

    #[test]
    fn test_detect_ascii() {
        assert_eq!(StlFormat::detect(ONE_FACET.as_bytes()), Some(StlFormat::Ascii));
        assert!(!StlFormat::Binary.recognizes(ONE_FACET.as_bytes()));
        assert_eq!(StlFormat::Ascii.triangle_count(ONE_FACET.as_bytes()), 1);
    }

    #[test]
    fn test_ascii_missing_marker_is_not_ascii() {
        let content = ONE_FACET.replace("facet normal", "facet");
        assert!(!StlFormat::Ascii.recognizes(content.as_bytes()));
        assert_eq!(StlFormat::detect(content.as_bytes()), Some(StlFormat::Binary));
    }

    #[test]
    fn test_short_content_is_empty_binary() {
        assert_eq!(StlFormat::detect(b""), Some(StlFormat::Binary));
        assert_eq!(StlFormat::detect(&[1u8; 60]), Some(StlFormat::Binary));
        assert_eq!(StlFormat::Binary.triangle_count(&[1u8; 60]), 0);
        assert!(collect(StlFormat::Binary, &[1u8; 60]).unwrap().is_empty());
        assert!(collect(StlFormat::Binary, b"").unwrap().is_empty());
    }

    #[test]
    fn test_decode_ascii_points() {
        let pts = collect(StlFormat::Ascii, ONE_FACET.as_bytes()).unwrap();
        assert_eq!(pts.len(), 3);
        assert_eq!(pts[1], Point3::new(1.5, 0.0, 0.0));
        assert_eq!(pts[2], Point3::new(0.0, 2.5, -0.1));
    }

    #[test]
    fn test_vertex_inside_name_is_not_a_vertex_line() {
        let content = ONE_FACET.replace("solid tri", "solid vertex_model");
        let pts = collect(StlFormat::Ascii, content.as_bytes()).unwrap();
        assert_eq!(pts.len(), 3);
    }

    #[test]
    fn test_decode_ascii_parse_error() {
        let content = ONE_FACET.replace("vertex 1.5 0 0", "vertex 1.5 zero 0");
        let err = collect(StlFormat::Ascii, content.as_bytes()).unwrap_err();
        assert!(matches!(err, MeshError::Parse { line: 5, .. }));
    }

    #[test]
    fn test_binary_roundtrip_points() {
        let tris = [
            [
                Point3::new(0.1, 0.2, 0.3),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            [
                Point3::new(5.0, 5.0, 5.0),
                Point3::new(6.0, 5.0, 5.0),
                Point3::new(5.0, 6.0, 7.25),
            ],
        ];
        let bytes = encode_binary(&tris);
        assert_eq!(bytes.len(), 84 + 2 * 50);
        assert_eq!(StlFormat::detect(&bytes), Some(StlFormat::Binary));
        assert_eq!(StlFormat::Binary.triangle_count(&bytes), 2);

        let pts = collect(StlFormat::Binary, &bytes).unwrap();
        assert_eq!(pts.len(), 6);
        for (got, want) in pts.iter().zip(tris.iter().flatten()) {
            assert_eq!(got.x, f64::from(want.x as f32));
            assert_eq!(got.y, f64::from(want.y as f32));
            assert_eq!(got.z, f64::from(want.z as f32));
        }
    }

    #[test]
    fn test_binary_truncates_partial_record() {
        let tris = [[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]];
        let mut bytes = encode_binary(&tris);
        bytes.extend_from_slice(&[0u8; 30]);
        assert_eq!(StlFormat::Binary.triangle_count(&bytes), 1);
        assert_eq!(collect(StlFormat::Binary, &bytes).unwrap().len(), 3);
    }

    #[test]
    fn test_sink_error_stops_decoding() {
        let mut seen = 0;
        let result = StlFormat::Ascii.decode(ONE_FACET.as_bytes(), |_| {
            seen += 1;
            Err(MeshError::Cancelled)
        });
        assert!(matches!(result, Err(MeshError::Cancelled)));
        assert_eq!(seen, 1);
    }
}
