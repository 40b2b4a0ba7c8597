/// STL loading for the scanned object (binary and ASCII)
use std::fs;
use std::path::Path;

use nom::{
    bytes::complete::tag,
    character::complete::{multispace0, multispace1, not_line_ending},
    multi::many0,
    number::complete::float,
    sequence::preceded,
    IResult,
};
use tracing::{debug, info};

use crate::error::StlError;
use crate::geometry::{Mesh, Triangle, Vertex};

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

fn read_vec3(bytes: &[u8]) -> [f32; 3] {
    let component = |i: usize| {
        f32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]])
    };
    [component(0), component(4), component(8)]
}

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Mesh, StlError> {
    if data.len() < HEADER_LEN + 4 {
        return Err(StlError::TooSmall(data.len()));
    }

    let body = &data[HEADER_LEN..];
    let expected = u32::from_le_bytes([body[0], body[1], body[2], body[3]]) as usize;
    let facets = &body[4..];

    let mut mesh = Mesh::with_capacity(expected.min(facets.len() / FACET_LEN));
    for index in 0..expected {
        let start = index * FACET_LEN;
        let Some(facet) = facets.get(start..start + FACET_LEN) else {
            return Err(StlError::Truncated {
                parsed: index,
                expected,
            });
        };

        // normal, three vertices, then a 2-byte attribute count
        let [nx, ny, nz] = read_vec3(&facet[0..12]);
        let vertex = |offset: usize| {
            let [x, y, z] = read_vec3(&facet[offset..offset + 12]);
            Vertex::new(x, y, z, nx, ny, nz)
        };
        mesh.add_triangle(Triangle::new(vertex(12), vertex(24), vertex(36)));
    }

    Ok(mesh)
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<Mesh, StlError> {
    match parse_ascii_stl_impl(input) {
        Ok((_, mesh)) => Ok(mesh),
        Err(e) => Err(StlError::Ascii(format!("{e:?}"))),
    }
}

fn parse_ascii_stl_impl(input: &str) -> IResult<&str, Mesh> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    let (input, _) = not_line_ending(input)?; // Optional name
    let (input, triangles) = many0(parse_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;

    let mut mesh = Mesh::with_capacity(triangles.len());
    for triangle in triangles {
        mesh.add_triangle(triangle);
    }

    Ok((input, mesh))
}

fn parse_facet(input: &str) -> IResult<&str, Triangle> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, normal) = parse_vector3(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, v1) = parse_vertex(input, normal)?;
    let (input, v2) = parse_vertex(input, normal)?;
    let (input, v3) = parse_vertex(input, normal)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;

    Ok((input, Triangle::new(v1, v2, v3)))
}

fn parse_vertex(input: &str, normal: (f32, f32, f32)) -> IResult<&str, Vertex> {
    let (input, _) = preceded(multispace0, tag("vertex"))(input)?;
    let (input, (x, y, z)) = parse_vector3(input)?;
    Ok((input, Vertex::new(x, y, z, normal.0, normal.1, normal.2)))
}

fn parse_vector3(input: &str) -> IResult<&str, (f32, f32, f32)> {
    let (input, _) = multispace0(input)?;
    let (input, x) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, y) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, z) = float(input)?;
    Ok((input, (x, y, z)))
}

/// Detect and parse STL data (binary or ASCII)
pub fn parse_stl(data: &[u8]) -> Result<Mesh, StlError> {
    // Binary files may also start with "solid", so fall back on failure
    if data.starts_with(b"solid") {
        if let Ok(text) = std::str::from_utf8(data) {
            match parse_ascii_stl(text) {
                Ok(mesh) => return Ok(mesh),
                Err(e) => debug!("not ASCII STL, trying binary: {e}"),
            }
        }
    }

    parse_binary_stl(data)
}

/// Read and parse the STL at `path`
pub fn load_stl(path: impl AsRef<Path>) -> Result<Mesh, StlError> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|source| StlError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mesh = parse_stl(&data)?;
    info!(path = %path.display(), triangles = mesh.triangles.len(), "loaded scan object");
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_with_one_facet() -> Vec<u8> {
        let mut data = vec![0u8; HEADER_LEN];
        data.extend_from_slice(&1u32.to_le_bytes());
        for value in [0.0f32, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            data.extend_from_slice(&value.to_le_bytes());
        }
        data.extend_from_slice(&[0, 0]);
        data
    }

    #[test]
    fn test_parse_binary_header() {
        let mut data = vec![0u8; 84];
        data[80..84].copy_from_slice(&0u32.to_le_bytes());

        let mesh = parse_binary_stl(&data).unwrap();
        assert_eq!(mesh.triangles.len(), 0);
    }

    #[test]
    fn test_parse_binary_facet() {
        let mesh = parse_binary_stl(&binary_with_one_facet()).unwrap();
        assert_eq!(mesh.triangles.len(), 1);
        let triangle = &mesh.triangles[0];
        assert_eq!(triangle.vertices[1].position.x, 1.0);
        assert_eq!(triangle.vertices[2].position.y, 1.0);
        assert_eq!(triangle.vertices[0].normal.z, 1.0);
    }

    #[test]
    fn test_binary_too_small() {
        assert!(matches!(parse_binary_stl(&[0u8; 10]), Err(StlError::TooSmall(10))));
    }

    #[test]
    fn test_binary_truncated() {
        let mut data = binary_with_one_facet();
        data[80..84].copy_from_slice(&2u32.to_le_bytes());
        assert!(matches!(
            parse_binary_stl(&data),
            Err(StlError::Truncated {
                parsed: 1,
                expected: 2
            })
        ));
    }

    #[test]
    fn test_parse_ascii() {
        let text = "solid scan
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0
    endloop
  endfacet
endsolid scan
";
        let mesh = parse_stl(text.as_bytes()).unwrap();
        assert_eq!(mesh.triangles.len(), 1);
        assert_eq!(mesh.triangles[0].vertices[1].position.x, 1.0);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            load_stl("/nonexistent/object.stl"),
            Err(StlError::Io { .. })
        ));
    }
}
