/// STL parser for binary and ASCII files
use nalgebra::{Point3, Vector3};
use nom::{
    bytes::complete::{tag, take, take_till},
    character::complete::{multispace0, multispace1},
    combinator::{all_consuming, map},
    multi::{count, many0},
    number::complete::{float, le_f32, le_u16, le_u32},
    sequence::{preceded, terminated, tuple},
    IResult,
};

use crate::error::LoadError;
use crate::geometry::{Mesh, Triangle, Vertex};

const HEADER_LEN: usize = 80;

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Mesh, LoadError> {
    match binary_stl(data) {
        Ok((_, mesh)) => Ok(mesh),
        Err(_) if data.len() < HEADER_LEN + 4 => {
            Err(LoadError::parse("file too small to be a valid STL"))
        }
        Err(_) => Err(LoadError::parse("unexpected end of binary STL")),
    }
}

fn binary_stl(input: &[u8]) -> IResult<&[u8], Mesh> {
    let (input, _header) = take(HEADER_LEN)(input)?;
    let (input, triangle_count) = le_u32(input)?;
    let (input, triangles) = count(binary_facet, triangle_count as usize)(input)?;
    Ok((input, collect_mesh(triangles)))
}

fn binary_facet(input: &[u8]) -> IResult<&[u8], Triangle> {
    let (input, normal) = binary_vector(input)?;
    let (input, a) = binary_vector(input)?;
    let (input, b) = binary_vector(input)?;
    let (input, c) = binary_vector(input)?;
    let (input, _attribute_bytes) = le_u16(input)?;
    Ok((input, facet(normal, [a, b, c])))
}

fn binary_vector(input: &[u8]) -> IResult<&[u8], [f32; 3]> {
    map(tuple((le_f32, le_f32, le_f32)), |(x, y, z)| [x, y, z])(input)
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<Mesh, LoadError> {
    all_consuming(terminated(ascii_stl, multispace0))(input)
        .map(|(_, mesh)| mesh)
        .map_err(|e| LoadError::parse(format!("invalid ASCII STL: {e}")))
}

fn ascii_stl(input: &str) -> IResult<&str, Mesh> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    let (input, _name) = take_till(|c| c == '\n')(input)?;
    let (input, triangles) = many0(ascii_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;
    let (input, _name) = take_till(|c| c == '\n')(input)?;
    Ok((input, collect_mesh(triangles)))
}

fn ascii_facet(input: &str) -> IResult<&str, Triangle> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, normal) = ascii_vector(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, a) = ascii_vertex(input)?;
    let (input, b) = ascii_vertex(input)?;
    let (input, c) = ascii_vertex(input)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;
    Ok((input, facet(normal, [a, b, c])))
}

fn ascii_vertex(input: &str) -> IResult<&str, [f32; 3]> {
    preceded(preceded(multispace0, tag("vertex")), ascii_vector)(input)
}

fn ascii_vector(input: &str) -> IResult<&str, [f32; 3]> {
    map(
        tuple((
            preceded(multispace0, float),
            preceded(multispace1, float),
            preceded(multispace1, float),
        )),
        |(x, y, z)| [x, y, z],
    )(input)
}

/// Stored normals are often zeroed; fall back to the winding order
fn facet(normal: [f32; 3], corners: [[f32; 3]; 3]) -> Triangle {
    let points = corners.map(|[x, y, z]| Point3::new(x, y, z));
    let mut triangle = Triangle::new(
        Vertex::new(points[0], Vector3::zeros()),
        Vertex::new(points[1], Vector3::zeros()),
        Vertex::new(points[2], Vector3::zeros()),
    );
    let normal = Vector3::from(normal)
        .try_normalize(1e-12)
        .or_else(|| triangle.face_normal())
        .unwrap_or_else(Vector3::z);
    for vertex in &mut triangle.vertices {
        vertex.normal = normal;
    }
    triangle
}

fn collect_mesh(triangles: Vec<Triangle>) -> Mesh {
    let mut mesh = Mesh::with_capacity(triangles.len());
    for triangle in triangles {
        mesh.add_triangle(triangle);
    }
    mesh
}

/// Detect and parse STL (binary or ASCII)
pub fn parse_stl(data: &[u8]) -> Result<Mesh, LoadError> {
    // Binary files may also start with "solid", so ASCII is only a first guess
    if data.starts_with(b"solid") {
        if let Ok(text) = std::str::from_utf8(data) {
            if let Ok(mesh) = parse_ascii_stl(text) {
                return Ok(mesh);
            }
        }
    }

    parse_binary_stl(data)
}

/// Heuristic used by format detection
pub fn looks_like_stl(data: &[u8]) -> bool {
    if data.starts_with(b"solid") {
        return true;
    }
    if data.len() < HEADER_LEN + 4 {
        return false;
    }
    let count = u32::from_le_bytes([data[80], data[81], data[82], data[83]]);
    // u64 so a garbage count cannot overflow on 32-bit targets
    HEADER_LEN as u64 + 4 + u64::from(count) * 50 == data.len() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_with(triangles: &[[[f32; 3]; 4]]) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_LEN];
        data.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
        for facet in triangles {
            for v in facet {
                for c in v {
                    data.extend_from_slice(&c.to_le_bytes());
                }
            }
            data.extend_from_slice(&0u16.to_le_bytes());
        }
        data
    }

    #[test]
    fn test_parse_binary_header() {
        let data = binary_with(&[]);
        let mesh = parse_binary_stl(&data).unwrap();
        assert_eq!(mesh.triangles.len(), 0);
    }

    #[test]
    fn test_binary_zero_normal_uses_winding() {
        let data = binary_with(&[[
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
        ]]);
        assert!(looks_like_stl(&data));
        let mesh = parse_stl(&data).unwrap();
        assert_eq!(mesh.triangles.len(), 1);
        assert_eq!(mesh.triangles[0].vertices[2].position, Point3::new(0.0, 1.0, 0.0));
        assert!((mesh.triangles[0].vertices[0].normal - Vector3::z()).norm() < 1e-6);
    }

    #[test]
    fn test_binary_truncated() {
        let mut data = binary_with(&[[[0.0; 3]; 4]]);
        data.truncate(data.len() - 10);
        assert!(matches!(parse_binary_stl(&data), Err(LoadError::Parse(_))));
        assert!(matches!(parse_binary_stl(&[0u8; 10]), Err(LoadError::Parse(_))));
    }

    #[test]
    fn test_html_is_not_binary_stl() {
        let page = format!(
            "<!DOCTYPE html>\n<html><head><title>404</title></head>\n<body>{}</body></html>",
            "<p>The requested URL was not found.</p>".repeat(4)
        );
        assert!(page.len() > HEADER_LEN + 4);
        assert!(!looks_like_stl(page.as_bytes()));

        let mut data = vec![b' '; HEADER_LEN];
        data.extend_from_slice(&u32::MAX.to_le_bytes());
        data.extend_from_slice(&[0; 50]);
        assert!(!looks_like_stl(&data));
    }

    #[test]
    fn test_parse_ascii() {
        let text = "solid part\n\
            facet normal 0 0 1\n\
              outer loop\n\
                vertex 0 0 0\n\
                vertex 1 0 0\n\
                vertex 0 1 0\n\
              endloop\n\
            endfacet\n\
            endsolid part\n";
        let mesh = parse_stl(text.as_bytes()).unwrap();
        assert_eq!(mesh.triangles.len(), 1);
        assert_eq!(mesh.triangles[0].vertices[1].position, Point3::new(1.0, 0.0, 0.0));
    }
}
