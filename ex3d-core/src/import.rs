/// Read-back of the merged mesh formats (binary STL and OBJ)
use nalgebra::Point3;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_till},
    character::complete::{space0, space1, u32 as index},
    combinator::{all_consuming, map, opt},
    number::complete::double,
    sequence::{preceded, terminated, tuple},
    IResult,
};
use thiserror::Error;

use crate::prepare::MergedMesh;

#[derive(Debug, Error, PartialEq)]
pub enum ImportError {
    #[error("binary STL truncated: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: face index {index} out of range")]
    IndexOutOfRange { line: usize, index: u32 },

    #[error("{count} vertices exceed the 32-bit index range")]
    TooManyVertices { count: usize },
}

/// Byte length of a binary STL holding `triangle_count` facets, if addressable
fn binary_stl_len(triangle_count: usize) -> Option<usize> {
    triangle_count.checked_mul(50)?.checked_add(84)
}

fn vertex_index(count: usize) -> Result<u32, ImportError> {
    u32::try_from(count).map_err(|_| ImportError::TooManyVertices { count })
}

/// Decode a binary STL. Every facet contributes three fresh vertices.
pub fn parse_binary_stl(data: &[u8]) -> Result<MergedMesh, ImportError> {
    if data.len() < 84 {
        return Err(ImportError::Truncated {
            expected: 84,
            got: data.len(),
        });
    }

    let triangle_count = u32::from_le_bytes([data[80], data[81], data[82], data[83]]) as usize;
    let expected = binary_stl_len(triangle_count).ok_or(ImportError::Truncated {
        expected: usize::MAX,
        got: data.len(),
    })?;
    if data.len() < expected {
        return Err(ImportError::Truncated {
            expected,
            got: data.len(),
        });
    }

    // the last corner of the last facet must fit in u32
    vertex_index(triangle_count * 3)?;

    let read_f32 = |at: usize| f32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);

    let mut mesh = MergedMesh {
        vertices: Vec::with_capacity(triangle_count * 3),
        triangles: Vec::with_capacity(triangle_count),
    };
    for t in 0..triangle_count {
        // skip the 12-byte normal
        let facet = 84 + t * 50 + 12;
        let base = vertex_index(mesh.vertices.len())?;
        for corner in 0..3 {
            let at = facet + corner * 12;
            mesh.vertices.push(Point3::new(
                f64::from(read_f32(at)),
                f64::from(read_f32(at + 4)),
                f64::from(read_f32(at + 8)),
            ));
        }
        mesh.triangles.push([base, base + 1, base + 2]);
    }

    Ok(mesh)
}

enum ObjLine {
    Vertex(f64, f64, f64),
    Face(u32, u32, u32),
    Ignored,
}

/// Parse OBJ `v` and triangular `f` lines; other statements are ignored.
pub fn parse_obj(input: &str) -> Result<MergedMesh, ImportError> {
    let mut mesh = MergedMesh::default();
    let mut faces = Vec::new();

    for (i, raw) in input.lines().enumerate() {
        let line = i + 1;
        let text = raw.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }

        match all_consuming(obj_line)(text) {
            Ok((_, ObjLine::Vertex(x, y, z))) => mesh.vertices.push(Point3::new(x, y, z)),
            Ok((_, ObjLine::Face(a, b, c))) => faces.push((line, [a, b, c])),
            Ok((_, ObjLine::Ignored)) => {}
            Err(e) => {
                return Err(ImportError::Syntax {
                    line,
                    message: format!("{e:?}"),
                })
            }
        }
    }

    let count = vertex_index(mesh.vertices.len())?;
    for (line, face) in faces {
        let mut zero_based = [0u32; 3];
        for (slot, &one_based) in zero_based.iter_mut().zip(face.iter()) {
            if one_based == 0 || one_based > count {
                return Err(ImportError::IndexOutOfRange {
                    line,
                    index: one_based,
                });
            }
            *slot = one_based - 1;
        }
        mesh.triangles.push(zero_based);
    }

    Ok(mesh)
}

fn obj_line(input: &str) -> IResult<&str, ObjLine> {
    alt((vertex_line, face_line, other_line))(input)
}

fn vertex_line(input: &str) -> IResult<&str, ObjLine> {
    map(
        terminated(
            preceded(
                tag("v"),
                tuple((preceded(space1, double), preceded(space1, double), preceded(space1, double))),
            ),
            space0,
        ),
        |(x, y, z)| ObjLine::Vertex(x, y, z),
    )(input)
}

/// Face corner: `i`, `i/t`, `i//n` or `i/t/n`; only the position index is kept
fn face_index(input: &str) -> IResult<&str, u32> {
    preceded(space1, terminated(index, opt(preceded(tag("/"), take_till(|c: char| c == ' ')))))(input)
}

fn face_line(input: &str) -> IResult<&str, ObjLine> {
    map(
        terminated(
            preceded(tag("f"), tuple((face_index, face_index, face_index))),
            space0,
        ),
        |(a, b, c)| ObjLine::Face(a, b, c),
    )(input)
}

/// Statements we do not model (`o`, `g`, `vn`, `usemtl`, ...)
fn other_line(input: &str) -> IResult<&str, ObjLine> {
    map(
        preceded(
            alt((tag("vn"), tag("vt"), tag("o"), tag("g"), tag("s"), tag("usemtl"), tag("mtllib"))),
            take_till(|_: char| false),
        ),
        |_| ObjLine::Ignored,
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_binary_header() {
        let mut data = vec![0u8; 84];
        data[80..84].copy_from_slice(&0u32.to_le_bytes());

        let mesh = parse_binary_stl(&data).unwrap();
        assert_eq!(mesh.triangles.len(), 0);
    }

    #[test]
    fn test_truncated_stl() {
        let mut data = vec![0u8; 84 + 49];
        data[80..84].copy_from_slice(&1u32.to_le_bytes());
        assert_eq!(
            parse_binary_stl(&data),
            Err(ImportError::Truncated {
                expected: 134,
                got: 133
            })
        );
    }

    #[test]
    fn test_huge_triangle_count_is_truncated() {
        let mut data = vec![0u8; 84 + 50];
        data[80..84].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            parse_binary_stl(&data),
            Err(ImportError::Truncated { got: 134, .. })
        ));

        assert_eq!(binary_stl_len(2), Some(184));
        assert_eq!(binary_stl_len(usize::MAX), None);
        assert_eq!(binary_stl_len(usize::MAX / 50), None);
    }

    #[test]
    fn test_vertex_index_range() {
        assert_eq!(vertex_index(7), Ok(7));
        assert_eq!(vertex_index(u32::MAX as usize), Ok(u32::MAX));
        if usize::BITS > 32 {
            let count = u32::MAX as usize + 1;
            assert_eq!(vertex_index(count), Err(ImportError::TooManyVertices { count }));
        }
    }

    #[test]
    fn test_parse_obj() {
        let text = "# header\nv 0 0 0\nv 1.5 0 0\nv 0 -2.25 1e-3\nvn 0 0 1\nf 1 2 3\nf 1//1 2//1 3//1\n";
        let mesh = parse_obj(text).unwrap();
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.vertices[2], Point3::new(0.0, -2.25, 0.001));
        assert_eq!(mesh.triangles, vec![[0, 1, 2], [0, 1, 2]]);
    }

    #[test]
    fn test_obj_bad_index() {
        let err = parse_obj("v 0 0 0\nf 1 2 3\n").unwrap_err();
        assert_eq!(err, ImportError::IndexOutOfRange { line: 2, index: 2 });
    }

    #[test]
    fn test_obj_syntax_error() {
        let err = parse_obj("v 0 zero 0\n").unwrap_err();
        assert!(matches!(err, ImportError::Syntax { line: 1, .. }));
    }
}
