// Copyright @yucwang 2023

use std::fs;
use std::path::Path;

use thiserror::Error;
use wavefront_obj::{obj, ParseError};

#[derive(Debug, Error)]
pub enum ObjLoadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error at line {}: {}", .0.line_number, .0.message)]
    Parse(ParseError),
}

impl From<ParseError> for ObjLoadError {
    fn from(err: ParseError) -> Self {
        ObjLoadError::Parse(err)
    }
}

pub fn load_obj_from_str<S: AsRef<str>>(input: S) -> Result<obj::ObjSet, ParseError> {
    let triangulated = triangulate_faces(input.as_ref());
    obj::parse(triangulated)
}

pub fn load_obj_from_file<P: AsRef<Path>>(path: P) -> Result<obj::ObjSet, ObjLoadError> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)?;
    let obj_set = load_obj_from_str(data)?;
    log::debug!("Parsed {} with {} objects.", path.display(), obj_set.objects.len());
    Ok(obj_set)
}

// Polygons with more than three corners become triangle fans around the
// first corner, so faces must be convex.
fn triangulate_faces(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + input.len() / 4);
    for line in input.lines() {
        let mut tokens = line.split_whitespace();
        let corners: Vec<&str> = match tokens.next() {
            Some("f") => tokens.collect(),
            _ => Vec::new(),
        };
        if corners.len() <= 3 {
            out.push_str(line);
            out.push('\n');
            continue;
        }

        for pair in corners[1..].windows(2) {
            out.push_str(&format!("f {} {} {}\n", corners[0], pair[0], pair[1]));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quads_are_triangulated() {
        let input = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 1.0 0.0
v 0.0 1.0 0.0
f 1 2 3 4
";
        let obj_set = load_obj_from_str(input).expect("failed to parse obj");
        assert_eq!(obj_set.objects[0].geometry[0].shapes.len(), 2);

        let fan = triangulate_faces("f 1/1 2/2 3/3 4/4 5/5\n");
        assert_eq!(fan, "f 1/1 2/2 3/3\nf 1/1 3/3 4/4\nf 1/1 4/4 5/5\n");
    }

    #[test]
    fn test_parse_error_reports_line() {
        let err = ObjLoadError::from(load_obj_from_str("v x y z\n").err().unwrap());
        assert!(err.to_string().starts_with("parse error at line"));
    }

    #[test]
    fn test_load_obj_from_str_basic() {
        let input = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
f 1 2 3
";
        let obj_set = load_obj_from_str(input).expect("failed to parse obj");
        assert_eq!(obj_set.objects.len(), 1);
        let object = &obj_set.objects[0];
        assert_eq!(object.vertices.len(), 3);
        assert_eq!(object.geometry.len(), 1);
    }
}
