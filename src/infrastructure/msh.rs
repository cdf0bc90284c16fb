//! ASCII gmsh `.msh` reader (format 2.2 and 4.1)
//!
//! Only what mesh inspection needs is kept: node coordinates, point/line/
//! triangle elements with their physical tags, and the physical names.
//!
//! ```ignore
//! let mesh = msh::parse(&std::fs::read_to_string("mesh_A.msh")?)?;
//! println!("{} nodes, {} elements", mesh.nodes.len(), mesh.elements.len());
//! ```

use std::collections::HashMap;

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum MshError {
    #[error("binary .msh files are not supported")]
    Binary,

    #[error("unsupported .msh version {0}")]
    UnsupportedVersion(String),

    #[error("missing $MeshFormat section")]
    MissingFormat,

    #[error("line {line}: {message}")]
    Malformed { line: usize, message: String },
}

pub type MshResult<T> = Result<T, MshError>;

/// Element types relevant for 2-D meshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Point,
    Line,
    Triangle,
    Other(u32),
}

impl ElementKind {
    pub fn from_code(code: u32) -> Self {
        match code {
            15 => ElementKind::Point,
            1 => ElementKind::Line,
            2 => ElementKind::Triangle,
            other => ElementKind::Other(other),
        }
    }

    /// Topological dimension, `None` for unsupported kinds.
    pub fn dim(self) -> Option<i32> {
        match self {
            ElementKind::Point => Some(0),
            ElementKind::Line => Some(1),
            ElementKind::Triangle => Some(2),
            ElementKind::Other(_) => None,
        }
    }

    fn node_count(self) -> Option<usize> {
        match self {
            ElementKind::Point => Some(1),
            ElementKind::Line => Some(2),
            ElementKind::Triangle => Some(3),
            ElementKind::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshElement {
    pub kind: ElementKind,
    pub physical_tags: Vec<i32>,
    pub nodes: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalName {
    pub dim: i32,
    pub id: i32,
    pub name: String,
}

/// Parsed content of a `.msh` file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// e.g. "2.2" or "4.1"
    pub version: String,
    pub nodes: HashMap<usize, [f64; 3]>,
    pub elements: Vec<MeshElement>,
    pub physical_names: Vec<PhysicalName>,
}

impl MeshData {
    pub fn count(&self, kind: ElementKind) -> usize {
        self.elements.iter().filter(|e| e.kind == kind).count()
    }
}

/// Line cursor keeping track of the 1-based line number for error messages.
struct Lines<'a> {
    inner: std::iter::Enumerate<std::str::Lines<'a>>,
    current: usize,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.lines().enumerate(),
            current: 0,
        }
    }

    fn next_line(&mut self) -> Option<&'a str> {
        self.inner.next().map(|(i, l)| {
            self.current = i + 1;
            l.trim()
        })
    }

    fn expect_line(&mut self, what: &str) -> MshResult<&'a str> {
        self.next_line().ok_or_else(|| MshError::Malformed {
            line: self.current,
            message: format!("unexpected end of file, expected {what}"),
        })
    }

    fn malformed(&self, message: impl Into<String>) -> MshError {
        MshError::Malformed {
            line: self.current,
            message: message.into(),
        }
    }

    fn skip_to(&mut self, end: &str) {
        while let Some(l) = self.next_line() {
            if l == end {
                break;
            }
        }
    }

    /// Whitespace separated numbers of the next line.
    fn numbers<T: std::str::FromStr>(&mut self, what: &str) -> MshResult<Vec<T>> {
        let line = self.expect_line(what)?;
        line.split_whitespace()
            .map(|s| s.parse::<T>())
            .collect::<Result<Vec<T>, _>>()
            .map_err(|_| self.malformed(format!("bad {what}: '{line}'")))
    }
}

/// Parse an ASCII `.msh` document.
pub fn parse(text: &str) -> MshResult<MeshData> {
    let mut lines = Lines::new(text);
    let mut mesh = MeshData::default();
    let mut major: Option<u32> = None;
    // v4: (dim, entity tag) -> physical tags
    let mut entity_physicals: HashMap<(i32, i32), Vec<i32>> = HashMap::new();

    while let Some(line) = lines.next_line() {
        match line {
            "$MeshFormat" => {
                let header = lines.expect_line("format header")?;
                let parts: Vec<&str> = header.split_whitespace().collect();
                let version = parts
                    .first()
                    .ok_or_else(|| lines.malformed("empty format header"))?;
                if parts.get(1).copied() == Some("1") {
                    return Err(MshError::Binary);
                }
                let m = version
                    .split('.')
                    .next()
                    .and_then(|s| s.parse::<u32>().ok())
                    .filter(|m| *m == 2 || *m == 4)
                    .ok_or_else(|| MshError::UnsupportedVersion(version.to_string()))?;
                major = Some(m);
                mesh.version = version.to_string();
                lines.skip_to("$EndMeshFormat");
            }
            "$PhysicalNames" => {
                mesh.physical_names = parse_physical_names(&mut lines)?;
            }
            "$Entities" => {
                entity_physicals = parse_entities(&mut lines)?;
            }
            "$Nodes" => {
                mesh.nodes = match major.ok_or(MshError::MissingFormat)? {
                    4 => parse_nodes_v4(&mut lines)?,
                    _ => parse_nodes_v2(&mut lines)?,
                };
            }
            "$Elements" => {
                mesh.elements = match major.ok_or(MshError::MissingFormat)? {
                    4 => parse_elements_v4(&mut lines, &entity_physicals)?,
                    _ => parse_elements_v2(&mut lines)?,
                };
            }
            l if l.starts_with('$') && !l.starts_with("$End") => {
                // unknown section ($Periodic, $NodeData, ...)
                let end = format!("$End{}", &l[1..]);
                lines.skip_to(&end);
            }
            _ => {}
        }
    }

    if major.is_none() {
        return Err(MshError::MissingFormat);
    }
    Ok(mesh)
}

fn parse_physical_names(lines: &mut Lines<'_>) -> MshResult<Vec<PhysicalName>> {
    let count: Vec<usize> = lines.numbers("physical name count")?;
    let mut names = Vec::with_capacity(count.first().copied().unwrap_or(0));

    while let Some(l) = lines.next_line() {
        if l == "$EndPhysicalNames" {
            break;
        }
        let mut parts = l.splitn(3, char::is_whitespace);
        let (Some(dim), Some(id), Some(name)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(lines.malformed(format!("bad physical name: '{l}'")));
        };
        let (Ok(dim), Ok(id)) = (dim.parse::<i32>(), id.parse::<i32>()) else {
            return Err(lines.malformed(format!("bad physical name: '{l}'")));
        };
        names.push(PhysicalName {
            dim,
            id,
            name: name.trim().trim_matches('"').to_string(),
        });
    }
    Ok(names)
}

/// `$Entities` (v4): physical tags per entity.
fn parse_entities(lines: &mut Lines<'_>) -> MshResult<HashMap<(i32, i32), Vec<i32>>> {
    let header: Vec<usize> = lines.numbers("entity counts")?;
    if header.len() < 4 {
        return Err(lines.malformed("entity header needs 4 counts"));
    }
    let mut map = HashMap::new();

    for (dim, &count) in header.iter().take(4).enumerate() {
        for _ in 0..count {
            let fields: Vec<f64> = lines.numbers("entity")?;
            // points: tag x y z n phys...; others: tag 6 bbox values n phys... n bounds...
            let physical_at = if dim == 0 { 4 } else { 7 };
            let n = fields
                .get(physical_at)
                .map(|&n| n as usize)
                .ok_or_else(|| lines.malformed("entity line too short"))?;
            let tags: Vec<i32> = fields
                .iter()
                .skip(physical_at + 1)
                .take(n)
                .map(|&t| t as i32)
                .collect();
            if tags.len() != n {
                return Err(lines.malformed("entity physical tags truncated"));
            }
            map.insert((dim as i32, fields[0] as i32), tags);
        }
    }

    lines.skip_to("$EndEntities");
    Ok(map)
}

fn parse_nodes_v2(lines: &mut Lines<'_>) -> MshResult<HashMap<usize, [f64; 3]>> {
    let count: Vec<usize> = lines.numbers("node count")?;
    let mut nodes = HashMap::with_capacity(count.first().copied().unwrap_or(0));

    while let Some(l) = lines.next_line() {
        if l == "$EndNodes" {
            break;
        }
        let parts: Vec<&str> = l.split_whitespace().collect();
        let parsed = match parts.as_slice() {
            [tag, x, y, z, ..] => match (tag.parse(), x.parse(), y.parse(), z.parse()) {
                (Ok(tag), Ok(x), Ok(y), Ok(z)) => Some((tag, [x, y, z])),
                _ => None,
            },
            _ => None,
        };
        let (tag, xyz) = parsed.ok_or_else(|| lines.malformed(format!("bad node: '{l}'")))?;
        nodes.insert(tag, xyz);
    }
    Ok(nodes)
}

fn parse_nodes_v4(lines: &mut Lines<'_>) -> MshResult<HashMap<usize, [f64; 3]>> {
    let header: Vec<usize> = lines.numbers("node header")?;
    if header.len() < 4 {
        return Err(lines.malformed("node header needs 4 values"));
    }
    let (num_blocks, total) = (header[0], header[1]);
    let mut nodes = HashMap::with_capacity(total);

    for _ in 0..num_blocks {
        let block: Vec<usize> = lines.numbers("node block header")?;
        let n = *block
            .get(3)
            .ok_or_else(|| lines.malformed("node block header needs 4 values"))?;

        let mut tags = Vec::with_capacity(n);
        for _ in 0..n {
            let tag: Vec<usize> = lines.numbers("node tag")?;
            tags.push(
                *tag.first()
                    .ok_or_else(|| lines.malformed("empty node tag line"))?,
            );
        }
        for tag in tags {
            let c: Vec<f64> = lines.numbers("node coordinates")?;
            if c.len() < 3 {
                return Err(lines.malformed("node needs 3 coordinates"));
            }
            nodes.insert(tag, [c[0], c[1], c[2]]);
        }
    }

    lines.skip_to("$EndNodes");
    Ok(nodes)
}

fn parse_elements_v2(lines: &mut Lines<'_>) -> MshResult<Vec<MeshElement>> {
    let count: Vec<usize> = lines.numbers("element count")?;
    let mut elements = Vec::with_capacity(count.first().copied().unwrap_or(0));

    while let Some(l) = lines.next_line() {
        if l == "$EndElements" {
            break;
        }
        let p: Vec<i64> = l
            .split_whitespace()
            .map(|s| s.parse::<i64>())
            .collect::<Result<_, _>>()
            .map_err(|_| lines.malformed(format!("bad element: '{l}'")))?;
        if p.len() < 3 {
            return Err(lines.malformed(format!("bad element: '{l}'")));
        }

        let (Ok(code), Ok(n_tags)) = (u32::try_from(p[1]), usize::try_from(p[2])) else {
            return Err(lines.malformed(format!("negative element type or tag count: '{l}'")));
        };
        let kind = ElementKind::from_code(code);
        let Some(n_nodes) = kind.node_count() else {
            continue;
        };
        if p.len() < 3 + n_tags + n_nodes {
            return Err(lines.malformed(format!("element too short: '{l}'")));
        }
        // first tag is the physical group, second the elementary entity
        let physical_tags = if n_tags > 0 && p[3] != 0 {
            vec![p[3] as i32]
        } else {
            vec![]
        };
        elements.push(MeshElement {
            kind,
            physical_tags,
            nodes: p[3 + n_tags..3 + n_tags + n_nodes]
                .iter()
                .map(|&t| t as usize)
                .collect(),
        });
    }
    Ok(elements)
}

fn parse_elements_v4(
    lines: &mut Lines<'_>,
    entity_physicals: &HashMap<(i32, i32), Vec<i32>>,
) -> MshResult<Vec<MeshElement>> {
    let header: Vec<usize> = lines.numbers("element header")?;
    if header.len() < 4 {
        return Err(lines.malformed("element header needs 4 values"));
    }
    let (num_blocks, total) = (header[0], header[1]);
    let mut elements = Vec::with_capacity(total);

    for _ in 0..num_blocks {
        let block: Vec<i64> = lines.numbers("element block header")?;
        if block.len() < 4 {
            return Err(lines.malformed("element block header needs 4 values"));
        }
        let (Ok(code), Ok(n)) = (u32::try_from(block[2]), usize::try_from(block[3])) else {
            return Err(lines.malformed("negative element type or count in block header"));
        };
        let (dim, entity) = (block[0] as i32, block[1] as i32);
        let kind = ElementKind::from_code(code);
        let physical_tags = entity_physicals
            .get(&(dim, entity))
            .cloned()
            .unwrap_or_default();

        for _ in 0..n {
            let p: Vec<usize> = lines.numbers("element")?;
            let Some(n_nodes) = kind.node_count() else {
                continue;
            };
            if p.len() < 1 + n_nodes {
                return Err(lines.malformed("element too short"));
            }
            elements.push(MeshElement {
                kind,
                physical_tags: physical_tags.clone(),
                nodes: p[1..1 + n_nodes].to_vec(),
            });
        }
    }

    lines.skip_to("$EndElements");
    Ok(elements)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MSH22: &str = "\
$MeshFormat
2.2 0 8
$EndMeshFormat
$PhysicalNames
2
1 1 \"Boundary_1\"
2 100 \"Domain\"
$EndPhysicalNames
$Nodes
3
1 0 0 0
2 1 0 0
3 0 1 0
$EndNodes
$Elements
2
1 1 2 1 4 1 2
2 2 2 100 18 1 2 3
$EndElements
";

    #[test]
    fn given_v22_document_when_parsing_then_reads_nodes_elements_and_names() {
        let mesh = parse(MSH22).unwrap();

        assert_eq!(mesh.version, "2.2");
        assert_eq!(mesh.nodes.len(), 3);
        assert_eq!(mesh.count(ElementKind::Line), 1);
        assert_eq!(mesh.count(ElementKind::Triangle), 1);
        assert_eq!(mesh.elements[1].physical_tags, vec![100]);
        assert_eq!(mesh.elements[1].nodes, vec![1, 2, 3]);
        assert_eq!(
            mesh.physical_names[1],
            PhysicalName {
                dim: 2,
                id: 100,
                name: "Domain".to_string()
            }
        );
    }

    #[test]
    fn given_binary_header_when_parsing_then_rejects() {
        let text = "$MeshFormat\n4.1 1 8\n$EndMeshFormat\n";
        assert_eq!(parse(text), Err(MshError::Binary));
    }

    #[test]
    fn given_version_3_when_parsing_then_unsupported() {
        let text = "$MeshFormat\n3.0 0 8\n$EndMeshFormat\n";
        assert_eq!(parse(text), Err(MshError::UnsupportedVersion("3.0".into())));
    }

    #[test]
    fn given_no_format_when_parsing_then_fails() {
        assert_eq!(parse("hello\n"), Err(MshError::MissingFormat));
    }

    #[test]
    fn given_bad_node_line_when_parsing_then_reports_line_number() {
        let text = "$MeshFormat\n2.2 0 8\n$EndMeshFormat\n$Nodes\n1\n1 x 0 0\n$EndNodes\n";
        let err = parse(text).unwrap_err();
        assert!(matches!(err, MshError::Malformed { line: 6, .. }), "{err:?}");
    }

    #[test]
    fn given_negative_element_type_when_parsing_then_malformed() {
        let text = "$MeshFormat\n2.2 0 8\n$EndMeshFormat\n$Elements\n1\n1 -2 2 100 18 1 2 3\n$EndElements\n";
        let err = parse(text).unwrap_err();
        assert!(matches!(err, MshError::Malformed { line: 6, .. }), "{err:?}");
    }

    #[test]
    fn given_negative_tag_count_when_parsing_then_malformed() {
        let text = "$MeshFormat\n2.2 0 8\n$EndMeshFormat\n$Elements\n1\n1 2 -1 100 18 1 2 3\n$EndElements\n";
        assert!(matches!(parse(text), Err(MshError::Malformed { line: 6, .. })));
    }

    #[test]
    fn given_negative_block_type_when_parsing_v4_then_malformed() {
        let text = "$MeshFormat\n4.1 0 8\n$EndMeshFormat\n$Elements\n1 1 1 1\n2 18 -2 1\n1 1 2 3\n$EndElements\n";
        assert!(matches!(parse(text), Err(MshError::Malformed { line: 6, .. })));
    }
}
