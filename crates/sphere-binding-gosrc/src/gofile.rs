//! Generated Go source, parsed with tree-sitter-go.
//!
//! Only top-level struct type declarations are indexed. Edits are kept as
//! pending tag texts and spliced back into the original source on
//! [`GoFile::render`]. A run of single-line fields containing an edit is
//! re-laid out with gofmt's column rules so trailing comments stay aligned;
//! everything else is preserved byte for byte.

use crate::tree::TagTree;
use sphere_binding_tags::quote::{go_quote, go_unquote};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use thiserror::Error;
use tree_sitter::{Node, Parser};

#[derive(Debug, Error)]
pub enum GoSourceError {
    #[error("failed to load the Go grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("the Go parser produced no tree")]
    NoTree,

    #[error("syntax error at {line}:{column}")]
    Syntax { line: usize, column: usize },

    #[error("tag literal on {strukt}.{field} is not a valid Go string: {literal}")]
    TagLiteral {
        strukt: String,
        field: String,
        literal: String,
    },
}

/// One tag site: a field declaration's tag literal, or the place one would go.
#[derive(Debug, Clone)]
struct TagSite {
    /// Byte range of the existing literal (delimiters included).
    literal: Option<Range<usize>>,
    /// End of the field's type; where a missing tag gets inserted.
    insert_at: usize,
    text: String,
    dirty: bool,
}

/// A single-line field declaration split into the cells gofmt aligns.
#[derive(Debug, Clone)]
struct FieldLine {
    /// From the first name (or embedded type) through the trailing comment.
    span: Range<usize>,
    /// `None` for an embedded field.
    names: Option<String>,
    ty: String,
    site: usize,
    comment: Option<String>,
}

#[derive(Debug)]
pub struct GoFile {
    source: String,
    structs: BTreeMap<String, BTreeMap<String, usize>>,
    sites: Vec<TagSite>,
    /// Runs of consecutive field lines that share gofmt column widths.
    blocks: Vec<Vec<FieldLine>>,
}

impl GoFile {
    pub fn parse(source: String) -> Result<Self, GoSourceError> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_go::LANGUAGE.into())?;
        let tree = parser.parse(&source, None).ok_or(GoSourceError::NoTree)?;
        let root = tree.root_node();
        if root.has_error() {
            let at = first_error(root).unwrap_or(root);
            let pos = at.start_position();
            return Err(GoSourceError::Syntax {
                line: pos.row + 1,
                column: pos.column + 1,
            });
        }

        let mut file = GoFile {
            source: String::new(),
            structs: BTreeMap::new(),
            sites: Vec::new(),
            blocks: Vec::new(),
        };
        let mut cursor = root.walk();
        for decl in root.named_children(&mut cursor) {
            if decl.kind() != "type_declaration" {
                continue;
            }
            let mut specs = decl.walk();
            for spec in decl.named_children(&mut specs) {
                if spec.kind() == "type_spec" {
                    file.index_type_spec(spec, &source)?;
                }
            }
        }
        file.source = source;
        tracing::trace!(structs = file.structs.len(), "indexed Go structs");
        Ok(file)
    }

    fn index_type_spec(&mut self, spec: Node<'_>, source: &str) -> Result<(), GoSourceError> {
        let (Some(name), Some(ty)) = (
            spec.child_by_field_name("name"),
            spec.child_by_field_name("type"),
        ) else {
            return Ok(());
        };
        if ty.kind() != "struct_type" {
            return Ok(());
        }
        let strukt = text(name, source).to_string();
        let mut fields = BTreeMap::new();

        let mut cursor = ty.walk();
        let lists: Vec<Node<'_>> = ty
            .named_children(&mut cursor)
            .filter(|n| n.kind() == "field_declaration_list")
            .collect();
        // Blocks are only recorded when every line in the struct fits the
        // one-field-per-line shape; anything else is left to gofmt.
        let mut layout = Layout::default();
        for list in lists {
            let mut nodes = list.walk();
            for node in list.named_children(&mut nodes) {
                match node.kind() {
                    "comment" => layout.comment(node, source),
                    "field_declaration" => {
                        let Some(ty) = node.child_by_field_name("type") else {
                            continue;
                        };
                        let mut names = node.walk();
                        let name_nodes: Vec<Node<'_>> =
                            node.children_by_field_name("name", &mut names).collect();
                        let mut declared: Vec<String> = name_nodes
                            .iter()
                            .map(|n| text(*n, source).to_string())
                            .collect();
                        if declared.is_empty() {
                            declared.push(embedded_name(text(ty, source)));
                        }
                        let site = tag_site(&strukt, &declared[0], ty, node, source)?;
                        let index = self.sites.len();
                        for field in declared {
                            fields.insert(field, index);
                        }
                        self.sites.push(site);
                        layout.field(node, &name_nodes, ty, index, source);
                    }
                    _ => {}
                }
            }
        }
        self.blocks.extend(layout.finish(source));
        self.structs.insert(strukt, fields);
        Ok(())
    }

    /// Names of the indexed struct declarations.
    pub fn structs(&self) -> impl Iterator<Item = &str> {
        self.structs.keys().map(String::as_str)
    }

    /// The source with every pending tag edit applied.
    pub fn render(&self) -> String {
        let mut edits: Vec<(Range<usize>, String)> = Vec::new();
        let mut aligned = BTreeSet::new();
        for block in &self.blocks {
            if !block.iter().any(|line| self.sites[line.site].dirty) {
                continue;
            }
            let rows: Vec<Vec<String>> = block.iter().map(|line| self.cells(line)).collect();
            for (line, text) in block.iter().zip(tabwrite(&rows)) {
                aligned.insert(line.site);
                if self.source[line.span.clone()] != text {
                    edits.push((line.span.clone(), text));
                }
            }
        }
        for (index, site) in self.sites.iter().enumerate() {
            if !site.dirty || aligned.contains(&index) {
                continue;
            }
            edits.push(match &site.literal {
                Some(range) => (range.clone(), tag_literal(&site.text)),
                None => (
                    site.insert_at..site.insert_at,
                    format!(" {}", tag_literal(&site.text)),
                ),
            });
        }
        edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));

        let mut out = self.source.clone();
        for (range, replacement) in edits {
            out.replace_range(range, &replacement);
        }
        out
    }

    /// Cells of one field line as go/printer emits them: names, type, tag
    /// and comment, with an empty tag cell kept under a commented embedded
    /// field.
    fn cells(&self, line: &FieldLine) -> Vec<String> {
        let site = &self.sites[line.site];
        let tag = if site.dirty {
            Some(tag_literal(&site.text))
        } else {
            site.literal
                .as_ref()
                .map(|range| self.source[range.clone()].to_string())
        };
        let mut cells = Vec::with_capacity(4);
        match &line.names {
            Some(names) => {
                cells.push(names.clone());
                cells.push(line.ty.clone());
                cells.extend(tag);
            }
            None => {
                cells.push(line.ty.clone());
                match tag {
                    Some(tag) => cells.push(tag),
                    None if line.comment.is_some() => cells.push(String::new()),
                    None => {}
                }
            }
        }
        cells.extend(line.comment.clone());
        cells
    }

    fn site(&self, strukt: &str, field: &str) -> Option<usize> {
        self.structs.get(strukt)?.get(field).copied()
    }
}

impl TagTree for GoFile {
    fn has_struct(&self, name: &str) -> bool {
        self.structs.contains_key(name)
    }

    fn field_tag(&self, strukt: &str, field: &str) -> Option<String> {
        self.site(strukt, field).map(|i| self.sites[i].text.clone())
    }

    fn set_field_tag(&mut self, strukt: &str, field: &str, tag: &str) {
        if let Some(i) = self.site(strukt, field) {
            let site = &mut self.sites[i];
            site.text = tag.to_string();
            site.dirty = true;
        }
    }
}

fn tag_site(
    strukt: &str,
    field: &str,
    ty: Node<'_>,
    decl: Node<'_>,
    source: &str,
) -> Result<TagSite, GoSourceError> {
    let Some(tag) = decl.child_by_field_name("tag") else {
        return Ok(TagSite {
            literal: None,
            insert_at: ty.end_byte(),
            text: String::new(),
            dirty: false,
        });
    };
    let literal = text(tag, source);
    let unquoted = match tag.kind() {
        "raw_string_literal" => literal
            .strip_prefix('`')
            .and_then(|s| s.strip_suffix('`'))
            .map(|s| s.replace('\r', "")),
        _ => go_unquote(literal),
    };
    let Some(unquoted) = unquoted else {
        return Err(GoSourceError::TagLiteral {
            strukt: strukt.to_string(),
            field: field.to_string(),
            literal: literal.to_string(),
        });
    };
    Ok(TagSite {
        literal: Some(tag.byte_range()),
        insert_at: ty.end_byte(),
        text: unquoted,
        dirty: false,
    })
}

/// Raw string literal when possible, interpreted literal otherwise.
fn tag_literal(tag: &str) -> String {
    if tag.contains('`') || tag.contains('\r') {
        go_quote(tag)
    } else {
        format!("`{tag}`")
    }
}

/// Collects the field lines of one struct into alignment blocks.
#[derive(Default)]
struct Layout {
    blocks: Vec<Vec<FieldLine>>,
    current: Vec<FieldLine>,
    /// Row of the last field line in `current`.
    row: Option<usize>,
    broken: bool,
}

impl Layout {
    fn comment(&mut self, node: Node<'_>, source: &str) {
        let row = node.start_position().row;
        if self.row != Some(row) {
            // A comment on its own line ends the column block.
            self.close();
            return;
        }
        let comment = text(node, source);
        match self.current.last_mut() {
            Some(line) if line.comment.is_none() && comment.starts_with("//") => {
                line.span.end = node.end_byte();
                line.comment = Some(comment.to_string());
            }
            _ => self.broken = true,
        }
    }

    fn field(
        &mut self,
        decl: Node<'_>,
        names: &[Node<'_>],
        ty: Node<'_>,
        site: usize,
        source: &str,
    ) {
        let row = decl.start_position().row;
        let mut inner = decl.walk();
        let has_comment = decl
            .named_children(&mut inner)
            .any(|child| child.kind() == "comment");
        if row != decl.end_position().row || has_comment || !starts_line(source, decl.start_byte())
        {
            self.broken = true;
            return;
        }
        if self.row.is_some_and(|prev| prev + 1 != row) {
            self.close();
        }
        let names = match (names.first(), names.last()) {
            (Some(first), Some(last)) => {
                Some(source[first.start_byte()..last.end_byte()].to_string())
            }
            _ => None,
        };
        self.current.push(FieldLine {
            span: decl.byte_range(),
            names,
            ty: text(ty, source).to_string(),
            site,
            comment: None,
        });
        self.row = Some(row);
    }

    fn close(&mut self) {
        if !self.current.is_empty() {
            self.blocks.push(std::mem::take(&mut self.current));
        }
        self.row = None;
    }

    fn finish(mut self, source: &str) -> Vec<Vec<FieldLine>> {
        self.close();
        let ends_lines = self
            .blocks
            .iter()
            .flatten()
            .all(|line| ends_line(source, line.span.end));
        if self.broken || !ends_lines {
            return Vec::new();
        }
        self.blocks
    }
}

fn starts_line(source: &str, at: usize) -> bool {
    let head = &source[..at];
    let line = head.rfind('\n').map_or(head, |nl| &head[nl + 1..]);
    line.chars().all(|c| c == ' ' || c == '\t')
}

fn ends_line(source: &str, at: usize) -> bool {
    let tail = &source[at..];
    let line = tail.find('\n').map_or(tail, |nl| &tail[..nl]);
    line.chars().all(char::is_whitespace)
}

/// Lay rows of cells out the way gofmt's tabwriter does. Every cell but the
/// last in a row is padded to its column block's width plus one space; a
/// column block is a run of consecutive rows that have a cell after that
/// column. Blocks of empty cells collapse to nothing.
fn tabwrite(rows: &[Vec<String>]) -> Vec<String> {
    let mut widths: Vec<Vec<usize>> = rows.iter().map(|row| vec![0; row.len()]).collect();
    column_widths(rows, 0..rows.len(), 0, &mut widths);
    rows.iter()
        .zip(&widths)
        .map(|(row, widths)| {
            let mut line = String::new();
            for (j, cell) in row.iter().enumerate() {
                line.push_str(cell);
                if j + 1 < row.len() {
                    let pad = widths[j].saturating_sub(cell.chars().count());
                    line.extend(std::iter::repeat(' ').take(pad));
                }
            }
            line
        })
        .collect()
}

fn column_widths(
    rows: &[Vec<String>],
    lines: Range<usize>,
    column: usize,
    widths: &mut [Vec<usize>],
) {
    let mut this = lines.start;
    while this < lines.end {
        if column + 1 >= rows[this].len() {
            this += 1;
            continue;
        }
        let start = this;
        let mut width = 0;
        let mut empty = true;
        while this < lines.end && column + 1 < rows[this].len() {
            let cell = rows[this][column].chars().count();
            width = width.max(cell + 1);
            empty &= cell == 0;
            this += 1;
        }
        if empty {
            width = 0;
        }
        for row in &mut widths[start..this] {
            row[column] = width;
        }
        column_widths(rows, start..this, column + 1, widths);
    }
}

/// Field name of an embedded type: `*pkg.Name[T]` → `Name`.
fn embedded_name(ty: &str) -> String {
    let ty = ty.trim_start_matches('*');
    let ty = ty.split('[').next().unwrap_or(ty);
    ty.rsplit('.').next().unwrap_or(ty).trim().to_string()
}

fn text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    &source[node.byte_range()]
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error() || child.is_missing())
        .find_map(first_error)
}
