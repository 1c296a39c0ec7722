use crate::error::{ProcessingError, Result};
use crate::models::{
    Alignment, FieldDescriptor, FieldFormat, FormatKind, Granularity, PointCodeOrigin,
    SchemaModel, VariableRule, VariableRuleBuilder,
};
use roxmltree::{Document, Node};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

type SectionHandler = fn(&mut SchemaModel, Node) -> Result<()>;

/// Top-level sections, matched on the upper-cased tag name
const SECTIONS: &[(&str, SectionHandler)] = &[
    ("FILENAME", read_filename_section),
    ("FORMAT", read_format_section),
    ("POINTCODE", read_point_code_section),
    ("TIME", read_time_section),
    ("VARIABLECODE", read_variable_code_section),
    ("VARIABLE", read_variable_section),
];

#[derive(Debug, Clone, Copy)]
enum FieldTag {
    Kind,
    Format,
    Attribute,
    Position,
    FirstChar,
    CharCount,
    Alignment,
    Prefix,
}

const FIELD_TAGS: &[(&str, FieldTag)] = &[
    ("TYPE", FieldTag::Kind),
    ("NAME", FieldTag::Kind),
    ("FORMAT", FieldTag::Format),
    ("ATTRIBUTE", FieldTag::Attribute),
    ("FIELD", FieldTag::Position),
    ("POSITION", FieldTag::Position),
    ("FIRST_CHAR", FieldTag::FirstChar),
    ("FIRSTCHAR", FieldTag::FirstChar),
    ("NR_CHAR", FieldTag::CharCount),
    ("NUMCHAR", FieldTag::CharCount),
    ("NRCHAR", FieldTag::CharCount),
    ("ALIGN", FieldTag::Alignment),
    ("ALIGNMENT", FieldTag::Alignment),
    ("PREFIX", FieldTag::Prefix),
    ("FIXEDTEXT", FieldTag::Prefix),
];

#[derive(Debug, Clone, Copy)]
enum FormatTag {
    Type,
    Attribute,
    HeaderRows,
    MissingValue,
    Delimiter,
    DecimalSeparator,
}

const FORMAT_TAGS: &[(&str, FormatTag)] = &[
    ("TYPE", FormatTag::Type),
    ("ATTRIBUTE", FormatTag::Attribute),
    ("HEADER", FormatTag::HeaderRows),
    ("HEADERROWS", FormatTag::HeaderRows),
    ("NUMHEADERROWS", FormatTag::HeaderRows),
    ("MISSINGVALUE", FormatTag::MissingValue),
    ("MISSING_VALUE", FormatTag::MissingValue),
    ("NODATA", FormatTag::MissingValue),
    ("DELIMITER", FormatTag::Delimiter),
    ("DECIMALSEPARATOR", FormatTag::DecimalSeparator),
];

#[derive(Debug, Clone, Copy)]
enum FilenameTag {
    PointCodeField,
    FixedText,
    CodeLength,
}

const FILENAME_FIELD_TAGS: &[(&str, FilenameTag)] = &[
    ("PRAGANAME", FilenameTag::PointCodeField),
    ("PRAGAFIELD", FilenameTag::PointCodeField),
    ("TEXT", FilenameTag::FixedText),
    ("FIXEDTEXT", FilenameTag::FixedText),
    ("NRCHAR", FilenameTag::CodeLength),
    ("NR_CHAR", FilenameTag::CodeLength),
];

fn lookup<T: Copy>(table: &[(&str, T)], tag: &str) -> Option<T> {
    table
        .iter()
        .find(|(name, _)| *name == tag)
        .map(|(_, value)| *value)
}

fn tag_of(node: Node) -> String {
    node.tag_name().name().to_ascii_uppercase()
}

fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

/// Concatenated text content of an element
fn text_of(node: Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// Trimmed, whitespace-collapsed and upper-cased text, for enum-like values
fn keyword_of(node: Node) -> String {
    text_of(node)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

fn int_of(node: Node) -> Result<i64> {
    let text = text_of(node);
    text.trim()
        .parse::<i64>()
        .map_err(|_| ProcessingError::InvalidSchemaValue {
            tag: node.tag_name().name().to_string(),
            value: text.clone(),
        })
}

/// Reads schema documents into [`SchemaModel`]s. Holds no state; never
/// touches data files.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaLoader;

impl SchemaLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a schema document from disk
    pub fn load_file(&self, path: &Path) -> Result<SchemaModel> {
        if path.as_os_str().is_empty() {
            return Err(ProcessingError::MissingFile("missing schema file".to_string()));
        }

        let content = std::fs::read_to_string(path).map_err(|source| {
            ProcessingError::OpenFailed {
                path: path.to_path_buf(),
                source,
            }
        })?;

        self.load_document(&content, path)
    }

    /// Load a schema document held in memory
    pub fn load_str(&self, xml: &str) -> Result<SchemaModel> {
        self.load_document(xml, Path::new("<memory>"))
    }

    fn load_document(&self, xml: &str, source: &Path) -> Result<SchemaModel> {
        let doc = Document::parse(xml).map_err(|e| {
            let pos = e.pos();
            ProcessingError::ParseFailed {
                path: PathBuf::from(source),
                line: pos.row,
                column: pos.col,
                message: e.to_string(),
            }
        })?;

        let mut schema = SchemaModel::default();

        for section in elements(doc.root_element()) {
            let tag = tag_of(section);
            match lookup(SECTIONS, &tag) {
                Some(handler) => handler(&mut schema, section)?,
                None => debug!("Ignoring unknown schema section <{}>", section.tag_name().name()),
            }
        }

        schema.num_var_fields = count_variable_fields(&schema)?;

        debug!(
            "Loaded schema from {}: {} variables, {} variable fields",
            source.display(),
            schema.variables.len(),
            schema.num_var_fields
        );

        Ok(schema)
    }
}

/// A FIXED variable code counts every replicated field, possibly none.
/// Any other scheme needs at least one variable.
fn count_variable_fields(schema: &SchemaModel) -> Result<usize> {
    if schema.variable_code.normalized_kind() == "FIXED" {
        Ok(schema.variables.iter().map(|v| v.replication_count).sum())
    } else if !schema.variables.is_empty() {
        Ok(1)
    } else {
        Err(ProcessingError::SchemaIncomplete(
            "missing variables definition".to_string(),
        ))
    }
}

fn read_field_descriptor(node: Node) -> Result<FieldDescriptor> {
    let mut field = FieldDescriptor::default();

    for child in elements(node) {
        let Some(tag) = lookup(FIELD_TAGS, &tag_of(child)) else {
            continue;
        };
        match tag {
            FieldTag::Kind => field.kind = text_of(child),
            FieldTag::Format => field.format = FieldFormat::parse(&text_of(child)),
            FieldTag::Attribute => field.attribute = text_of(child),
            FieldTag::Position => {
                let position = int_of(child)?;
                field.position = (position > 0).then_some(position as usize);
            }
            FieldTag::FirstChar => field.first_char = int_of(child)?.max(1) as usize,
            FieldTag::CharCount => {
                // zero or the NODATA sentinel mean "rest of the input"
                let count = int_of(child)?;
                field.char_count = (count > 0).then_some(count as usize);
            }
            FieldTag::Alignment => field.alignment = Alignment::parse(&text_of(child)),
            FieldTag::Prefix => field.prefix = text_of(child),
        }
    }

    Ok(field)
}

fn read_filename_section(schema: &mut SchemaModel, node: Node) -> Result<()> {
    for child in elements(node) {
        match tag_of(child).as_str() {
            "PATH" => schema.filename.path = text_of(child),
            "FIELD" => {
                for item in elements(child) {
                    match lookup(FILENAME_FIELD_TAGS, &tag_of(item)) {
                        Some(FilenameTag::PointCodeField) => {
                            schema.filename.point_code_field = text_of(item)
                        }
                        Some(FilenameTag::FixedText) => schema.filename.fixed_text.push(text_of(item)),
                        Some(FilenameTag::CodeLength) => {
                            let length = int_of(item)?;
                            schema.filename.code_length = (length >= 0).then_some(length as usize);
                        }
                        None => {}
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn read_format_section(schema: &mut SchemaModel, node: Node) -> Result<()> {
    for child in elements(node) {
        let Some(tag) = lookup(FORMAT_TAGS, &tag_of(child)) else {
            continue;
        };
        match tag {
            FormatTag::Type => {
                let keyword = keyword_of(child);
                match FormatKind::parse(&keyword) {
                    Some(kind) => schema.format.kind = Some(kind),
                    None => warn!("Unrecognized FORMAT.TYPE '{}'", keyword),
                }
            }
            FormatTag::Attribute => schema.format.is_single_point = keyword_of(child) == "SINGLEPOINT",
            FormatTag::HeaderRows => schema.format.header_rows = int_of(child)?.max(0) as usize,
            FormatTag::MissingValue => {
                let text = text_of(child);
                schema.format.missing_value = text.trim().parse::<f32>().map_err(|_| {
                    ProcessingError::InvalidSchemaValue {
                        tag: child.tag_name().name().to_string(),
                        value: text.clone(),
                    }
                })?;
            }
            FormatTag::Delimiter => {
                let text = text_of(child);
                schema.format.delimiter = if text.is_empty() { " ".to_string() } else { text };
            }
            FormatTag::DecimalSeparator => schema.format.decimal_separator = text_of(child),
        }
    }
    Ok(())
}

fn read_point_code_section(schema: &mut SchemaModel, node: Node) -> Result<()> {
    let field = read_field_descriptor(node)?;
    schema.point_code.origin = PointCodeOrigin::parse(&field.normalized_kind());
    if schema.point_code.origin.is_none() {
        warn!("Unrecognized point code type '{}'", field.kind);
    }
    schema.point_code.field = field;
    Ok(())
}

fn read_time_section(schema: &mut SchemaModel, node: Node) -> Result<()> {
    let field = read_field_descriptor(node)?;
    schema.time.granularity = Granularity::parse(&field.normalized_kind());
    schema.time.field = field;
    Ok(())
}

fn read_variable_code_section(schema: &mut SchemaModel, node: Node) -> Result<()> {
    schema.variable_code = read_field_descriptor(node)?;
    Ok(())
}

fn read_variable_section(schema: &mut SchemaModel, node: Node) -> Result<()> {
    let mut builder = VariableRule::builder();

    for child in elements(node) {
        match tag_of(child).as_str() {
            "FIELD" => builder = builder.value_field(read_field_descriptor(child)?),
            "FLAG" => builder = read_flag_block(builder, child)?,
            "NR_REPLICATIONS" | "REPLICATION" => {
                builder = builder.replication_count(int_of(child)?.max(1) as usize)
            }
            _ => {}
        }
    }

    let rule = builder.build();
    if let (Some(flag), Some(_)) = (&rule.flag_field, &rule.accepted_flag) {
        if !flag.format.is_flag_compatible() {
            warn!(
                "Flag of variable {} has format {}; fixed-width flags are only checked for %s and %d",
                rule.name(),
                flag.format
            );
        }
    }
    schema.variables.push(rule);
    Ok(())
}

fn read_flag_block(mut builder: VariableRuleBuilder, node: Node) -> Result<VariableRuleBuilder> {
    for child in elements(node) {
        match tag_of(child).as_str() {
            "FIELD" => builder = builder.flag_field(read_field_descriptor(child)?),
            "ACCEPTED" | "VALUE" => builder = builder.accepted_flag(&text_of(child)),
            _ => {}
        }
    }
    Ok(builder)
}
