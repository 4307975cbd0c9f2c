//! Output schema produced by finalization.
//!
//! A [`Schema`] is an ordered list of [`Field`]s, one per header column. It
//! serializes to YAML or JSON with datatypes rendered as lowercase tokens such
//! as `integer` or `decimal(12,2)`.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::SemanticType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaFormat {
    #[default]
    Yaml,
    Json,
}

impl SchemaFormat {
    /// `.json` selects JSON; everything else is YAML.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => SchemaFormat::Json,
            _ => SchemaFormat::Yaml,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub datatype: SemanticType,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, SemanticType)>,
    {
        let fields = pairs
            .into_iter()
            .map(|(name, datatype)| Field { name, datatype })
            .collect();
        Schema { fields }
    }

    /// Every column typed as text, straight from the header.
    pub fn all_text(header: &[String]) -> Self {
        Self::from_pairs(
            header
                .iter()
                .map(|name| (name.clone(), SemanticType::Text)),
        )
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn datatypes(&self) -> Vec<SemanticType> {
        self.fields.iter().map(|f| f.datatype).collect()
    }

    pub fn render(&self, format: SchemaFormat) -> Result<String> {
        match format {
            SchemaFormat::Yaml => serde_yaml::to_string(self).context("Serializing schema YAML"),
            SchemaFormat::Json => {
                serde_json::to_string_pretty(self).context("Serializing schema JSON")
            }
        }
    }

    pub fn write_to<W: Write>(&self, mut writer: W, format: SchemaFormat) -> Result<()> {
        let mut rendered = self.render(format)?;
        if !rendered.ends_with('\n') {
            rendered.push('\n');
        }
        writer
            .write_all(rendered.as_bytes())
            .context("Writing schema")?;
        writer.flush().context("Flushing schema output")
    }

    pub fn save(&self, path: &Path, format: SchemaFormat) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating schema file {path:?}"))?;
        self.write_to(BufWriter::new(file), format)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening schema file {path:?}"))?;
        let reader = BufReader::new(file);
        let schema = match SchemaFormat::for_path(path) {
            SchemaFormat::Json => serde_json::from_reader(reader).context("Parsing schema JSON")?,
            SchemaFormat::Yaml => serde_yaml::from_reader(reader).context("Parsing schema YAML")?,
        };
        Ok(schema)
    }
}
