//! Open one level inside the save container, patch its payload, write back.

use std::fs;

use anyhow::{Context, Result};
use log::{debug, info};
use trigforge_data::{decode_level, encode_level};

use crate::container::{decrypt, encrypt};
use crate::plist::{Document, LEVEL_PAYLOAD_KEY, NodePath, level_name};
use crate::save_paths::SavePaths;
use crate::SaveError;

/// The selected level as found in the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveData {
    pub name: String,
    /// `k4` payload exactly as stored (gzip + base64url).
    pub raw_payload: String,
    /// Decoded level string.
    pub levelstring: String,
}

/// An opened save container with one level selected for editing.
#[derive(Debug, Clone)]
pub struct SaveFile {
    paths: SavePaths,
    doc: Document,
    entry: NodePath,
    pub data: SaveData,
}

impl SaveFile {
    /// Read the primary container and select `level` by name, or the first
    /// level when `level` is `None`.
    ///
    /// # Errors
    /// I/O failures with the file path attached; `SaveError::LevelNotFound` or
    /// `NoLevels` (recoverable with `downcast_ref`) when nothing matches.
    pub fn open(paths: &SavePaths, level: Option<&str>) -> Result<Self> {
        let path = paths.primary();
        let bytes = fs::read(&path).with_context(|| format!("reading save file {}", path.display()))?;
        let xml = decrypt(&bytes).with_context(|| format!("decrypting {}", path.display()))?;
        Self::from_xml(paths.clone(), &xml, level)
    }

    /// Select a level from already-decrypted document text.
    ///
    /// # Errors
    /// See [`SaveFile::open`].
    pub fn from_xml(paths: SavePaths, xml: &str, level: Option<&str>) -> Result<Self> {
        let doc = Document::parse(xml).context("parsing save document")?;
        let entries = doc.level_entries();
        let entry = match level {
            Some(wanted) => entries
                .into_iter()
                .find(|p| doc.element(p).is_some_and(|el| level_name(el) == wanted))
                .ok_or_else(|| SaveError::LevelNotFound(wanted.to_string()))?,
            None => entries.into_iter().next().ok_or(SaveError::NoLevels)?,
        };
        let el = doc
            .element(&entry)
            .ok_or_else(|| SaveError::MalformedDocument("level entry vanished".into()))?;
        let name = level_name(el);
        let raw_payload = match el.value(LEVEL_PAYLOAD_KEY) {
            Some(v) => v.text()?,
            None => String::new(),
        };
        let levelstring = if raw_payload.trim().is_empty() {
            String::new()
        } else {
            decode_level(&raw_payload).with_context(|| format!("decoding payload of level '{name}'"))?
        };
        debug!("opened level '{name}' ({} bytes of level string)", levelstring.len());
        Ok(Self {
            paths,
            doc,
            entry,
            data: SaveData {
                name,
                raw_payload,
                levelstring,
            },
        })
    }

    /// Names of every level in the primary container, in file order.
    ///
    /// # Errors
    /// I/O or decoding failures.
    pub fn level_names(paths: &SavePaths) -> Result<Vec<String>> {
        let path = paths.primary();
        let bytes = fs::read(&path).with_context(|| format!("reading save file {}", path.display()))?;
        let doc = Document::parse(&decrypt(&bytes)?)?;
        Ok(doc
            .level_entries()
            .iter()
            .filter_map(|p| doc.element(p).map(level_name))
            .collect())
    }

    /// Append `level` to the current level string.
    ///
    /// # Errors
    /// `SaveError::MalformedDocument` if the entry cannot be located.
    pub fn add(&mut self, level: &str) -> Result<(), SaveError> {
        let combined = format!("{}{level}", self.data.levelstring);
        self.set(&combined)
    }

    /// Replace the level string outright.
    ///
    /// # Errors
    /// `SaveError::MalformedDocument` if the entry cannot be located.
    pub fn set(&mut self, level: &str) -> Result<(), SaveError> {
        let payload = encode_level(level);
        let el = self
            .doc
            .element_mut(&self.entry)
            .ok_or_else(|| SaveError::MalformedDocument("level entry vanished".into()))?;
        el.set_string(LEVEL_PAYLOAD_KEY, &payload);
        self.data.raw_payload = payload;
        self.data.levelstring = level.to_string();
        Ok(())
    }

    pub fn paths(&self) -> &SavePaths {
        &self.paths
    }

    /// Re-encrypt the whole document and write it to both container files.
    ///
    /// # Errors
    /// I/O failures with the file path attached.
    pub fn save(&self) -> Result<()> {
        let xml = self.doc.to_xml().context("serializing save document")?;
        let bytes = encrypt(&xml);
        for path in self.paths.all() {
            fs::write(&path, &bytes).with_context(|| format!("writing save file {}", path.display()))?;
        }
        info!("saved level '{}' to {}", self.data.name, self.paths.dir().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(payload: &str) -> String {
        format!(
            concat!(
                r#"<?xml version="1.0"?><plist version="1.0"><dict><k>LLM_01</k><d>"#,
                r#"<k>k_0</k><d><k>k2</k><s>First</s><k>k4</k><s>{}</s></d>"#,
                r#"<k>k_1</k><d><k>k2</k><s>Second</s></d>"#,
                r#"</d></dict></plist>"#,
            ),
            payload
        )
    }

    #[test]
    fn first_level_is_the_default() {
        let xml = doc(&encode_level("1,1,2,3;"));
        let save = SaveFile::from_xml(SavePaths::new("."), &xml, None).unwrap();
        assert_eq!(save.data.name, "First");
        assert_eq!(save.data.levelstring, "1,1,2,3;");
    }

    #[test]
    fn level_without_payload_reads_empty() {
        let save = SaveFile::from_xml(SavePaths::new("."), &doc(""), Some("Second")).unwrap();
        assert_eq!(save.data.levelstring, "");
        assert_eq!(save.data.raw_payload, "");
    }

    #[test]
    fn missing_level_downcasts_to_not_found() {
        let err = SaveFile::from_xml(SavePaths::new("."), &doc(""), Some("Third")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SaveError>(),
            Some(SaveError::LevelNotFound(name)) if name == "Third"
        ));
    }

    #[test]
    fn add_appends_and_set_replaces() {
        let xml = doc(&encode_level("a;"));
        let mut save = SaveFile::from_xml(SavePaths::new("."), &xml, None).unwrap();
        save.add("b;").unwrap();
        assert_eq!(save.data.levelstring, "a;b;");
        assert_eq!(decode_level(&save.data.raw_payload).unwrap(), "a;b;");
        save.set("c;").unwrap();
        assert_eq!(save.data.levelstring, "c;");
    }
}
