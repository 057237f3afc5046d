// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Descriptor flag store.
//!
//! # Document Layout
//!
//! Every collection directory holds a `gamelist.xml` describing the games in
//! it. The root element holds one record per game (or folder), and each record
//! holds flat child fields:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <gameList>
//!     <game id="1234" source="ScreenScraper.fr">
//!         <path>./Tetris (USA).zip</path>
//!         <name>Tetris</name>
//!         <desc>Falling blocks.</desc>
//!         <image>./media/images/Tetris (USA).png</image>
//!         <genre>Puzzle</genre>
//!         <kidgame>true</kidgame>
//!     </game>
//! </gameList>
//! ```
//!
//! A flag is set when its sub-record is present with the text `true`.
//!
//! Records are kept in an arena, i.e., a plain vector addressed by index.
//! Fields and attributes keep their document order, and fields romtidy does
//! not know about are carried through untouched.

use crate::{
    flag::{marked, FlagState, FlagToken},
    journal::Journal,
    store::{write_with_backup, Result, StoreError},
};

use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Reader, Writer,
};
use std::{
    fs::read_to_string,
    path::{Component, Path, PathBuf},
};
use tracing::instrument;

/// Single child field of an entry.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
}

impl Field {
    /// Construct new field without attributes.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            text: text.into(),
        }
    }
}

/// Single record of the descriptor, usually a game.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Entry {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub fields: Vec<Field>,
}

impl Entry {
    /// Construct new empty game entry.
    pub fn new() -> Self {
        Self {
            tag: "game".into(),
            ..Default::default()
        }
    }

    /// Builder style field insertion.
    pub fn with_field(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.fields.push(Field::new(name, text));
        self
    }

    /// Text of first field with name.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.text.as_str())
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field.name == name)
    }

    /// Replace text of first field with name, or append it.
    pub fn set_field(&mut self, name: &str, text: impl Into<String>) {
        match self.fields.iter_mut().find(|field| field.name == name) {
            Some(field) => field.text = text.into(),
            None => self.fields.push(Field::new(name, text)),
        }
    }

    /// Remove every field with name, returning whether any existed.
    pub fn remove_field(&mut self, name: &str) -> bool {
        let before = self.fields.len();
        self.fields.retain(|field| field.name != name);
        before != self.fields.len()
    }

    /// Value of attribute.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.as_str())
    }

    /// Overwrite attribute value, or append it.
    pub fn set_attribute(&mut self, key: &str, value: impl Into<String>) {
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some((_, current)) => *current = value.into(),
            None => self.attributes.push((key.to_string(), value.into())),
        }
    }

    /// Resource path as written in the document.
    pub fn path(&self) -> Option<&str> {
        self.field("path")
    }

    /// Display name, falling back to the entity name.
    pub fn display_name(&self) -> String {
        match self.field("name") {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.entity_name(),
        }
    }

    /// Stable name of entity, i.e., file stem of its resource path.
    ///
    /// Entries without a path fall back to their display name.
    pub fn entity_name(&self) -> String {
        self.path()
            .and_then(|path| Path::new(path).file_stem())
            .map(|stem| stem.to_string_lossy().into_owned())
            .or_else(|| self.field("name").map(str::to_string))
            .unwrap_or_default()
    }

    /// Check if flag sub-record is present and `true`.
    pub fn has_flag(&self, flag: FlagToken) -> bool {
        self.field(flag.as_str())
            .is_some_and(|text| text.trim() == "true")
    }

    /// View entry for flag manipulation.
    pub fn entity<'a>(&'a mut self, journal: &'a mut Journal) -> DescriptorEntity<'a> {
        DescriptorEntity {
            name: self.entity_name(),
            entry: self,
            journal,
        }
    }
}

/// Descriptor-backed entity.
#[derive(Debug)]
pub struct DescriptorEntity<'a> {
    name: String,
    entry: &'a mut Entry,
    journal: &'a mut Journal,
}

impl FlagState for DescriptorEntity<'_> {
    fn name(&self) -> &str {
        self.name.as_str()
    }

    fn is_set(&self, flag: FlagToken) -> bool {
        self.entry.has_flag(flag)
    }

    fn set(&mut self, flag: FlagToken, value: bool) {
        if self.is_set(flag) == value {
            return;
        }

        if value {
            self.entry.set_field(flag.as_str(), "true");
        } else {
            self.entry.remove_field(flag.as_str());
        }

        self.journal.change(marked(&self.name, flag, value));
    }
}

/// Descriptor document of one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    path: PathBuf,
    root: String,
    root_attributes: Vec<(String, String)>,
    pub entries: Vec<Entry>,
}

impl Descriptor {
    /// Construct new empty descriptor at target path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            root: "gameList".into(),
            root_attributes: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Load descriptor document.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Read`] if the document cannot be read.
    /// - Return [`StoreError::ParseDescriptor`] if the document is not XML.
    /// - Return [`StoreError::Malformed`] if records nest too deep.
    #[instrument(skip(path), level = "debug")]
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = read_to_string(&path).map_err(|err| StoreError::Read {
            source: err,
            path: path.clone(),
        })?;
        Self::parse(path, &content)
    }

    /// Parse descriptor from document contents.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::ParseDescriptor`] if the document is not XML.
    /// - Return [`StoreError::Malformed`] if records nest too deep.
    pub fn parse(path: impl Into<PathBuf>, content: &str) -> Result<Self> {
        let path = path.into();
        let xml_error = |err: quick_xml::Error| StoreError::ParseDescriptor {
            source: err,
            path: path.clone(),
        };

        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);

        let mut descriptor = Self::new(path.clone());
        let mut has_root = false;
        let mut entry: Option<Entry> = None;
        let mut field: Option<Field> = None;

        loop {
            match reader.read_event().map_err(xml_error)? {
                Event::Start(start) => {
                    let name = element_name(&start);
                    let attributes = element_attributes(&start).map_err(xml_error)?;
                    if !has_root {
                        has_root = true;
                        descriptor.root = name;
                        descriptor.root_attributes = attributes;
                    } else if entry.is_none() {
                        entry = Some(Entry {
                            tag: name,
                            attributes,
                            fields: Vec::new(),
                        });
                    } else if field.is_none() {
                        field = Some(Field {
                            name,
                            attributes,
                            text: String::new(),
                        });
                    } else {
                        return Err(StoreError::Malformed {
                            path: path.clone(),
                            reason: format!("element <{name}> nested inside an entry field"),
                        });
                    }
                }
                Event::Empty(start) => {
                    let name = element_name(&start);
                    let attributes = element_attributes(&start).map_err(xml_error)?;
                    if !has_root {
                        has_root = true;
                        descriptor.root = name;
                        descriptor.root_attributes = attributes;
                    } else if field.is_some() {
                        return Err(StoreError::Malformed {
                            path: path.clone(),
                            reason: format!("element <{name}> nested inside an entry field"),
                        });
                    } else if let Some(entry) = entry.as_mut() {
                        entry.fields.push(Field {
                            name,
                            attributes,
                            text: String::new(),
                        });
                    } else {
                        descriptor.entries.push(Entry {
                            tag: name,
                            attributes,
                            fields: Vec::new(),
                        });
                    }
                }
                Event::Text(text) => {
                    if let Some(field) = field.as_mut() {
                        field.text.push_str(&text.unescape().map_err(xml_error)?);
                    }
                }
                Event::CData(data) => {
                    if let Some(field) = field.as_mut() {
                        field.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::End(_) => {
                    if let Some(done) = field.take() {
                        if let Some(entry) = entry.as_mut() {
                            entry.fields.push(done);
                        }
                    } else if let Some(done) = entry.take() {
                        descriptor.entries.push(done);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(descriptor)
    }

    /// Save descriptor, backing up the previous version first.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Backup`] if the backup cannot be written.
    /// - Return [`StoreError::Write`] if the document cannot be written.
    #[instrument(skip(self), level = "debug")]
    pub fn save(&self) -> Result<()> {
        write_with_backup(&self.path, self.to_xml_string()?)
    }

    /// Serialize descriptor to indented XML.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Xml`] or [`StoreError::Encode`] if writing
    ///   XML events fails.
    pub fn to_xml_string(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b'\t', 1);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.write_event(Event::Start(start_element(&self.root, &self.root_attributes)))?;

        for entry in &self.entries {
            let start = start_element(&entry.tag, &entry.attributes);
            if entry.fields.is_empty() {
                writer.write_event(Event::Empty(start))?;
                continue;
            }

            writer.write_event(Event::Start(start))?;
            for field in &entry.fields {
                let start = start_element(&field.name, &field.attributes);
                if field.text.is_empty() {
                    writer.write_event(Event::Empty(start))?;
                } else {
                    writer.write_event(Event::Start(start))?;
                    writer.write_event(Event::Text(BytesText::new(&field.text)))?;
                    writer.write_event(Event::End(BytesEnd::new(field.name.as_str())))?;
                }
            }
            writer.write_event(Event::End(BytesEnd::new(entry.tag.as_str())))?;
        }

        writer.write_event(Event::End(BytesEnd::new(self.root.as_str())))?;

        let mut xml = String::from_utf8_lossy(&writer.into_inner()).into_owned();
        xml.push('\n');
        Ok(xml)
    }

    /// Path to the descriptor document itself.
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Directory that entry paths are relative to.
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Resolve entry path against the descriptor directory.
    ///
    /// `.` components are dropped so `./a.zip` and `a.zip` resolve alike.
    pub fn resolve(&self, entry_path: &str) -> PathBuf {
        self.directory()
            .join(entry_path)
            .components()
            .filter(|component| !matches!(component, Component::CurDir))
            .collect()
    }

    /// Find index of entry by entity name.
    pub fn position(&self, entity_name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.entity_name() == entity_name)
    }
}

fn element_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

fn element_attributes(
    start: &BytesStart<'_>,
) -> std::result::Result<Vec<(String, String)>, quick_xml::Error> {
    start
        .attributes()
        .map(|attribute| {
            let attribute = attribute?;
            Ok((
                String::from_utf8_lossy(attribute.key.as_ref()).into_owned(),
                attribute.unescape_value()?.into_owned(),
            ))
        })
        .collect()
}

fn start_element<'a>(name: &'a str, attributes: &'a [(String, String)]) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    for (key, value) in attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    start
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use sealed_test::prelude::*;
    use simple_test_case::test_case;
    use std::fs::write;

    const GAMELIST: &str = indoc! {r#"
        <?xml version="1.0"?>
        <gameList>
            <game id="12" source="ScreenScraper.fr">
                <path>./Tetris (USA).zip</path>
                <name>Tetris</name>
                <desc>Blocks &amp;amp; lines</desc>
                <kidgame>true</kidgame>
                <favorite>false</favorite>
            </game>
            <game>
                <path>./Duck Tales (USA).zip</path>
                <name>Duck Tales</name>
                <image/>
            </game>
        </gameList>
    "#};

    #[test]
    fn parse_descriptor() -> anyhow::Result<()> {
        let descriptor = Descriptor::parse("roms/nes/gamelist.xml", GAMELIST)?;
        assert_eq!(descriptor.entries.len(), 2);

        let tetris = &descriptor.entries[0];
        assert_eq!(tetris.attribute("id"), Some("12"));
        assert_eq!(tetris.path(), Some("./Tetris (USA).zip"));
        assert_eq!(tetris.entity_name(), "Tetris (USA)");
        assert_eq!(tetris.display_name(), "Tetris");
        assert_eq!(tetris.field("desc"), Some("Blocks &amp; lines"));
        assert!(descriptor.entries[1].has_field("image"));

        Ok(())
    }

    #[test]
    fn serialize_descriptor() -> anyhow::Result<()> {
        let mut descriptor = Descriptor::new("gamelist.xml");
        let mut entry = Entry::new()
            .with_field("path", "./Tetris (USA).zip")
            .with_field("name", "Tetris & Co")
            .with_field("image", "");
        entry.set_attribute("id", "12");
        descriptor.entries.push(entry);

        let expect = indoc! {"
            <?xml version=\"1.0\" encoding=\"UTF-8\"?>
            <gameList>
            \t<game id=\"12\">
            \t\t<path>./Tetris (USA).zip</path>
            \t\t<name>Tetris &amp; Co</name>
            \t\t<image/>
            \t</game>
            </gameList>
        "};
        assert_eq!(descriptor.to_xml_string()?, expect);

        Ok(())
    }

    #[test]
    fn nested_fields_are_rejected() {
        let content = "<gameList><game><path><x>1</x></path></game></gameList>";
        let result = Descriptor::parse("gamelist.xml", content);
        assert!(matches!(result, Err(StoreError::Malformed { .. })));
    }

    #[test_case(FlagToken::Kidgame; "kidgame")]
    #[test_case(FlagToken::Favorite; "favorite")]
    #[test_case(FlagToken::Hidden; "hidden")]
    #[test]
    fn descriptor_entity_round_trip(flag: FlagToken) {
        let mut entry = Entry::new().with_field("path", "./Tetris (USA).zip");
        let mut journal = Journal::new("nes");
        let mut entity = entry.entity(&mut journal);

        entity.set(flag, true);
        assert!(entity.is_set(flag));
        entity.set(flag, true);
        entity.set(flag, false);
        assert!(!entity.is_set(flag));
        entity.set(flag, false);

        assert_eq!(journal.len(), 2);
        assert!(!entry.has_field(flag.as_str()));
    }

    #[test]
    fn false_sub_record_reads_unset_and_is_rewritten() -> anyhow::Result<()> {
        let mut descriptor = Descriptor::parse("gamelist.xml", GAMELIST)?;
        let mut journal = Journal::new("nes");
        let mut entity = descriptor.entries[0].entity(&mut journal);

        assert!(entity.is_set(FlagToken::Kidgame));
        assert!(!entity.is_set(FlagToken::Favorite));
        entity.set(FlagToken::Favorite, true);

        assert_eq!(descriptor.entries[0].field("favorite"), Some("true"));
        assert_eq!(descriptor.entries[0].fields.iter().filter(|f| f.name == "favorite").count(), 1);

        Ok(())
    }

    #[test]
    fn resolve_drops_current_dir() {
        let descriptor = Descriptor::new("roms/nes/gamelist.xml");
        assert_eq!(
            descriptor.resolve("./Tetris (USA).zip"),
            descriptor.resolve("Tetris (USA).zip")
        );
        assert_eq!(
            descriptor.resolve("./Tetris (USA).zip"),
            PathBuf::from("roms/nes/Tetris (USA).zip")
        );
    }

    #[sealed_test]
    fn save_round_trips_through_disk() -> anyhow::Result<()> {
        write("gamelist.xml", GAMELIST)?;
        let mut descriptor = Descriptor::load("gamelist.xml")?;
        descriptor.entries.pop();
        descriptor.save()?;

        let reloaded = Descriptor::load("gamelist.xml")?;
        assert_eq!(reloaded.entries, descriptor.entries);
        assert!(Path::new("gamelist-bak.xml").exists());

        Ok(())
    }
}
