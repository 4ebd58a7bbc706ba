//! Fixtures and hand-written test doubles shared by the integration tests.
#![allow(dead_code)]

use std::cell::Cell;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use xml_conformance::acquisition::{Acquired, InputSource, PathPicker};
use xml_conformance::error::{ConformanceError, Result};
use xml_conformance::{Console, PreferenceStore, XmlValidator};

pub const SIMPLE_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    <xs:element name="root">
        <xs:complexType>
            <xs:sequence>
                <xs:element name="element" type="xs:string"/>
            </xs:sequence>
        </xs:complexType>
    </xs:element>
</xs:schema>"#;

/// Document referencing `schema` through `xsi:noNamespaceSchemaLocation`
pub fn document(schema: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<root xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
      xsi:noNamespaceSchemaLocation="{}">
    {}
</root>
"#,
        schema, body
    )
}

pub fn valid_document() -> String {
    document("test.xsd", "<element>content</element>")
}

pub fn invalid_document() -> String {
    document("test.xsd", "<unexpected>content</unexpected>")
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Console writing into memory, without colours or cursor control
pub fn buffer_console() -> Console<Vec<u8>> {
    Console::new(Vec::new(), false, false)
}

pub fn console_text(console: Console<Vec<u8>>) -> String {
    String::from_utf8(console.into_inner()).unwrap()
}

/// Validator that records every call and fails files by name
#[derive(Clone, Default)]
pub struct RecordingValidator {
    calls: Arc<Mutex<Vec<(PathBuf, String)>>>,
    failing: HashSet<String>,
}

impl RecordingValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(names: &[&str]) -> Self {
        Self {
            failing: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(PathBuf, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn validated_names(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter_map(|(path, _)| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect()
    }
}

#[async_trait]
impl XmlValidator for RecordingValidator {
    async fn validate(&self, file: &Path, version_info: &str) -> bool {
        self.calls
            .lock()
            .unwrap()
            .push((file.to_path_buf(), version_info.to_string()));

        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        !self.failing.contains(&name)
    }
}

/// Input source replaying a fixed script of responses
pub struct ScriptedInput {
    responses: VecDeque<Acquired>,
    pub acquisitions: usize,
}

impl ScriptedInput {
    pub fn new(responses: Vec<Acquired>) -> Self {
        Self {
            responses: responses.into(),
            acquisitions: 0,
        }
    }

    pub fn lines(lines: &[&[&str]]) -> Self {
        Self::new(
            lines
                .iter()
                .map(|tokens| Acquired::Tokens(tokens.iter().map(PathBuf::from).collect()))
                .collect(),
        )
    }
}

impl InputSource for ScriptedInput {
    fn prompt(&self) -> Option<String> {
        Some("paths>".to_string())
    }

    fn acquire(&mut self) -> Acquired {
        self.acquisitions += 1;
        self.responses.pop_front().unwrap_or(Acquired::Cancelled)
    }
}

/// Picker returning queued selections and recording the initial paths it was given
#[derive(Default)]
pub struct ScriptedPicker {
    picks: Mutex<VecDeque<Option<Vec<PathBuf>>>>,
    pub initials: Mutex<Vec<Option<PathBuf>>>,
}

impl ScriptedPicker {
    pub fn new(picks: Vec<Option<Vec<PathBuf>>>) -> Self {
        Self {
            picks: Mutex::new(picks.into()),
            initials: Mutex::new(Vec::new()),
        }
    }
}

impl PathPicker for ScriptedPicker {
    fn pick(&self, initial: Option<PathBuf>) -> Option<Vec<PathBuf>> {
        self.initials.lock().unwrap().push(initial);
        self.picks.lock().unwrap().pop_front().flatten()
    }
}

/// In-memory preference store that can be told to fail on save
#[derive(Default)]
pub struct MemoryPreferences {
    pub last: Option<PathBuf>,
    pub saves: Cell<usize>,
    pub fail_saves: bool,
}

impl PreferenceStore for MemoryPreferences {
    fn last_selection(&self) -> Option<PathBuf> {
        self.last.clone()
    }

    fn set_last_selection(&mut self, path: &Path) {
        self.last = Some(path.to_path_buf());
    }

    fn save(&self) -> Result<()> {
        if self.fail_saves {
            return Err(ConformanceError::Preferences("read-only store".to_string()));
        }
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}
