//! Per-engine expected text (error fragments, plans).
//!
//! Engines phrase the same logical failure differently and render plans in
//! different formats, so a single test body carries one expectation per
//! engine. An absent or blank entry is an explicit skip.

use std::collections::BTreeMap;

use fathom_common::EngineKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation<'a> {
    Check(&'a str),
    Skip,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineExpectations {
    entries: BTreeMap<EngineKind, String>,
}

impl EngineExpectations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same expected text for every engine.
    pub fn all(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            entries: EngineKind::ALL
                .into_iter()
                .map(|engine| (engine, text.clone()))
                .collect(),
        }
    }

    pub fn with(mut self, engine: EngineKind, text: impl Into<String>) -> Self {
        self.entries.insert(engine, text.into());
        self
    }

    pub fn embedded(self, text: impl Into<String>) -> Self {
        self.with(EngineKind::Embedded, text)
    }

    pub fn distributed(self, text: impl Into<String>) -> Self {
        self.with(EngineKind::Distributed, text)
    }

    pub fn skip(mut self, engine: EngineKind) -> Self {
        self.entries.remove(&engine);
        self
    }

    pub fn for_engine(&self, engine: EngineKind) -> Expectation<'_> {
        match self.entries.get(&engine) {
            Some(text) if !text.trim().is_empty() => Expectation::Check(text.as_str()),
            _ => Expectation::Skip,
        }
    }
}
