use crate::error::{Result, SignalError};
use crate::language::Language;
use crate::normalize::{normalize, NormalizedFile};
use crate::source::{FileRecord, SourceFile, SourceSet};
use std::collections::HashMap;
use tree_sitter::{Parser, Tree};

/// One file ready for the analyzers: syntax tree plus normalized corpus.
pub struct IndexedFile {
    pub record: FileRecord,
    pub language: Language,
    pub content: String,
    /// `None` when the language has no grammar or parsing failed
    pub tree: Option<Tree>,
    pub normalized: NormalizedFile,
}

/// Parses and normalizes sources. Pure with respect to file content.
#[derive(Default)]
pub struct SourceIndexer {
    parsers: HashMap<Language, Parser>,
}

impl SourceIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&mut self, sources: &SourceSet) -> Vec<IndexedFile> {
        let files: Vec<IndexedFile> = sources.files().iter().map(|f| self.index_file(f)).collect();
        log::debug!("Indexed {} files", files.len());
        files
    }

    pub fn index_file(&mut self, file: &SourceFile) -> IndexedFile {
        let language = Language::from_path(&file.record.path);
        let tree = if language.supports_ast() {
            match self.parse(&file.content, language) {
                Ok(tree) => Some(tree),
                Err(e) => {
                    log::warn!("Structural analysis skipped for {}: {e}", file.record.path);
                    None
                }
            }
        } else {
            None
        };

        IndexedFile {
            record: file.record.clone(),
            language,
            content: file.content.clone(),
            tree,
            normalized: normalize(&file.record.path, &file.content, language),
        }
    }

    fn parse(&mut self, content: &str, language: Language) -> Result<Tree> {
        let parser = match self.parsers.entry(language) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                let ts_language = language.tree_sitter_language()?;
                let mut parser = Parser::new();
                parser.set_language(&ts_language).map_err(|e| {
                    SignalError::tree_sitter(format!("Failed to set language: {e}"))
                })?;
                entry.insert(parser)
            }
        };

        parser
            .parse(content, None)
            .ok_or_else(|| SignalError::parse("Failed to parse source code"))
    }
}
