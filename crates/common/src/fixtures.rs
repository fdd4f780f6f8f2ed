//! Test fixtures: canned questions and uploadable documents

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{Error, Result};

const BUILTIN_QUESTIONS: &str = include_str!("../fixtures/questions.yaml");

const MIB: u64 = 1024 * 1024;

/// A question posed to the chat, with the keywords a relevant answer uses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Question {
    /// First keyword found in `answer`, if any
    pub fn matches<'a>(&'a self, answer: &str) -> Option<&'a str> {
        keyword_match(answer, &self.keywords)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSet {
    pub questions: Vec<Question>,
}

impl QuestionSet {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FixtureNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// The five canonical questions shipped with the suite
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_QUESTIONS)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }
}

/// Case-insensitive soft match: the first keyword contained in `text`
pub fn keyword_match<'a, S: AsRef<str>>(text: &str, keywords: &'a [S]) -> Option<&'a str> {
    let haystack = text.to_lowercase();
    keywords
        .iter()
        .map(AsRef::as_ref)
        .find(|k| !k.is_empty() && haystack.contains(&k.to_lowercase()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureKind {
    Default,
    MultiVariety,
    MultiFormat,
    Large,
    Unsupported,
}

/// One uploadable document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFixture {
    pub name: String,
    pub path: PathBuf,
    pub kind: FixtureKind,
}

impl FileFixture {
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// Resolves fixture names against the resources directory
#[derive(Debug, Clone)]
pub struct FileFixtures {
    resources_dir: PathBuf,
}

impl FileFixtures {
    pub const DEFAULT_FILE: &'static str = "sample1.txt";
    pub const MULTI_VARIETY: [&'static str; 2] = ["sample1.txt", "sample2.txt"];
    pub const MULTI_FORMAT: [&'static str; 4] =
        ["sample1.txt", "sample1.pdf", "sample1.docx", "sample1.png"];
    pub const UNSUPPORTED_FILE: &'static str = "malicious.exe";
    pub const LARGE_FILE: &'static str = "large_test_file_60mb.txt";
    pub const LARGE_FILE_MB: u64 = 60;

    pub fn new(resources_dir: impl Into<PathBuf>) -> Self {
        Self {
            resources_dir: resources_dir.into(),
        }
    }

    pub fn resources_dir(&self) -> &Path {
        &self.resources_dir
    }

    fn fixture(&self, name: &str, kind: FixtureKind) -> FileFixture {
        FileFixture {
            name: name.to_string(),
            path: self.resources_dir.join(name),
            kind,
        }
    }

    pub fn default_file(&self) -> FileFixture {
        self.fixture(Self::DEFAULT_FILE, FixtureKind::Default)
    }

    pub fn multi_variety(&self) -> Vec<FileFixture> {
        Self::MULTI_VARIETY
            .iter()
            .map(|name| self.fixture(name, FixtureKind::MultiVariety))
            .collect()
    }

    pub fn multi_format(&self) -> Vec<FileFixture> {
        Self::MULTI_FORMAT
            .iter()
            .map(|name| self.fixture(name, FixtureKind::MultiFormat))
            .collect()
    }

    /// Disallowed format. May be absent on disk; callers branch on that.
    pub fn unsupported(&self) -> FileFixture {
        self.fixture(Self::UNSUPPORTED_FILE, FixtureKind::Unsupported)
    }

    /// Generate (or reuse) the large upload fixture inside `dir`
    pub fn large(&self, dir: &Path) -> Result<FileFixture> {
        let path = generate_large_file(dir, Self::LARGE_FILE, Self::LARGE_FILE_MB)?;
        Ok(FileFixture {
            name: Self::LARGE_FILE.to_string(),
            path,
            kind: FixtureKind::Large,
        })
    }
}

/// Write a text file of exactly `size_mb` MiB. An existing file of the right
/// size is reused.
pub fn generate_large_file(dir: &Path, name: &str, size_mb: u64) -> Result<PathBuf> {
    let path = dir.join(name);
    let target = size_mb * MIB;

    if let Ok(meta) = std::fs::metadata(&path) {
        if meta.is_file() && meta.len() == target {
            info!("Reusing large fixture {} ({} MiB)", path.display(), size_mb);
            return Ok(path);
        }
    }

    std::fs::create_dir_all(dir)?;
    info!("Generating large fixture {} ({} MiB)", path.display(), size_mb);

    let line = b"ragcheck large upload fixture line - lorem ipsum dolor sit amet\n";
    let mut chunk = Vec::with_capacity(MIB as usize);
    while chunk.len() < MIB as usize {
        let take = line.len().min(MIB as usize - chunk.len());
        chunk.extend_from_slice(&line[..take]);
    }

    let mut writer = BufWriter::new(File::create(&path)?);
    for _ in 0..size_mb {
        writer.write_all(&chunk)?;
    }
    writer.flush()?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_questions() {
        let set = QuestionSet::builtin().unwrap();
        assert_eq!(set.len(), 5);
        assert_eq!(set.questions[0].text, "Summarize the document in one sentence.");
        assert!(set.iter().all(|q| q.keywords.len() == 3));
    }

    #[test]
    fn test_keyword_match_ignores_case() {
        let keywords = ["summary", "overview", "purpose"];
        assert_eq!(keyword_match("The PURPOSE of this file is...", &keywords), Some("purpose"));
        assert_eq!(keyword_match("An Overview and a summary", &keywords), Some("summary"));
        assert_eq!(keyword_match("Nothing relevant here", &keywords), None);
    }

    #[test]
    fn test_keyword_match_empty_list_never_matches() {
        let keywords: [&str; 0] = [];
        assert_eq!(keyword_match("anything", &keywords), None);
        assert_eq!(keyword_match("anything", &[""]), None);
    }

    #[test]
    fn test_question_from_yaml() {
        let set = QuestionSet::from_yaml(
            r#"
questions:
  - text: Who wrote it?
    keywords: [Author]
  - text: No keywords
"#,
        )
        .unwrap();
        assert_eq!(set.questions[0].matches("the author is unknown"), Some("Author"));
        assert!(set.questions[1].keywords.is_empty());
    }

    #[test]
    fn test_missing_question_file() {
        let err = QuestionSet::from_file(Path::new("/nonexistent/questions.yaml")).unwrap_err();
        assert!(matches!(err, Error::FixtureNotFound { .. }));
    }

    #[test]
    fn test_fixture_paths() {
        let fixtures = FileFixtures::new("/srv/resources");
        assert_eq!(fixtures.default_file().path, PathBuf::from("/srv/resources/sample1.txt"));
        let formats: Vec<String> = fixtures.multi_format().into_iter().map(|f| f.name).collect();
        assert_eq!(formats, ["sample1.txt", "sample1.pdf", "sample1.docx", "sample1.png"]);
        assert_eq!(fixtures.unsupported().kind, FixtureKind::Unsupported);
        assert!(!fixtures.unsupported().exists());
    }

    #[test]
    fn test_generate_large_file_exact_size() {
        let tmp = TempDir::new().unwrap();
        let path = generate_large_file(tmp.path(), "big.txt", 2).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 2 * MIB);
    }

    #[test]
    fn test_generate_large_file_replaces_wrong_size() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("big.txt");
        std::fs::write(&path, b"short").unwrap();

        generate_large_file(tmp.path(), "big.txt", 1).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), MIB);
    }
}
