//! Where the training and validation archives come from.
//!
//! [`PromptResolver`] asks on any reader/writer pair (stdin/stdout in the
//! binary, in-memory buffers in tests). [`FixedResolver`] takes paths that
//! were already given on the command line.

use std::io::{ BufRead, Write };
use std::path::{ Path, PathBuf };

use crate::error::{ Result, SrError };

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetSplit {
    Train,
    Valid,
}

impl DatasetSplit {
    /// Folder name under the extraction directory.
    pub fn dir_label(&self) -> &'static str {
        match self {
            DatasetSplit::Train => "train",
            DatasetSplit::Valid => "valid",
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            DatasetSplit::Train => "training",
            DatasetSplit::Valid => "validation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSource {
    pub archive: PathBuf,
    pub inner_folder: Option<PathBuf>,
}

pub trait PathResolver {
    fn resolve_archive(&mut self, split: DatasetSplit) -> Result<ArchiveSource>;
}

pub struct PromptResolver<R: BufRead, W: Write> {
    root: PathBuf,
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptResolver<R, W> {
    pub fn new(root: impl Into<PathBuf>, input: R, output: W) -> Self {
        Self { root: root.into(), input, output }
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(
                SrError::Io(
                    std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "input closed while waiting for a path")
                )
            );
        }
        Ok(line.trim().to_string())
    }

    fn ask_inner_folder(&mut self) -> Result<Option<PathBuf>> {
        writeln!(self.output, "Does the zip include images on root or inside folder?")?;
        let answer = self.ask("Type 1 for yes, 0 for no: ")?;
        if answer != "1" {
            return Ok(None);
        }
        let inner = self.ask("Type the path until images are seen:\n")?;
        Ok(Some(PathBuf::from(inner)))
    }
}

impl<R: BufRead, W: Write> PathResolver for PromptResolver<R, W> {
    fn resolve_archive(&mut self, split: DatasetSplit) -> Result<ArchiveSource> {
        let prompt = format!("Type in the relative path of {} data set: ", split.describe());
        let archive = loop {
            let answer = self.ask(&prompt)?;
            let candidate = self.root.join(answer);
            writeln!(self.output, "Path: {}", candidate.display())?;
            if candidate.is_file() {
                break candidate;
            }
            writeln!(self.output, "Path doesn't end with a file!")?;
        };

        let inner_folder = self.ask_inner_folder()?;
        Ok(ArchiveSource { archive, inner_folder })
    }
}

/// Paths known up front. Nothing is asked.
#[derive(Debug, Clone, Default)]
pub struct FixedResolver {
    train: Option<ArchiveSource>,
    valid: Option<ArchiveSource>,
}

impl FixedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_archive(mut self, split: DatasetSplit, archive: &Path, inner_folder: Option<&Path>) -> Self {
        let source = ArchiveSource {
            archive: archive.to_path_buf(),
            inner_folder: inner_folder.map(Path::to_path_buf),
        };
        match split {
            DatasetSplit::Train => {
                self.train = Some(source);
            }
            DatasetSplit::Valid => {
                self.valid = Some(source);
            }
        }
        self
    }
}

impl PathResolver for FixedResolver {
    fn resolve_archive(&mut self, split: DatasetSplit) -> Result<ArchiveSource> {
        let source = match split {
            DatasetSplit::Train => self.train.clone(),
            DatasetSplit::Valid => self.valid.clone(),
        };
        match source {
            Some(source) if source.archive.is_file() => Ok(source),
            Some(source) => Err(SrError::PathNotFound(source.archive)),
            None => Err(SrError::InvalidConfig(format!("no {} archive given", split.describe()))),
        }
    }
}
