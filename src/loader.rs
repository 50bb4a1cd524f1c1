//! Load character history scripts spread over many files.
//!
//! Every file is parsed on the rayon pool with its own lexer and parser.
//! Parsed characters are handed back to the calling thread, which inserts
//! them in file order so the resulting collection does not depend on which
//! task finished first.

use crate::errors::{Error, ErrorKind, LoadStage};
use crate::model::{rebuild_children, BuildContext, Character, Collection, DroppedEntity};
use crate::text::{IgnoredKeys, Parser, Pattern, UnregisteredPolicy};
use rayon::prelude::*;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What to do when one file of a batch fails to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "derive", derive(serde::Deserialize))]
#[cfg_attr(feature = "derive", serde(rename_all = "lowercase"))]
pub enum BatchPolicy {
    /// Fail the whole batch with the first error in file order
    #[default]
    Abort,

    /// Log the failure, record the file as skipped, and keep going
    Skip,
}

/// Characters from a batch of history files
#[derive(Debug, Clone, Default)]
pub struct HistoryLoad {
    pub characters: Collection<Character>,

    /// Characters left out for lacking a birth entry
    pub dropped: Vec<DroppedEntity>,

    /// Files that failed under [`BatchPolicy::Skip`]
    pub skipped: Vec<PathBuf>,

    /// Keys without a handler, when collected
    pub ignored: IgnoredKeys,
}

/// Loads character history files concurrently.
///
/// ```no_run
/// use rome_loader::{BatchPolicy, HistoryLoader};
///
/// let load = HistoryLoader::new()
///     .batch_policy(BatchPolicy::Skip)
///     .load_dir("common/characters")
///     .unwrap();
/// println!("{} characters", load.characters.len());
/// ```
#[derive(Debug, Clone, Default)]
pub struct HistoryLoader {
    batch: BatchPolicy,
    unregistered: UnregisteredPolicy,
}

impl HistoryLoader {
    /// A loader that aborts on the first failing file
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how a failing file is treated
    pub fn batch_policy(mut self, batch: BatchPolicy) -> Self {
        self.batch = batch;
        self
    }

    /// Set how keys without a handler are treated
    pub fn unregistered(mut self, unregistered: UnregisteredPolicy) -> Self {
        self.unregistered = unregistered;
        self
    }

    /// Load every `.txt` file under the directory, recursively, in sorted
    /// path order
    pub fn load_dir<P: AsRef<Path>>(&self, dir: P) -> Result<HistoryLoad, Error> {
        let mut paths = Vec::new();
        collect_scripts(dir.as_ref(), &mut paths)?;
        paths.sort();
        self.load_files(&paths)
    }

    /// Load the files. Characters are inserted in the order of `paths`.
    pub fn load_files(&self, paths: &[PathBuf]) -> Result<HistoryLoad, Error> {
        info!("Loading character history from {} files...", paths.len());
        let policy = self.unregistered;
        let parsed: Vec<_> = paths
            .par_iter()
            .map(|path| parse_file(path, policy))
            .collect();

        let mut load = HistoryLoad::default();
        let mut ctx = BuildContext::new(policy);
        for (path, result) in paths.iter().zip(parsed) {
            let (characters, file_ctx) = match result {
                Ok(x) => x,
                Err(e) if self.batch == BatchPolicy::Skip => {
                    warn!("skipping {}: {}", path.display(), e);
                    load.skipped.push(path.clone());
                    continue;
                }
                Err(e) => return Err(e),
            };

            for character in characters {
                load.characters.insert(character).map_err(|e| file_error(path, e))?;
            }
            ctx.merge(file_ctx);
        }

        let edges = rebuild_children(&mut load.characters);
        let (dropped, ignored) = ctx.into_parts();
        load.dropped = dropped;
        load.ignored = ignored;
        info!(
            "Loaded {} characters with {} parent child links, {} dropped, {} files skipped.",
            load.characters.len(),
            edges,
            load.dropped.len(),
            load.skipped.len()
        );
        Ok(load)
    }
}

fn file_error(path: &Path, cause: Error) -> Error {
    Error::new(ErrorKind::File {
        path: path.to_path_buf(),
        cause,
    })
}

fn parse_file(
    path: &Path,
    policy: UnregisteredPolicy,
) -> Result<(Vec<Character>, BuildContext), Error> {
    let data = fs::read(path).map_err(|e| file_error(path, Error::io(LoadStage::Parse, e)))?;
    parse_history(&data, policy).map_err(|e| file_error(path, e))
}

/// Parse the characters of one history script:
/// `<id> = { name = .. 350.1.1 = { birth = yes } }`
pub fn parse_history(
    data: &[u8],
    policy: UnregisteredPolicy,
) -> Result<(Vec<Character>, BuildContext), Error> {
    let ctx = RefCell::new(BuildContext::new(policy));
    let characters = RefCell::new(Vec::new());
    let mut parser = Parser::with_policy(policy);
    parser.register(Pattern::AnyUnsigned, |key, v| {
        let id = key.read_u64()?;
        if let Some(character) = Character::parse_history(id, v, &mut ctx.borrow_mut())? {
            characters.borrow_mut().push(character);
        }
        Ok(())
    });

    let ignored = parser.parse_slice(data)?;
    let mut ctx = ctx.into_inner();
    ctx.ignore(ignored);
    Ok((characters.into_inner(), ctx))
}

fn collect_scripts(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<(), Error> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(LoadStage::Parse, e))?;
    for entry in entries {
        let path = entry.map_err(|e| Error::io(LoadStage::Parse, e))?.path();
        if path.is_dir() {
            collect_scripts(&path, paths)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("txt") {
            paths.push(path);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_history_drops_unborn() {
        let (characters, ctx) = parse_history(
            br#"
            1 = { name = "Alaric" 350.1.1 = { birth = yes } }
            2 = { name = "Ghost" }
            notes = { text = "ignored" }
            "#,
            UnregisteredPolicy::Collect,
        )
        .unwrap();

        assert_eq!(characters.len(), 1);
        assert_eq!(characters[0].id, 1);
        assert_eq!(ctx.dropped().len(), 1);
        assert!(ctx.ignored().contains("notes"));
    }

    #[test]
    fn test_missing_file_is_wrapped() {
        let err = HistoryLoader::new()
            .load_files(&[PathBuf::from("does/not/exist.txt")])
            .unwrap_err();
        match err.kind() {
            ErrorKind::File { path, cause } => {
                assert_eq!(path, Path::new("does/not/exist.txt"));
                assert!(matches!(cause.kind(), ErrorKind::Io { .. }));
            }
            kind => panic!("unexpected error {:?}", kind),
        }
    }

    #[test]
    fn test_skip_missing_file() {
        let load = HistoryLoader::new()
            .batch_policy(BatchPolicy::Skip)
            .load_files(&[PathBuf::from("does/not/exist.txt")])
            .unwrap();
        assert!(load.characters.is_empty());
        assert_eq!(load.skipped, vec![PathBuf::from("does/not/exist.txt")]);
    }
}
