// src/condition/file_hash.rs

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use blake3::Hasher;
use tracing::{debug, warn};

use crate::condition::Condition;
use crate::errors::Result;

/// Content-hash history of files across runs.
///
/// The database is a plain text file of `path <whitespace> hex_hash` lines.
/// `changed` answers "has this file's content changed since the database was
/// last written?" and memoizes its answers so repeated queries within a run
/// agree. Call [`write`](Self::write) after a successful run to persist the
/// current hashes.
pub struct FileHashDatabase {
    path: PathBuf,
    inner: Mutex<DbState>,
}

struct DbState {
    /// Hashes read in from the database (previous run).
    hashes: HashMap<PathBuf, String>,
    /// Files to be hashed on the next `write`.
    files: HashSet<PathBuf>,
    /// Memo of files already judged as changed this run.
    changed: HashSet<PathBuf>,
}

impl FileHashDatabase {
    pub fn load(path: impl Into<PathBuf>) -> Result<Arc<Self>> {
        let path = path.into();
        let mut hashes = HashMap::new();

        if path.is_file() {
            let reader = BufReader::new(File::open(&path)?);
            for line in reader.lines() {
                let line = line?;
                let mut words = line.split_whitespace();
                match (words.next(), words.next()) {
                    (Some(file), Some(hash)) => {
                        hashes.insert(PathBuf::from(file), hash.to_string());
                    }
                    _ => warn!(db = %path.display(), line = %line, "skipping malformed line"),
                }
            }
        }

        let files = hashes.keys().cloned().collect();
        Ok(Arc::new(Self {
            path,
            inner: Mutex::new(DbState {
                hashes,
                files,
                changed: HashSet::new(),
            }),
        }))
    }

    fn lock(&self) -> MutexGuard<'_, DbState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether the file's content differs from what the database remembers.
    /// Unknown files count as changed and are tracked from now on.
    pub fn changed(&self, file: impl AsRef<Path>) -> bool {
        let file = file.as_ref();
        let mut st = self.lock();

        if st.changed.contains(file) {
            return true;
        }

        let changed = match st.hashes.get(file) {
            None => {
                st.files.insert(file.to_path_buf());
                true
            }
            Some(previous) => match hash_file(file) {
                Ok(current) => current != *previous,
                Err(e) => {
                    debug!(file = %file.display(), error = %e, "hashing failed; treating as changed");
                    true
                }
            },
        };

        if changed {
            st.changed.insert(file.to_path_buf());
        }
        changed
    }

    /// Re-hash every tracked file and write the database out.
    pub fn write(&self) -> Result<()> {
        let st = self.lock();
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(&self.path)?);
        for file in &st.files {
            match hash_file(file) {
                Ok(hash) => writeln!(out, "{} {}", file.display(), hash)?,
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "skipping unhashable file")
                }
            }
        }
        out.flush()?;
        debug!(db = %self.path.display(), files = st.files.len(), "hash database written");
        Ok(())
    }
}

fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut hasher = Hasher::new();
    let mut file = File::open(path)?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Bypass condition driven by a [`FileHashDatabase`].
///
/// The task runs if any output file is missing or any input file's content
/// has changed. Every input is always queried, never short-circuited, so the
/// database tracks all of them for the next run.
pub struct FileHashCondition {
    db: Arc<FileHashDatabase>,
    inputs: Vec<PathBuf>,
    outputs: Vec<PathBuf>,
}

impl FileHashCondition {
    pub fn new<I, O, P, Q>(db: Arc<FileHashDatabase>, inputs: I, outputs: O) -> Self
    where
        I: IntoIterator<Item = P>,
        O: IntoIterator<Item = Q>,
        P: Into<PathBuf>,
        Q: Into<PathBuf>,
    {
        Self {
            db,
            inputs: inputs.into_iter().map(Into::into).collect(),
            outputs: outputs.into_iter().map(Into::into).collect(),
        }
    }
}

impl Condition for FileHashCondition {
    fn check(&self) -> bool {
        let mut run = false;
        for output in &self.outputs {
            if !output.is_file() {
                run = true;
            }
        }
        for input in &self.inputs {
            if self.db.changed(input) {
                run = true;
            }
        }
        run
    }
}
