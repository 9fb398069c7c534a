//! Filesystem actors: discovery, reading, and verbatim copying.

/// A source file pulled into memory, with its path relative to the root it
/// was found under.
pub(crate) struct SourceFile {
    pub(crate) path: PathBuf,
    pub(crate) bytes: Vec<u8>,
}

const READ_WORKERS: usize = 4;
const COPY_WORKERS: usize = 4;

/// Breadth-first traversal of `root`, emitting one matching file path per
/// producer call. Single worker: the worklist is plain mutable state.
pub(crate) fn finder(
    name: &'static str,
    root: PathBuf,
    suffix: &'static str,
    output: Tx<PathBuf>,
) -> impl Actor {
    let mut dirs = VecDeque::from([PathBuf::new()]);
    let mut entries: VecDeque<(PathBuf, bool)> = VecDeque::new();
    actor::source(name, 1, output, move |stop| loop {
        while let Some((path, is_dir)) = entries.pop_front() {
            if is_dir {
                dirs.push_back(path);
            } else if suffix.is_empty() || path.to_string_lossy().ends_with(suffix) {
                return Ok(Some(path));
            }
        }

        let Some(dir) = dirs.pop_front() else {
            return Ok(None);
        };
        stop.check()?;
        let abs = root.join(&dir);
        let listing = fs::read_dir(&abs)
            .with_context(|| format!("failed to read directory `{}`", abs.display()))?;
        for entry in listing {
            let entry = entry
                .with_context(|| format!("failed to read directory `{}`", abs.display()))?;
            let file_type = entry.file_type().with_context(|| {
                format!("failed to stat `{}`", entry.path().display())
            })?;
            entries.push_back((dir.join(entry.file_name()), file_type.is_dir()));
        }
    })
}

/// Reads each received path under `root` whole into memory.
pub(crate) fn reader(
    name: &'static str,
    root: PathBuf,
    input: Rx<PathBuf>,
    output: Tx<SourceFile>,
) -> impl Actor {
    actor::map(name, READ_WORKERS, input, output, move |stop, path: PathBuf| {
        let abs = root.join(&path);
        let bytes = read_all(stop, &abs)
            .with_context(|| format!("failed to read file `{}`", abs.display()))?;
        log::debug!("read {}", abs.display());
        Ok(SourceFile { path, bytes })
    })
}

/// Streams each received path from under `src_root` to the same relative
/// location under `dest_root`, creating parent directories on demand.
pub(crate) fn copier(
    name: &'static str,
    src_root: PathBuf,
    dest_root: PathBuf,
    input: Rx<PathBuf>,
) -> impl Actor {
    actor::sink(name, COPY_WORKERS, input, move |stop, path: PathBuf| {
        let src = src_root.join(&path);
        let dest = dest_root.join(&path);
        copy(stop, &src, &dest).with_context(|| {
            format!("failed to copy `{}` to `{}`", src.display(), dest.display())
        })?;
        log::info!("copied {}", dest.display());
        Ok(())
    })
}

fn read_all(stop: &Stop, path: &Path) -> anyhow::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut bytes = Vec::new();
    let mut buf = [0_u8; 64 * 1024];
    loop {
        stop.check()?;
        let n = file.read(&mut buf)?;
        if n == 0 {
            return Ok(bytes);
        }
        bytes.extend_from_slice(&buf[..n]);
    }
}

fn copy(stop: &Stop, src: &Path, dest: &Path) -> anyhow::Result<()> {
    let mut from = File::open(src)?;
    make_parents(dest)?;
    let mut to = File::create(dest)?;
    let mut buf = [0_u8; 64 * 1024];
    loop {
        stop.check()?;
        let n = from.read(&mut buf)?;
        if n == 0 {
            return Ok(());
        }
        to.write_all(&buf[..n])?;
    }
}


use crate::actor;
use crate::actor::Actor;
use crate::actor::Rx;
use crate::actor::Stop;
use crate::actor::Tx;
use crate::util::make_parents;
use anyhow::Context as _;
use std::collections::VecDeque;
use std::fs;
use std::fs::File;
use std::io::Read;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;
