use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use anyhow::{bail, Context, Result};
use globset::{GlobBuilder, GlobMatcher};
use walkdir::WalkDir;

pub const DEFAULT_FILE_GLOB: &str = "*.log*";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLine {
    pub file_index: usize,
    pub line_no: u64,
    pub text: String,
}

/// Directories expand in place to their matching files, sorted by name.
pub fn expand_inputs(paths: &[String], file_glob: Option<&str>, recursive: bool) -> Result<Vec<PathBuf>> {
    let pattern = file_glob.unwrap_or(DEFAULT_FILE_GLOB);
    let matcher: GlobMatcher = GlobBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .with_context(|| format!("invalid file glob '{}'", pattern))?
        .compile_matcher();
    let mut out = Vec::new();
    for p in paths {
        let path = Path::new(p);
        if path.is_dir() {
            let wd = if recursive { WalkDir::new(path) } else { WalkDir::new(path).max_depth(1) };
            let before = out.len();
            for de in wd.sort_by_file_name().follow_links(false) {
                let de = de.with_context(|| format!("failed to walk {}", path.display()))?;
                if !de.file_type().is_file() { continue; }
                if matcher.is_match(de.file_name()) { out.push(de.into_path()); }
            }
            if out.len() == before { log::warn!("No files matching '{}' in {}", pattern, path.display()); }
        } else if path.exists() {
            out.push(path.to_path_buf());
        } else {
            bail!("input file not found: {}", p);
        }
    }
    Ok(out)
}

pub fn read_lines(path: &Path, file_index: usize) -> Result<Vec<SourceLine>> {
    let f = std::fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut br = BufReader::new(f);
    let mut buf: Vec<u8> = Vec::new();
    let mut out = Vec::new();
    let mut idx: u64 = 0;
    loop {
        buf.clear();
        let read = br.read_until(b'\n', &mut buf).with_context(|| format!("failed to read {}", path.display()))?;
        if read == 0 { break; }
        idx += 1;
        if buf.last() == Some(&b'\n') { buf.pop(); }
        if buf.last() == Some(&b'\r') { buf.pop(); }
        out.push(SourceLine { file_index, line_no: idx, text: String::from_utf8_lossy(&buf).into_owned() });
    }
    Ok(out)
}
