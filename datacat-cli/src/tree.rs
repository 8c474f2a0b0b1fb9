use std::{io, path::Path};

const SPACE: &str = "    ";
const BRANCH: &str = "│   ";
const TEE: &str = "├── ";
const LAST: &str = "└── ";

#[derive(Debug, Clone)]
pub struct TreeOptions {
    /// Maximum depth to descend, `None` for no limit.
    pub level: Option<usize>,
    pub limit_to_directories: bool,
    /// Maximum number of entry lines printed.
    pub length_limit: usize,
    pub show_hidden: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            level: None,
            limit_to_directories: false,
            length_limit: 1000,
            show_hidden: false,
        }
    }
}

struct Walker<'a> {
    options: &'a TreeOptions,
    lines: Vec<String>,
    directories: usize,
    files: usize,
    truncated: bool,
}

impl Walker<'_> {
    fn walk(&mut self, dir: &Path, prefix: &str, depth: usize) -> io::Result<()> {
        if self.options.level.is_some_and(|level| depth >= level) {
            return Ok(());
        }

        let mut entries = std::fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
        if !self.options.show_hidden {
            entries.retain(|e| !e.file_name().to_string_lossy().starts_with('.'));
        }
        if self.options.limit_to_directories {
            entries.retain(|e| e.path().is_dir());
        }
        entries.sort_by_key(|e| e.file_name());

        let count = entries.len();
        for (idx, entry) in entries.iter().enumerate() {
            if self.lines.len() >= self.options.length_limit {
                self.truncated = true;
                return Ok(());
            }
            let last = idx + 1 == count;
            let pointer = if last { LAST } else { TEE };
            self.lines.push(format!(
                "{}{}{}",
                prefix,
                pointer,
                entry.file_name().to_string_lossy()
            ));

            let path = entry.path();
            if path.is_dir() {
                self.directories += 1;
                let extension = if last { SPACE } else { BRANCH };
                self.walk(&path, &format!("{}{}", prefix, extension), depth + 1)?;
            } else {
                self.files += 1;
            }
        }
        Ok(())
    }
}

/// Render `dir` as an indented tree followed by a directory/file count.
pub fn tree(dir: &Path, options: &TreeOptions) -> io::Result<String> {
    let mut walker = Walker {
        options,
        lines: Vec::new(),
        directories: 0,
        files: 0,
        truncated: false,
    };
    walker.walk(dir, "", 0)?;

    let root = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string());

    let mut out = vec![root];
    out.extend(walker.lines);
    if walker.truncated {
        out.push(format!(
            "... length_limit, {}, reached, counted:",
            options.length_limit
        ));
    }
    out.push(String::new());
    let mut summary = format!("{} directories", walker.directories);
    if walker.files > 0 {
        summary.push_str(&format!(", {} files", walker.files));
    }
    out.push(summary);
    Ok(out.join("\n"))
}
