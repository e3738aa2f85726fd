//! A flat, multi-file position space for compile and runtime diagnostics.
//!
//! Every source file added to a [`FileSet`] is assigned a disjoint range of
//! the global `u32` position space; a bare [`Pos`] can therefore be resolved
//! back to `(file, line, column)` without carrying a file handle alongside
//! it everywhere. This is the same shape as the "FileSet descriptor"
//! referenced by the bytecode container and by `RuntimeError` trace frames.

use serde::{Deserialize, Serialize};

/// A position in the file set's global offset space. `Pos(0)` means "no
/// position known".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pos(pub u32);

pub const NO_POS: Pos = Pos(0);

impl Pos {
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHandle(usize);

#[derive(Debug, Clone)]
struct SourceFile {
    name: String,
    base: u32,
    size: u32,
    line_starts: Vec<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct FileSet {
    files: Vec<SourceFile>,
    next_base: u32,
}

impl FileSet {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            next_base: 1,
        }
    }

    /// Registers a source file's raw bytes (UTF-8) and returns a handle used
    /// to turn local byte offsets into global [`Pos`] values.
    pub fn add_file(&mut self, name: impl Into<String>, content: &str) -> FileHandle {
        let size = content.len() as u32;
        let mut line_starts = vec![0u32];
        for (i, c) in content.char_indices() {
            if c == '\n' {
                line_starts.push((i + 1) as u32);
            }
        }
        let base = self.next_base;
        self.files.push(SourceFile {
            name: name.into(),
            base,
            size,
            line_starts,
        });
        // +1 keeps file ranges disjoint even for empty files, so Pos 0
        // unambiguously means "none".
        self.next_base = base + size + 1;
        FileHandle(self.files.len() - 1)
    }

    pub fn pos(&self, handle: FileHandle, local_offset: u32) -> Pos {
        Pos(self.files[handle.0].base + local_offset)
    }

    /// The base offset assigned to `handle`, for callers (the compiler)
    /// that want to compute `Pos` values without holding a `FileSet`
    /// reference for the lifetime of the computation.
    pub fn base_of(&self, handle: FileHandle) -> u32 {
        self.files[handle.0].base
    }

    pub fn file_name(&self, handle: FileHandle) -> &str {
        &self.files[handle.0].name
    }

    pub fn resolve(&self, pos: Pos) -> Option<ResolvedPosition> {
        if !pos.is_valid() {
            return None;
        }
        let idx = self.files.partition_point(|f| f.base <= pos.0);
        if idx == 0 {
            return None;
        }
        let file = &self.files[idx - 1];
        let local = pos.0.checked_sub(file.base)?;
        if local > file.size {
            return None;
        }
        let line_idx = match file.line_starts.binary_search(&local) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let line = line_idx as u32 + 1;
        let column = local - file.line_starts[line_idx] + 1;
        Some(ResolvedPosition {
            file: file.name.clone(),
            line,
            column,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPosition {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl std::fmt::Display for ResolvedPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_positions_across_two_files() {
        let mut fs = FileSet::new();
        let a = fs.add_file("a.ql", "abc\ndef");
        let b = fs.add_file("b.ql", "xyz");

        let pos_a = fs.pos(a, 5); // 'e' on line 2
        let resolved = fs.resolve(pos_a).unwrap();
        assert_eq!(resolved.file, "a.ql");
        assert_eq!(resolved.line, 2);
        assert_eq!(resolved.column, 2);

        let pos_b = fs.pos(b, 0);
        let resolved_b = fs.resolve(pos_b).unwrap();
        assert_eq!(resolved_b.file, "b.ql");
        assert_eq!(resolved_b.line, 1);
    }

    #[test]
    fn zero_pos_resolves_to_none() {
        let fs = FileSet::new();
        assert!(fs.resolve(NO_POS).is_none());
    }
}
