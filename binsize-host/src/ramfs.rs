//! Bounded in-memory file tree used to stage run logs.

use std::mem;

use thiserror::Error;

/// Longest file or directory name accepted, in bytes.
pub const MAX_NAME_LEN: usize = 100;

/// Longest file content accepted, in bytes, including the trailing newline.
pub const MAX_CONTENT_LEN: usize = 1000;

/// Most files one directory will hold.
pub const MAX_FILES_PER_DIR: usize = 100;

/// Most subdirectories one directory will hold.
pub const MAX_DIRS_PER_DIR: usize = 100;

/// Prefix stamped on every cached log line.
pub const LOG_MARKER: &str = "[*]";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RamFsError {
    #[error("name is {len} bytes, limit is {}", MAX_NAME_LEN)]
    NameTooLong { len: usize },

    #[error("content is {len} bytes, limit is {}", MAX_CONTENT_LEN)]
    ContentTooLong { len: usize },

    #[error("directory already holds {} files", MAX_FILES_PER_DIR)]
    FileTableFull,

    #[error("directory already holds {} subdirectories", MAX_DIRS_PER_DIR)]
    DirTableFull,

    #[error("access to {name:?} denied")]
    PermissionDenied { name: String },
}

/// Access level attached to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilePermissions {
    /// Readable and writable.
    #[default]
    Available,
    /// Readable, not writable.
    Protected,
    /// Neither readable nor writable.
    Restricted,
}

impl FilePermissions {
    pub fn is_readable(&self) -> bool {
        matches!(self, FilePermissions::Available | FilePermissions::Protected)
    }

    pub fn is_writable(&self) -> bool {
        matches!(self, FilePermissions::Available)
    }
}

/// One file in the tree. Content is kept newline-terminated.
#[derive(Debug, Clone)]
pub struct RamFile {
    name: String,
    content: String,
    permissions: FilePermissions,
}

impl RamFile {
    /// Creates a readable and writable file, enforcing the name and
    /// content caps.
    pub fn new(name: &str, content: &str) -> Result<Self, RamFsError> {
        if name.len() > MAX_NAME_LEN {
            return Err(RamFsError::NameTooLong { len: name.len() });
        }
        let mut file = RamFile {
            name: name.to_string(),
            content: String::new(),
            permissions: FilePermissions::default(),
        };
        file.replace_content(content)?;
        Ok(file)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn permissions(&self) -> FilePermissions {
        self.permissions
    }

    pub fn set_permissions(&mut self, permissions: FilePermissions) {
        self.permissions = permissions;
    }

    /// Returns the content if the file is readable.
    pub fn read(&self) -> Result<&str, RamFsError> {
        if !self.permissions.is_readable() {
            return Err(RamFsError::PermissionDenied {
                name: self.name.clone(),
            });
        }
        Ok(&self.content)
    }

    /// Replaces the content if the file is writable.
    pub fn write(&mut self, content: &str) -> Result<(), RamFsError> {
        if !self.permissions.is_writable() {
            return Err(RamFsError::PermissionDenied {
                name: self.name.clone(),
            });
        }
        self.replace_content(content)
    }

    fn replace_content(&mut self, content: &str) -> Result<(), RamFsError> {
        let needs_newline = !content.ends_with('\n');
        let len = content.len() + usize::from(needs_newline);
        if len > MAX_CONTENT_LEN {
            return Err(RamFsError::ContentTooLong { len });
        }
        self.content.clear();
        self.content.push_str(content);
        if needs_newline {
            self.content.push('\n');
        }
        Ok(())
    }

    /// Approximate heap footprint of this file.
    pub fn memory_usage(&self) -> usize {
        mem::size_of::<RamFile>() + self.name.len() + self.content.len()
    }
}

/// Directory holding bounded tables of files and subdirectories.
#[derive(Debug, Clone)]
pub struct RamDir {
    name: String,
    files: Vec<RamFile>,
    subdirs: Vec<RamDir>,
}

impl RamDir {
    pub fn new(name: &str) -> Result<Self, RamFsError> {
        if name.len() > MAX_NAME_LEN {
            return Err(RamFsError::NameTooLong { len: name.len() });
        }
        Ok(RamDir {
            name: name.to_string(),
            files: Vec::new(),
            subdirs: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn files(&self) -> &[RamFile] {
        &self.files
    }

    pub fn subdirs(&self) -> &[RamDir] {
        &self.subdirs
    }

    pub fn add_file(&mut self, file: RamFile) -> Result<(), RamFsError> {
        if self.files.len() >= MAX_FILES_PER_DIR {
            return Err(RamFsError::FileTableFull);
        }
        self.files.push(file);
        Ok(())
    }

    pub fn add_subdir(&mut self, dir: RamDir) -> Result<(), RamFsError> {
        if self.subdirs.len() >= MAX_DIRS_PER_DIR {
            return Err(RamFsError::DirTableFull);
        }
        self.subdirs.push(dir);
        Ok(())
    }

    /// Finds a file by name anywhere under this directory.
    pub fn find_file(&self, name: &str) -> Option<&RamFile> {
        if let Some(file) = self.files.iter().find(|f| f.name() == name) {
            return Some(file);
        }
        self.subdirs.iter().find_map(|d| d.find_file(name))
    }

    pub fn find_file_mut(&mut self, name: &str) -> Option<&mut RamFile> {
        if let Some(i) = self.files.iter().position(|f| f.name() == name) {
            return Some(&mut self.files[i]);
        }
        self.subdirs.iter_mut().find_map(|d| d.find_file_mut(name))
    }

    /// Lists the entries directly inside this directory, subdirectories
    /// first.
    pub fn ls(&self) -> Vec<String> {
        let mut entries = Vec::with_capacity(self.subdirs.len() + self.files.len());
        for dir in &self.subdirs {
            entries.push(format!("{}/", dir.name));
        }
        for file in &self.files {
            entries.push(file.name().to_string());
        }
        entries
    }

    /// Approximate footprint of this directory and everything under it.
    pub fn memory_usage(&self) -> usize {
        let mut total = mem::size_of::<RamDir>() + self.name.len();
        total += self.files.iter().map(RamFile::memory_usage).sum::<usize>();
        total += self.subdirs.iter().map(RamDir::memory_usage).sum::<usize>();
        total
    }
}

/// The filesystem root plus the log line cache.
#[derive(Debug, Clone)]
pub struct RamFs {
    root: RamDir,
    log_cache: Vec<String>,
}

impl RamFs {
    pub fn new() -> Self {
        RamFs {
            root: RamDir {
                name: String::from("/"),
                files: Vec::new(),
                subdirs: Vec::new(),
            },
            log_cache: Vec::new(),
        }
    }

    pub fn root(&self) -> &RamDir {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut RamDir {
        &mut self.root
    }

    /// Appends a marked line to the log cache.
    pub fn log(&mut self, message: &str) {
        self.log_cache.push(format!("{LOG_MARKER} {message}"));
    }

    pub fn log_cache(&self) -> &[String] {
        &self.log_cache
    }

    /// Writes the cached log lines into the named file under the root,
    /// creating the file when missing, then clears the cache.
    pub fn flush_log(&mut self, name: &str) -> Result<(), RamFsError> {
        let content = self.log_cache.join("\n");
        if let Some(file) = self.root.find_file_mut(name) {
            file.write(&content)?;
        } else {
            self.root.add_file(RamFile::new(name, &content)?)?;
        }
        self.log_cache.clear();
        Ok(())
    }

    /// Approximate footprint of the tree plus the cached log lines.
    pub fn memory_usage(&self) -> usize {
        self.root.memory_usage()
            + self
                .log_cache
                .iter()
                .map(|line| mem::size_of::<String>() + line.len())
                .sum::<usize>()
    }
}

impl Default for RamFs {
    fn default() -> Self {
        Self::new()
    }
}
