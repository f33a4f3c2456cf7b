//! Class name normalization
//!
//! Class names show up in two spellings: binary names (`com.example.Foo`)
//! used by loaders and exclusion lists, and internal names
//! (`com/example/Foo`) used inside class files and archive entries.
//! [`ClassName`] stores the dotted form so both spellings compare equal.

use std::fmt;

/// A fully-qualified class name, normalized to dotted form
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassName(String);

impl ClassName {
    /// Build a class name from either a dotted or a slash-delimited spelling
    pub fn new(name: &str) -> Self {
        Self(normalize(name))
    }

    /// Build a class name from an archive entry path (`a/b/C.class`)
    ///
    /// Returns `None` if the path does not end in `.class`.
    pub fn from_resource_path(path: &str) -> Option<Self> {
        path.strip_suffix(CLASS_SUFFIX).map(Self::new)
    }

    /// Dotted (binary) form: `com.example.Foo`
    pub fn dotted(&self) -> &str {
        &self.0
    }

    /// Internal (slash-delimited) form: `com/example/Foo`
    pub fn internal(&self) -> String {
        self.0.replace('.', "/")
    }

    /// Archive resource path: `com/example/Foo.class`
    pub fn resource_path(&self) -> String {
        format!("{}{}", self.internal(), CLASS_SUFFIX)
    }

    /// Simple name after the last package separator
    pub fn simple_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// Package part in dotted form, empty for the default package
    pub fn package(&self) -> &str {
        self.0.rsplit_once('.').map(|(pkg, _)| pkg).unwrap_or("")
    }
}

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ClassName {
    fn from(name: String) -> Self {
        Self::new(&name)
    }
}

/// File suffix of class entries inside archives
pub const CLASS_SUFFIX: &str = ".class";

/// Normalize a class name or name prefix to dotted form
pub fn normalize(name: &str) -> String {
    name.replace('/', ".")
}
