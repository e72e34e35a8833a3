//! Core data model for executables, functions, and call instructions.
//!
//! - `ExecutableFormat` / `ExecutableRecord` identify one analysis target.
//! - `Function` and `CallInstruction` are the read-only view of persisted
//!   analysis results.
//! - `CallTarget` is the tagged call-target descriptor with a single textual
//!   rendering used for both filtering and ordering in reports.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::CacheLayout;

/// Executable container format declared by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutableFormat {
    /// 32-bit x86 Windows portable executable.
    X86Pe,
    /// MIPS ELF executable or shared object.
    MipsElf,
}

impl ExecutableFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutableFormat::X86Pe => "x86-pe",
            ExecutableFormat::MipsElf => "mips-elf",
        }
    }

    /// Flags passed to the external analyzer to select the front end.
    pub fn analyzer_flags(self) -> &'static [&'static str] {
        match self {
            ExecutableFormat::X86Pe => &[],
            ExecutableFormat::MipsElf => &["-mips", "-elf"],
        }
    }
}

impl fmt::Display for ExecutableFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a format tag is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported executable format '{0}' (expected x86-pe or mips-elf)")]
pub struct UnknownFormat(pub String);

impl FromStr for ExecutableFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x86-pe" => Ok(ExecutableFormat::X86Pe),
            "mips-elf" => Ok(ExecutableFormat::MipsElf),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

/// One resolved analysis target. Created by `PathResolver`, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutableRecord {
    /// Canonical directory holding the executable.
    pub dir: PathBuf,
    /// Base filename of the executable.
    pub name: String,
    pub format: ExecutableFormat,
    /// Auxiliary files required next to the executable, in declared order.
    pub dependencies: Vec<String>,
}

impl ExecutableRecord {
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.name)
    }

    /// Compute the cache layout for this executable. Does not touch the filesystem.
    pub fn layout(&self) -> CacheLayout {
        CacheLayout::new(&self.dir, &self.name)
    }
}

/// A function recovered by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub address: u64,
    pub name: Option<String>,
}

impl Function {
    pub fn new(address: u64, name: Option<String>) -> Self {
        Self { address, name }
    }

    /// `name (0xADDR)` when a name is known, otherwise the bare address.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => format!("{} ({})", name, format_address(self.address)),
            None => format_address(self.address),
        }
    }
}

/// Identity of the callee of a call instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallTarget {
    /// Function inside the executable, by name or address text.
    Named { name: String },
    /// Imported symbol, optionally qualified by its library.
    Imported { library: Option<String>, symbol: String },
    /// Computed or otherwise unresolved target.
    Indeterminate,
    /// Well-formed descriptor of a kind this crate does not know.
    Opaque { text: String },
}

impl CallTarget {
    pub fn named(name: impl Into<String>) -> Self {
        CallTarget::Named { name: name.into() }
    }

    pub fn imported(library: Option<&str>, symbol: impl Into<String>) -> Self {
        CallTarget::Imported { library: library.map(str::to_string), symbol: symbol.into() }
    }

    /// Decode a persisted `(kind, value)` pair. Never fails; unknown kinds
    /// become `Opaque`.
    pub fn decode(kind: &str, value: Option<&str>) -> Self {
        let value = value.map(str::trim).filter(|v| !v.is_empty());
        match (kind.to_ascii_lowercase().as_str(), value) {
            ("function" | "named" | "app", Some(v)) => CallTarget::named(v),
            ("import" | "stub" | "dll" | "so", Some(v)) => match v.split_once(':') {
                Some((lib, sym)) if !lib.is_empty() && !sym.is_empty() => {
                    CallTarget::imported(Some(lib), sym)
                }
                _ => CallTarget::imported(None, v),
            },
            ("ordinal", Some(v)) => match v.rsplit_once(':') {
                Some((lib, ord)) => CallTarget::imported(Some(lib), format!("#{ord}")),
                None => CallTarget::imported(None, format!("#{v}")),
            },
            ("indeterminate" | "unknown" | "computed", _) => CallTarget::Indeterminate,
            (other, Some(v)) => CallTarget::Opaque { text: format!("{other}:{v}") },
            (other, None) => CallTarget::Opaque { text: other.to_string() },
        }
    }

    /// Textual identity used for equality filtering and sort order.
    pub fn render(&self) -> String {
        match self {
            CallTarget::Named { name } => name.clone(),
            CallTarget::Imported { library: Some(lib), symbol } => format!("{lib}:{symbol}"),
            CallTarget::Imported { library: None, symbol } => symbol.clone(),
            CallTarget::Indeterminate => "?".to_string(),
            CallTarget::Opaque { text } => text.clone(),
        }
    }
}

impl fmt::Display for CallTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// A call instruction inside a recovered function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallInstruction {
    pub function_address: u64,
    pub address: u64,
    pub target: CallTarget,
    /// At least one argument references a string literal.
    pub has_string_args: bool,
    /// Human-readable rendering of the call and its arguments.
    pub annotation: String,
}

/// Render an address as `0x`-prefixed lowercase hex.
pub fn format_address(address: u64) -> String {
    format!("{:#x}", address)
}
