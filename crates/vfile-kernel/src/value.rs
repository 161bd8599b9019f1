//! Values produced by cells
//!
//! Cloning a [`Value`] never changes a reference count: every clone of a
//! [`Value::File`] shares the claim of the original. Independent claims are
//! only taken by [`VirtualFile::acquire`] (used when embedding into a
//! rendered composite).

use crate::error::KernelError;
use crate::function::Callable;
use crate::render::RenderedOutput;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use vfile_registry::VirtualFile;

/// A value bound in the live namespace
#[derive(Clone, Default)]
pub enum Value {
    /// Absence of a value
    #[default]
    None,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// String
    Text(String),
    /// Handle to a stored (or inlined) payload
    File(VirtualFile),
    /// Markdown or HTML composite
    Rendered(RenderedOutput),
    /// Mutable container shared between bindings
    List(SharedList),
    /// Callable, possibly memoized
    Function(Arc<dyn Callable>),
}

impl Value {
    /// Short kind name for diagnostics
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Text(_) => "text",
            Self::File(_) => "file",
            Self::Rendered(_) => "rendered",
            Self::List(_) => "list",
            Self::Function(_) => "function",
        }
    }

    /// Text shown as a cell's output
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Text(s) => s.clone(),
            Self::File(f) => f.url().into_owned(),
            Self::Rendered(r) => r.text().to_owned(),
            Self::List(list) => {
                let items: Vec<String> = list.snapshot().iter().map(Value::render).collect();
                format!("[{}]", items.join(", "))
            }
            Self::Function(func) => format!("<function {}>", func.name()),
        }
    }

    /// Borrow as a file handle
    ///
    /// # Errors
    /// `TypeMismatch` for any other kind.
    pub fn as_file(&self) -> Result<&VirtualFile, KernelError> {
        match self {
            Self::File(f) => Ok(f),
            other => Err(other.mismatch("file")),
        }
    }

    /// Borrow as a shared list
    ///
    /// # Errors
    /// `TypeMismatch` for any other kind.
    pub fn as_list(&self) -> Result<&SharedList, KernelError> {
        match self {
            Self::List(l) => Ok(l),
            other => Err(other.mismatch("list")),
        }
    }

    /// Borrow as a callable
    ///
    /// # Errors
    /// `TypeMismatch` for any other kind.
    pub fn as_function(&self) -> Result<&Arc<dyn Callable>, KernelError> {
        match self {
            Self::Function(c) => Ok(c),
            other => Err(other.mismatch("function")),
        }
    }

    /// Read as an integer
    ///
    /// # Errors
    /// `TypeMismatch` for any other kind.
    pub fn as_int(&self) -> Result<i64, KernelError> {
        match self {
            Self::Int(i) => Ok(*i),
            other => Err(other.mismatch("int")),
        }
    }

    /// Every file handle reachable from this value
    ///
    /// Walks lists, rendered composites and the retained state of callables.
    /// The returned handles share existing claims.
    #[must_use]
    pub fn files(&self) -> Vec<VirtualFile> {
        let mut out = Vec::new();
        self.collect_files(&mut out);
        out
    }

    fn collect_files(&self, out: &mut Vec<VirtualFile>) {
        match self {
            Self::File(f) => out.push(f.clone()),
            Self::Rendered(r) => out.extend(r.embedded().iter().cloned()),
            Self::List(list) => {
                for item in list.snapshot() {
                    item.collect_files(out);
                }
            }
            Self::Function(func) => {
                for item in func.retained() {
                    item.collect_files(out);
                }
            }
            Self::None | Self::Bool(_) | Self::Int(_) | Self::Text(_) => {}
        }
    }

    fn mismatch(&self, expected: &'static str) -> KernelError {
        KernelError::TypeMismatch {
            expected,
            found: self.kind(),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::File(file) => f.debug_tuple("File").field(file).finish(),
            Self::Rendered(r) => f.debug_tuple("Rendered").field(r).finish(),
            Self::List(l) => f.debug_tuple("List").field(&l.len()).finish(),
            Self::Function(func) => f.debug_tuple("Function").field(&func.name()).finish(),
        }
    }
}

impl From<VirtualFile> for Value {
    fn from(value: VirtualFile) -> Self {
        Self::File(value)
    }
}

impl From<RenderedOutput> for Value {
    fn from(value: RenderedOutput) -> Self {
        Self::Rendered(value)
    }
}

impl From<SharedList> for Value {
    fn from(value: SharedList) -> Self {
        Self::List(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<C: Callable + 'static> From<Arc<C>> for Value {
    fn from(value: Arc<C>) -> Self {
        Self::Function(value)
    }
}

/// A list whose contents are shared by every binding that holds it
///
/// Clearing the list drops the handles it held; the claims they shared are
/// released once no other value shares them.
#[derive(Clone, Default)]
pub struct SharedList(Arc<Mutex<Vec<Value>>>);

impl SharedList {
    /// Create an empty list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value
    pub fn push(&self, value: impl Into<Value>) {
        self.0.lock().push(value.into());
    }

    /// Remove every element
    pub fn clear(&self) {
        let drained = std::mem::take(&mut *self.0.lock());
        // release claims outside the lock
        drop(drained);
    }

    /// Remove and return the last element
    pub fn pop(&self) -> Option<Value> {
        self.0.lock().pop()
    }

    /// Number of elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    /// Whether the list is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    /// Copy of the current elements; handle clones share claims
    #[must_use]
    pub fn snapshot(&self) -> Vec<Value> {
        self.0.lock().clone()
    }

    /// Whether both lists are the same container
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for SharedList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.snapshot().iter()).finish()
    }
}
