//! Callable values defined by cells

use crate::context::ExecutionContext;
use crate::error::KernelError;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Something a cell can call
pub trait Callable: Send + Sync {
    /// Name used in diagnostics and rendering
    fn name(&self) -> &str;

    /// Invoke with positional arguments
    ///
    /// # Errors
    /// Whatever the body reports.
    fn call(&self, ctx: &ExecutionContext, args: &[Value]) -> Result<Value, KernelError>;

    /// Values the callable keeps alive between calls (e.g. a memo table)
    fn retained(&self) -> Vec<Value> {
        Vec::new()
    }
}

type Body = dyn Fn(&ExecutionContext, &[Value]) -> Result<Value, KernelError> + Send + Sync;

/// A plain function: no state between calls
#[derive(Clone)]
pub struct Function {
    name: String,
    body: Arc<Body>,
}

impl Function {
    /// Wrap a closure
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&ExecutionContext, &[Value]) -> Result<Value, KernelError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            body: Arc::new(body),
        }
    }
}

impl Callable for Function {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, ctx: &ExecutionContext, args: &[Value]) -> Result<Value, KernelError> {
        (self.body)(ctx, args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function").field("name", &self.name).finish_non_exhaustive()
    }
}
