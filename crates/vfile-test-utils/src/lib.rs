//! Testing utilities for the virtual file workspace
//!
//! Shared kernels, cell fixtures, and assertions.

#![allow(missing_docs)]

use std::sync::Arc;
use vfile_kernel::data;
use vfile_kernel::engine::{Cell, Kernel};
use vfile_kernel::function::Function;
use vfile_kernel::memo::Memoized;
use vfile_kernel::render::RenderedOutput;
use vfile_kernel::types::{CellId, KernelConfig};
use vfile_kernel::value::{SharedList, Value};
use vfile_registry::{DedupPolicy, RegistryConfig};
use vfile_store::FileId;

pub const HELLO_PDF: &[u8] = b"hello world";

pub fn setup_kernel() -> Kernel {
    Kernel::new(KernelConfig::new())
}

pub fn setup_disabled_kernel() -> Kernel {
    Kernel::new(KernelConfig::new().with_registry(RegistryConfig::new().with_virtual_files(false)))
}

pub fn setup_dedup_kernel() -> Kernel {
    Kernel::new(KernelConfig::new().with_registry(RegistryConfig::new().with_dedup(DedupPolicy::ContentHash)))
}

/// `name = pdf(HELLO_PDF)`
pub fn file_cell(id: &str, name: &str) -> Cell {
    let name = name.to_owned();
    Cell::new(id, move |scope| {
        let file = data::pdf(scope.ctx(), HELLO_PDF)?;
        scope.bind(name.clone(), file);
        Ok(None)
    })
}

/// Defines `name(arg)` as a memoized producer of `pdf(HELLO_PDF)`
pub fn memo_cell(id: &str, name: &str) -> Cell {
    let name = name.to_owned();
    Cell::new(id, move |scope| {
        let producer = Function::new(name.clone(), |ctx, _args| Ok(data::pdf(ctx, HELLO_PDF)?.into()));
        let capacity = scope.ctx().config().memo_capacity;
        scope.bind(name.clone(), Arc::new(Memoized::new(producer, capacity)));
        Ok(None)
    })
}

/// Defines `name(arg)` as a plain producer of `pdf(HELLO_PDF)`
pub fn function_cell(id: &str, name: &str) -> Cell {
    let name = name.to_owned();
    Cell::new(id, move |scope| {
        let producer = Function::new(name.clone(), |ctx, _args| Ok(data::pdf(ctx, HELLO_PDF)?.into()));
        scope.bind(name.clone(), Arc::new(producer));
        Ok(None)
    })
}

/// Outputs `func(arg)` without binding it
pub fn call_output_cell(id: &str, func: &str, arg: i64) -> Cell {
    let func = func.to_owned();
    Cell::new(id, move |scope| Ok(Some(scope.call(&func, &[Value::Int(arg)])?)))
}

/// `target = func(arg)`
pub fn call_cell(id: &str, target: &str, func: &str, arg: i64) -> Cell {
    let (target, func) = (target.to_owned(), func.to_owned());
    Cell::new(id, move |scope| {
        let result = scope.call(&func, &[Value::Int(arg)])?;
        scope.bind(target.clone(), result);
        Ok(None)
    })
}

/// `target = md(f"{func(arg)}")`, or an unbound output when `target` is `None`
pub fn embed_cell(id: &str, target: Option<&str>, func: &str, arg: i64) -> Cell {
    let (target, func) = (target.map(str::to_owned), func.to_owned());
    Cell::new(id, move |scope| {
        let file = scope.call(&func, &[Value::Int(arg)])?;
        let md = RenderedOutput::markdown("").embed(file.as_file()?)?;
        match &target {
            Some(name) => {
                scope.bind(name.clone(), md);
                Ok(None)
            }
            None => Ok(Some(md.into())),
        }
    })
}

/// `name = []`
pub fn list_cell(id: &str, name: &str) -> Cell {
    let name = name.to_owned();
    Cell::new(id, move |scope| {
        scope.bind(name.clone(), SharedList::new());
        Ok(None)
    })
}

/// `list.append(func(arg))`; binds nothing
pub fn append_cell(id: &str, list: &str, func: &str, arg: i64) -> Cell {
    let (list, func) = (list.to_owned(), func.to_owned());
    Cell::new(id, move |scope| {
        let value = scope.call(&func, &[Value::Int(arg)])?;
        scope.get(&list)?.as_list()?.push(value);
        Ok(None)
    })
}

/// `list.clear()`; binds nothing
pub fn clear_cell(id: &str, list: &str) -> Cell {
    let list = list.to_owned();
    Cell::new(id, move |scope| {
        scope.get(&list)?.as_list()?.clear();
        Ok(None)
    })
}

pub fn cell(id: &str) -> CellId {
    CellId::new(id)
}

/// Run cells, asserting none of them failed
pub fn run_ok(kernel: &mut Kernel, cells: impl IntoIterator<Item = Cell>) {
    let outcomes = kernel.run(cells).unwrap();
    for outcome in outcomes {
        assert!(outcome.is_ok(), "cell {} failed: {:?}", outcome.cell, outcome.error);
    }
}

/// The single identifier in the registry
pub fn only_id(kernel: &Kernel) -> FileId {
    let ids = kernel.registry().identifiers();
    assert_eq!(ids.len(), 1, "expected exactly one entry, found {ids:?}");
    ids.into_iter().next().unwrap()
}

/// Identifier of the file bound (directly or inside a composite) to `name`
pub fn id_of(kernel: &Kernel, name: &str) -> FileId {
    let value = kernel.lookup(name).unwrap_or_else(|| panic!("{name} is not bound"));
    let files = value.files();
    files
        .first()
        .and_then(|f| f.id().cloned())
        .unwrap_or_else(|| panic!("{name} holds no stored file"))
}
