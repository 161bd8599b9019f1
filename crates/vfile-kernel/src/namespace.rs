//! Live namespace: the names bound by completed cells

use crate::error::KernelError;
use crate::types::CellId;
use crate::value::Value;
use std::collections::HashMap;

#[derive(Debug)]
struct Binding {
    cell: CellId,
    value: Value,
}

/// Name to value map, partitioned by defining cell
///
/// Each name is owned by exactly one cell. Replacing or removing a cell's
/// bindings hands the displaced values back to the caller so it decides
/// when their claims are released.
#[derive(Debug, Default)]
pub struct Namespace {
    bindings: HashMap<String, Binding>,
    defs: HashMap<CellId, Vec<String>>,
}

impl Namespace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value bound to `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name).map(|b| &b.value)
    }

    /// Cell that bound `name`
    #[must_use]
    pub fn definer(&self, name: &str) -> Option<&CellId> {
        self.bindings.get(name).map(|b| &b.cell)
    }

    /// Names bound by `cell`
    #[must_use]
    pub fn names_defined_by(&self, cell: &CellId) -> &[String] {
        self.defs.get(cell).map_or(&[][..], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// All bound values
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.bindings.values().map(|b| &b.value)
    }

    /// Reject names already owned by a different cell
    ///
    /// # Errors
    /// `MultipleDefinitions` for the first contested name.
    pub fn check_defs<'a>(
        &self,
        cell: &CellId,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), KernelError> {
        for name in names {
            if let Some(existing) = self.definer(name) {
                if existing != cell {
                    return Err(KernelError::MultipleDefinitions {
                        name: name.to_owned(),
                        existing: existing.clone(),
                        offending: cell.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Replace every binding of `cell` with `produced`
    ///
    /// Returns the displaced values. Nothing changes on error.
    ///
    /// # Errors
    /// `MultipleDefinitions` if another cell owns one of the names.
    pub fn replace_cell_bindings(
        &mut self,
        cell: &CellId,
        produced: Vec<(String, Value)>,
    ) -> Result<Vec<Value>, KernelError> {
        self.check_defs(cell, produced.iter().map(|(n, _)| n.as_str()))?;

        let mut displaced = self.remove_cell(cell);
        let mut names = Vec::with_capacity(produced.len());
        for (name, value) in produced {
            let binding = Binding {
                cell: cell.clone(),
                value,
            };
            match self.bindings.insert(name.clone(), binding) {
                // same name bound twice in one run: last one wins
                Some(old) => displaced.push(old.value),
                None => names.push(name),
            }
        }
        if !names.is_empty() {
            self.defs.insert(cell.clone(), names);
        }
        Ok(displaced)
    }

    /// Remove every binding of `cell`, returning the values
    pub fn remove_cell(&mut self, cell: &CellId) -> Vec<Value> {
        self.defs
            .remove(cell)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|name| self.bindings.remove(&name))
            .map(|b| b.value)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(id: &str) -> CellId {
        CellId::new(id)
    }

    #[test]
    fn rerun_displaces_previous_values() {
        let mut ns = Namespace::new();
        ns.replace_cell_bindings(&cell("a"), vec![("x".into(), Value::Int(1)), ("y".into(), Value::Int(2))])
            .unwrap();
        let displaced = ns.replace_cell_bindings(&cell("a"), vec![("x".into(), Value::Int(3))]).unwrap();
        assert_eq!(displaced.len(), 2);
        assert_eq!(ns.get("x").unwrap().as_int().unwrap(), 3);
        assert!(ns.get("y").is_none());
        assert_eq!(ns.names_defined_by(&cell("a")), ["x".to_string()]);
    }

    #[test]
    fn conflicting_definition_leaves_namespace_untouched() {
        let mut ns = Namespace::new();
        ns.replace_cell_bindings(&cell("a"), vec![("x".into(), Value::Int(1))]).unwrap();
        let err = ns
            .replace_cell_bindings(&cell("b"), vec![("z".into(), Value::Int(0)), ("x".into(), Value::Int(2))])
            .unwrap_err();
        assert!(matches!(err, KernelError::MultipleDefinitions { ref name, .. } if name == "x"));
        assert!(ns.get("z").is_none());
        assert_eq!(ns.definer("x"), Some(&cell("a")));
    }

    #[test]
    fn duplicate_name_in_one_run() {
        let mut ns = Namespace::new();
        let displaced = ns
            .replace_cell_bindings(&cell("a"), vec![("x".into(), Value::Int(1)), ("x".into(), Value::Int(2))])
            .unwrap();
        assert_eq!(displaced.len(), 1);
        assert_eq!(ns.get("x").unwrap().as_int().unwrap(), 2);
        assert_eq!(ns.remove_cell(&cell("a")).len(), 1);
        assert!(ns.is_empty());
    }
}
