//! Path operations over a JSON collection document.
//!
//! Shared by every adapter so in-memory and on-disk stores agree exactly on
//! what `set`, `unset`, `add_to_set` and friends do.

use serde_json::{Map, Value};

use super::{StoreError, StoreResult};

fn conflict(path: &[&str]) -> StoreError {
    StoreError::PathConflict(path.join("."))
}

pub(crate) fn lookup<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(root, |node, segment| node.as_object()?.get(*segment))
}

fn lookup_mut<'a>(root: &'a mut Value, path: &[&str]) -> Option<&'a mut Value> {
    path.iter()
        .try_fold(root, |node, segment| node.as_object_mut()?.get_mut(*segment))
}

pub(crate) fn set(root: &mut Value, path: &[&str], value: Value) -> StoreResult<()> {
    let (last, parents) = path.split_last().ok_or(StoreError::EmptyPath)?;

    let mut node = root;
    for (depth, segment) in parents.iter().enumerate() {
        node = node
            .as_object_mut()
            .ok_or_else(|| conflict(&path[..depth]))?
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    node.as_object_mut()
        .ok_or_else(|| conflict(parents))?
        .insert(last.to_string(), value);
    Ok(())
}

pub(crate) fn unset(root: &mut Value, path: &[&str]) -> StoreResult<()> {
    let (last, parents) = path.split_last().ok_or(StoreError::EmptyPath)?;

    if let Some(Value::Object(map)) = lookup_mut(root, parents) {
        map.remove(*last);
    }
    Ok(())
}

pub(crate) fn add_to_set(root: &mut Value, path: &[&str], value: Value) -> StoreResult<()> {
    if path.is_empty() {
        return Err(StoreError::EmptyPath);
    }

    match lookup_mut(root, path) {
        Some(Value::Array(items)) => {
            if !items.contains(&value) {
                items.push(value);
            }
            Ok(())
        }
        Some(_) => Err(conflict(path)),
        None => set(root, path, Value::Array(vec![value])),
    }
}

pub(crate) fn remove_from_set(root: &mut Value, path: &[&str], value: &Value) -> StoreResult<()> {
    if path.is_empty() {
        return Err(StoreError::EmptyPath);
    }

    match lookup_mut(root, path) {
        Some(Value::Array(items)) => {
            items.retain(|item| item != value);
            Ok(())
        }
        Some(_) => Err(conflict(path)),
        None => Ok(()),
    }
}

pub(crate) fn keys(root: &Value, path: &[&str]) -> StoreResult<Vec<String>> {
    match lookup(root, path) {
        Some(Value::Object(map)) => Ok(map.keys().cloned().collect()),
        Some(_) => Err(conflict(path)),
        None => Ok(Vec::new()),
    }
}
