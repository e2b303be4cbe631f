//! Signature caching.
//!
//! Extraction spawns a parser, so signatures are kept per function for the
//! lifetime of the catalog. Entries are dropped when the source changes.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use tessel_task_runtime::Signature;
use tessel_workflow::FunctionRef;

#[derive(Debug, Clone, Default)]
pub struct SignatureCache {
  cache: Arc<RwLock<HashMap<FunctionRef, Signature>>>,
}

impl SignatureCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, function_ref: &FunctionRef) -> Option<Signature> {
    let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
    cache.get(function_ref).cloned()
  }

  pub fn insert(&self, function_ref: FunctionRef, signature: Signature) {
    let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
    cache.insert(function_ref, signature);
  }

  pub fn remove(&self, function_ref: &FunctionRef) -> Option<Signature> {
    let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
    cache.remove(function_ref)
  }

  /// Drop every function defined in `path`. Returns how many were dropped.
  pub fn remove_file(&self, path: &Path) -> usize {
    let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
    let before = cache.len();
    cache.retain(|function_ref, _| function_ref.file_path() != path);
    before - cache.len()
  }

  pub fn len(&self) -> usize {
    self.cache.read().unwrap_or_else(|e| e.into_inner()).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn clear(&self) {
    let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
    cache.clear();
  }
}
