//! The bindings a program can see, and the builder that creates them.
//!
//! A namespace starts from an allow-list and nothing else: the builder adds
//! each permitted builtin and the arm binding by name. There is no general
//! environment to strip down, so no host capability can leak in.

use std::collections::HashMap;

use super::builtins::Builtin;
use super::value::Value;
use crate::config::SandboxConfig;

/// Identifier-to-value mapping for one script run or REPL session.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    bindings: HashMap<String, Value>,
}

impl Namespace {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Bound names in alphabetical order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.bindings.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

pub struct NamespaceBuilder<'a> {
    config: &'a SandboxConfig,
}

impl<'a> NamespaceBuilder<'a> {
    pub fn new(config: &'a SandboxConfig) -> Self {
        Self { config }
    }

    /// Every name a fresh namespace holds.
    pub fn allowed_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Builtin::ALL.iter().map(|b| b.name().to_string()).collect();
        names.push(self.config.arm_binding.clone());
        names.sort_unstable();
        names
    }

    pub fn build(&self) -> Namespace {
        let mut namespace = Namespace::default();
        for builtin in Builtin::ALL {
            namespace.set(builtin.name(), Value::Builtin(builtin));
        }
        namespace.set(self.config.arm_binding.clone(), Value::Arm);
        log::trace!("Built namespace with {} bindings", namespace.len());
        namespace
    }
}
