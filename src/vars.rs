use std::collections::HashMap;

/// Read-only lookup of named variables.
///
/// The interpolator queries a source once per resolved reference. Keeping
/// this a trait lets tests inject fixed variable sets instead of touching
/// the process environment.
pub trait VariableSource {
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Variables taken from the process environment.
#[derive(Debug, Default)]
pub struct ProcessEnv;

impl VariableSource for ProcessEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl VariableSource for HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}
