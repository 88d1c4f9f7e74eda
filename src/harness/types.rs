use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::snapshot::{CaptureConfiguration, Renderable, TestIdentity};

/// A named view captured under one or more configurations
#[derive(Clone)]
pub struct Scenario {
    /// Suite the case belongs to (e.g., "WorkingSnapshotTests")
    pub suite: String,

    /// Case name, stable across runs (e.g., "ContentView Dark Mode")
    pub name: String,

    /// What gets rendered
    pub view: Arc<dyn Renderable>,

    /// One capture per configuration
    pub configurations: Vec<CaptureConfiguration>,
}

impl Scenario {
    pub fn new(suite: impl Into<String>, name: impl Into<String>, view: Arc<dyn Renderable>) -> Self {
        Self {
            suite: suite.into(),
            name: name.into(),
            view,
            configurations: Vec::new(),
        }
    }

    /// Add a configuration
    pub fn configuration(mut self, config: CaptureConfiguration) -> Self {
        self.configurations.push(config);
        self
    }

    /// Add multiple configurations
    pub fn configurations(mut self, configs: impl IntoIterator<Item = CaptureConfiguration>) -> Self {
        self.configurations.extend(configs);
        self
    }

    /// Identity of the capture under `config`
    pub fn identity(&self, config: &CaptureConfiguration) -> TestIdentity {
        TestIdentity::for_configuration(&self.suite, &self.name, config)
    }

    /// Every (identity, configuration) pair this scenario expands to
    pub fn cases(&self) -> impl Iterator<Item = (TestIdentity, &CaptureConfiguration)> {
        self.configurations.iter().map(|c| (self.identity(c), c))
    }
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("suite", &self.suite)
            .field("name", &self.name)
            .field("configurations", &self.configurations.len())
            .finish()
    }
}

/// Ordered collection of scenarios to run
#[derive(Debug, Clone, Default)]
pub struct Registry {
    scenarios: Vec<Scenario>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scenario
    pub fn register(&mut self, scenario: Scenario) -> &mut Self {
        self.scenarios.push(scenario);
        self
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Every identity the registry expands to, in registration order
    pub fn identities(&self) -> Vec<TestIdentity> {
        self.scenarios
            .iter()
            .flat_map(|s| s.cases().map(|(id, _)| id))
            .collect()
    }

    /// Identities produced more than once (duplicate names or configurations)
    pub fn duplicate_identities(&self) -> Vec<TestIdentity> {
        let mut counts: HashMap<TestIdentity, usize> = HashMap::new();
        for id in self.identities() {
            *counts.entry(id).or_default() += 1;
        }
        let mut dups: Vec<_> = counts
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(id, _)| id)
            .collect();
        dups.sort();
        dups
    }

    /// Keep only scenarios whose suite or name contains `needle`
    pub fn filter(&self, needle: &str) -> Registry {
        let needle = needle.to_lowercase();
        Registry {
            scenarios: self
                .scenarios
                .iter()
                .filter(|s| {
                    s.name.to_lowercase().contains(&needle) || s.suite.to_lowercase().contains(&needle)
                })
                .cloned()
                .collect(),
        }
    }
}
