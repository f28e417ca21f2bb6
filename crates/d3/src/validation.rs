//! Placement rules run before every commit.
//!
//! A [`RuleChain`] holds rules in registration order and stops at the first
//! failure. Rules only read the storage; a failing rule leaves it untouched.

use crate::stability::{beneath, check_support, resting_load, FLOOR_Z};
use crate::storage::Storage;
use std::fmt;
use std::sync::Arc;
use stowage_core::{Error, Item, Result, Volume};

/// A placement constraint.
pub trait Rule: Send + Sync {
    /// Short name used in listings.
    fn name(&self) -> &str;

    /// Checks a candidate placement of `item` at `volume`.
    fn check(&self, storage: &Storage, item: &Item, volume: &Volume) -> Result<()>;
}

impl<F> Rule for F
where
    F: Fn(&Storage, &Item, &Volume) -> Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        "custom"
    }

    fn check(&self, storage: &Storage, item: &Item, volume: &Volume) -> Result<()> {
        self(storage, item, volume)
    }
}

/// A closure rule with a name.
pub struct NamedRule<F> {
    name: String,
    check: F,
}

/// Wraps a closure into a named rule.
pub fn named_rule<F>(name: impl Into<String>, check: F) -> NamedRule<F>
where
    F: Fn(&Storage, &Item, &Volume) -> Result<()> + Send + Sync,
{
    NamedRule {
        name: name.into(),
        check,
    }
}

impl<F> Rule for NamedRule<F>
where
    F: Fn(&Storage, &Item, &Volume) -> Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, storage: &Storage, item: &Item, volume: &Volume) -> Result<()> {
        (self.check)(storage, item, volume)
    }
}

/// Rejects refrigerated items when the ambient temperature is above their limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemperatureRule;

impl Rule for TemperatureRule {
    fn name(&self) -> &str {
        "temperature"
    }

    fn check(&self, storage: &Storage, item: &Item, _volume: &Volume) -> Result<()> {
        match item.max_temperature() {
            Some(limit) if storage.temperature() > limit => Err(Error::OverTemperature {
                ambient: storage.temperature(),
                limit,
            }),
            _ => Ok(()),
        }
    }
}

/// Requires support under lifted items and enforces fragile load limits.
#[derive(Debug, Clone, Copy, Default)]
pub struct SupportRule;

impl Rule for SupportRule {
    fn name(&self) -> &str {
        "support"
    }

    fn check(&self, storage: &Storage, item: &Item, volume: &Volume) -> Result<()> {
        if volume.bottom() == FLOOR_Z {
            return Ok(());
        }

        let index = storage.index();
        let column = storage.column(volume);
        let below = beneath(volume, index.query(&column));
        if !check_support(volume, &below) {
            return Err(Error::SupportMissing(volume.anchor().to_string()));
        }

        for (under, carrier) in below {
            let Some(limit) = carrier.max_pressure() else {
                continue;
            };
            let load = resting_load(under, index.query(&storage.column(under))) + item.mass();
            if load > limit {
                return Err(Error::OverPressure {
                    id: carrier.id(),
                    load,
                    limit,
                });
            }
        }
        Ok(())
    }
}

/// Ordered list of rules.
#[derive(Clone, Default)]
pub struct RuleChain {
    rules: Vec<Arc<dyn Rule>>,
}

impl RuleChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a chain with the built-in temperature and support rules.
    pub fn with_builtin() -> Self {
        let mut chain = Self::new();
        chain.push(Arc::new(TemperatureRule));
        chain.push(Arc::new(SupportRule));
        chain
    }

    /// Appends a rule.
    pub fn push(&mut self, rule: Arc<dyn Rule>) {
        self.rules.push(rule);
    }

    /// Removes the rule at `index`.
    pub fn remove(&mut self, index: usize) -> Result<Arc<dyn Rule>> {
        if index >= self.rules.len() {
            return Err(Error::RuleIndexOutOfRange {
                index,
                len: self.rules.len(),
            });
        }
        Ok(self.rules.remove(index))
    }

    /// Rule names in order.
    pub fn names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if there are no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Runs every rule, returning the first failure.
    pub fn check(&self, storage: &Storage, item: &Item, volume: &Volume) -> Result<()> {
        self.rules
            .iter()
            .try_for_each(|rule| rule.check(storage, item, volume))
    }
}

impl fmt::Debug for RuleChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
