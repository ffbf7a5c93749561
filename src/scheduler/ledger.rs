use std::collections::HashMap;

/// Per-board usage counters against configured capacities.
///
/// One ledger exists per board and is only ever touched by that board's own
/// poller task, so plain sequencing is enough and no lock is needed. Usage
/// starts at zero on every startup; already-running cards from a previous
/// run are not reconciled.
#[derive(Debug)]
pub struct ResourceLedger {
    capacities: HashMap<String, u32>,
    usage: HashMap<String, u32>,
}

impl ResourceLedger {
    pub fn new(capacities: HashMap<String, u32>) -> Self {
        let usage = capacities.keys().map(|name| (name.clone(), 0)).collect();
        Self { capacities, usage }
    }

    /// The subset of `labels` naming configured resources, in label order.
    pub fn required_resources(&self, labels: &[String]) -> Vec<String> {
        labels
            .iter()
            .filter(|label| self.capacities.contains_key(*label))
            .cloned()
            .collect()
    }

    /// All-or-nothing admission: if any resource in `required` is at
    /// capacity, the ledger is left unchanged and `false` is returned;
    /// otherwise every resource in `required` is incremented.
    pub fn try_reserve(&mut self, required: &[String]) -> bool {
        for name in required {
            let capacity = self.capacities.get(name).copied().unwrap_or(0);
            let used = self.usage.get(name).copied().unwrap_or(0);
            if used >= capacity {
                return false;
            }
        }

        for name in required {
            *self.usage.entry(name.clone()).or_insert(0) += 1;
        }
        true
    }

    /// Release previously reserved resources. Decrements saturate at zero
    /// so a lifecycle bug can never drive a counter negative; this is a
    /// deliberate hardening, not a path the state machine should reach.
    pub fn release(&mut self, required: &[String]) {
        for name in required {
            if let Some(used) = self.usage.get_mut(name) {
                *used = used.saturating_sub(1);
            }
        }
    }

    /// Current usage for a resource (zero when unknown).
    pub fn usage(&self, name: &str) -> u32 {
        self.usage.get(name).copied().unwrap_or(0)
    }

    /// Configured capacity for a resource (zero when unknown).
    pub fn capacity(&self, name: &str) -> u32 {
        self.capacities.get(name).copied().unwrap_or(0)
    }
}
