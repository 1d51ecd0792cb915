use super::config::ConfigError;
use super::operation::Operation;

// ---------------------------------------------------------------------------
// OperationRegistry
// ---------------------------------------------------------------------------

/// Ordered collection of the operations one service exposes.
///
/// Names are unique. Registration order is the match priority: lookups scan
/// in insertion order and return the first enabled operation with the name.
/// The registry is mutated only while a service is being configured; during
/// request handling it is shared read-only.
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    operations: Vec<Operation>,
}

impl OperationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an operation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateOperation`] if an operation with the
    /// same name is already registered.
    pub fn register(&mut self, operation: Operation) -> Result<(), ConfigError> {
        if self.get(&operation.name).is_some() {
            return Err(ConfigError::DuplicateOperation {
                name: operation.name,
            });
        }
        self.operations.push(operation);
        Ok(())
    }

    /// Operation registered under `name`, enabled or not.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.name == name)
    }

    /// First enabled operation named `name`, in registration order.
    #[must_use]
    pub fn get_enabled(&self, name: &str) -> Option<&Operation> {
        self.operations
            .iter()
            .find(|op| op.enabled && op.name == name)
    }

    /// Enables or disables an operation. Returns `false` if no operation has
    /// the given name.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.operations.iter_mut().find(|op| op.name == name) {
            Some(op) => {
                op.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// All operations in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    /// Enabled operations in registration order.
    pub fn enabled(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter().filter(|op| op.enabled)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
