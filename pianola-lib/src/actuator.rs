//! Boundary to whatever physically presses keys.

use log::info;

use crate::error::ActuatorError;

/// Capability that presses and releases a key identified by name.
///
/// Implementations are shared between every concurrently running firing, so
/// they must be callable from any thread.
pub trait KeyActuator: Send + Sync {
    fn press(&self, key: &str) -> Result<(), ActuatorError>;
    fn release(&self, key: &str) -> Result<(), ActuatorError>;
}

/// Dry-run actuator that only logs what it would do.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogActuator;

impl KeyActuator for LogActuator {
    fn press(&self, key: &str) -> Result<(), ActuatorError> {
        info!("press {}", key);
        Ok(())
    }

    fn release(&self, key: &str) -> Result<(), ActuatorError> {
        log::debug!("release {}", key);
        Ok(())
    }
}
