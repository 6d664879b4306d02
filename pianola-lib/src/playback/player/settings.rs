use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::config::{validate_hold_duration, validate_speed, PlaybackSettings};
use crate::error::Result;
use crate::keymap::KeyMapping;

use super::Player;

impl Player {
    /// Set the speed multiplier. Must be finite and greater than zero.
    ///
    /// A running scheduler picks the new slope up from its current position;
    /// virtual time does not jump.
    pub fn set_speed(&self, speed: f64) -> Result<()> {
        validate_speed(speed)?;
        self.update_settings(|settings| settings.speed = speed);
        info!("Speed set to {}x", speed);
        Ok(())
    }

    /// Set how long each key is held, in seconds. Must be finite and positive.
    pub fn set_hold_duration(&self, seconds: f64) -> Result<()> {
        validate_hold_duration(seconds)?;
        self.update_settings(|settings| settings.hold_duration_s = seconds);
        info!("Hold duration set to {}s", seconds);
        Ok(())
    }

    /// Configure the runaway guard. `None` disables it.
    pub fn set_runaway_margin(&self, margin: Option<Duration>) {
        self.update_settings(|settings| {
            settings.runaway_margin_s = margin.map(|margin| margin.as_secs_f64())
        });
    }

    /// Configure how long `stop` waits for the scheduler thread.
    pub fn set_stop_timeout(&self, timeout: Duration) {
        self.update_settings(|settings| {
            settings.stop_timeout_ms = timeout.as_millis().min(u64::MAX as u128) as u64
        });
    }

    /// Set the action-id → key table. `None` passes ids through unchanged.
    ///
    /// Takes effect on the next `play` from a stopped state.
    pub fn set_key_mapping(&self, mapping: Option<KeyMapping>) {
        *self.key_mapping.lock().unwrap() = mapping.map(Arc::new);
    }

    pub fn key_mapping(&self) -> Option<Arc<KeyMapping>> {
        self.key_mapping.lock().unwrap().clone()
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> PlaybackSettings {
        self.settings.lock().unwrap().clone()
    }

    pub fn get_speed(&self) -> f64 {
        self.settings.lock().unwrap().speed
    }

    pub fn get_hold_duration(&self) -> f64 {
        self.settings.lock().unwrap().hold_duration_s
    }

    fn update_settings(&self, update: impl FnOnce(&mut PlaybackSettings)) {
        let mut settings = self.settings.lock().unwrap();
        update(&mut settings);
        self.settings_generation.fetch_add(1, Ordering::SeqCst);
    }
}
