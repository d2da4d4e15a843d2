//! Run configuration, loaded from a YAML file.
use chip8::{prelude::*, Hz};
use serde::Deserialize;

/// Settings for a headless run.
///
/// ```yaml
/// cpu_frequency: 700
/// duration_ms: 5000
/// vm:
///   seed: 42
/// input:
///   - { at_step: 1200, key: 5 }
///   - { at_step: 1300, key: 5, pressed: false }
/// ```
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Instructions executed per second of emulated time.
    pub cpu_frequency: Hz,
    /// Timer decrements per second of emulated time.
    pub timer_frequency: Hz,
    /// Length of the run in emulated time.
    pub duration_ms: u64,
    /// Stop after this many instructions, even if time remains.
    pub max_steps: Option<u64>,
    /// Keep to real time by waiting between timer ticks.
    pub throttle: bool,
    pub vm: Chip8Conf,
    /// Scripted key presses, replayed in order of step.
    pub input: Vec<InputEvent>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            cpu_frequency: Hz(1000),
            timer_frequency: Hz(chip8::constants::DELAY_FREQUENCY),
            duration_ms: 1000,
            max_steps: None,
            throttle: false,
            vm: Chip8Conf::default(),
            input: Vec::new(),
        }
    }
}

impl RunConfig {
    pub fn from_file(filepath: &str) -> Result<Self, crate::AppError> {
        let file = std::fs::File::open(filepath)?;
        let conf = Self::from_reader(file)?;
        log::debug!("loaded run config: {:#?}", conf);
        Ok(conf)
    }

    pub fn from_reader(reader: impl std::io::Read) -> Result<Self, crate::AppError> {
        let mut conf: Self = serde_yaml::from_reader(reader)?;

        if conf.timer_frequency.0 == 0 {
            return Err(crate::AppError::usage("timer_frequency must be greater than zero"));
        }
        if conf.duration_ms.checked_mul(conf.timer_frequency.0).is_none() {
            return Err(crate::AppError::usage("duration_ms is too large for timer_frequency"));
        }
        // The clock adds the cpu frequency to a remainder below the timer frequency.
        if conf.cpu_frequency.0.checked_add(conf.timer_frequency.0).is_none() {
            return Err(crate::AppError::usage("cpu_frequency is too large"));
        }

        // Events are consumed front to back as the step counter advances.
        conf.input.sort_by_key(|event| event.at_step);

        Ok(conf)
    }

    /// Number of timer ticks that fit in the configured duration.
    pub fn tick_count(&self) -> u64 {
        self.duration_ms * self.timer_frequency.0 / 1000
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InputEvent {
    /// Number of executed instructions before the event is applied.
    pub at_step: u64,
    pub key: KeyCode,
    #[serde(default = "pressed_default")]
    pub pressed: bool,
}

fn pressed_default() -> bool {
    true
}
