//! Deterministic synthetic metric source.
//!
//! Produces `vcgencmd`-formatted text so the reporter can run on machines
//! that have no `vcgencmd`.  The temperature follows a slow saw-tooth and the
//! ARM clock alternates between idle and boost frequencies; everything else is
//! constant.  The pattern depends only on how many readings have been taken,
//! so two runs produce identical sessions.

use crate::application::collect_reading::{MetricSource, MetricSourceError};

const BASE_TEMP_TENTHS: u64 = 420;
const TEMP_STEPS: u64 = 40;
const ARM_IDLE_HZ: u64 = 600_000_000;
const ARM_BOOST_HZ: u64 = 1_500_000_000;
const CORE_HZ: u64 = 500_000_000;
const ARM_MEM_MB: u64 = 948;

#[derive(Debug, Clone, Default)]
pub struct SimulatedSource {
    samples: u64,
}

impl SimulatedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of temperature queries answered so far.
    pub fn samples(&self) -> u64 {
        self.samples
    }
}

impl MetricSource for SimulatedSource {
    fn temperature(&mut self) -> Result<String, MetricSourceError> {
        // The temperature query opens each reading, so it advances the pattern.
        let tenths = BASE_TEMP_TENTHS + self.samples % TEMP_STEPS * 3;
        self.samples += 1;
        Ok(format!("temp={}.{}'C", tenths / 10, tenths % 10))
    }

    fn core_volts(&mut self) -> Result<String, MetricSourceError> {
        Ok("volt=1.2000V".to_string())
    }

    fn arm_clock(&mut self) -> Result<String, MetricSourceError> {
        let hz = if self.samples % 2 == 0 {
            ARM_IDLE_HZ
        } else {
            ARM_BOOST_HZ
        };
        Ok(format!("frequency(48)={hz}"))
    }

    fn core_clock(&mut self) -> Result<String, MetricSourceError> {
        Ok(format!("frequency(1)={CORE_HZ}"))
    }

    fn arm_memory(&mut self) -> Result<String, MetricSourceError> {
        Ok(format!("arm={ARM_MEM_MB}M"))
    }
}
