use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

/// When a scheduled flush should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTiming {
    /// Flush synchronously in the caller's stack.
    Immediate,
    /// Flush on the host's next animation-frame callback.
    NextAnimationFrame,
    /// Flush from a host timer after the given delay.
    After(Duration),
}

impl FlushTiming {
    #[must_use]
    pub fn is_deferred(self) -> bool {
        !matches!(self, Self::Immediate)
    }
}

/// Strategy deciding when a coalesced flush executes.
pub trait RenderPolicy: fmt::Debug {
    fn render(&self) -> FlushTiming;

    fn kind(&self) -> RenderPolicyKind;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImmediatePolicy;

impl RenderPolicy for ImmediatePolicy {
    fn render(&self) -> FlushTiming {
        FlushTiming::Immediate
    }

    fn kind(&self) -> RenderPolicyKind {
        RenderPolicyKind::Immediate
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnimationFramePolicy;

impl RenderPolicy for AnimationFramePolicy {
    fn render(&self) -> FlushTiming {
        FlushTiming::NextAnimationFrame
    }

    fn kind(&self) -> RenderPolicyKind {
        RenderPolicyKind::AnimationFrame
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    delay: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            delay: default_timeout_delay(),
        }
    }
}

impl TimeoutPolicy {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    #[must_use]
    pub fn delay(self) -> Duration {
        self.delay
    }
}

impl RenderPolicy for TimeoutPolicy {
    fn render(&self) -> FlushTiming {
        FlushTiming::After(self.delay)
    }

    fn kind(&self) -> RenderPolicyKind {
        RenderPolicyKind::Timeout
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderPolicyKind {
    Immediate,
    #[default]
    AnimationFrame,
    Timeout,
}

impl RenderPolicyKind {
    /// Builds the policy, using `timeout` for the timeout variant.
    #[must_use]
    pub fn into_policy(self, timeout: Duration) -> Box<dyn RenderPolicy> {
        match self {
            Self::Immediate => Box::new(ImmediatePolicy),
            Self::AnimationFrame => Box::new(AnimationFramePolicy),
            Self::Timeout => Box::new(TimeoutPolicy::new(timeout)),
        }
    }
}

/// One 60 Hz frame.
#[must_use]
pub fn default_timeout_delay() -> Duration {
    Duration::from_micros(1_000_000 / 60)
}

fn default_timeout_delay_ms() -> f64 {
    default_timeout_delay().as_secs_f64() * 1000.0
}

fn default_warnings_enabled() -> bool {
    true
}

/// Serializable scheduler bootstrap configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub policy: RenderPolicyKind,
    #[serde(default = "default_timeout_delay_ms")]
    pub timeout_delay_ms: f64,
    #[serde(default = "default_warnings_enabled")]
    pub warnings_enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            policy: RenderPolicyKind::default(),
            timeout_delay_ms: default_timeout_delay_ms(),
            warnings_enabled: default_warnings_enabled(),
        }
    }
}

impl SchedulerConfig {
    #[must_use]
    pub fn with_policy(mut self, policy: RenderPolicyKind) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_timeout_delay_ms(mut self, delay_ms: f64) -> Self {
        self.timeout_delay_ms = delay_ms;
        self
    }

    #[must_use]
    pub fn with_warnings_enabled(mut self, enabled: bool) -> Self {
        self.warnings_enabled = enabled;
        self
    }

    pub fn validate(&self) -> ChartResult<()> {
        if !self.timeout_delay_ms.is_finite() || self.timeout_delay_ms < 0.0 {
            return Err(ChartError::InvalidData(
                "scheduler timeout delay must be finite and >= 0".to_owned(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn timeout_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_delay_ms / 1000.0)
            .unwrap_or_else(|_| default_timeout_delay())
    }

    #[must_use]
    pub fn build_policy(&self) -> Box<dyn RenderPolicy> {
        self.policy.into_policy(self.timeout_delay())
    }
}
