//! Observability sink: scalars and figures, injected at construction.
//!
//! The trainer never knows whether a dashboard is attached. It talks to a
//! [`MetricSink`]; [`NoopSink`] (the default) drops everything and opts out
//! of figure building, [`MemorySink`] records everything for tests and
//! offline inspection. A real dashboard adapter lives outside this crate.
//!
//! Scalar channels: `train_loss`, `test/loss`, `test/rel_Error`. Figure
//! channels: `reconstruction`, `modes`, `latents`.

use crate::plots::Figure;

pub trait MetricSink {
    fn scalar(&mut self, channel: &str, value: f32, step: usize);

    fn figure(&mut self, channel: &str, figure: &Figure, step: usize);

    /// Whether figure payloads are worth building at all. Sinks that drop
    /// them should return `false` so the trainer can skip the work.
    fn wants_figures(&self) -> bool {
        true
    }
}

/// Drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl MetricSink for NoopSink {
    fn scalar(&mut self, _channel: &str, _value: f32, _step: usize) {}

    fn figure(&mut self, _channel: &str, _figure: &Figure, _step: usize) {}

    fn wants_figures(&self) -> bool {
        false
    }
}

/// A recorded scalar event.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarEvent {
    pub channel: String,
    pub value: f32,
    pub step: usize,
}

/// A recorded figure event (panel count only; payloads stay with the caller).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FigureEvent {
    pub channel: String,
    pub panels: usize,
    pub step: usize,
}

/// Records every event in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub scalars: Vec<ScalarEvent>,
    pub figures: Vec<FigureEvent>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded values on one scalar channel, in arrival order.
    pub fn channel(&self, name: &str) -> Vec<(f32, usize)> {
        self.scalars
            .iter()
            .filter(|e| e.channel == name)
            .map(|e| (e.value, e.step))
            .collect()
    }
}

impl MetricSink for MemorySink {
    fn scalar(&mut self, channel: &str, value: f32, step: usize) {
        self.scalars.push(ScalarEvent {
            channel: channel.to_string(),
            value,
            step,
        });
    }

    fn figure(&mut self, channel: &str, figure: &Figure, step: usize) {
        self.figures.push(FigureEvent {
            channel: channel.to_string(),
            panels: figure.panels.len(),
            step,
        });
    }
}
