//! Detects an agent repeating the same actions on the same screens.

use super::memory::ExecutionStep;

/// Fingerprint of one step: the action kind and how many elements were on screen.
pub type StepFingerprint = (&'static str, usize);

fn fingerprint(step: &ExecutionStep) -> StepFingerprint {
    (step.action.kind(), step.observation.len())
}

/// Compares the last two windows of `window` steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopDetector {
    window: usize,
}

impl Default for LoopDetector {
    fn default() -> Self {
        Self::new(3)
    }
}

impl LoopDetector {
    /// `window == 0` disables detection.
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Whether the last `2 * window` steps are two identical halves.
    pub fn is_looping(&self, steps: &[ExecutionStep]) -> bool {
        let k = self.window;
        if k == 0 || steps.len() < 2 * k {
            return false;
        }

        let tail = &steps[steps.len() - 2 * k..];
        let (older, newer) = tail.split_at(k);
        older
            .iter()
            .map(fingerprint)
            .eq(newer.iter().map(fingerprint))
    }
}
