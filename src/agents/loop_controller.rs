use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopDecision {
    /// Run another search and revision cycle
    Continue,
    Stop,
}

/// Bounds the number of revision cycles after the initial answer
#[derive(Debug, Clone, Copy)]
pub struct LoopController {
    max_iterations: u32,
}

impl LoopController {
    pub fn new(max_iterations: u32) -> Self {
        Self { max_iterations }
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn decide(&self, revisions_completed: u32) -> LoopDecision {
        let decision = if revisions_completed >= self.max_iterations {
            LoopDecision::Stop
        } else {
            LoopDecision::Continue
        };
        debug!(revisions_completed, max = self.max_iterations, ?decision, "Loop decision");
        decision
    }
}
