//! Tier fallback state machine.
//!
//! Pure bookkeeping for the descending-quality walk: which tier runs next,
//! when the walk is over and what the final failure says. The generator
//! drives it and performs all I/O.

use reel_models::QualityTier;

/// What the controller should do next.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Run the pipeline at `tier`. `attempt` is 1-based.
    Attempt { attempt: u32, tier: QualityTier },
    /// `tier` produced the video; stop.
    Succeeded { tier: QualityTier },
    /// Every tier failed; carries the last tier and its error.
    Exhausted { tier: String, message: String },
}

impl Step {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Step::Attempt { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Running(usize),
    Done,
}

/// Walks a tier ladder in order, each tier at most once.
#[derive(Debug, Clone)]
pub struct FallbackMachine {
    tiers: Vec<QualityTier>,
    state: State,
    last: Option<Step>,
}

impl FallbackMachine {
    pub fn new(tiers: Vec<QualityTier>) -> Self {
        Self {
            tiers,
            state: State::Idle,
            last: None,
        }
    }

    /// First step: attempt the highest tier.
    pub fn start(&mut self) -> Step {
        if self.state != State::Idle {
            return self.current();
        }
        match self.tiers.first() {
            Some(tier) => {
                self.state = State::Running(0);
                Step::Attempt {
                    attempt: 1,
                    tier: tier.clone(),
                }
            }
            None => self.finish(Step::Exhausted {
                tier: "none".to_string(),
                message: "no quality tiers configured".to_string(),
            }),
        }
    }

    /// The running tier succeeded.
    pub fn on_success(&mut self) -> Step {
        match self.state {
            State::Running(index) => {
                let tier = self.tiers[index].clone();
                self.finish(Step::Succeeded { tier })
            }
            _ => self.current(),
        }
    }

    /// The running tier failed; move to the next lower tier or give up.
    pub fn on_failure(&mut self, message: impl Into<String>) -> Step {
        let State::Running(index) = self.state else {
            return self.current();
        };

        let next = index + 1;
        match self.tiers.get(next) {
            Some(tier) => {
                self.state = State::Running(next);
                Step::Attempt {
                    attempt: next as u32 + 1,
                    tier: tier.clone(),
                }
            }
            None => {
                let tier = self.tiers[index].name.clone();
                self.finish(Step::Exhausted {
                    tier,
                    message: message.into(),
                })
            }
        }
    }

    /// Tier currently running, if any.
    pub fn current_tier(&self) -> Option<&QualityTier> {
        match self.state {
            State::Running(index) => self.tiers.get(index),
            _ => None,
        }
    }

    pub fn tiers(&self) -> &[QualityTier] {
        &self.tiers
    }

    fn finish(&mut self, step: Step) -> Step {
        self.state = State::Done;
        self.last = Some(step.clone());
        step
    }

    fn current(&self) -> Step {
        match (self.state, &self.last) {
            (State::Running(index), _) => Step::Attempt {
                attempt: index as u32 + 1,
                tier: self.tiers[index].clone(),
            },
            (_, Some(step)) => step.clone(),
            (_, None) => Step::Exhausted {
                tier: "none".to_string(),
                message: "fallback not started".to_string(),
            },
        }
    }
}
