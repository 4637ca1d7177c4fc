//! Captcha challenge engine gating dangerous vehicle actions.
//!
//! The engine is deliberately clock-free: the host posts `challenge_tick`
//! once per second and the router forwards it to [`Challenge::tick`], so
//! tests drive the countdown with synthetic ticks.

use rand::distributions::Uniform;
use rand::{thread_rng, Rng};

/// Actions that require verification before the request leaves the UI.
pub const DEFAULT_GATED_ACTIONS: [&str; 3] = ["disable_brakes", "accelerate", "track"];

/// Which actions are gated, and how much time each one grants.
#[derive(Debug, Clone)]
pub struct ActionPolicy {
    gated: Vec<String>,
}

impl Default for ActionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_GATED_ACTIONS)
    }
}

impl ActionPolicy {
    pub fn new<I, S>(gated: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            gated: gated.into_iter().map(Into::into).collect(),
        }
    }

    pub fn requires_challenge(&self, action: &str) -> bool {
        self.gated.iter().any(|g| g == action)
    }

    /// Per-action time budget in seconds. Unknown identifiers get the
    /// default budget rather than an error.
    pub fn time_limit_secs(&self, action: &str) -> u32 {
        match action {
            "disable_brakes" => 3,
            "accelerate" => 4,
            "track" => 5,
            _ => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeOutcome {
    Pending,
    Succeeded,
    Failed,
    Cancelled,
}

impl ChallengeOutcome {
    pub fn is_terminal(self) -> bool {
        self != Self::Pending
    }
}

/// One live captcha instance, from code generation to terminal outcome.
/// Every transition out of `Pending` is terminal; later ticks, input or
/// cancels are no-ops, so a stale timer can never race a keystroke.
#[derive(Debug, Clone)]
pub struct Challenge {
    action: String,
    plate: String,
    code: String,
    time_limit_secs: u32,
    remaining_secs: u32,
    outcome: ChallengeOutcome,
}

impl Challenge {
    pub fn start(action: &str, plate: &str, policy: &ActionPolicy) -> Self {
        Self::with_code(action, plate, policy, generate_code(&mut thread_rng()))
    }

    pub(crate) fn with_code(action: &str, plate: &str, policy: &ActionPolicy, code: String) -> Self {
        let limit = policy.time_limit_secs(action);
        Self {
            action: action.to_string(),
            plate: plate.to_string(),
            code,
            time_limit_secs: limit,
            remaining_secs: limit,
            outcome: ChallengeOutcome::Pending,
        }
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn plate(&self) -> &str {
        &self.plate
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_secs
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn outcome(&self) -> ChallengeOutcome {
        self.outcome
    }

    pub fn is_pending(&self) -> bool {
        self.outcome == ChallengeOutcome::Pending
    }

    /// One second elapsed. Reaching zero while pending fails the
    /// challenge; the transition fires exactly once.
    pub fn tick(&mut self) -> ChallengeOutcome {
        if self.is_pending() {
            self.remaining_secs = self.remaining_secs.saturating_sub(1);
            if self.remaining_secs == 0 {
                self.outcome = ChallengeOutcome::Failed;
            }
        }
        self.outcome
    }

    /// Explicit submit: exact, case-sensitive match decides. No trimming,
    /// no normalization.
    pub fn submit(&mut self, input: &str) -> ChallengeOutcome {
        if self.is_pending() {
            self.outcome = if self.matches(input) {
                ChallengeOutcome::Succeeded
            } else {
                ChallengeOutcome::Failed
            };
        }
        self.outcome
    }

    /// Incremental input: resolves the instant the text becomes exact.
    /// A partial or wrong value keeps the challenge pending, otherwise
    /// typing the first character would already fail it.
    pub fn input_changed(&mut self, input: &str) -> ChallengeOutcome {
        if self.is_pending() && self.matches(input) {
            self.outcome = ChallengeOutcome::Succeeded;
        }
        self.outcome
    }

    pub fn cancel(&mut self) -> ChallengeOutcome {
        if self.is_pending() {
            self.outcome = ChallengeOutcome::Cancelled;
        }
        self.outcome
    }

    fn matches(&self, input: &str) -> bool {
        input == self.code
    }
}

/// 5 or 6 uppercase letters, each drawn uniformly from A-Z.
pub fn generate_code<R: Rng>(rng: &mut R) -> String {
    let len = rng.gen_range(5..=6usize);
    let letters = Uniform::new_inclusive(b'A', b'Z');
    (0..len).map(|_| rng.sample(letters) as char).collect()
}
