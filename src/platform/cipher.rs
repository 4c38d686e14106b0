//! Signature and "n" parameter transform programs

use std::fmt;

/// A single step of a scramble program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecipherAction {
    /// Reverse the whole sequence
    Reverse,
    /// Drop the first `n` elements
    Slice(usize),
    /// Exchange element 0 with element `n mod len`
    Swap(usize),
}

impl fmt::Display for DecipherAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecipherAction::Reverse => write!(f, "rev"),
            DecipherAction::Slice(n) => write!(f, "slice({})", n),
            DecipherAction::Swap(n) => write!(f, "swap({})", n),
        }
    }
}

/// Ordered list of actions recovered from the player script
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecipherProgram {
    actions: Vec<DecipherAction>,
}

impl DecipherProgram {
    pub fn new(actions: Vec<DecipherAction>) -> Self {
        Self { actions }
    }

    pub fn actions(&self) -> &[DecipherAction] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Run the program over `input`
    pub fn apply(&self, input: &str) -> String {
        apply(input, self)
    }
}

impl From<Vec<DecipherAction>> for DecipherProgram {
    fn from(actions: Vec<DecipherAction>) -> Self {
        Self::new(actions)
    }
}

impl fmt::Display for DecipherProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<String> = self.actions.iter().map(|a| a.to_string()).collect();
        write!(f, "[{}]", steps.join(", "))
    }
}

/// Apply a decipher program to a character sequence.
///
/// Total for every input: the empty program and the empty input both return
/// the input unchanged, and a slice past the end leaves an empty sequence.
pub fn apply(input: &str, program: &DecipherProgram) -> String {
    if input.is_empty() || program.is_empty() {
        return input.to_string();
    }

    let mut chars: Vec<char> = input.chars().collect();

    for action in program.actions() {
        match *action {
            DecipherAction::Reverse => chars.reverse(),
            DecipherAction::Slice(n) => {
                if n >= chars.len() {
                    chars.clear();
                } else {
                    chars.drain(..n);
                }
            }
            DecipherAction::Swap(n) => {
                if !chars.is_empty() {
                    let idx = n % chars.len();
                    chars.swap(0, idx);
                }
            }
        }
    }

    chars.into_iter().collect()
}
