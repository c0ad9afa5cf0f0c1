//! Serves recorded interactions back in order.

use std::collections::{HashMap, VecDeque};

use super::format::{Cassette, Interaction};

/// Hands out a cassette's interactions one port/method pair at a time.
///
/// Calls to different methods may interleave freely; calls to the same
/// method are answered in recording order.
pub struct CassetteReplayer {
    queues: HashMap<(String, String), VecDeque<Interaction>>,
}

impl CassetteReplayer {
    /// Indexes a cassette for replay.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        let mut queues: HashMap<(String, String), VecDeque<Interaction>> = HashMap::new();
        for interaction in &cassette.interactions {
            queues
                .entry((interaction.port.clone(), interaction.method.clone()))
                .or_default()
                .push_back(interaction.clone());
        }
        Self { queues }
    }

    /// Takes the next recorded interaction for `port::method`.
    ///
    /// # Panics
    ///
    /// Panics when the cassette holds no further interaction for the pair;
    /// the run has diverged from the recording.
    pub fn next_interaction(&mut self, port: &str, method: &str) -> Interaction {
        let key = (port.to_string(), method.to_string());
        let Some(queue) = self.queues.get_mut(&key) else {
            let mut recorded: Vec<String> =
                self.queues.keys().map(|(p, m)| format!("{p}::{m}")).collect();
            recorded.sort();
            panic!(
                "Cassette exhausted: nothing recorded for {port}::{method}. Recorded: [{}]",
                recorded.join(", ")
            );
        };
        queue.pop_front().unwrap_or_else(|| {
            panic!("Cassette exhausted: every {port}::{method} interaction has been replayed")
        })
    }

    /// Number of interactions not yet replayed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }
}
