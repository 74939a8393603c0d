// Reveal scheduler: plays a complete answer back one character at a time.
//
// A sequence is a spawned task that emits frames at `i * char_delay` for
// i = 1..=N. Each frame carries the prefix of i characters; the last one is
// marked done. Starting a new sequence aborts the previous one and bumps the
// generation so frames already sitting in the channel can be discarded.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use super::conversation::TurnId;
use super::ConversationKind;

/// One step of a reveal sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct RevealFrame {
    pub kind: ConversationKind,
    pub generation: u64,
    pub turn: TurnId,
    /// The revealed prefix.
    pub content: String,
    /// Set on the final frame; the turn is no longer pending.
    pub done: bool,
}

pub struct RevealScheduler {
    kind: ConversationKind,
    char_delay: Duration,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl RevealScheduler {
    pub fn new(kind: ConversationKind, char_delay: Duration) -> Self {
        RevealScheduler {
            kind,
            char_delay,
            generation: 0,
            task: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether `frame` belongs to the live sequence.
    pub fn is_current(&self, frame: &RevealFrame) -> bool {
        frame.kind == self.kind && frame.generation == self.generation
    }

    /// True while a sequence task is still emitting frames.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancel any running sequence and start revealing `answer` into `turn`.
    /// Returns the new generation.
    pub fn start<T>(&mut self, turn: TurnId, answer: String, tx: mpsc::Sender<T>) -> u64
    where
        T: From<RevealFrame> + Send + 'static,
    {
        self.cancel();
        let generation = self.generation;
        let kind = self.kind;
        let step = self.char_delay;
        debug!(
            "{:?}: revealing {} chars into {} (gen {})",
            kind,
            answer.chars().count(),
            turn,
            generation
        );
        self.task = Some(tokio::spawn(run_sequence(
            kind, generation, turn, answer, step, tx,
        )));
        generation
    }

    /// Abort the running sequence, if any. Frames it already queued become
    /// stale.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.generation += 1;
    }
}

impl Drop for RevealScheduler {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Byte offsets that end each character of `text`, in order.
pub fn char_boundaries(text: &str) -> Vec<usize> {
    text.char_indices().map(|(i, c)| i + c.len_utf8()).collect()
}

async fn run_sequence<T>(
    kind: ConversationKind,
    generation: u64,
    turn: TurnId,
    answer: String,
    step: Duration,
    tx: mpsc::Sender<T>,
) where
    T: From<RevealFrame> + Send + 'static,
{
    let ends = char_boundaries(&answer);
    if ends.is_empty() {
        let _ = tx
            .send(T::from(RevealFrame {
                kind,
                generation,
                turn,
                content: String::new(),
                done: true,
            }))
            .await;
        return;
    }

    let start = Instant::now();
    let total = ends.len();
    for (i, end) in ends.into_iter().enumerate() {
        let index = i as u32 + 1;
        tokio::time::sleep_until(start + step * index).await;
        let frame = RevealFrame {
            kind,
            generation,
            turn,
            content: answer[..end].to_string(),
            done: i + 1 == total,
        };
        if tx.send(T::from(frame)).await.is_err() {
            // Receiver dropped; nobody is watching.
            return;
        }
    }
}
