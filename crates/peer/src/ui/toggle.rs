//! Level-toggle inputs.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::ports::ToggleInput;

/// An input that is never pressed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverPressed;

impl ToggleInput for NeverPressed {
    fn is_toggle_pressed(&mut self) -> bool {
        false
    }
}

/// Presses on fixed poll numbers.
///
/// The node polls its input once per tick, so poll `n` (counting from 0)
/// is tick `n`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedToggle {
    presses: BTreeSet<u64>,
    polls: u64,
}

impl ScriptedToggle {
    pub fn new(presses: impl IntoIterator<Item = u64>) -> Self {
        Self {
            presses: presses.into_iter().collect(),
            polls: 0,
        }
    }

    /// Number of times the input was polled.
    pub fn polls(&self) -> u64 {
        self.polls
    }
}

impl ToggleInput for ScriptedToggle {
    fn is_toggle_pressed(&mut self) -> bool {
        let pressed = self.presses.contains(&self.polls);
        self.polls += 1;
        pressed
    }
}

/// Presses once for every line read from a reader, usually stdin.
///
/// A tokio task reads lines and raises a flag; polling clears it, so
/// several lines between two polls count as one press. Both constructors
/// must be called from within a tokio runtime.
#[derive(Debug, Clone)]
pub struct StdinToggle {
    flag: Arc<AtomicBool>,
}

impl StdinToggle {
    /// Starts reading stdin.
    pub fn spawn() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()))
    }

    /// Starts reading any line source. The task exits at end of input.
    pub fn from_reader<R: AsyncBufRead + Unpin + Send + 'static>(reader: R) -> Self {
        let flag = Arc::new(AtomicBool::new(false));
        let writer = Arc::clone(&flag);

        tokio::spawn(async move {
            let mut lines = reader.lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(_)) => writer.store(true, Ordering::SeqCst),
                    Ok(None) => {
                        debug!("Toggle input reached end of input");
                        break;
                    }
                    Err(e) => {
                        debug!(error = %e, "Toggle input closed");
                        break;
                    }
                }
            }
        });

        Self { flag }
    }
}

impl ToggleInput for StdinToggle {
    fn is_toggle_pressed(&mut self) -> bool {
        self.flag.swap(false, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn test_never_pressed() {
        let mut input = NeverPressed;
        assert!((0..10).all(|_| !input.is_toggle_pressed()));
    }

    #[test]
    fn test_scripted_toggle_presses_on_schedule() {
        let mut input = ScriptedToggle::new([0, 3]);
        let presses: Vec<bool> = (0..5).map(|_| input.is_toggle_pressed()).collect();
        assert_eq!(presses, [true, false, false, true, false]);
        assert_eq!(input.polls(), 5);
    }

    /// Polls until the input reports a press or the attempts run out.
    async fn wait_for_press(input: &mut StdinToggle) -> bool {
        for _ in 0..200 {
            if input.is_toggle_pressed() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_reader_toggle_press_is_consumed_once() {
        let mut input = StdinToggle::from_reader(&b"\n"[..]);

        assert!(wait_for_press(&mut input).await);
        assert!(!input.is_toggle_pressed());
    }

    #[tokio::test]
    async fn test_reader_toggle_shares_current_thread_runtime() {
        // The reader must not block the only worker while it waits for input.
        let (mut client, server) = tokio::io::duplex(64);
        let mut input = StdinToggle::from_reader(BufReader::new(server));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!input.is_toggle_pressed());

        client.write_all(b"\n").await.unwrap();
        assert!(wait_for_press(&mut input).await);
        assert!(!input.is_toggle_pressed());
    }
}
