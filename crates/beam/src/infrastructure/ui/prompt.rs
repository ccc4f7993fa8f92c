//! Interactive approval of an announced file.

use async_trait::async_trait;
use beam_core::FileInfo;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stderr};
use tracing::debug;

use crate::application::absorb::TransferApproval;
use crate::infrastructure::ui::size::human_size;

/// `true` for the answers that mean yes.  Anything else, including an empty
/// line, means no.
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Asks on `output` and reads one line from `input`.
pub struct PromptApproval<I, O> {
    input: I,
    output: O,
}

impl PromptApproval<BufReader<Stdin>, Stderr> {
    /// Prompts on stderr and reads the answer from stdin.
    pub fn terminal() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stderr())
    }
}

impl<I, O> PromptApproval<I, O>
where
    I: AsyncBufRead + Unpin + Send,
    O: AsyncWrite + Unpin + Send,
{
    pub fn new(input: I, output: O) -> Self {
        Self { input, output }
    }

    async fn ask(&mut self, info: &FileInfo) -> std::io::Result<bool> {
        let question = format!(
            "Incoming file: {} ({})\nAccept? [y/N] ",
            info.name,
            human_size(info.size)
        );
        self.output.write_all(question.as_bytes()).await?;
        self.output.flush().await?;

        let mut answer = String::new();
        self.input.read_line(&mut answer).await?;
        Ok(is_yes(&answer))
    }
}

#[async_trait]
impl<I, O> TransferApproval for PromptApproval<I, O>
where
    I: AsyncBufRead + Unpin + Send,
    O: AsyncWrite + Unpin + Send,
{
    /// An unreadable terminal counts as "no".
    async fn approve(&mut self, info: &FileInfo) -> bool {
        match self.ask(info).await {
            Ok(answer) => answer,
            Err(e) => {
                debug!("approval prompt failed, declining: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> FileInfo {
        FileInfo {
            name: "song.flac".to_string(),
            size: 32_768,
        }
    }

    #[test]
    fn test_is_yes_accepts_only_explicit_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("n"));
        assert!(!is_yes("yep"));
    }

    #[tokio::test]
    async fn test_prompt_shows_name_and_size_then_reads_answer() {
        // Arrange
        let mut output = Vec::new();
        let mut approval = PromptApproval::new(&b"y\n"[..], &mut output);

        // Act
        let approved = approval.approve(&info()).await;

        // Assert
        assert!(approved);
        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("song.flac"));
        assert!(shown.contains("32.77 KB"));
    }

    #[tokio::test]
    async fn test_prompt_closed_input_declines() {
        let mut approval = PromptApproval::new(&b""[..], Vec::new());
        assert!(!approval.approve(&info()).await);
    }
}
