//! Line-oriented terminal prompts.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Prompt I/O over any async line source and sink.
///
/// Every read returns `None` once the input is closed.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Writes one line.
    pub async fn say(&mut self, line: &str) -> io::Result<()> {
        self.output.write_all(line.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await
    }

    async fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Shows a numbered list and returns the chosen index.
    ///
    /// Re-prompts until the answer is a valid number.
    pub async fn select(&mut self, title: &str, choices: &[&str]) -> io::Result<Option<usize>> {
        self.say(title).await?;
        for (i, choice) in choices.iter().enumerate() {
            self.say(&format!("  {}) {choice}", i + 1)).await?;
        }

        loop {
            self.prompt(&format!("Choose [1-{}]: ", choices.len())).await?;
            let Some(answer) = self.read_line().await? else {
                return Ok(None);
            };
            match parse_choice(&answer, choices.len()) {
                Some(index) => return Ok(Some(index)),
                None => self.say("Invalid choice.").await?,
            }
        }
    }

    /// Asks for free text.
    pub async fn input(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.prompt(&format!("{prompt}: ")).await?;
        self.read_line().await
    }

    /// Waits for Enter. Returns `false` if the input is closed.
    pub async fn pause(&mut self, message: &str) -> io::Result<bool> {
        self.say(message).await?;
        Ok(self.read_line().await?.is_some())
    }

    async fn prompt(&mut self, text: &str) -> io::Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.flush().await
    }

    #[cfg(test)]
    pub fn output(&self) -> &W {
        &self.output
    }
}

/// Parses a 1-based menu answer into an index.
fn parse_choice(answer: &str, count: usize) -> Option<usize> {
    let n: usize = answer.trim().parse().ok()?;
    (1..=count).contains(&n).then(|| n - 1)
}
