use futures::stream::{Stream, StreamExt};
use std::future::Future;
use std::pin::Pin;

/// Side effects returned from `update()` and executed by the runtime.
pub enum Command<Msg> {
    /// Do nothing
    None,

    /// Execute multiple commands
    Batch(Vec<Command<Msg>>),

    /// Perform an async operation and send the result as a message
    Perform(Pin<Box<dyn Future<Output = Msg> + Send>>),

    /// Run a stream, sending every item as a message
    Stream(Pin<Box<dyn Stream<Item = Msg> + Send>>),

    /// Leave the wizard
    Quit,
}

impl<Msg> Command<Msg> {
    /// Helper to create a command that performs an async operation
    pub fn perform<F, T>(future: F, to_msg: impl FnOnce(T) -> Msg + Send + 'static) -> Self
    where
        F: Future<Output = T> + Send + 'static,
        Msg: Send + 'static,
    {
        Command::Perform(Box::pin(async move {
            let result = future.await;
            to_msg(result)
        }))
    }

    /// Helper to forward every item of a stream as a message
    pub fn stream<S, T>(stream: S, to_msg: impl FnMut(T) -> Msg + Send + 'static) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
        Msg: Send + 'static,
    {
        Command::Stream(Box::pin(stream.map(to_msg)))
    }

    /// Helper to batch multiple commands
    pub fn batch(commands: Vec<Command<Msg>>) -> Self {
        Command::Batch(commands)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Command::None)
    }

    /// Run every effect to completion and collect the messages in order.
    /// Used by the headless runner and tests; the TUI spawns effects instead.
    pub fn resolve(self) -> Pin<Box<dyn Future<Output = Vec<Msg>> + Send>>
    where
        Msg: Send + 'static,
    {
        Box::pin(async move {
            match self {
                Command::None | Command::Quit => Vec::new(),
                Command::Perform(future) => vec![future.await],
                Command::Stream(stream) => stream.collect().await,
                Command::Batch(commands) => {
                    let mut messages = Vec::new();
                    for command in commands {
                        messages.extend(command.resolve().await);
                    }
                    messages
                }
            }
        })
    }
}

impl<Msg> Default for Command<Msg> {
    fn default() -> Self {
        Command::None
    }
}

impl<Msg> std::fmt::Debug for Command<Msg> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::None => write!(f, "Command::None"),
            Command::Batch(commands) => f.debug_tuple("Command::Batch").field(commands).finish(),
            Command::Perform(_) => write!(f, "Command::Perform(..)"),
            Command::Stream(_) => write!(f, "Command::Stream(..)"),
            Command::Quit => write!(f, "Command::Quit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn test_resolve_keeps_order() {
        let command: Command<u32> = Command::batch(vec![
            Command::perform(async { 1 }, |n| n),
            Command::None,
            Command::stream(stream::iter(vec![2, 3]), |n| n * 10),
        ]);

        assert_eq!(command.resolve().await, vec![1, 20, 30]);
    }
}
