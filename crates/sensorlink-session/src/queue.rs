use std::collections::VecDeque;

use sensorlink_codec::Command;
use tokio::sync::oneshot;

use crate::event::CommandError;

pub type CommandResult = Result<(), CommandError>;

/// Completion handle for one accepted command.
///
/// Resolves once the link acknowledges the write, or with an error if the
/// write fails or the session drops the command.
#[derive(Debug)]
pub struct CommandHandle {
    command: Command,
    rx: oneshot::Receiver<CommandResult>,
    resolved: Option<CommandResult>,
}

impl CommandHandle {
    pub fn command(&self) -> Command {
        self.command
    }

    /// Non-blocking check; `None` while the command is still pending.
    pub fn try_result(&mut self) -> Option<CommandResult> {
        if self.resolved.is_none() {
            self.resolved = match self.rx.try_recv() {
                Ok(result) => Some(result),
                Err(oneshot::error::TryRecvError::Empty) => None,
                Err(oneshot::error::TryRecvError::Closed) => Some(Err(CommandError::Cancelled)),
            };
        }
        self.resolved.clone()
    }

    pub fn is_pending(&mut self) -> bool {
        self.try_result().is_none()
    }

    pub async fn wait(self) -> CommandResult {
        match self.resolved {
            Some(result) => result,
            None => self.rx.await.unwrap_or(Err(CommandError::Cancelled)),
        }
    }
}

/// Accepted command waiting for, or occupying, the link.
#[derive(Debug)]
pub(crate) struct PendingCommand {
    pub command: Command,
    pub byte: u8,
    completer: oneshot::Sender<CommandResult>,
}

impl PendingCommand {
    pub fn new(command: Command, byte: u8) -> (Self, CommandHandle) {
        let (completer, rx) = oneshot::channel();
        let handle = CommandHandle {
            command,
            rx,
            resolved: None,
        };
        (
            Self {
                command,
                byte,
                completer,
            },
            handle,
        )
    }

    pub fn complete(self, result: CommandResult) {
        // The caller may have dropped its handle.
        let _ = self.completer.send(result);
    }
}

/// One in-flight slot plus a bounded FIFO of waiting commands.
#[derive(Debug)]
pub(crate) struct CommandQueue {
    depth: usize,
    in_flight: Option<PendingCommand>,
    waiting: VecDeque<PendingCommand>,
}

impl CommandQueue {
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            in_flight: None,
            waiting: VecDeque::with_capacity(depth),
        }
    }

    pub fn has_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn waiting(&self) -> usize {
        self.waiting.len()
    }

    pub fn set_in_flight(&mut self, pending: PendingCommand) {
        debug_assert!(self.in_flight.is_none());
        self.in_flight = Some(pending);
    }

    pub fn take_in_flight(&mut self) -> Option<PendingCommand> {
        self.in_flight.take()
    }

    /// Queues behind the in-flight command, handing it back when full.
    pub fn push(&mut self, pending: PendingCommand) -> Result<(), PendingCommand> {
        if self.waiting.len() >= self.depth {
            return Err(pending);
        }
        self.waiting.push_back(pending);
        Ok(())
    }

    pub fn pop_waiting(&mut self) -> Option<PendingCommand> {
        self.waiting.pop_front()
    }

    /// Fails every held command with `Cancelled`; returns how many there were.
    pub fn cancel_all(&mut self) -> usize {
        let mut cancelled = 0;
        for pending in self.in_flight.take().into_iter().chain(self.waiting.drain(..)) {
            pending.complete(Err(CommandError::Cancelled));
            cancelled += 1;
        }
        cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandQueue, PendingCommand};
    use crate::event::CommandError;
    use sensorlink_codec::Command;

    #[test]
    fn handle_reports_pending_then_result() {
        let (pending, mut handle) = PendingCommand::new(Command::SendNow, b'7');
        assert!(handle.is_pending());
        pending.complete(Ok(()));
        assert_eq!(handle.try_result(), Some(Ok(())));
        assert_eq!(handle.try_result(), Some(Ok(())));
        assert_eq!(handle.command(), Command::SendNow);
    }

    #[test]
    fn dropped_completer_reads_as_cancelled() {
        let (pending, mut handle) = PendingCommand::new(Command::Sleep, b'4');
        drop(pending);
        assert_eq!(handle.try_result(), Some(Err(CommandError::Cancelled)));
    }

    #[test]
    fn queue_is_bounded_and_fifo() {
        let mut queue = CommandQueue::new(2);
        let mut handles = Vec::new();
        for byte in [b'1', b'2', b'3'] {
            let (pending, handle) = PendingCommand::new(Command::SendNow, byte);
            handles.push(handle);
            if byte == b'3' {
                assert!(queue.push(pending).is_err());
            } else {
                assert!(queue.push(pending).is_ok());
            }
        }
        assert_eq!(queue.waiting(), 2);
        assert_eq!(queue.pop_waiting().map(|p| p.byte), Some(b'1'));
        assert_eq!(queue.pop_waiting().map(|p| p.byte), Some(b'2'));
        assert!(queue.pop_waiting().is_none());
    }

    #[test]
    fn cancel_all_fails_in_flight_and_waiting() {
        let mut queue = CommandQueue::new(4);
        let (first, mut h1) = PendingCommand::new(Command::Wake, b'5');
        let (second, mut h2) = PendingCommand::new(Command::SendNow, b'6');
        queue.set_in_flight(first);
        assert!(queue.push(second).is_ok());

        assert_eq!(queue.cancel_all(), 2);
        assert!(!queue.has_in_flight());
        assert_eq!(h1.try_result(), Some(Err(CommandError::Cancelled)));
        assert_eq!(h2.try_result(), Some(Err(CommandError::Cancelled)));
    }

    #[tokio::test]
    async fn wait_resolves_with_the_completion() {
        let (pending, handle) = PendingCommand::new(Command::FanClean, b'3');
        pending.complete(Err(CommandError::Cancelled));
        assert_eq!(handle.wait().await, Err(CommandError::Cancelled));
    }
}
