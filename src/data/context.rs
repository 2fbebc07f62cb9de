//! Unit-of-work database context contract.
//!
//! Write paths queue commands against a [`DataContext`] and commit
//! them in one shot with [`DataContext::save_changes`]; nothing
//! touches the database until then. Implementations own a session
//! handle and must release it in `Drop` without committing anything
//! still queued.

use std::future::Future;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// A queued unit of work, run against the live session when changes
/// are saved.
pub type SessionCommand<S> = Box<
    dyn for<'a> FnOnce(
            &'a mut S,
            CancellationToken,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>
        + Send,
>;

/// Transactional data context.
///
/// One context spans one logical request: commands accumulate via
/// [`DataContext::add_command`] and execute inside a single
/// session/transaction when [`DataContext::save_changes`] runs. A
/// command failure aborts the save; already-queued commands are not
/// retried.
pub trait DataContext: Send {
    /// Handle to the underlying database session.
    type Session;

    /// Queue `command` to run within the next [`DataContext::save_changes`]
    /// call.
    fn add_command(&mut self, command: SessionCommand<Self::Session>);

    /// Run every queued command inside one session and commit,
    /// resolving to the number of applied changes.
    fn save_changes(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<usize>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Context double whose "session" is a plain write log.
    struct RecordingContext {
        commands: Vec<SessionCommand<Vec<String>>>,
        session: Vec<String>,
        cancel: CancellationToken,
        released: Arc<AtomicBool>,
    }

    impl RecordingContext {
        fn new(cancel: CancellationToken, released: Arc<AtomicBool>) -> Self {
            RecordingContext {
                commands: Vec::new(),
                session: Vec::new(),
                cancel,
                released,
            }
        }
    }

    impl DataContext for RecordingContext {
        type Session = Vec<String>;

        fn add_command(&mut self, command: SessionCommand<Self::Session>) {
            self.commands.push(command);
        }

        fn save_changes(
            &mut self,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<usize>> + Send + '_>> {
            Box::pin(async move {
                let commands = std::mem::take(&mut self.commands);
                let mut applied = 0;
                for command in commands {
                    command(&mut self.session, self.cancel.clone()).await?;
                    applied += 1;
                }
                Ok(applied)
            })
        }
    }

    impl Drop for RecordingContext {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_commands_run_on_save() {
        let mut ctx = RecordingContext::new(
            CancellationToken::new(),
            Arc::new(AtomicBool::new(false)),
        );

        ctx.add_command(Box::new(
            |session: &mut Vec<String>, _cancel: CancellationToken| {
                session.push("note.created".to_string());
                Box::pin(std::future::ready(Ok(())))
            },
        ));
        ctx.add_command(Box::new(
            |session: &mut Vec<String>, _cancel: CancellationToken| {
                session.push("settings.updated".to_string());
                Box::pin(std::future::ready(Ok(())))
            },
        ));

        // Nothing runs until save.
        assert!(ctx.session.is_empty());

        let applied = ctx.save_changes().await.unwrap();
        assert_eq!(applied, 2);
        assert_eq!(
            ctx.session,
            vec!["note.created".to_string(), "settings.updated".to_string()]
        );
    }

    #[tokio::test]
    async fn test_cancelled_token_reaches_commands() {
        let cancel = CancellationToken::new();
        let mut ctx = RecordingContext::new(cancel.clone(), Arc::new(AtomicBool::new(false)));

        ctx.add_command(Box::new(
            |_session: &mut Vec<String>, cancel: CancellationToken| {
                Box::pin(async move {
                    if cancel.is_cancelled() {
                        anyhow::bail!("save cancelled");
                    }
                    Ok(())
                })
            },
        ));

        cancel.cancel();
        let err = ctx.save_changes().await.unwrap_err();
        assert_eq!(err.to_string(), "save cancelled");
    }

    #[test]
    fn test_drop_releases_session_without_committing() {
        let released = Arc::new(AtomicBool::new(false));
        {
            let mut ctx =
                RecordingContext::new(CancellationToken::new(), released.clone());
            ctx.add_command(Box::new(
                |session: &mut Vec<String>, _cancel: CancellationToken| {
                    session.push("never.applied".to_string());
                    Box::pin(std::future::ready(Ok(())))
                },
            ));
            assert!(!released.load(Ordering::SeqCst));
        }
        assert!(released.load(Ordering::SeqCst));
    }
}
