//! Actor implementation for the playback session.

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::debug;

use super::commands::{SessionCommand, TaggedEvent};
use super::core::PlayerSession;
use super::handle::PlayerSessionHandle;
use super::projections::SharedProjections;
use super::SessionError;
use crate::config::SlipstreamConfig;
use crate::player::{PlaybackState, PlayerBuilder};

/// Spawns the playback session actor and returns its handle.
///
/// Creates a new session with the provided configuration and engine builder,
/// then spawns it as an actor running in a separate task. The actor
/// processes commands sequentially: engine access is confined to one task
/// and commands observe a strict total order.
///
/// # Examples
/// ```rust,no_run
/// # #[tokio::main]
/// # async fn main() {
/// use slipstream_core::config::SlipstreamConfig;
/// use slipstream_core::player::test_mocks::MockPlayerBuilder;
/// use slipstream_core::session::spawn_player_session;
///
/// let handle = spawn_player_session(SlipstreamConfig::default(), MockPlayerBuilder::new());
/// # }
/// ```
pub fn spawn_player_session<B>(config: SlipstreamConfig, builder: B) -> PlayerSessionHandle
where
    B: PlayerBuilder,
{
    let (sender, receiver) = mpsc::channel(config.session.command_queue_depth);
    let (event_sender, event_receiver) = mpsc::unbounded_channel();
    let (state_sender, state_receiver) = watch::channel(PlaybackState::None);
    let (error_sender, error_receiver) = broadcast::channel(config.channels.error_capacity);
    let (buffering_sender, buffering_receiver) =
        broadcast::channel(config.channels.buffering_capacity);
    let projections = SharedProjections::new();

    let session = PlayerSession::new(
        config,
        builder,
        event_sender,
        state_sender,
        error_sender,
        buffering_sender,
        projections.clone(),
    );

    tokio::spawn(async move {
        run_actor_loop(session, receiver, event_receiver).await;
    });

    PlayerSessionHandle::new(
        sender,
        state_receiver,
        error_receiver,
        buffering_receiver,
        projections,
    )
}

/// Runs the main actor message processing loop.
///
/// Commands and engine-pushed events are multiplexed into one consumer so
/// that state only ever changes from this task. The loop terminates on a
/// shutdown command, or tears the session down when every handle is gone.
async fn run_actor_loop<B>(
    mut session: PlayerSession<B>,
    mut receiver: mpsc::Receiver<SessionCommand>,
    mut event_receiver: mpsc::UnboundedReceiver<TaggedEvent>,
) where
    B: PlayerBuilder,
{
    debug!("player session actor started");

    loop {
        tokio::select! {
            command = receiver.recv() => match command {
                Some(command) => {
                    if !handle_command(&mut session, command).await {
                        break;
                    }
                }
                None => {
                    debug!("all session handles dropped; shutting down");
                    session.shutdown().await;
                    break;
                }
            },
            Some(event) = event_receiver.recv() => {
                session.handle_player_event(event).await;
            }
        }
    }

    debug!("player session actor stopped");
}

/// Handles a single command for the session.
/// Returns true to continue processing, false to shutdown.
async fn handle_command<B>(session: &mut PlayerSession<B>, command: SessionCommand) -> bool
where
    B: PlayerBuilder,
{
    match command {
        SessionCommand::SetSource { clip, responder } => {
            let result = session.set_source(clip).await;
            respond(session, responder, result);
        }

        SessionCommand::Start { responder } => {
            let result = session.start().await;
            respond(session, responder, result);
        }

        SessionCommand::Pause { responder } => {
            let result = session.pause().await;
            respond(session, responder, result);
        }

        SessionCommand::SeekTo {
            position,
            responder,
        } => {
            let result = session.seek_to(position).await;
            respond(session, responder, result);
        }

        SessionCommand::Suspend { responder } => {
            let result = session.suspend().await;
            respond(session, responder, result);
        }

        SessionCommand::Resume { responder } => {
            let result = session.resume().await;
            respond(session, responder, result);
        }

        SessionCommand::Stop { responder } => {
            let result = session.stop().await;
            respond(session, responder, result);
        }

        SessionCommand::ChangeActiveStream {
            descriptor,
            responder,
        } => {
            let result = session.change_active_stream(descriptor).await;
            respond(session, responder, result);
        }

        SessionCommand::GetStreamsDescription { kind, responder } => {
            let result = session.stream_descriptions(kind);
            respond(session, responder, result);
        }

        SessionCommand::Shutdown { responder } => {
            debug!("player session actor shutting down");
            session.shutdown().await;
            let _ = responder.send(());
            return false; // Signal to break out of the loop
        }
    }
    true // Continue processing
}

/// Completes a job: failures go to the error channel and to the awaiting
/// caller. One policy for every command, no silently swallowed faults.
fn respond<B, T>(
    session: &PlayerSession<B>,
    responder: oneshot::Sender<Result<T, SessionError>>,
    result: Result<T, SessionError>,
) where
    B: PlayerBuilder,
{
    if let Err(error) = &result {
        session.report_error(error);
    }
    let _ = responder.send(result);
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::player::test_mocks::MockPlayerBuilder;
    use crate::player::{ClipDefinition, PlayerError};

    #[tokio::test]
    async fn test_actor_spawn_and_shutdown() {
        let handle = spawn_player_session(SlipstreamConfig::default(), MockPlayerBuilder::new());
        assert!(handle.is_running());

        handle.dispose().await.unwrap();

        // Give the actor time to shut down
        tokio::time::sleep(Duration::from_millis(10)).await;

        let result = handle.start().await;
        assert!(matches!(result, Err(SessionError::Disposed)));
        assert!(!handle.is_running());
    }

    #[tokio::test]
    async fn test_dispose_is_idempotent() {
        let handle = spawn_player_session(SlipstreamConfig::default(), MockPlayerBuilder::new());
        handle.dispose().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.dispose().await.unwrap();
    }

    #[tokio::test]
    async fn test_set_source_rejects_malformed_url() {
        let handle = spawn_player_session(SlipstreamConfig::default(), MockPlayerBuilder::new());

        let result = handle
            .set_source(ClipDefinition::new("not a url"))
            .await;
        assert!(matches!(
            result,
            Err(SessionError::Player(PlayerError::InvalidSource { .. }))
        ));

        handle.dispose().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_without_source_is_noop() {
        let builder = MockPlayerBuilder::new();
        let record = builder.record();
        let handle = spawn_player_session(SlipstreamConfig::default(), builder);

        handle.start().await.unwrap();
        assert_eq!(handle.state(), PlaybackState::None);
        assert_eq!(record.play_calls(), 0);

        handle.dispose().await.unwrap();
    }
}
