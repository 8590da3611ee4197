//! The generic stream dispatch loop.
//!
//! One loop instance drives one duplex stream through its whole lifecycle:
//! open, register, then a strictly sequential receive/dispatch/send cycle
//! until the peer ends the stream, the token is cancelled, or an
//! unrecoverable error occurs. Concurrency across workers comes from
//! running many independent loops, never from within one loop.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::stream::{StreamError, WorkStream};
use crate::worker::WorkerError;

/// Drive one duplex stream to completion.
///
/// * `open` produces the stream; an open failure is fatal and is not
///   retried here.
/// * `registration` is sent as the first outbound message.
/// * `dispatch` maps one inbound message to `Ok(Some(reply))`,
///   `Ok(None)` (nothing to send, e.g. a registration ack), or a fatal
///   error.
///
/// Cancellation is cooperative: the token is checked once per iteration,
/// before blocking on the next receive, so a loop parked in `receive`
/// observes it only after that receive resolves. An in-flight dispatch is
/// never interrupted.
///
/// # Errors
///
/// Returns the first fatal error: open/send/receive failures other than
/// clean end-of-stream, or any error from `dispatch`.
pub async fn serve<S, O, Fut, F>(
    token: CancellationToken,
    open: O,
    registration: S::Outbound,
    mut dispatch: F,
) -> Result<(), WorkerError>
where
    S: WorkStream,
    O: FnOnce() -> Fut + Send,
    Fut: Future<Output = Result<S, StreamError>> + Send,
    F: FnMut(S::Inbound) -> Result<Option<S::Outbound>, WorkerError> + Send,
{
    let mut stream = open().await.map_err(WorkerError::Stream)?;

    stream.send(registration).await.map_err(WorkerError::Stream)?;

    loop {
        if token.is_cancelled() {
            debug!("cancellation requested, closing send side");
            stream.close_send().await.map_err(WorkerError::Stream)?;
            return Ok(());
        }

        match stream.receive().await {
            Ok(Some(msg)) => {
                if let Some(reply) = dispatch(msg)? {
                    stream.send(reply).await.map_err(WorkerError::Stream)?;
                }
            }
            Ok(None) => {
                // Expected terminal state, not a failure.
                debug!("peer ended the stream");
                stream.close_send().await.map_err(WorkerError::Stream)?;
                return Ok(());
            }
            Err(e) => return Err(WorkerError::Stream(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Scripted inbound frames for a mock stream.
    enum Frame {
        Msg(u32),
        Eof,
        Error(StreamError),
    }

    struct MockStream {
        script: VecDeque<Frame>,
        sent: Arc<Mutex<Vec<String>>>,
        closed: Arc<Mutex<bool>>,
    }

    impl MockStream {
        fn new(script: Vec<Frame>) -> (Self, Arc<Mutex<Vec<String>>>, Arc<Mutex<bool>>) {
            let sent = Arc::new(Mutex::new(Vec::new()));
            let closed = Arc::new(Mutex::new(false));
            (
                Self {
                    script: script.into(),
                    sent: Arc::clone(&sent),
                    closed: Arc::clone(&closed),
                },
                sent,
                closed,
            )
        }
    }

    #[async_trait]
    impl WorkStream for MockStream {
        type Inbound = u32;
        type Outbound = String;

        async fn send(&mut self, msg: String) -> Result<(), StreamError> {
            self.sent.lock().unwrap().push(msg);
            Ok(())
        }

        async fn receive(&mut self) -> Result<Option<u32>, StreamError> {
            match self.script.pop_front() {
                Some(Frame::Msg(n)) => Ok(Some(n)),
                Some(Frame::Eof) | None => Ok(None),
                Some(Frame::Error(e)) => Err(e),
            }
        }

        async fn close_send(&mut self) -> Result<(), StreamError> {
            *self.closed.lock().unwrap() = true;
            Ok(())
        }
    }

    const ACK: u32 = 0;

    fn echo_dispatch(msg: u32) -> Result<Option<String>, WorkerError> {
        if msg == ACK {
            return Ok(None);
        }
        Ok(Some(format!("reply:{msg}")))
    }

    #[tokio::test]
    async fn test_ack_only_then_eof_terminates_cleanly() {
        let (stream, sent, closed) = MockStream::new(vec![Frame::Msg(ACK), Frame::Eof]);
        let result = serve(
            CancellationToken::new(),
            || async move { Ok(stream) },
            "register".to_string(),
            echo_dispatch,
        )
        .await;

        assert!(result.is_ok());
        // Exactly one registration frame, zero replies.
        assert_eq!(*sent.lock().unwrap(), vec!["register".to_string()]);
        assert!(*closed.lock().unwrap());
    }

    #[tokio::test]
    async fn test_one_request_one_reply() {
        let (stream, sent, _) = MockStream::new(vec![Frame::Msg(ACK), Frame::Msg(7), Frame::Eof]);
        serve(
            CancellationToken::new(),
            || async move { Ok(stream) },
            "register".to_string(),
            echo_dispatch,
        )
        .await
        .unwrap();

        assert_eq!(
            *sent.lock().unwrap(),
            vec!["register".to_string(), "reply:7".to_string()]
        );
    }

    #[tokio::test]
    async fn test_replies_preserve_receipt_order() {
        let (stream, sent, _) = MockStream::new(vec![
            Frame::Msg(1),
            Frame::Msg(2),
            Frame::Msg(3),
            Frame::Eof,
        ]);
        serve(
            CancellationToken::new(),
            || async move { Ok(stream) },
            "register".to_string(),
            echo_dispatch,
        )
        .await
        .unwrap();

        assert_eq!(
            *sent.lock().unwrap(),
            vec!["register", "reply:1", "reply:2", "reply:3"]
        );
    }

    #[tokio::test]
    async fn test_dispatch_error_is_fatal() {
        let (stream, sent, _) =
            MockStream::new(vec![Frame::Msg(1), Frame::Msg(2), Frame::Eof]);
        let result = serve(
            CancellationToken::new(),
            || async move { Ok(stream) },
            "register".to_string(),
            |msg: u32| {
                if msg == 2 {
                    return Err(WorkerError::UnhandledMessage("msg 2".to_string()));
                }
                echo_dispatch(msg)
            },
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, WorkerError::UnhandledMessage(_)));
        // The first message was still answered before the fatal one.
        assert_eq!(*sent.lock().unwrap(), vec!["register", "reply:1"]);
    }

    #[tokio::test]
    async fn test_receive_error_is_fatal() {
        let (stream, _, closed) =
            MockStream::new(vec![Frame::Error(StreamError::ConnectionClosed)]);
        let result = serve(
            CancellationToken::new(),
            || async move { Ok(stream) },
            "register".to_string(),
            echo_dispatch,
        )
        .await;

        let err = result.unwrap_err();
        assert!(err.is_connection_closed());
        assert!(!*closed.lock().unwrap());
    }

    #[tokio::test]
    async fn test_open_failure_is_fatal() {
        let result = serve::<MockStream, _, _, _>(
            CancellationToken::new(),
            || async { Err(StreamError::Connect("refused".to_string())) },
            "register".to_string(),
            echo_dispatch,
        )
        .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("refused"));
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_closes_without_dispatching() {
        let (stream, sent, closed) = MockStream::new(vec![Frame::Msg(9), Frame::Eof]);
        let token = CancellationToken::new();
        token.cancel();

        let dispatched = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&dispatched);
        serve(
            token,
            || async move { Ok(stream) },
            "register".to_string(),
            move |msg: u32| {
                *flag.lock().unwrap() = true;
                echo_dispatch(msg)
            },
        )
        .await
        .unwrap();

        // Registration still goes out, but no message is dispatched.
        assert_eq!(*sent.lock().unwrap(), vec!["register".to_string()]);
        assert!(!*dispatched.lock().unwrap());
        assert!(*closed.lock().unwrap());
    }
}
