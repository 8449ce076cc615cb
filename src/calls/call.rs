//! Call lifecycle on top of a signaling connection.

use super::error::CallError;
use super::info::{CallInfo, CallOptions};
use super::state::{CallId, CallState, CallTransition};
use crate::message::{
    CallStartData, CallTerminateData, MemberlistData, ParticipantFlagData, Sdp, SdpUpdateData,
    SeppMessage, SourceUpdateData,
};
use crate::socket::{SeppTransport, Signaling, TlsOptions};
use log::{debug, info, trace, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

type TerminatedHandler = Box<dyn Fn(i32) + Send + Sync>;
type SdpUpdateHandler = Box<dyn Fn(Sdp) + Send + Sync>;
type MemberlistHandler = Box<dyn Fn(MemberlistData) + Send + Sync>;
type SourceUpdateHandler = Box<dyn Fn(SourceUpdateData) + Send + Sync>;

#[derive(Default)]
struct Handlers {
    terminated: Option<TerminatedHandler>,
    sdp_update: Option<SdpUpdateHandler>,
    memberlist: Option<MemberlistHandler>,
    source_update: Option<SourceUpdateHandler>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One call placed over one signaling connection.
///
/// ```no_run
/// # async fn run(offer: sepp_rust::message::Sdp) -> Result<(), sepp_rust::calls::CallError> {
/// use sepp_rust::calls::{Call, CallDetails, CallOptions};
/// use std::time::Duration;
///
/// let details = CallDetails {
///     auth_token: "jwt".to_string(),
///     client_id: "client-1".to_string(),
///     conf_id: "conf-1".to_string(),
///     ..Default::default()
/// };
/// let call = Call::new(&details, CallOptions::default())?;
/// call.on_terminated(|code| println!("terminated: {code}"));
///
/// let (call_id, answer) = call.start(offer, "Guest", Duration::from_secs(10)).await?;
/// call.terminate(Duration::from_secs(5)).await?;
/// call.close().await;
/// # Ok(())
/// # }
/// ```
pub struct Call {
    signaling: Arc<dyn Signaling>,
    client_id: String,
    conf_id: String,
    platform: Option<String>,
    call_id: OnceLock<CallId>,
    state: Arc<Mutex<CallState>>,
    /// Last connection status seen by `start`.
    connected: AtomicBool,
    /// Moved into the dispatch task once the call is accepted.
    handlers: Mutex<Handlers>,
    cancel: CancellationToken,
    /// Term code of the server's `call_terminated`, set at most once.
    terminated: Arc<watch::Sender<Option<i32>>>,
    dispatch: Mutex<Option<JoinHandle<()>>>,
}

impl Call {
    /// Builds a call with its own [`SeppTransport`]. Must be called within a tokio runtime.
    pub fn new(info: &impl CallInfo, options: CallOptions) -> Result<Self, CallError> {
        let tls = options
            .tls_options()
            .as_ref()
            .map(TlsOptions::build)
            .transpose()
            .map_err(CallError::Setup)?;
        let transport = SeppTransport::new(
            info.sig_endpoint(),
            Some(info.auth_token().to_string()),
            tls,
        )
        .map_err(CallError::Setup)?;
        Ok(Self::with_signaling(info, options, Arc::new(transport)))
    }

    /// Builds a call over an existing signaling connection.
    pub fn with_signaling(
        info: &impl CallInfo,
        options: CallOptions,
        signaling: Arc<dyn Signaling>,
    ) -> Self {
        let (terminated, _) = watch::channel(None);
        Self {
            signaling,
            client_id: info.client_id().to_string(),
            conf_id: info.conf_id().to_string(),
            platform: options.platform,
            call_id: OnceLock::new(),
            state: Arc::new(Mutex::new(CallState::Idle)),
            connected: AtomicBool::new(false),
            handlers: Mutex::new(Handlers::default()),
            cancel: CancellationToken::new(),
            terminated: Arc::new(terminated),
            dispatch: Mutex::new(None),
        }
    }

    /// Called with the term code once the server confirms termination.
    /// Must be set before [`Call::start`].
    pub fn on_terminated<F>(&self, handler: F)
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        lock(&self.handlers).terminated = Some(Box::new(handler));
    }

    /// Called when the remote end renegotiates. Must be set before [`Call::start`].
    pub fn on_sdp_update<F>(&self, handler: F)
    where
        F: Fn(Sdp) + Send + Sync + 'static,
    {
        lock(&self.handlers).sdp_update = Some(Box::new(handler));
    }

    /// Called on roster changes. Must be set before [`Call::start`].
    pub fn on_memberlist<F>(&self, handler: F)
    where
        F: Fn(MemberlistData) + Send + Sync + 'static,
    {
        lock(&self.handlers).memberlist = Some(Box::new(handler));
    }

    /// Called when the podium layout changes. Must be set before [`Call::start`].
    pub fn on_source_update<F>(&self, handler: F)
    where
        F: Fn(SourceUpdateData) + Send + Sync + 'static,
    {
        lock(&self.handlers).source_update = Some(Box::new(handler));
    }

    /// The server-assigned call id, set once the call was accepted.
    pub fn call_id(&self) -> Option<&CallId> {
        self.call_id.get()
    }

    pub fn state(&self) -> CallState {
        lock(&self.state).clone()
    }

    fn transition(&self, transition: CallTransition) -> Result<(), CallError> {
        lock(&self.state).apply(transition)?;
        Ok(())
    }

    fn active_call_id(&self) -> Result<&CallId, CallError> {
        self.call_id.get().ok_or(CallError::NoActiveCall)
    }

    /// Places the call and waits for the server's answer.
    ///
    /// `timeout` bounds the whole handshake, connection included. Statuses
    /// queued since the last attempt are drained first; only when none says
    /// the connection is up does it wait for the next one. On any failure the
    /// call returns to [`CallState::Idle`] and may be started again.
    pub async fn start(
        &self,
        offer: Sdp,
        display_name: &str,
        timeout: Duration,
    ) -> Result<(CallId, Sdp), CallError> {
        if self.call_id.get().is_some() {
            return Err(CallError::AlreadyInProgress);
        }
        lock(&self.state)
            .apply(CallTransition::StartRequested)
            .map_err(|_| CallError::AlreadyInProgress)?;

        // Also runs when the caller drops this future mid-handshake.
        let _rollback = scopeguard::guard((), |_| {
            let mut state = lock(&self.state);
            if state.is_starting() {
                debug!(target: "Sepp/Call", "Start aborted, back to idle");
                if let Err(e) = state.apply(CallTransition::StartFailed) {
                    warn!(target: "Sepp/Call", "Rollback: {e}");
                }
            }
        });

        let handshake = async {
            let mut latest = None;
            while let Some(status) = self.signaling.try_next_status() {
                latest = Some(status);
            }
            let status = match latest {
                Some(status) => Some(status),
                None if self.connected.load(Ordering::SeqCst) => Some(true),
                None => self.signaling.next_status().await,
            };
            self.connected.store(status == Some(true), Ordering::SeqCst);
            if status != Some(true) {
                return Err(CallError::ConnectFailed);
            }
            self.transition(CallTransition::Connected)?;

            let start = SeppMessage::call_start(
                &self.client_id,
                &self.conf_id,
                CallStartData {
                    sdp: offer,
                    display_name: display_name.to_string(),
                    platform: self.platform.clone(),
                },
            );
            self.signaling.send_message(&start).await?;

            loop {
                match self.signaling.recv().await {
                    None => return Err(CallError::ChannelClosed),
                    Some(SeppMessage::Memberlist(_)) => {
                        debug!(target: "Sepp/Call", "Skipping memberlist received before accept");
                    }
                    Some(SeppMessage::CallAccepted(msg)) => return Ok(msg.data),
                    Some(SeppMessage::CallRejected(msg)) => {
                        return Err(CallError::Rejected {
                            code: msg.data.reject_code,
                        });
                    }
                    Some(other) => {
                        return Err(CallError::Protocol {
                            kind: other.kind().to_string(),
                        });
                    }
                }
            }
        };

        let accepted = match tokio::time::timeout(timeout, handshake).await {
            Ok(result) => result,
            Err(_) => Err(CallError::Timeout),
        };
        let accepted = match accepted {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(target: "Sepp/Call", "Failed to start call: {e}");
                return Err(e);
            }
        };

        let call_id = CallId::new(accepted.call_id);
        self.transition(CallTransition::Accepted {
            call_id: call_id.clone(),
        })?;
        if self.call_id.set(call_id.clone()).is_err() {
            return Err(CallError::AlreadyInProgress);
        }
        info!(target: "Sepp/Call", "Call {call_id} accepted");

        let dispatcher = Dispatcher {
            signaling: Arc::clone(&self.signaling),
            call_id: call_id.clone(),
            state: Arc::clone(&self.state),
            handlers: std::mem::take(&mut *lock(&self.handlers)),
            terminated: Arc::clone(&self.terminated),
            cancel: self.cancel.child_token(),
        };
        *lock(&self.dispatch) = Some(tokio::spawn(dispatcher.run()));

        Ok((call_id, accepted.sdp))
    }

    /// Asks the server to end the call and waits for its confirmation.
    ///
    /// Resolves at once if the server already reported the termination.
    pub async fn terminate(&self, timeout: Duration) -> Result<(), CallError> {
        let call_id = self.active_call_id()?;
        let mut terminated = self.terminated.subscribe();

        let msg = SeppMessage::call_terminate(
            &self.client_id,
            &self.conf_id,
            CallTerminateData {
                call_id: call_id.to_string(),
                term_code: 0,
            },
        );
        self.signaling.send_message(&msg).await?;
        debug!(target: "Sepp/Call", "Sent call_terminate for {call_id}");

        {
            let mut state = lock(&self.state);
            if !state.is_closed() {
                state.apply(CallTransition::TerminateRequested)?;
            }
        }

        match tokio::time::timeout(timeout, terminated.wait_for(Option::is_some)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(CallError::ChannelClosed),
            Err(_) => Err(CallError::Timeout),
        }
    }

    /// Sends a renegotiated SDP to the remote end. Does not wait for an answer.
    pub async fn update_sdp(&self, sdp: Sdp) -> Result<(), CallError> {
        let call_id = self.active_call_id()?;
        let msg = SeppMessage::sdp_update(
            &self.client_id,
            &self.conf_id,
            SdpUpdateData {
                call_id: call_id.to_string(),
                sdp,
            },
        );
        self.signaling.send_message(&msg).await?;
        Ok(())
    }

    /// Mutes (`true`) or unmutes (`false`) the local video.
    pub async fn turn_off_video(&self, off: bool) -> Result<(), CallError> {
        let call_id = self.active_call_id()?;
        let msg = SeppMessage::mute_video(
            &self.client_id,
            &self.conf_id,
            ParticipantFlagData {
                call_id: call_id.to_string(),
                on: off,
                client_id: String::new(),
            },
        );
        self.signaling.send_message(&msg).await?;
        Ok(())
    }

    /// Shuts down the signaling connection without terminating the call.
    pub async fn close(&self) {
        self.cancel.cancel();
        self.signaling.stop().await;

        let dispatch = lock(&self.dispatch).take();
        if let Some(dispatch) = dispatch {
            if let Err(e) = dispatch.await {
                warn!(target: "Sepp/Call", "Dispatch task failed: {e}");
            }
        }

        if let Err(e) = self.transition(CallTransition::Closed) {
            debug!(target: "Sepp/Call", "Close: {e}");
        }
        info!(target: "Sepp/Call", "Call closed");
    }
}

impl Drop for Call {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Routes messages of an accepted call to its handlers.
struct Dispatcher {
    signaling: Arc<dyn Signaling>,
    call_id: CallId,
    state: Arc<Mutex<CallState>>,
    handlers: Handlers,
    terminated: Arc<watch::Sender<Option<i32>>>,
    cancel: CancellationToken,
}

impl Dispatcher {
    async fn run(self) {
        let mut status_open = true;
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                msg = self.signaling.recv() => {
                    let Some(msg) = msg else {
                        info!(target: "Sepp/Call", "Channel closed. Stopping dispatch");
                        break;
                    };
                    self.handle(msg);
                }
                // Keeps the reader from stalling on reconnects.
                status = self.signaling.next_status(), if status_open => match status {
                    Some(true) => info!(target: "Sepp/Call", "Signaling reconnected"),
                    Some(false) => warn!(target: "Sepp/Call", "Signaling connection lost"),
                    None => status_open = false,
                },
            }
        }
        debug!(target: "Sepp/Call", "Dispatch for {} stopped", self.call_id);
    }

    fn handle(&self, msg: SeppMessage) {
        match msg {
            SeppMessage::CallTerminated(msg) => {
                let data = msg.data;
                if !data.call_id.is_empty() && data.call_id != self.call_id.as_str() {
                    debug!(target: "Sepp/Call", "Ignoring call_terminated for other call {}", data.call_id);
                    return;
                }
                info!(target: "Sepp/Call", "Call {} terminated with code {}", self.call_id, data.term_code);
                if let Err(e) = lock(&self.state).apply(CallTransition::Terminated {
                    term_code: data.term_code,
                }) {
                    debug!(target: "Sepp/Call", "{e}");
                }
                if let Some(handler) = &self.handlers.terminated {
                    handler(data.term_code);
                }
                // Wakes `terminate` only after the handler ran.
                self.terminated.send_replace(Some(data.term_code));
            }
            SeppMessage::SdpUpdate(msg) => {
                if let Some(handler) = &self.handlers.sdp_update {
                    handler(msg.data.sdp);
                }
            }
            SeppMessage::Memberlist(msg) => {
                if let Some(handler) = &self.handlers.memberlist {
                    handler(msg.data);
                }
            }
            SeppMessage::SourceUpdate(msg) => {
                if let Some(handler) = &self.handlers.source_update {
                    handler(msg.data);
                }
            }
            other => trace!(target: "Sepp/Call", "Ignoring {}", other.kind()),
        }
    }
}
