//! End-to-end client scenarios against a recording mock transport.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use minitwitch_irc::{
    ClientConfig, CommandSet, EventHandler, IrcClient, IrcCommand, Membership, Privmsg, Transport,
    TransportError, TransportEvent, Userstate,
};

// ----------------------------------------------------------------------
// Mock transport
// ----------------------------------------------------------------------

struct MockTransport {
    events: UnboundedSender<TransportEvent>,
    sent: Mutex<Vec<(String, bool)>>,
    connected: AtomicBool,
    ever_connected: AtomicBool,
    restarts: AtomicUsize,
}

impl MockTransport {
    fn new(events: UnboundedSender<TransportEvent>) -> Self {
        Self {
            events,
            sent: Mutex::new(Vec::new()),
            connected: AtomicBool::new(false),
            ever_connected: AtomicBool::new(false),
            restarts: AtomicUsize::new(0),
        }
    }

    fn frames(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(f, _)| f.clone()).collect()
    }

    fn frames_with_flags(&self) -> Vec<(String, bool)> {
        self.sent.lock().unwrap().clone()
    }

    fn count_frames(&self, prefix: &str) -> usize {
        self.frames().iter().filter(|f| f.starts_with(prefix)).count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn start(&self, _uri: &str, _cancel: &CancellationToken) -> Result<(), TransportError> {
        self.connected.store(true, Ordering::SeqCst);
        let reconnection = self.ever_connected.swap(true, Ordering::SeqCst);
        let _ = self.events.send(TransportEvent::Open { reconnection });
        Ok(())
    }

    async fn send(&self, frame: &str, suppress_log: bool) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.sent.lock().unwrap().push((frame.to_string(), suppress_log));
        Ok(())
    }

    async fn disconnect(&self, _cancel: &CancellationToken) -> Result<(), TransportError> {
        if self.connected.swap(false, Ordering::SeqCst) {
            let _ = self.events.send(TransportEvent::Closed);
        }
        Ok(())
    }

    async fn restart(
        &self,
        delay: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), TransportError> {
        self.restarts.fetch_add(1, Ordering::SeqCst);
        self.disconnect(cancel).await?;
        sleep(delay).await;
        self.start("", cancel).await
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

// ----------------------------------------------------------------------
// Recording handler
// ----------------------------------------------------------------------

#[derive(Default)]
struct RecordingHandler {
    connects: AtomicUsize,
    reconnects: AtomicUsize,
    disconnects: AtomicUsize,
    messages: Mutex<Vec<String>>,
    joined: Mutex<Vec<String>>,
    parted: Mutex<Vec<String>>,
    userstates: Mutex<Vec<Userstate>>,
    /// Message text that makes `on_message` panic.
    panic_on: Mutex<Option<String>>,
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn on_connect(&self) {
        self.connects.fetch_add(1, Ordering::SeqCst);
    }

    async fn on_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
    }

    async fn on_disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }

    async fn on_message(&self, message: Privmsg) {
        if self.panic_on.lock().unwrap().as_deref() == Some(message.text.as_str()) {
            panic!("handler exploded on purpose");
        }
        self.messages.lock().unwrap().push(message.text);
    }

    async fn on_channel_join(&self, channel: minitwitch_irc::JoinedChannel) {
        self.joined.lock().unwrap().push(channel.name);
    }

    async fn on_channel_part(&self, membership: Membership) {
        self.parted.lock().unwrap().push(membership.channel);
    }

    async fn on_user_state(&self, state: Userstate) {
        self.userstates.lock().unwrap().push(state);
    }
}

// ----------------------------------------------------------------------
// Harness
// ----------------------------------------------------------------------

struct Harness {
    client: IrcClient,
    transport: Arc<MockTransport>,
    handler: Arc<RecordingHandler>,
    inbound: UnboundedSender<TransportEvent>,
}

impl Harness {
    fn new(config: ClientConfig) -> Self {
        // Surface client logs in test output when RUST_LOG is set.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Arc::new(MockTransport::new(tx.clone()));
        let handler = Arc::new(RecordingHandler::default());
        let client =
            IrcClient::with_transport(config, handler.clone(), transport.clone(), rx).unwrap();
        Self {
            client,
            transport,
            handler,
            inbound: tx,
        }
    }

    fn feed(&self, frame: &str) {
        self.inbound
            .send(TransportEvent::Data(frame.to_string()))
            .unwrap();
    }

    /// Drive connect to completion by answering the login with 001.
    async fn connect_and_welcome(&self, welcome_nick: &str) {
        let client = self.client.clone();
        let task = tokio::spawn(async move { client.connect().await });
        assert!(
            wait_for(|| !self.transport.frames().is_empty()).await,
            "login frames never written"
        );
        self.feed(&format!(":tmi.twitch.tv 001 {welcome_nick} :Welcome, GLHF!\r\n"));
        assert!(task.await.unwrap(), "connect did not confirm");
    }

    /// Drive a join to completion by answering with a full ROOMSTATE.
    async fn join_and_confirm(&self, channel: &str) -> bool {
        let client = self.client.clone();
        let name = channel.to_string();
        let task = tokio::spawn(async move { client.join_channel(&name).await });
        let expected = format!("JOIN #{channel}\r\n");
        assert!(
            wait_for(|| self.transport.frames().iter().any(|f| f == &expected)).await,
            "JOIN frame never written"
        );
        self.feed(&full_roomstate(channel));
        task.await.unwrap()
    }
}

fn full_roomstate(channel: &str) -> String {
    format!(
        "@emote-only=0;followers-only=-1;r9k=0;rituals=0;room-id=1;slow=0;subs-only=0 \
         :tmi.twitch.tv ROOMSTATE #{channel}\r\n"
    )
}

fn authed_config() -> ClientConfig {
    ClientConfig {
        username: "alice".into(),
        token: Some("abcd".into()),
        reconnect_delay: Duration::from_millis(50),
        ..ClientConfig::default()
    }
}

async fn wait_for(cond: impl Fn() -> bool) -> bool {
    for _ in 0..300 {
        if cond() {
            return true;
        }
        sleep(Duration::from_millis(10)).await;
    }
    false
}

// ----------------------------------------------------------------------
// Scenarios
// ----------------------------------------------------------------------

#[tokio::test]
async fn happy_path_connect_and_join() {
    let h = Harness::new(authed_config());
    h.connect_and_welcome("alice").await;

    let frames = h.transport.frames();
    assert_eq!(
        frames,
        vec![
            "CAP REQ :twitch.tv/tags twitch.tv/commands\r\n".to_string(),
            "PASS oauth:abcd\r\n".to_string(),
            "NICK alice\r\n".to_string(),
        ]
    );
    assert!(wait_for(|| h.handler.connects.load(Ordering::SeqCst) == 1).await);
    assert_eq!(h.handler.reconnects.load(Ordering::SeqCst), 0);

    assert!(h.join_and_confirm("bob").await);
    let joined = h.client.joined_channels();
    assert_eq!(joined.len(), 1);
    assert_eq!(joined[0].name, "bob");
    assert_eq!(joined[0].followers_only, -1);
    assert!(wait_for(|| h.handler.joined.lock().unwrap().len() == 1).await);
}

#[tokio::test]
async fn credential_frames_are_log_suppressed() {
    let h = Harness::new(authed_config());
    h.connect_and_welcome("alice").await;

    let flagged = h.transport.frames_with_flags();
    assert!(!flagged[0].1, "CAP REQ is not credential-bearing");
    assert!(flagged[1].1, "PASS must be suppressed from logs");
    assert!(flagged[2].1, "NICK must be suppressed from logs");
}

#[tokio::test]
async fn anonymous_login_and_send_refusal() {
    let h = Harness::new(ClientConfig::default());
    let client = h.client.clone();
    let task = tokio::spawn(async move { client.connect().await });

    assert!(wait_for(|| h.transport.frames().len() >= 2).await);
    let frames = h.transport.frames();
    assert_eq!(frames[0], "CAP REQ :twitch.tv/tags twitch.tv/commands\r\n");
    let nick = frames[1]
        .strip_prefix("NICK justinfan")
        .and_then(|rest| rest.trim_end().parse::<u32>().ok())
        .expect("anonymous NICK frame");
    assert!((100..=999).contains(&nick), "nick digits out of range: {nick}");

    h.feed(&format!(":tmi.twitch.tv 001 justinfan{nick} :Welcome, GLHF!\r\n"));
    assert!(task.await.unwrap());

    h.client.send_message("bob", "hi").await;
    sleep(Duration::from_millis(50)).await;
    assert_eq!(h.transport.count_frames("PRIVMSG"), 0);
}

#[tokio::test]
async fn server_initiated_reconnect_restarts_and_rejoins() {
    let h = Harness::new(authed_config());
    h.connect_and_welcome("alice").await;
    assert!(h.join_and_confirm("bob").await);

    h.feed(":tmi.twitch.tv RECONNECT\r\n");
    assert!(wait_for(|| h.handler.reconnects.load(Ordering::SeqCst) >= 1).await);
    assert!(wait_for(|| h.transport.restarts.load(Ordering::SeqCst) == 1).await);

    // After the restart the login repeats and the joined channel is re-JOINed.
    assert!(wait_for(|| h.transport.count_frames("PASS ") == 2).await);
    assert!(wait_for(|| h.transport.count_frames("JOIN #bob") == 2).await);
    h.feed(&full_roomstate("bob"));
    h.feed(":tmi.twitch.tv 001 alice :Welcome, GLHF!\r\n");

    // The second login is a reconnect, never a second connect.
    assert!(wait_for(|| h.handler.reconnects.load(Ordering::SeqCst) >= 2).await);
    assert_eq!(h.handler.connects.load(Ordering::SeqCst), 1);
    assert_eq!(h.client.joined_channels().len(), 1);
}

#[tokio::test]
async fn rate_limited_send_is_held_back() {
    let h = Harness::new(ClientConfig {
        message_limit: 2,
        ..authed_config()
    });
    h.connect_and_welcome("alice").await;

    h.client.send_message("bob", "one").await;
    h.client.send_message("bob", "two").await;
    assert_eq!(h.transport.count_frames("PRIVMSG #bob"), 2);

    // The third send hits the governor and parks in its 2500 ms retry loop.
    let client = h.client.clone();
    let third = tokio::spawn(async move { client.send_message("bob", "three").await });
    sleep(Duration::from_millis(150)).await;
    assert_eq!(h.transport.count_frames("PRIVMSG #bob"), 2);
    third.abort();
}

#[tokio::test]
async fn moderator_uplift_is_per_channel() {
    let h = Harness::new(ClientConfig {
        message_limit: 1,
        ..authed_config()
    });
    h.connect_and_welcome("alice").await;

    h.feed("@badges=moderator/1;mod=1 :tmi.twitch.tv USERSTATE #bob\r\n");
    assert!(wait_for(|| h.client.is_moderator("bob")).await);
    assert!(!h.client.is_moderator("carol"));
    assert!(wait_for(|| {
        let states = h.handler.userstates.lock().unwrap();
        states.iter().any(|s| s.channel == "bob" && s.is_moderator)
    })
    .await);

    // Three sends to the moderated channel all pass the uplifted cap.
    h.client.send_message("bob", "one").await;
    h.client.send_message("bob", "two").await;
    h.client.send_message("bob", "three").await;
    assert_eq!(h.transport.count_frames("PRIVMSG #bob"), 3);

    // The unmoderated channel stays on the normal cap.
    h.client.send_message("carol", "one").await;
    let client = h.client.clone();
    let held = tokio::spawn(async move { client.send_message("carol", "two").await });
    sleep(Duration::from_millis(150)).await;
    assert_eq!(h.transport.count_frames("PRIVMSG #carol"), 1);
    held.abort();
}

#[tokio::test]
async fn handler_panic_does_not_stop_dispatch() {
    let sink_hits = Arc::new(AtomicUsize::new(0));
    let sink_counter = Arc::clone(&sink_hits);
    let h = Harness::new(ClientConfig {
        exception_sink: Some(Arc::new(move |_hook, _payload| {
            sink_counter.fetch_add(1, Ordering::SeqCst);
        })),
        ..authed_config()
    });
    *h.handler.panic_on.lock().unwrap() = Some("boom".to_string());
    h.connect_and_welcome("alice").await;

    h.feed(
        ":troll!troll@troll.tmi.twitch.tv PRIVMSG #bob :boom\r\n\
         :carol!carol@carol.tmi.twitch.tv PRIVMSG #bob :fine\r\n",
    );

    assert!(wait_for(|| h.handler.messages.lock().unwrap().contains(&"fine".to_string())).await);
    assert!(wait_for(|| sink_hits.load(Ordering::SeqCst) == 1).await);
    assert!(!h.handler.messages.lock().unwrap().contains(&"boom".to_string()));
}

#[tokio::test]
async fn rejoining_a_joined_channel_keeps_the_set_unique() {
    let h = Harness::new(authed_config());
    h.connect_and_welcome("alice").await;

    assert!(h.join_and_confirm("bob").await);
    // A second JOIN still writes a frame and still succeeds on the latch,
    // but the set gains nothing.
    assert!(h.join_and_confirm("bob").await);
    assert_eq!(h.transport.count_frames("JOIN #bob"), 2);
    assert_eq!(h.client.joined_channels().len(), 1);
}

#[tokio::test]
async fn parting_an_unknown_channel_still_fires_the_hook() {
    let h = Harness::new(authed_config());
    h.connect_and_welcome("alice").await;
    assert!(h.join_and_confirm("bob").await);

    h.client.part_channel("ghost").await;
    assert_eq!(h.transport.count_frames("PART #ghost"), 1);

    h.feed(":alice!alice@alice.tmi.twitch.tv PART #ghost\r\n");
    assert!(wait_for(|| h.handler.parted.lock().unwrap().contains(&"ghost".to_string())).await);
    assert_eq!(h.client.joined_channels().len(), 1);
}

#[tokio::test]
async fn part_removes_the_channel_from_the_joined_set() {
    let h = Harness::new(authed_config());
    h.connect_and_welcome("alice").await;
    assert!(h.join_and_confirm("bob").await);

    h.feed(":alice!alice@alice.tmi.twitch.tv PART #bob\r\n");
    assert!(wait_for(|| h.client.joined_channels().is_empty()).await);
}

#[tokio::test]
async fn sends_are_refused_while_disconnected() {
    let h = Harness::new(authed_config());
    h.client.send_message("bob", "hi").await;
    h.client.send_raw("PRIVMSG #bob :hi").await;
    assert!(h.client.joined_channels().is_empty());
    assert!(h.transport.frames().is_empty());
}

#[tokio::test]
async fn nonce_with_spaces_is_refused() {
    let h = Harness::new(authed_config());
    h.connect_and_welcome("alice").await;

    h.client.send_message_with("bob", "hi", false, "bad nonce").await;
    sleep(Duration::from_millis(50)).await;
    assert_eq!(h.transport.count_frames("PRIVMSG"), 0);

    h.client.send_message_with("bob", "hi", false, "good-nonce").await;
    assert_eq!(
        h.transport.count_frames("@client-nonce=good-nonce PRIVMSG #bob :hi"),
        1
    );
}

#[tokio::test]
async fn action_and_reply_frames_compose_correctly() {
    let h = Harness::new(authed_config());
    h.connect_and_welcome("alice").await;

    h.client.send_message_with("bob", "waves", true, "").await;
    assert_eq!(h.transport.count_frames("PRIVMSG #bob :.me waves"), 1);

    h.client.reply_to("parent-1", "bob", "agreed", false).await;
    assert_eq!(
        h.transport
            .count_frames("@reply-parent-msg-id=parent-1 PRIVMSG #bob :agreed"),
        1
    );
}

#[tokio::test]
async fn ping_is_answered_with_pong() {
    let h = Harness::new(authed_config());
    h.connect_and_welcome("alice").await;

    h.feed("PING :tmi.twitch.tv\r\n");
    assert!(wait_for(|| h.transport.count_frames("PONG :tmi.twitch.tv") == 1).await);
}

#[tokio::test]
async fn ignored_commands_are_dropped() {
    let h = Harness::new(ClientConfig {
        ignored_commands: CommandSet::of(&[IrcCommand::Privmsg]),
        ..authed_config()
    });
    h.connect_and_welcome("alice").await;

    h.feed(":carol!carol@carol.tmi.twitch.tv PRIVMSG #bob :dropped\r\n");
    h.feed("PING :tmi.twitch.tv\r\n");
    assert!(wait_for(|| h.transport.count_frames("PONG") == 1).await);
    assert!(h.handler.messages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn transport_close_fires_on_disconnect() {
    let h = Harness::new(authed_config());
    h.connect_and_welcome("alice").await;

    h.client.disconnect().await;
    assert!(wait_for(|| h.handler.disconnects.load(Ordering::SeqCst) == 1).await);
}

#[tokio::test]
async fn dispose_rejects_further_operations() {
    let h = Harness::new(authed_config());
    h.connect_and_welcome("alice").await;
    assert!(h.join_and_confirm("bob").await);

    h.client.dispose().await;
    assert!(h.client.joined_channels().is_empty());
    assert!(!h.client.connect().await);
    let frames_before = h.transport.frames().len();
    h.client.send_message("bob", "hi").await;
    assert_eq!(h.transport.frames().len(), frames_before);
}
