/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! The Forkey bot.
//!
//! Registers on connect, answers server pings, joins its channel once the
//! server acknowledges the nick, greets `.hello` senders and announces the
//! titles of linked videos.

use crate::config::BotConfig;
use crate::irc;
use crate::links::find_youtube_ids;
use crate::youtube::video_url;
use forkey_core::error::SessionError;
use forkey_session::handler::{SessionContext, SessionHandler};
use forkey_worker::dispatch::{FetchRequest, Submitter};
use tracing::{debug, error, info, warn};

/// Sent to the channel right after joining.
pub const GREETING: &str = "Rust is a \x02great\x02 language";

/// Session handler implementing the bot.
#[derive(Debug)]
pub struct Bot {
    nick: String,
    channel: String,
    youtube_key: String,
    fetches: Option<Submitter>,
    joined: bool,
    failure: Option<SessionError>,
}

impl Bot {
    /// Creates a bot for `config`. Video lookups are disabled until a
    /// submitter is attached.
    #[must_use]
    pub fn new(config: &BotConfig) -> Self {
        Self {
            nick: config.irc.nick.clone(),
            channel: config.irc.channel.clone(),
            youtube_key: config.apis.youtube.key.clone(),
            fetches: None,
            joined: false,
            failure: None,
        }
    }

    /// Routes video lookups through `submitter`.
    #[must_use]
    pub fn with_fetches(mut self, submitter: Submitter) -> Self {
        self.fetches = Some(submitter);
        self
    }

    /// Returns true once the channel has been joined.
    #[must_use]
    pub const fn has_joined(&self) -> bool {
        self.joined
    }

    /// Returns the terminal session error, if one was reported.
    #[must_use]
    pub const fn failure(&self) -> Option<&SessionError> {
        self.failure.as_ref()
    }

    fn announce_videos(&self, line: &str) {
        let Some(fetches) = self.fetches.as_ref() else {
            return;
        };
        for id in find_youtube_ids(line) {
            debug!(%id, "looking up video");
            let channel = self.channel.clone();
            let request = FetchRequest::new(video_url(id, &self.youtube_key), move |ctx, summary| {
                ctx.write(irc::privmsg(&channel, &summary));
            });
            if let Err(e) = fetches.submit(request) {
                warn!(%id, error = %e, "video lookup not queued");
            }
        }
    }
}

impl SessionHandler for Bot {
    fn on_connected(&mut self, ctx: &mut SessionContext) {
        info!(nick = %self.nick, "registering");
        ctx.write(irc::nick(&self.nick));
        ctx.write(irc::user(&self.nick));
    }

    fn on_line(&mut self, line: &str, ctx: &mut SessionContext) {
        if irc::is_ping(line) {
            ctx.write(irc::make_pong(line));
        }

        if !self.joined && irc::is_mode_for(line, &self.nick) {
            info!(channel = %self.channel, "joining");
            ctx.write(irc::join(&self.channel));
            ctx.write(irc::privmsg(&self.channel, GREETING));
            self.joined = true;
        }

        if !irc::is_privmsg(line) {
            return;
        }
        if irc::is_hello(line) {
            if let Some(sender) = irc::nick_of(line) {
                ctx.write(irc::privmsg(&self.channel, &format!("hi {sender}")));
            }
        }
        self.announce_videos(line);
    }

    fn on_error(&mut self, err: &SessionError) {
        error!(error = %err, "connection lost");
        self.failure = Some(err.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forkey_core::error::FetchError;
    use forkey_core::types::Phase;
    use forkey_session::reactor::Task;
    use forkey_worker::dispatch::{FetchDispatcher, Fetcher, Poster};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn config() -> BotConfig {
        BotConfig::from_json(
            r##"{
                "irc": { "server": "irc.hostname.org", "channel": "#forkey", "nick": "forkey" },
                "apis": { "youtube": { "key": "KEY" } }
            }"##,
        )
        .unwrap()
    }

    fn written(ctx: SessionContext) -> Vec<String> {
        ctx.into_parts()
            .0
            .iter()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .collect()
    }

    fn on_line(bot: &mut Bot, line: &str) -> Vec<String> {
        let mut ctx = SessionContext::new(Phase::Connected);
        bot.on_line(line, &mut ctx);
        written(ctx)
    }

    #[test]
    fn test_registration_on_connect() {
        let mut bot = Bot::new(&config());
        let mut ctx = SessionContext::new(Phase::Connected);
        bot.on_connected(&mut ctx);
        assert_eq!(
            written(ctx),
            vec![
                "NICK forkey\r\n",
                "USER forkey remotehost remoteserver :Forkey Bot\r\n"
            ]
        );
    }

    #[test]
    fn test_ping_answered() {
        let mut bot = Bot::new(&config());
        assert_eq!(on_line(&mut bot, "PING :irc.hostname.org"), vec!["PONG :irc.hostname.org\r\n"]);
    }

    #[test]
    fn test_join_once_on_mode() {
        let mut bot = Bot::new(&config());
        let first = on_line(&mut bot, ":forkey MODE forkey :+i");
        assert_eq!(
            first,
            vec![
                "JOIN #forkey\r\n".to_string(),
                format!("PRIVMSG #forkey :{GREETING}\r\n")
            ]
        );
        assert!(bot.has_joined());
        assert!(on_line(&mut bot, ":forkey MODE forkey :+w").is_empty());
    }

    #[test]
    fn test_hello_greets_sender() {
        let mut bot = Bot::new(&config());
        assert_eq!(
            on_line(&mut bot, ":alice!a@host PRIVMSG #forkey :.hello"),
            vec!["PRIVMSG #forkey :hi alice\r\n"]
        );
        assert!(on_line(&mut bot, ":alice!a@host NOTICE #forkey :.hello").is_empty());
    }

    #[test]
    fn test_error_recorded() {
        let mut bot = Bot::new(&config());
        bot.on_error(&SessionError::StreamClosed);
        assert_eq!(bot.failure(), Some(&SessionError::StreamClosed));
    }

    #[derive(Clone, Default)]
    struct Inbox(Arc<Mutex<Vec<Task>>>);

    impl Poster for Inbox {
        fn post_task(&self, task: Task) -> bool {
            self.0.lock().push(task);
            true
        }
    }

    struct Canned(Arc<Mutex<Vec<String>>>);

    impl Fetcher for Canned {
        fn fetch(&mut self, target: &str) -> Result<String, FetchError> {
            self.0.lock().push(target.to_string());
            Ok("\x02youtube\x02: Title (1m2s)".to_string())
        }
    }

    #[test]
    fn test_video_links_fetched_and_announced() {
        let inbox = Inbox::default();
        let urls = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&urls);
        let dispatcher = FetchDispatcher::spawn(move || Ok(Canned(seen)), inbox.clone()).unwrap();
        let mut bot = Bot::new(&config()).with_fetches(dispatcher.submitter());

        let immediate = on_line(
            &mut bot,
            ":bob!b@host PRIVMSG #forkey :see youtu.be/abc and youtube.com/embed/xyz",
        );
        assert!(immediate.is_empty());
        dispatcher.shutdown();

        assert_eq!(
            *urls.lock(),
            vec![video_url("abc", "KEY"), video_url("xyz", "KEY")]
        );

        let mut ctx = SessionContext::new(Phase::Connected);
        for task in std::mem::take(&mut *inbox.0.lock()) {
            task(&mut ctx);
        }
        assert_eq!(
            written(ctx),
            vec![
                "PRIVMSG #forkey :\x02youtube\x02: Title (1m2s)\r\n",
                "PRIVMSG #forkey :\x02youtube\x02: Title (1m2s)\r\n"
            ]
        );
    }
}
