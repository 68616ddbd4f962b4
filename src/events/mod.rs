//! Typed events decoded from raw TMI lines.
//!
//! One decoder per command family, each a mechanical tag extractor over
//! [`RawLine`](crate::message::RawLine). Decoders copy what they need; no
//! event retains a reference into the inbound frame.

mod clearchat;
mod clearmsg;
mod membership;
mod notice;
mod privmsg;
mod roomstate;
mod userstate;
mod usernotice;
mod whisper;

pub use self::clearchat::{ClearChat, ClearChatAction};
pub use self::clearmsg::ClearMsg;
pub use self::membership::Membership;
pub use self::notice::Notice;
pub use self::privmsg::Privmsg;
pub use self::roomstate::{Roomstate, RoomstateDelta};
pub use self::usernotice::{Usernotice, UsernoticeKind};
pub use self::userstate::{GlobalUserstate, Userstate};
pub use self::whisper::Whisper;
