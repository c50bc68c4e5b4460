use serde::{Deserialize, Serialize};
use std::any::Any;
use std::rc::Rc;
use tilespace_pool::Handle;

/// Identifier of a message kind. Ids below [`MessageId::USER`] are reserved for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub u32);

impl MessageId {
    /// Broadcast after a level finished loading and every object of it exists.
    pub const MAP_READY: Self = Self(0);
    /// First id available to games.
    pub const USER: Self = Self(256);

    pub const fn user(offset: u32) -> Self {
        Self(Self::USER.0 + offset)
    }
}

/// Data travelling with a message.
#[derive(Debug, Clone, Default)]
pub enum Payload {
    #[default]
    None,
    Int(i64),
    Float(f64),
    Text(String),
    Handle(Handle),
    /// Anything else; receivers downcast.
    Opaque(Rc<dyn Any>),
}

impl Payload {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<Handle> {
        match self {
            Self::Handle(h) => Some(*h),
            _ => None,
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Opaque(value) => value.downcast_ref(),
            _ => None,
        }
    }
}

/// A message id plus its payload.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: MessageId,
    pub payload: Payload,
}

impl Message {
    pub fn new(id: MessageId) -> Self {
        Self {
            id,
            payload: Payload::None,
        }
    }

    pub fn with_payload(id: MessageId, payload: Payload) -> Self {
        Self { id, payload }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_ids_start_after_reserved_range() {
        assert_eq!(MessageId::user(0), MessageId::USER);
        assert!(MessageId::user(3) > MessageId::MAP_READY);
    }

    #[test]
    fn payload_accessors() {
        assert_eq!(Payload::Int(4).as_int(), Some(4));
        assert_eq!(Payload::Float(0.5).as_float(), Some(0.5));
        assert_eq!(Payload::Text("hi".into()).as_text(), Some("hi"));
        assert_eq!(Payload::None.as_int(), None);
    }

    #[test]
    fn opaque_payload_downcasts() {
        let payload = Payload::Opaque(Rc::new(17u16));
        assert_eq!(payload.downcast_ref::<u16>(), Some(&17));
        assert!(payload.downcast_ref::<u32>().is_none());
    }

    #[test]
    fn message_defaults_to_empty_payload() {
        let msg = Message::new(MessageId::MAP_READY);
        assert!(matches!(msg.payload, Payload::None));
    }
}
