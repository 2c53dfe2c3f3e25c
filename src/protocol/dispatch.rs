//! Routes decoded messages to persistent or one-shot handlers.
//!
//! Handlers turn a message's parameters into a value of type `T`; the
//! dispatcher hands those values back to its owner in arrival order instead
//! of letting handlers mutate shared state.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use super::{FrameDecoder, FrameError, Message, MessageType, ProtocolError};

type Persistent<T> = Box<dyn FnMut(&[String]) -> Result<T, ProtocolError> + Send>;
type OneShot<T> = Box<dyn FnOnce(MessageType, &[String]) -> Result<T, ProtocolError> + Send>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// A one-shot handler for this type is still pending.
    #[error("already awaiting {0}")]
    AlreadyAwaiting(MessageType),
    #[error("no message type to await")]
    NothingToAwait,
}

struct Waiter<T> {
    kinds: Vec<MessageType>,
    handler: OneShot<T>,
}

pub struct Dispatcher<T> {
    decoder: FrameDecoder,
    handlers: BTreeMap<MessageType, Persistent<T>>,
    awaiting: BTreeMap<MessageType, u64>,
    waiters: BTreeMap<u64, Waiter<T>>,
    next_waiter: u64,
}

impl<T> Dispatcher<T> {
    pub fn new() -> Self {
        Self::with_decoder(FrameDecoder::new())
    }

    pub fn with_decoder(decoder: FrameDecoder) -> Self {
        Self {
            decoder,
            handlers: BTreeMap::new(),
            awaiting: BTreeMap::new(),
            waiters: BTreeMap::new(),
            next_waiter: 0,
        }
    }

    /// Register (or replace) the persistent handler for `kind`.
    pub fn on<F>(&mut self, kind: MessageType, handler: F)
    where
        F: FnMut(&[String]) -> Result<T, ProtocolError> + Send + 'static,
    {
        self.handlers.insert(kind, Box::new(handler));
    }

    /// Register a handler consumed by the next `kind` message.
    pub fn once<F>(&mut self, kind: MessageType, handler: F) -> Result<(), DispatchError>
    where
        F: FnOnce(&[String]) -> Result<T, ProtocolError> + Send + 'static,
    {
        self.expect(&[kind], move |_, params| handler(params))
    }

    /// Register one handler consumed by the first message of any of
    /// `kinds`. Once it fires it is gone for every listed type.
    ///
    /// Fails if any listed type already has a pending one-shot handler.
    pub fn expect<F>(&mut self, kinds: &[MessageType], handler: F) -> Result<(), DispatchError>
    where
        F: FnOnce(MessageType, &[String]) -> Result<T, ProtocolError> + Send + 'static,
    {
        if kinds.is_empty() {
            return Err(DispatchError::NothingToAwait);
        }
        if let Some(kind) = kinds.iter().find(|kind| self.awaiting.contains_key(*kind)) {
            return Err(DispatchError::AlreadyAwaiting(*kind));
        }

        let id = self.next_waiter;
        self.next_waiter += 1;
        let mut unique: Vec<MessageType> = kinds.to_vec();
        unique.sort();
        unique.dedup();
        for kind in &unique {
            self.awaiting.insert(*kind, id);
        }
        self.waiters.insert(
            id,
            Waiter {
                kinds: unique,
                handler: Box::new(handler),
            },
        );
        Ok(())
    }

    pub fn is_awaiting(&self, kind: MessageType) -> bool {
        self.awaiting.contains_key(&kind)
    }

    pub fn has_handler(&self, kind: MessageType) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Drop every pending one-shot handler.
    pub fn clear_waiters(&mut self) {
        self.awaiting.clear();
        self.waiters.clear();
    }

    /// Forget buffered input and pending one-shots; persistent handlers stay.
    pub fn reset(&mut self) {
        self.decoder.clear();
        self.clear_waiters();
    }

    /// Buffer `bytes` and dispatch every line they complete.
    ///
    /// Returns handler outputs in arrival order. Undecodable or unhandled
    /// messages are dropped. On overflow the outputs are discarded; use
    /// [`feed_into`](Self::feed_into) to keep them.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<T>, FrameError> {
        let mut out = Vec::new();
        self.feed_into(bytes, &mut out)?;
        Ok(out)
    }

    /// Like [`feed`](Self::feed), appending outputs to `out`. Lines
    /// completed before an overflowing line are dispatched and kept even
    /// when the overflow is reported.
    pub fn feed_into(&mut self, bytes: &[u8], out: &mut Vec<T>) -> Result<(), FrameError> {
        let pushed = self.decoder.push(bytes);
        while let Some(frame) = self.decoder.next_frame() {
            match frame {
                Ok(message) => out.extend(self.dispatch(message)),
                Err(e) => log::debug!("Dropping undecodable line: {}", e),
            }
        }
        pushed
    }

    /// Route one message: a pending one-shot wins over the persistent
    /// handler, which is skipped for that message.
    pub fn dispatch(&mut self, message: Message) -> Option<T> {
        log::trace!("Received: {}", message);
        let kind = message.kind();

        let result = if let Some(id) = self.awaiting.remove(&kind) {
            let waiter = self.waiters.remove(&id)?;
            for other in &waiter.kinds {
                self.awaiting.remove(other);
            }
            (waiter.handler)(kind, message.params())
        } else if let Some(handler) = self.handlers.get_mut(&kind) {
            handler(message.params())
        } else {
            log::debug!("No handler for {}, dropping", kind);
            return None;
        };

        match result {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Dropping {}: {}", message, e);
                None
            }
        }
    }
}

impl<T> Default for Dispatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}
