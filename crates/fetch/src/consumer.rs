use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::credentials::{AuthChallenge, Credential};
use crate::error::NetworkError;
use crate::request::Request;
use crate::response::Response;

/// Identity of the party a job loads for. At most one job runs per identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConsumerId(pub u64);

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Requests a consumer makes from inside a callback.
///
/// The job applies them as soon as the callback returns, before it takes
/// another step.
#[derive(Debug, Default)]
pub struct LoadControl {
    cancel: bool,
    defer_delta: i32,
}

impl LoadControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the load. Nothing else is delivered afterwards.
    pub fn cancel(&mut self) {
        self.cancel = true;
    }

    /// Pause or resume delivery, stacking like `NetworkManager::set_defers_loading`
    pub fn set_defers_loading(&mut self, defers: bool) {
        self.defer_delta += if defers { 1 } else { -1 };
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel
    }

    pub fn defer_delta(&self) -> i32 {
        self.defer_delta
    }
}

/// The component that asked for a resource and receives its callbacks
pub trait ResourceConsumer {
    /// A redirect or authentication retry is about to be sent. The request may be edited.
    fn will_send_request(&mut self, _ctl: &mut LoadControl, _request: &mut Request, _prior: &Response) {}

    fn did_receive_response(&mut self, ctl: &mut LoadControl, response: &Response);

    fn did_receive_data(&mut self, ctl: &mut LoadControl, data: &[u8]);

    /// Upload progress
    fn did_send_data(&mut self, _ctl: &mut LoadControl, _sent: u64, _total: u64) {}

    fn did_finish_loading(&mut self);

    fn did_fail(&mut self, error: &NetworkError);

    /// Ask the user for a username and password. `None` or an empty credential abandons authentication.
    fn authentication_challenge(&mut self, _realm: &str) -> Option<Credential> {
        None
    }

    /// Whether the owning document accepts cookies
    fn cookies_enabled(&self) -> bool {
        true
    }
}

pub type SharedConsumer = Rc<RefCell<dyn ResourceConsumer>>;

/// A consumer together with the per-request state that survives job restarts
pub(crate) struct ResourceHandle {
    pub id: ConsumerId,
    pub client: SharedConsumer,
    pub challenge: Option<AuthChallenge>,
}

impl ResourceHandle {
    pub fn new(id: ConsumerId, client: SharedConsumer) -> Self {
        Self {
            id,
            client,
            challenge: None,
        }
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("id", &self.id)
            .field("challenge", &self.challenge)
            .finish_non_exhaustive()
    }
}
