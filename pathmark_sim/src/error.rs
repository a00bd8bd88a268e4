use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("simulated bus timeout")]
    Timeout,
    #[error("cannot subscribe to {requested}: {active} is still subscribed")]
    SubscriptionConflict {
        active: &'static str,
        requested: &'static str,
    },
    #[error("not subscribed to {0}")]
    NotSubscribed(&'static str),
    #[error("injected fault: {0}")]
    Injected(String),
}

pub type Result<T> = std::result::Result<T, SimError>;
