//! Adapters for the Admission Pipeline

pub mod handler;
pub mod ingress;

pub use handler::ChannelHandler;
pub use ingress::{ingress_channel, IngressReceiver, IngressSender};
