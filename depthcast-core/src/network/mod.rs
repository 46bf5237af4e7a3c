mod connection;
pub mod transport;

pub use transport::{
    ConnectionEvent, ConnectionId, Dispatcher, InboundPacket, TcpTransport, Transport,
};
