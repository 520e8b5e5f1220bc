//! Connection-bearing nodes. Each one can own its connection or share one
//! from the resource pool via a `ref://<id>` setting.

mod tcp_client;

pub use tcp_client::{TCP_CLIENT_TYPE, TcpClient, TcpClientNode};
