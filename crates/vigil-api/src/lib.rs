// vigil-api: Async Rust client for the NIDS backend (REST + live stream)

pub mod client;
pub mod error;
pub mod models;
pub mod stream;
pub mod transport;
pub mod websocket;

pub use client::NidsClient;
pub use error::Error;
pub use models::{
    AttackType, HealthResponse, LogStatistics, MonitoringStatistics, MonitoringStatus,
    SimulationData, SimulationResponse,
};
pub use stream::{
    AttackReport, ClientMessage, NetworkMetricsUpdate, StreamFrame, StreamMessage, TrafficUpdate,
    decode_frame,
};
pub use transport::{TlsMode, TransportConfig};
pub use websocket::{SessionConfig, SessionEvent, SessionMessage, WebSocketSession};
