pub use capture_gate::CaptureGate;
pub use dispatcher::HubMessageHandler;

mod capture_gate;
mod dispatcher;
