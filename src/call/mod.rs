//! Live call handling: the voice-session capability, the controller state
//! machine on top of it, and the Vapi web-call backend.

pub mod controller;
pub mod session;
pub mod vapi_web;

pub use controller::{CallController, CallSnapshot, CallStatus, CallUpdate};
pub use session::{EventSource, SessionEvent, VoiceSession};
pub use vapi_web::VapiWebSession;
