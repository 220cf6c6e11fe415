//! Tool servers and routing
//!
//! Tool servers live in-process and implement [`ToolServer`]. The
//! [`ToolRegistry`] aggregates their tools and resources and routes each
//! tool call from the model to the server that owns it.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  ChatClient                              │
//! │    - offers enabled tools to the model   │
//! │    - runs requested tools in order       │
//! └──────────────────────────────────────────┘
//!           │ execute_tool_call
//!           ▼
//! ┌──────────────────────────────────────────┐
//! │  ToolRegistry                            │
//! │    - first server owning the tool wins   │
//! │    - failures become {"error": "..."}    │
//! └──────────────────────────────────────────┘
//!           │
//!     ┌─────┴─────────────┐
//!     ▼                   ▼
//!  DocsServer         WeatherServer
//!  (voip-docs)        (weather)
//! ```

mod server;
mod registry;
mod docs;
mod pdf;
pub mod sip;
mod weather;

pub use server::{ToolError, ToolOutcome, ToolServer};
pub use registry::{ResourceInfo, ToolFilter, ToolInfo, ToolRegistry};
pub use docs::{DocsServer, DOCS_SERVER_NAME};
pub use pdf::{ExtractionMethod, PdfExtractor, PdfText};
pub use weather::{WeatherServer, DEFAULT_WEATHER_API_BASE, WEATHER_SERVER_NAME};
