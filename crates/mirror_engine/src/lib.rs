//! Table mirror engine: page fetching, table extraction, remote store access
//! and the change-detection pipeline.
mod config;
mod decode;
mod extract;
mod fetch;
mod memory;
mod pipeline;
mod render;
mod sheets;
mod store;
mod types;

pub use config::{load_access_token, ConfigError, MirrorConfig, RendererConfig, CONFIG_FILENAME};
pub use decode::{decode_html, DecodeError, DecodedHtml};
pub use extract::{ParseError, TableExtractor};
pub use fetch::{FetchSettings, PageFetcher, ReqwestFetcher};
pub use memory::{InMemoryStore, StoreCall, StoreOperation};
pub use pipeline::{ConcurrencyPolicy, Pipeline, PipelineSettings, RunError, RunOutcome};
pub use render::{HeadlessChromeRenderer, RenderSettings};
pub use sheets::{SheetsSettings, SheetsStore};
pub use store::{CellValue, RemoteStore, RemoteStoreError, StoreFailureKind};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput};
