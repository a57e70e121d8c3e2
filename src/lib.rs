//! # Demandboard
//!
//! Client-side data access and export engine for an electricity
//! demand/procurement dashboard.
//!
//! ## Features
//!
//! - **Resilient API access**: bearer credential attachment with a single
//!   renew-and-retry on `401 Unauthorized`
//! - **Explicit sessions**: credential lifecycle owned by a `SessionContext`
//! - **Aggregation**: per-plant totals across procurement intervals
//! - **CSV export**: consolidated, raw and summary downloads
//!
//! ## Modules
//!
//! - [`session`]: Credential storage and session lifecycle
//! - [`client`]: HTTP client, transport and token renewal
//! - [`procurement`]: Interval types and aggregation
//! - [`export`]: Row building and CSV documents
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use demandboard::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = SessionContext::in_memory();
//!     session.sign_in(&Credential::new("access", Some("refresh".to_string())));
//!
//!     let client = ApiClient::new(&ClientConfig::default(), session)?;
//!     let intervals = client
//!         .dashboard(&DashboardQuery::between("2024-01-01", "2024-01-02"))
//!         .await?;
//!
//!     let totals = aggregate(&intervals);
//!     println!("{} plants", totals.plants.len());
//!
//!     let builder = ExportBuilder::new(ExportProfile::compact());
//!     let rows = builder.build_consolidated_rows(&intervals);
//!     if let Some(doc) = builder.to_csv(&rows)? {
//!         doc.save(std::path::Path::new(doc.filename()))?;
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod export;
pub mod procurement;
pub mod session;

pub use client::{
    ApiClient, ApiRequest, ApiResponse, ClientConfig, ClientError, ClientResult, DashboardQuery,
    RefreshTokenRenewal, ReqwestTransport, TokenRenewal, Transport,
};

pub use config::{Config, ConfigError, LoggingConfig};

pub use export::{
    ExportBuilder, ExportDocument, ExportError, ExportProfile, ExportResult, GistFormat,
    HeaderMode, Row, StagedExport,
};

pub use procurement::{
    aggregate, AggregationAccumulator, ExchangeTotals, PlantRecord, PlantTotals,
    ProcurementInterval,
};

pub use session::{
    Credential, CredentialKind, CredentialStore, FileCredentialStore, MemoryCredentialStore,
    SessionContext, SessionError,
};
