/*!
# Inventory Scanner

A browser-based inventory review tool, built in Rust.

## Overview

A user uploads a spreadsheet of inventory records, then scans or types
barcodes. Every row holding a scanned code in any column is marked as
reviewed. Progress can be checked at any time and the annotated sheet can be
exported with a review status column.

## Architecture

### Frontend Layer
- **Technologies**: HTML, JavaScript (single page served at `/`)
- Upload form, barcode input (keyboard-wedge scanners type into it), progress bar

### Backend Layer
- **Technologies**: Rust, axum
- **Core Components**:
  - Dataset Loader - Parses `.xlsx`, `.xls` and `.csv` uploads into a [`Dataset`]
  - Session Store - Keeps one [`InventorySession`] per browser, in memory or on disk
  - Scan Matcher - Finds every row holding a code and records it in the [`ScannedSet`]
  - Progress Tracker - Derives total/scanned/pending counts and a percentage
  - Exporter - Re-serializes the dataset with a `review_status` column

### Data Persistence Layer
- Session files with Gzip compression and bincode serialization
- JSON, CSV and XLSX export

## Modules

- **cell**: Scalar cell values and their canonical text form
- **dataset**: Tabular dataset with unique, ordered columns
- **loader**: Spreadsheet parsing and upload filename checks
- **scanner**: Barcode matching and the scanned-row set
- **progress**: Review progress counters
- **session**: Per-browser session context
- **saving**: Session persistence with compression
- **store**: Memory and disk session stores
- **downloader**: Export functionality (JSON, CSV, XLSX)
- **config**: Environment-driven server settings
- **app**: Routing and handlers (feature `web`)

## REST API Endpoints

- `POST /upload` - Multipart upload (field `file`), returns a summary and preview
- `POST /search` - `{"barcode": "..."}`, marks matching rows as reviewed
- `GET /stats` - Review progress
- `GET /export?format=json|csv|xlsx` - Annotated dataset
- `GET|POST /reset` - Drops the session
*/

#[cfg(feature = "web")]
pub mod app;
pub mod cell;
pub mod config;
pub mod dataset;
pub mod downloader;
pub mod error;
pub mod loader;
pub mod progress;
pub mod saving;
pub mod scanner;
pub mod session;
pub mod store;

/// Re-export the core types to make them easier to use
pub use cell::CellValue;
pub use config::{Config, StoreBackend};
pub use dataset::Dataset;
pub use downloader::{ExportFormat, ExportReport, ExportSummary};
pub use error::InventoryError;
pub use progress::Progress;
pub use scanner::{ScanOutcome, ScannedSet, find_matches, scan};
pub use session::InventorySession;
pub use store::{DiskStore, MemoryStore, SessionStore};
